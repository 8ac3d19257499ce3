//! The particle field: live particles, render step, batch spawning, resize
//!
//! Everything here is driven by explicit timestamps (`now`, wall-clock ms)
//! and an injected RNG, so the same seed and call sequence always produce
//! the same field.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::particle::Particle;
use super::spawner::{BatchSpawner, BatchStart};
use super::viewport::{Viewport, batch_size};
use crate::error::FieldError;
use crate::platform::Surface;
use crate::settings::FieldSettings;

/// A particle together with the element it owns
struct LiveParticle<H> {
    particle: Particle,
    handle: H,
}

/// Outcome of one render step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Particles removed this step
    pub expired: usize,
    /// Particles still alive after the step
    pub live: usize,
}

pub struct ParticleField<R, S: Surface> {
    settings: FieldSettings,
    viewport: Viewport,
    /// Cached visible area (cm²), refreshed on resize
    area_cm2: f64,
    rng: R,
    surface: S,
    particles: Vec<LiveParticle<S::Handle>>,
    spawner: BatchSpawner,
    next_id: u64,
    /// Spawns dropped by the population cap or a failed attach
    skipped: u64,
}

impl<S: Surface> ParticleField<Pcg32, S> {
    /// Field with the default PCG generator
    pub fn seeded(
        settings: FieldSettings,
        viewport: Viewport,
        surface: S,
        seed: u64,
    ) -> Result<Self, FieldError> {
        Self::new(settings, viewport, Pcg32::seed_from_u64(seed), surface)
    }
}

impl<R: Rng, S: Surface> ParticleField<R, S> {
    /// Build an empty field. Fails if `settings` do not validate.
    pub fn new(
        settings: FieldSettings,
        viewport: Viewport,
        rng: R,
        surface: S,
    ) -> Result<Self, FieldError> {
        settings.validate()?;
        let area_cm2 = viewport.area_cm2(settings.dots_per_inch);
        let spawner = BatchSpawner::new(settings.distribution_frames);
        Ok(Self {
            settings,
            viewport,
            area_cm2,
            rng,
            surface,
            particles: Vec::new(),
            spawner,
            next_id: 1,
            skipped: 0,
        })
    }

    pub fn settings(&self) -> &FieldSettings {
        &self.settings
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn area_cm2(&self) -> f64 {
        self.area_cm2
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn spawner(&self) -> &BatchSpawner {
        &self.spawner
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Live particles in creation order
    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().map(|p| &p.particle)
    }

    /// Live particles with their element handles
    pub fn entries(&self) -> impl Iterator<Item = (&Particle, &S::Handle)> {
        self.particles.iter().map(|p| (&p.particle, &p.handle))
    }

    /// Create the initial population
    pub fn populate(&mut self, now: f64) -> usize {
        let count = self.settings.initial_particles;
        let created = (0..count)
            .filter(|_| self.spawn_particle(now).is_some())
            .count();
        log::debug!("Populated field with {} particles", created);
        created
    }

    /// Create one particle and its element. Returns the new particle's id,
    /// or None when the cap is reached or the surface refused the element.
    pub fn spawn_particle(&mut self, now: f64) -> Option<u64> {
        if let Some(cap) = self.settings.max_particles {
            if self.particles.len() >= cap {
                self.skipped += 1;
                return None;
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        let particle = Particle::random(id, &mut self.rng, &self.settings, &self.viewport, now);

        match self.surface.attach(&particle) {
            Ok(handle) => {
                self.particles.push(LiveParticle { particle, handle });
                Some(id)
            }
            Err(e) => {
                log::warn!("Failed to attach particle {}: {}", id, e);
                self.skipped += 1;
                None
            }
        }
    }

    /// One render step: expire, shrink, move, wrap, draw
    pub fn tick(&mut self, now: f64) -> TickReport {
        let mut expired = 0;
        let live = std::mem::take(&mut self.particles);
        self.particles.reserve(live.len());

        for LiveParticle {
            mut particle,
            handle,
        } in live
        {
            if particle.is_expired(now) {
                self.surface.release(handle);
                expired += 1;
                continue;
            }

            let size = particle.current_size(now);
            particle.advance(size, &self.viewport);
            self.surface.apply(&handle, size, particle.pos);
            self.particles.push(LiveParticle { particle, handle });
        }

        let report = TickReport {
            expired,
            live: self.particles.len(),
        };
        log::trace!("tick: {:?}", report);
        report
    }

    /// Particles per batch for the current viewport
    pub fn batch_size(&self) -> usize {
        batch_size(
            self.area_cm2,
            self.settings.area_unit_cm2,
            self.settings.particles_per_unit,
        )
    }

    pub fn is_distributing(&self) -> bool {
        self.spawner.is_distributing()
    }

    /// Batch timer fired: queue (or merge) a density-scaled batch
    pub fn begin_batch(&mut self) -> BatchStart {
        let batch = self.batch_size();
        let start = self.spawner.begin(batch);
        match start {
            BatchStart::Skipped => log::debug!("Batch skipped (empty viewport)"),
            BatchStart::Started => log::debug!("Batch of {} started", batch),
            BatchStart::Merged => log::debug!(
                "Batch of {} merged, {} now pending",
                batch,
                self.spawner.remaining()
            ),
        }
        start
    }

    /// Sub-tick timer fired: spawn this slice of the pending batch
    pub fn spawn_sub_tick(&mut self, now: f64) -> usize {
        let count = self.spawner.sub_tick();
        (0..count)
            .filter(|_| self.spawn_particle(now).is_some())
            .count()
    }

    /// Drop whatever is left of the in-flight batch
    pub fn cancel_batch(&mut self) {
        if self.spawner.is_distributing() {
            log::debug!("Dropping {} pending spawns", self.spawner.remaining());
        }
        self.spawner.reset();
    }

    /// Viewport changed: refresh density and pull particles inside the new
    /// right/bottom edges
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.area_cm2 = viewport.area_cm2(self.settings.dots_per_inch);
        for live in self.particles.iter_mut() {
            live.particle.clamp_to(&self.viewport);
        }
        log::debug!(
            "Resized to {}x{} @{}x ({:.1} cm², batch {})",
            viewport.width,
            viewport.height,
            viewport.device_pixel_ratio,
            self.area_cm2,
            self.batch_size()
        );
    }

    /// Release every element and drop any pending batch
    pub fn clear(&mut self) {
        for live in self.particles.drain(..) {
            self.surface.release(live.handle);
        }
        self.cancel_batch();
    }
}
