//! Particle records and their per-frame motion rules

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::viewport::Viewport;
use crate::consts::{MS_PER_SEC, SHRINK_START};
use crate::settings::FieldSettings;

/// A single drifting dot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub id: u64,
    /// Base diameter (px), fixed at creation
    size: f32,
    pub pos: Vec2,
    /// Displacement per frame (px)
    vel: Vec2,
    /// Seconds until expiry, fixed at creation
    lifespan: f32,
    /// Wall clock at creation (ms)
    birth_time: f64,
    /// CSS animation-delay hint (seconds)
    pub animation_delay: f32,
    /// CSS animation-duration hint (seconds)
    pub animation_duration: f32,
}

impl Particle {
    pub fn new(id: u64, size: f32, pos: Vec2, vel: Vec2, lifespan: f32, birth_time: f64) -> Self {
        Self {
            id,
            size,
            pos,
            vel,
            lifespan,
            birth_time,
            animation_delay: 0.0,
            animation_duration: 0.0,
        }
    }

    /// Draw a particle with independently randomized properties
    pub fn random<R: Rng>(
        id: u64,
        rng: &mut R,
        settings: &FieldSettings,
        viewport: &Viewport,
        now: f64,
    ) -> Self {
        let size = settings.size.sample(rng);
        let pos = Vec2::new(
            crate::sample_uniform(rng, 0.0, viewport.width),
            crate::sample_uniform(rng, 0.0, viewport.height),
        );
        let animation_delay = settings.animation_delay_secs.sample(rng);
        let animation_duration = settings.animation_duration_secs.sample(rng);
        let s = settings.max_speed;
        let vel = Vec2::new(
            crate::sample_uniform(rng, -s, s),
            crate::sample_uniform(rng, -s, s),
        );
        let lifespan = settings.lifespan_secs.sample(rng);

        Self {
            animation_delay,
            animation_duration,
            ..Self::new(id, size, pos, vel, lifespan, now)
        }
    }

    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    #[inline]
    pub fn vel(&self) -> Vec2 {
        self.vel
    }

    #[inline]
    pub fn lifespan(&self) -> f32 {
        self.lifespan
    }

    #[inline]
    pub fn birth_time(&self) -> f64 {
        self.birth_time
    }

    /// Age in seconds; a clock that stepped backwards reads as zero
    pub fn age(&self, now: f64) -> f32 {
        ((now - self.birth_time) / MS_PER_SEC).max(0.0) as f32
    }

    /// Fraction of lifespan consumed (may exceed 1 once expired)
    pub fn life_percentage(&self, now: f64) -> f32 {
        self.age(now) / self.lifespan
    }

    pub fn is_expired(&self, now: f64) -> bool {
        self.age(now) > self.lifespan
    }

    /// Diameter to render at `now`, shrunk during the last 20% of life
    pub fn current_size(&self, now: f64) -> f32 {
        self.size * shrink_factor(self.life_percentage(now))
    }

    /// Move one frame and wrap across viewport edges.
    ///
    /// `extent` is the rendered (possibly shrunk) size: a dot only wraps once
    /// it is fully off-screen.
    pub fn advance(&mut self, extent: f32, viewport: &Viewport) {
        self.pos += self.vel;
        self.pos = wrap_position(self.pos, extent, viewport);
    }

    /// Upper clamp to a new viewport (negative positions are left alone)
    pub fn clamp_to(&mut self, viewport: &Viewport) {
        self.pos.x = self.pos.x.min(viewport.width);
        self.pos.y = self.pos.y.min(viewport.height);
    }
}

/// Size multiplier for a given life fraction.
///
/// 1.0 up to `SHRINK_START`, then linear down to 0.0 at end of life.
pub fn shrink_factor(life_percentage: f32) -> f32 {
    if life_percentage <= SHRINK_START {
        1.0
    } else {
        // 20% of life left -> 5x rate hits zero exactly at expiry
        (1.0 - (life_percentage - SHRINK_START) * 5.0).clamp(0.0, 1.0)
    }
}

/// Relocate a point that left the viewport by more than `extent` to the
/// opposite edge. Edges are checked in order: left, right, top, bottom.
pub fn wrap_position(mut pos: Vec2, extent: f32, viewport: &Viewport) -> Vec2 {
    if pos.x < -extent {
        pos.x = viewport.width;
    }
    if pos.x > viewport.width {
        pos.x = -extent;
    }
    if pos.y < -extent {
        pos.y = viewport.height;
    }
    if pos.y > viewport.height {
        pos.y = -extent;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn particle(lifespan: f32) -> Particle {
        Particle::new(1, 6.0, Vec2::new(10.0, 10.0), Vec2::new(0.2, -0.1), lifespan, 0.0)
    }

    #[test]
    fn test_shrink_factor_curve() {
        assert_eq!(shrink_factor(0.0), 1.0);
        assert_eq!(shrink_factor(0.5), 1.0);
        assert_eq!(shrink_factor(0.8), 1.0);
        assert!((shrink_factor(0.9) - 0.5).abs() < 1e-5);
        assert!(shrink_factor(1.0).abs() < 1e-5);
        assert_eq!(shrink_factor(1.5), 0.0);
    }

    #[test]
    fn test_shrink_at_three_and_a_half_of_four_seconds() {
        let p = particle(4.0);
        let now = 3500.0;
        assert!((p.life_percentage(now) - 0.875).abs() < 1e-6);
        assert!((shrink_factor(p.life_percentage(now)) - 0.625).abs() < 1e-5);
        assert!((p.current_size(now) - 0.625 * 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_age_never_negative() {
        let p = Particle::new(1, 4.0, Vec2::ZERO, Vec2::ZERO, 3.0, 10_000.0);
        assert_eq!(p.age(5_000.0), 0.0);
        assert!(!p.is_expired(5_000.0));
    }

    #[test]
    fn test_expiry_is_strictly_after_lifespan() {
        let p = particle(3.0);
        assert!(!p.is_expired(3000.0));
        assert!(p.is_expired(3001.0));
    }

    #[test]
    fn test_wrap_left_edge_goes_to_width() {
        let vp = Viewport::new(100.0, 50.0, 1.0);
        let pos = wrap_position(Vec2::new(-4.5, 20.0), 4.0, &vp);
        assert_eq!(pos, Vec2::new(100.0, 20.0));
    }

    #[test]
    fn test_wrap_all_edges() {
        let vp = Viewport::new(100.0, 50.0, 1.0);
        assert_eq!(wrap_position(Vec2::new(100.5, 20.0), 4.0, &vp).x, -4.0);
        assert_eq!(wrap_position(Vec2::new(20.0, -4.1), 4.0, &vp).y, 50.0);
        assert_eq!(wrap_position(Vec2::new(20.0, 50.1), 4.0, &vp).y, -4.0);
        // Partially off-screen stays put
        assert_eq!(wrap_position(Vec2::new(-3.9, 20.0), 4.0, &vp).x, -3.9);
    }

    #[test]
    fn test_advance_moves_by_velocity() {
        let vp = Viewport::new(100.0, 100.0, 1.0);
        let mut p = particle(5.0);
        p.advance(6.0, &vp);
        assert!((p.pos - Vec2::new(10.2, 9.9)).length() < 1e-5);
    }

    #[test]
    fn test_clamp_is_upper_only() {
        let vp = Viewport::new(50.0, 40.0, 1.0);
        let mut p = particle(5.0);
        p.pos = Vec2::new(80.0, -3.0);
        p.clamp_to(&vp);
        assert_eq!(p.pos, Vec2::new(50.0, -3.0));
    }

    #[test]
    fn test_random_particle_respects_settings() {
        let settings = FieldSettings::default();
        let vp = Viewport::new(640.0, 480.0, 1.0);
        let mut rng = Pcg32::seed_from_u64(99);
        for id in 0..500 {
            let p = Particle::random(id, &mut rng, &settings, &vp, 1000.0);
            assert!(settings.size.contains(p.size()));
            assert!(settings.lifespan_secs.contains(p.lifespan()));
            assert!(p.vel().x.abs() <= 0.25 && p.vel().y.abs() <= 0.25);
            assert!(p.pos.x >= 0.0 && p.pos.x <= 640.0);
            assert!(p.pos.y >= 0.0 && p.pos.y <= 480.0);
            assert!(settings.animation_delay_secs.contains(p.animation_delay));
            assert!(settings.animation_duration_secs.contains(p.animation_duration));
            assert_eq!(p.birth_time(), 1000.0);
        }
    }
}
