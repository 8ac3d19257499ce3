//! In-memory surface and timeline runner
//!
//! Used by the native binary and by tests: elements live in a slot table and
//! timers are simulated on a fixed frame clock.

use glam::Vec2;
use rand::Rng;

use super::Surface;
use crate::error::FieldError;
use crate::sim::{Particle, ParticleField};

/// Last state pushed to a headless element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementState {
    pub particle_id: u64,
    pub size: f32,
    pub pos: Vec2,
}

/// Surface that records element state instead of drawing it
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    slots: Vec<Option<ElementState>>,
    free: Vec<usize>,
    attached: u64,
    released: u64,
    /// Fail every attach (exercises the allocation-failure path)
    pub refuse_attach: bool,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(&self, handle: usize) -> Option<&ElementState> {
        self.slots.get(handle).and_then(|s| s.as_ref())
    }

    /// Elements currently attached
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn attached(&self) -> u64 {
        self.attached
    }

    pub fn released(&self) -> u64 {
        self.released
    }
}

impl Surface for HeadlessSurface {
    type Handle = usize;

    fn attach(&mut self, particle: &Particle) -> Result<usize, FieldError> {
        if self.refuse_attach {
            return Err(FieldError::Dom("headless surface refused attach".to_string()));
        }
        let state = ElementState {
            particle_id: particle.id,
            size: particle.size(),
            pos: particle.pos,
        };
        let handle = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(state);
                slot
            }
            None => {
                self.slots.push(Some(state));
                self.slots.len() - 1
            }
        };
        self.attached += 1;
        Ok(handle)
    }

    fn apply(&mut self, handle: &usize, size: f32, pos: Vec2) {
        if let Some(Some(el)) = self.slots.get_mut(*handle) {
            el.size = size;
            el.pos = pos;
        }
    }

    fn release(&mut self, handle: usize) {
        if let Some(slot) = self.slots.get_mut(handle) {
            if slot.take().is_some() {
                self.free.push(handle);
                self.released += 1;
            }
        }
    }
}

/// Totals from a headless run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub batches: u64,
    pub expired: u64,
    pub peak_live: usize,
    pub final_live: usize,
}

/// Drives a field through simulated wall-clock time.
///
/// Frames, batch ticks and sub-ticks fire in timestamp order on one clock,
/// mirroring how the browser event loop interleaves the three callbacks.
pub struct HeadlessRunner {
    /// Milliseconds between display frames
    pub frame_ms: f64,
    now: f64,
    next_frame: f64,
    next_batch: f64,
    next_sub_tick: Option<f64>,
}

impl HeadlessRunner {
    pub fn new(start: f64, frame_ms: f64) -> Self {
        Self {
            frame_ms: frame_ms.max(1.0),
            now: start,
            next_frame: start,
            next_batch: f64::INFINITY,
            next_sub_tick: None,
        }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Run for `duration_ms` of simulated time
    pub fn run<R, S>(&mut self, field: &mut ParticleField<R, S>, duration_ms: f64) -> RunSummary
    where
        R: Rng,
        S: Surface,
    {
        let batch_ms = f64::from(field.settings().batch_interval_ms).max(1.0);
        let sub_ms = f64::from(field.settings().sub_tick_interval_ms).max(1.0);
        if !self.next_batch.is_finite() {
            self.next_batch = self.now + batch_ms;
        }

        let end = self.now + duration_ms;
        let mut summary = RunSummary::default();

        loop {
            let sub = self.next_sub_tick.unwrap_or(f64::INFINITY);
            let due = self.next_frame.min(self.next_batch).min(sub);
            if due > end {
                break;
            }
            self.now = due;

            if due == self.next_batch {
                field.begin_batch();
                summary.batches += 1;
                self.next_batch += batch_ms;
                if field.is_distributing() && self.next_sub_tick.is_none() {
                    self.next_sub_tick = Some(due + sub_ms);
                }
            } else if due == sub {
                field.spawn_sub_tick(due);
                self.next_sub_tick = field.is_distributing().then_some(due + sub_ms);
            } else {
                let report = field.tick(due);
                summary.frames += 1;
                summary.expired += report.expired as u64;
                summary.peak_live = summary.peak_live.max(report.live);
                self.next_frame += self.frame_ms;
            }
        }

        self.now = end;
        summary.final_live = field.len();
        summary
    }
}
