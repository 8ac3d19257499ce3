//! Particle Field - ambient drifting-dot page background
//!
//! Core modules:
//! - `sim`: Deterministic simulation (particles, density, batch spawning)
//! - `platform`: Frame scheduling, cancellation, rendering surfaces
//! - `settings`: Data-driven effect tuning
//! - `error`: Error type for the fallible edges (DOM, settings)

pub mod error;
pub mod platform;
pub mod settings;
pub mod sim;

pub use error::FieldError;
pub use settings::{FieldSettings, SpawnRange};
pub use sim::{ParticleField, TickReport};

/// Effect configuration constants
pub mod consts {
    /// Centimeters per inch
    pub const CM_PER_INCH: f64 = 2.54;
    /// Assumed display density (CSS reference pixel)
    pub const DEFAULT_DPI: f64 = 96.0;

    /// Particles spawned per area unit
    pub const PARTICLES_PER_UNIT: f32 = 8.0;
    /// Area unit for spawn density (cm²)
    pub const AREA_UNIT_CM2: f32 = 20.0;

    /// Particles created on start
    pub const INITIAL_PARTICLES: usize = 10;

    /// Period between batch bursts
    pub const BATCH_INTERVAL_MS: u32 = 5000;
    /// Period between sub-ticks while a batch is distributing (~30 fps)
    pub const SUB_TICK_INTERVAL_MS: u32 = 33;
    /// Sub-ticks a batch is spread over (5 seconds at 30 fps)
    pub const DISTRIBUTION_FRAMES: u32 = 150;

    /// Fraction of life after which particles start shrinking
    pub const SHRINK_START: f32 = 0.8;

    /// Milliseconds per second
    pub const MS_PER_SEC: f64 = 1000.0;
}

/// Uniform sample in [lo, hi), tolerant of empty or inverted ranges
#[inline]
pub fn sample_uniform<R: rand::Rng>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    lo + rng.random::<f32>() * (hi - lo)
}
