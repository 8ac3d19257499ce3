//! Deterministic particle simulation
//!
//! All effect logic lives here. This module must stay pure and deterministic:
//! - Timestamps are passed in, never read from a clock
//! - Injected RNG only
//! - No DOM or platform dependencies beyond the `Surface` trait

pub mod field;
pub mod particle;
pub mod spawner;
pub mod viewport;

pub use field::{ParticleField, TickReport};
pub use particle::{Particle, shrink_factor, wrap_position};
pub use spawner::{BatchSpawner, BatchStart, SpawnerState};
pub use viewport::{Viewport, batch_size};
