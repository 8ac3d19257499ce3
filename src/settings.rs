//! Effect settings
//!
//! Every field has a default, so a page can override just the knobs it
//! cares about with a partial JSON object.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::FieldError;
use crate::sample_uniform;

/// Attribute on the background container holding a settings JSON object
pub const SETTINGS_ATTRIBUTE: &str = "data-particle-settings";

/// Half-open range a particle property is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRange {
    pub min: f32,
    pub max: f32,
}

impl SpawnRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Draw a value uniformly in [min, max)
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        sample_uniform(rng, self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Tuning for the particle field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    // === Population ===
    /// Particles created when the field starts
    pub initial_particles: usize,
    /// Hard cap on live particles (None = unbounded)
    pub max_particles: Option<usize>,
    /// Fixed RNG seed (None = seed from the clock)
    pub seed: Option<u64>,

    // === Spawn density ===
    /// Particles per `area_unit_cm2` of visible screen
    pub particles_per_unit: f32,
    /// Area unit in square centimeters
    pub area_unit_cm2: f32,
    /// Assumed pixel density for px -> cm conversion
    pub dots_per_inch: f64,

    // === Batch timing ===
    pub batch_interval_ms: u32,
    pub sub_tick_interval_ms: u32,
    /// Number of sub-ticks a batch is spread across
    pub distribution_frames: u32,

    // === Particle properties ===
    /// Base diameter (px)
    pub size: SpawnRange,
    /// Lifespan (seconds)
    pub lifespan_secs: SpawnRange,
    /// Per-axis velocity bound (px per frame)
    pub max_speed: f32,
    /// CSS animation-delay hint (seconds)
    pub animation_delay_secs: SpawnRange,
    /// CSS animation-duration hint (seconds)
    pub animation_duration_secs: SpawnRange,

    // === DOM ===
    /// Selector of the container particles are appended to
    pub container_selector: String,
    /// Class applied to each particle element
    pub particle_class: String,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            initial_particles: INITIAL_PARTICLES,
            max_particles: None,
            seed: None,

            particles_per_unit: PARTICLES_PER_UNIT,
            area_unit_cm2: AREA_UNIT_CM2,
            dots_per_inch: DEFAULT_DPI,

            batch_interval_ms: BATCH_INTERVAL_MS,
            sub_tick_interval_ms: SUB_TICK_INTERVAL_MS,
            distribution_frames: DISTRIBUTION_FRAMES,

            size: SpawnRange::new(2.0, 8.0),
            lifespan_secs: SpawnRange::new(3.0, 8.0),
            max_speed: 0.25,
            animation_delay_secs: SpawnRange::new(0.0, 6.0),
            animation_duration_secs: SpawnRange::new(4.0, 8.0),

            container_selector: ".dynamic-background".to_string(),
            particle_class: "particle".to_string(),
        }
    }
}

impl FieldSettings {
    /// Parse settings from JSON (missing keys take defaults) and validate
    pub fn from_json(json: &str) -> Result<Self, FieldError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the simulation cannot run with
    pub fn validate(&self) -> Result<(), FieldError> {
        let invalid = |msg: &str| Err(FieldError::InvalidSettings(msg.to_string()));

        if self.distribution_frames == 0 {
            return invalid("distribution_frames must be non-zero");
        }
        if self.batch_interval_ms == 0 || self.sub_tick_interval_ms == 0 {
            return invalid("timer intervals must be non-zero");
        }
        if !(self.area_unit_cm2 > 0.0) {
            return invalid("area_unit_cm2 must be positive");
        }
        if !(self.dots_per_inch > 0.0) {
            return invalid("dots_per_inch must be positive");
        }
        if !(self.particles_per_unit >= 0.0) {
            return invalid("particles_per_unit must not be negative");
        }
        if !(self.max_speed >= 0.0) {
            return invalid("max_speed must not be negative");
        }
        if !self.size.is_valid() || self.size.min < 0.0 {
            return invalid("size range must be non-negative with min <= max");
        }
        if !self.lifespan_secs.is_valid() || !(self.lifespan_secs.min > 0.0) {
            return invalid("lifespan range must be positive with min <= max");
        }
        if !self.animation_delay_secs.is_valid() || !self.animation_duration_secs.is_valid() {
            return invalid("animation ranges must have min <= max");
        }
        if self.container_selector.trim().is_empty() {
            return invalid("container_selector must not be empty");
        }
        Ok(())
    }

    /// Apply a partial JSON object on top of `self`.
    ///
    /// Keys present in `json` win; nested ranges merge field by field, so
    /// `{"size": {"max": 12}}` keeps the current `size.min`.
    pub fn with_overrides(&self, json: &str) -> Result<Self, FieldError> {
        let overrides: serde_json::Value = serde_json::from_str(json)?;
        if !overrides.is_object() {
            return Err(FieldError::InvalidSettings(
                "settings overrides must be a JSON object".to_string(),
            ));
        }
        let mut merged = serde_json::to_value(self)?;
        merge_json(&mut merged, overrides);
        let settings: Self = serde_json::from_value(merged)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Layer the container's settings attribute over `base` (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn from_container(container: &web_sys::Element, base: Self) -> Self {
        let Some(json) = container.get_attribute(SETTINGS_ATTRIBUTE) else {
            return base;
        };

        match base.with_overrides(&json) {
            Ok(settings) => {
                log::info!("Applied particle settings from {}", SETTINGS_ATTRIBUTE);
                // The container was already resolved with the base selector
                Self {
                    container_selector: base.container_selector,
                    ..settings
                }
            }
            Err(e) => {
                log::warn!("Ignoring {}: {}", SETTINGS_ATTRIBUTE, e);
                base
            }
        }
    }
}

/// Recursive object merge; non-object values in `overrides` replace outright
fn merge_json(base: &mut serde_json::Value, overrides: serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
