//! Rendering surface abstraction
//!
//! The field never touches the DOM directly: each live particle owns exactly
//! one `Handle` obtained from `attach` and given back through `release`.

use glam::Vec2;

use crate::error::FieldError;
use crate::sim::Particle;

pub trait Surface {
    /// Owned visual element for one particle
    type Handle;

    /// Create the element for a new particle with its initial size,
    /// position and animation hints.
    fn attach(&mut self, particle: &Particle) -> Result<Self::Handle, FieldError>;

    /// Push the rendered size and position to the element
    fn apply(&mut self, handle: &Self::Handle, size: f32, pos: Vec2);

    /// Destroy the element
    fn release(&mut self, handle: Self::Handle);
}
