//! Errors surfaced at the edges of the effect
//!
//! The simulation itself never fails; these cover browser lookups,
//! DOM calls and settings parsing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("no global window available")]
    NoWindow,
    #[error("window has no document")]
    NoDocument,
    #[error("no element matches background selector `{0}`")]
    ContainerNotFound(String),
    #[error("DOM call failed: {0}")]
    Dom(String),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("malformed settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for FieldError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        FieldError::Dom(format!("{:?}", value))
    }
}
