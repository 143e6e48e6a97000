//! Configuration validation trait.

use crate::error::EngineError;

/// Validation for component configuration sections.
pub trait ComponentConfig: Send + Sync + Clone + 'static {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), EngineError>;
}
