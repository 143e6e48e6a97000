//! Execution sink trait.

use crate::error::ExecutionError;
use crate::types::ExecutionIntent;
use async_trait::async_trait;

/// Receives open and close intents produced by the engine.
///
/// A paper account fills them immediately; a live adapter would place
/// orders with an exchange.
#[async_trait]
pub trait ExecutionSink: Send + Sync {
    /// Submit an intent.
    async fn submit(&self, intent: ExecutionIntent) -> Result<(), ExecutionError>;

    /// Get the name of this sink.
    fn name(&self) -> &str;
}
