//! Optimizer engine port - the external optimization backend.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::cancellation::CancellationToken;
use crate::domain::errors::EngineError;
use crate::domain::models::{EngineEvent, EngineOutcome, EngineRequest};

/// Runs one optimization to completion.
///
/// The engine sends [`EngineEvent::Ready`] once it is iterating, then any
/// number of progress events. When `cancel` fires it must stop and return
/// [`EngineOutcome::Cancelled`].
#[async_trait]
pub trait OptimizerEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        request: &EngineRequest,
        events: mpsc::Sender<EngineEvent>,
        cancel: CancellationToken,
    ) -> Result<EngineOutcome, EngineError>;
}
