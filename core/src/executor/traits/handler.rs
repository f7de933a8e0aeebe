use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::FieldSet;
use crate::error::HandlerError;

/// Payload a handler hands back on success.
pub type PhasePayload = Option<Value>;

/// Asynchronous unit of work registered for one phase.
///
/// Handlers capture whatever shared state they need when they are
/// constructed; the executor calls `run` with no arguments.
#[async_trait]
pub trait PhaseHandler: Send + Sync {
    async fn run(&self) -> Result<PhasePayload, HandlerError>;

    /// Shared-context fields this handler may write.
    fn writes(&self) -> FieldSet {
        FieldSet::empty()
    }
}

/// Handler backed by a closure returning a future.
pub struct FnHandler<F> {
    f: F,
    writes: FieldSet,
}

impl<F> FnHandler<F> {
    pub fn with_writes(mut self, writes: FieldSet) -> Self {
        self.writes = writes;
        self
    }
}

/// Wrap a closure as a [`PhaseHandler`].
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PhasePayload, HandlerError>> + Send + 'static,
{
    FnHandler {
        f,
        writes: FieldSet::empty(),
    }
}

#[async_trait]
impl<F, Fut> PhaseHandler for FnHandler<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PhasePayload, HandlerError>> + Send + 'static,
{
    async fn run(&self) -> Result<PhasePayload, HandlerError> {
        (self.f)().await
    }

    fn writes(&self) -> FieldSet {
        self.writes.clone()
    }
}
