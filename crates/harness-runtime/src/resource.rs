//! Resource capability
//!
//! A resource is an external collaborator (database pool, server,
//! scheduler, exporter) whose lifecycle the orchestrator drives:
//!
//! ```text
//! configure ──▶ enter ──▶ ... ──▶ close ──▶ wait_closed
//!                                 └──────── exit ───────┘
//! ```

use async_trait::async_trait;
use harness_core::DynamicMessage;
use std::any::Any;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of an external resource
///
/// `close` must not block; it only requests shutdown. `wait_closed`
/// resolves once the resource has fully stopped. Resources are downcast
/// with [`Inputs::get`](crate::Inputs::get), hence the `Any` bound.
#[async_trait]
pub trait Resource: Any + Send + Sync {
    /// Apply the resource's configuration sub-message
    fn configure(&mut self, config: &DynamicMessage) -> anyhow::Result<()>;

    /// Acquire the resource
    async fn enter(&mut self) -> anyhow::Result<()>;

    /// Request shutdown
    fn close(&self) -> anyhow::Result<()>;

    /// Wait until the resource has stopped
    async fn wait_closed(&self) -> anyhow::Result<()>;

    /// Release the resource
    async fn exit(&mut self) -> anyhow::Result<()> {
        self.close()?;
        self.wait_closed().await
    }
}

/// Shutdown latch for resource implementations
///
/// Cloned handles share state; once closed it stays closed.
#[derive(Debug, Clone)]
pub struct Closer {
    state: Arc<watch::Sender<bool>>,
}

impl Closer {
    /// Create an open latch
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Close the latch, waking all waiters
    pub fn close(&self) {
        self.state.send_replace(true);
    }

    /// Whether [`close`](Self::close) was called
    pub fn is_closed(&self) -> bool {
        *self.state.borrow()
    }

    /// Wait until the latch is closed
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        // the sender lives in `self`, so this cannot fail
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Default for Closer {
    fn default() -> Self {
        Self::new()
    }
}
