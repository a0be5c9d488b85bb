use crate::node::PeerAddress;
use crate::transport::{Reply, Request};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// PeerTransport is everything the consensus core needs from the network: send one request and
/// await one reply, and accept requests at an address.
#[async_trait::async_trait]
pub trait PeerTransport: Send + Sync + 'static {
    /// Send `request` to `address`. Must return within roughly `timeout`.
    async fn send(&self, address: &PeerAddress, request: Request, timeout: Duration) -> Result<Reply, TransportError>;

    /// Start dispatching requests arriving at `address` to `handler`. Requests stop being
    /// dispatched once the returned guard is stopped or dropped.
    async fn register_handler(
        &self,
        address: PeerAddress,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<ServingGuard, TransportError>;
}

/// RequestHandler answers every inbound request with exactly one reply.
#[async_trait::async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> Reply;
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("timed out waiting for reply")]
    Timeout,
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    #[error("peer rejected request: {0}")]
    Rejected(String),
    #[error("malformed reply: {0}")]
    MalformedReply(String),
    #[error("failed to accept requests: {0}")]
    Bind(String),
}

impl TransportError {
    /// Transient failures are worth retrying on a later round. The others indicate the peer
    /// understood us and said no, or that something is misconfigured.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Timeout | TransportError::Unreachable(_) => true,
            TransportError::Rejected(_) | TransportError::MalformedReply(_) | TransportError::Bind(_) => false,
        }
    }
}

/// ServingGuard keeps a registered handler alive.
pub struct ServingGuard {
    stop: Option<Box<dyn FnOnce() + Send + Sync>>,
    task: Option<JoinHandle<()>>,
}

impl ServingGuard {
    pub fn new<F>(stop: F, task: Option<JoinHandle<()>>) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        ServingGuard {
            stop: Some(Box::new(stop)),
            task,
        }
    }

    /// Stop accepting requests and wait for the serving task (if any) to exit.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ServingGuard {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }
}
