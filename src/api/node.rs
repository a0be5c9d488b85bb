use crate::actor::{ActorClient, NodeStopped};
use crate::api::EventListener;
use crate::failure_detector::FailureDetector;
use crate::node::{NodeId, NodeStatus, PeerAddress};
use crate::transport::ServingGuard;
use tokio::task::JoinHandle;

/// ClusterNode is the application's handle to one running cluster member.
///
/// Dropping it without calling `shutdown()` also stops the node, just without waiting for its
/// background tasks to exit.
pub struct ClusterNode {
    logger: slog::Logger,
    node_id: NodeId,
    address: PeerAddress,
    actor_client: ActorClient,
    actor_task: Option<JoinHandle<()>>,
    serving_guard: Option<ServingGuard>,
    failure_detector: FailureDetector,
    event_listener: EventListener,
}

impl ClusterNode {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        logger: slog::Logger,
        node_id: NodeId,
        address: PeerAddress,
        actor_client: ActorClient,
        actor_task: JoinHandle<()>,
        serving_guard: ServingGuard,
        failure_detector: FailureDetector,
        event_listener: EventListener,
    ) -> Self {
        ClusterNode {
            logger,
            node_id,
            address,
            actor_client,
            actor_task: Some(actor_task),
            serving_guard: Some(serving_guard),
            failure_detector,
            event_listener,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn address(&self) -> &PeerAddress {
        &self.address
    }

    /// Snapshot of term, role, vote and believed leader.
    pub async fn status(&self) -> Result<NodeStatus, NodeStopped> {
        self.actor_client.status().await
    }

    pub fn event_listener(&self) -> EventListener {
        self.event_listener.clone()
    }

    pub fn failure_detector(&self) -> &FailureDetector {
        &self.failure_detector
    }

    /// Stop serving requests, stop the event loop along with its election and heartbeat timers,
    /// stop the failure detector monitor and forget all peer records. Calling it again does nothing.
    pub async fn shutdown(&mut self) {
        if let Some(serving_guard) = self.serving_guard.take() {
            serving_guard.stop().await;
        }

        if let Some(actor_task) = self.actor_task.take() {
            if self.actor_client.shutdown().await.is_err() {
                slog::warn!(self.logger, "Event loop had already exited before shutdown");
            }
            let _ = actor_task.await;
        }

        self.failure_detector.stop_monitor().await;
        self.failure_detector.clear();
        slog::info!(self.logger, "Node shut down");
    }
}
