use crate::actor::{ActorClient, NodeActor, NodeRequestHandler};
use crate::api::node::ClusterNode;
use crate::api::options::ElectionOptionsValidated;
use crate::api::types::{MemberInfo, NodeConfig};
use crate::api::EventListener;
use crate::failure_detector::FailureDetector;
use crate::node::{self, ClusterTracker, NodeId, NodeTimings};
use crate::transport::{GrpcTransport, PeerTransport, TransportError};
use std::convert::TryFrom;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum NodeCreationError {
    #[error("Invalid cluster info: {0}")]
    InvalidClusterInfo(String),
    #[error("Illegal options for configuring node: {0}")]
    IllegalOptions(String),
    #[error("Failed to start serving requests")]
    Serving(#[source] TransportError),
}

/// Create a node that talks to its peers over gRPC and start it. The node begins as a follower of
/// term 0 and will start an election on its own if it does not hear from a leader.
pub async fn try_create_node(config: NodeConfig) -> Result<ClusterNode, NodeCreationError> {
    let transport = Arc::new(GrpcTransport::new(config.logger.clone()));
    create_node_with_transport(config, transport).await
}

/// Same as `try_create_node()`, but over any transport.
pub async fn create_node_with_transport<T: PeerTransport>(
    config: NodeConfig,
    transport: Arc<T>,
) -> Result<ClusterNode, NodeCreationError> {
    let options = ElectionOptionsValidated::try_from(config.options)
        .map_err(|e| NodeCreationError::IllegalOptions(e.to_string()))?;

    let my_node_id = NodeId::new(config.my_node_id);
    let logger = config.logger.new(slog::o!("NodeId" => my_node_id.to_string()));

    let cluster_members = config.cluster_members.into_iter().map(MemberInfo::into_member).collect();
    let cluster_tracker = ClusterTracker::create_valid_cluster(my_node_id.clone(), cluster_members)
        .map_err(|e| NodeCreationError::InvalidClusterInfo(e.to_string()))?;
    let my_address = cluster_tracker.my_address().clone();

    let transport: Arc<dyn PeerTransport> = transport;
    let (actor_client, actor_queue_rx) = ActorClient::new(64);

    // Requests that arrive before the event loop is spawned wait in its queue.
    let request_handler = Arc::new(NodeRequestHandler::new(logger.clone(), actor_client.weak()));
    let serving_guard = transport
        .register_handler(my_address.clone(), request_handler)
        .await
        .map_err(NodeCreationError::Serving)?;

    let failure_detector = FailureDetector::new(logger.clone(), options.suspicion_timeout);

    let (node, election_state_change_listener) = node::create_node(
        logger.clone(),
        cluster_tracker,
        transport,
        failure_detector.clone(),
        actor_client.weak(),
        NodeTimings {
            heartbeat_interval: options.heartbeat_interval,
            election_timeout: options.election_timeout(),
            rpc_timeout: options.rpc_timeout,
        },
    );

    let node_actor = NodeActor::new(logger.clone(), actor_queue_rx, node);
    let actor_task = tokio::spawn(node_actor.run_event_loop());

    failure_detector.start_monitor(options.monitor_poll_interval);

    slog::info!(logger, "Node started at {}", my_address);

    Ok(ClusterNode::new(
        logger,
        my_node_id,
        my_address,
        actor_client,
        actor_task,
        serving_guard,
        failure_detector,
        EventListener::new(election_state_change_listener),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ElectionOptions;
    use crate::transport::LocalNetwork;
    use tokio::time::Duration;

    fn config(me: &str, members: &[(&str, u16)]) -> NodeConfig {
        NodeConfig {
            my_node_id: me.to_string(),
            cluster_members: members
                .iter()
                .map(|(id, port)| MemberInfo::new(*id, "local", *port))
                .collect(),
            logger: slog::Logger::root(slog::Discard, slog::o!()),
            options: ElectionOptions::default(),
        }
    }

    fn endpoint(network: &LocalNetwork, port: u16) -> Arc<crate::transport::LocalTransport> {
        Arc::new(network.endpoint(crate::node::PeerAddress::new("local", port)))
    }

    #[tokio::test]
    async fn rejects_config_without_me() {
        let network = LocalNetwork::new();
        let result = create_node_with_transport(config("z", &[("a", 1), ("b", 2)]), endpoint(&network, 1)).await;
        assert!(matches!(result, Err(NodeCreationError::InvalidClusterInfo(_))));
    }

    #[tokio::test]
    async fn rejects_duplicate_members() {
        let network = LocalNetwork::new();
        let result = create_node_with_transport(config("a", &[("a", 1), ("b", 2), ("b", 3)]), endpoint(&network, 1)).await;
        assert!(matches!(result, Err(NodeCreationError::InvalidClusterInfo(_))));
    }

    #[tokio::test]
    async fn rejects_illegal_options() {
        let network = LocalNetwork::new();
        let mut config = config("a", &[("a", 1)]);
        config.options.heartbeat_interval = Some(Duration::from_secs(1));
        let result = create_node_with_transport(config, endpoint(&network, 1)).await;
        assert!(matches!(result, Err(NodeCreationError::IllegalOptions(_))));
    }

    #[tokio::test]
    async fn rejects_address_already_in_use() {
        let network = LocalNetwork::new();
        let mut first = create_node_with_transport(config("a", &[("a", 1)]), endpoint(&network, 1))
            .await
            .unwrap();

        let result = create_node_with_transport(config("a", &[("a", 1)]), endpoint(&network, 1)).await;
        assert!(matches!(result, Err(NodeCreationError::Serving(TransportError::Bind(_)))));

        first.shutdown().await;
    }
}
