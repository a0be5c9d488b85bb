use crate::actor::WeakActorClient;
use crate::failure_detector::FailureDetector;
use crate::node::election::{ElectionConfig, ElectionState, ElectionStateChangeListener};
use crate::node::local_state::VolatileLocalState;
use crate::node::node::{ConsensusNode, ConsensusNodeConfig};
use crate::node::peers::ClusterTracker;
use crate::node::Term;
use crate::transport::PeerTransport;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct NodeTimings {
    pub heartbeat_interval: Duration,
    pub election_timeout: Range<Duration>,
    pub rpc_timeout: Duration,
}

/// Assemble a ConsensusNode that starts out as a follower of term 0 with no vote cast. The
/// follower's election timer is armed immediately.
pub(crate) fn create_node(
    logger: slog::Logger,
    cluster_tracker: ClusterTracker,
    transport: Arc<dyn PeerTransport>,
    failure_detector: FailureDetector,
    actor_client: WeakActorClient,
    timings: NodeTimings,
) -> (ConsensusNode, ElectionStateChangeListener) {
    let my_node_id = cluster_tracker.my_node_id().clone();
    let (election_state, election_state_change_listener) = ElectionState::new_follower(
        ElectionConfig {
            my_node_id: my_node_id.clone(),
            heartbeat_interval: timings.heartbeat_interval,
            election_timeout: timings.election_timeout,
        },
        actor_client.clone(),
        Term::default(),
    );

    let local_state = Box::new(VolatileLocalState::new(my_node_id));

    let node = ConsensusNode::new(ConsensusNodeConfig {
        logger,
        cluster_tracker,
        local_state,
        election_state,
        transport,
        failure_detector,
        actor_client,
        rpc_timeout: timings.rpc_timeout,
    });

    (node, election_state_change_listener)
}
