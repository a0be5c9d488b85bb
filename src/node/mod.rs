//! The role state machine of a single cluster member and everything it owns: term and vote
//! bookkeeping, the peer registry, and the election and heartbeat timers.
mod election;
mod local_state;
mod node;
mod node_api;
mod node_wiring;
mod peers;

pub use local_state::Term;
pub use node_api::NodeStatus;
pub use node_api::Role;
pub use peers::NodeId;
pub use peers::PeerAddress;

pub(crate) use election::ElectionStateChangeListener;
pub(crate) use election::ElectionStateSnapshot;
pub(crate) use node::ConsensusNode;
pub(crate) use node_api::HeartbeatError;
pub(crate) use node_api::HeartbeatReplyFromPeer;
pub(crate) use node_api::HeartbeatTick;
pub(crate) use node_api::RequestVoteError;
pub(crate) use node_api::VoteReplyFromPeer;
pub(crate) use node_wiring::create_node;
pub(crate) use node_wiring::NodeTimings;
pub(crate) use peers::ClusterTracker;
