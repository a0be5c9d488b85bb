mod actor;
mod api;
mod clock;
mod failure_detector;
mod node;
mod server;
mod transport;
mod grpc {
    include!("../generated/cluster.rs");
}

pub use actor::NodeStopped;
pub use api::create_node_with_transport;
pub use api::try_create_node;
pub use api::ClusterNode;
pub use api::ElectionEvent;
pub use api::ElectionOptions;
pub use api::EventListener;
pub use api::MemberInfo;
pub use api::NodeConfig;
pub use api::NodeCreationError;
pub use failure_detector::FailureDetector;
pub use failure_detector::SuspectCallback;
pub use failure_detector::SuspectCallbackError;
pub use node::NodeId;
pub use node::NodeStatus;
pub use node::PeerAddress;
pub use node::Role;
pub use node::Term;
pub use transport::DecodeError;
pub use transport::ErrorReply;
pub use transport::GrpcTransport;
pub use transport::Heartbeat;
pub use transport::HeartbeatReply;
pub use transport::LocalNetwork;
pub use transport::LocalTransport;
pub use transport::MessageType;
pub use transport::PeerTransport;
pub use transport::Reply;
pub use transport::Request;
pub use transport::RequestHandler;
pub use transport::ServingGuard;
pub use transport::TransportError;
pub use transport::VoteReply;
pub use transport::VoteRequest;

// `crate::{root_mod}` holds no code, only `mod` and `pub use` statements. No `mod` is `pub`; types
// are exported individually so each root mod can be organized internally however it needs.
