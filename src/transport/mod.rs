mod api;
mod grpc;
mod local;
mod message;

pub use api::PeerTransport;
pub use api::RequestHandler;
pub use api::ServingGuard;
pub use api::TransportError;
pub use grpc::GrpcTransport;
pub use local::LocalNetwork;
pub use local::LocalTransport;
pub use message::DecodeError;
pub use message::ErrorReply;
pub use message::Heartbeat;
pub use message::HeartbeatReply;
pub use message::MessageType;
pub use message::Reply;
pub use message::Request;
pub use message::VoteReply;
pub use message::VoteRequest;
