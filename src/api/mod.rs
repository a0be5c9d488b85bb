//! This mod holds the client-facing API: configuration, wiring, and the node handle.
mod event_bus;
mod node;
mod options;
mod types;
mod wiring;

pub use event_bus::ElectionEvent;
pub use event_bus::EventListener;
pub use node::ClusterNode;
pub use options::ElectionOptions;
pub use types::MemberInfo;
pub use types::NodeConfig;
pub use wiring::create_node_with_transport;
pub use wiring::try_create_node;
pub use wiring::NodeCreationError;
