use crate::api::options::ElectionOptions;
use crate::node::{NodeId, PeerAddress};

/// One cluster member as configured at startup. Membership is fixed for the process lifetime.
#[derive(Clone, Debug)]
pub struct MemberInfo {
    pub node_id: String,
    pub host: String,
    pub port: u16,
}

impl MemberInfo {
    pub fn new<S: Into<String>, H: Into<String>>(node_id: S, host: H, port: u16) -> Self {
        MemberInfo {
            node_id: node_id.into(),
            host: host.into(),
            port,
        }
    }

    pub(super) fn into_member(self) -> (NodeId, PeerAddress) {
        (NodeId::new(self.node_id), PeerAddress::new(self.host, self.port))
    }
}

pub struct NodeConfig {
    pub my_node_id: String,
    /// Every member of the cluster, including me.
    pub cluster_members: Vec<MemberInfo>,
    pub logger: slog::Logger,
    pub options: ElectionOptions,
}
