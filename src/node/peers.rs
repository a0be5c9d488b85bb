use std::collections::HashMap;
use std::fmt;

/// NodeId identifies one cluster member. Immutable for the lifetime of the process.
#[derive(Clone, Hash, Eq, Ord, PartialOrd, PartialEq)]
pub struct NodeId(String);

impl NodeId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a cluster member accepts requests.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct PeerAddress {
    pub host: String,
    pub port: u16,
}

impl PeerAddress {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        PeerAddress { host: host.into(), port }
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Peer {
    pub id: NodeId,
    pub address: PeerAddress,
}

/// ClusterTracker is the static peer registry of one node: everyone in the cluster except me.
pub(crate) struct ClusterTracker {
    my_node_id: NodeId,
    my_address: PeerAddress,
    peers: HashMap<NodeId, Peer>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum InvalidCluster {
    #[error("my node ID {0:?} is not in cluster config")]
    MeNotInCluster(NodeId),
    #[error("node ID {0:?} appears more than once in cluster config")]
    DuplicateNodeId(NodeId),
}

impl ClusterTracker {
    pub(crate) fn create_valid_cluster(
        my_node_id: NodeId,
        members: Vec<(NodeId, PeerAddress)>,
    ) -> Result<Self, InvalidCluster> {
        let mut my_address = None;
        let mut peers = HashMap::with_capacity(members.len());
        for (id, address) in members {
            if id == my_node_id {
                if my_address.replace(address).is_some() {
                    return Err(InvalidCluster::DuplicateNodeId(id));
                }
                continue;
            }
            if peers.contains_key(&id) {
                return Err(InvalidCluster::DuplicateNodeId(id));
            }
            peers.insert(id.clone(), Peer { id, address });
        }

        let my_address = my_address.ok_or_else(|| InvalidCluster::MeNotInCluster(my_node_id.clone()))?;

        Ok(ClusterTracker {
            my_node_id,
            my_address,
            peers,
        })
    }

    pub(crate) fn my_node_id(&self) -> &NodeId {
        &self.my_node_id
    }

    pub(crate) fn my_address(&self) -> &PeerAddress {
        &self.my_address
    }

    pub(crate) fn contains_member(&self, node_id: &NodeId) -> bool {
        *node_id == self.my_node_id || self.peers.contains_key(node_id)
    }

    #[cfg(test)]
    pub(crate) fn peer(&self, node_id: &NodeId) -> Option<&Peer> {
        self.peers.get(node_id)
    }

    pub(crate) fn iter_peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    /// Cluster size N, including me.
    pub(crate) fn num_voting_members(&self) -> usize {
        self.peers.len() + 1
    }
}
