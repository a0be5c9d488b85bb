use crate::node::{NodeId, Term};
use crate::transport::{HeartbeatReply, TransportError, VoteReply};
use std::fmt;

/// Role of a node in the election protocol. Exactly one at any instant.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Follower => f.write_str("follower"),
            Role::Candidate => f.write_str("candidate"),
            Role::Leader => f.write_str("leader"),
        }
    }
}

/// Point-in-time view of a node's election bookkeeping.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeStatus {
    pub node_id: NodeId,
    pub term: Term,
    pub role: Role,
    pub voted_for: Option<NodeId>,
    pub leader_id: Option<NodeId>,
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub(crate) enum RequestVoteError {
    #[error("candidate term is stale, current term is {current_term:?}")]
    RequestTermOutOfDate { current_term: Term },
    #[error("candidate is not a member of this cluster")]
    CandidateNotInCluster { current_term: Term },
}

impl RequestVoteError {
    pub(crate) fn current_term(&self) -> Term {
        match self {
            RequestVoteError::RequestTermOutOfDate { current_term }
            | RequestVoteError::CandidateNotInCluster { current_term } => *current_term,
        }
    }
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub(crate) enum HeartbeatError {
    #[error("leader term is stale, current term is {current_term:?}")]
    LeaderTermOutOfDate { current_term: Term },
    #[error("leader is not a member of this cluster")]
    LeaderNotInCluster { current_term: Term },
    #[error("I am leader of term {current_term:?} myself")]
    ConflictingLeader { current_term: Term },
}

impl HeartbeatError {
    pub(crate) fn current_term(&self) -> Term {
        match self {
            HeartbeatError::LeaderTermOutOfDate { current_term }
            | HeartbeatError::LeaderNotInCluster { current_term }
            | HeartbeatError::ConflictingLeader { current_term } => *current_term,
        }
    }
}

/// Outcome of one vote request we sent as candidate for `term`.
#[derive(Debug)]
pub(crate) struct VoteReplyFromPeer {
    pub peer_id: NodeId,
    pub term: Term,
    pub result: Result<VoteReply, TransportError>,
}

/// Outcome of one heartbeat we sent as leader for `term`.
#[derive(Debug)]
pub(crate) struct HeartbeatReplyFromPeer {
    pub peer_id: NodeId,
    pub term: Term,
    pub result: Result<HeartbeatReply, TransportError>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct HeartbeatTick {
    pub term: Term,
}
