use crate::node::ElectionStateChangeListener;
use crate::node::ElectionStateSnapshot;
use crate::node::{NodeId, Term};

/// An election event as observed by the local node.
///
/// Consuming these is subtle: intermediate events are not queued. If several role changes happen
/// between two calls to `next_event()`, only the most recent one is returned.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ElectionEvent {
    Leader { term: Term },
    Candidate { term: Term },
    Follower { term: Term, leader_id: NodeId },
    FollowerNoLeader { term: Term },
}

impl ElectionEvent {
    pub fn term(&self) -> Term {
        match self {
            ElectionEvent::Leader { term }
            | ElectionEvent::Candidate { term }
            | ElectionEvent::Follower { term, .. }
            | ElectionEvent::FollowerNoLeader { term } => *term,
        }
    }
}

#[derive(Clone)]
pub struct EventListener {
    election_state_change_listener: ElectionStateChangeListener,
}

impl EventListener {
    pub(crate) fn new(election_state_change_listener: ElectionStateChangeListener) -> Self {
        EventListener {
            election_state_change_listener,
        }
    }

    /// `next_event()` waits for the next role change. Returns None once the node has shut down.
    pub async fn next_event(&mut self) -> Option<ElectionEvent> {
        self.election_state_change_listener
            .next()
            .await
            .map(ElectionEvent::from)
    }

    /// The latest state, without waiting.
    pub fn current(&self) -> ElectionEvent {
        ElectionEvent::from(self.election_state_change_listener.current())
    }
}

// ------- Conversions --------

impl From<ElectionStateSnapshot> for ElectionEvent {
    fn from(election_state: ElectionStateSnapshot) -> Self {
        match election_state {
            ElectionStateSnapshot::Leader(term) => ElectionEvent::Leader { term },
            ElectionStateSnapshot::Candidate(term) => ElectionEvent::Candidate { term },
            ElectionStateSnapshot::Follower(term, leader_id) => ElectionEvent::Follower { term, leader_id },
            ElectionStateSnapshot::FollowerNoLeader(term) => ElectionEvent::FollowerNoLeader { term },
        }
    }
}
