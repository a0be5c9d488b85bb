use crate::actor::WeakActorClient;
use crate::node::election::state_change_listener::{self, ElectionStateChangeNotifier};
use crate::node::election::timers::{ElectionTimerHandle, HeartbeatTimerHandle};
use crate::node::election::{ElectionStateChangeListener, ElectionStateSnapshot};
use crate::node::{NodeId, Role, Term};
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::time::Duration;

#[derive(Clone)]
pub(crate) struct ElectionConfig {
    pub my_node_id: NodeId,
    pub heartbeat_interval: Duration,
    pub election_timeout: Range<Duration>,
}

/// ElectionState holds what is specific to the node's current role, including the timer task
/// that role needs. Its methods are responsible for "what" to do. It does NOT validate terms or
/// votes, or decide "when" to transition; the node does.
///
/// Replacing `state` drops the previous role's timer handle, which stops that timer.
pub(crate) struct ElectionState {
    state: State,
    term: Term,
    config: ElectionConfig,
    actor_client: WeakActorClient,
    state_change_notifier: ElectionStateChangeNotifier,
}

enum State {
    // Held only so the heartbeat timer runs for as long as we lead this term.
    Leader(HeartbeatTimerHandle),
    Candidate(CandidateState),
    Follower(FollowerState),
}

struct CandidateState {
    received_votes_from: HashSet<NodeId>,
    election_timer: ElectionTimerHandle,
}

struct FollowerState {
    leader: Option<NodeId>,
    election_timer: ElectionTimerHandle,
}

impl ElectionState {
    /// `new_follower()` creates a new ElectionState instance that starts out as a follower.
    pub(crate) fn new_follower(
        config: ElectionConfig,
        actor_client: WeakActorClient,
        term: Term,
    ) -> (Self, ElectionStateChangeListener) {
        let initial_state = State::Follower(FollowerState {
            leader: None,
            election_timer: ElectionTimerHandle::spawn_timer_task(
                config.election_timeout.clone(),
                actor_client.clone(),
            ),
        });
        let (notifier, listener) = state_change_listener::new(Self::snapshot(&initial_state, term));

        let election_state = ElectionState {
            state: initial_state,
            term,
            config,
            actor_client,
            state_change_notifier: notifier,
        };

        (election_state, listener)
    }

    pub(crate) fn transition_to_follower(&mut self, term: Term, leader: Option<NodeId>) {
        self.state = State::Follower(FollowerState {
            leader,
            election_timer: self.new_election_timer(),
        });
        self.term = term;
        self.notify_new_state();
    }

    pub(crate) fn transition_to_candidate_and_vote_for_self(&mut self, term: Term) {
        let mut received_votes_from = HashSet::with_capacity(3);
        received_votes_from.insert(self.config.my_node_id.clone());

        self.state = State::Candidate(CandidateState {
            received_votes_from,
            election_timer: self.new_election_timer(),
        });
        self.term = term;
        self.notify_new_state();
    }

    pub(crate) fn transition_to_leader(&mut self, term: Term) {
        self.state = State::Leader(HeartbeatTimerHandle::spawn_timer_task(
            self.config.heartbeat_interval,
            self.actor_client.clone(),
            term,
        ));
        self.term = term;
        self.notify_new_state();
    }

    fn new_election_timer(&self) -> ElectionTimerHandle {
        ElectionTimerHandle::spawn_timer_task(self.config.election_timeout.clone(), self.actor_client.clone())
    }

    pub(crate) fn role(&self) -> Role {
        match &self.state {
            State::Leader(_) => Role::Leader,
            State::Candidate(_) => Role::Candidate,
            State::Follower(_) => Role::Follower,
        }
    }

    pub(crate) fn leader_id(&self) -> Option<NodeId> {
        match &self.state {
            State::Leader(_) => Some(self.config.my_node_id.clone()),
            State::Candidate(_) => None,
            State::Follower(fs) => fs.leader.clone(),
        }
    }

    pub(crate) fn current_state(&self) -> ElectionStateSnapshot {
        Self::snapshot(&self.state, self.term)
    }

    fn snapshot(state: &State, term: Term) -> ElectionStateSnapshot {
        match state {
            State::Leader(_) => ElectionStateSnapshot::Leader(term),
            State::Candidate(_) => ElectionStateSnapshot::Candidate(term),
            State::Follower(FollowerState { leader: None, .. }) => ElectionStateSnapshot::FollowerNoLeader(term),
            State::Follower(FollowerState {
                leader: Some(leader_id),
                ..
            }) => ElectionStateSnapshot::Follower(term, leader_id.clone()),
        }
    }

    fn notify_new_state(&self) {
        self.state_change_notifier.notify_new_state(self.current_state());
    }

    pub(crate) fn reset_timeout_if_follower(&self) {
        if let State::Follower(fs) = &self.state {
            fs.election_timer.reset_timeout();
        }
    }

    /// True iff we are follower/candidate and the election deadline has really passed. A timeout
    /// event can be stale if a heartbeat or vote grant was handled after the timer fired.
    pub(crate) fn is_election_timeout_due(&self) -> bool {
        match &self.state {
            State::Leader(_) => false,
            State::Candidate(cs) => cs.election_timer.is_expired(),
            State::Follower(fs) => fs.election_timer.is_expired(),
        }
    }

    /// Accept `leader_id` as leader of the current term. A candidate gives up its candidacy.
    /// Returns false if we are leader ourselves.
    pub(crate) fn accept_leader(&mut self, leader_id: &NodeId) -> bool {
        if let State::Candidate(_) = self.state {
            self.transition_to_follower(self.term, Some(leader_id.clone()));
            return true;
        }

        let leader_changed = match &mut self.state {
            State::Leader(_) => return false,
            State::Candidate(_) => false,
            State::Follower(fs) => {
                let changed = fs.leader.as_ref() != Some(leader_id);
                if changed {
                    fs.leader.replace(leader_id.clone());
                }
                changed
            }
        };

        if leader_changed {
            self.notify_new_state();
        }
        true
    }

    /// Return number of unique votes received if candidate, or None if no longer Candidate.
    pub(crate) fn add_vote_if_candidate(&mut self, vote_from: NodeId) -> Option<usize> {
        if let State::Candidate(cs) = &mut self.state {
            cs.received_votes_from.insert(vote_from);
            Some(cs.received_votes_from.len())
        } else {
            None
        }
    }
}

impl fmt::Debug for ElectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            State::Leader(_) => write!(f, "Leader(Term={:?})", self.term),
            State::Candidate(cs) => write!(
                f,
                "Candidate(Term={:?}, Votes={})",
                self.term,
                cs.received_votes_from.len()
            ),
            State::Follower(FollowerState {
                leader: Some(leader_id),
                ..
            }) => write!(f, "Follower(Term={:?}, Leader={:?})", self.term, leader_id),
            State::Follower(FollowerState { leader: None, .. }) => {
                write!(f, "Follower(Term={:?}, Leader=None)", self.term)
            }
        }
    }
}
