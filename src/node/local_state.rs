use crate::node::peers::NodeId;
use std::fmt;

/// Term is the logical clock of the election protocol. A node's local term never decreases.
#[derive(Copy, Clone, Default, Hash, Eq, Ord, PartialOrd, PartialEq)]
pub struct Term(u64);

impl Term {
    pub fn new(term: u64) -> Self {
        Term(term)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The term after this one, or None if the term space is exhausted.
    pub(crate) fn next(&self) -> Option<Term> {
        self.0.checked_add(1).map(Term)
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// PersistentLocalState holds the term and vote of this node. Everything that must survive for
/// the at-most-one-vote-per-term guarantee goes through here.
///
/// Store methods behave like CAS operations: they return true iff they mutated state.
pub(crate) trait PersistentLocalState: Send {
    /// Set current term to `new_term` iff it is larger than current term. Clears the vote.
    fn store_term_if_increased(&mut self, new_term: Term) -> bool;

    /// Record `vote` for `expected_current_term` iff that is still the current term and we have
    /// either not voted yet, or already voted for the same node (a retried request).
    fn store_vote_for_term_if_unvoted(&mut self, expected_current_term: Term, vote: &NodeId) -> bool;

    /// Return the new term. Used when transitioning to candidate. Returns None, and changes
    /// nothing, if the current term is already the largest representable term.
    fn increment_term_and_vote_for_self(&mut self) -> Option<Term>;

    fn current_term(&self) -> Term;
    fn voted_for_current_term(&self) -> (Term, Option<NodeId>);
}

// Not durable. A restarted node comes back at term 0, which is acceptable since it starts as a
// follower that has not voted, and it will adopt the cluster's term on the first message it sees.
pub(crate) struct VolatileLocalState {
    current_term: Term,
    voted_for_this_term: Option<NodeId>,
    my_node_id: NodeId,
}

impl VolatileLocalState {
    pub(crate) fn new(my_node_id: NodeId) -> Self {
        VolatileLocalState {
            current_term: Term::new(0),
            voted_for_this_term: None,
            my_node_id,
        }
    }
}

impl PersistentLocalState for VolatileLocalState {
    fn store_term_if_increased(&mut self, new_term: Term) -> bool {
        if new_term <= self.current_term {
            false
        } else {
            self.current_term = new_term;
            self.voted_for_this_term = None;
            true
        }
    }

    fn store_vote_for_term_if_unvoted(&mut self, expected_term: Term, vote: &NodeId) -> bool {
        if expected_term != self.current_term {
            return false;
        }

        match &self.voted_for_this_term {
            None => {
                self.voted_for_this_term.replace(vote.clone());
                true
            }
            Some(existing) => existing == vote,
        }
    }

    fn increment_term_and_vote_for_self(&mut self) -> Option<Term> {
        let new_term = self.current_term.next()?;
        self.current_term = new_term;
        self.voted_for_this_term.replace(self.my_node_id.clone());

        Some(new_term)
    }

    fn current_term(&self) -> Term {
        self.current_term
    }

    fn voted_for_current_term(&self) -> (Term, Option<NodeId>) {
        (self.current_term, self.voted_for_this_term.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> VolatileLocalState {
        VolatileLocalState::new(NodeId::new("me"))
    }

    #[test]
    fn term_only_ratchets_forward() {
        let mut ls = state();
        assert!(ls.store_term_if_increased(Term::new(3)));
        assert!(!ls.store_term_if_increased(Term::new(3)));
        assert!(!ls.store_term_if_increased(Term::new(2)));
        assert_eq!(ls.current_term(), Term::new(3));
    }

    #[test]
    fn increased_term_clears_vote() {
        let mut ls = state();
        let candidate = NodeId::new("other");
        assert!(ls.store_vote_for_term_if_unvoted(Term::new(0), &candidate));
        assert_eq!(ls.voted_for_current_term(), (Term::new(0), Some(candidate)));

        ls.store_term_if_increased(Term::new(1));
        assert_eq!(ls.voted_for_current_term(), (Term::new(1), None));
    }

    #[test]
    fn single_vote_per_term() {
        let mut ls = state();
        ls.store_term_if_increased(Term::new(5));

        let a = NodeId::new("a");
        let b = NodeId::new("b");
        assert!(ls.store_vote_for_term_if_unvoted(Term::new(5), &a));
        // Retry from the same candidate is idempotent.
        assert!(ls.store_vote_for_term_if_unvoted(Term::new(5), &a));
        assert!(!ls.store_vote_for_term_if_unvoted(Term::new(5), &b));
        // Wrong term never records a vote.
        assert!(!ls.store_vote_for_term_if_unvoted(Term::new(4), &b));
        assert_eq!(ls.voted_for_current_term(), (Term::new(5), Some(a)));
    }

    #[test]
    fn candidate_votes_for_self() {
        let mut ls = state();
        ls.store_term_if_increased(Term::new(7));

        let new_term = ls.increment_term_and_vote_for_self();

        assert_eq!(new_term, Some(Term::new(8)));
        assert_eq!(ls.voted_for_current_term(), (Term::new(8), Some(NodeId::new("me"))));
        assert!(!ls.store_vote_for_term_if_unvoted(Term::new(8), &NodeId::new("other")));
    }

    #[test]
    fn exhausted_term_space_refuses_candidacy() {
        let mut ls = state();
        let other = NodeId::new("other");
        ls.store_term_if_increased(Term::new(u64::MAX));
        assert!(ls.store_vote_for_term_if_unvoted(Term::new(u64::MAX), &other));

        assert_eq!(ls.increment_term_and_vote_for_self(), None);
        assert_eq!(ls.voted_for_current_term(), (Term::new(u64::MAX), Some(other)));
    }
}
