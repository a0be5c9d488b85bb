use crate::actor::WeakActorClient;
use crate::failure_detector::FailureDetector;
use crate::node::election::ElectionState;
use crate::node::local_state::PersistentLocalState;
use crate::node::node_api::{
    HeartbeatError, HeartbeatReplyFromPeer, HeartbeatTick, NodeStatus, RequestVoteError, VoteReplyFromPeer,
};
use crate::node::peers::{ClusterTracker, NodeId, Peer};
use crate::node::{Role, Term};
use crate::transport::{Heartbeat, HeartbeatReply, PeerTransport, Reply, Request, TransportError, VoteReply, VoteRequest};
use std::sync::Arc;
use tokio::time::Duration;

/// ConsensusNode is the role state machine of one cluster member. It owns term, vote, role and
/// leader, and applies the protocol's safety rules to every message that crosses its boundary.
///
/// It is driven exclusively by the node actor, so its handlers never run concurrently with each
/// other. Anything that waits on the network is spawned and reports back through the actor.
pub(crate) struct ConsensusNode {
    logger: slog::Logger,
    my_node_id: NodeId,
    cluster_tracker: ClusterTracker,
    local_state: Box<dyn PersistentLocalState>,
    election_state: ElectionState,
    transport: Arc<dyn PeerTransport>,
    failure_detector: FailureDetector,
    actor_client: WeakActorClient,
    rpc_timeout: Duration,
}

pub(crate) struct ConsensusNodeConfig {
    pub logger: slog::Logger,
    pub cluster_tracker: ClusterTracker,
    pub local_state: Box<dyn PersistentLocalState>,
    pub election_state: ElectionState,
    pub transport: Arc<dyn PeerTransport>,
    pub failure_detector: FailureDetector,
    pub actor_client: WeakActorClient,
    pub rpc_timeout: Duration,
}

impl ConsensusNode {
    pub(crate) fn new(config: ConsensusNodeConfig) -> Self {
        ConsensusNode {
            logger: config.logger,
            my_node_id: config.cluster_tracker.my_node_id().clone(),
            cluster_tracker: config.cluster_tracker,
            local_state: config.local_state,
            election_state: config.election_state,
            transport: config.transport,
            failure_detector: config.failure_detector,
            actor_client: config.actor_client,
            rpc_timeout: config.rpc_timeout,
        }
    }

    pub(crate) fn status(&self) -> NodeStatus {
        let (term, voted_for) = self.local_state.voted_for_current_term();
        NodeStatus {
            node_id: self.my_node_id.clone(),
            term,
            role: self.election_state.role(),
            voted_for,
            leader_id: self.election_state.leader_id(),
        }
    }

    /// > If RPC request or response contains term T > currentTerm:
    /// > set currentTerm = T, convert to follower (§5.1)
    ///
    /// Applied at every message boundary, inbound and outbound. Returns true if the term advanced.
    pub(crate) fn observe_term(&mut self, remote_term: Term) -> bool {
        let previous_role = self.election_state.role();
        let increased = self.local_state.store_term_if_increased(remote_term);
        if increased {
            self.election_state.transition_to_follower(remote_term, None);
            slog::info!(
                self.logger,
                "Observed term {:?}. Stepping down from {} to follower.",
                remote_term,
                previous_role
            );
        }

        increased
    }

    // ------- Responder side --------

    pub(crate) fn handle_request_vote(&mut self, input: VoteRequest) -> Result<VoteReply, RequestVoteError> {
        let current_term = self.local_state.current_term();

        // Ensure candidate is known member.
        if !self.cluster_tracker.contains_member(&input.candidate_id) {
            slog::warn!(self.logger, "Not granting vote. {:?} is not in the cluster.", input.candidate_id);
            return Err(RequestVoteError::CandidateNotInCluster { current_term });
        }

        // 1. Reply false if term < currentTerm (§5.1)
        if input.term < current_term {
            slog::info!(
                self.logger,
                "Not granting vote to {:?}. Candidate term {:?} is out of date.",
                input.candidate_id,
                input.term
            );
            return Err(RequestVoteError::RequestTermOutOfDate { current_term });
        }

        self.observe_term(input.term);

        // 2. If votedFor is null or candidateId, grant vote (§5.2). The log comparison of §5.4
        //    is not needed while heartbeats carry no log entries.
        let vote_granted = self
            .local_state
            .store_vote_for_term_if_unvoted(input.term, &input.candidate_id);

        if vote_granted {
            slog::info!(
                self.logger,
                "Voting for {:?} in term {:?}.",
                input.candidate_id,
                input.term
            );
            // A live candidate defers our own candidacy.
            self.election_state.reset_timeout_if_follower();
        } else {
            let (_, voted_for) = self.local_state.voted_for_current_term();
            slog::info!(
                self.logger,
                "Not granting vote to {:?}. Already voted for {:?} in term {:?}.",
                input.candidate_id,
                voted_for,
                input.term
            );
        }

        Ok(VoteReply {
            vote_granted,
            term: self.local_state.current_term(),
        })
    }

    pub(crate) fn handle_heartbeat(&mut self, input: Heartbeat) -> Result<HeartbeatReply, HeartbeatError> {
        let current_term = self.local_state.current_term();

        if !self.cluster_tracker.contains_member(&input.leader_id) {
            slog::warn!(self.logger, "Rejecting heartbeat. {:?} is not in the cluster.", input.leader_id);
            return Err(HeartbeatError::LeaderNotInCluster { current_term });
        }

        if input.term < current_term {
            slog::info!(
                self.logger,
                "Rejecting heartbeat from {:?}. Leader term {:?} is out of date.",
                input.leader_id,
                input.term
            );
            return Err(HeartbeatError::LeaderTermOutOfDate { current_term });
        }

        self.observe_term(input.term);

        if !self.election_state.accept_leader(&input.leader_id) {
            slog::error!(
                self.logger,
                "Received heartbeat from {:?} for term {:?}, but I am leader of that term.",
                input.leader_id,
                input.term
            );
            return Err(HeartbeatError::ConflictingLeader {
                current_term: input.term,
            });
        }

        self.election_state.reset_timeout_if_follower();
        self.failure_detector.mark_heartbeat(&input.leader_id);

        Ok(HeartbeatReply {
            ack: true,
            term: self.local_state.current_term(),
        })
    }

    // ------- Candidate side --------

    pub(crate) fn handle_election_timeout(&mut self) {
        if !self.election_state.is_election_timeout_due() {
            slog::debug!(
                self.logger,
                "Ignoring stale election timeout. Election state: {:?}",
                self.election_state
            );
            return;
        }

        self.become_candidate();
    }

    /// Increment term, vote for self, forget the leader, and ask every peer for its vote.
    pub(crate) fn become_candidate(&mut self) {
        // Vote for self on local state before transitioning to candidate.
        let new_term = match self.local_state.increment_term_and_vote_for_self() {
            Some(term) => term,
            None => {
                slog::error!(
                    self.logger,
                    "Term space exhausted at {:?}. Not starting an election.",
                    self.local_state.current_term()
                );
                return;
            }
        };
        self.election_state.transition_to_candidate_and_vote_for_self(new_term);
        slog::info!(
            self.logger,
            "Election timeout. Changed to candidate. Election state: {:?}",
            self.election_state,
        );

        // A cluster of one is its own quorum.
        if Self::quorum_size(self.cluster_tracker.num_voting_members()) <= 1 {
            self.become_leader(new_term);
            return;
        }

        for peer in self.cluster_tracker.iter_peers() {
            tokio::task::spawn(Self::call_peer_request_vote(
                self.logger.new(slog::o!("Peer" => peer.id.to_string())),
                self.transport.clone(),
                peer.clone(),
                VoteRequest {
                    term: new_term,
                    candidate_id: self.my_node_id.clone(),
                },
                self.rpc_timeout,
                self.actor_client.clone(),
            ));
        }
    }

    pub(crate) fn handle_vote_reply_from_peer(&mut self, reply: VoteReplyFromPeer) {
        let logger = self.logger.new(slog::o!("Peer" => reply.peer_id.to_string()));

        let vote_reply = match reply.result {
            Ok(vote_reply) => vote_reply,
            Err(e) => {
                // A missing reply counts as not granted. No retry within the same term.
                slog::info!(logger, "No vote for term {:?}: {} (transient: {})", reply.term, e, e.is_transient());
                return;
            }
        };

        if self.observe_term(vote_reply.term) {
            return;
        }

        let current_term = self.local_state.current_term();
        if current_term != reply.term {
            slog::info!(
                logger,
                "Received vote for outdated term {:?}, current term: {:?}.",
                reply.term,
                current_term,
            );
            return;
        }

        if !vote_reply.vote_granted {
            slog::info!(logger, "Vote not granted for term {:?}", reply.term);
            return;
        }

        let num_votes_received = match self.election_state.add_vote_if_candidate(reply.peer_id) {
            Some(v) => v,
            None => {
                slog::info!(
                    logger,
                    "Received vote for term {:?} after transitioning to election state: {:?}",
                    reply.term,
                    self.election_state,
                );
                return;
            }
        };

        let num_voting_members = self.cluster_tracker.num_voting_members();
        slog::info!(
            logger,
            "Received {}/{} votes for term {:?}",
            num_votes_received,
            num_voting_members,
            reply.term,
        );

        if num_votes_received >= Self::quorum_size(num_voting_members) {
            self.become_leader(reply.term);
        }
    }

    fn become_leader(&mut self, term: Term) {
        self.election_state.transition_to_leader(term);
        slog::info!(self.logger, "Became leader for term {:?}", term);
    }

    pub(crate) fn quorum_size(num_voting_members: usize) -> usize {
        (num_voting_members / 2) + 1
    }

    async fn call_peer_request_vote(
        logger: slog::Logger,
        transport: Arc<dyn PeerTransport>,
        peer: Peer,
        request: VoteRequest,
        rpc_timeout: Duration,
        callback: WeakActorClient,
    ) {
        let term = request.term;
        let result = match send_with_timeout(&*transport, &peer, Request::VoteRequest(request), rpc_timeout).await {
            Ok(Reply::Vote(vote_reply)) => Ok(vote_reply),
            Ok(other) => Err(unexpected_reply(other)),
            Err(e) => Err(e),
        };
        slog::debug!(logger, "RequestVote result: {:?}", result);

        let callback_input = VoteReplyFromPeer {
            peer_id: peer.id,
            term,
            result,
        };

        // Node stopped meanwhile: the result belongs to a cancelled round and is dropped.
        let _ = callback.notify_vote_reply_from_peer(callback_input).await;
    }

    // ------- Leader side --------

    pub(crate) fn handle_heartbeat_tick(&mut self, tick: HeartbeatTick) {
        let current_term = self.local_state.current_term();
        if current_term != tick.term || self.election_state.role() != Role::Leader {
            slog::debug!(
                self.logger,
                "Received heartbeat tick for term {:?} but no longer leader. Election state: {:?}",
                tick.term,
                self.election_state
            );
            return;
        }

        for peer in self.cluster_tracker.iter_peers() {
            tokio::task::spawn(Self::call_peer_heartbeat(
                self.logger.new(slog::o!("Peer" => peer.id.to_string())),
                self.transport.clone(),
                peer.clone(),
                Heartbeat {
                    term: current_term,
                    leader_id: self.my_node_id.clone(),
                },
                self.rpc_timeout,
                self.actor_client.clone(),
            ));
        }
    }

    pub(crate) fn handle_heartbeat_reply_from_peer(&mut self, reply: HeartbeatReplyFromPeer) {
        let heartbeat_reply = match reply.result {
            Ok(heartbeat_reply) => heartbeat_reply,
            Err(e) => {
                slog::debug!(
                    self.logger,
                    "Heartbeat to {:?} unacknowledged: {} (transient: {})",
                    reply.peer_id,
                    e,
                    e.is_transient()
                );
                return;
            }
        };

        if self.observe_term(heartbeat_reply.term) {
            return;
        }

        if heartbeat_reply.ack
            && reply.term == self.local_state.current_term()
            && self.election_state.role() == Role::Leader
        {
            self.failure_detector.mark_heartbeat(&reply.peer_id);
        }
    }

    async fn call_peer_heartbeat(
        logger: slog::Logger,
        transport: Arc<dyn PeerTransport>,
        peer: Peer,
        heartbeat: Heartbeat,
        rpc_timeout: Duration,
        callback: WeakActorClient,
    ) {
        let term = heartbeat.term;
        let result = match send_with_timeout(&*transport, &peer, Request::Heartbeat(heartbeat), rpc_timeout).await {
            Ok(Reply::Heartbeat(heartbeat_reply)) => Ok(heartbeat_reply),
            Ok(other) => Err(unexpected_reply(other)),
            Err(e) => Err(e),
        };
        slog::trace!(logger, "Heartbeat result: {:?}", result);

        let callback_input = HeartbeatReplyFromPeer {
            peer_id: peer.id,
            term,
            result,
        };

        let _ = callback.notify_heartbeat_reply_from_peer(callback_input).await;
    }
}

// Bounded here too, in case a transport overruns its own timeout.
async fn send_with_timeout(
    transport: &dyn PeerTransport,
    peer: &Peer,
    request: Request,
    rpc_timeout: Duration,
) -> Result<Reply, TransportError> {
    match tokio::time::timeout(rpc_timeout, transport.send(&peer.address, request, rpc_timeout)).await {
        Ok(result) => result,
        Err(_elapsed) => Err(TransportError::Timeout),
    }
}

fn unexpected_reply(reply: Reply) -> TransportError {
    match reply {
        Reply::Error(e) => TransportError::Rejected(e.message),
        other => TransportError::MalformedReply(format!("unexpected reply kind: {:?}", other)),
    }
}
