mod request_handler;

pub(crate) use request_handler::NodeRequestHandler;

use crate::node::{
    ConsensusNode, HeartbeatError, HeartbeatReplyFromPeer, HeartbeatTick, NodeStatus, RequestVoteError,
    VoteReplyFromPeer,
};
use crate::transport::{Heartbeat, HeartbeatReply, VoteReply, VoteRequest};
use std::fmt::Debug;
use tokio::sync::{mpsc, oneshot};

/// All mutation of a node's term, role, vote and leader happens on this actor's event loop, one
/// event at a time. Everything else (timers, RPC handlers, outbound RPC tasks) talks to it
/// through an `ActorClient`.
#[derive(Debug)]
pub(crate) enum Event {
    // Leader: Grant vote if applicable. Transition to follower if term increased.
    // Candidate: Grant vote if applicable. Transition to follower if term increased.
    // Follower: Grant vote if applicable. Reset election timer on grant.
    RequestVote(VoteRequest, Callback<VoteReply, RequestVoteError>),

    // Leader: Step down if term increased.
    // Candidate: Transition to follower.
    // Follower: Reset election timer. Remember leader.
    Heartbeat(Heartbeat, Callback<HeartbeatReply, HeartbeatError>),

    // Leader: discard
    // Candidate: Tally vote. Transition to leader if quorum.
    // Follower: discard
    VoteReplyFromPeer(VoteReplyFromPeer),

    // Leader: Step down if peer has a higher term. Mark peer alive otherwise.
    // Candidate: discard
    // Follower: discard
    HeartbeatReplyFromPeer(HeartbeatReplyFromPeer),

    // Leader: Broadcast heartbeat to every peer.
    // Candidate: discard
    // Follower: discard
    HeartbeatTick(HeartbeatTick),

    // Leader: discard
    // Candidate: Start a new election for the next term.
    // Follower: Transition to candidate. Start a new election.
    ElectionTimeout,

    Status(oneshot::Sender<NodeStatus>),
    Shutdown(oneshot::Sender<()>),
}

pub(crate) struct Callback<O: Debug, E: Debug>(oneshot::Sender<Result<O, E>>);

impl<O: Debug, E: Debug> Callback<O, E> {
    pub(crate) fn send(self, message: Result<O, E>) {
        let _ = self.0.send(message);
    }
}

impl<O: Debug, E: Debug> Debug for Callback<O, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Callback")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("node event loop has exited")]
pub struct NodeStopped;

#[derive(Clone)]
pub(crate) struct ActorClient {
    sender: mpsc::Sender<Event>,
}

/// WeakActorClient does not keep the event loop alive. Background tasks hold this one so that
/// their late results are silently discarded once the node is stopped.
#[derive(Clone)]
pub(crate) struct WeakActorClient {
    sender: mpsc::WeakSender<Event>,
}

impl ActorClient {
    pub(crate) fn new(buffer_size: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        (ActorClient { sender: tx }, rx)
    }

    pub(crate) fn weak(&self) -> WeakActorClient {
        WeakActorClient {
            sender: self.sender.downgrade(),
        }
    }

    pub(crate) async fn request_vote(
        &self,
        input: VoteRequest,
    ) -> Result<Result<VoteReply, RequestVoteError>, NodeStopped> {
        let (tx, rx) = oneshot::channel();
        self.send(Event::RequestVote(input, Callback(tx))).await?;
        rx.await.map_err(|_| NodeStopped)
    }

    pub(crate) async fn heartbeat(
        &self,
        input: Heartbeat,
    ) -> Result<Result<HeartbeatReply, HeartbeatError>, NodeStopped> {
        let (tx, rx) = oneshot::channel();
        self.send(Event::Heartbeat(input, Callback(tx))).await?;
        rx.await.map_err(|_| NodeStopped)
    }

    pub(crate) async fn notify_vote_reply_from_peer(&self, input: VoteReplyFromPeer) -> Result<(), NodeStopped> {
        self.send(Event::VoteReplyFromPeer(input)).await
    }

    pub(crate) async fn notify_heartbeat_reply_from_peer(
        &self,
        input: HeartbeatReplyFromPeer,
    ) -> Result<(), NodeStopped> {
        self.send(Event::HeartbeatReplyFromPeer(input)).await
    }

    pub(crate) async fn heartbeat_tick(&self, input: HeartbeatTick) -> Result<(), NodeStopped> {
        self.send(Event::HeartbeatTick(input)).await
    }

    pub(crate) async fn election_timeout(&self) -> Result<(), NodeStopped> {
        self.send(Event::ElectionTimeout).await
    }

    pub(crate) async fn status(&self) -> Result<NodeStatus, NodeStopped> {
        let (tx, rx) = oneshot::channel();
        self.send(Event::Status(tx)).await?;
        rx.await.map_err(|_| NodeStopped)
    }

    pub(crate) async fn shutdown(&self) -> Result<(), NodeStopped> {
        let (tx, rx) = oneshot::channel();
        self.send(Event::Shutdown(tx)).await?;
        rx.await.map_err(|_| NodeStopped)
    }

    async fn send(&self, event: Event) -> Result<(), NodeStopped> {
        self.sender.send(event).await.map_err(|_| NodeStopped)
    }
}

impl WeakActorClient {
    fn upgrade(&self) -> Result<ActorClient, NodeStopped> {
        self.sender
            .upgrade()
            .map(|sender| ActorClient { sender })
            .ok_or(NodeStopped)
    }

    pub(crate) async fn request_vote(
        &self,
        input: VoteRequest,
    ) -> Result<Result<VoteReply, RequestVoteError>, NodeStopped> {
        self.upgrade()?.request_vote(input).await
    }

    pub(crate) async fn heartbeat(
        &self,
        input: Heartbeat,
    ) -> Result<Result<HeartbeatReply, HeartbeatError>, NodeStopped> {
        self.upgrade()?.heartbeat(input).await
    }

    pub(crate) async fn notify_vote_reply_from_peer(&self, input: VoteReplyFromPeer) -> Result<(), NodeStopped> {
        self.upgrade()?.notify_vote_reply_from_peer(input).await
    }

    pub(crate) async fn notify_heartbeat_reply_from_peer(
        &self,
        input: HeartbeatReplyFromPeer,
    ) -> Result<(), NodeStopped> {
        self.upgrade()?.notify_heartbeat_reply_from_peer(input).await
    }

    pub(crate) async fn heartbeat_tick(&self, input: HeartbeatTick) -> Result<(), NodeStopped> {
        self.upgrade()?.heartbeat_tick(input).await
    }

    pub(crate) async fn election_timeout(&self) -> Result<(), NodeStopped> {
        self.upgrade()?.election_timeout().await
    }
}

/// NodeActor is node logic in actor model.
pub(crate) struct NodeActor {
    logger: slog::Logger,
    receiver: mpsc::Receiver<Event>,
    node: ConsensusNode,
}

impl NodeActor {
    pub(crate) fn new(logger: slog::Logger, receiver: mpsc::Receiver<Event>, node: ConsensusNode) -> Self {
        NodeActor { logger, receiver, node }
    }

    pub(crate) async fn run_event_loop(self) {
        let NodeActor {
            logger,
            mut receiver,
            mut node,
        } = self;

        while let Some(event) = receiver.recv().await {
            if let Some(ack) = Self::handle_event(&mut node, event) {
                slog::info!(logger, "Shutting down event loop.");
                // Dropping the node cancels its election timer and heartbeat loop before we ack.
                drop(node);
                receiver.close();
                let _ = ack.send(());
                return;
            }
        }

        slog::info!(logger, "All actor clients dropped. Event loop exiting.");
    }

    // This must NOT be async. Anything that waits on the network is spawned and comes back to us
    // as another event. Returns the shutdown ack when the loop should stop.
    fn handle_event(node: &mut ConsensusNode, event: Event) -> Option<oneshot::Sender<()>> {
        match event {
            Event::RequestVote(input, callback) => {
                callback.send(node.handle_request_vote(input));
            }
            Event::Heartbeat(input, callback) => {
                callback.send(node.handle_heartbeat(input));
            }
            Event::VoteReplyFromPeer(input) => node.handle_vote_reply_from_peer(input),
            Event::HeartbeatReplyFromPeer(input) => node.handle_heartbeat_reply_from_peer(input),
            Event::HeartbeatTick(input) => node.handle_heartbeat_tick(input),
            Event::ElectionTimeout => node.handle_election_timeout(),
            Event::Status(tx) => {
                let _ = tx.send(node.status());
            }
            Event::Shutdown(ack) => return Some(ack),
        }

        None
    }
}
