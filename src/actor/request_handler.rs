use crate::actor::{NodeStopped, WeakActorClient};
use crate::transport::{HeartbeatReply, Reply, Request, RequestHandler, VoteReply};

/// NodeRequestHandler feeds inbound requests to the node's event loop and turns the outcome into
/// the reply the sender expects. Protocol-level rejections become a negative reply carrying our
/// term, so a stale sender learns it is stale.
pub(crate) struct NodeRequestHandler {
    logger: slog::Logger,
    actor_client: WeakActorClient,
}

impl NodeRequestHandler {
    pub(crate) fn new(logger: slog::Logger, actor_client: WeakActorClient) -> Self {
        NodeRequestHandler { logger, actor_client }
    }

    fn stopped_reply(&self, request_type: &str) -> Reply {
        slog::debug!(self.logger, "Dropping inbound {}: {}", request_type, NodeStopped);
        Reply::error(NodeStopped.to_string())
    }
}

#[async_trait::async_trait]
impl RequestHandler for NodeRequestHandler {
    async fn handle(&self, request: Request) -> Reply {
        let message_type = request.message_type();
        match request {
            Request::VoteRequest(input) => match self.actor_client.request_vote(input).await {
                Ok(Ok(reply)) => Reply::Vote(reply),
                Ok(Err(e)) => {
                    slog::debug!(self.logger, "Denying {}: {}", message_type, e);
                    Reply::Vote(VoteReply {
                        vote_granted: false,
                        term: e.current_term(),
                    })
                }
                Err(NodeStopped) => self.stopped_reply(message_type.as_str()),
            },
            Request::Heartbeat(input) => match self.actor_client.heartbeat(input).await {
                Ok(Ok(reply)) => Reply::Heartbeat(reply),
                Ok(Err(e)) => {
                    slog::debug!(self.logger, "Rejecting {}: {}", message_type, e);
                    Reply::Heartbeat(HeartbeatReply {
                        ack: false,
                        term: e.current_term(),
                    })
                }
                Err(NodeStopped) => self.stopped_reply(message_type.as_str()),
            },
        }
    }
}
