use crate::grpc::{
    proto_reply, proto_request, ProtoErrorReply, ProtoHeartbeat, ProtoHeartbeatReply, ProtoReply, ProtoRequest,
    ProtoVoteReply, ProtoVoteRequest,
};
use crate::node::{NodeId, Term};
use std::fmt;

/// Every inbound message kind a node understands. Dispatch over this enum is exhaustive; anything
/// that does not decode into one of these variants is answered with `Reply::Error`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    VoteRequest(VoteRequest),
    Heartbeat(Heartbeat),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoteRequest {
    pub term: Term,
    pub candidate_id: NodeId,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Heartbeat {
    pub term: Term,
    pub leader_id: NodeId,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reply {
    Vote(VoteReply),
    Heartbeat(HeartbeatReply),
    Error(ErrorReply),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoteReply {
    pub vote_granted: bool,
    pub term: Term,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeartbeatReply {
    pub ack: bool,
    pub term: Term,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ErrorReply {
    pub message: String,
}

/// The message-type tag of a request, as named on the wire.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MessageType {
    VoteRequest,
    Heartbeat,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::VoteRequest => "vote_request",
            MessageType::Heartbeat => "heartbeat",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Request {
    pub fn message_type(&self) -> MessageType {
        match self {
            Request::VoteRequest(_) => MessageType::VoteRequest,
            Request::Heartbeat(_) => MessageType::Heartbeat,
        }
    }

    pub fn term(&self) -> Term {
        match self {
            Request::VoteRequest(r) => r.term,
            Request::Heartbeat(h) => h.term,
        }
    }
}

impl Reply {
    pub(crate) fn error<S: Into<String>>(message: S) -> Self {
        Reply::Error(ErrorReply {
            message: message.into(),
        })
    }
}

/// Why an inbound message could not be turned into a `Request` or `Reply`.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown message type")]
    UnknownMessageType,
    #[error("missing {0}")]
    MissingField(&'static str),
}

// ------- Conversions --------

impl From<Request> for ProtoRequest {
    fn from(request: Request) -> Self {
        let kind = match request {
            Request::VoteRequest(r) => proto_request::Kind::VoteRequest(ProtoVoteRequest {
                term: r.term.as_u64(),
                candidate_id: r.candidate_id.into_inner(),
            }),
            Request::Heartbeat(h) => proto_request::Kind::Heartbeat(ProtoHeartbeat {
                term: h.term.as_u64(),
                leader_id: h.leader_id.into_inner(),
            }),
        };

        ProtoRequest { kind: Some(kind) }
    }
}

impl std::convert::TryFrom<ProtoRequest> for Request {
    type Error = DecodeError;

    fn try_from(proto: ProtoRequest) -> Result<Self, DecodeError> {
        match proto.kind {
            Some(proto_request::Kind::VoteRequest(r)) => {
                if r.candidate_id.is_empty() {
                    return Err(DecodeError::MissingField("candidate_id"));
                }
                Ok(Request::VoteRequest(VoteRequest {
                    term: Term::new(r.term),
                    candidate_id: NodeId::new(r.candidate_id),
                }))
            }
            Some(proto_request::Kind::Heartbeat(h)) => {
                if h.leader_id.is_empty() {
                    return Err(DecodeError::MissingField("leader_id"));
                }
                Ok(Request::Heartbeat(Heartbeat {
                    term: Term::new(h.term),
                    leader_id: NodeId::new(h.leader_id),
                }))
            }
            None => Err(DecodeError::UnknownMessageType),
        }
    }
}

impl From<Reply> for ProtoReply {
    fn from(reply: Reply) -> Self {
        let kind = match reply {
            Reply::Vote(v) => proto_reply::Kind::Vote(ProtoVoteReply {
                vote_granted: v.vote_granted,
                term: v.term.as_u64(),
            }),
            Reply::Heartbeat(h) => proto_reply::Kind::Heartbeat(ProtoHeartbeatReply {
                ack: h.ack,
                term: h.term.as_u64(),
            }),
            Reply::Error(e) => proto_reply::Kind::Error(ProtoErrorReply { message: e.message }),
        };

        ProtoReply { kind: Some(kind) }
    }
}

impl std::convert::TryFrom<ProtoReply> for Reply {
    type Error = DecodeError;

    fn try_from(proto: ProtoReply) -> Result<Self, DecodeError> {
        match proto.kind {
            Some(proto_reply::Kind::Vote(v)) => Ok(Reply::Vote(VoteReply {
                vote_granted: v.vote_granted,
                term: Term::new(v.term),
            })),
            Some(proto_reply::Kind::Heartbeat(h)) => Ok(Reply::Heartbeat(HeartbeatReply {
                ack: h.ack,
                term: Term::new(h.term),
            })),
            Some(proto_reply::Kind::Error(e)) => Ok(Reply::Error(ErrorReply { message: e.message })),
            None => Err(DecodeError::UnknownMessageType),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn unset_request_kind_is_unknown_type() {
        let result = Request::try_from(ProtoRequest { kind: None });
        assert_eq!(result, Err(DecodeError::UnknownMessageType));
    }

    #[test]
    fn request_without_sender_id_is_rejected() {
        let proto = ProtoRequest {
            kind: Some(proto_request::Kind::Heartbeat(ProtoHeartbeat {
                term: 4,
                leader_id: String::new(),
            })),
        };
        assert_eq!(Request::try_from(proto), Err(DecodeError::MissingField("leader_id")));
    }

    #[test]
    fn vote_request_wire_shape() {
        let request = Request::VoteRequest(VoteRequest {
            term: Term::new(3),
            candidate_id: NodeId::new("node-a"),
        });
        assert_eq!(request.message_type().as_str(), "vote_request");

        let proto = ProtoRequest::from(request.clone());
        match &proto.kind {
            Some(proto_request::Kind::VoteRequest(r)) => {
                assert_eq!(r.term, 3);
                assert_eq!(r.candidate_id, "node-a");
            }
            other => panic!("Unexpected kind: {:?}", other),
        }
        assert_eq!(Request::try_from(proto), Ok(request));
    }

    #[test]
    fn error_reply_survives_wire() {
        let reply = Reply::error("unknown type");
        assert_eq!(Reply::try_from(ProtoReply::from(reply.clone())), Ok(reply));
        assert_eq!(
            Reply::try_from(ProtoReply { kind: None }),
            Err(DecodeError::UnknownMessageType)
        );
    }
}
