use cluster_consensus::{
    ClusterNode, DecodeError, ElectionOptions, GrpcTransport, MemberInfo, NodeConfig, NodeCreationError, NodeId,
    PeerAddress, PeerTransport, Reply, Request, Role, Term, TransportError, VoteRequest,
};
use slog::Drain;
use std::error::Error;
use tokio::time::{Duration, Instant};

#[tokio::test]
async fn three_nodes_elect_a_leader_over_grpc() -> Result<(), Box<dyn Error>> {
    let num_members = 3;
    let port_base = 47100;
    let mut nodes = Vec::with_capacity(num_members);
    for i in 0..num_members {
        let node = cluster_consensus::try_create_node(config(i, num_members, port_base)).await?;
        nodes.push(node);
    }

    let (leader_id, term) = wait_for_agreed_leader(&nodes, Duration::from_secs(10)).await;
    println!("Elected {} for term {}", leader_id, term);

    // A vote request for a stale term sent straight over the wire is answered, not dropped.
    let transport = GrpcTransport::new(test_logger());
    let reply = transport
        .send(
            &PeerAddress::new("127.0.0.1", port_base),
            Request::VoteRequest(VoteRequest {
                term: Term::new(0),
                candidate_id: NodeId::new(node_name(1)),
            }),
            Duration::from_secs(1),
        )
        .await?;
    match reply {
        Reply::Vote(vote) => {
            assert!(!vote.vote_granted);
            assert!(vote.term >= term);
        }
        other => panic!("Unexpected reply: {:?}", other),
    }

    for node in nodes.iter_mut() {
        node.shutdown().await;
    }

    // Nothing is listening anymore.
    let transport = GrpcTransport::new(test_logger());
    let result = transport
        .send(
            &PeerAddress::new("127.0.0.1", port_base),
            Request::VoteRequest(VoteRequest {
                term: Term::new(0),
                candidate_id: NodeId::new(node_name(1)),
            }),
            Duration::from_millis(500),
        )
        .await;
    match result {
        Err(e) => assert!(e.is_transient(), "Expected a transient failure, got {:?}", e),
        Ok(reply) => panic!("Unexpected reply after shutdown: {:?}", reply),
    }

    Ok(())
}

#[tokio::test]
async fn unreachable_peer_is_a_transient_failure() {
    let transport = GrpcTransport::new(test_logger());
    let result = transport
        .send(
            &PeerAddress::new("127.0.0.1", 47199),
            Request::VoteRequest(VoteRequest {
                term: Term::new(1),
                candidate_id: NodeId::new("nobody"),
            }),
            Duration::from_millis(300),
        )
        .await;

    let e: TransportError = result.expect_err("Expected failure");
    assert!(e.is_transient());
}

#[tokio::test]
async fn taken_port_fails_node_creation() -> Result<(), Box<dyn Error>> {
    let port = 47150;
    let _squatter = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;

    let result = cluster_consensus::try_create_node(config(0, 1, port)).await;

    match result {
        Err(NodeCreationError::Serving(TransportError::Bind(_))) => Ok(()),
        Err(e) => panic!("Unexpected error: {:?}", e),
        Ok(_) => panic!("Node created on a port that is already taken"),
    }
}

#[test]
fn decode_errors_are_readable() {
    assert_eq!(DecodeError::UnknownMessageType.to_string(), "unknown message type");
    assert_eq!(DecodeError::MissingField("leader_id").to_string(), "missing leader_id");
}

async fn wait_for_agreed_leader(nodes: &[ClusterNode], timeout: Duration) -> (NodeId, Term) {
    let deadline = Instant::now() + timeout;
    loop {
        let mut statuses = Vec::with_capacity(nodes.len());
        for node in nodes {
            statuses.push(node.status().await.expect("Node stopped unexpectedly"));
        }

        let leaders: Vec<_> = statuses.iter().filter(|s| s.role == Role::Leader).collect();
        if let [leader] = leaders.as_slice() {
            if statuses
                .iter()
                .all(|s| s.term == leader.term && s.leader_id.as_ref() == Some(&leader.node_id))
            {
                return (leader.node_id.clone(), leader.term);
            }
        }

        assert!(Instant::now() < deadline, "Timed out waiting for leader: {:?}", statuses);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn config(id: usize, num_members: usize, port_base: u16) -> NodeConfig {
    let cluster_members = (0..num_members)
        .map(|i| MemberInfo::new(node_name(i), "127.0.0.1", port_base + i as u16))
        .collect();

    NodeConfig {
        my_node_id: node_name(id),
        cluster_members,
        logger: test_logger(),
        options: ElectionOptions {
            election_timeout_min: Some(Duration::from_millis(500)),
            election_timeout_max: Some(Duration::from_millis(1000)),
            heartbeat_interval: Some(Duration::from_millis(100)),
            rpc_timeout: Some(Duration::from_millis(200)),
            ..ElectionOptions::default()
        },
    }
}

fn node_name(i: usize) -> String {
    format!("node-{}", i + 1)
}

fn test_logger() -> slog::Logger {
    let decorator = slog_term::PlainSyncDecorator::new(slog_term::TestStdoutWriter);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();

    slog::Logger::root(drain, slog::o!())
}
