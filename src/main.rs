use cluster_consensus::{ElectionOptions, MemberInfo, NodeConfig, SuspectCallbackError};
use slog::Drain;
use std::env;
use std::error::Error;

const DEFAULT_NODE_ID: &str = "node1";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let root_logger = create_root_logger_for_stdout();
    let config = config_from_env(root_logger.clone())?;

    let mut node = cluster_consensus::try_create_node(config).await?;

    let suspect_logger = root_logger.clone();
    node.failure_detector().register_suspect_callback(move |peer| {
        slog::warn!(suspect_logger, "Peer is suspected to be down"; "Peer" => peer.as_str());
        Ok::<(), SuspectCallbackError>(())
    });

    let mut events = node.event_listener();
    loop {
        tokio::select! {
            event = events.next_event() => match event {
                Some(event) => slog::info!(root_logger, "Election event: {:?}", event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                slog::info!(root_logger, "Received interrupt. Shutting down.");
                break;
            }
        }
    }

    node.shutdown().await;
    Ok(())
}

fn config_from_env(logger: slog::Logger) -> Result<NodeConfig, Box<dyn Error>> {
    let my_node_id = env::var("NODE_ID").unwrap_or_else(|_| DEFAULT_NODE_ID.to_string());
    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = match env::var("PORT") {
        Ok(port) => port.parse::<u16>().map_err(|e| format!("Invalid PORT '{}': {}", port, e))?,
        Err(_) => DEFAULT_PORT,
    };
    let peers = env::var("PEERS").unwrap_or_default();

    let mut cluster_members = vec![MemberInfo::new(my_node_id.clone(), host, port)];
    cluster_members.extend(parse_peers(&peers, &logger));

    Ok(NodeConfig {
        my_node_id,
        cluster_members,
        logger,
        options: ElectionOptions::default(),
    })
}

/// `PEERS` is a comma separated list of `name:port`. The name doubles as the peer's host name.
fn parse_peers(peers: &str, logger: &slog::Logger) -> Vec<MemberInfo> {
    let mut members = Vec::new();
    for token in peers.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let mut parts = token.splitn(2, ':');
        let name = parts.next().unwrap_or_default();
        let port = parts.next().and_then(|p| p.parse::<u16>().ok());
        match port {
            Some(port) if !name.is_empty() => members.push(MemberInfo::new(name, name, port)),
            _ => slog::warn!(logger, "Skipping malformed peer '{}'. Expected 'name:port'.", token),
        }
    }

    members
}

fn create_root_logger_for_stdout() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).use_file_location().build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn parses_peers_and_skips_malformed_tokens() {
        let members = parse_peers("node2:5001, node3:5002,,bogus,:5004,node5:notaport,node6:5006", &logger());

        let parsed: Vec<(String, String, u16)> = members
            .into_iter()
            .map(|m| (m.node_id, m.host, m.port))
            .collect();
        assert_eq!(
            parsed,
            vec![
                ("node2".to_string(), "node2".to_string(), 5001),
                ("node3".to_string(), "node3".to_string(), 5002),
                ("node6".to_string(), "node6".to_string(), 5006),
            ]
        );
    }

    #[test]
    fn empty_peers() {
        assert!(parse_peers("", &logger()).is_empty());
    }
}
