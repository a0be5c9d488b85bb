use crate::grpc::grpc_cluster_client::GrpcClusterClient;
use crate::grpc::ProtoRequest;
use crate::node::PeerAddress;
use crate::server::{self, RpcServer};
use crate::transport::{PeerTransport, Reply, Request, RequestHandler, ServingGuard, TransportError};
use std::collections::HashMap;
use std::convert::TryFrom;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;

/// GrpcTransport is the reference network transport. It keeps one lazily-created connection per
/// peer address and forgets it whenever the peer looks unreachable, so the next call reconnects.
pub struct GrpcTransport {
    logger: slog::Logger,
    clients: Mutex<HashMap<PeerAddress, GrpcClusterClient<Channel>>>,
}

impl GrpcTransport {
    pub fn new(logger: slog::Logger) -> Self {
        GrpcTransport {
            logger,
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn client(
        &self,
        address: &PeerAddress,
        timeout: Duration,
    ) -> Result<GrpcClusterClient<Channel>, TransportError> {
        if let Some(client) = self.clients.lock().expect("GrpcTransport.clients mutex poison").get(address) {
            return Ok(client.clone());
        }

        let url = format!("http://{}:{}", address.host, address.port);
        let endpoint = Endpoint::from_shared(url).map_err(|e| TransportError::Unreachable(e.to_string()))?;
        slog::debug!(self.logger, "Connecting to {}", address);
        let connection = tokio::time::timeout(timeout, endpoint.connect())
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        let client = GrpcClusterClient::new(connection);
        self.clients
            .lock()
            .expect("GrpcTransport.clients mutex poison")
            .insert(address.clone(), client.clone());

        Ok(client)
    }

    fn forget(&self, address: &PeerAddress) {
        self.clients
            .lock()
            .expect("GrpcTransport.clients mutex poison")
            .remove(address);
    }
}

#[async_trait::async_trait]
impl PeerTransport for GrpcTransport {
    async fn send(&self, address: &PeerAddress, request: Request, timeout: Duration) -> Result<Reply, TransportError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut client = self.client(address, timeout).await?;

        slog::debug!(self.logger, "ClientWire - {} {:?}", address, request);
        let rpc_reply = tokio::time::timeout_at(deadline, client.exchange(ProtoRequest::from(request))).await;
        slog::debug!(self.logger, "ClientWire - {} {:?}", address, rpc_reply);

        match rpc_reply {
            Ok(Ok(response)) => Reply::try_from(response.into_inner())
                .map_err(|e| TransportError::MalformedReply(e.to_string())),
            Ok(Err(status)) => match status.code() {
                Code::Unavailable | Code::Unknown | Code::Cancelled => {
                    self.forget(address);
                    Err(TransportError::Unreachable(status.message().to_string()))
                }
                Code::DeadlineExceeded => Err(TransportError::Timeout),
                _ => Err(TransportError::Rejected(format!("{:?}: {}", status.code(), status.message()))),
            },
            Err(_elapsed) => Err(TransportError::Timeout),
        }
    }

    async fn register_handler(
        &self,
        address: PeerAddress,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<ServingGuard, TransportError> {
        let socket_addr = resolve(&address).await?;
        let listener = TcpListener::bind(socket_addr)
            .await
            .map_err(|e| TransportError::Bind(format!("{}: {}", address, e)))?;
        let (shutdown_handle, shutdown_signal) = server::shutdown_signal();

        let rpc_server = RpcServer::new(self.logger.clone(), handler);
        let task = tokio::spawn(rpc_server.run(listener, shutdown_signal));

        Ok(ServingGuard::new(move || shutdown_handle.shutdown(), Some(task)))
    }
}

async fn resolve(address: &PeerAddress) -> Result<SocketAddr, TransportError> {
    tokio::net::lookup_host((address.host.as_str(), address.port))
        .await
        .map_err(|e| TransportError::Bind(format!("{}: {}", address, e)))?
        .next()
        .ok_or_else(|| TransportError::Bind(format!("{}: no address resolved", address)))
}
