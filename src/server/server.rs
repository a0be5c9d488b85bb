use crate::grpc::grpc_cluster_server::{GrpcCluster, GrpcClusterServer};
use crate::grpc::{ProtoReply, ProtoRequest};
use crate::server::RpcServerShutdownSignal;
use crate::transport::{Reply, Request as ClusterRequest, RequestHandler};
use std::convert::TryFrom;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

/// RpcServer is the type that implements the cluster gRPC interface on top of a `RequestHandler`.
pub(crate) struct RpcServer {
    logger: slog::Logger,
    handler: Arc<dyn RequestHandler>,
}

impl RpcServer {
    pub(crate) fn new(logger: slog::Logger, handler: Arc<dyn RequestHandler>) -> Self {
        RpcServer { logger, handler }
    }

    /// Serve on a listener the caller has already bound.
    pub(crate) async fn run(self, listener: TcpListener, shutdown_signal: RpcServerShutdownSignal) {
        let logger = self.logger.clone();
        match listener.local_addr() {
            Ok(socket_addr) => slog::info!(logger, "Listening on '{:?}'", socket_addr),
            Err(e) => slog::warn!(logger, "Listening on unknown address: {:?}", e),
        }

        let result = Server::builder()
            .add_service(GrpcClusterServer::new(self))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown_signal)
            .await;

        match result {
            Ok(()) => slog::info!(logger, "Server run() has exited"),
            Err(e) => slog::error!(logger, "Server run() has exited: {:?}", e),
        }
    }

    async fn handle_exchange(&self, rpc_request: ProtoRequest) -> ProtoReply {
        let reply = match ClusterRequest::try_from(rpc_request) {
            Ok(request) => self.handler.handle(request).await,
            Err(e) => {
                slog::warn!(self.logger, "Rejecting inbound message: {}", e);
                Reply::error(e.to_string())
            }
        };

        reply.into()
    }
}

#[async_trait::async_trait]
impl GrpcCluster for RpcServer {
    async fn exchange(&self, rpc_request_wrapped: Request<ProtoRequest>) -> Result<Response<ProtoReply>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_reply = self.handle_exchange(rpc_request).await;
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_reply);

        Ok(Response::new(rpc_reply))
    }
}
