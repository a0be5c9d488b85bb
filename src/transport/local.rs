use crate::node::PeerAddress;
use crate::transport::{PeerTransport, Reply, Request, RequestHandler, ServingGuard, TransportError};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

/// LocalNetwork routes requests between nodes living in the same process. Every node gets its
/// own `LocalTransport` endpoint so the network knows who is sending, which lets tests cut links
/// to simulate partitions.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    state: Arc<Mutex<NetworkState>>,
}

#[derive(Default)]
struct NetworkState {
    handlers: HashMap<PeerAddress, Arc<dyn RequestHandler>>,
    isolated: HashSet<PeerAddress>,
    cut_links: HashSet<(PeerAddress, PeerAddress)>,
}

impl NetworkState {
    fn can_deliver(&self, from: &PeerAddress, to: &PeerAddress) -> bool {
        !self.isolated.contains(from)
            && !self.isolated.contains(to)
            && !self.cut_links.contains(&(from.clone(), to.clone()))
    }
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(&self, address: PeerAddress) -> LocalTransport {
        LocalTransport {
            network: self.clone(),
            source: address,
        }
    }

    /// Drop every message to or from `address` until `heal()`.
    pub fn isolate(&self, address: &PeerAddress) {
        self.lock().isolated.insert(address.clone());
    }

    pub fn heal(&self, address: &PeerAddress) {
        let mut state = self.lock();
        state.isolated.remove(address);
        state.cut_links.retain(|(from, to)| from != address && to != address);
    }

    /// Drop messages in both directions between `a` and `b`.
    pub fn cut(&self, a: &PeerAddress, b: &PeerAddress) {
        let mut state = self.lock();
        state.cut_links.insert((a.clone(), b.clone()));
        state.cut_links.insert((b.clone(), a.clone()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NetworkState> {
        self.state.lock().expect("LocalNetwork.state mutex poison")
    }
}

pub struct LocalTransport {
    network: LocalNetwork,
    source: PeerAddress,
}

#[async_trait::async_trait]
impl PeerTransport for LocalTransport {
    async fn send(&self, address: &PeerAddress, request: Request, timeout: Duration) -> Result<Reply, TransportError> {
        let handler = {
            let state = self.network.lock();
            if !state.can_deliver(&self.source, address) {
                return Err(TransportError::Unreachable(format!("{} -> {} is partitioned", self.source, address)));
            }
            match state.handlers.get(address) {
                Some(handler) => handler.clone(),
                None => return Err(TransportError::Unreachable(format!("nothing listening on {}", address))),
            }
        };

        let reply = tokio::time::timeout(timeout, handler.handle(request))
            .await
            .map_err(|_| TransportError::Timeout)?;

        // A partition that formed while the request was in flight also loses the reply.
        if !self.network.lock().can_deliver(address, &self.source) {
            return Err(TransportError::Unreachable(format!("{} -> {} is partitioned", address, self.source)));
        }

        Ok(reply)
    }

    async fn register_handler(
        &self,
        address: PeerAddress,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<ServingGuard, TransportError> {
        let mut state = self.network.lock();
        if state.handlers.contains_key(&address) {
            return Err(TransportError::Bind(format!("{} already in use", address)));
        }
        state.handlers.insert(address.clone(), handler);

        let weak_state = Arc::downgrade(&self.network.state);
        Ok(ServingGuard::new(
            move || {
                if let Some(state) = weak_state.upgrade() {
                    state
                        .lock()
                        .expect("LocalNetwork.state mutex poison")
                        .handlers
                        .remove(&address);
                }
            },
            None,
        ))
    }
}
