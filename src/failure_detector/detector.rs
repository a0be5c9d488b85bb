use crate::clock::{Clock, RealClock};
use crate::failure_detector::monitor::{MonitorHandle, MonitorTask};
use crate::node::NodeId;
use std::collections::HashMap;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

/// Invoked by the monitor with every peer that is suspected at the time of a poll. The same peer
/// is reported again on every poll for as long as it stays suspected.
pub type SuspectCallback = Arc<dyn Fn(&NodeId) -> Result<(), SuspectCallbackError> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[error("suspect callback failed: {0}")]
pub struct SuspectCallbackError(Box<dyn Error + Send + Sync>);

impl SuspectCallbackError {
    pub fn new<E: Into<Box<dyn Error + Send + Sync>>>(error: E) -> Self {
        SuspectCallbackError(error.into())
    }
}

/// FailureDetector decides whether a peer is alive based on how long ago we last heard from it.
///
/// It is a cheap `Clone` handle; clones share the same peer records, callback and monitor. It is
/// independent of election role and can be consulted by anyone who needs peer liveness.
#[derive(Clone)]
pub struct FailureDetector<C: Clock = RealClock> {
    shared: Arc<Shared<C>>,
}

pub(super) struct Shared<C: Clock> {
    logger: slog::Logger,
    clock: C,
    default_timeout: Duration,
    peers: Mutex<HashMap<NodeId, PeerRecord>>,
    callback: Mutex<Option<SuspectCallback>>,
    monitor: Mutex<Option<MonitorHandle>>,
}

// Created lazily on first interaction. Only `clear()` removes records.
#[derive(Default)]
struct PeerRecord {
    last_heartbeat: Option<Instant>,
    timeout: Option<Duration>,
}

impl FailureDetector<RealClock> {
    pub fn new(logger: slog::Logger, default_timeout: Duration) -> Self {
        Self::with_clock(logger, default_timeout, RealClock)
    }
}

impl<C: Clock> FailureDetector<C> {
    pub(crate) fn with_clock(logger: slog::Logger, default_timeout: Duration, clock: C) -> Self {
        FailureDetector {
            shared: Arc::new(Shared {
                logger,
                clock,
                default_timeout,
                peers: Mutex::new(HashMap::new()),
                callback: Mutex::new(None),
                monitor: Mutex::new(None),
            }),
        }
    }

    /// Record that we heard from `peer` just now.
    pub fn mark_heartbeat(&self, peer: &NodeId) {
        let now = self.shared.clock.now();
        self.shared.lock_peers().entry(peer.clone()).or_default().last_heartbeat = Some(now);
    }

    /// Override the suspicion threshold for one peer.
    pub fn set_timeout(&self, peer: &NodeId, timeout: Duration) {
        self.shared.lock_peers().entry(peer.clone()).or_default().timeout = Some(timeout);
    }

    pub fn default_timeout(&self) -> Duration {
        self.shared.default_timeout
    }

    /// A peer we have never heard from is suspected. Otherwise it is suspected iff more than its
    /// timeout has elapsed since the last heartbeat.
    pub fn is_suspected(&self, peer: &NodeId) -> bool {
        self.shared.is_suspected(peer)
    }

    /// Known peers that are currently suspected, sorted by id.
    pub fn suspected_peers(&self) -> Vec<NodeId> {
        self.shared.suspected_peers()
    }

    /// Every peer that has a record, sorted by id.
    pub fn known_peers(&self) -> Vec<NodeId> {
        let mut peers: Vec<NodeId> = self.shared.lock_peers().keys().cloned().collect();
        peers.sort();
        peers
    }

    /// Replace the callback the monitor invokes for suspected peers.
    pub fn register_suspect_callback<F>(&self, callback: F)
    where
        F: Fn(&NodeId) -> Result<(), SuspectCallbackError> + Send + Sync + 'static,
    {
        self.shared
            .callback
            .lock()
            .expect("FailureDetector.register_suspect_callback() mutex guard poison")
            .replace(Arc::new(callback));
    }

    /// Start polling every `poll_interval`. Does nothing if a monitor is already running.
    pub fn start_monitor(&self, poll_interval: Duration) {
        let mut monitor = self
            .shared
            .monitor
            .lock()
            .expect("FailureDetector.start_monitor() mutex guard poison");
        if monitor.is_some() {
            return;
        }

        slog::info!(self.shared.logger, "Starting failure detector monitor every {:?}", poll_interval);
        let (task, stop_tx) = MonitorTask::new(Arc::downgrade(&self.shared), poll_interval, self.shared.clock.clone());
        monitor.replace(MonitorHandle::spawn(task, stop_tx));
    }

    /// Stop the monitor and wait for it to exit. Safe to call when no monitor is running.
    pub async fn stop_monitor(&self) {
        let handle = self
            .shared
            .monitor
            .lock()
            .expect("FailureDetector.stop_monitor() mutex guard poison")
            .take();

        if let Some(handle) = handle {
            handle.stop().await;
            slog::info!(self.shared.logger, "Stopped failure detector monitor");
        }
    }

    pub fn is_monitor_running(&self) -> bool {
        self.shared
            .monitor
            .lock()
            .expect("FailureDetector.is_monitor_running() mutex guard poison")
            .is_some()
    }

    /// Forget every peer record. Used on node shutdown.
    pub fn clear(&self) {
        self.shared.lock_peers().clear();
    }

    /// Run one poll synchronously. Returns the number of callback invocations that failed.
    #[cfg(test)]
    pub(crate) fn poll_once(&self) -> usize {
        self.shared.notify_suspects()
    }
}

impl<C: Clock> Shared<C> {
    fn lock_peers(&self) -> std::sync::MutexGuard<'_, HashMap<NodeId, PeerRecord>> {
        self.peers.lock().expect("FailureDetector peers mutex guard poison")
    }

    fn is_suspected(&self, peer: &NodeId) -> bool {
        let now = self.clock.now();
        match self.lock_peers().get(peer) {
            Some(record) => self.is_record_suspected(record, now),
            None => true,
        }
    }

    fn is_record_suspected(&self, record: &PeerRecord, now: Instant) -> bool {
        match record.last_heartbeat {
            None => true,
            Some(last) => {
                let timeout = record.timeout.unwrap_or(self.default_timeout);
                now.saturating_duration_since(last) > timeout
            }
        }
    }

    fn suspected_peers(&self) -> Vec<NodeId> {
        let now = self.clock.now();
        let mut suspected: Vec<NodeId> = self
            .lock_peers()
            .iter()
            .filter(|(_, record)| self.is_record_suspected(record, now))
            .map(|(peer, _)| peer.clone())
            .collect();
        suspected.sort();
        suspected
    }

    /// One poll of the monitor. The callback runs without any lock held, so it may call back
    /// into the detector. A failing or panicking callback is logged and the poll moves on.
    pub(super) fn notify_suspects(&self) -> usize {
        let callback = match self
            .callback
            .lock()
            .expect("FailureDetector.notify_suspects() mutex guard poison")
            .clone()
        {
            Some(callback) => callback,
            None => return 0,
        };

        let mut failures = 0;
        for peer in self.suspected_peers() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(&peer)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    slog::warn!(self.logger, "Suspect callback for {:?} failed: {}", peer, e; "Peer" => peer.as_str());
                }
                Err(_) => {
                    failures += 1;
                    slog::error!(self.logger, "Suspect callback for {:?} panicked", peer; "Peer" => peer.as_str());
                }
            }
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{mocked_clock, MockClock, MockClockController};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn detector(timeout: Duration) -> (FailureDetector<MockClock>, MockClockController) {
        let (clock, controller) = mocked_clock();
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        (FailureDetector::with_clock(logger, timeout, clock), controller)
    }

    fn peer(id: &str) -> NodeId {
        NodeId::new(id)
    }

    #[test]
    fn unknown_peer_is_suspected() {
        let (fd, _controller) = detector(Duration::from_millis(500));
        assert!(fd.is_suspected(&peer("x")));
        assert!(fd.known_peers().is_empty());
    }

    #[test]
    fn suspicion_follows_elapsed_time_since_last_heartbeat() {
        let (fd, mut controller) = detector(Duration::from_millis(500));
        let x = peer("x");

        fd.mark_heartbeat(&x);
        assert!(!fd.is_suspected(&x));

        controller.advance(Duration::from_millis(200));
        assert!(!fd.is_suspected(&x));

        controller.advance(Duration::from_millis(400));
        assert!(fd.is_suspected(&x));

        // Stays suspected until the next mark.
        controller.advance(Duration::from_secs(10));
        assert!(fd.is_suspected(&x));

        fd.mark_heartbeat(&x);
        assert!(!fd.is_suspected(&x));
    }

    #[test]
    fn exactly_at_timeout_is_not_suspected() {
        let (fd, mut controller) = detector(Duration::from_millis(500));
        fd.mark_heartbeat(&peer("x"));

        controller.advance(Duration::from_millis(500));
        assert!(!fd.is_suspected(&peer("x")));
    }

    #[test]
    fn per_peer_timeout_overrides_default() {
        let (fd, mut controller) = detector(Duration::from_millis(500));
        let slow = peer("slow");
        let fast = peer("fast");
        fd.set_timeout(&slow, Duration::from_secs(2));
        fd.mark_heartbeat(&slow);
        fd.mark_heartbeat(&fast);

        controller.advance(Duration::from_secs(1));

        assert!(!fd.is_suspected(&slow));
        assert!(fd.is_suspected(&fast));
        assert_eq!(fd.suspected_peers(), vec![fast]);
    }

    #[test]
    fn timeout_without_heartbeat_creates_a_suspected_record() {
        let (fd, _controller) = detector(Duration::from_millis(500));
        fd.set_timeout(&peer("y"), Duration::from_secs(1));

        assert_eq!(fd.known_peers(), vec![peer("y")]);
        assert_eq!(fd.suspected_peers(), vec![peer("y")]);
    }

    #[test]
    fn clear_forgets_everything() {
        let (fd, _controller) = detector(Duration::from_millis(500));
        fd.mark_heartbeat(&peer("x"));
        fd.clear();

        assert!(fd.known_peers().is_empty());
        assert!(fd.is_suspected(&peer("x")));
    }

    #[test]
    fn poll_reports_every_suspected_peer_each_time() {
        let (fd, mut controller) = detector(Duration::from_millis(500));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();
        fd.register_suspect_callback(move |peer| {
            calls_clone.lock().unwrap().push(peer.clone());
            Ok(())
        });
        fd.mark_heartbeat(&peer("a"));
        fd.mark_heartbeat(&peer("b"));

        assert_eq!(fd.poll_once(), 0);
        assert!(calls.lock().unwrap().is_empty());

        controller.advance(Duration::from_secs(1));
        fd.mark_heartbeat(&peer("b"));
        fd.poll_once();
        fd.poll_once();

        assert_eq!(*calls.lock().unwrap(), vec![peer("a"), peer("a")]);
    }

    #[test]
    fn failing_callbacks_do_not_affect_other_peers() {
        let (fd, mut controller) = detector(Duration::from_millis(100));
        let ok_calls = Arc::new(AtomicUsize::new(0));
        let ok_calls_clone = ok_calls.clone();
        fd.register_suspect_callback(move |peer| match peer.as_str() {
            "a" => Err(SuspectCallbackError::new("refused")),
            "b" => panic!("callback bug"),
            _ => {
                ok_calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        for id in &["a", "b", "c"] {
            fd.mark_heartbeat(&peer(id));
        }

        controller.advance(Duration::from_secs(1));

        assert_eq!(fd.poll_once(), 2);
        assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fd.poll_once(), 2);
        assert_eq!(ok_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn poll_without_callback_is_a_no_op() {
        let (fd, mut controller) = detector(Duration::from_millis(100));
        fd.mark_heartbeat(&peer("a"));
        controller.advance(Duration::from_secs(1));

        assert_eq!(fd.poll_once(), 0);
    }
}
