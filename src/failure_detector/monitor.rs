use crate::clock::Clock;
use crate::failure_detector::detector::Shared;
use std::sync::Weak;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// The polling loop. Holds only a weak reference so that dropping every detector handle also ends
/// the loop.
pub(super) struct MonitorTask<C: Clock> {
    shared: Weak<Shared<C>>,
    poll_interval: Duration,
    clock: C,
    stop_rx: oneshot::Receiver<()>,
}

pub(super) struct MonitorHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl<C: Clock> MonitorTask<C> {
    pub(super) fn new(shared: Weak<Shared<C>>, poll_interval: Duration, clock: C) -> (Self, oneshot::Sender<()>) {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = MonitorTask {
            shared,
            poll_interval,
            clock,
            stop_rx,
        };

        (task, stop_tx)
    }

    async fn run(mut self) {
        loop {
            match self.shared.upgrade() {
                Some(shared) => {
                    shared.notify_suspects();
                }
                None => return,
            }

            // A dropped sender stops us the same as an explicit stop.
            tokio::select! {
                _ = &mut self.stop_rx => return,
                _ = self.clock.sleep(self.poll_interval) => {}
            }
        }
    }
}

impl MonitorHandle {
    pub(super) fn spawn<C: Clock>(task: MonitorTask<C>, stop_tx: oneshot::Sender<()>) -> Self {
        MonitorHandle {
            stop_tx,
            task: tokio::task::spawn(task.run()),
        }
    }

    pub(super) async fn stop(self) {
        let _ = self.stop_tx.send(());
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use crate::clock::mocked_clock;
    use crate::failure_detector::FailureDetector;
    use crate::node::NodeId;
    use tokio::sync::mpsc;
    use tokio::time::Duration;

    #[tokio::test]
    async fn monitor_reports_suspects_until_stopped() {
        let (clock, mut controller) = mocked_clock();
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let fd = FailureDetector::with_clock(logger, Duration::from_millis(500), clock);

        let (tx, mut rx) = mpsc::unbounded_channel();
        fd.register_suspect_callback(move |peer| {
            let _ = tx.send(peer.clone());
            Ok(())
        });
        let x = NodeId::new("x");
        fd.mark_heartbeat(&x);

        fd.start_monitor(Duration::from_millis(100));
        // Second start must not spawn a second loop.
        fd.start_monitor(Duration::from_millis(100));
        assert!(fd.is_monitor_running());

        // First poll happens right away and finds nothing.
        tokio::time::timeout(Duration::from_millis(20), rx.recv())
            .await
            .expect_err("Expected timeout");

        controller.advance(Duration::from_millis(600));
        assert_eq!(rx.recv().await, Some(x.clone()));
        tokio::time::timeout(Duration::from_millis(20), rx.recv())
            .await
            .expect_err("Expected exactly one report per poll");

        controller.advance(Duration::from_millis(100));
        assert_eq!(rx.recv().await, Some(x));

        fd.stop_monitor().await;
        assert!(!fd.is_monitor_running());

        controller.advance(Duration::from_secs(1));
        tokio::time::timeout(Duration::from_millis(20), rx.recv())
            .await
            .expect_err("Expected no report after stop");

        // Stopping again is harmless.
        fd.stop_monitor().await;
    }

    #[tokio::test]
    async fn stop_without_start_is_harmless() {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let fd = FailureDetector::new(logger, Duration::from_millis(500));

        fd.stop_monitor().await;
        assert!(!fd.is_monitor_running());
    }
}
