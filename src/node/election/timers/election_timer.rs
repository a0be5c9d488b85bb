use crate::actor;
use crate::clock::{Clock, RealClock};
use crate::node::election::timers::TaskGuard;
use rand::Rng;
use std::ops::Range;
use std::sync::{Arc, Mutex, Weak};
use tokio::time::{Duration, Instant};

/// ElectionTimerHandle is held by a follower or candidate. While it is alive, its timer task
/// notifies the actor whenever the deadline passes without a `reset_timeout()`.
pub(crate) struct ElectionTimerHandle<C: Clock = RealClock> {
    shared: Arc<Shared<C>>,
    _task: Option<TaskGuard>,
}

struct Shared<C: Clock> {
    deadline: Mutex<Instant>,
    timeout_range: Range<Duration>,
    clock: C,
}

struct ElectionTimerTask<C: Clock> {
    weak_shared: Weak<Shared<C>>,
    actor_client: actor::WeakActorClient,
    clock: C,
}

impl ElectionTimerHandle {
    pub(crate) fn spawn_timer_task(timeout_range: Range<Duration>, actor_client: actor::WeakActorClient) -> Self {
        let (task, mut handle) = ElectionTimerTask::new(timeout_range, actor_client, RealClock);
        handle._task = Some(TaskGuard::new(tokio::task::spawn(task.run())));

        handle
    }
}

impl<C: Clock> ElectionTimerHandle<C> {
    /// Push the deadline out by a freshly drawn random timeout.
    pub(crate) fn reset_timeout(&self) {
        self.shared.reset_timeout();
    }

    /// False when the deadline was pushed out after the timer task decided to fire.
    pub(crate) fn is_expired(&self) -> bool {
        self.shared.clock.now() >= self.shared.deadline()
    }

    #[cfg(test)]
    fn deadline(&self) -> Instant {
        self.shared.deadline()
    }
}

impl<C: Clock> Shared<C> {
    fn reset_timeout(&self) {
        let new_deadline = self.clock.now() + draw_timeout(&self.timeout_range);
        *self.deadline.lock().expect("ElectionTimer.deadline mutex poison") = new_deadline;
    }

    fn deadline(&self) -> Instant {
        *self.deadline.lock().expect("ElectionTimer.deadline mutex poison")
    }
}

/// Uniformly draw from `[start, end)`. An empty range yields its start.
pub(crate) fn draw_timeout(range: &Range<Duration>) -> Duration {
    if range.start >= range.end {
        return range.start;
    }
    rand::thread_rng().gen_range(range.clone())
}

impl<C: Clock> ElectionTimerTask<C> {
    fn new(
        timeout_range: Range<Duration>,
        actor_client: actor::WeakActorClient,
        clock: C,
    ) -> (Self, ElectionTimerHandle<C>) {
        // Armed from the start, otherwise a fresh follower would time out immediately.
        let shared = Arc::new(Shared {
            deadline: Mutex::new(clock.now() + draw_timeout(&timeout_range)),
            timeout_range,
            clock: clock.clone(),
        });

        let task = ElectionTimerTask {
            weak_shared: Arc::downgrade(&shared),
            actor_client,
            clock,
        };
        let handle = ElectionTimerHandle { shared, _task: None };

        (task, handle)
    }

    async fn run(mut self) {
        loop {
            let (deadline, backoff) = match self.weak_shared.upgrade() {
                Some(shared) => (shared.deadline(), draw_timeout(&shared.timeout_range)),
                // Handle dropped: we are no longer follower/candidate for the same term.
                None => return,
            };

            self.clock.sleep_until(deadline).await;

            match self.weak_shared.upgrade() {
                None => return,
                Some(shared) => {
                    if self.clock.now() < shared.deadline() {
                        // Reset while we slept.
                        continue;
                    }
                }
            }

            if self.actor_client.election_timeout().await.is_err() {
                return;
            }

            // The actor normally replaces this timer when it handles the timeout. Wait before
            // checking again so a slow actor isn't flooded with duplicate timeouts.
            self.clock.sleep(backoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorClient;
    use crate::clock;
    use crate::node::election::timers::test_utils::TestUtilActor;

    #[tokio::test]
    async fn election_timer_reset_and_timeout() {
        // -- setup --
        let timeout = Duration::from_millis(100);
        let (strong_actor_client, rx) = ActorClient::new(10);
        let actor_client = strong_actor_client.weak();
        let mut actor = TestUtilActor::new(rx);

        let (mock_clock, mut mock_clock_controller) = clock::mocked_clock();

        // -- execute & verify --

        // 1. Spawn task, assert there is no event in the queue.
        // Not testing randomness here, so the range is a single point.
        let (timer_task, timer_handle) = ElectionTimerTask::new(timeout..timeout, actor_client, mock_clock);
        tokio::task::spawn(timer_task.run());

        actor.assert_no_event().await;

        // 2. Advance time and reset timeout many times, assert no event
        for _ in 0..5 {
            mock_clock_controller.advance(timeout / 2);
            timer_handle.reset_timeout();
        }
        actor.assert_no_event().await;
        assert_eq!(mock_clock_controller.elapsed_time(), timeout * 5 / 2);

        // 3. No timeout before T=3.5
        let one_ns = Duration::from_nanos(1);
        mock_clock_controller.advance(timeout - one_ns);
        actor.assert_no_event().await;
        assert!(!timer_handle.is_expired());

        // 4. Timeout at exactly T=3.5, because our last reset was at T=2.5.
        mock_clock_controller.advance(one_ns);
        actor.assert_election_timeout_event().await;
        assert!(timer_handle.is_expired());
    }

    #[tokio::test]
    async fn election_timer_handle_drop() {
        let timeout = Duration::from_millis(100);
        let (strong_actor_client, rx) = ActorClient::new(10);
        let actor_client = strong_actor_client.weak();
        let mut actor = TestUtilActor::new(rx);

        let (mock_clock, mut mock_clock_controller) = clock::mocked_clock();

        let (timer_task, timer_handle) = ElectionTimerTask::new(timeout..timeout, actor_client, mock_clock);
        let task_join_handle = tokio::task::spawn(timer_task.run());
        drop(timer_handle);

        // Fast-fwd past the deadline. The task must exit without firing.
        mock_clock_controller.advance(timeout * 2);
        tokio::time::timeout(Duration::from_secs(5), task_join_handle)
            .await
            .expect("Timer task did not exit")
            .unwrap();
        actor.assert_no_event().await;
    }

    #[tokio::test]
    async fn reset_after_fire_makes_timeout_stale() {
        let timeout = Duration::from_millis(100);
        let (strong_actor_client, rx) = ActorClient::new(10);
        let actor_client = strong_actor_client.weak();
        let mut actor = TestUtilActor::new(rx);

        let (mock_clock, mut mock_clock_controller) = clock::mocked_clock();

        let (timer_task, timer_handle) = ElectionTimerTask::new(timeout..timeout, actor_client, mock_clock);
        tokio::task::spawn(timer_task.run());

        // The task fires, then a heartbeat that was already queued in front of the timeout
        // resets the timer. The actor must be able to tell the timeout is stale.
        mock_clock_controller.advance(timeout);
        actor.assert_election_timeout_event().await;
        timer_handle.reset_timeout();
        assert!(!timer_handle.is_expired());

        // Timer keeps running and honors resets.
        for _ in 0..5 {
            mock_clock_controller.advance(timeout / 2);
            timer_handle.reset_timeout();
        }
        actor.assert_no_event().await;
    }

    #[tokio::test]
    async fn every_reset_redraws_within_bounds() {
        let low = Duration::from_millis(150);
        let high = Duration::from_millis(300);
        let (strong_actor_client, _rx) = ActorClient::new(10);
        let (mock_clock, controller) = clock::mocked_clock();

        let (_task, timer_handle) = ElectionTimerTask::new(low..high, strong_actor_client.weak(), mock_clock);

        let mut draws = std::collections::HashSet::new();
        for _ in 0..200 {
            timer_handle.reset_timeout();
            let drawn = timer_handle.deadline() - controller.current_time();
            assert!(drawn >= low && drawn < high, "Draw {:?} out of bounds", drawn);
            draws.insert(drawn);
        }
        // Redrawn on every reset, not fixed once.
        assert!(draws.len() > 1);
    }

    #[test]
    fn draw_timeout_degenerate_range() {
        let d = Duration::from_millis(5);
        assert_eq!(draw_timeout(&(d..d)), d);
    }
}
