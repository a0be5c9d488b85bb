use crate::actor;
use crate::clock::{Clock, RealClock};
use crate::node::election::timers::TaskGuard;
use crate::node::{HeartbeatTick, Term};
use std::sync::{Arc, Weak};
use tokio::time::Duration;

/// HeartbeatTimerHandle is held by a leader for exactly one term. While alive, the timer task
/// asks the actor to broadcast a heartbeat every `heartbeat_interval`, starting immediately.
pub(crate) struct HeartbeatTimerHandle {
    _alive: Arc<()>,
    _task: Option<TaskGuard>,
}

struct HeartbeatTimerTask<C: Clock> {
    alive: Weak<()>,
    heartbeat_interval: Duration,
    actor_client: actor::WeakActorClient,
    event: HeartbeatTick,
    clock: C,
}

impl HeartbeatTimerHandle {
    pub(crate) fn spawn_timer_task(
        heartbeat_interval: Duration,
        actor_client: actor::WeakActorClient,
        term: Term,
    ) -> Self {
        let (task, mut handle) = HeartbeatTimerTask::new(heartbeat_interval, actor_client, term, RealClock);
        handle._task = Some(TaskGuard::new(tokio::task::spawn(task.run())));

        handle
    }
}

impl<C: Clock> HeartbeatTimerTask<C> {
    fn new(
        heartbeat_interval: Duration,
        actor_client: actor::WeakActorClient,
        term: Term,
        clock: C,
    ) -> (Self, HeartbeatTimerHandle) {
        let alive = Arc::new(());

        let task = HeartbeatTimerTask {
            alive: Arc::downgrade(&alive),
            heartbeat_interval,
            actor_client,
            event: HeartbeatTick { term },
            clock,
        };
        let handle = HeartbeatTimerHandle {
            _alive: alive,
            _task: None,
        };

        (task, handle)
    }

    async fn run(mut self) {
        // First tick is immediate so a new leader asserts itself before any follower times out.
        loop {
            if self.alive.upgrade().is_none() {
                // No longer leader for this term.
                return;
            }

            // Ticks are fire-and-forget: the actor spawns the sends and we don't wait for replies.
            if self.actor_client.heartbeat_tick(self.event.clone()).await.is_err() {
                return;
            }

            self.clock.sleep(self.heartbeat_interval).await;
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
    async fn heartbeat_timer_lifecycle() {
        // -- setup --
        let interval = Duration::from_millis(50);
        let (strong_actor_client, rx) = ActorClient::new(10);
        let actor_client = strong_actor_client.weak();
        let mut actor = TestUtilActor::new(rx);

        let term = Term::new(10);
        let expected = HeartbeatTick { term };

        let (mock_clock, mut mock_clock_controller) = clock::mocked_clock();

        // -- execute & verify --

        // 1. Spawn task, first tick is immediate.
        let (timer_task, timer_handle) = HeartbeatTimerTask::new(interval, actor_client, term, mock_clock);
        let task_join_handle = tokio::task::spawn(timer_task.run());

        actor.assert_heartbeat_tick_event(expected.clone()).await;
        actor.assert_no_event().await;

        // 2. One tick per interval.
        for _ in 0..5 {
            mock_clock_controller.advance(interval);
            actor.assert_heartbeat_tick_event(expected.clone()).await;
            actor.assert_no_event().await;
        }

        // 3. A big leap still yields a single tick, no burst to catch up.
        mock_clock_controller.advance(interval * 5);
        actor.assert_heartbeat_tick_event(expected.clone()).await;
        actor.assert_no_event().await;

        // 4. Drop handle, task exits without sending more ticks.
        drop(timer_handle);
        mock_clock_controller.advance(interval);
        tokio::time::timeout(Duration::from_secs(5), task_join_handle)
            .await
            .expect("Timer task did not exit")
            .unwrap();
        actor.assert_no_event().await;
    }

    #[tokio::test]
    async fn heartbeat_timer_exits_when_actor_gone() {
        let interval = Duration::from_millis(50);
        let (strong_actor_client, rx) = ActorClient::new(10);
        let actor_client = strong_actor_client.weak();
        drop(rx);

        let (mock_clock, _controller) = clock::mocked_clock();
        let (timer_task, _timer_handle) = HeartbeatTimerTask::new(interval, actor_client, Term::new(1), mock_clock);

        tokio::time::timeout(Duration::from_secs(5), tokio::task::spawn(timer_task.run()))
            .await
            .expect("Timer task did not exit")
            .unwrap();
        drop(strong_actor_client);
    }
}
