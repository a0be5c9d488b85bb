mod election_timer;
mod heartbeat_timer;

#[cfg(test)]
mod test_utils;

pub(super) use election_timer::ElectionTimerHandle;
pub(super) use heartbeat_timer::HeartbeatTimerHandle;

use tokio::task::JoinHandle;

/// Aborts the timer task as soon as its handle is dropped, rather than at its next wake-up.
pub(crate) struct TaskGuard(JoinHandle<()>);

impl TaskGuard {
    pub(crate) fn new(join_handle: JoinHandle<()>) -> Self {
        TaskGuard(join_handle)
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
