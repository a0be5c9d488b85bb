//! Heartbeat-based peer liveness, independent of election role.
mod detector;
mod monitor;

pub use detector::FailureDetector;
pub use detector::SuspectCallback;
pub use detector::SuspectCallbackError;
