use std::convert::TryFrom;
use std::ops::Range;
use tokio::time::Duration;

/// Tuning knobs for a node. Anything left `None` takes the default listed on the field.
#[derive(Clone, Debug, Default)]
pub struct ElectionOptions {
    /// Lower bound (inclusive) of the randomized election timeout. Default 150ms.
    pub election_timeout_min: Option<Duration>,
    /// Upper bound (exclusive) of the randomized election timeout. Default 300ms.
    pub election_timeout_max: Option<Duration>,
    /// How often a leader sends heartbeats. Default 50ms.
    pub heartbeat_interval: Option<Duration>,
    /// Bound on each vote request and heartbeat sent to a peer. Default 100ms.
    pub rpc_timeout: Option<Duration>,
    /// Failure detector's default suspicion threshold. Default 500ms.
    pub suspicion_timeout: Option<Duration>,
    /// How often the failure detector monitor polls. Default 100ms.
    pub monitor_poll_interval: Option<Duration>,
}

#[derive(Clone, Debug)]
pub(super) struct ElectionOptionsValidated {
    pub election_timeout_min: Duration,
    pub election_timeout_max: Duration,
    pub heartbeat_interval: Duration,
    pub rpc_timeout: Duration,
    pub suspicion_timeout: Duration,
    pub monitor_poll_interval: Duration,
}

impl ElectionOptionsValidated {
    pub(super) fn election_timeout(&self) -> Range<Duration> {
        self.election_timeout_min..self.election_timeout_max
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.election_timeout_min >= self.election_timeout_max {
            return Err("Election timeout minimum must be less than maximum");
        }
        if self.heartbeat_interval >= self.election_timeout_min {
            return Err("Election timeout minimum must be greater than leader's heartbeat interval");
        }
        if self.rpc_timeout >= self.election_timeout_min {
            return Err("RPC timeout must be less than the election timeout minimum");
        }
        if self.heartbeat_interval == Duration::from_secs(0) {
            return Err("Heartbeat interval must be non-zero");
        }
        if self.monitor_poll_interval == Duration::from_secs(0) {
            return Err("Failure detector poll interval must be non-zero");
        }

        Ok(())
    }
}

impl TryFrom<ElectionOptions> for ElectionOptionsValidated {
    type Error = &'static str;

    fn try_from(options: ElectionOptions) -> Result<Self, Self::Error> {
        let values = ElectionOptionsValidated {
            election_timeout_min: options.election_timeout_min.unwrap_or(Duration::from_millis(150)),
            election_timeout_max: options.election_timeout_max.unwrap_or(Duration::from_millis(300)),
            heartbeat_interval: options.heartbeat_interval.unwrap_or(Duration::from_millis(50)),
            rpc_timeout: options.rpc_timeout.unwrap_or(Duration::from_millis(100)),
            suspicion_timeout: options.suspicion_timeout.unwrap_or(Duration::from_millis(500)),
            monitor_poll_interval: options.monitor_poll_interval.unwrap_or(Duration::from_millis(100)),
        };

        values.validate()?;
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = ElectionOptionsValidated::try_from(ElectionOptions::default()).unwrap();
        assert_eq!(options.election_timeout(), Duration::from_millis(150)..Duration::from_millis(300));
        assert_eq!(options.heartbeat_interval, Duration::from_millis(50));
        assert_eq!(options.rpc_timeout, Duration::from_millis(100));
        assert_eq!(options.suspicion_timeout, Duration::from_millis(500));
        assert_eq!(options.monitor_poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn rejects_inverted_election_bounds() {
        let options = ElectionOptions {
            election_timeout_min: Some(Duration::from_millis(300)),
            election_timeout_max: Some(Duration::from_millis(300)),
            ..Default::default()
        };
        assert!(ElectionOptionsValidated::try_from(options).is_err());
    }

    #[test]
    fn rejects_heartbeat_not_shorter_than_election_timeout() {
        let options = ElectionOptions {
            heartbeat_interval: Some(Duration::from_millis(150)),
            ..Default::default()
        };
        assert!(ElectionOptionsValidated::try_from(options).is_err());
    }

    #[test]
    fn rejects_rpc_timeout_not_shorter_than_election_timeout() {
        let options = ElectionOptions {
            rpc_timeout: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        assert!(ElectionOptionsValidated::try_from(options).is_err());
    }
}
