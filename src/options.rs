use std::fmt;
use std::time::Duration;

/// Which systemd manager to talk to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub enum BusScope {
    /// The system-wide manager on the system bus.
    #[default]
    System,
    /// The per-user manager on the session bus.
    User,
}

impl fmt::Display for BusScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusScope::System => f.write_str("system"),
            BusScope::User => f.write_str("user"),
        }
    }
}

/// Configuration options for `UnitCtl`.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct UnitCtlOptions {
    /// System or per-user manager.
    pub scope: BusScope,

    /// Wait for jobs via `JobRemoved` signals instead of polling.
    ///
    /// Requires feature=`observe`; `UnitCtl::open` fails with `Error::Connection` otherwise.
    pub event_loop: bool,

    /// D-Bus method call timeout.
    pub dbus_call_timeout: Duration,

    /// Fixed interval between job polls.
    pub job_poll_interval: Duration,
}

impl Default for UnitCtlOptions {
    fn default() -> Self {
        Self {
            scope: BusScope::System,
            event_loop: false,
            dbus_call_timeout: Duration::from_secs(5),
            job_poll_interval: Duration::from_millis(100),
        }
    }
}

impl UnitCtlOptions {
    /// Options for the per-user manager.
    pub fn user() -> Self {
        Self {
            scope: BusScope::User,
            ..Self::default()
        }
    }

    /// Enable or disable the event-driven job waiter.
    pub fn with_event_loop(mut self, enabled: bool) -> Self {
        self.event_loop = enabled;
        self
    }

    pub fn with_job_poll_interval(mut self, interval: Duration) -> Self {
        self.job_poll_interval = interval;
        self
    }

    pub fn with_dbus_call_timeout(mut self, timeout: Duration) -> Self {
        self.dbus_call_timeout = timeout;
        self
    }
}
