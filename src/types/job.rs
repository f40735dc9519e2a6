use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle call that queued a job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[non_exhaustive]
pub enum JobType {
    Start,
    Stop,
    Restart,
    Reload,
    ReloadOrRestart,
}

impl JobType {
    /// Manager method that queues this kind of job.
    pub(crate) fn dbus_method(self) -> &'static str {
        match self {
            JobType::Start => "StartUnit",
            JobType::Stop => "StopUnit",
            JobType::Restart => "RestartUnit",
            JobType::Reload => "ReloadUnit",
            JobType::ReloadOrRestart => "ReloadOrRestartUnit",
        }
    }

    pub(crate) fn action(self) -> &'static str {
        match self {
            JobType::Start => "start_unit",
            JobType::Stop => "stop_unit",
            JobType::Restart => "restart_unit",
            JobType::Reload => "reload_unit",
            JobType::ReloadOrRestart => "reload_or_restart_unit",
        }
    }

    /// Value of `Job.JobType` systemd reports for this kind of job (best effort for
    /// reload-or-restart, which systemd resolves to either).
    pub(crate) fn as_job_str(self) -> &'static str {
        match self {
            JobType::Start => "start",
            JobType::Stop => "stop",
            JobType::Restart | JobType::ReloadOrRestart => "restart",
            JobType::Reload => "reload",
        }
    }
}

/// Final outcome of waiting for a job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[non_exhaustive]
pub enum JobResult {
    Done,
    Failed,
    /// The local deadline passed before the job finished.
    TimeoutWait,
}

impl JobResult {
    pub fn as_str(self) -> &'static str {
        match self {
            JobResult::Done => "done",
            JobResult::Failed => "failed",
            JobResult::TimeoutWait => "timeout-wait",
        }
    }

    pub fn is_done(self) -> bool {
        self == JobResult::Done
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for waiting on a job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct WaitOptions {
    /// Deadline relative to the start of the wait; `None` or zero waits indefinitely.
    pub timeout: Option<Duration>,
    /// Return `Err(Error::JobFailed)` instead of `Ok(Failed | TimeoutWait)`.
    ///
    /// Transport faults are always returned as errors.
    pub raise_on_fail: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            raise_on_fail: true,
        }
    }
}

impl WaitOptions {
    /// Give up after `timeout`. A zero duration means no deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout).filter(|t| !t.is_zero());
        self
    }

    pub fn raise_on_fail(mut self, raise: bool) -> Self {
        self.raise_on_fail = raise;
        self
    }

    /// Same options with a zero `timeout` treated as no deadline.
    pub(crate) fn normalized(self) -> Self {
        Self {
            timeout: self.timeout.filter(|t| !t.is_zero()),
            ..self
        }
    }
}

/// Handle for a queued systemd job.
///
/// Returned as soon as the manager accepted the job; the job has not necessarily finished.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct JobHandle {
    pub unit: String,
    pub job_path: String,
    pub job_type: JobType,

    #[doc(hidden)]
    pub(crate) root: Arc<crate::Inner>,
}

impl JobHandle {
    pub fn as_str(&self) -> &str {
        &self.job_path
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.unit, self.job_path)
    }
}
