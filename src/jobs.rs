//! Waiting for systemd jobs to finish.
//!
//! Two strategies sit behind [`WaitStrategy`]:
//! - [`PollWaiter`] polls `Job.State` until the job object disappears, then judges success from
//!   the target unit's final state. The job result code itself is never visible this way, so
//!   the verdict is a heuristic.
//! - `EventWaiter` (feature=`observe`) listens for `Manager.JobRemoved` and uses the reported
//!   result, racing it against the caller's deadline. It falls back to polling for the current
//!   call when the manager subscription or the signal stream is unavailable.
//!
//! The strategy is picked once when the client is opened. Only one event-driven wait per
//! connection at a time is supported.

use crate::runtime::{self, BoxFuture};
use crate::{Error, JobHandle, JobResult, Result, UnitCtlOptions, WaitOptions, bus, codec, fault};

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

const SYSTEMD_JOB_INTERFACE: &str = "org.freedesktop.systemd1.Job";

/// A job to wait for, with the unit/type known from the call that queued it (if any).
#[derive(Clone, Copy, Debug)]
pub(crate) struct JobRef<'a> {
    pub(crate) path: &'a str,
    pub(crate) hint: Option<JobTarget<'a>>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct JobTarget<'a> {
    pub(crate) unit: &'a str,
    pub(crate) job_type: &'a str,
}

pub(crate) trait WaitStrategy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn wait<'a>(
        &'a self,
        root: &'a crate::Inner,
        job: JobRef<'a>,
        opts: WaitOptions,
    ) -> BoxFuture<'a, Result<JobResult>>;
}

/// Pick the wait strategy for a freshly opened client.
pub(crate) fn select_strategy(opts: &UnitCtlOptions) -> Arc<dyn WaitStrategy> {
    let poll = PollWaiter {
        interval: opts.job_poll_interval,
    };

    #[cfg(feature = "observe")]
    if opts.event_loop {
        return Arc::new(EventWaiter { fallback: poll });
    }

    Arc::new(poll)
}

/// Wait for `job` with the client's strategy.
pub(crate) async fn dispatch(
    root: &crate::Inner,
    job: JobRef<'_>,
    opts: WaitOptions,
) -> Result<JobResult> {
    let opts = opts.normalized();

    #[cfg(feature = "tracing")]
    tracing::debug!(job_path = %job.path, strategy = root.waiter.name(), timeout = ?opts.timeout, "wait_job start");

    let res = root.waiter.wait(root, job, opts).await;

    #[cfg(feature = "tracing")]
    match &res {
        Ok(r) => tracing::debug!(job_path = %job.path, result = %r, "wait_job done"),
        Err(e) => tracing::debug!(job_path = %job.path, error = %e, "wait_job failed"),
    }

    res
}

impl JobHandle {
    /// Block until the job finished, failed or the deadline passed.
    pub async fn wait(&self, opts: WaitOptions) -> Result<JobResult> {
        let job = JobRef {
            path: &self.job_path,
            hint: Some(JobTarget {
                unit: &self.unit,
                job_type: self.job_type.as_job_str(),
            }),
        };
        dispatch(&self.root, job, opts).await
    }
}

/// Turn a final result into the caller-visible value per `raise_on_fail`.
pub(crate) fn settle(
    job_path: &str,
    result: JobResult,
    raw: &str,
    raise_on_fail: bool,
) -> Result<JobResult> {
    if result.is_done() || !raise_on_fail {
        return Ok(result);
    }
    Err(Error::JobFailed {
        job_path: job_path.to_string(),
        result: raw.to_string(),
    })
}

/// Map a `JobRemoved` result string.
pub(crate) fn classify_job_result(result: &str) -> JobResult {
    if result == "done" {
        JobResult::Done
    } else {
        JobResult::Failed
    }
}

/// Polling decision table applied once the job object is gone.
///
/// - `stop` jobs succeed iff the unit is `inactive` or `failed`;
/// - other jobs succeed if the unit is `active`;
/// - otherwise a `oneshot` service succeeds iff its last exit status is 0;
/// - otherwise anything not `failed` counts as success.
pub(crate) fn judge_completion(
    job_type: &str,
    active_state: &str,
    service_type: Option<&str>,
    exec_main_status: Option<i64>,
) -> bool {
    if job_type == "stop" {
        return matches!(active_state, "inactive" | "failed");
    }
    if active_state == "active" {
        return true;
    }
    if service_type == Some("oneshot") {
        return exec_main_status.unwrap_or(0) == 0;
    }
    active_state != "failed"
}

fn needs_service_facts(job_type: &str, active_state: &str) -> bool {
    job_type != "stop" && active_state != "active"
}

#[derive(Clone, Debug)]
pub(crate) struct PollWaiter {
    interval: Duration,
}

impl WaitStrategy for PollWaiter {
    fn name(&self) -> &'static str {
        "poll"
    }

    fn wait<'a>(
        &'a self,
        root: &'a crate::Inner,
        job: JobRef<'a>,
        opts: WaitOptions,
    ) -> BoxFuture<'a, Result<JobResult>> {
        Box::pin(self.poll(root, job, opts))
    }
}

impl PollWaiter {
    async fn poll(
        &self,
        root: &crate::Inner,
        job: JobRef<'_>,
        opts: WaitOptions,
    ) -> Result<JobResult> {
        let deadline = opts.timeout.map(|t| Instant::now() + t);
        let props = root.bus.properties_proxy(job.path).await?;

        let (unit, job_type, running) = match read_job_target(&props, job.path).await {
            Ok((unit, job_type)) => (unit, job_type, true),
            Err(e) if fault::is_object_gone(&e) => match job.hint {
                Some(hint) => (hint.unit.to_string(), hint.job_type.to_string(), false),
                None => return Err(e),
            },
            Err(e) => return Err(e),
        };

        if running {
            loop {
                let Some(nap) = poll_step(deadline, Instant::now(), self.interval) else {
                    return settle(
                        job.path,
                        JobResult::TimeoutWait,
                        JobResult::TimeoutWait.as_str(),
                        opts.raise_on_fail,
                    );
                };

                match job_property(&props, job.path, "State").await {
                    Ok(_state) => {}
                    Err(e) if fault::is_object_gone(&e) => break,
                    Err(e) => return Err(e),
                }

                runtime::sleep(nap).await;
            }
        }

        let ok = resolve_completion(root, &unit, &job_type).await?;
        let result = if ok {
            JobResult::Done
        } else {
            JobResult::Failed
        };
        settle(job.path, result, result.as_str(), opts.raise_on_fail)
    }
}

/// How long to sleep before the next poll, or `None` once `deadline` has passed.
fn poll_step(deadline: Option<Instant>, now: Instant, interval: Duration) -> Option<Duration> {
    match deadline {
        Some(d) if now >= d => None,
        Some(d) => Some((d - now).min(interval)),
        None => Some(interval),
    }
}

/// The part of `timeout` not yet used up after `elapsed`.
#[cfg(feature = "observe")]
fn remaining(timeout: Option<Duration>, elapsed: Duration) -> Option<Duration> {
    timeout.map(|t| t.saturating_sub(elapsed))
}

/// Read `Job.JobType` and the unit name from `Job.Unit` (`(so)`).
async fn read_job_target(props: &zbus::Proxy<'_>, job_path: &str) -> Result<(String, String)> {
    let job_type = job_property(props, job_path, "JobType").await?;
    let unit = job_property(props, job_path, "Unit").await?;

    let job_type = codec::decode_owned(&job_type);
    let unit = codec::decode_owned(&unit);
    let job_type = job_type.as_str().unwrap_or_default().to_string();
    let unit = unit
        .as_struct()
        .and_then(|fields| fields.first())
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Transport {
            action: "job_property",
            name: None,
            detail: format!("unexpected Job.Unit value for {job_path}"),
        })?
        .to_string();
    Ok((unit, job_type))
}

async fn job_property(
    props: &zbus::Proxy<'_>,
    job_path: &str,
    name: &str,
) -> Result<zbus::zvariant::OwnedValue> {
    bus::get_property(props, "job_property", job_path, SYSTEMD_JOB_INTERFACE, name).await
}

async fn resolve_completion(root: &crate::Inner, unit: &str, job_type: &str) -> Result<bool> {
    let active_state = match crate::units::active_state_or(root, unit, Some("inactive")).await {
        Ok(s) => s,
        Err(Error::Closed) => return Err(Error::Closed),
        Err(_) => "failed".to_string(),
    };

    if !needs_service_facts(job_type, &active_state) {
        return Ok(judge_completion(job_type, &active_state, None, None));
    }

    let facts =
        crate::units::service_properties(root, unit, &["Type", "ExecMainStatus"]).await?;
    let service_type = facts.get("Type").and_then(|v| v.as_str());
    let exec_main_status = facts.get("ExecMainStatus").and_then(|v| v.as_i64());

    Ok(judge_completion(
        job_type,
        &active_state,
        service_type,
        exec_main_status,
    ))
}

#[cfg(feature = "observe")]
#[derive(Clone, Debug)]
pub(crate) struct EventWaiter {
    fallback: PollWaiter,
}

#[cfg(feature = "observe")]
impl WaitStrategy for EventWaiter {
    fn name(&self) -> &'static str {
        "event"
    }

    fn wait<'a>(
        &'a self,
        root: &'a crate::Inner,
        job: JobRef<'a>,
        opts: WaitOptions,
    ) -> BoxFuture<'a, Result<JobResult>> {
        Box::pin(self.listen(root, job, opts))
    }
}

#[cfg(feature = "observe")]
impl EventWaiter {
    async fn listen(
        &self,
        root: &crate::Inner,
        job: JobRef<'_>,
        opts: WaitOptions,
    ) -> Result<JobResult> {
        use futures_util::{FutureExt, StreamExt};

        let started = Instant::now();
        let rest = || WaitOptions {
            timeout: remaining(opts.timeout, started.elapsed()),
            ..opts
        };

        if let Err(e) = root.bus.ensure_subscribed().await {
            if matches!(e, Error::Closed) {
                return Err(e);
            }
            #[cfg(feature = "tracing")]
            tracing::debug!(job_path = %job.path, error = %e, "subscribe failed, polling instead");
            return self.fallback.poll(root, job, rest()).await;
        }

        let manager = root.bus.manager_proxy()?;
        let signals = match manager.receive_signal("JobRemoved").await {
            Ok(s) => s,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(job_path = %job.path, error = %_e, "JobRemoved stream unavailable, polling instead");
                return self.fallback.poll(root, job, rest()).await;
            }
        };
        let mut signals = signals.fuse();

        // The job may have finished before the stream existed.
        let props = root.bus.properties_proxy(job.path).await?;
        match job_property(&props, job.path, "State").await {
            Ok(_) => {}
            Err(e) if fault::is_object_gone(&e) => {
                return self.fallback.poll(root, job, rest()).await;
            }
            Err(e) => return Err(e),
        }

        let mut deadline = runtime::deadline(rest().timeout).fuse();
        loop {
            futures_util::select! {
                _ = deadline => {
                    return settle(
                        job.path,
                        JobResult::TimeoutWait,
                        JobResult::TimeoutWait.as_str(),
                        opts.raise_on_fail,
                    );
                }
                msg = signals.next() => {
                    let Some(msg) = msg else {
                        return self.fallback.poll(root, job, rest()).await;
                    };
                    if let Some(result) = decode_job_removed(job.path, &msg)? {
                        let outcome = classify_job_result(&result);
                        return settle(job.path, outcome, &result, opts.raise_on_fail);
                    }
                }
            }
        }
    }
}

/// Returns the job result if `msg` is the `JobRemoved` signal for `job_path`.
#[cfg(feature = "observe")]
fn decode_job_removed(job_path: &str, msg: &zbus::Message) -> Result<Option<String>> {
    let body = msg.body();
    let decoded: std::result::Result<(u32, zbus::zvariant::OwnedObjectPath, String, String), _> =
        body.deserialize();
    let (_id, job, _unit, result) = decoded.map_err(|e| Error::Transport {
        action: "job_removed",
        name: None,
        detail: format!("signal decode: {e}"),
    })?;

    if job.as_str() == job_path {
        return Ok(Some(result));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn stop_job_succeeds_only_when_unit_no_longer_active() {
        assert!(judge_completion("stop", "inactive", None, None));
        assert!(judge_completion("stop", "failed", None, None));
        assert!(!judge_completion("stop", "active", None, None));
        assert!(!judge_completion("stop", "deactivating", None, None));
    }

    #[test]
    fn non_stop_job_succeeds_when_active() {
        assert!(judge_completion("start", "active", None, None));
        assert!(judge_completion("restart", "active", Some("oneshot"), Some(1)));
    }

    #[test]
    fn oneshot_uses_exit_status() {
        assert!(judge_completion("start", "inactive", Some("oneshot"), Some(0)));
        assert!(!judge_completion("start", "inactive", Some("oneshot"), Some(3)));
        assert!(!judge_completion("start", "failed", Some("oneshot"), Some(1)));
        assert!(judge_completion("start", "inactive", Some("oneshot"), None));
    }

    #[test]
    fn non_oneshot_fallback_is_optimistic_unless_failed() {
        assert!(judge_completion("start", "inactive", Some("simple"), None));
        assert!(judge_completion("reload", "activating", None, None));
        assert!(!judge_completion("start", "failed", Some("simple"), Some(0)));
        assert!(!judge_completion("start", "failed", None, None));
    }

    #[test]
    fn service_facts_only_needed_for_inconclusive_states() {
        assert!(!needs_service_facts("stop", "inactive"));
        assert!(!needs_service_facts("start", "active"));
        assert!(needs_service_facts("start", "inactive"));
        assert!(needs_service_facts("start", "failed"));
    }

    #[test]
    fn job_removed_results_map_to_done_or_failed() {
        assert_eq!(classify_job_result("done"), JobResult::Done);
        for r in ["canceled", "dependency", "timeout", "skipped", "failed"] {
            assert_eq!(classify_job_result(r), JobResult::Failed);
        }
    }

    #[test]
    fn settle_raises_only_when_asked() {
        let p = "/org/freedesktop/systemd1/job/42";

        assert_eq!(
            settle(p, JobResult::Done, "done", true).expect("ok"),
            JobResult::Done
        );
        assert_eq!(
            settle(p, JobResult::Failed, "canceled", false).expect("ok"),
            JobResult::Failed
        );
        assert_eq!(
            settle(p, JobResult::TimeoutWait, "timeout-wait", false).expect("ok"),
            JobResult::TimeoutWait
        );

        let err = settle(p, JobResult::Failed, "dependency", true).expect_err("must fail");
        let Error::JobFailed { job_path, result } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(job_path, p);
        assert_eq!(result, "dependency");

        let err = settle(p, JobResult::TimeoutWait, "timeout-wait", true).expect_err("must fail");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn poll_naps_are_clipped_to_the_deadline() {
        let interval = Duration::from_millis(100);
        let start = Instant::now();
        let deadline = Some(start + Duration::from_millis(250));

        let mut now = start;
        let mut naps = Vec::new();
        while let Some(nap) = poll_step(deadline, now, interval) {
            naps.push(nap);
            now += nap;
        }
        assert_eq!(
            naps,
            [
                Duration::from_millis(100),
                Duration::from_millis(100),
                Duration::from_millis(50),
            ]
        );
        assert_eq!(now - start, Duration::from_millis(250));
    }

    #[test]
    fn poll_step_without_deadline_never_expires() {
        let interval = Duration::from_millis(100);
        assert_eq!(poll_step(None, Instant::now(), interval), Some(interval));

        let now = Instant::now();
        assert_eq!(poll_step(Some(now), now, interval), None);
        assert_eq!(
            poll_step(Some(now), now + Duration::from_secs(1), interval),
            None
        );
    }

    #[cfg(feature = "observe")]
    #[test]
    fn remaining_timeout_counts_setup_time() {
        let elapsed = Duration::from_millis(400);
        assert_eq!(
            remaining(Some(Duration::from_secs(1)), elapsed),
            Some(Duration::from_millis(600))
        );
        assert_eq!(
            remaining(Some(Duration::from_millis(300)), elapsed),
            Some(Duration::ZERO)
        );
        assert_eq!(remaining(None, elapsed), None);
    }

    #[test]
    fn polling_is_the_default_strategy() {
        let s = select_strategy(&UnitCtlOptions::default());
        assert_eq!(s.name(), "poll");
    }

    #[cfg(feature = "observe")]
    #[test]
    fn event_loop_selects_event_strategy() {
        let s = select_strategy(&UnitCtlOptions::default().with_event_loop(true));
        assert_eq!(s.name(), "event");
    }

    #[cfg(feature = "observe")]
    #[test]
    fn decode_job_removed_matches_only_own_job() {
        let path = zbus::zvariant::ObjectPath::try_from("/org/freedesktop/systemd1/job/7")
            .expect("path");
        let msg = zbus::Message::signal(
            "/org/freedesktop/systemd1",
            "org.freedesktop.systemd1.Manager",
            "JobRemoved",
        )
        .expect("builder")
        .build(&(7u32, path, "ssh.service", "canceled"))
        .expect("msg");

        assert_eq!(
            decode_job_removed("/org/freedesktop/systemd1/job/7", &msg).expect("decode"),
            Some("canceled".to_string())
        );
        assert_eq!(
            decode_job_removed("/org/freedesktop/systemd1/job/8", &msg).expect("decode"),
            None
        );
    }
}
