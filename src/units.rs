use crate::jobs::{self, JobRef};
use crate::{
    Error, JobHandle, JobResult, JobType, PropertyValue, Result, UnitStartMode, WaitOptions, bus,
    codec, fault, util,
};

use std::collections::BTreeMap;
use std::sync::Arc;

const SYSTEMD_UNIT_INTERFACE: &str = "org.freedesktop.systemd1.Unit";
const SYSTEMD_SERVICE_INTERFACE: &str = "org.freedesktop.systemd1.Service";

/// Unit properties read by [`Units::get_unit_properties`] when no keys are given.
pub const DEFAULT_UNIT_PROPERTIES: &[&str] = &[
    "Id",
    "Description",
    "LoadState",
    "ActiveState",
    "SubState",
    "FragmentPath",
    "UnitFileState",
    "InactiveEnterTimestamp",
    "ActiveEnterTimestamp",
];

/// Service properties read by [`Units::get_service_properties`] when no keys are given.
pub const DEFAULT_SERVICE_PROPERTIES: &[&str] =
    &["ExecMainPID", "ExecMainStatus", "MainPID", "Type", "Restart"];

#[derive(Clone, Debug)]
/// Unit lifecycle control and per-unit property reads.
pub struct Units {
    inner: Arc<crate::Inner>,
}

impl Units {
    pub(crate) fn new(inner: Arc<crate::Inner>) -> Self {
        Self { inner }
    }

    /// Start a unit and return a job handle.
    ///
    /// `unit` is canonicalized (e.g. `"nginx"` becomes `"nginx.service"`).
    pub async fn start(&self, unit: &str, mode: UnitStartMode) -> Result<JobHandle> {
        self.queue(JobType::Start, unit, mode).await
    }

    /// Stop a unit and return a job handle.
    pub async fn stop(&self, unit: &str, mode: UnitStartMode) -> Result<JobHandle> {
        self.queue(JobType::Stop, unit, mode).await
    }

    /// Restart a unit and return a job handle.
    pub async fn restart(&self, unit: &str, mode: UnitStartMode) -> Result<JobHandle> {
        self.queue(JobType::Restart, unit, mode).await
    }

    /// Reload a unit and return a job handle.
    pub async fn reload(&self, unit: &str, mode: UnitStartMode) -> Result<JobHandle> {
        self.queue(JobType::Reload, unit, mode).await
    }

    /// Reload a unit if it supports it, restart it otherwise.
    pub async fn reload_or_restart(&self, unit: &str, mode: UnitStartMode) -> Result<JobHandle> {
        self.queue(JobType::ReloadOrRestart, unit, mode).await
    }

    pub async fn start_wait(
        &self,
        unit: &str,
        mode: UnitStartMode,
        opts: WaitOptions,
    ) -> Result<JobResult> {
        self.start(unit, mode).await?.wait(opts).await
    }

    pub async fn stop_wait(
        &self,
        unit: &str,
        mode: UnitStartMode,
        opts: WaitOptions,
    ) -> Result<JobResult> {
        self.stop(unit, mode).await?.wait(opts).await
    }

    pub async fn restart_wait(
        &self,
        unit: &str,
        mode: UnitStartMode,
        opts: WaitOptions,
    ) -> Result<JobResult> {
        self.restart(unit, mode).await?.wait(opts).await
    }

    pub async fn reload_wait(
        &self,
        unit: &str,
        mode: UnitStartMode,
        opts: WaitOptions,
    ) -> Result<JobResult> {
        self.reload(unit, mode).await?.wait(opts).await
    }

    pub async fn reload_or_restart_wait(
        &self,
        unit: &str,
        mode: UnitStartMode,
        opts: WaitOptions,
    ) -> Result<JobResult> {
        self.reload_or_restart(unit, mode).await?.wait(opts).await
    }

    async fn queue(&self, job_type: JobType, unit: &str, mode: UnitStartMode) -> Result<JobHandle> {
        let unit = util::canonicalize_unit_name(unit)?;
        let mode_str = mode.as_dbus_str();
        util::validate_no_control("mode", mode_str)?;
        let action = job_type.action();

        #[cfg(feature = "tracing")]
        tracing::info!(%unit, %mode_str, %action, "systemd unit request");

        let job_path = self
            .inner
            .bus
            .queue_job(job_type.dbus_method(), action, &unit, mode_str)
            .await?;

        Ok(JobHandle {
            unit,
            job_path: job_path.to_string(),
            job_type,
            root: self.inner.clone(),
        })
    }

    /// Wait for a job known only by its object path.
    ///
    /// Unlike [`JobHandle::wait`], the polling strategy cannot judge a job that already
    /// disappeared; that case returns the mapped not-found error.
    pub async fn wait_path(&self, job_path: &str, opts: WaitOptions) -> Result<JobResult> {
        util::validate_no_control("job path", job_path)?;
        if !job_path.starts_with('/') {
            return Err(Error::invalid_input("job path must be an object path"));
        }
        let job = JobRef {
            path: job_path,
            hint: None,
        };
        jobs::dispatch(&self.inner, job, opts).await
    }

    /// `ResetFailedUnit(unit)`, or `ResetFailed()` for every unit when `unit` is `None`.
    pub async fn reset_failed(&self, unit: Option<&str>) -> Result<()> {
        let unit = unit.map(util::canonicalize_unit_name).transpose()?;

        #[cfg(feature = "tracing")]
        tracing::info!(unit = unit.as_deref().unwrap_or("*"), "reset_failed");

        self.inner.bus.reset_failed(unit.as_deref()).await
    }

    /// Object path of a unit (`GetUnit`, falling back to `LoadUnit`).
    pub async fn object_path(&self, unit: &str) -> Result<String> {
        let unit = util::canonicalize_unit_name(unit)?;
        self.inner.cache.resolve(&self.inner.bus, &unit).await
    }

    /// Whether systemd knows the unit.
    ///
    /// A loaded unit always counts. With `installed_ok`, a unit that only exists as an installed
    /// unit file counts too. Faults other than "not found" are returned.
    pub async fn exists(&self, unit: &str, installed_ok: bool) -> Result<bool> {
        let unit = util::canonicalize_unit_name(unit)?;

        match self.inner.bus.get_unit(&unit).await {
            Ok(_) => return Ok(true),
            Err(e) if fault::is_absent(&e) => {}
            Err(e) => return Err(e),
        }
        if !installed_ok {
            return Ok(false);
        }

        match self.inner.bus.get_unit_file_state(&unit).await {
            Ok(_) => Ok(true),
            Err(e) if fault::is_absent(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn is_active(&self, unit: &str) -> Result<bool> {
        let state = active_state_or(&self.inner, unit, Some("inactive")).await?;
        Ok(state == "active")
    }

    /// `Unit.ActiveState`. With `default`, an unknown unit yields `default` instead of
    /// `Error::UnitNotFound`.
    pub async fn active_state(&self, unit: &str, default: Option<&str>) -> Result<String> {
        active_state_or(&self.inner, unit, default).await
    }

    /// `Unit.SubState`, with the same `default` handling as [`active_state`](Self::active_state).
    pub async fn sub_state(&self, unit: &str, default: Option<&str>) -> Result<String> {
        unit_string_or(&self.inner, unit, "SubState", default).await
    }

    /// Read `org.freedesktop.systemd1.Unit` properties; empty `keys` reads
    /// [`DEFAULT_UNIT_PROPERTIES`].
    pub async fn get_unit_properties(
        &self,
        unit: &str,
        keys: &[&str],
    ) -> Result<BTreeMap<String, PropertyValue>> {
        let unit = util::canonicalize_unit_name(unit)?;
        let keys = if keys.is_empty() {
            DEFAULT_UNIT_PROPERTIES
        } else {
            keys
        };

        let props = self.inner.cache.for_unit(&self.inner.bus, &unit).await?;
        let mut out = BTreeMap::new();
        for key in keys {
            util::validate_no_control("property", key)?;
            let v =
                bus::get_property(&props, "get_unit_properties", &unit, SYSTEMD_UNIT_INTERFACE, key)
                    .await?;
            out.insert(key.to_string(), codec::decode_owned(&v));
        }
        Ok(out)
    }

    /// Read `org.freedesktop.systemd1.Service` properties; empty `keys` reads
    /// [`DEFAULT_SERVICE_PROPERTIES`]. Properties the unit does not expose are left out.
    pub async fn get_service_properties(
        &self,
        unit: &str,
        keys: &[&str],
    ) -> Result<BTreeMap<String, PropertyValue>> {
        let keys = if keys.is_empty() {
            DEFAULT_SERVICE_PROPERTIES
        } else {
            keys
        };
        for key in keys {
            util::validate_no_control("property", key)?;
        }
        service_properties(&self.inner, unit, keys).await
    }
}

pub(crate) async fn active_state_or(
    inner: &crate::Inner,
    unit: &str,
    default: Option<&str>,
) -> Result<String> {
    unit_string_or(inner, unit, "ActiveState", default).await
}

async fn unit_string_or(
    inner: &crate::Inner,
    unit: &str,
    property: &'static str,
    default: Option<&str>,
) -> Result<String> {
    let unit = util::canonicalize_unit_name(unit)?;
    let read = async {
        let props = inner.cache.for_unit(&inner.bus, &unit).await?;
        bus::get_property(&props, "get_unit_property", &unit, SYSTEMD_UNIT_INTERFACE, property)
            .await
    };

    let read = read.await.map(|v| {
        codec::decode_owned(&v)
            .as_str()
            .unwrap_or_default()
            .to_string()
    });
    or_default(read, default)
}

/// Replace a not-found read with `default`, when one is given.
fn or_default(read: Result<String>, default: Option<&str>) -> Result<String> {
    match read {
        Err(e) if e.is_not_found() => match default {
            Some(d) => Ok(d.to_string()),
            None => Err(e),
        },
        other => other,
    }
}

pub(crate) async fn service_properties(
    inner: &crate::Inner,
    unit: &str,
    keys: &[&str],
) -> Result<BTreeMap<String, PropertyValue>> {
    let unit = util::canonicalize_unit_name(unit)?;
    let props = inner.cache.for_unit(&inner.bus, &unit).await?;

    let mut out = BTreeMap::new();
    for key in keys {
        match bus::get_property(
            &props,
            "get_service_properties",
            &unit,
            SYSTEMD_SERVICE_INTERFACE,
            key,
        )
        .await
        {
            Ok(v) => {
                out.insert(key.to_string(), codec::decode_owned(&v));
            }
            Err(e) if fault::is_missing_member(&e) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(%unit, property = %key, "service property not exposed");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}
