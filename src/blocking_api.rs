use crate::runtime::block_on_result;
use crate::{
    BusScope, EnableReport, InstallChange, JobHandle, JobResult, Manager, MatchOptions,
    PropertyValue, Result, Unit, UnitCtl, UnitCtlOptions, UnitFile, UnitFileOptions, UnitFiles,
    UnitStartMode, UnitStatus, Units, WaitOptions,
};

use std::collections::BTreeMap;

/// Blocking wrapper for `UnitCtl` (feature=`blocking`).
///
/// Every call drives the async implementation to completion on the selected runtime
/// (`rt-async-io` or `rt-tokio`) before returning. No background worker is kept.
#[derive(Clone, Debug)]
pub struct BlockingUnitCtl {
    inner: UnitCtl,
}

impl BlockingUnitCtl {
    pub fn connect_system() -> Result<Self> {
        Self::open(UnitCtlOptions::default())
    }

    pub fn connect_user() -> Result<Self> {
        Self::open(UnitCtlOptions::user())
    }

    pub fn open(opts: UnitCtlOptions) -> Result<Self> {
        let inner = block_on_result(UnitCtl::open(opts))?;
        Ok(Self { inner })
    }

    /// Close the client. Fails only when the blocking runtime cannot drive the close.
    pub fn close(&self) -> Result<()> {
        block_on_result(async {
            self.inner.close().await;
            Ok(())
        })
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn scope(&self) -> BusScope {
        self.inner.scope()
    }

    pub fn invalidate_unit_path(&self, path: &str) -> bool {
        self.inner.invalidate_unit_path(path)
    }

    /// The async client behind this wrapper.
    pub fn as_async(&self) -> &UnitCtl {
        &self.inner
    }

    pub fn units(&self) -> BlockingUnits {
        BlockingUnits {
            inner: self.inner.units(),
        }
    }

    pub fn unit_files(&self) -> BlockingUnitFiles {
        BlockingUnitFiles {
            inner: self.inner.unit_files(),
        }
    }

    pub fn manager(&self) -> BlockingManager {
        BlockingManager {
            inner: self.inner.manager(),
        }
    }

    #[cfg(feature = "observe")]
    pub fn observe(&self) -> BlockingObserve {
        BlockingObserve {
            inner: self.inner.observe(),
        }
    }
}

/// Blocking wrapper for `Units`.
#[derive(Clone, Debug)]
pub struct BlockingUnits {
    inner: Units,
}

impl BlockingUnits {
    pub fn start(&self, unit: &str, mode: UnitStartMode) -> Result<BlockingJobHandle> {
        let job = block_on_result(self.inner.start(unit, mode))?;
        Ok(BlockingJobHandle { inner: job })
    }

    pub fn stop(&self, unit: &str, mode: UnitStartMode) -> Result<BlockingJobHandle> {
        let job = block_on_result(self.inner.stop(unit, mode))?;
        Ok(BlockingJobHandle { inner: job })
    }

    pub fn restart(&self, unit: &str, mode: UnitStartMode) -> Result<BlockingJobHandle> {
        let job = block_on_result(self.inner.restart(unit, mode))?;
        Ok(BlockingJobHandle { inner: job })
    }

    pub fn reload(&self, unit: &str, mode: UnitStartMode) -> Result<BlockingJobHandle> {
        let job = block_on_result(self.inner.reload(unit, mode))?;
        Ok(BlockingJobHandle { inner: job })
    }

    pub fn reload_or_restart(&self, unit: &str, mode: UnitStartMode) -> Result<BlockingJobHandle> {
        let job = block_on_result(self.inner.reload_or_restart(unit, mode))?;
        Ok(BlockingJobHandle { inner: job })
    }

    pub fn start_wait(
        &self,
        unit: &str,
        mode: UnitStartMode,
        opts: WaitOptions,
    ) -> Result<JobResult> {
        block_on_result(self.inner.start_wait(unit, mode, opts))
    }

    pub fn stop_wait(
        &self,
        unit: &str,
        mode: UnitStartMode,
        opts: WaitOptions,
    ) -> Result<JobResult> {
        block_on_result(self.inner.stop_wait(unit, mode, opts))
    }

    pub fn restart_wait(
        &self,
        unit: &str,
        mode: UnitStartMode,
        opts: WaitOptions,
    ) -> Result<JobResult> {
        block_on_result(self.inner.restart_wait(unit, mode, opts))
    }

    pub fn reload_wait(
        &self,
        unit: &str,
        mode: UnitStartMode,
        opts: WaitOptions,
    ) -> Result<JobResult> {
        block_on_result(self.inner.reload_wait(unit, mode, opts))
    }

    pub fn reload_or_restart_wait(
        &self,
        unit: &str,
        mode: UnitStartMode,
        opts: WaitOptions,
    ) -> Result<JobResult> {
        block_on_result(self.inner.reload_or_restart_wait(unit, mode, opts))
    }

    pub fn wait_path(&self, job_path: &str, opts: WaitOptions) -> Result<JobResult> {
        block_on_result(self.inner.wait_path(job_path, opts))
    }

    pub fn reset_failed(&self, unit: Option<&str>) -> Result<()> {
        block_on_result(self.inner.reset_failed(unit))
    }

    pub fn object_path(&self, unit: &str) -> Result<String> {
        block_on_result(self.inner.object_path(unit))
    }

    pub fn exists(&self, unit: &str, installed_ok: bool) -> Result<bool> {
        block_on_result(self.inner.exists(unit, installed_ok))
    }

    pub fn is_active(&self, unit: &str) -> Result<bool> {
        block_on_result(self.inner.is_active(unit))
    }

    pub fn active_state(&self, unit: &str, default: Option<&str>) -> Result<String> {
        block_on_result(self.inner.active_state(unit, default))
    }

    pub fn sub_state(&self, unit: &str, default: Option<&str>) -> Result<String> {
        block_on_result(self.inner.sub_state(unit, default))
    }

    pub fn get_unit_properties(
        &self,
        unit: &str,
        keys: &[&str],
    ) -> Result<BTreeMap<String, PropertyValue>> {
        block_on_result(self.inner.get_unit_properties(unit, keys))
    }

    pub fn get_service_properties(
        &self,
        unit: &str,
        keys: &[&str],
    ) -> Result<BTreeMap<String, PropertyValue>> {
        block_on_result(self.inner.get_service_properties(unit, keys))
    }
}

/// Blocking wrapper for `JobHandle`.
#[derive(Clone, Debug)]
pub struct BlockingJobHandle {
    inner: JobHandle,
}

impl BlockingJobHandle {
    pub fn unit(&self) -> &str {
        &self.inner.unit
    }

    pub fn job_path(&self) -> &str {
        &self.inner.job_path
    }

    pub fn wait(&self, opts: WaitOptions) -> Result<JobResult> {
        block_on_result(self.inner.wait(opts))
    }

    pub fn into_async(self) -> JobHandle {
        self.inner
    }
}

/// Blocking wrapper for `UnitFiles`.
#[derive(Clone, Debug)]
pub struct BlockingUnitFiles {
    inner: UnitFiles,
}

impl BlockingUnitFiles {
    pub fn enable<S: AsRef<str>>(
        &self,
        names: &[S],
        opts: UnitFileOptions,
    ) -> Result<EnableReport> {
        block_on_result(self.inner.enable(names, opts))
    }

    pub fn disable<S: AsRef<str>>(
        &self,
        names: &[S],
        opts: UnitFileOptions,
    ) -> Result<Vec<InstallChange>> {
        block_on_result(self.inner.disable(names, opts))
    }

    pub fn mask<S: AsRef<str>>(
        &self,
        names: &[S],
        opts: UnitFileOptions,
    ) -> Result<Vec<InstallChange>> {
        block_on_result(self.inner.mask(names, opts))
    }

    pub fn unmask<S: AsRef<str>>(
        &self,
        names: &[S],
        opts: UnitFileOptions,
    ) -> Result<Vec<InstallChange>> {
        block_on_result(self.inner.unmask(names, opts))
    }

    pub fn state(&self, file: &str) -> Result<String> {
        block_on_result(self.inner.state(file))
    }
}

/// Blocking wrapper for `Manager`.
#[derive(Clone, Debug)]
pub struct BlockingManager {
    inner: Manager,
}

impl BlockingManager {
    pub fn list_units(&self) -> Result<Vec<Unit>> {
        block_on_result(self.inner.list_units())
    }

    pub fn list_unit_files(&self) -> Result<Vec<UnitFile>> {
        block_on_result(self.inner.list_unit_files())
    }

    pub fn daemon_reload(&self) -> Result<()> {
        block_on_result(self.inner.daemon_reload())
    }

    pub fn match_units<S: AsRef<str>>(
        &self,
        patterns: &[S],
        opts: MatchOptions,
    ) -> Result<Vec<UnitStatus>> {
        block_on_result(self.inner.match_units(patterns, opts))
    }
}

/// Blocking wrapper for `Observe` (feature=`observe`).
#[cfg(feature = "observe")]
#[derive(Clone, Debug)]
pub struct BlockingObserve {
    inner: crate::Observe,
}

#[cfg(feature = "observe")]
impl BlockingObserve {
    pub fn subscribe(&self) -> Result<()> {
        block_on_result(self.inner.subscribe())
    }

    pub fn unsubscribe(&self) -> Result<()> {
        block_on_result(self.inner.unsubscribe())
    }

    pub fn watch_unit_properties(
        &self,
        unit: &str,
        only: Option<&[&str]>,
    ) -> Result<BlockingPropertyWatcher> {
        let inner = block_on_result(self.inner.watch_unit_properties(unit, only))?;
        Ok(BlockingPropertyWatcher { inner })
    }
}

/// Blocking wrapper for `PropertyWatcher` (feature=`observe`).
#[cfg(feature = "observe")]
#[derive(Debug)]
pub struct BlockingPropertyWatcher {
    inner: crate::PropertyWatcher,
}

#[cfg(feature = "observe")]
impl BlockingPropertyWatcher {
    pub fn unit(&self) -> &str {
        self.inner.unit()
    }

    /// Block until the next batch of changes; `None` once unregistered.
    pub fn next(&mut self) -> Result<Option<BTreeMap<String, PropertyValue>>> {
        block_on_result(self.inner.next())
    }

    pub fn unregister(&self) {
        self.inner.unregister();
    }

    pub fn unregister_handle(&self) -> crate::Unregister {
        self.inner.unregister_handle()
    }
}
