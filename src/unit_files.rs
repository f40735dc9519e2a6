use crate::{EnableReport, InstallChange, Result, UnitFileOptions, util};

use std::sync::Arc;

/// Install-state manipulation: enable/disable/mask/unmask and unit file state lookups.
///
/// These only touch symlinks under the systemd configuration directories; run
/// [`Manager::daemon_reload`](crate::Manager::daemon_reload) afterwards when the manager should
/// pick the changes up.
#[derive(Clone, Debug)]
pub struct UnitFiles {
    inner: Arc<crate::Inner>,
}

impl UnitFiles {
    pub(crate) fn new(inner: Arc<crate::Inner>) -> Self {
        Self { inner }
    }

    /// `EnableUnitFiles(names, runtime, force)`.
    pub async fn enable<S: AsRef<str>>(
        &self,
        names: &[S],
        opts: UnitFileOptions,
    ) -> Result<EnableReport> {
        let names = util::canonicalize_unit_names(names)?;

        #[cfg(feature = "tracing")]
        tracing::info!(units = ?names, runtime = opts.runtime, force = opts.force, "enable_unit_files");

        let (carries_install_info, changes) = self
            .inner
            .bus
            .enable_unit_files(&names, opts.runtime, opts.force)
            .await?;

        Ok(EnableReport {
            carries_install_info,
            changes: changes.into_iter().map(InstallChange::from_dbus).collect(),
        })
    }

    /// `DisableUnitFiles(names, runtime)`; `opts.force` is ignored.
    pub async fn disable<S: AsRef<str>>(
        &self,
        names: &[S],
        opts: UnitFileOptions,
    ) -> Result<Vec<InstallChange>> {
        let names = util::canonicalize_unit_names(names)?;

        #[cfg(feature = "tracing")]
        tracing::info!(units = ?names, runtime = opts.runtime, "disable_unit_files");

        let changes = self
            .inner
            .bus
            .disable_unit_files(&names, opts.runtime)
            .await?;
        Ok(changes.into_iter().map(InstallChange::from_dbus).collect())
    }

    /// `MaskUnitFiles(names, runtime, force)`.
    pub async fn mask<S: AsRef<str>>(
        &self,
        names: &[S],
        opts: UnitFileOptions,
    ) -> Result<Vec<InstallChange>> {
        let names = util::canonicalize_unit_names(names)?;

        #[cfg(feature = "tracing")]
        tracing::info!(units = ?names, runtime = opts.runtime, force = opts.force, "mask_unit_files");

        let changes = self
            .inner
            .bus
            .mask_unit_files(&names, opts.runtime, opts.force)
            .await?;
        Ok(changes.into_iter().map(InstallChange::from_dbus).collect())
    }

    /// `UnmaskUnitFiles(names, runtime)`; `opts.force` is ignored.
    pub async fn unmask<S: AsRef<str>>(
        &self,
        names: &[S],
        opts: UnitFileOptions,
    ) -> Result<Vec<InstallChange>> {
        let names = util::canonicalize_unit_names(names)?;

        #[cfg(feature = "tracing")]
        tracing::info!(units = ?names, runtime = opts.runtime, "unmask_unit_files");

        let changes = self
            .inner
            .bus
            .unmask_unit_files(&names, opts.runtime)
            .await?;
        Ok(changes.into_iter().map(InstallChange::from_dbus).collect())
    }

    /// `GetUnitFileState(file)`, e.g. `"enabled"`, `"static"` or `"masked"`.
    pub async fn state(&self, file: &str) -> Result<String> {
        let file = util::canonicalize_unit_name(file)?;
        self.inner.bus.get_unit_file_state(&file).await
    }
}
