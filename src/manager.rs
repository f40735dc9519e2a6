use crate::matcher::{self, MatchOptions, UnitFilter};
use crate::{Result, Unit, UnitFile, UnitStatus};

use std::sync::Arc;

/// Manager-wide operations: inventories, discovery and configuration reload.
#[derive(Clone, Debug)]
pub struct Manager {
    inner: Arc<crate::Inner>,
}

impl Manager {
    pub(crate) fn new(inner: Arc<crate::Inner>) -> Self {
        Self { inner }
    }

    /// List all units currently loaded by systemd (`ListUnits`).
    pub async fn list_units(&self) -> Result<Vec<Unit>> {
        let items = self.inner.bus.list_units().await?;
        Ok(items.into_iter().map(Unit::from_dbus).collect())
    }

    /// List all installed unit files (`ListUnitFiles`).
    pub async fn list_unit_files(&self) -> Result<Vec<UnitFile>> {
        let items = self.inner.bus.list_unit_files().await?;
        Ok(items.into_iter().map(UnitFile::from_dbus).collect())
    }

    /// Reload unit definitions from disk (`Manager.Reload`).
    pub async fn daemon_reload(&self) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::info!("daemon_reload");
        self.inner.bus.daemon_reload().await
    }

    /// Find units whose name matches any of `patterns` (regex search, not anchored).
    ///
    /// Loaded units and, with `include_installed_only`, units known only from installed unit
    /// files are merged into one list sorted by name. Installed-only rows report
    /// `active_state=inactive`, `sub_state="dead"` and no load state.
    pub async fn match_units<S: AsRef<str>>(
        &self,
        patterns: &[S],
        opts: MatchOptions,
    ) -> Result<Vec<UnitStatus>> {
        let filter = UnitFilter::new(patterns, &opts)?;

        let loaded = self.list_units().await?;
        let installed = if opts.include_installed_only {
            self.list_unit_files().await?
        } else {
            Vec::new()
        };

        let rows = matcher::merge(&filter, loaded, installed);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            patterns = patterns.len(),
            matched = rows.len(),
            include_installed_only = opts.include_installed_only,
            "match_units"
        );

        Ok(rows)
    }
}
