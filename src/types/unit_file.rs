/// One row of the installed unit-file inventory (`ListUnitFiles`).
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct UnitFile {
    /// Absolute path of the unit file.
    pub path: String,
    /// Install state (`enabled`, `disabled`, `masked`, `static`, `generated`, ...).
    pub state: String,
}

impl UnitFile {
    pub(crate) fn from_dbus(item: (String, String)) -> Self {
        let (path, state) = item;
        Self { path, state }
    }

    /// Unit name derived from the file's basename.
    pub fn name(&self) -> &str {
        crate::util::basename_or_name(&self.path)
    }
}

/// A single symlink change reported by `EnableUnitFiles` and friends.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct InstallChange {
    /// `"symlink"`, `"unlink"`, ...
    pub change_type: String,
    pub file: String,
    pub destination: String,
}

impl InstallChange {
    pub(crate) fn from_dbus(item: (String, String, String)) -> Self {
        let (change_type, file, destination) = item;
        Self {
            change_type,
            file,
            destination,
        }
    }
}

/// Report returned by enabling unit files.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct EnableReport {
    /// Whether the unit files carry `[Install]` information. When false, enabling had nothing
    /// to act on and a daemon reload is usually pointless.
    pub carries_install_info: bool,
    pub changes: Vec<InstallChange>,
}

/// Options for `EnableUnitFiles`/`DisableUnitFiles`/`MaskUnitFiles`/`UnmaskUnitFiles`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct UnitFileOptions {
    /// Only change `/run` (lost on reboot).
    pub runtime: bool,
    /// Replace conflicting symlinks. Ignored by disable and unmask.
    pub force: bool,
}

impl Default for UnitFileOptions {
    fn default() -> Self {
        Self {
            runtime: false,
            force: true,
        }
    }
}

impl UnitFileOptions {
    pub fn runtime(mut self, runtime: bool) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}
