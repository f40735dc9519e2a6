/// systemd `StartUnit`/`StopUnit` mode.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum UnitStartMode {
    #[default]
    Replace,
    Fail,
    Isolate,
    IgnoreDependencies,
    IgnoreRequirements,
    Other(String),
}

impl UnitStartMode {
    pub(crate) fn as_dbus_str(&self) -> &str {
        match self {
            UnitStartMode::Replace => "replace",
            UnitStartMode::Fail => "fail",
            UnitStartMode::Isolate => "isolate",
            UnitStartMode::IgnoreDependencies => "ignore-dependencies",
            UnitStartMode::IgnoreRequirements => "ignore-requirements",
            UnitStartMode::Other(s) => s.as_str(),
        }
    }
}

/// systemd `Unit.LoadState`.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum LoadState {
    Loaded,
    NotFound,
    Error,
    Masked,
    Stub,
    Merged,
    Generated,
    Transient,
    BadSetting,
    Unknown(String),
}

impl LoadState {
    pub(crate) fn parse(s: &str) -> Self {
        match s {
            "loaded" => LoadState::Loaded,
            "not-found" => LoadState::NotFound,
            "error" => LoadState::Error,
            "masked" => LoadState::Masked,
            "stub" => LoadState::Stub,
            "merged" => LoadState::Merged,
            "generated" => LoadState::Generated,
            "transient" => LoadState::Transient,
            "bad-setting" => LoadState::BadSetting,
            other => LoadState::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LoadState::Loaded => "loaded",
            LoadState::NotFound => "not-found",
            LoadState::Error => "error",
            LoadState::Masked => "masked",
            LoadState::Stub => "stub",
            LoadState::Merged => "merged",
            LoadState::Generated => "generated",
            LoadState::Transient => "transient",
            LoadState::BadSetting => "bad-setting",
            LoadState::Unknown(s) => s.as_str(),
        }
    }
}

/// systemd `Unit.ActiveState`.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ActiveState {
    Active,
    Reloading,
    Inactive,
    Failed,
    Activating,
    Deactivating,
    Maintenance,
    Unknown(String),
}

impl ActiveState {
    pub(crate) fn parse(s: &str) -> Self {
        match s {
            "active" => ActiveState::Active,
            "reloading" => ActiveState::Reloading,
            "inactive" => ActiveState::Inactive,
            "failed" => ActiveState::Failed,
            "activating" => ActiveState::Activating,
            "deactivating" => ActiveState::Deactivating,
            "maintenance" => ActiveState::Maintenance,
            other => ActiveState::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActiveState::Active => "active",
            ActiveState::Reloading => "reloading",
            ActiveState::Inactive => "inactive",
            ActiveState::Failed => "failed",
            ActiveState::Activating => "activating",
            ActiveState::Deactivating => "deactivating",
            ActiveState::Maintenance => "maintenance",
            ActiveState::Unknown(s) => s.as_str(),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for LoadState {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ActiveState {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Row type of `org.freedesktop.systemd1.Manager.ListUnits`.
pub(crate) type ListUnitItem = (
    String,
    String,
    String,
    String,
    String,
    String,
    zbus::zvariant::OwnedObjectPath,
    u32,
    String,
    zbus::zvariant::OwnedObjectPath,
);

/// One row of the loaded-unit inventory (`ListUnits`).
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct Unit {
    pub name: String,
    pub description: Option<String>,
    pub load_state: LoadState,
    pub active_state: ActiveState,
    pub sub_state: String,
    /// Unit this one follows (aliases), if any.
    pub followed: Option<String>,
    /// D-Bus object path; only stable while the unit stays loaded.
    pub object_path: String,
    pub job_id: Option<u32>,
    pub job_type: Option<String>,
    pub job_path: Option<String>,
}

impl Unit {
    pub(crate) fn from_dbus(item: ListUnitItem) -> Self {
        let (
            name,
            description,
            load_state,
            active_state,
            sub_state,
            followed,
            object_path,
            job_id,
            job_type,
            job_path,
        ) = item;

        let has_job = job_id != 0 && job_path.as_str() != "/";
        let (job_id, job_type, job_path) = if has_job {
            (
                Some(job_id),
                non_empty(job_type),
                Some(job_path.to_string()),
            )
        } else {
            (None, None, None)
        };

        Self {
            name,
            description: non_empty(description),
            load_state: LoadState::parse(&load_state),
            active_state: ActiveState::parse(&active_state),
            sub_state,
            followed: non_empty(followed),
            object_path: object_path.to_string(),
            job_id,
            job_type,
            job_path,
        }
    }

    /// Unit type suffix, e.g. `"service"`.
    pub fn kind(&self) -> &str {
        crate::util::kind_from_name(&self.name)
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// Merged discovery row combining runtime state (`ListUnits`) with install state
/// (`ListUnitFiles`).
///
/// `load_state` is `None` only for units known solely from an installed unit file; such rows
/// always report `active_state=inactive` and `sub_state="dead"`. `is_masked` implies
/// `!is_enabled`.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct UnitStatus {
    pub name: String,
    /// Unit type suffix (`service`, `socket`, `timer`, ...).
    pub kind: String,
    pub description: Option<String>,
    pub active_state: ActiveState,
    pub sub_state: String,
    /// Lower-cased unit file state (`enabled`, `disabled`, `masked`, `static`, ...).
    pub unit_file_state: Option<String>,
    pub load_state: Option<LoadState>,
    pub is_enabled: bool,
    pub is_masked: bool,
}
