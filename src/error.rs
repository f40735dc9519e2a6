use crate::BusScope;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by unitctl APIs.
///
/// The bus-facing variants form a small taxonomy that callers can branch on:
/// - [`Error::UnitNotFound`]: the unit (or job/object) is unknown to the manager,
/// - [`Error::AccessDenied`]: D-Bus policy or polkit refused the call,
/// - [`Error::JobFailed`]: a job finished unsuccessfully, including a local `timeout-wait`,
/// - [`Error::Transport`]: anything else the bus reported, plus I/O and protocol failures.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Input validation failure (e.g. invalid unit name, invalid regex).
    #[error("invalid input: {context}")]
    InvalidInput { context: String },

    /// Connecting to the requested bus failed, or the requested event-loop support is not
    /// available in this build.
    #[error("connection to {scope} bus failed: {detail}")]
    Connection { scope: BusScope, detail: String },

    /// The client was closed; no further bus calls are possible.
    #[error("client is closed")]
    Closed,

    /// The requested unit (or the object backing it) does not exist.
    #[error("unit not found: {unit}: {detail}")]
    UnitNotFound { unit: String, detail: String },

    /// The caller is not authorized to perform `action`.
    #[error("access denied for {action}: {detail}")]
    AccessDenied {
        action: &'static str,
        detail: String,
    },

    /// A job did not finish successfully.
    ///
    /// `result` is the systemd job result (`"failed"`, `"canceled"`, `"dependency"`, ...) when it
    /// is known, `"failed"` for heuristic failures, or `"timeout-wait"` for a local deadline.
    #[error("job {job_path} result={result}")]
    JobFailed { job_path: String, result: String },

    /// Any other bus fault, including raw connectivity errors.
    #[error("transport error in {action}: {}{detail}", fmt_name(.name))]
    Transport {
        action: &'static str,
        name: Option<String>,
        detail: String,
    },
}

fn fmt_name(name: &Option<String>) -> String {
    match name {
        Some(n) => format!("{n}: "),
        None => String::new(),
    }
}

impl Error {
    pub(crate) fn invalid_input(context: impl Into<String>) -> Self {
        Self::InvalidInput {
            context: context.into(),
        }
    }

    /// Process exit code a command-line front end should use for this error.
    ///
    /// Unknown units, access denial, job failures and input errors get distinct codes; every
    /// other failure maps to `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::UnitNotFound { .. } => 4,
            Error::AccessDenied { .. } => 77,
            Error::JobFailed { .. } => 3,
            Error::InvalidInput { .. } => 2,
            _ => 1,
        }
    }

    /// Returns true for [`Error::UnitNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UnitNotFound { .. })
    }

    /// D-Bus error name carried by a transport error, if any.
    pub(crate) fn bus_name(&self) -> Option<&str> {
        match self {
            Error::Transport { name: Some(n), .. } => Some(n.as_str()),
            _ => None,
        }
    }
}
