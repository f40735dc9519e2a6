//! Mapping of D-Bus faults onto [`Error`].

use crate::Error;

pub(crate) const NO_SUCH_UNIT: &str = "org.freedesktop.systemd1.NoSuchUnit";
pub(crate) const NO_SUCH_JOB: &str = "org.freedesktop.systemd1.NoSuchJob";
pub(crate) const JOB_FAILED: &str = "org.freedesktop.systemd1.JobFailed";
pub(crate) const UNKNOWN_OBJECT: &str = "org.freedesktop.DBus.Error.UnknownObject";
pub(crate) const ACCESS_DENIED: &str = "org.freedesktop.DBus.Error.AccessDenied";
pub(crate) const FILE_NOT_FOUND: &str = "org.freedesktop.DBus.Error.FileNotFound";

/// Errors a `Properties.Get` returns when the object simply does not expose the property.
pub(crate) const MISSING_MEMBER: &[&str] = &[
    "org.freedesktop.DBus.Error.UnknownProperty",
    "org.freedesktop.DBus.Error.UnknownInterface",
    "org.freedesktop.DBus.Error.InvalidArgs",
];

/// Coarse classification of a D-Bus error name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum FaultClass {
    NotFound,
    AccessDenied,
    JobFailed,
    Transport,
}

/// Classify a D-Bus error name. Unmapped names are transport faults.
pub(crate) fn classify(name: &str) -> FaultClass {
    match name {
        NO_SUCH_UNIT | UNKNOWN_OBJECT | NO_SUCH_JOB => FaultClass::NotFound,
        ACCESS_DENIED => FaultClass::AccessDenied,
        JOB_FAILED => FaultClass::JobFailed,
        _ => FaultClass::Transport,
    }
}

/// Build an [`Error`] from a classified bus fault.
///
/// `target` names the unit, file or job the call was about; it ends up in `UnitNotFound::unit`
/// and `JobFailed::job_path`.
pub(crate) fn from_bus_fault(
    action: &'static str,
    target: Option<&str>,
    name: &str,
    message: String,
) -> Error {
    let target = target.unwrap_or_default().to_string();
    match classify(name) {
        FaultClass::NotFound => Error::UnitNotFound {
            unit: target,
            detail: message,
        },
        FaultClass::AccessDenied => Error::AccessDenied {
            action,
            detail: message,
        },
        FaultClass::JobFailed => Error::JobFailed {
            job_path: target,
            result: if message.is_empty() {
                "failed".to_string()
            } else {
                message
            },
        },
        FaultClass::Transport => Error::Transport {
            action,
            name: Some(name.to_string()),
            detail: message,
        },
    }
}

/// Map a failed zbus method call.
pub(crate) fn map_zbus_method_error(
    action: &'static str,
    target: Option<&str>,
    err: zbus::Error,
) -> Error {
    match err {
        zbus::Error::MethodError(name, detail, _reply) => {
            from_bus_fault(action, target, name.as_str(), detail.unwrap_or_default())
        }
        zbus::Error::FDO(fdo) => map_fdo_error(action, target, *fdo),
        zbus::Error::InputOutput(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            Error::Transport {
                action,
                name: None,
                detail: format!("method call timed out: {e}"),
            }
        }
        other => map_zbus_error(action, other),
    }
}

fn map_fdo_error(action: &'static str, target: Option<&str>, err: zbus::fdo::Error) -> Error {
    let message = err.to_string();
    let name = match &err {
        zbus::fdo::Error::AccessDenied(_) => ACCESS_DENIED,
        zbus::fdo::Error::UnknownObject(_) => UNKNOWN_OBJECT,
        zbus::fdo::Error::FileNotFound(_) => FILE_NOT_FOUND,
        zbus::fdo::Error::UnknownProperty(_) => MISSING_MEMBER[0],
        zbus::fdo::Error::UnknownInterface(_) => MISSING_MEMBER[1],
        zbus::fdo::Error::InvalidArgs(_) => MISSING_MEMBER[2],
        _ => "org.freedesktop.DBus.Error.Failed",
    };
    from_bus_fault(action, target, name, message)
}

/// Map a zbus failure that is not tied to a specific remote method.
pub(crate) fn map_zbus_error(action: &'static str, err: zbus::Error) -> Error {
    match err {
        zbus::Error::MethodError(name, detail, _reply) => {
            from_bus_fault(action, None, name.as_str(), detail.unwrap_or_default())
        }
        zbus::Error::InputOutput(e) => Error::Transport {
            action,
            name: None,
            detail: format!("dbus io error: {e}"),
        },
        other => Error::Transport {
            action,
            name: None,
            detail: format!("dbus error: {other}"),
        },
    }
}

/// Returns true if `err` means "the object is gone", as used by job polling.
pub(crate) fn is_object_gone(err: &Error) -> bool {
    err.is_not_found()
}

/// Returns true if `err` only says the property or interface is not exposed by the object.
pub(crate) fn is_missing_member(err: &Error) -> bool {
    err.bus_name().is_some_and(|n| MISSING_MEMBER.contains(&n))
}

/// Returns true for faults meaning "no such unit or unit file".
pub(crate) fn is_absent(err: &Error) -> bool {
    err.is_not_found() || err.bus_name() == Some(FILE_NOT_FOUND)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Arc;

    fn dummy_msg() -> zbus::Message {
        zbus::Message::method_call("/org/freedesktop/systemd1", "Dummy")
            .expect("builder")
            .build(&())
            .expect("msg")
    }

    fn method_error(name: &str, detail: &str) -> zbus::Error {
        let name = zbus::names::OwnedErrorName::try_from(name).expect("name");
        zbus::Error::MethodError(name, Some(detail.to_string()), dummy_msg())
    }

    #[test]
    fn classify_known_names() {
        assert_eq!(classify(NO_SUCH_UNIT), FaultClass::NotFound);
        assert_eq!(classify(UNKNOWN_OBJECT), FaultClass::NotFound);
        assert_eq!(classify(NO_SUCH_JOB), FaultClass::NotFound);
        assert_eq!(classify(ACCESS_DENIED), FaultClass::AccessDenied);
        assert_eq!(classify(JOB_FAILED), FaultClass::JobFailed);
    }

    #[test]
    fn classify_defaults_to_transport() {
        assert_eq!(classify(""), FaultClass::Transport);
        assert_eq!(
            classify("org.freedesktop.DBus.Error.Failed"),
            FaultClass::Transport
        );
        assert_eq!(
            classify("org.freedesktop.DBus.Error.NoReply"),
            FaultClass::Transport
        );
    }

    #[test]
    fn maps_no_such_unit_to_unit_not_found() {
        let err = method_error(NO_SUCH_UNIT, "Unit nginx.service not loaded.");
        let mapped = map_zbus_method_error("get_unit", Some("nginx.service"), err);

        let Error::UnitNotFound { unit, detail } = mapped else {
            panic!("unexpected error: {mapped:?}");
        };
        assert_eq!(unit, "nginx.service");
        assert_eq!(detail, "Unit nginx.service not loaded.");
    }

    #[test]
    fn maps_access_denied() {
        let err = method_error(ACCESS_DENIED, "no");
        let mapped = map_zbus_method_error("stop_unit", Some("dbus.service"), err);

        let Error::AccessDenied { action, .. } = mapped else {
            panic!("unexpected error: {mapped:?}");
        };
        assert_eq!(action, "stop_unit");
    }

    #[test]
    fn maps_bus_job_failure() {
        let err = method_error(JOB_FAILED, "");
        let mapped = map_zbus_method_error("start_unit", Some("x.service"), err);

        let Error::JobFailed { result, .. } = mapped else {
            panic!("unexpected error: {mapped:?}");
        };
        assert_eq!(result, "failed");
    }

    #[test]
    fn maps_unknown_name_to_transport_keeping_name() {
        let err = method_error("org.freedesktop.systemd1.Whatever", "odd");
        let mapped = map_zbus_method_error("start_unit", None, err);

        assert_eq!(
            mapped.bus_name(),
            Some("org.freedesktop.systemd1.Whatever")
        );
        assert_eq!(mapped.exit_code(), 1);
    }

    #[test]
    fn maps_io_timeout_to_transport() {
        let err = zbus::Error::InputOutput(Arc::new(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "timeout",
        )));

        let mapped = map_zbus_method_error("get_unit", None, err);

        let Error::Transport { action, name, .. } = mapped else {
            panic!("unexpected error: {mapped:?}");
        };
        assert_eq!(action, "get_unit");
        assert_eq!(name, None);
    }

    #[test]
    fn missing_member_and_absent_predicates() {
        let unknown_prop = from_bus_fault(
            "get_property",
            None,
            "org.freedesktop.DBus.Error.UnknownProperty",
            String::new(),
        );
        assert!(is_missing_member(&unknown_prop));
        assert!(!is_absent(&unknown_prop));

        let file_missing =
            from_bus_fault("get_unit_file_state", None, FILE_NOT_FOUND, String::new());
        assert!(is_absent(&file_missing));

        let gone = from_bus_fault("job_state", Some("/j/1"), UNKNOWN_OBJECT, String::new());
        assert!(is_object_gone(&gone));
        assert!(is_absent(&gone));
    }
}
