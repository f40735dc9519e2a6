use crate::{Error, Result};

pub(crate) fn canonicalize_unit_name(input: &str) -> Result<String> {
    validate_no_control("unit", input)?;
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::invalid_input("unit must not be empty"));
    }
    if input.contains('/') || input.contains('\\') {
        return Err(Error::invalid_input(
            "unit must not contain path separators",
        ));
    }
    if input.contains("..") {
        return Err(Error::invalid_input("unit must not contain '..'"));
    }

    if input.contains('.') {
        return Ok(input.to_string());
    }
    Ok(format!("{input}.service"))
}

/// Canonicalize a non-empty list of unit file names.
pub(crate) fn canonicalize_unit_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<String>> {
    if names.is_empty() {
        return Err(Error::invalid_input("unit names must not be empty"));
    }
    names
        .iter()
        .map(|n| canonicalize_unit_name(n.as_ref()))
        .collect()
}

pub(crate) fn validate_no_control(context: &'static str, input: &str) -> Result<()> {
    if input.contains('\0') {
        return Err(Error::invalid_input(format!(
            "{context} must not contain NUL"
        )));
    }
    if input.contains('\n') || input.contains('\r') {
        return Err(Error::invalid_input(format!(
            "{context} must not contain newlines"
        )));
    }
    if input.chars().any(|c| c.is_control()) {
        return Err(Error::invalid_input(format!(
            "{context} must not contain control characters"
        )));
    }
    Ok(())
}

/// Unit type suffix: `"ssh.service"` -> `"service"`, `""` when there is no dot.
pub(crate) fn kind_from_name(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((_, kind)) => kind,
        None => "",
    }
}

/// Basename of a path, or the input itself when it contains no `/`.
pub(crate) fn basename_or_name(s: &str) -> &str {
    match s.rsplit_once('/') {
        Some((_, base)) => base,
        None => s,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn canonicalize_unit_appends_service_suffix() {
        let name = canonicalize_unit_name("nginx").expect("ok");
        assert_eq!(name, "nginx.service");
    }

    #[test]
    fn canonicalize_unit_keeps_existing_suffix() {
        let name = canonicalize_unit_name("nginx.timer").expect("ok");
        assert_eq!(name, "nginx.timer");
    }

    #[test]
    fn canonicalize_unit_rejects_control_chars() {
        let err = canonicalize_unit_name("nginx\n").expect_err("must fail");
        let Error::InvalidInput { .. } = err else {
            panic!("unexpected error: {err:?}");
        };
    }

    #[test]
    fn canonicalize_unit_rejects_path_separators_and_dotdot() {
        for bad in ["a/b", "..", "../nginx", "a\\b"] {
            let err = canonicalize_unit_name(bad).expect_err("must fail");
            let Error::InvalidInput { .. } = err else {
                panic!("unexpected error: {err:?}");
            };
        }
    }

    #[test]
    fn canonicalize_unit_names_rejects_empty_list() {
        let names: [&str; 0] = [];
        assert!(canonicalize_unit_names(&names).is_err());
        assert_eq!(
            canonicalize_unit_names(&["a", "b.socket"]).expect("ok"),
            vec!["a.service".to_string(), "b.socket".to_string()]
        );
    }

    #[test]
    fn kind_is_last_suffix() {
        assert_eq!(kind_from_name("ssh.service"), "service");
        assert_eq!(kind_from_name("getty@tty1.service"), "service");
        assert_eq!(kind_from_name("dev-disk-by\\x2duuid.device"), "device");
        assert_eq!(kind_from_name("noext"), "");
    }

    #[test]
    fn basename_strips_directories() {
        assert_eq!(
            basename_or_name("/usr/lib/systemd/system/ssh.service"),
            "ssh.service"
        );
        assert_eq!(basename_or_name("ssh.service"), "ssh.service");
    }
}
