//! Execution environment handed to the runner
//!
//! The process environment is captured once per run. Everything downstream
//! (credential lookup, runner invocations) reads from that snapshot instead of
//! the live process environment.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// Variable the runner splices into its `docker run` arguments
pub const DOCKER_ARGS_VAR: &str = "COLIMA_DOCKER_ARGS";

/// Variable enabling stderr logging in the driven CLI
pub const STDERR_LOGS_VAR: &str = "POE_CODE_STDERR_LOGS";

/// Docker argument that turns on stderr logging inside the container
pub const STDERR_LOGS_FLAG: &str = "-e POE_CODE_STDERR_LOGS=1";

/// Immutable mapping of environment variable names to values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionEnvironment {
    vars: BTreeMap<OsString, OsString>,
}

impl ExecutionEnvironment {
    /// Snapshot the current process environment
    pub fn capture() -> Self {
        std::env::vars_os().collect()
    }

    /// Look up a variable
    pub fn get(&self, name: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(name)).map(OsString::as_os_str)
    }

    /// Look up a variable as UTF-8, skipping values that are not valid UTF-8
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(OsStr::to_str)
    }

    /// Return a copy with `name` set to `value`
    pub fn with_var(&self, name: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        let mut vars = self.vars.clone();
        vars.insert(name.into(), value.into());
        Self { vars }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ExecutionEnvironment
where
    K: Into<OsString>,
    V: Into<OsString>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Ensure the stderr-logging flag is present in the runner's docker arguments
///
/// The flag is appended only when `POE_CODE_STDERR_LOGS` does not already
/// appear in the existing value, so augmenting twice is a no-op. The
/// variable is always set on the result, even if `base` lacked it.
pub fn augment_environment(base: &ExecutionEnvironment) -> ExecutionEnvironment {
    let existing = base.get(DOCKER_ARGS_VAR).unwrap_or_default();
    let bytes = existing.as_encoded_bytes();

    if contains_bytes(bytes, STDERR_LOGS_VAR.as_bytes()) {
        return base.clone();
    }

    // Appended on the raw value so non-UTF-8 bytes pass through untouched
    let mut docker_args = OsString::new();
    if !bytes.iter().all(u8::is_ascii_whitespace) {
        docker_args.push(existing);
        docker_args.push(" ");
    }
    docker_args.push(STDERR_LOGS_FLAG);

    tracing::debug!(docker_args = %docker_args.to_string_lossy(), "Augmented {}", DOCKER_ARGS_VAR);
    base.with_var(DOCKER_ARGS_VAR, docker_args)
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> ExecutionEnvironment {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_sets_flag_when_variable_absent() {
        let augmented = augment_environment(&env(&[("PATH", "/usr/bin")]));

        assert_eq!(augmented.get_str(DOCKER_ARGS_VAR), Some(STDERR_LOGS_FLAG));
        assert_eq!(augmented.get_str("PATH"), Some("/usr/bin"));
    }

    #[test]
    fn test_sets_flag_when_variable_empty() {
        let augmented = augment_environment(&env(&[(DOCKER_ARGS_VAR, "")]));

        assert_eq!(augmented.get_str(DOCKER_ARGS_VAR), Some("-e POE_CODE_STDERR_LOGS=1"));
    }

    #[test]
    fn test_appends_after_unrelated_flags() {
        let augmented = augment_environment(&env(&[(DOCKER_ARGS_VAR, "--memory 4g -e FOO=1")]));

        assert_eq!(
            augmented.get_str(DOCKER_ARGS_VAR),
            Some("--memory 4g -e FOO=1 -e POE_CODE_STDERR_LOGS=1")
        );
    }

    #[test]
    fn test_augmenting_twice_does_not_duplicate_flag() {
        let once = augment_environment(&env(&[(DOCKER_ARGS_VAR, "-e FOO=1")]));
        let twice = augment_environment(&once);

        assert_eq!(once, twice);
        let value = twice.get_str(DOCKER_ARGS_VAR).unwrap();
        assert_eq!(value.matches(STDERR_LOGS_VAR).count(), 1);
    }

    #[test]
    fn test_existing_setting_is_left_alone() {
        let augmented = augment_environment(&env(&[(DOCKER_ARGS_VAR, "-e POE_CODE_STDERR_LOGS=0")]));

        assert_eq!(augmented.get_str(DOCKER_ARGS_VAR), Some("-e POE_CODE_STDERR_LOGS=0"));
    }

    #[test]
    fn test_base_is_not_mutated() {
        let base = env(&[("HOME", "/home/tester")]);
        let _ = augment_environment(&base);

        assert!(base.get(DOCKER_ARGS_VAR).is_none());
        assert_eq!(base.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_value_is_preserved_when_flag_present() {
        use std::os::unix::ffi::OsStringExt;

        let raw = b"-e X=\xff -e POE_CODE_STDERR_LOGS=1".to_vec();
        let base: ExecutionEnvironment = [(
            OsString::from(DOCKER_ARGS_VAR),
            OsString::from_vec(raw.clone()),
        )]
        .into_iter()
        .collect();

        let augmented = augment_environment(&base);

        assert_eq!(augmented, base);
        assert_eq!(augmented.get(DOCKER_ARGS_VAR).unwrap().as_encoded_bytes(), &raw[..]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_value_is_preserved_when_appending() {
        use std::os::unix::ffi::OsStringExt;

        let base: ExecutionEnvironment = [(
            OsString::from(DOCKER_ARGS_VAR),
            OsString::from_vec(b"-e X=\xff".to_vec()),
        )]
        .into_iter()
        .collect();

        let augmented = augment_environment(&base);

        assert_eq!(
            augmented.get(DOCKER_ARGS_VAR).unwrap().as_encoded_bytes(),
            b"-e X=\xff -e POE_CODE_STDERR_LOGS=1"
        );
    }
}
