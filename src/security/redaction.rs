//! Login command construction and redaction
//!
//! The API key only ever appears inside the login command. Everything that is
//! printed goes through [`redact`] first; the unredacted command is what the
//! runner receives.

use crate::core::error::CredentialError;
use secrecy::{ExposeSecret, SecretString};

/// Every login command starts with this prefix
pub const LOGIN_PREFIX: &str = "poe-code login --api-key ";

/// Replacement shown instead of the key
pub const MASK: &str = "***";

/// Build `poe-code login --api-key <key>` with the key shell-quoted
///
/// Quoting keeps spaces, quotes and metacharacters in the key inside a
/// single argument. A key containing a NUL byte cannot be quoted.
pub fn build_login_command(credential: &SecretString) -> Result<String, CredentialError> {
    let quoted =
        shlex::try_quote(credential.expose_secret()).map_err(|_| CredentialError::Unquotable)?;
    Ok(format!("{}{}", LOGIN_PREFIX, quoted))
}

/// Mask the key in a login command; any other command is returned unchanged
pub fn redact(command: &str) -> String {
    if command.starts_with(LOGIN_PREFIX) {
        format!("{}{}", LOGIN_PREFIX, MASK)
    } else {
        command.to_string()
    }
}

/// Redact every command in order
pub fn redact_all<S: AsRef<str>>(commands: &[S]) -> Vec<String> {
    commands.iter().map(|c| redact(c.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn test_plain_key_is_passed_through() {
        let command = build_login_command(&secret("sk-abc123")).unwrap();

        assert!(command.starts_with(LOGIN_PREFIX));
        assert_eq!(shlex::split(&command).unwrap().last().map(String::as_str), Some("sk-abc123"));
    }

    #[test]
    fn test_key_with_metacharacters_stays_one_argument() {
        let key = "a b'c\"d;$(rm -rf /)`x`&|";
        let command = build_login_command(&secret(key)).unwrap();

        let argv = shlex::split(&command).unwrap();
        assert_eq!(argv, vec!["poe-code", "login", "--api-key", key]);
    }

    #[test]
    fn test_nul_byte_is_rejected() {
        let result = build_login_command(&secret("abc\0def"));
        assert!(matches!(result, Err(CredentialError::Unquotable)));
    }

    #[test]
    fn test_redact_login_command() {
        let key = "super secret 'key'";
        let command = build_login_command(&secret(key)).unwrap();

        let redacted = redact(&command);

        assert_eq!(redacted, "poe-code login --api-key ***");
        assert!(!redacted.contains("super"));
        assert!(!redacted.contains("secret"));
        assert!(!redacted.contains("key'"));
    }

    #[test]
    fn test_redact_leaves_other_commands_alone() {
        for command in [
            "rm -rf ~/.poe-code && mkdir -p ~/.poe-code/logs",
            "poe-code install codex",
            "poe-code login",
            "echo poe-code login --api-key inline",
        ] {
            assert_eq!(redact(command), command);
        }
    }

    #[test]
    fn test_redact_all_preserves_order() {
        let commands = ["cmd one", "poe-code login --api-key k", "cmd two"];
        assert_eq!(
            redact_all(&commands),
            vec!["cmd one", "poe-code login --api-key ***", "cmd two"]
        );
    }
}
