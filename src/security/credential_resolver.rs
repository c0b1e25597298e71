//! Credential resolver for the Poe API key
//!
//! The key is looked up through an ordered list of strategies. The first
//! strategy that yields a value wins; a strategy may also fail outright (a
//! credentials file that exists but is unusable), which ends the lookup with
//! that specific reason.
//!
//! # Example
//!
//! ```
//! use poe_code_matrix::ExecutionEnvironment;
//! use poe_code_matrix::security::CredentialResolver;
//! use secrecy::ExposeSecret;
//!
//! let env: ExecutionEnvironment = [("POE_API_KEY", "  sk-live  ")].into_iter().collect();
//! let credential = CredentialResolver::standard(&env).resolve().unwrap();
//! assert_eq!(credential.expose_secret(), "sk-live");
//! ```

use crate::core::environment::ExecutionEnvironment;
use crate::core::error::CredentialError;
use secrecy::SecretString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Primary environment variable holding the API key
pub const API_KEY_VAR: &str = "POE_API_KEY";

/// Alias checked when the primary variable is unset or blank
pub const API_KEY_ALIAS_VAR: &str = "POE_CODE_API_KEY";

/// Credentials file, relative to the home directory
pub const CREDENTIALS_FILE: &str = ".poe-code/credentials.json";

/// JSON field holding the key inside the credentials file
pub const CREDENTIALS_KEY: &str = "apiKey";

/// One way of finding the API key
pub trait CredentialLookup: Send + Sync {
    /// `Ok(None)` means "not here, try the next source"
    fn lookup(&self) -> Result<Option<SecretString>, CredentialError>;

    /// Human-readable source name for logs
    fn describe(&self) -> String;
}

/// Reads the key from a captured environment variable
pub struct EnvVarLookup {
    name: &'static str,
    value: Option<String>,
}

impl EnvVarLookup {
    pub fn new(name: &'static str, env: &ExecutionEnvironment) -> Self {
        Self {
            name,
            value: env.get_str(name).map(str::to_string),
        }
    }
}

impl CredentialLookup for EnvVarLookup {
    fn lookup(&self) -> Result<Option<SecretString>, CredentialError> {
        Ok(self
            .value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| SecretString::from(v.to_string())))
    }

    fn describe(&self) -> String {
        format!("environment variable {}", self.name)
    }
}

/// Reads the key from the `poe-code` credentials file
pub struct CredentialsFileLookup {
    path: PathBuf,
}

impl CredentialsFileLookup {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// `<home>/.poe-code/credentials.json`
    pub fn in_home(home: &Path) -> Self {
        Self::new(home.join(CREDENTIALS_FILE))
    }
}

impl CredentialLookup for CredentialsFileLookup {
    fn lookup(&self) -> Result<Option<SecretString>, CredentialError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CredentialError::Unreadable {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let payload: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| CredentialError::MalformedFile {
                path: self.path.clone(),
                source,
            })?;

        let key = payload
            .get(CREDENTIALS_KEY)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CredentialError::MissingKey {
                path: self.path.clone(),
            })?;

        Ok(Some(SecretString::from(key.to_string())))
    }

    fn describe(&self) -> String {
        format!("credentials file {}", self.path.display())
    }
}

/// Resolves the API key from an ordered list of lookups
pub struct CredentialResolver {
    lookups: Vec<Box<dyn CredentialLookup>>,
}

impl CredentialResolver {
    pub fn new(lookups: Vec<Box<dyn CredentialLookup>>) -> Self {
        Self { lookups }
    }

    /// `POE_API_KEY`, then `POE_CODE_API_KEY`, then the credentials file under
    /// `$HOME` (skipped when `HOME` is not set)
    pub fn standard(env: &ExecutionEnvironment) -> Self {
        let mut lookups: Vec<Box<dyn CredentialLookup>> = vec![
            Box::new(EnvVarLookup::new(API_KEY_VAR, env)),
            Box::new(EnvVarLookup::new(API_KEY_ALIAS_VAR, env)),
        ];

        match env.get("HOME").filter(|h| !h.is_empty()) {
            Some(home) => lookups.push(Box::new(CredentialsFileLookup::in_home(Path::new(home)))),
            None => tracing::warn!("HOME is not set; skipping the credentials file"),
        }

        Self::new(lookups)
    }

    /// Resolve the credential
    ///
    /// Fails with [`CredentialError::Missing`] when no source has a key.
    pub fn resolve(&self) -> Result<SecretString, CredentialError> {
        for lookup in &self.lookups {
            if let Some(secret) = lookup.lookup()? {
                tracing::debug!(source = %lookup.describe(), "Resolved API key");
                return Ok(secret);
            }
            tracing::trace!(source = %lookup.describe(), "No API key found");
        }

        Err(CredentialError::Missing)
    }
}
