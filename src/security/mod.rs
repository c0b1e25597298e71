pub mod credential_resolver;
pub mod redaction;

pub use credential_resolver::{
    CredentialLookup, CredentialResolver, CredentialsFileLookup, EnvVarLookup,
};
pub use redaction::{build_login_command, redact, redact_all};
