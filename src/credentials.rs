//! Credentials passed opaquely to the collaborator services.
//!
//! Values are resolved once per invocation and handed to each service call.
//! `Debug` output never contains the value.

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Source from which to retrieve a credential value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// Read from an environment variable.
    Env(String),
    /// Read from a file; surrounding whitespace is trimmed.
    File(String),
    /// Provided directly (for testing only).
    Direct(String),
}

impl CredentialSource {
    /// Resolves the credential from its source.
    pub fn resolve(&self) -> Result<Credential> {
        let value = match self {
            CredentialSource::Env(var_name) => env::var(var_name).map_err(|_| {
                Error::Credential(format!("environment variable '{}' not set", var_name))
            })?,
            CredentialSource::File(path) => std::fs::read_to_string(path)
                .map_err(|e| Error::Credential(format!("cannot read file '{}': {}", path, e)))?
                .trim()
                .to_string(),
            CredentialSource::Direct(value) => value.clone(),
        };

        if value.is_empty() {
            return Err(Error::Credential(format!(
                "{} resolved to an empty value",
                self.describe()
            )));
        }

        Ok(Credential(value))
    }

    /// Describes the source without revealing any value.
    pub fn describe(&self) -> String {
        match self {
            CredentialSource::Env(var_name) => format!("env:{}", var_name),
            CredentialSource::File(path) => format!("file:{}", path),
            CredentialSource::Direct(_) => "direct".to_string(),
        }
    }
}

/// An opaque secret value such as an API token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw value for use in a request header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Replaces every occurrence of the value in `text`.
    pub fn redact(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_string();
        }
        text.replace(&self.0, "[REDACTED]")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn direct_source_resolves() {
        let credential = CredentialSource::Direct("tok".to_string()).resolve().unwrap();
        assert_eq!(credential.expose(), "tok");
    }

    #[test]
    fn env_source_resolves() {
        env::set_var("PREVIEW_QA_TEST_CREDENTIAL", "from-env");
        let credential = CredentialSource::Env("PREVIEW_QA_TEST_CREDENTIAL".to_string())
            .resolve()
            .unwrap();
        assert_eq!(credential.expose(), "from-env");
        env::remove_var("PREVIEW_QA_TEST_CREDENTIAL");
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let source = CredentialSource::Env("PREVIEW_QA_DEFINITELY_UNSET_12345".to_string());
        let result = source.resolve();
        assert!(matches!(result, Err(Error::Credential(_))));
    }

    #[test]
    fn file_source_trims_whitespace() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  secret-token  ").unwrap();
        let source = CredentialSource::File(file.path().to_string_lossy().to_string());
        assert_eq!(source.resolve().unwrap().expose(), "secret-token");
    }

    #[test]
    fn empty_value_is_rejected() {
        let result = CredentialSource::Direct(String::new()).resolve();
        assert!(matches!(result, Err(Error::Credential(_))));
    }

    #[test]
    fn debug_output_is_redacted() {
        let credential = Credential::new("hunter2");
        assert!(!format!("{:?}", credential).contains("hunter2"));
    }

    #[test]
    fn redact_replaces_value() {
        let credential = Credential::new("abc123");
        assert_eq!(
            credential.redact("token abc123 rejected"),
            "token [REDACTED] rejected"
        );
    }

    #[test]
    fn describe_hides_direct_value() {
        assert_eq!(CredentialSource::Direct("x".to_string()).describe(), "direct");
        assert_eq!(
            CredentialSource::Env("GITHUB_TOKEN".to_string()).describe(),
            "env:GITHUB_TOKEN"
        );
    }
}
