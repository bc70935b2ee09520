//! Protocol runtime configuration.
//!
//! Defaults suit local runs. Override via environment variables or
//! explicit construction for tests.

use std::time::Duration;

use zkcred_core::DEFAULT_PROOF_REQUEST_VERSION;

/// Environment variable for the per-receive session timeout, in seconds.
pub const SESSION_TIMEOUT_ENV: &str = "ZKCRED_SESSION_TIMEOUT_SECS";
/// Environment variable for the proof request version.
pub const PROOF_VERSION_ENV: &str = "ZKCRED_PROOF_VERSION";

const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30;

/// Settings shared by every session a node runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Upper bound on each wait for a peer message.
    pub session_timeout: Duration,
    /// Version stamped on proof requests this node builds.
    pub proof_version: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECS),
            proof_version: DEFAULT_PROOF_REQUEST_VERSION.to_string(),
        }
    }
}

impl ProtocolConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ZKCRED_SESSION_TIMEOUT_SECS` (default: 30, must be positive)
    /// - `ZKCRED_PROOF_VERSION` (default: `1.0`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let session_timeout = match lookup(SESSION_TIMEOUT_ENV) {
            None => Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: SESSION_TIMEOUT_ENV,
                        value: raw,
                        expected: "a positive number of seconds",
                    })
                }
            },
        };
        let proof_version = match lookup(PROOF_VERSION_ENV) {
            None => DEFAULT_PROOF_REQUEST_VERSION.to_string(),
            Some(raw) if raw.trim().is_empty() => {
                return Err(ConfigError::InvalidValue {
                    var: PROOF_VERSION_ENV,
                    value: raw,
                    expected: "a non-empty version string",
                })
            }
            Some(raw) => raw.trim().to_string(),
        };
        Ok(Self {
            session_timeout,
            proof_version,
        })
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value \"{value}\" for {var}: expected {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}
