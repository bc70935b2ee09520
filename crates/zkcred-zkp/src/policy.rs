//! # Engine Policy
//!
//! The mock engine produces transparent proofs: a verifier accepting them
//! learns every predicate value and credential index, and anyone holding a
//! transcript can replay it. A node therefore checks its engine against an
//! [`EnginePolicy`] before taking on a role.
//!
//! ## Configuration
//!
//! 1. `ZKCRED_ENGINE_POLICY` (`production` / `prod`, `development` / `dev`)
//! 2. Otherwise release builds default to `Production`, debug builds to
//!    `Development`.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Environment variable selecting the engine policy.
pub const ENGINE_POLICY_ENV: &str = "ZKCRED_ENGINE_POLICY";

/// Which implementation sits behind the engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineBackend {
    /// Transparent in-process engine with no zero-knowledge property.
    Mock,
    /// An engine implementing CL signatures and accumulators.
    ClSignatures,
}

impl EngineBackend {
    /// Whether the backend provides real privacy and soundness.
    pub fn is_real(self) -> bool {
        matches!(self, Self::ClSignatures)
    }

    /// Stable name for logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Mock => "mock-transparent",
            Self::ClSignatures => "cl-signatures",
        }
    }
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Only real backends are admitted.
    Production,
    /// Any backend is admitted.
    Development,
}

/// Admission check for credential engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnginePolicy {
    mode: PolicyMode,
}

impl EnginePolicy {
    pub fn new(mode: PolicyMode) -> Self {
        Self { mode }
    }

    pub fn production() -> Self {
        Self::new(PolicyMode::Production)
    }

    pub fn development() -> Self {
        Self::new(PolicyMode::Development)
    }

    /// Resolve from `ZKCRED_ENGINE_POLICY`, falling back to the build profile.
    pub fn from_environment() -> Self {
        Self::from_setting(std::env::var(ENGINE_POLICY_ENV).ok().as_deref())
    }

    fn from_setting(setting: Option<&str>) -> Self {
        match setting.map(str::to_ascii_lowercase).as_deref() {
            Some("production" | "prod") => Self::production(),
            Some("development" | "dev") => Self::development(),
            _ if cfg!(debug_assertions) => Self::development(),
            _ => Self::production(),
        }
    }

    /// Admit or reject `backend`.
    pub fn validate(&self, backend: EngineBackend) -> Result<(), EngineError> {
        match (self.mode, backend.is_real()) {
            (PolicyMode::Production, false) => Err(EngineError::PolicyRejected {
                backend: backend.name().to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }
}
