//! Security Configuration
//!
//! Verification policy with:
//! - Security level presets (standard, strict)
//! - JSON overrides on top of a preset
//! - Validation of security settings
//!
//! Settings are plain values handed to the recover/verify calls that need
//! them; there is no process-wide configuration.

use crate::error::{AuthError, AuthResult, ErrorCode};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Verification settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecuritySettings {
    /// Security level preset
    pub level: SecurityLevel,

    /// Reject signatures whose `s` lies in the upper half of the curve order
    pub reject_high_s: bool,

    /// Mixed-case expected addresses must carry a valid EIP-55 checksum
    pub require_checksummed_addresses: bool,
}

/// Security level presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Accepts every signature a reference verifier accepts
    #[default]
    Standard,
    /// Canonical signatures and checksummed addresses only
    Strict,
}

impl std::str::FromStr for SecurityLevel {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(SecurityLevel::Standard),
            "strict" => Ok(SecurityLevel::Strict),
            other => Err(AuthError::invalid_input(format!("unknown security level: {}", other))),
        }
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self::standard()
    }
}

/// On-disk form: a level plus optional per-flag overrides
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    #[serde(default)]
    level: SecurityLevel,
    reject_high_s: Option<bool>,
    require_checksummed_addresses: Option<bool>,
}

impl SecuritySettings {
    /// Standard security preset
    pub fn standard() -> Self {
        Self {
            level: SecurityLevel::Standard,
            reject_high_s: false,
            require_checksummed_addresses: false,
        }
    }

    /// Strict security preset
    pub fn strict() -> Self {
        Self {
            level: SecurityLevel::Strict,
            reject_high_s: true,
            require_checksummed_addresses: true,
        }
    }

    /// Preset for a level
    pub fn with_level(level: SecurityLevel) -> Self {
        match level {
            SecurityLevel::Standard => Self::standard(),
            SecurityLevel::Strict => Self::strict(),
        }
    }

    /// Validate settings consistency
    pub fn validate(&self) -> AuthResult<()> {
        if self.level == SecurityLevel::Strict {
            let mut relaxed = Vec::new();
            if !self.reject_high_s {
                relaxed.push("reject_high_s");
            }
            if !self.require_checksummed_addresses {
                relaxed.push("require_checksummed_addresses");
            }

            if !relaxed.is_empty() {
                return Err(AuthError::new(
                    ErrorCode::InvalidInput,
                    "strict security level cannot relax verification checks",
                )
                .with_details(relaxed.join(", ")));
            }
        }

        Ok(())
    }

    /// Parse settings from JSON, applying overrides to the level's preset
    pub fn from_json(json: &str) -> AuthResult<Self> {
        let raw: RawSettings = serde_json::from_str(json)?;

        let mut settings = Self::with_level(raw.level);
        if let Some(flag) = raw.reject_high_s {
            settings.reject_high_s = flag;
        }
        if let Some(flag) = raw.require_checksummed_addresses {
            settings.require_checksummed_addresses = flag;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AuthError::invalid_input(format!("cannot read config {}", path.display()))
                .with_details(e.to_string())
        })?;
        Self::from_json(&contents)
    }
}
