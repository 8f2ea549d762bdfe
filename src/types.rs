//! Shared output types
//!
//! JSON shapes printed by the CLI. Every command answers with an
//! [`ApiResponse`] whose `data` is one of the structs below.

use crate::eip712::{Address, Eip712PreImage, Eip712Signature, Verification};
use crate::utils::crypto::to_hex_prefixed;
use serde::{Deserialize, Serialize};

// =============================================================================
// Command Outputs
// =============================================================================

/// `hash`: the three digests of a typed-data document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashOutput {
    pub domain_separator: String,
    pub struct_hash: String,
    pub signing_hash: String,
}

impl From<&Eip712PreImage> for HashOutput {
    fn from(pre_image: &Eip712PreImage) -> Self {
        let hex = pre_image.to_hex();
        Self {
            domain_separator: hex.domain_separator,
            struct_hash: hex.struct_hash,
            signing_hash: hex.signing_hash,
        }
    }
}

/// `encode-type`: canonical type strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeTypeOutput {
    pub primary_type: String,
    pub encoded_type: String,
    pub type_hash: String,
    pub domain_type: String,
}

/// `sign`: the signature and its components
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutput {
    pub signature: String,
    pub r: String,
    pub s: String,
    pub v: u8,
    pub signer: String,
    pub signing_hash: String,
}

impl SignOutput {
    pub fn new(signature: &Eip712Signature, signer: &Address, signing_hash: &[u8; 32]) -> Self {
        Self {
            signature: signature.to_hex(),
            r: to_hex_prefixed(&signature.r),
            s: to_hex_prefixed(&signature.s),
            v: signature.v,
            signer: signer.to_checksum(),
            signing_hash: to_hex_prefixed(signing_hash),
        }
    }
}

/// `recover`: the address that produced a signature
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverOutput {
    pub address: String,
    pub signing_hash: String,
}

/// `verify`: outcome of comparing the recovered signer with the expected one
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutput {
    /// `match` or `mismatch`
    pub outcome: String,
    pub valid: bool,
    pub expected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered: Option<String>,
    pub signing_hash: String,
}

impl VerifyOutput {
    /// `None` for [`Verification::Error`], which is reported as an error instead
    pub fn from_verification(
        verification: &Verification,
        expected: &str,
        signing_hash: &[u8; 32],
    ) -> Option<Self> {
        let (expected, recovered) = match verification {
            Verification::Match => {
                let normalized = expected
                    .parse::<Address>()
                    .map(|a| a.to_checksum())
                    .unwrap_or_else(|_| expected.to_string());
                (normalized, None)
            }
            Verification::Mismatch { expected, recovered } => {
                (expected.to_checksum(), Some(recovered.to_checksum()))
            }
            Verification::Error(_) => return None,
        };

        Some(Self {
            outcome: verification.outcome().to_string(),
            valid: verification.is_match(),
            expected,
            recovered,
            signing_hash: to_hex_prefixed(signing_hash),
        })
    }
}

// =============================================================================
// API Response Wrapper
// =============================================================================

/// Standard JSON response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<crate::error::AuthError>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: crate::error::AuthError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":{"code":"internal","message":"Serialization failed"}}"#.to_string()
        })
    }
}
