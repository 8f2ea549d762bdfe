//! EIP-712 Auth Core Library
//!
//! Typed structured data hashing, signing and signer verification for
//! EIP-712 authorization messages.
//!
//! # Architecture
//!
//! This crate provides:
//! - **eip712**: type registry, canonical encoding, hashing, secp256k1
//!   sign/recover/verify and the JSON typed-data document model
//! - **error**: serialisable error report with stable codes
//! - **types**: JSON output shapes used by the `eip712-auth` CLI
//! - **utils**: Keccak-256 and EIP-55 helpers, logging, security settings
//!
//! # Security
//!
//! Private-key bytes are held in `zeroize::Zeroizing` buffers and cleared
//! when dropped. Address comparisons run in constant time via `subtle`.
//! Log fields carrying keys or signatures are redacted.
//!
//! # Example
//!
//! ```rust,ignore
//! use eip712_auth::TypedData;
//!
//! let typed = TypedData::from_json(&document)?;
//! let hash = typed.signing_hash()?;
//! let verification = typed.verify(expected, &signature, &Default::default());
//! assert!(verification.is_match());
//! ```

pub mod eip712;
pub mod error;
pub mod types;
pub mod utils;

// Re-export key types for convenience
pub use error::{AuthError, AuthResult, ErrorCode};

pub use eip712::{
    recover_address,
    sign_hash,
    sign_typed_message,
    verify_signature,
    Address,
    Eip712Domain,
    Eip712Error,
    Eip712Signature,
    TypeRegistry,
    TypedData,
    TypedMessage,
    TypedValue,
    Verification,
};

pub use utils::crypto::{keccak256, to_checksum_address};
