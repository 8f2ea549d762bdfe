//! EIP-712 Typed Data Signing
//!
//! Implementation of EIP-712 typed structured data hashing and signing.
//!
//! # Reference
//! - <https://eips.ethereum.org/EIPS/eip-712>
//!
//! # Example
//! ```rust,ignore
//! use eip712_auth::eip712::{messages, sign_typed_message};
//!
//! let registry = messages::application_registry()?;
//! let domain = messages::activity_domain("Claim", 8724u64, "1");
//! let message = messages::claim_message(1u64, 1640069436);
//! let signature = sign_typed_message(&registry, &domain, &message, &private_key)?;
//! ```

pub mod types;
pub mod value;
pub mod encoder;
pub mod hasher;
pub mod signer;
pub mod typed_data;
pub mod messages;

pub use types::*;
pub use value::TypedValue;
pub use encoder::*;
pub use hasher::*;
pub use signer::*;
pub use typed_data::TypedData;

#[cfg(test)]
mod tests;
