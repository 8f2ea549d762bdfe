//! EIP-712 Signing
//!
//! ECDSA signing, public-key recovery and address verification for EIP-712
//! digests.

use super::hasher::hash_typed_message;
use super::types::*;
use crate::utils::crypto::{decode_hex, to_hex_prefixed};
use crate::utils::security_config::SecuritySettings;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroizing;

const MODULE: &str = "eip712::signer";

/// Half of the secp256k1 group order; canonical signatures have `s <= HALF_ORDER`
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// Parse a hex private key (optional `0x` prefix)
pub fn parse_private_key(key_hex: &str) -> Result<SecretKey, Eip712Error> {
    let bytes = Zeroizing::new(
        decode_hex(key_hex).map_err(|e| Eip712Error::InvalidPrivateKey(format!("invalid hex: {}", e)))?,
    );
    secret_key_from_slice(&bytes)
}

fn secret_key_from_slice(private_key: &[u8]) -> Result<SecretKey, Eip712Error> {
    if private_key.len() != 32 {
        return Err(Eip712Error::InvalidPrivateKey(format!(
            "invalid private key length: expected 32, got {}",
            private_key.len()
        )));
    }

    SecretKey::from_slice(private_key).map_err(|e| Eip712Error::InvalidPrivateKey(e.to_string()))
}

/// Address controlled by a raw 32-byte private key
pub fn address_from_private_key(private_key: &[u8]) -> Result<Address, Eip712Error> {
    let secret_key = secret_key_from_slice(private_key)?;
    Ok(address_of(&secret_key))
}

/// Address of a parsed secret key
pub fn address_of(secret_key: &SecretKey) -> Address {
    let secp = Secp256k1::signing_only();
    Address::from_public_key(&PublicKey::from_secret_key(&secp, secret_key))
}

/// Sign EIP-712 typed data
///
/// Returns a signature with v, r, s components.
pub fn sign_typed_message(
    registry: &TypeRegistry,
    domain: &Eip712Domain,
    message: &TypedMessage,
    private_key: &[u8],
) -> Result<Eip712Signature, Eip712Error> {
    // Calculate the hash to sign
    let hash = hash_typed_message(registry, domain, message)?;

    // Sign the hash
    sign_hash(&hash, private_key)
}

/// Sign a pre-computed hash
pub fn sign_hash(hash: &[u8; 32], private_key: &[u8]) -> Result<Eip712Signature, Eip712Error> {
    let secret_key = secret_key_from_slice(private_key)?;
    Ok(sign_hash_with_key(hash, &secret_key))
}

/// Sign a pre-computed hash with a parsed key.
///
/// Nonces are RFC 6979 deterministic and `s` is always low.
pub fn sign_hash_with_key(hash: &[u8; 32], secret_key: &SecretKey) -> Eip712Signature {
    let secp = Secp256k1::signing_only();
    let message = Message::from_digest(*hash);

    let (recovery_id, signature) = secp
        .sign_ecdsa_recoverable(&message, secret_key)
        .serialize_compact();

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&signature[0..32]);
    s.copy_from_slice(&signature[32..64]);

    // v is recovery_id + 27 (Ethereum standard)
    let v = recovery_id.to_i32() as u8 + Eip712Signature::V_OFFSET;
    let signature = Eip712Signature::new(r, s, v);

    crate::log_debug!(
        MODULE,
        "Signed digest",
        digest = to_hex_prefixed(hash),
        signer = address_of(secret_key),
        v = v
    );

    signature
}

/// Whether `s` is in the lower half of the curve order
pub fn is_low_s(signature: &Eip712Signature) -> bool {
    signature.s <= SECP256K1_HALF_ORDER
}

/// Recover the signer's address from a 65-byte signature
pub fn recover_address(hash: &[u8; 32], signature: &[u8]) -> Result<Address, Eip712Error> {
    recover_address_with(hash, signature, &SecuritySettings::default())
}

/// [`recover_address`] under explicit security settings
pub fn recover_address_with(
    hash: &[u8; 32],
    signature: &[u8],
    settings: &SecuritySettings,
) -> Result<Address, Eip712Error> {
    let signature = Eip712Signature::from_bytes(signature)?;
    recover_signer(hash, &signature, settings)
}

/// Recover the signer's address from parsed signature components
pub fn recover_signer(
    hash: &[u8; 32],
    signature: &Eip712Signature,
    settings: &SecuritySettings,
) -> Result<Address, Eip712Error> {
    // Reconstruct the recovery ID
    let recovery_id = RecoveryId::from_i32(i32::from(signature.recovery_id()?))
        .map_err(|e| Eip712Error::RecoveryFailed(e.to_string()))?;

    if settings.reject_high_s && !is_low_s(signature) {
        return Err(Eip712Error::NonCanonicalSignature);
    }

    // Reconstruct the signature bytes
    let mut sig_bytes = [0u8; 64];
    sig_bytes[0..32].copy_from_slice(&signature.r);
    sig_bytes[32..64].copy_from_slice(&signature.s);

    let recoverable_sig = RecoverableSignature::from_compact(&sig_bytes, recovery_id)
        .map_err(|e| Eip712Error::RecoveryFailed(e.to_string()))?;

    let message = Message::from_digest(*hash);

    // Recover the public key
    let secp = Secp256k1::verification_only();
    let public_key = secp
        .recover_ecdsa(&message, &recoverable_sig)
        .map_err(|e| Eip712Error::RecoveryFailed(e.to_string()))?;

    let address = Address::from_public_key(&public_key);
    if !is_low_s(signature) {
        crate::log_warn!(
            MODULE,
            "Accepted high-s signature",
            digest = to_hex_prefixed(hash),
            recovered = address
        );
    }
    crate::log_debug!(
        MODULE,
        "Recovered signer",
        digest = to_hex_prefixed(hash),
        recovered = address
    );

    Ok(address)
}

/// Outcome of a verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The recovered signer is the expected address
    Match,
    /// Recovery succeeded but yielded a different address
    Mismatch { expected: Address, recovered: Address },
    /// Inputs were malformed or recovery failed
    Error(Eip712Error),
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Match)
    }

    /// Collapse into a result, reporting a mismatch as [`Eip712Error::AddressMismatch`]
    pub fn into_result(self) -> Result<(), Eip712Error> {
        match self {
            Verification::Match => Ok(()),
            Verification::Mismatch { expected, recovered } => {
                Err(Eip712Error::AddressMismatch { expected, recovered })
            }
            Verification::Error(e) => Err(e),
        }
    }

    /// Short label used in JSON output
    pub fn outcome(&self) -> &'static str {
        match self {
            Verification::Match => "match",
            Verification::Mismatch { .. } => "mismatch",
            Verification::Error(_) => "error",
        }
    }
}

/// Verify a signature against a hash and expected address
pub fn verify_signature(hash: &[u8; 32], signature: &[u8], expected_address: &str) -> Verification {
    verify_signature_with(hash, signature, expected_address, &SecuritySettings::default())
}

/// [`verify_signature`] under explicit security settings
pub fn verify_signature_with(
    hash: &[u8; 32],
    signature: &[u8],
    expected_address: &str,
    settings: &SecuritySettings,
) -> Verification {
    let expected = if settings.require_checksummed_addresses {
        Address::from_checksummed(expected_address)
    } else {
        expected_address.parse::<Address>()
    };
    let expected = match expected {
        Ok(address) => address,
        Err(e) => return Verification::Error(e),
    };

    let recovered = match recover_address_with(hash, signature, settings) {
        Ok(address) => address,
        Err(e) => return Verification::Error(e),
    };

    let verification = if expected.ct_eq(&recovered) {
        Verification::Match
    } else {
        Verification::Mismatch { expected, recovered }
    };

    crate::log_debug!(
        MODULE,
        "Verified signature",
        outcome = verification.outcome(),
        expected = expected,
        recovered = recovered
    );

    verification
}
