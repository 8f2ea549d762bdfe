//! EIP-712 Hashing
//!
//! Implements domain separator and struct hashing for EIP-712.

use super::encoder::encode_data;
use super::types::*;
use super::value::TypedValue;
use crate::utils::crypto::{keccak256, to_hex_prefixed};
use serde::Serialize;
use std::collections::BTreeMap;

/// Magic prefix for EIP-712 encoding
pub const EIP712_PREFIX: &[u8] = b"\x19\x01";

/// Hash a struct according to EIP-712
///
/// hashStruct(s) = keccak256(typeHash || encodeData(s))
pub fn hash_struct(
    registry: &TypeRegistry,
    type_name: &str,
    values: &BTreeMap<String, TypedValue>,
) -> Result<[u8; 32], Eip712Error> {
    let encoded = encode_data(registry, type_name, values)?;
    Ok(keccak256(&encoded))
}

/// The implicit `EIP712Domain` type for `domain`, holding only its present fields
pub fn domain_registry(domain: &Eip712Domain) -> Result<TypeRegistry, Eip712Error> {
    TypeRegistry::new([(DOMAIN_TYPE_NAME, domain.fields())])
}

/// Calculate the domain separator hash
///
/// domainSeparator = hashStruct(eip712Domain)
pub fn domain_separator(domain: &Eip712Domain) -> Result<[u8; 32], Eip712Error> {
    let registry = domain_registry(domain)?;
    hash_struct(&registry, DOMAIN_TYPE_NAME, &domain.values())
}

/// hash = keccak256("\x19\x01" || domainSeparator || structHash)
pub fn signing_hash(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut data = Vec::with_capacity(EIP712_PREFIX.len() + 64);
    data.extend_from_slice(EIP712_PREFIX);
    data.extend_from_slice(domain_separator);
    data.extend_from_slice(struct_hash);

    keccak256(&data)
}

/// Calculate the final EIP-712 hash for signing a message
pub fn hash_typed_message(
    registry: &TypeRegistry,
    domain: &Eip712Domain,
    message: &TypedMessage,
) -> Result<[u8; 32], Eip712Error> {
    Ok(get_pre_image(registry, domain, message)?.final_hash)
}

/// The pre-image components (for external signing)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eip712PreImage {
    pub domain_separator: [u8; 32],
    pub struct_hash: [u8; 32],
    pub final_hash: [u8; 32],
}

/// Hex form of [`Eip712PreImage`], as printed by the CLI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreImageHex {
    pub domain_separator: String,
    pub struct_hash: String,
    pub signing_hash: String,
}

impl Eip712PreImage {
    pub fn to_hex(&self) -> PreImageHex {
        PreImageHex {
            domain_separator: to_hex_prefixed(&self.domain_separator),
            struct_hash: to_hex_prefixed(&self.struct_hash),
            signing_hash: to_hex_prefixed(&self.final_hash),
        }
    }
}

/// Calculate the pre-image components for EIP-712
pub fn get_pre_image(
    registry: &TypeRegistry,
    domain: &Eip712Domain,
    message: &TypedMessage,
) -> Result<Eip712PreImage, Eip712Error> {
    let domain_separator = domain_separator(domain)?;
    let struct_hash = hash_struct(registry, &message.primary_type, &message.values)?;

    Ok(Eip712PreImage {
        domain_separator,
        struct_hash,
        final_hash: signing_hash(&domain_separator, &struct_hash),
    })
}
