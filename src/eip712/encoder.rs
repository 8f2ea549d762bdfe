//! EIP-712 Type Encoding
//!
//! Implements the encoding rules for EIP-712 typed data: type strings,
//! type hashes and the 32-byte word of every field value.

use super::hasher::hash_struct;
use super::types::*;
use super::value::TypedValue;
use crate::utils::crypto::keccak256;
use ethers_core::types::{I256, U256};
use std::collections::{BTreeMap, BTreeSet};

/// Parsed form of a field type string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType<'a> {
    Address,
    Bool,
    /// `uintN`, N in 8..=256 step 8
    Uint(u16),
    /// `intN`, N in 8..=256 step 8
    Int(u16),
    /// `bytesN`, N in 1..=32
    FixedBytes(usize),
    Bytes,
    String,
    /// Reference to a struct defined in the registry
    Struct(&'a str),
    /// `T[]` (length `None`) or `T[N]`
    Array {
        element: &'a str,
        length: Option<usize>,
    },
}

impl<'a> FieldType<'a> {
    /// Parse a type string such as `uint256`, `Person` or `bytes32[][2]`
    pub fn parse(type_name: &'a str) -> Result<Self, Eip712Error> {
        let invalid = || Eip712Error::InvalidType(type_name.to_string());

        if let Some(stripped) = type_name.strip_suffix(']') {
            let open = stripped.rfind('[').ok_or_else(invalid)?;
            let element = &stripped[..open];
            let length = match &stripped[open + 1..] {
                "" => None,
                digits => Some(parse_digits(digits).ok_or_else(invalid)?),
            };

            // Validates the element type as well
            FieldType::parse(element)?;
            return Ok(FieldType::Array { element, length });
        }

        match type_name {
            "address" => return Ok(FieldType::Address),
            "bool" => return Ok(FieldType::Bool),
            "bytes" => return Ok(FieldType::Bytes),
            "string" => return Ok(FieldType::String),
            _ => {}
        }

        // `uint08` is never a struct name, only a malformed width
        if let Some(width) = digit_suffix(type_name, "uint") {
            return parse_digits(width)
                .and_then(int_width)
                .map(FieldType::Uint)
                .ok_or_else(invalid);
        }
        if let Some(width) = digit_suffix(type_name, "int") {
            return parse_digits(width)
                .and_then(int_width)
                .map(FieldType::Int)
                .ok_or_else(invalid);
        }
        if let Some(size) = digit_suffix(type_name, "bytes") {
            return match parse_digits(size) {
                Some(size @ 1..=32) => Ok(FieldType::FixedBytes(size)),
                _ => Err(invalid()),
            };
        }

        if is_identifier(type_name) {
            Ok(FieldType::Struct(type_name))
        } else {
            Err(invalid())
        }
    }

    /// Struct type this field refers to, looking through arrays
    pub fn struct_name(&self) -> Option<&'a str> {
        match *self {
            FieldType::Struct(name) => Some(name),
            FieldType::Array { element, .. } => FieldType::parse(element).ok()?.struct_name(),
            _ => None,
        }
    }
}

/// The digits after `prefix`, when nothing else follows it
fn digit_suffix<'a>(type_name: &'a str, prefix: &str) -> Option<&'a str> {
    type_name
        .strip_prefix(prefix)
        .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Canonical decimal: digits only, no leading zero
fn parse_digits(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

fn int_width(bits: usize) -> Option<u16> {
    if bits > 0 && bits <= 256 && bits % 8 == 0 {
        u16::try_from(bits).ok()
    } else {
        None
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Encode a type string for a struct type:
/// `Primary(type1 name1,...)` followed by every dependency in
/// lexicographic order
pub fn encode_type(registry: &TypeRegistry, type_name: &str) -> Result<String, Eip712Error> {
    let fields = registry
        .get(type_name)
        .ok_or_else(|| Eip712Error::UndefinedType(type_name.to_string()))?;

    let mut result = format_type_string(type_name, fields);

    for dep in find_type_dependencies(registry, type_name)? {
        let dep_fields = registry
            .get(dep)
            .ok_or_else(|| Eip712Error::UndefinedType(dep.to_string()))?;
        result.push_str(&format_type_string(dep, dep_fields));
    }

    Ok(result)
}

/// Format a single type string
fn format_type_string(type_name: &str, fields: &[TypeField]) -> String {
    let field_strs: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.type_name, f.name))
        .collect();

    format!("{}({})", type_name, field_strs.join(","))
}

/// All struct types reachable from `type_name`, excluding itself, sorted
pub fn find_type_dependencies<'r>(
    registry: &'r TypeRegistry,
    type_name: &str,
) -> Result<BTreeSet<&'r str>, Eip712Error> {
    if !registry.contains(type_name) {
        return Err(Eip712Error::UndefinedType(type_name.to_string()));
    }

    let mut dependencies = BTreeSet::new();
    let mut to_visit = registry.struct_references(type_name);

    while let Some(current) = to_visit.pop() {
        if current == type_name || dependencies.contains(current) {
            continue;
        }
        if !registry.contains(current) {
            return Err(Eip712Error::UndefinedType(current.to_string()));
        }

        dependencies.insert(current);
        to_visit.extend(registry.struct_references(current));
    }

    Ok(dependencies)
}

/// Calculate the type hash for a struct type
/// typeHash = keccak256(encodeType(typeOf(s)))
pub fn type_hash(registry: &TypeRegistry, type_name: &str) -> Result<[u8; 32], Eip712Error> {
    let encoded = encode_type(registry, type_name)?;
    Ok(keccak256(encoded.as_bytes()))
}

/// `typeHash || word(field_1) || ... || word(field_n)`
pub fn encode_data(
    registry: &TypeRegistry,
    type_name: &str,
    values: &BTreeMap<String, TypedValue>,
) -> Result<Vec<u8>, Eip712Error> {
    let fields = registry
        .get(type_name)
        .ok_or_else(|| Eip712Error::UndefinedType(type_name.to_string()))?;

    if let Some(extra) = values.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
        return Err(Eip712Error::UnexpectedField(format!("{}.{}", type_name, extra)));
    }

    let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
    encoded.extend_from_slice(&type_hash(registry, type_name)?);

    for field in fields {
        let value = values.get(&field.name).ok_or_else(|| {
            Eip712Error::MissingField(format!("{}.{}", type_name, field.name))
        })?;

        encoded.extend_from_slice(&encode_field(registry, &field.type_name, value)?);
    }

    Ok(encoded)
}

/// Encode one value of the declared `type_name` into its 32-byte word
pub fn encode_field(
    registry: &TypeRegistry,
    type_name: &str,
    value: &TypedValue,
) -> Result<[u8; 32], Eip712Error> {
    match FieldType::parse(type_name)? {
        FieldType::Array { element, length } => {
            let items = match value {
                TypedValue::Array { element_type, items } if element_type == element => items,
                _ => return Err(type_mismatch(type_name, value)),
            };

            if let Some(expected) = length {
                if items.len() != expected {
                    return Err(Eip712Error::ValueOutOfRange {
                        type_name: type_name.to_string(),
                        value: format!("{} elements", items.len()),
                    });
                }
            }

            let mut encoded = Vec::with_capacity(32 * items.len());
            for item in items {
                encoded.extend_from_slice(&encode_field(registry, element, item)?);
            }
            Ok(keccak256(&encoded))
        }
        FieldType::Struct(name) => match value {
            TypedValue::Struct { type_name: actual, fields } if actual == name => {
                hash_struct(registry, name, fields)
            }
            _ => Err(type_mismatch(type_name, value)),
        },
        FieldType::String => match value {
            TypedValue::String(s) => Ok(keccak256(s.as_bytes())),
            _ => Err(type_mismatch(type_name, value)),
        },
        FieldType::Bytes => match value {
            TypedValue::Bytes(b) => Ok(keccak256(b)),
            _ => Err(type_mismatch(type_name, value)),
        },
        atomic => encode_atomic(atomic, type_name, value),
    }
}

/// Encode an atomic (fixed-size) value
fn encode_atomic(
    field_type: FieldType<'_>,
    type_name: &str,
    value: &TypedValue,
) -> Result<[u8; 32], Eip712Error> {
    let mut word = [0u8; 32];

    match (field_type, value) {
        // address - 20 bytes, left-padded to 32
        (FieldType::Address, TypedValue::Address(addr)) => {
            word[12..].copy_from_slice(addr.as_bytes());
        }
        (FieldType::Bool, TypedValue::Bool(b)) => {
            word[31] = u8::from(*b);
        }
        (FieldType::Uint(bits), TypedValue::Uint { bits: actual, value: n }) if bits == *actual => {
            if n.bits() > usize::from(bits) {
                return Err(out_of_range(type_name, value));
            }
            n.to_big_endian(&mut word);
        }
        // Two's complement over the full word sign-extends negatives
        (FieldType::Int(bits), TypedValue::Int { bits: actual, value: n }) if bits == *actual => {
            if !int_fits(bits, n) {
                return Err(out_of_range(type_name, value));
            }
            n.into_raw().to_big_endian(&mut word);
        }
        // bytesN - right-padded
        (FieldType::FixedBytes(size), TypedValue::FixedBytes(bytes)) if bytes.len() == size => {
            word[..size].copy_from_slice(bytes);
        }
        _ => return Err(type_mismatch(type_name, value)),
    }

    Ok(word)
}

/// -2^(bits-1) <= n < 2^(bits-1)
fn int_fits(bits: u16, n: &I256) -> bool {
    let limit = U256::one() << (usize::from(bits) - 1);
    let magnitude = n.unsigned_abs();
    if n.is_negative() {
        magnitude <= limit
    } else {
        magnitude < limit
    }
}

fn type_mismatch(type_name: &str, value: &TypedValue) -> Eip712Error {
    Eip712Error::TypeMismatch {
        type_name: type_name.to_string(),
        value: value.to_string(),
    }
}

fn out_of_range(type_name: &str, value: &TypedValue) -> Eip712Error {
    Eip712Error::ValueOutOfRange {
        type_name: type_name.to_string(),
        value: value.to_string(),
    }
}
