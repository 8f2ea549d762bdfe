//! EIP-712 Values
//!
//! Tagged value tree consumed by the recursive encoder.

use super::types::Address;
use ethers_core::types::{I256, U256};
use std::collections::BTreeMap;
use std::fmt;

/// A value of an EIP-712 field.
///
/// Integers carry their declared bit width, structs their type name and
/// arrays their element type; the encoder checks each against the field
/// declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Uint { bits: u16, value: U256 },
    Int { bits: u16, value: I256 },
    Address(Address),
    Bool(bool),
    /// `bytesN`, exactly N bytes
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Struct {
        type_name: String,
        fields: BTreeMap<String, TypedValue>,
    },
    Array {
        element_type: String,
        items: Vec<TypedValue>,
    },
}

impl TypedValue {
    pub fn uint256(value: impl Into<U256>) -> Self {
        TypedValue::Uint {
            bits: 256,
            value: value.into(),
        }
    }

    pub fn uint(bits: u16, value: impl Into<U256>) -> Self {
        TypedValue::Uint {
            bits,
            value: value.into(),
        }
    }

    pub fn int(bits: u16, value: I256) -> Self {
        TypedValue::Int { bits, value }
    }

    pub fn string(value: impl Into<String>) -> Self {
        TypedValue::String(value.into())
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        TypedValue::Bytes(value.into())
    }

    pub fn fixed_bytes(value: impl Into<Vec<u8>>) -> Self {
        TypedValue::FixedBytes(value.into())
    }

    pub fn structure<I, S>(type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, TypedValue)>,
        S: Into<String>,
    {
        TypedValue::Struct {
            type_name: type_name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn array(element_type: impl Into<String>, items: Vec<TypedValue>) -> Self {
        TypedValue::Array {
            element_type: element_type.into(),
            items,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Uint { bits, value } => write!(f, "uint{}({})", bits, value),
            TypedValue::Int { bits, value } => write!(f, "int{}({})", bits, value),
            TypedValue::Address(addr) => write!(f, "address({})", addr),
            TypedValue::Bool(b) => write!(f, "bool({})", b),
            TypedValue::FixedBytes(b) => write!(f, "bytes{}(0x{})", b.len(), hex::encode(b)),
            TypedValue::Bytes(b) => write!(f, "bytes(0x{})", hex::encode(b)),
            TypedValue::String(s) => write!(f, "string({:?})", s),
            TypedValue::Struct { type_name, .. } => write!(f, "struct {}", type_name),
            TypedValue::Array { element_type, items } => {
                write!(f, "{}[{}]", element_type, items.len())
            }
        }
    }
}
