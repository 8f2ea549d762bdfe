//! EIP-712 typed-data JSON documents
//!
//! Parses the `{types, primaryType, domain, message}` form used by wallets
//! and `eth_signTypedData_v4` into a validated registry, a domain and a
//! tagged message tree.

use super::encoder::{encode_type, FieldType};
use super::hasher::{domain_registry, domain_separator, get_pre_image, hash_struct, Eip712PreImage};
use super::signer::{sign_hash_with_key, verify_signature_with, Verification};
use super::types::*;
use super::value::TypedValue;
use crate::utils::crypto::{decode_hex, strip_hex_prefix};
use crate::utils::security_config::SecuritySettings;
use ethers_core::types::{I256, U256};
use secp256k1::SecretKey;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Wire form of a typed-data document
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTypedData {
    types: BTreeMap<String, Vec<TypeField>>,
    primary_type: String,
    #[serde(default)]
    domain: RawDomain,
    #[serde(default)]
    message: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawDomain {
    name: Option<String>,
    version: Option<String>,
    chain_id: Option<Value>,
    verifying_contract: Option<String>,
    salt: Option<String>,
}

/// A parsed and validated typed-data document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedData {
    /// Message types (the `EIP712Domain` declaration is not kept here)
    pub registry: TypeRegistry,
    pub domain: Eip712Domain,
    pub message: TypedMessage,
}

impl TypedData {
    /// Parse typed data from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Eip712Error> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Eip712Error::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parse typed data from a JSON value
    pub fn from_value(value: Value) -> Result<Self, Eip712Error> {
        let mut raw: RawTypedData =
            serde_json::from_value(value).map_err(|e| Eip712Error::InvalidJson(e.to_string()))?;

        let declared_domain = raw.types.remove(DOMAIN_TYPE_NAME);
        let domain = parse_domain(raw.domain, declared_domain.as_deref())?;

        let registry = TypeRegistry::new(raw.types)?;
        let values = parse_struct(&registry, &raw.primary_type, &raw.message)?;

        Ok(Self {
            registry,
            domain,
            message: TypedMessage {
                primary_type: raw.primary_type,
                values,
            },
        })
    }

    /// Encoded type string of the primary type
    pub fn encode_type(&self) -> Result<String, Eip712Error> {
        encode_type(&self.registry, &self.message.primary_type)
    }

    /// Encoded type string of the implicit domain type
    pub fn domain_type(&self) -> Result<String, Eip712Error> {
        encode_type(&domain_registry(&self.domain)?, DOMAIN_TYPE_NAME)
    }

    pub fn domain_separator(&self) -> Result<[u8; 32], Eip712Error> {
        domain_separator(&self.domain)
    }

    pub fn struct_hash(&self) -> Result<[u8; 32], Eip712Error> {
        hash_struct(&self.registry, &self.message.primary_type, &self.message.values)
    }

    pub fn pre_image(&self) -> Result<Eip712PreImage, Eip712Error> {
        get_pre_image(&self.registry, &self.domain, &self.message)
    }

    /// The digest to sign
    pub fn signing_hash(&self) -> Result<[u8; 32], Eip712Error> {
        Ok(self.pre_image()?.final_hash)
    }

    pub fn sign(&self, secret_key: &SecretKey) -> Result<Eip712Signature, Eip712Error> {
        Ok(sign_hash_with_key(&self.signing_hash()?, secret_key))
    }

    pub fn verify(
        &self,
        expected_address: &str,
        signature: &[u8],
        settings: &SecuritySettings,
    ) -> Verification {
        match self.signing_hash() {
            Ok(hash) => verify_signature_with(&hash, signature, expected_address, settings),
            Err(e) => Verification::Error(e),
        }
    }
}

/// Build the domain, checking it against the document's own
/// `EIP712Domain` declaration when there is one
fn parse_domain(raw: RawDomain, declared: Option<&[TypeField]>) -> Result<Eip712Domain, Eip712Error> {
    let mut domain = Eip712Domain {
        name: raw.name,
        version: raw.version,
        chain_id: raw
            .chain_id
            .as_ref()
            .map(|v| parse_uint("uint256", v))
            .transpose()?,
        verifying_contract: raw
            .verifying_contract
            .as_deref()
            .map(str::parse::<Address>)
            .transpose()?,
        salt: None,
    };

    let salt_is_bytes32 = declared
        .and_then(|fields| fields.iter().find(|f| f.name == "salt"))
        .map(|f| f.type_name == "bytes32")
        .unwrap_or(false);

    domain.salt = match raw.salt {
        Some(salt) if salt_is_bytes32 => Some(DomainSalt::Bytes32(parse_bytes32_salt(&salt)?)),
        Some(salt) => Some(DomainSalt::Text(salt)),
        None => None,
    };

    if let Some(declared) = declared {
        let expected = domain.fields();
        if declared != expected.as_slice() {
            return Err(Eip712Error::DomainMismatch(format!(
                "declared {} but domain provides {}",
                describe_fields(declared),
                describe_fields(&expected)
            )));
        }
    }

    Ok(domain)
}

fn describe_fields(fields: &[TypeField]) -> String {
    let parts: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.type_name, f.name))
        .collect();
    format!("({})", parts.join(","))
}

/// `bytes32` salt; shorter hex is right-padded like any `bytesN` value
fn parse_bytes32_salt(salt: &str) -> Result<[u8; 32], Eip712Error> {
    let bytes = parse_hex_value("bytes32", salt)?;
    if bytes.len() > 32 {
        return Err(Eip712Error::ValueOutOfRange {
            type_name: "bytes32".to_string(),
            value: format!("{} bytes", bytes.len()),
        });
    }

    let mut padded = [0u8; 32];
    padded[..bytes.len()].copy_from_slice(&bytes);
    Ok(padded)
}

/// Convert the JSON object of a struct value into typed field values
fn parse_struct(
    registry: &TypeRegistry,
    type_name: &str,
    object: &Map<String, Value>,
) -> Result<BTreeMap<String, TypedValue>, Eip712Error> {
    let fields = registry
        .get(type_name)
        .ok_or_else(|| Eip712Error::UndefinedType(type_name.to_string()))?;

    let mut values = BTreeMap::new();
    for (key, json) in object {
        let field = fields
            .iter()
            .find(|f| &f.name == key)
            .ok_or_else(|| Eip712Error::UnexpectedField(format!("{}.{}", type_name, key)))?;

        values.insert(key.clone(), parse_value(registry, &field.type_name, json)?);
    }

    // Missing fields are reported by the encoder
    Ok(values)
}

/// Convert one JSON value of the declared `type_name`
pub fn parse_value(
    registry: &TypeRegistry,
    type_name: &str,
    json: &Value,
) -> Result<TypedValue, Eip712Error> {
    let mismatch = || Eip712Error::TypeMismatch {
        type_name: type_name.to_string(),
        value: json_kind(json).to_string(),
    };

    match FieldType::parse(type_name)? {
        FieldType::Array { element, .. } => {
            let items = json.as_array().ok_or_else(mismatch)?;
            let items = items
                .iter()
                .map(|item| parse_value(registry, element, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TypedValue::array(element, items))
        }
        FieldType::Struct(name) => {
            let object = json.as_object().ok_or_else(mismatch)?;
            Ok(TypedValue::Struct {
                type_name: name.to_string(),
                fields: parse_struct(registry, name, object)?,
            })
        }
        FieldType::String => json.as_str().map(TypedValue::string).ok_or_else(mismatch),
        FieldType::Bool => json.as_bool().map(TypedValue::Bool).ok_or_else(mismatch),
        FieldType::Address => {
            let s = json.as_str().ok_or_else(mismatch)?;
            Ok(TypedValue::Address(s.parse()?))
        }
        FieldType::Bytes => {
            let s = json.as_str().ok_or_else(mismatch)?;
            Ok(TypedValue::Bytes(parse_hex_value(type_name, s)?))
        }
        FieldType::FixedBytes(size) => {
            let s = json.as_str().ok_or_else(mismatch)?;
            let mut bytes = parse_hex_value(type_name, s)?;
            if bytes.len() > size {
                return Err(Eip712Error::ValueOutOfRange {
                    type_name: type_name.to_string(),
                    value: s.to_string(),
                });
            }
            bytes.resize(size, 0);
            Ok(TypedValue::FixedBytes(bytes))
        }
        FieldType::Uint(bits) => Ok(TypedValue::uint(bits, parse_uint(type_name, json)?)),
        FieldType::Int(bits) => Ok(TypedValue::int(bits, parse_int(type_name, json)?)),
    }
}

fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn invalid_value(type_name: &str, json: &Value) -> Eip712Error {
    Eip712Error::InvalidValue {
        type_name: type_name.to_string(),
        value: json.to_string(),
    }
}

/// `0x`-prefixed (or bare) hex
fn parse_hex_value(type_name: &str, s: &str) -> Result<Vec<u8>, Eip712Error> {
    decode_hex(s).map_err(|e| Eip712Error::InvalidHex(format!("{} value {:?}: {}", type_name, s, e)))
}

/// Unsigned integer from a JSON number, decimal string or `0x` hex string
fn parse_uint(type_name: &str, json: &Value) -> Result<U256, Eip712Error> {
    match json {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| invalid_value(type_name, json)),
        Value::String(s) => parse_uint_str(s).ok_or_else(|| invalid_value(type_name, json)),
        _ => Err(Eip712Error::TypeMismatch {
            type_name: type_name.to_string(),
            value: json_kind(json).to_string(),
        }),
    }
}

fn parse_uint_str(s: &str) -> Option<U256> {
    let s = s.trim();
    if s.starts_with("0x") || s.starts_with("0X") {
        let digits = strip_hex_prefix(s);
        if digits.is_empty() {
            return None;
        }
        U256::from_str_radix(digits, 16).ok()
    } else if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        U256::from_dec_str(s).ok()
    } else {
        None
    }
}

/// Signed integer; strings may carry a leading `-`
fn parse_int(type_name: &str, json: &Value) -> Result<I256, Eip712Error> {
    let (negative, magnitude) = match json {
        Value::Number(n) => match (n.as_u64(), n.as_i64()) {
            (Some(u), _) => (false, U256::from(u)),
            (None, Some(i)) => (true, U256::from(i.unsigned_abs())),
            _ => return Err(invalid_value(type_name, json)),
        },
        Value::String(s) => {
            let s = s.trim();
            let (negative, rest) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s),
            };
            let magnitude = parse_uint_str(rest).ok_or_else(|| invalid_value(type_name, json))?;
            (negative, magnitude)
        }
        _ => {
            return Err(Eip712Error::TypeMismatch {
                type_name: type_name.to_string(),
                value: json_kind(json).to_string(),
            })
        }
    };

    let decimal = if negative {
        format!("-{}", magnitude)
    } else {
        magnitude.to_string()
    };

    I256::from_dec_str(&decimal).map_err(|_| Eip712Error::ValueOutOfRange {
        type_name: type_name.to_string(),
        value: decimal,
    })
}
