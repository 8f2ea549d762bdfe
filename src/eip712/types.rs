//! EIP-712 Type Definitions
//!
//! Core data structures for EIP-712 typed data signing.

use super::encoder::FieldType;
use super::value::TypedValue;
use crate::error::ErrorCode;
use crate::utils::crypto::{decode_hex, keccak256, strip_hex_prefix, to_checksum_address};
use ethers_core::types::U256;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// Name of the implicit domain struct
pub const DOMAIN_TYPE_NAME: &str = "EIP712Domain";

/// A field in a struct type definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeField {
    /// The name of the field
    pub name: String,
    /// The type of the field (e.g., "address", "uint256", "Person[]")
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypeField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Named struct definitions, validated on construction and read-only afterwards.
///
/// Every referenced struct type must be defined and the reference graph must
/// be acyclic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRegistry {
    types: BTreeMap<String, Vec<TypeField>>,
}

impl TypeRegistry {
    /// Build and validate a registry from `(type name, ordered fields)` pairs
    pub fn new<I, S>(definitions: I) -> Result<Self, Eip712Error>
    where
        I: IntoIterator<Item = (S, Vec<TypeField>)>,
        S: Into<String>,
    {
        let mut types = BTreeMap::new();
        for (name, fields) in definitions {
            let name = name.into();
            if types.contains_key(&name) {
                return Err(Eip712Error::InvalidType(format!(
                    "duplicate definition of {}",
                    name
                )));
            }
            types.insert(name, fields);
        }

        let registry = Self { types };
        registry.validate()?;
        Ok(registry)
    }

    /// Fields of a defined type, in declaration order
    pub fn get(&self, type_name: &str) -> Option<&[TypeField]> {
        self.types.get(type_name).map(Vec::as_slice)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Struct types referenced directly by the fields of `type_name`
    /// (array element types included). Empty for undefined types.
    pub fn struct_references(&self, type_name: &str) -> Vec<&str> {
        self.types
            .get(type_name)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| FieldType::parse(&f.type_name).ok()?.struct_name())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn validate(&self) -> Result<(), Eip712Error> {
        for (name, fields) in &self.types {
            // A definition must not shadow a builtin such as `uint256`
            match FieldType::parse(name) {
                Ok(FieldType::Struct(_)) => {}
                _ => return Err(Eip712Error::InvalidType(format!("invalid struct name: {}", name))),
            }

            let mut seen = BTreeSet::new();
            for field in fields {
                if field.name.is_empty() || !seen.insert(field.name.as_str()) {
                    return Err(Eip712Error::InvalidType(format!(
                        "{}: empty or duplicate field name '{}'",
                        name, field.name
                    )));
                }

                if let Some(dep) = FieldType::parse(&field.type_name)?.struct_name() {
                    if !self.contains(dep) {
                        return Err(Eip712Error::UndefinedType(dep.to_string()));
                    }
                }
            }
        }

        self.check_acyclic()
    }

    fn check_acyclic(&self) -> Result<(), Eip712Error> {
        let mut finished = BTreeSet::new();
        for name in self.types.keys() {
            let mut path = Vec::new();
            self.visit(name, &mut path, &mut finished)?;
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        finished: &mut BTreeSet<&'a str>,
    ) -> Result<(), Eip712Error> {
        if finished.contains(name) {
            return Ok(());
        }
        if path.contains(&name) {
            return Err(Eip712Error::CyclicType(format!("{} -> {}", path.join(" -> "), name)));
        }

        path.push(name);
        for dep in self.struct_references(name) {
            self.visit(dep, path, finished)?;
        }
        path.pop();

        finished.insert(name);
        Ok(())
    }
}

/// Salt attribute of a domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainSalt {
    /// Encoded as `string` (hashed)
    Text(String),
    /// Encoded as `bytes32`
    Bytes32([u8; 32]),
}

/// The EIP-712 domain. Only present attributes take part in the domain type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eip712Domain {
    /// The human-readable name of the signing domain
    pub name: Option<String>,

    /// The current major version of the signing domain
    pub version: Option<String>,

    /// The EIP-155 chain ID
    pub chain_id: Option<U256>,

    /// The address of the contract that will verify the signature
    pub verifying_contract: Option<Address>,

    /// An optional disambiguating salt
    pub salt: Option<DomainSalt>,
}

impl Eip712Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_chain_id(mut self, chain_id: impl Into<U256>) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    pub fn with_verifying_contract(mut self, contract: Address) -> Self {
        self.verifying_contract = Some(contract);
        self
    }

    pub fn with_salt(mut self, salt: DomainSalt) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Fields of the implicit `EIP712Domain` type, in canonical order
    pub fn fields(&self) -> Vec<TypeField> {
        let mut fields = Vec::new();

        if self.name.is_some() {
            fields.push(TypeField::new("name", "string"));
        }
        if self.version.is_some() {
            fields.push(TypeField::new("version", "string"));
        }
        if self.chain_id.is_some() {
            fields.push(TypeField::new("chainId", "uint256"));
        }
        if self.verifying_contract.is_some() {
            fields.push(TypeField::new("verifyingContract", "address"));
        }
        match self.salt {
            Some(DomainSalt::Text(_)) => fields.push(TypeField::new("salt", "string")),
            Some(DomainSalt::Bytes32(_)) => fields.push(TypeField::new("salt", "bytes32")),
            None => {}
        }

        fields
    }

    /// Values matching [`Eip712Domain::fields`]
    pub fn values(&self) -> BTreeMap<String, TypedValue> {
        let mut values = BTreeMap::new();

        if let Some(ref name) = self.name {
            values.insert("name".to_string(), TypedValue::string(name.as_str()));
        }
        if let Some(ref version) = self.version {
            values.insert("version".to_string(), TypedValue::string(version.as_str()));
        }
        if let Some(chain_id) = self.chain_id {
            values.insert("chainId".to_string(), TypedValue::uint256(chain_id));
        }
        if let Some(contract) = self.verifying_contract {
            values.insert("verifyingContract".to_string(), TypedValue::Address(contract));
        }
        match self.salt {
            Some(DomainSalt::Text(ref salt)) => {
                values.insert("salt".to_string(), TypedValue::string(salt.as_str()));
            }
            Some(DomainSalt::Bytes32(salt)) => {
                values.insert("salt".to_string(), TypedValue::FixedBytes(salt.to_vec()));
            }
            None => {}
        }

        values
    }
}

/// A message to be hashed as `primary_type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedMessage {
    pub primary_type: String,
    pub values: BTreeMap<String, TypedValue>,
}

impl TypedMessage {
    pub fn new(primary_type: impl Into<String>) -> Self {
        Self {
            primary_type: primary_type.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, field: impl Into<String>, value: TypedValue) -> Self {
        self.values.insert(field.into(), value);
        self
    }
}

/// A 20-byte Ethereum address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Eip712Error> {
        let array: [u8; 20] = bytes.try_into().map_err(|_| {
            Eip712Error::InvalidAddress(format!("expected 20 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(array))
    }

    /// Address of a secp256k1 public key: low 20 bytes of the keccak256 of the
    /// uncompressed key without its `0x04` prefix
    pub fn from_public_key(public_key: &secp256k1::PublicKey) -> Self {
        let uncompressed = public_key.serialize_uncompressed();
        let hash = keccak256(&uncompressed[1..]);

        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);
        Self(address)
    }

    /// Parse an address, requiring a valid EIP-55 checksum when the hex is mixed-case
    pub fn from_checksummed(s: &str) -> Result<Self, Eip712Error> {
        let address: Address = s.parse()?;
        let digits = strip_hex_prefix(s.trim());

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum()[2..] != *digits {
            return Err(Eip712Error::InvalidAddress(format!("bad EIP-55 checksum: {}", s)));
        }

        Ok(address)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 checksummed hex form
    pub fn to_checksum(&self) -> String {
        to_checksum_address(&self.0)
    }

    /// Byte comparison that does not short-circuit
    pub fn ct_eq(&self, other: &Address) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl FromStr for Address {
    type Err = Eip712Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex_prefix(s.trim());
        if digits.len() != 40 {
            return Err(Eip712Error::InvalidAddress(format!(
                "invalid length: expected 40 hex chars, got {}",
                digits.len()
            )));
        }

        let bytes = hex::decode(digits)
            .map_err(|e| Eip712Error::InvalidAddress(format!("invalid hex: {}", e)))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

/// EIP-712 signature components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eip712Signature {
    /// r component (32 bytes)
    pub r: [u8; 32],
    /// s component (32 bytes)
    pub s: [u8; 32],
    /// v component (27 or 28)
    pub v: u8,
}

impl Eip712Signature {
    /// Serialized length (r || s || v)
    pub const LENGTH: usize = 65;

    /// Offset added to the raw 0/1 recovery id
    pub const V_OFFSET: u8 = 27;

    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    /// Parse a 65-byte signature (r || s || v) with `v` in {27, 28}
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Eip712Error> {
        if bytes.len() != Self::LENGTH {
            return Err(Eip712Error::InvalidSignatureLength(bytes.len()));
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[0..32]);
        s.copy_from_slice(&bytes[32..64]);

        let signature = Self { r, s, v: bytes[64] };
        signature.recovery_id()?;
        Ok(signature)
    }

    /// Parse a hex-encoded signature (optional `0x` prefix)
    pub fn from_hex(hex_str: &str) -> Result<Self, Eip712Error> {
        let bytes = decode_hex(hex_str).map_err(|e| Eip712Error::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// The 0/1 recovery id encoded in `v`
    pub fn recovery_id(&self) -> Result<u8, Eip712Error> {
        match self.v {
            27 | 28 => Ok(self.v - Self::V_OFFSET),
            other => Err(Eip712Error::InvalidRecoveryByte(other)),
        }
    }

    /// Convert to 65-byte representation (r || s || v)
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[0..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

/// Errors that can occur during EIP-712 operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Eip712Error {
    #[error("Undefined type: {0}")]
    UndefinedType(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    #[error("Type mismatch: expected {type_name}, got {value}")]
    TypeMismatch { type_name: String, value: String },

    #[error("Cyclic type reference: {0}")]
    CyclicType(String),

    #[error("Domain mismatch: {0}")]
    DomainMismatch(String),

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Invalid value for type {type_name}: {value}")]
    InvalidValue { type_name: String, value: String },

    #[error("Value out of range for {type_name}: {value}")]
    ValueOutOfRange { type_name: String, value: String },

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid signature length: expected 65 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Invalid recovery byte: {0} (expected 27 or 28)")]
    InvalidRecoveryByte(u8),

    #[error("Non-canonical signature: s is in the upper half of the curve order")]
    NonCanonicalSignature,

    #[error("Signature recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("Address mismatch: expected {expected}, recovered {recovered}")]
    AddressMismatch { expected: Address, recovered: Address },
}

impl Eip712Error {
    /// Error category
    pub fn code(&self) -> ErrorCode {
        match self {
            Eip712Error::UndefinedType(_)
            | Eip712Error::MissingField(_)
            | Eip712Error::UnexpectedField(_)
            | Eip712Error::TypeMismatch { .. }
            | Eip712Error::CyclicType(_)
            | Eip712Error::DomainMismatch(_) => ErrorCode::Schema,

            Eip712Error::InvalidType(_)
            | Eip712Error::InvalidValue { .. }
            | Eip712Error::ValueOutOfRange { .. }
            | Eip712Error::InvalidJson(_)
            | Eip712Error::InvalidHex(_)
            | Eip712Error::InvalidAddress(_) => ErrorCode::Encoding,

            Eip712Error::InvalidPrivateKey(_) => ErrorCode::Key,

            Eip712Error::InvalidSignatureLength(_)
            | Eip712Error::InvalidRecoveryByte(_)
            | Eip712Error::NonCanonicalSignature => ErrorCode::SignatureFormat,

            Eip712Error::RecoveryFailed(_) => ErrorCode::Recovery,

            Eip712Error::AddressMismatch { .. } => ErrorCode::AddressMismatch,
        }
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<TypeField> {
        pairs.iter().map(|(n, t)| TypeField::new(*n, *t)).collect()
    }

    #[test]
    fn test_registry_rejects_non_canonical_widths() {
        for bad in ["uint08", "int016", "bytes01", "uint256[01]"] {
            let result = TypeRegistry::new([("T", fields(&[("a", bad)]))]);
            assert_eq!(
                result.unwrap_err(),
                Eip712Error::InvalidType(bad.to_string()),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_registry_rejects_undefined_reference() {
        let result = TypeRegistry::new([("Mail", fields(&[("from", "Person")]))]);
        assert_eq!(result.unwrap_err(), Eip712Error::UndefinedType("Person".to_string()));
    }

    #[test]
    fn test_registry_rejects_undefined_array_element() {
        let result = TypeRegistry::new([("Order", fields(&[("items", "Item[]")]))]);
        assert_eq!(result.unwrap_err(), Eip712Error::UndefinedType("Item".to_string()));
    }

    #[test]
    fn test_registry_rejects_direct_cycle() {
        let result = TypeRegistry::new([("Node", fields(&[("next", "Node")]))]);
        assert!(matches!(result, Err(Eip712Error::CyclicType(_))));
    }

    #[test]
    fn test_registry_rejects_transitive_cycle() {
        let result = TypeRegistry::new([
            ("A", fields(&[("b", "B")])),
            ("B", fields(&[("c", "C[]")])),
            ("C", fields(&[("a", "A")])),
        ]);
        assert!(matches!(result, Err(Eip712Error::CyclicType(_))));
    }

    #[test]
    fn test_registry_accepts_diamond() {
        let registry = TypeRegistry::new([
            ("Top", fields(&[("left", "Left"), ("right", "Right")])),
            ("Left", fields(&[("leaf", "Leaf")])),
            ("Right", fields(&[("leaves", "Leaf[2]")])),
            ("Leaf", fields(&[("value", "uint256")])),
        ])
        .unwrap();

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.struct_references("Top"), vec!["Left", "Right"]);
        assert_eq!(registry.struct_references("Right"), vec!["Leaf"]);
    }

    #[test]
    fn test_registry_rejects_duplicate_field_and_bad_names() {
        let dup = TypeRegistry::new([("T", fields(&[("a", "uint256"), ("a", "bool")]))]);
        assert!(matches!(dup, Err(Eip712Error::InvalidType(_))));

        let shadow = TypeRegistry::new([("uint256", fields(&[("a", "bool")]))]);
        assert!(matches!(shadow, Err(Eip712Error::InvalidType(_))));

        let malformed = TypeRegistry::new([("T", fields(&[("a", "uint256[")]))]);
        assert!(matches!(malformed, Err(Eip712Error::InvalidType(_))));
    }

    #[test]
    fn test_domain_fields_follow_presence() {
        let domain = Eip712Domain::new()
            .with_name("activity")
            .with_chain_id(97u64)
            .with_salt(DomainSalt::Text("BD15".to_string()));

        let names: Vec<_> = domain.fields().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["name", "chainId", "salt"]);
        assert_eq!(domain.values().len(), 3);

        let bytes_salt = Eip712Domain::new().with_salt(DomainSalt::Bytes32([7u8; 32]));
        assert_eq!(bytes_salt.fields(), vec![TypeField::new("salt", "bytes32")]);
    }

    #[test]
    fn test_address_parsing() {
        let addr: Address = "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826".parse().unwrap();
        assert_eq!(addr.as_bytes()[0], 0xCD);
        assert_eq!(addr.to_string(), "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826");

        let lower: Address = "cd2a3d9f938e13cd947ec05abc7fe734df8dd826".parse().unwrap();
        assert_eq!(addr, lower);
        assert!(addr.ct_eq(&lower));

        assert!(matches!(
            "0x1234".parse::<Address>(),
            Err(Eip712Error::InvalidAddress(_))
        ));
        assert!(matches!(
            "0xzz2a3d9f938e13cd947ec05abc7fe734df8dd826".parse::<Address>(),
            Err(Eip712Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_address_checksum_enforcement() {
        assert!(Address::from_checksummed("0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826").is_ok());
        assert!(Address::from_checksummed("0xcd2a3d9f938e13cd947ec05abc7fe734df8dd826").is_ok());
        assert!(Address::from_checksummed("0xCD2A3D9F938E13CD947EC05ABC7FE734DF8DD826").is_ok());
        assert!(matches!(
            Address::from_checksummed("0xcD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"),
            Err(Eip712Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_signature_conversion() {
        let sig = Eip712Signature::new([1u8; 32], [2u8; 32], 27);
        let bytes = sig.to_bytes();
        let parsed = Eip712Signature::from_bytes(&bytes).unwrap();

        assert_eq!(sig, parsed);
        assert_eq!(parsed.recovery_id().unwrap(), 0);
        assert_eq!(sig.to_hex().len(), 132);
        assert_eq!(Eip712Signature::from_hex(&sig.to_hex()).unwrap(), sig);
    }

    #[test]
    fn test_signature_format_errors() {
        assert_eq!(
            Eip712Signature::from_bytes(&[0u8; 64]).unwrap_err(),
            Eip712Error::InvalidSignatureLength(64)
        );

        let mut bytes = [0u8; 65];
        bytes[64] = 1;
        assert_eq!(
            Eip712Signature::from_bytes(&bytes).unwrap_err(),
            Eip712Error::InvalidRecoveryByte(1)
        );
        assert!(matches!(
            Eip712Signature::from_hex("0xnothex"),
            Err(Eip712Error::InvalidHex(_))
        ));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Eip712Error::CyclicType("A".into()).code(), ErrorCode::Schema);
        assert_eq!(Eip712Error::InvalidType("x".into()).code(), ErrorCode::Encoding);
        assert_eq!(Eip712Error::InvalidPrivateKey("x".into()).code(), ErrorCode::Key);
        assert_eq!(Eip712Error::InvalidRecoveryByte(0).code(), ErrorCode::SignatureFormat);
        assert_eq!(Eip712Error::RecoveryFailed("x".into()).code(), ErrorCode::Recovery);
    }
}
