//! Application message schemas
//!
//! The three authorization messages the application signs, declared as
//! data and loaded into one registry. Callers build the registry once with
//! [`application_registry`] and pass it to every engine call.

use super::types::*;
use super::value::TypedValue;
use ethers_core::types::U256;

/// Domain version shared by every application message
pub const APPLICATION_VERSION: &str = "1";

const CLAIM_FIELDS: &[(&str, &str)] = &[("value", "uint256"), ("deadline", "uint256")];

const LOGIN_FIELDS: &[(&str, &str)] = &[("account", "address"), ("deadline", "uint256")];

const PERMIT_FIELDS: &[(&str, &str)] = &[
    ("owner", "address"),
    ("spender", "address"),
    ("value", "uint256"),
    ("deadline", "uint256"),
];

/// Application message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Value/deadline claim
    Claim,
    /// Account/deadline login
    Login,
    /// Owner/spender/value/deadline permit
    Permit,
}

impl MessageKind {
    pub const ALL: [MessageKind; 3] = [MessageKind::Claim, MessageKind::Login, MessageKind::Permit];

    pub fn type_name(&self) -> &'static str {
        match self {
            MessageKind::Claim => "Claim",
            MessageKind::Login => "Login",
            MessageKind::Permit => "Permit",
        }
    }

    /// `(name, type)` pairs in declaration order
    pub fn fields(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            MessageKind::Claim => CLAIM_FIELDS,
            MessageKind::Login => LOGIN_FIELDS,
            MessageKind::Permit => PERMIT_FIELDS,
        }
    }

    fn type_fields(&self) -> Vec<TypeField> {
        self.fields()
            .iter()
            .map(|(name, type_name)| TypeField::new(*name, *type_name))
            .collect()
    }
}

/// Registry holding every application message type
pub fn application_registry() -> Result<TypeRegistry, Eip712Error> {
    TypeRegistry::new(
        MessageKind::ALL
            .iter()
            .map(|kind| (kind.type_name(), kind.type_fields())),
    )
}

/// Domain of an application activity: `name`, version `1`, `chainId` and
/// a text `salt`. Empty strings are left out of the domain.
pub fn activity_domain(name: &str, chain_id: impl Into<U256>, salt: &str) -> Eip712Domain {
    let mut domain = Eip712Domain::new()
        .with_version(APPLICATION_VERSION)
        .with_chain_id(chain_id);

    if !name.is_empty() {
        domain = domain.with_name(name);
    }
    if !salt.is_empty() {
        domain = domain.with_salt(DomainSalt::Text(salt.to_string()));
    }

    domain
}

/// Permit domain: the activity domain bound to a verifying contract
pub fn permit_domain(
    name: &str,
    chain_id: impl Into<U256>,
    verifying_contract: Address,
    salt: &str,
) -> Eip712Domain {
    activity_domain(name, chain_id, salt).with_verifying_contract(verifying_contract)
}

pub fn claim_message(value: impl Into<U256>, deadline: u64) -> TypedMessage {
    TypedMessage::new(MessageKind::Claim.type_name())
        .with_value("value", TypedValue::uint256(value))
        .with_value("deadline", TypedValue::uint256(deadline))
}

pub fn login_message(account: Address, deadline: u64) -> TypedMessage {
    TypedMessage::new(MessageKind::Login.type_name())
        .with_value("account", TypedValue::Address(account))
        .with_value("deadline", TypedValue::uint256(deadline))
}

pub fn permit_message(
    owner: Address,
    spender: Address,
    value: impl Into<U256>,
    deadline: u64,
) -> TypedMessage {
    TypedMessage::new(MessageKind::Permit.type_name())
        .with_value("owner", TypedValue::Address(owner))
        .with_value("spender", TypedValue::Address(spender))
        .with_value("value", TypedValue::uint256(value))
        .with_value("deadline", TypedValue::uint256(deadline))
}

#[cfg(test)]
mod message_tests {
    use super::*;
    use crate::eip712::encoder::encode_type;
    use crate::eip712::hasher::{domain_registry, hash_typed_message};

    fn account() -> Address {
        "0x3fcb0d10f7F6589F47c527FDF48582502A0F90EC".parse().unwrap()
    }

    #[test]
    fn test_application_type_strings() {
        let registry = application_registry().unwrap();
        assert_eq!(registry.len(), 3);

        assert_eq!(
            encode_type(&registry, "Claim").unwrap(),
            "Claim(uint256 value,uint256 deadline)"
        );
        assert_eq!(
            encode_type(&registry, "Login").unwrap(),
            "Login(address account,uint256 deadline)"
        );
        assert_eq!(
            encode_type(&registry, "Permit").unwrap(),
            "Permit(address owner,address spender,uint256 value,uint256 deadline)"
        );
    }

    #[test]
    fn test_activity_domain_type() {
        let domain = activity_domain("Claim", 8724u64, "1");
        assert_eq!(
            encode_type(&domain_registry(&domain).unwrap(), DOMAIN_TYPE_NAME).unwrap(),
            "EIP712Domain(string name,string version,uint256 chainId,string salt)"
        );

        let permit = permit_domain("Claim", 8724u64, account(), "1");
        assert_eq!(
            encode_type(&domain_registry(&permit).unwrap(), DOMAIN_TYPE_NAME).unwrap(),
            "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract,string salt)"
        );
    }

    #[test]
    fn test_empty_salt_is_omitted() {
        let domain = activity_domain("Login", 1u64, "");
        assert!(domain.salt.is_none());
        assert_eq!(domain.fields().len(), 3);
    }

    #[test]
    fn test_every_message_hashes() {
        let registry = application_registry().unwrap();
        let domain = activity_domain("activity", 97u64, "BD15");

        let messages = [
            claim_message(1u64, 1640069436),
            login_message(account(), 1640069436),
            permit_message(account(), Address::default(), 10u64, 1640069436),
        ];

        let hashes: Vec<_> = messages
            .iter()
            .map(|m| hash_typed_message(&registry, &domain, m).unwrap())
            .collect();
        assert_ne!(hashes[0], hashes[1]);
        assert_ne!(hashes[1], hashes[2]);
    }

    #[test]
    fn test_message_kind_fields() {
        for kind in MessageKind::ALL {
            assert!(!kind.fields().is_empty());
            assert_eq!(kind.fields().last().map(|f| f.0), Some("deadline"));
        }
    }
}
