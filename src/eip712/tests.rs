//! EIP-712 Test Suite
//!
//! Golden vectors and cross-module scenarios.

use super::*;
use crate::utils::security_config::SecuritySettings;

const TEST_KEY: &str = "8f08198852c63b7894251d940a7b6884bbfc02a8468701ffd246e3c5b4092382";
const TEST_ADDRESS: &str = "0x3fcb0d10f7F6589F47c527FDF48582502A0F90EC";

const CLAIM_SIGNATURE: &str = "0xeb635cd63d85698db98dd0d199d8841e6e58efd982d5d9fa22e866940a1055fb0701e7b6cd47c3c2e375a843e242862bdc41d4e5ab6a61a08068588a2e21bef81c";
const CLAIM_SIGNER: &str = "0xeBf70e73198D6B18ea8026A1864c0f298D4e23A7";

fn claim_vector_hash() -> [u8; 32] {
    let registry = messages::application_registry().unwrap();
    let domain = messages::activity_domain("Claim", 8724u64, "1");
    let message = messages::claim_message(1u64, 1640069436);
    hash_typed_message(&registry, &domain, &message).unwrap()
}

/// Test the canonical Mail example from EIP-712 specification
#[test]
fn test_eip712_mail_example() {
    let json = r#"{
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "Person": [
                {"name": "name", "type": "string"},
                {"name": "wallet", "type": "address"}
            ],
            "Mail": [
                {"name": "from", "type": "Person"},
                {"name": "to", "type": "Person"},
                {"name": "contents", "type": "string"}
            ]
        },
        "primaryType": "Mail",
        "domain": {
            "name": "Ether Mail",
            "version": "1",
            "chainId": 1,
            "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
        },
        "message": {
            "from": {
                "name": "Cow",
                "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"
            },
            "to": {
                "name": "Bob",
                "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"
            },
            "contents": "Hello, Bob!"
        }
    }"#;

    let typed_data = TypedData::from_json(json).unwrap();
    let pre_image = typed_data.pre_image().unwrap();

    assert_eq!(
        hex::encode(pre_image.struct_hash),
        "c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
    );
    assert_eq!(
        hex::encode(pre_image.domain_separator),
        "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
    );
    assert_eq!(
        hex::encode(pre_image.final_hash),
        "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
    );
}

/// Claim schema under a domain without a verifying contract
#[test]
fn test_claim_type_strings() {
    let registry = messages::application_registry().unwrap();
    let domain = messages::activity_domain("activity", 97u64, "BD15}{|SD");

    assert_eq!(
        encode_type(&registry, "Claim").unwrap(),
        "Claim(uint256 value,uint256 deadline)"
    );
    assert_eq!(
        encode_type(&domain_registry(&domain).unwrap(), DOMAIN_TYPE_NAME).unwrap(),
        "EIP712Domain(string name,string version,uint256 chainId,string salt)"
    );
}

/// Signature produced by an independent implementation
#[test]
fn test_claim_reference_signature() {
    let hash = claim_vector_hash();
    let signature = Eip712Signature::from_hex(CLAIM_SIGNATURE).unwrap();

    let recovered = recover_address(&hash, &signature.to_bytes()).unwrap();
    assert_eq!(recovered.to_checksum(), CLAIM_SIGNER);

    assert!(verify_signature(&hash, &signature.to_bytes(), CLAIM_SIGNER).is_match());
    assert!(matches!(
        verify_signature(&hash, &signature.to_bytes(), TEST_ADDRESS),
        Verification::Mismatch { .. }
    ));
}

/// Claim, Login and Permit signed with the test key verify against its address
#[test]
fn test_sign_and_verify_application_messages() {
    let registry = messages::application_registry().unwrap();
    let key = hex::decode(TEST_KEY).unwrap();
    let salt = "BD15}{|SD";

    let cases = [
        (
            messages::activity_domain("activity", 97u64, salt),
            messages::claim_message(1u64, 1639531996),
        ),
        (
            messages::activity_domain("activity", 97u64, salt),
            messages::login_message(
                "0xe5DaF2824B43d8b0C961225Ab9992baf39F5F835".parse().unwrap(),
                1639531996,
            ),
        ),
        (
            messages::permit_domain(
                "activity",
                97u64,
                "0xe5DaF2824B43d8b0C961225Ab9992baf39F5F830".parse().unwrap(),
                salt,
            ),
            messages::permit_message(
                "0xe5DaF2824B43d8b0C961225Ab9992baf39F5F831".parse().unwrap(),
                "0xe5DaF2824B43d8b0C961225Ab9992baf39F5F832".parse().unwrap(),
                1u64,
                1639531996,
            ),
        ),
    ];

    for (domain, message) in cases {
        let signature = sign_typed_message(&registry, &domain, &message, &key).unwrap();
        let bytes = signature.to_bytes();
        assert_eq!(bytes.len(), 65);
        assert!(bytes[64] == 27 || bytes[64] == 28);

        let hash = hash_typed_message(&registry, &domain, &message).unwrap();
        assert!(verify_signature(&hash, &bytes, TEST_ADDRESS).is_match());
        assert!(verify_signature_with(&hash, &bytes, TEST_ADDRESS, &SecuritySettings::strict()).is_match());
        assert!(verify_signature(&hash, &bytes, CLAIM_SIGNER).into_result().is_err());
    }
}

/// Test with array types
#[test]
fn test_eip712_with_arrays() {
    let json = r#"{
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "chainId", "type": "uint256"}
            ],
            "Order": [
                {"name": "items", "type": "uint256[]"},
                {"name": "prices", "type": "uint256[3]"}
            ]
        },
        "primaryType": "Order",
        "domain": {
            "name": "Test",
            "chainId": 1
        },
        "message": {
            "items": [1, 2, 3],
            "prices": [100, 200, 300]
        }
    }"#;

    let typed_data = TypedData::from_json(json).unwrap();
    let hash = typed_data.struct_hash().unwrap();

    let words = |values: [u16; 3]| {
        let mut buf = [0u8; 96];
        for (i, v) in values.iter().enumerate() {
            buf[32 * i + 30..32 * i + 32].copy_from_slice(&v.to_be_bytes());
        }
        crate::utils::crypto::keccak256(&buf)
    };

    let mut encoded = Vec::new();
    encoded.extend_from_slice(&type_hash(&typed_data.registry, "Order").unwrap());
    encoded.extend_from_slice(&words([1, 2, 3]));
    encoded.extend_from_slice(&words([100, 200, 300]));

    assert_eq!(hash, crate::utils::crypto::keccak256(&encoded));
}

/// Test with nested struct arrays
#[test]
fn test_eip712_struct_arrays() {
    let json = r#"{
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "chainId", "type": "uint256"}
            ],
            "Item": [
                {"name": "id", "type": "uint256"},
                {"name": "name", "type": "string"}
            ],
            "Order": [
                {"name": "items", "type": "Item[]"},
                {"name": "buyer", "type": "address"}
            ]
        },
        "primaryType": "Order",
        "domain": {
            "name": "Marketplace",
            "chainId": 1
        },
        "message": {
            "items": [
                {"id": 1, "name": "Widget"},
                {"id": 2, "name": "Gadget"}
            ],
            "buyer": "0x1234567890123456789012345678901234567890"
        }
    }"#;

    let typed_data = TypedData::from_json(json).unwrap();
    assert_eq!(
        typed_data.encode_type().unwrap(),
        "Order(Item[] items,address buyer)Item(uint256 id,string name)"
    );

    let item = |id: u64, name: &str| {
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("id".to_string(), TypedValue::uint256(id));
        fields.insert("name".to_string(), TypedValue::string(name));
        hash_struct(&typed_data.registry, "Item", &fields).unwrap()
    };

    let mut items = Vec::new();
    items.extend_from_slice(&item(1, "Widget"));
    items.extend_from_slice(&item(2, "Gadget"));

    let mut buyer = [0u8; 32];
    buyer[12..].copy_from_slice(&hex::decode("1234567890123456789012345678901234567890").unwrap());

    let mut encoded = Vec::new();
    encoded.extend_from_slice(&type_hash(&typed_data.registry, "Order").unwrap());
    encoded.extend_from_slice(&crate::utils::crypto::keccak256(&items));
    encoded.extend_from_slice(&buyer);

    assert_eq!(typed_data.struct_hash().unwrap(), crate::utils::crypto::keccak256(&encoded));
}

/// Test OpenSea-style order
#[test]
fn test_eip712_opensea_order() {
    let json = r#"{
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "OrderComponents": [
                {"name": "offerer", "type": "address"},
                {"name": "zone", "type": "address"},
                {"name": "orderType", "type": "uint8"},
                {"name": "startTime", "type": "uint256"},
                {"name": "endTime", "type": "uint256"},
                {"name": "zoneHash", "type": "bytes32"},
                {"name": "salt", "type": "uint256"},
                {"name": "conduitKey", "type": "bytes32"},
                {"name": "counter", "type": "uint256"}
            ]
        },
        "primaryType": "OrderComponents",
        "domain": {
            "name": "Seaport",
            "version": "1.1",
            "chainId": 1,
            "verifyingContract": "0x00000000006c3852cbEf3e08E8dF289169EdE581"
        },
        "message": {
            "offerer": "0x1234567890123456789012345678901234567890",
            "zone": "0x0000000000000000000000000000000000000000",
            "orderType": 0,
            "startTime": 1640000000,
            "endTime": 1893456000,
            "zoneHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
            "salt": "12345",
            "conduitKey": "0x0000000000000000000000000000000000000000000000000000000000000000",
            "counter": 0
        }
    }"#;

    let typed_data = TypedData::from_json(json).unwrap();
    let first = typed_data.signing_hash().unwrap();
    let second = TypedData::from_json(json).unwrap().signing_hash().unwrap();
    assert_eq!(first, second);
}

/// Test invalid primary type
#[test]
fn test_eip712_invalid_primary_type() {
    let json = r#"{
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"}
            ],
            "Person": [
                {"name": "name", "type": "string"}
            ]
        },
        "primaryType": "NonExistent",
        "domain": {"name": "Test"},
        "message": {}
    }"#;

    let result = TypedData::from_json(json);
    assert!(matches!(result, Err(Eip712Error::UndefinedType(_))));
}

/// Recursive types are rejected before anything is hashed
#[test]
fn test_eip712_cyclic_document() {
    let json = r#"{
        "types": {
            "Node": [
                {"name": "value", "type": "uint256"},
                {"name": "children", "type": "Node[]"}
            ]
        },
        "primaryType": "Node",
        "domain": {"name": "Tree"},
        "message": {"value": 1, "children": []}
    }"#;

    assert!(matches!(
        TypedData::from_json(json),
        Err(Eip712Error::CyclicType(_))
    ));
}

/// Test chain ID parsing
#[test]
fn test_chain_id_parsing() {
    let doc = |chain_id: serde_json::Value| {
        serde_json::json!({
            "types": {"Ping": [{"name": "n", "type": "uint8"}]},
            "primaryType": "Ping",
            "domain": {"chainId": chain_id},
            "message": {"n": 1}
        })
    };

    for chain_id in [serde_json::json!(137), serde_json::json!("137"), serde_json::json!("0x89")] {
        let typed = TypedData::from_value(doc(chain_id)).unwrap();
        assert_eq!(typed.domain.chain_id, Some(137u64.into()));
    }
}

/// Test pre-image generation
#[test]
fn test_pre_image_generation() {
    let json = r#"{
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "chainId", "type": "uint256"}
            ],
            "Message": [
                {"name": "content", "type": "string"}
            ]
        },
        "primaryType": "Message",
        "domain": {
            "name": "Test",
            "chainId": 1
        },
        "message": {
            "content": "Hello World"
        }
    }"#;

    let typed_data = TypedData::from_json(json).unwrap();
    let pre_image = typed_data.pre_image().unwrap();

    assert_eq!(pre_image.domain_separator, typed_data.domain_separator().unwrap());
    assert_eq!(pre_image.struct_hash, typed_data.struct_hash().unwrap());
    assert_eq!(
        pre_image.final_hash,
        signing_hash(&pre_image.domain_separator, &pre_image.struct_hash)
    );
}

/// Test signing roundtrip
#[test]
fn test_signing_roundtrip() {
    let json = r#"{
        "types": {
            "Message": [
                {"name": "content", "type": "string"}
            ]
        },
        "primaryType": "Message",
        "domain": {
            "name": "Test",
            "chainId": 1
        },
        "message": {
            "content": "Hello World"
        }
    }"#;

    let typed_data = TypedData::from_json(json).unwrap();
    let key = parse_private_key("0x0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef")
        .unwrap();
    let expected = address_of(&key).to_checksum();

    let signature = typed_data.sign(&key).unwrap();
    let hash = typed_data.signing_hash().unwrap();
    let recovered = recover_address(&hash, &signature.to_bytes()).unwrap();
    assert_eq!(recovered.to_checksum(), expected);

    let settings = SecuritySettings::default();
    assert!(typed_data.verify(&expected, &signature.to_bytes(), &settings).is_match());

    let wrong_address = "0x0000000000000000000000000000000000000000";
    assert!(matches!(
        typed_data.verify(wrong_address, &signature.to_bytes(), &settings),
        Verification::Mismatch { .. }
    ));
}
