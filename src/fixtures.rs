//! Shared test document signed with a 512-bit test issuer key.

use num_bigint::BigUint;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::witness::document::DELIMITER;
use crate::witness::{DocumentFields, StaticKeyStore, Witness, WitnessExtractor};

pub const ISSUER_PEM: &str = "-----BEGIN PUBLIC KEY-----
MFwwDQYJKoZIhvcNAQEBBQADSwAwSAJBALnFCCFDfCE1EPkwEm+4bG13VcNnNlUY
cXxMGtIGQb+w2EZmjbKzOm5dHBHKKZNCRkY2NEtk47XyyY7Th+Gpwo8CAwEAAQ==
-----END PUBLIC KEY-----
";

pub const MODULUS_HEX: &str = "B9C50821437C213510F930126FB86C6D7755C367365518717C4C1AD20641BFB0D846668DB2B33A6E5D1C11CA299342464636344B64E3B5F2C98ED387E1A9C28F";

const SIGNATURE_HEX: &str = "31bb93648a994d064f6f3ad68c853c4f110034bcd724dc77ded943642e096ae098d14ced98de3ab217c39c1c55c05ec953b4f045b3e49c7571e58d886e23e306";

/// 2019-03-08 11:44:07 IST, from the reference id.
pub const TIMESTAMP: u64 = 1_552_025_647;

const FIELDS: [&str; 17] = [
    "V2",
    "3",
    "269720190308114407437",
    "Sumit Kumar",
    "01-01-1984",
    "M",
    "C/O Ishwar Chand",
    "East Delhi",
    "",
    "B-31, 3rd Floor",
    "",
    "110051",
    "Krishna Nagar",
    "Delhi",
    "",
    "East Delhi",
    "Krishna Nagar",
];

pub fn config() -> PipelineConfig {
    PipelineConfig {
        issuer: "uidai".to_string(),
        key_bits: 512,
        max_message_bytes: 256,
        ..PipelineConfig::default()
    }
}

pub fn key_store() -> StaticKeyStore {
    StaticKeyStore::new().with_pem("uidai", ISSUER_PEM).unwrap()
}

pub fn signed_data() -> Vec<u8> {
    FIELDS
        .iter()
        .map(|field| field.as_bytes().to_vec())
        .collect::<Vec<_>>()
        .join(&DELIMITER)
}

pub fn signature_bytes() -> Vec<u8> {
    hex::decode(SIGNATURE_HEX).unwrap()
}

pub fn signature() -> BigUint {
    BigUint::from_bytes_be(&signature_bytes())
}

pub fn modulus() -> BigUint {
    BigUint::parse_bytes(MODULUS_HEX.as_bytes(), 16).unwrap()
}

/// Signed data followed by the signature, as carried in the QR code.
pub fn payload() -> Vec<u8> {
    let mut payload = signed_data();
    payload.extend_from_slice(&signature_bytes());
    payload
}

pub fn witness() -> Witness {
    WitnessExtractor::new(&config(), Arc::new(key_store()))
        .extract(&payload())
        .unwrap()
}

pub fn document() -> DocumentFields {
    DocumentFields::parse(&signed_data()).unwrap()
}
