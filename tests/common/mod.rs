//! Test document signed with a 512-bit test issuer key.

#![allow(dead_code)]

use anon_aadhaar::config::PipelineConfig;
use anon_aadhaar::witness::StaticKeyStore;

pub const ISSUER_PEM: &str = "-----BEGIN PUBLIC KEY-----
MFwwDQYJKoZIhvcNAQEBBQADSwAwSAJBALnFCCFDfCE1EPkwEm+4bG13VcNnNlUY
cXxMGtIGQb+w2EZmjbKzOm5dHBHKKZNCRkY2NEtk47XyyY7Th+Gpwo8CAwEAAQ==
-----END PUBLIC KEY-----
";

const SIGNATURE_HEX: &str = "31bb93648a994d064f6f3ad68c853c4f110034bcd724dc77ded943642e096ae098d14ced98de3ab217c39c1c55c05ec953b4f045b3e49c7571e58d886e23e306";

pub const TIMESTAMP: u64 = 1_552_025_647;

pub const ADDRESS_A: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const ADDRESS_B: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

pub fn config() -> PipelineConfig {
    PipelineConfig {
        key_bits: 512,
        max_message_bytes: 256,
        verify_signature: true,
        ..PipelineConfig::default()
    }
}

pub fn key_store() -> StaticKeyStore {
    StaticKeyStore::new().with_pem("uidai", ISSUER_PEM).unwrap()
}

pub fn payload() -> Vec<u8> {
    let fields = [
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
    let mut payload = fields
        .iter()
        .map(|f| f.as_bytes().to_vec())
        .collect::<Vec<_>>()
        .join(&0xFFu8);
    payload.extend_from_slice(&hex::decode(SIGNATURE_HEX).unwrap());
    payload
}
