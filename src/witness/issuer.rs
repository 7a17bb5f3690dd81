//! Issuer public keys.

use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use std::collections::HashMap;

use super::{WitnessError, WitnessResult};

/// Source of issuer RSA moduli, keyed by issuer id.
pub trait IssuerKeySource: Send + Sync {
    /// Big-endian modulus bytes for `issuer`.
    ///
    /// Unknown issuers fail with [`WitnessError::UnsupportedIssuer`].
    fn modulus(&self, issuer: &str) -> WitnessResult<Vec<u8>>;
}

/// In-memory issuer key store, populated once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyStore {
    moduli: HashMap<String, Vec<u8>>,
}

impl StaticKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw big-endian modulus.
    pub fn insert_modulus(&mut self, issuer: impl Into<String>, modulus: Vec<u8>) {
        let start = modulus.iter().position(|&b| b != 0).unwrap_or(modulus.len());
        self.moduli.insert(issuer.into(), modulus[start..].to_vec());
    }

    /// Register a PEM public key, either SPKI (`BEGIN PUBLIC KEY`) or
    /// PKCS#1 (`BEGIN RSA PUBLIC KEY`).
    pub fn insert_pem(&mut self, issuer: impl Into<String>, pem: &str) -> WitnessResult<()> {
        let key = parse_public_key_pem(pem)?;
        self.insert_modulus(issuer, key.n().to_bytes_be());
        Ok(())
    }

    pub fn with_pem(mut self, issuer: impl Into<String>, pem: &str) -> WitnessResult<Self> {
        self.insert_pem(issuer, pem)?;
        Ok(self)
    }

    pub fn issuers(&self) -> impl Iterator<Item = &str> {
        self.moduli.keys().map(String::as_str)
    }
}

impl IssuerKeySource for StaticKeyStore {
    fn modulus(&self, issuer: &str) -> WitnessResult<Vec<u8>> {
        self.moduli
            .get(issuer)
            .cloned()
            .ok_or_else(|| WitnessError::UnsupportedIssuer(issuer.to_string()))
    }
}

/// Parse an RSA public key from SPKI or PKCS#1 PEM.
pub fn parse_public_key_pem(pem: &str) -> WitnessResult<RsaPublicKey> {
    let pem = pem.trim();
    let parsed = if pem.starts_with("-----BEGIN RSA PUBLIC KEY-----") {
        RsaPublicKey::from_pkcs1_pem(pem).map_err(|e| e.to_string())
    } else {
        RsaPublicKey::from_public_key_pem(pem).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| WitnessError::Malformed(format!("invalid issuer public key: {}", e)))
}
