//! Witness extraction from signed identity documents.
//!
//! Raw input is the decompressed QR payload: the signed data followed by a
//! detached RSA signature of exactly the issuer key size. Extraction is a
//! pure transformation and performs no I/O; the issuer modulus comes from an
//! [`IssuerKeySource`].

pub mod document;
pub mod issuer;
pub mod padding;

use num_bigint::BigUint;
use rsa::{BigUint as RsaBigUint, Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::config::PipelineConfig;

pub use document::DocumentFields;
pub use issuer::{IssuerKeySource, StaticKeyStore};

/// Result type for witness extraction.
pub type WitnessResult<T> = Result<T, WitnessError>;

/// Errors that can occur during witness extraction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WitnessError {
    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Signed message of {len} bytes exceeds circuit capacity of {max} bytes")]
    MessageTooLong { len: usize, max: usize },

    #[error("Signature size error: {0}")]
    SignatureSize(String),

    #[error("Unsupported signing scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Unsupported issuer: {0}")]
    UnsupportedIssuer(String),

    #[error("Signature does not verify under the issuer key")]
    InvalidSignature,
}

/// Private inputs for one proof attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    /// SHA-256 padded message, zero-filled to the circuit capacity. One byte per word.
    pub padded_message: Vec<u8>,
    /// Bit length of the unpadded signed message.
    pub message_length: usize,
    /// Signature as a big-endian integer, strictly below `modulus`.
    pub signature: BigUint,
    /// Issuer RSA modulus.
    pub modulus: BigUint,
}

impl Witness {
    /// The unpadded signed message, or `None` if `message_length` runs past
    /// the padded buffer.
    pub fn message(&self) -> Option<&[u8]> {
        self.padded_message.get(..self.message_length / 8)
    }
}

/// Turns raw signed-document bytes into a [`Witness`].
#[derive(Clone)]
pub struct WitnessExtractor {
    keys: Arc<dyn IssuerKeySource>,
    issuer: String,
    scheme_version: String,
    key_bytes: usize,
    max_message_bytes: usize,
    verify_signature: bool,
}

impl WitnessExtractor {
    pub fn new(config: &PipelineConfig, keys: Arc<dyn IssuerKeySource>) -> Self {
        Self {
            keys,
            issuer: config.issuer.clone(),
            scheme_version: config.scheme_version.clone(),
            key_bytes: config.key_bits / 8,
            max_message_bytes: config.max_message_bytes,
            verify_signature: config.verify_signature,
        }
    }

    /// Split the payload, resolve the issuer key, and pad the message.
    pub fn extract(&self, raw: &[u8]) -> WitnessResult<Witness> {
        if raw.len() <= self.key_bytes {
            return Err(WitnessError::Malformed(format!(
                "payload of {} bytes is too short to hold a {}-byte signature",
                raw.len(),
                self.key_bytes
            )));
        }
        let (signed_data, signature_bytes) = raw.split_at(raw.len() - self.key_bytes);

        let version = document::version_tag(signed_data)?;
        if version != self.scheme_version.as_bytes() {
            return Err(WitnessError::UnsupportedScheme(format!(
                "document version {:?}, expected {:?}",
                String::from_utf8_lossy(version),
                self.scheme_version
            )));
        }
        document::DocumentFields::parse(signed_data)?;

        let modulus_bytes = self.keys.modulus(&self.issuer)?;
        if modulus_bytes.len() != self.key_bytes {
            return Err(WitnessError::SignatureSize(format!(
                "issuer modulus is {} bytes, expected {}",
                modulus_bytes.len(),
                self.key_bytes
            )));
        }

        let signature = BigUint::from_bytes_be(signature_bytes);
        let modulus = BigUint::from_bytes_be(&modulus_bytes);
        if signature >= modulus {
            return Err(WitnessError::SignatureSize(
                "signature is not below the issuer modulus".into(),
            ));
        }

        if self.verify_signature {
            check_signature(signed_data, signature_bytes, &modulus_bytes)?;
        }

        let padded_message = padding::sha256_pad(signed_data, self.max_message_bytes).ok_or(
            WitnessError::MessageTooLong {
                len: signed_data.len(),
                max: self.max_message_bytes,
            },
        )?;

        tracing::debug!(
            message_bytes = signed_data.len(),
            padded_bytes = padded_message.len(),
            issuer = %self.issuer,
            "extracted witness"
        );

        Ok(Witness {
            padded_message,
            message_length: signed_data.len() * 8,
            signature,
            modulus,
        })
    }
}

/// Verify PKCS#1 v1.5 / SHA-256 off-circuit.
fn check_signature(signed_data: &[u8], signature: &[u8], modulus: &[u8]) -> WitnessResult<()> {
    const PUBLIC_EXPONENT: u32 = 65537;

    let key = RsaPublicKey::new(
        RsaBigUint::from_bytes_be(modulus),
        RsaBigUint::from(PUBLIC_EXPONENT),
    )
    .map_err(|e| WitnessError::UnsupportedScheme(format!("unusable issuer key: {}", e)))?;

    let digest = Sha256::digest(signed_data);
    key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .map_err(|_| WitnessError::InvalidSignature)
}
