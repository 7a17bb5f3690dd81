//! Groth16 pairing check for identity proofs.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use num_bigint::BigUint;
use std::path::Path;

use crate::codec::{self, PackedProof};
use crate::protocol::{PairingCheck, PublicSignals};

/// Result type for verifier operations.
pub type VerifierResult<T> = Result<T, VerifierError>;

/// Errors that can occur while setting up a verifier.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("Invalid verifying key: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Verifier pinned to one issuer key, like the on-chain contract that
/// stores the issuer public-key hash at deployment.
pub struct IdentityVerifier {
    /// Prepared verifying key for fast verification.
    prepared_vk: PreparedVerifyingKey<Bn254>,
    /// Original verifying key (for serialization).
    verifying_key: VerifyingKey<Bn254>,
    issuer_key_hash: BigUint,
}

impl IdentityVerifier {
    pub fn new(vk: VerifyingKey<Bn254>, issuer_key_hash: BigUint) -> VerifierResult<Self> {
        let prepared_vk = Groth16::<Bn254>::process_vk(&vk)
            .map_err(|e| VerifierError::InvalidKey(e.to_string()))?;
        Ok(Self {
            prepared_vk,
            verifying_key: vk,
            issuer_key_hash,
        })
    }

    pub fn issuer_key_hash(&self) -> &BigUint {
        &self.issuer_key_hash
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.verifying_key
    }

    /// Run the pairing check. Any decoding failure counts as invalid, and so
    /// does a signal at or above the scalar field modulus.
    pub fn verify(&self, packed: &PackedProof, signals: &PublicSignals) -> bool {
        if !signals.is_canonical() {
            tracing::debug!("public signals are not reduced field elements");
            return false;
        }

        let proof = match ark_groth16::Proof::<Bn254>::try_from(&codec::unpack(packed)) {
            Ok(proof) => proof,
            Err(e) => {
                tracing::debug!(error = %e, "packed proof does not decode to curve points");
                return false;
            }
        };

        let inputs: [Fr; 5] = signals.to_public_inputs(&self.issuer_key_hash);
        Groth16::<Bn254>::verify_with_processed_vk(&self.prepared_vk, &inputs, &proof)
            .unwrap_or(false)
    }

    /// Save verifying key and issuer key hash to file.
    pub fn save(&self, path: &Path) -> VerifierResult<()> {
        let hash = self.issuer_key_hash.to_bytes_be();
        let mut bytes = (hash.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&hash);
        self.verifying_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| VerifierError::SerializationError(e.to_string()))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load verifier from file.
    pub fn load(path: &Path) -> VerifierResult<Self> {
        let bytes = std::fs::read(path)?;
        let truncated = || VerifierError::SerializationError("verifier file is truncated".into());

        let len_bytes: [u8; 4] = bytes
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(truncated)?;
        let hash_end = 4 + u32::from_le_bytes(len_bytes) as usize;
        let hash = bytes.get(4..hash_end).ok_or_else(truncated)?;

        let vk = VerifyingKey::deserialize_compressed(&bytes[hash_end..])
            .map_err(|e| VerifierError::SerializationError(e.to_string()))?;
        Self::new(vk, BigUint::from_bytes_be(hash))
    }
}

impl PairingCheck for IdentityVerifier {
    fn check(&self, proof: &PackedProof, signals: &PublicSignals) -> bool {
        self.verify(proof, signals)
    }
}
