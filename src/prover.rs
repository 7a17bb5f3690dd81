//! Proving engines.
//!
//! [`ProvingEngine`] is the capability the pipeline drives: given the circuit
//! arguments and the signal to bind, return a proof and its public outputs.
//! [`IdentityProver`] implements it with Groth16 on BN254 over
//! [`IdentityCircuit`].

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{rngs::StdRng, SeedableRng};
use num_bigint::BigUint;
use num_traits::Zero;
use std::path::Path;
use std::time::Instant;

use crate::args::{self, ArgumentError, ArgumentRecord};
use crate::circuit::{IdentityCircuit, IdentityInputs};
use crate::codec::{base_field_modulus, CodecError, Groth16Proof};
use crate::nullifier::{self, hash::field_to_biguint, NullifierScope};
use crate::protocol::{PublicSignals, Signal};
use crate::witness::{DocumentFields, WitnessError};

/// Result type for prover operations.
pub type ProverResult<T> = Result<T, ProvingError>;

/// Errors that can occur during proving.
#[derive(Debug, thiserror::Error)]
pub enum ProvingError {
    #[error("Trusted setup failed: {0}")]
    SetupFailed(String),

    #[error("Proof generation failed: {0}")]
    ProofGenerationFailed(String),

    #[error("Invalid circuit arguments: {0}")]
    InvalidArguments(#[from] ArgumentError),

    #[error("Signed message unreadable: {0}")]
    Document(#[from] WitnessError),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Proof plus everything a verifier needs alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProverOutput {
    pub proof: Groth16Proof,
    pub public_signals: PublicSignals,
    /// Poseidon hash of the issuer modulus the proof was made against.
    pub issuer_key_hash: BigUint,
}

/// The proving capability. Circuit resources are loaded out-of-band.
pub trait ProvingEngine: Send + Sync {
    fn prove(&self, args: &ArgumentRecord, signal: &Signal) -> ProverResult<ProverOutput>;
}

/// Groth16 prover for [`IdentityCircuit`].
pub struct IdentityProver {
    proving_key: ProvingKey<Bn254>,
    scope: NullifierScope,
    word_count: usize,
}

impl IdentityProver {
    /// Perform trusted setup for a scope and modulus word count.
    ///
    /// Uses a deterministic RNG: development and tests only. Production keys
    /// come from a ceremony and are loaded with [`IdentityProver::load_proving_key`].
    pub fn setup(
        scope: NullifierScope,
        word_count: usize,
    ) -> ProverResult<(Self, VerifyingKey<Bn254>)> {
        let circuit = IdentityCircuit::new_empty(&scope, word_count);
        let mut rng = StdRng::seed_from_u64(0x414e4f4e5f41414e); // "ANON_AAN"

        let started = Instant::now();
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, &mut rng)
            .map_err(|e| ProvingError::SetupFailed(e.to_string()))?;
        tracing::info!(
            word_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "identity circuit setup complete"
        );

        Ok((
            Self {
                proving_key: pk,
                scope,
                word_count,
            },
            vk,
        ))
    }

    pub fn scope(&self) -> &NullifierScope {
        &self.scope
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.proving_key.vk
    }

    /// Read the circuit inputs out of an argument record.
    fn inputs(&self, record: &ArgumentRecord, signal: &Signal) -> ProverResult<IdentityInputs> {
        let modulus = record.array(args::MODULUS)?;
        if modulus.len() != self.word_count {
            return Err(ArgumentError::Cardinality {
                slot: args::MODULUS,
                expected: self.word_count,
                actual: modulus.len(),
            }
            .into());
        }

        let message = signed_message(record)?;
        let document = DocumentFields::parse(&message)?;

        Ok(IdentityInputs {
            seed: nullifier::identity_seed(&document),
            modulus_words: modulus.iter().map(|w| Fr::from(w.clone())).collect(),
            timestamp: Fr::from(document.timestamp),
            signal: signal.to_field(),
        })
    }

    /// Save proving key to file, prefixed with the word count.
    pub fn save_proving_key(&self, path: &Path) -> ProverResult<()> {
        let mut bytes = (self.word_count as u32).to_le_bytes().to_vec();
        self.proving_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| ProvingError::SerializationError(e.to_string()))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a proving key produced for `scope`.
    pub fn load_proving_key(path: &Path, scope: NullifierScope) -> ProverResult<Self> {
        let bytes = std::fs::read(path)?;
        if bytes.len() < 4 {
            return Err(ProvingError::SerializationError(
                "proving key file is truncated".into(),
            ));
        }

        let word_count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let pk = ProvingKey::deserialize_compressed(&bytes[4..])
            .map_err(|e| ProvingError::SerializationError(e.to_string()))?;

        Ok(Self {
            proving_key: pk,
            scope,
            word_count,
        })
    }
}

impl ProvingEngine for IdentityProver {
    fn prove(&self, record: &ArgumentRecord, signal: &Signal) -> ProverResult<ProverOutput> {
        let inputs = self.inputs(record, signal)?;
        let circuit = IdentityCircuit::new_with_witness(&self.scope, &inputs);
        let [identity_nullifier, user_nullifier, timestamp, issuer_key_hash, external_signal] =
            circuit.public_inputs().ok_or_else(|| {
                ProvingError::ProofGenerationFailed("circuit has no public inputs".into())
            })?;

        let started = Instant::now();
        let mut rng = StdRng::from_entropy();
        let proof = Groth16::<Bn254>::prove(&self.proving_key, circuit, &mut rng)
            .map_err(|e| ProvingError::ProofGenerationFailed(e.to_string()))?;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "identity proof generated"
        );

        Ok(ProverOutput {
            proof: proof.into(),
            public_signals: PublicSignals {
                identity_nullifier: field_to_biguint(&identity_nullifier),
                user_nullifier: field_to_biguint(&user_nullifier),
                timestamp: field_to_biguint(&timestamp),
                external_signal: field_to_biguint(&external_signal),
            },
            issuer_key_hash: field_to_biguint(&issuer_key_hash),
        })
    }
}

/// Recover the unpadded signed message from the argument slots.
fn signed_message(record: &ArgumentRecord) -> ProverResult<Vec<u8>> {
    let padded = record.array(args::PADDED_MESSAGE)?;
    let bit_len = record.number(args::MESSAGE_LEN)?;
    let byte_len = usize::try_from(bit_len / 8u32)
        .ok()
        .filter(|&len| len <= padded.len())
        .ok_or_else(|| {
            ProvingError::ProofGenerationFailed(format!(
                "message length {} exceeds padded message",
                bit_len
            ))
        })?;

    padded[..byte_len]
        .iter()
        .map(|word| {
            u8::try_from(word).map_err(|_| {
                ProvingError::ProofGenerationFailed("padded message word is not a byte".into())
            })
        })
        .collect()
}

impl From<ark_groth16::Proof<Bn254>> for Groth16Proof {
    fn from(proof: ark_groth16::Proof<Bn254>) -> Self {
        let g1 = |p: &G1Affine| -> [BigUint; 2] {
            match p.xy() {
                Some((x, y)) => [(*x).into(), (*y).into()],
                None => [BigUint::zero(), BigUint::zero()],
            }
        };
        let fq2 = |v: &Fq2| -> [BigUint; 2] { [v.c0.into(), v.c1.into()] };
        let b = match proof.b.xy() {
            Some((x, y)) => [fq2(x), fq2(y)],
            None => [
                [BigUint::zero(), BigUint::zero()],
                [BigUint::zero(), BigUint::zero()],
            ],
        };

        Self {
            a: g1(&proof.a),
            b,
            c: g1(&proof.c),
        }
    }
}

impl TryFrom<&Groth16Proof> for ark_groth16::Proof<Bn254> {
    type Error = CodecError;

    /// Rebuild curve points, rejecting coordinates off the curve or outside
    /// the prime-order subgroup. `(0, 0)` encodes the point at infinity.
    fn try_from(proof: &Groth16Proof) -> Result<Self, Self::Error> {
        let modulus = base_field_modulus();
        let fq = |v: &BigUint| -> Result<Fq, CodecError> {
            if v >= &modulus {
                return Err(CodecError::Encoding("coordinate exceeds base field".into()));
            }
            Ok(Fq::from(v.clone()))
        };

        let g1 = |coords: &[BigUint; 2], label: &str| -> Result<G1Affine, CodecError> {
            if coords.iter().all(Zero::is_zero) {
                return Ok(G1Affine::identity());
            }
            let point = G1Affine::new_unchecked(fq(&coords[0])?, fq(&coords[1])?);
            if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
                return Err(CodecError::Encoding(format!("{} is not a valid G1 point", label)));
            }
            Ok(point)
        };

        let b = if proof.b.iter().flatten().all(Zero::is_zero) {
            G2Affine::identity()
        } else {
            let x = Fq2::new(fq(&proof.b[0][0])?, fq(&proof.b[0][1])?);
            let y = Fq2::new(fq(&proof.b[1][0])?, fq(&proof.b[1][1])?);
            let point = G2Affine::new_unchecked(x, y);
            if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
                return Err(CodecError::Encoding("B is not a valid G2 point".into()));
            }
            point
        };

        Ok(Self {
            a: g1(&proof.a, "A")?,
            b,
            c: g1(&proof.c, "C")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{ArgumentBuilder, ArgumentSchema};
    use crate::fixtures;
    use crate::protocol::Signal;

    fn record() -> ArgumentRecord {
        ArgumentBuilder::new(ArgumentSchema::standard(&fixtures::config()))
            .build(&fixtures::witness())
            .unwrap()
    }

    #[test]
    fn test_signed_message_recovered() {
        assert_eq!(signed_message(&record()).unwrap(), fixtures::signed_data());
    }

    #[test]
    fn test_setup_and_prove() {
        let scope = NullifierScope::from_label("prover-test");
        let (prover, vk) = IdentityProver::setup(scope, 8).unwrap();
        let signal = Signal::from_u64(40);

        let output = prover.prove(&record(), &signal).unwrap();
        assert_eq!(output.public_signals.external_signal, BigUint::from(40u32));
        assert_eq!(output.public_signals.timestamp, BigUint::from(fixtures::TIMESTAMP));

        let proof = ark_groth16::Proof::<Bn254>::try_from(&output.proof).unwrap();
        let pvk = Groth16::<Bn254>::process_vk(&vk).unwrap();
        let inputs = output
            .public_signals
            .to_public_inputs(&output.issuer_key_hash);
        assert!(Groth16::<Bn254>::verify_with_processed_vk(&pvk, &inputs, &proof).unwrap());
    }

    #[test]
    fn test_word_count_mismatch() {
        let (prover, _vk) = IdentityProver::setup(NullifierScope::from_app_id(1), 4).unwrap();
        let result = prover.prove(&record(), &Signal::from_u64(1));
        assert!(matches!(
            result,
            Err(ProvingError::InvalidArguments(ArgumentError::Cardinality { .. }))
        ));
    }

    #[test]
    fn test_off_curve_point_rejected() {
        let proof = Groth16Proof {
            a: [BigUint::from(1u32), BigUint::from(3u32)],
            b: [
                [BigUint::zero(), BigUint::zero()],
                [BigUint::zero(), BigUint::zero()],
            ],
            c: [BigUint::zero(), BigUint::zero()],
        };
        // (1, 2) is the G1 generator; (1, 3) is not on the curve
        assert!(ark_groth16::Proof::<Bn254>::try_from(&proof).is_err());

        let mut on_curve = proof;
        on_curve.a[1] = BigUint::from(2u32);
        assert!(ark_groth16::Proof::<Bn254>::try_from(&on_curve).is_ok());
    }

    #[test]
    fn test_proving_key_save_load() {
        let scope = NullifierScope::from_app_id(9);
        let (prover, _vk) = IdentityProver::setup(scope, 8).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.pk");
        prover.save_proving_key(&path).unwrap();

        let loaded = IdentityProver::load_proving_key(&path, scope).unwrap();
        assert_eq!(loaded.word_count(), 8);
        assert_eq!(loaded.verifying_key(), prover.verifying_key());
    }
}
