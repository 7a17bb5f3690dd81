//! Identity binding circuit.
//!
//! Public inputs, in allocation order:
//! - identity_nullifier: Poseidon(seed)
//! - user_nullifier: Poseidon(seed, scope)
//! - timestamp: issuance time of the document
//! - issuer_key_hash: Poseidon(modulus words)
//! - signal: application value the proof is bound to
//!
//! Private witnesses:
//! - seed: field hash of the holder's stable document fields
//! - modulus words: the issuer RSA modulus in circuit words
//!
//! The scope is a circuit constant, so a proving key only ever yields user
//! nullifiers for the scope it was set up with. RSA verification of the
//! document is not part of this circuit.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    constraints::CryptographicSpongeVar,
    poseidon::{constraints::PoseidonSpongeVar, PoseidonConfig},
};
use ark_r1cs_std::{alloc::AllocVar, eq::EqGadget, fields::fp::FpVar, fields::FieldVar};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::nullifier::{self, NullifierScope, PoseidonHasher};

/// Number of public inputs the circuit exposes.
pub const NUM_PUBLIC_INPUTS: usize = 5;

/// Values a prover knows about one document.
#[derive(Clone, Debug)]
pub struct IdentityInputs {
    pub seed: Fr,
    pub modulus_words: Vec<Fr>,
    pub timestamp: Fr,
    pub signal: Fr,
}

#[derive(Clone)]
pub struct IdentityCircuit {
    pub poseidon_config: PoseidonConfig<Fr>,
    /// Constant: nullifier scope baked into the proving key.
    pub scope: Fr,

    /// Private: identity seed
    pub seed: Option<Fr>,
    /// Private: issuer modulus words
    pub modulus_words: Vec<Option<Fr>>,

    /// Public outputs
    pub identity_nullifier: Option<Fr>,
    pub user_nullifier: Option<Fr>,
    pub timestamp: Option<Fr>,
    pub issuer_key_hash: Option<Fr>,
    pub signal: Option<Fr>,
}

impl IdentityCircuit {
    /// Circuit with dummy values for trusted setup.
    pub fn new_empty(scope: &NullifierScope, word_count: usize) -> Self {
        let inputs = IdentityInputs {
            seed: Fr::from(1u64),
            modulus_words: vec![Fr::from(0u64); word_count],
            timestamp: Fr::from(0u64),
            signal: Fr::from(0u64),
        };
        Self::new_with_witness(scope, &inputs)
    }

    /// Circuit with real witness values; public outputs are derived here.
    pub fn new_with_witness(scope: &NullifierScope, inputs: &IdentityInputs) -> Self {
        let hasher = PoseidonHasher::new();

        let identity_nullifier = nullifier::identity_nullifier(&hasher, &inputs.seed);
        let user_nullifier = nullifier::user_nullifier(&hasher, &inputs.seed, scope);
        let issuer_key_hash = hasher.hash_many(&inputs.modulus_words);

        Self {
            poseidon_config: hasher.config().clone(),
            scope: scope.to_field(),
            seed: Some(inputs.seed),
            modulus_words: inputs.modulus_words.iter().copied().map(Some).collect(),
            identity_nullifier: Some(identity_nullifier),
            user_nullifier: Some(user_nullifier),
            timestamp: Some(inputs.timestamp),
            issuer_key_hash: Some(issuer_key_hash),
            signal: Some(inputs.signal),
        }
    }

    /// Public inputs in verification order.
    pub fn public_inputs(&self) -> Option<[Fr; NUM_PUBLIC_INPUTS]> {
        Some([
            self.identity_nullifier?,
            self.user_nullifier?,
            self.timestamp?,
            self.issuer_key_hash?,
            self.signal?,
        ])
    }

    pub fn word_count(&self) -> usize {
        self.modulus_words.len()
    }
}

impl ConstraintSynthesizer<Fr> for IdentityCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Public inputs first, in verification order
        let identity_nullifier_var = FpVar::new_input(cs.clone(), || {
            self.identity_nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let user_nullifier_var = FpVar::new_input(cs.clone(), || {
            self.user_nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let timestamp_var = FpVar::new_input(cs.clone(), || {
            self.timestamp.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let issuer_key_hash_var = FpVar::new_input(cs.clone(), || {
            self.issuer_key_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let signal_var = FpVar::new_input(cs.clone(), || {
            self.signal.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let seed_var = FpVar::new_witness(cs.clone(), || {
            self.seed.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let word_vars = self
            .modulus_words
            .iter()
            .map(|word| {
                FpVar::new_witness(cs.clone(), || word.ok_or(SynthesisError::AssignmentMissing))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let scope_var = FpVar::constant(self.scope);

        let computed = poseidon_hash(cs.clone(), &self.poseidon_config, &[seed_var.clone()])?;
        computed.enforce_equal(&identity_nullifier_var)?;

        let computed = poseidon_hash(cs.clone(), &self.poseidon_config, &[seed_var, scope_var])?;
        computed.enforce_equal(&user_nullifier_var)?;

        let computed = poseidon_hash(cs, &self.poseidon_config, &word_vars)?;
        computed.enforce_equal(&issuer_key_hash_var)?;

        // Timestamp and signal take no part in the hashes; squaring them puts
        // each into a constraint so the proof commits to its value.
        let _ = timestamp_var.square()?;
        let _ = signal_var.square()?;

        Ok(())
    }
}

/// Poseidon over `elements` in-circuit, matching [`PoseidonHasher::hash_many`].
fn poseidon_hash(
    cs: ConstraintSystemRef<Fr>,
    config: &PoseidonConfig<Fr>,
    elements: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, config);
    for element in elements {
        sponge.absorb(element)?;
    }
    let output = sponge.squeeze_field_elements(1)?;
    Ok(output[0].clone())
}
