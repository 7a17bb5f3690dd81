//! Nullifier derivation and consumer-side replay bookkeeping.
//!
//! - identity nullifier: `Poseidon(seed)`, constant for a document holder
//! - user nullifier: `Poseidon(seed, scope)`, constant per holder and scope
//!
//! The seed hashes the stable demographic fields of the document, so a fresh
//! QR download for the same person yields the same nullifiers. The scope is
//! an application decision and is always supplied explicitly.

pub mod hash;
pub mod registry;

use ark_bn254::Fr;
use ark_ff::PrimeField;
use num_bigint::BigUint;

use crate::witness::DocumentFields;

pub use hash::PoseidonHasher;
pub use registry::NullifierRegistry;

/// Application-chosen scope that user nullifiers are derived under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullifierScope(Fr);

impl NullifierScope {
    /// Scope fixed to a numeric application id.
    pub fn from_app_id(app_id: u64) -> Self {
        Self(Fr::from(app_id))
    }

    /// Scope fixed to a textual label, e.g. a ballot name.
    pub fn from_label(label: &str) -> Self {
        Self(hash::bytes_to_field(label.as_bytes()))
    }

    /// Scope that rotates every `window_secs` seconds.
    ///
    /// `window_secs` must be non-zero.
    pub fn from_time_window(unix_secs: u64, window_secs: u64) -> Self {
        Self(Fr::from(unix_secs / window_secs.max(1)))
    }

    pub fn to_field(&self) -> Fr {
        self.0
    }
}

/// Field-encoded identity of the document holder.
pub fn identity_seed(doc: &DocumentFields) -> Fr {
    let mut preimage = Vec::new();
    for field in [
        &doc.last_four_digits,
        &doc.name,
        &doc.date_of_birth,
        &doc.gender,
    ] {
        preimage.extend_from_slice(field.as_bytes());
        preimage.push(crate::witness::document::DELIMITER);
    }
    hash::bytes_to_field(&preimage)
}

pub fn identity_nullifier(hasher: &PoseidonHasher, seed: &Fr) -> Fr {
    hasher.hash_one(seed)
}

pub fn user_nullifier(hasher: &PoseidonHasher, seed: &Fr, scope: &NullifierScope) -> Fr {
    hasher.hash_two(seed, &scope.to_field())
}

/// Poseidon hash of the issuer modulus words, as committed by the circuit.
pub fn issuer_key_hash(hasher: &PoseidonHasher, modulus_words: &[BigUint]) -> Fr {
    let elements: Vec<Fr> = modulus_words
        .iter()
        .map(|word| Fr::from_le_bytes_mod_order(&word.to_bytes_le()))
        .collect();
    hasher.hash_many(&elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_nullifiers_are_deterministic() {
        let hasher = PoseidonHasher::new();
        let doc = fixtures::document();
        let scope = NullifierScope::from_label("ballot-1");

        let seed = identity_seed(&doc);
        assert_eq!(seed, identity_seed(&fixtures::document()));
        assert_eq!(
            user_nullifier(&hasher, &seed, &scope),
            user_nullifier(&hasher, &identity_seed(&fixtures::document()), &scope)
        );
    }

    #[test]
    fn test_scope_changes_user_nullifier_only() {
        let hasher = PoseidonHasher::new();
        let seed = identity_seed(&fixtures::document());
        let a = NullifierScope::from_label("ballot-1");
        let b = NullifierScope::from_label("ballot-2");

        assert_ne!(
            user_nullifier(&hasher, &seed, &a),
            user_nullifier(&hasher, &seed, &b)
        );
        assert_ne!(identity_nullifier(&hasher, &seed), user_nullifier(&hasher, &seed, &a));
    }

    #[test]
    fn test_reissued_document_keeps_seed() {
        let mut reissued = fixtures::document();
        reissued.reference_id = "269720240101090000000".into();
        reissued.timestamp += 86_400;
        assert_eq!(identity_seed(&reissued), identity_seed(&fixtures::document()));

        let mut other = fixtures::document();
        other.date_of_birth = "02-01-1984".into();
        assert_ne!(identity_seed(&other), identity_seed(&fixtures::document()));
    }

    #[test]
    fn test_time_window_scope() {
        let hour = 3600;
        assert_eq!(
            NullifierScope::from_time_window(7200, hour),
            NullifierScope::from_time_window(7200 + 3599, hour)
        );
        assert_ne!(
            NullifierScope::from_time_window(7200, hour),
            NullifierScope::from_time_window(10800, hour)
        );
    }
}
