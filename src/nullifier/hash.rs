//! Poseidon hash over the BN254 scalar field.
//!
//! The same configuration is used off-circuit (nullifier derivation, issuer
//! key hash) and in-circuit, so both sides agree bit for bit.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    poseidon::{PoseidonConfig, PoseidonSponge},
    CryptographicSponge,
};
use ark_ff::{Field, PrimeField};
use ark_std::vec::Vec;
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// Poseidon hasher configured for BN254 scalar field.
#[derive(Clone)]
pub struct PoseidonHasher {
    config: PoseidonConfig<Fr>,
}

impl PoseidonHasher {
    pub fn new() -> Self {
        Self {
            config: Self::default_config(),
        }
    }

    /// Width-3 Poseidon: 8 full rounds, 57 partial rounds, x^5 S-box.
    fn default_config() -> PoseidonConfig<Fr> {
        let full_rounds = 8;
        let partial_rounds = 57;
        let alpha = 5;
        let rate = 2;
        let capacity = 1;

        let (ark, mds) = Self::generate_parameters(rate + capacity, full_rounds, partial_rounds);

        PoseidonConfig {
            full_rounds: full_rounds as usize,
            partial_rounds: partial_rounds as usize,
            alpha: alpha as u64,
            ark,
            mds,
            rate,
            capacity,
        }
    }

    /// Round constants and a Cauchy MDS matrix.
    fn generate_parameters(
        width: usize,
        full_rounds: u32,
        partial_rounds: u32,
    ) -> (Vec<Vec<Fr>>, Vec<Vec<Fr>>) {
        let total_rounds = (full_rounds + partial_rounds) as usize;

        let ark = (0..total_rounds)
            .map(|r| {
                (0..width)
                    .map(|i| Fr::from(((r * width + i) as u64).wrapping_mul(0x9e3779b97f4a7c15)))
                    .collect()
            })
            .collect();

        let mds = (0..width)
            .map(|i| {
                (0..width)
                    .map(|j| {
                        let x = Fr::from((i + 1) as u64);
                        let y = Fr::from((width + j + 1) as u64);
                        (x + y).inverse().unwrap_or(Fr::from(1u64))
                    })
                    .collect()
            })
            .collect();

        (ark, mds)
    }

    /// Hash a single field element.
    pub fn hash_one(&self, value: &Fr) -> Fr {
        self.hash_many(std::slice::from_ref(value))
    }

    pub fn hash_two(&self, left: &Fr, right: &Fr) -> Fr {
        self.hash_many(&[*left, *right])
    }

    /// Absorb elements in order and squeeze one.
    pub fn hash_many(&self, elements: &[Fr]) -> Fr {
        let mut sponge = PoseidonSponge::new(&self.config);
        for elem in elements {
            sponge.absorb(elem);
        }
        sponge.squeeze_field_elements(1)[0]
    }

    pub fn config(&self) -> &PoseidonConfig<Fr> {
        &self.config
    }
}

impl Default for PoseidonHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 of `bytes`, reduced into the scalar field.
pub fn bytes_to_field(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(&Sha256::digest(bytes))
}

/// Field element as an unsigned integer.
pub fn field_to_biguint(value: &Fr) -> BigUint {
    (*value).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let hasher = PoseidonHasher::new();
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);
        assert_eq!(hasher.hash_two(&a, &b), hasher.hash_two(&a, &b));
        assert_ne!(hasher.hash_two(&a, &b), hasher.hash_two(&b, &a));
    }

    #[test]
    fn test_hash_many_matches_hash_two() {
        let hasher = PoseidonHasher::new();
        let a = Fr::from(11u64);
        let b = Fr::from(12u64);
        assert_eq!(hasher.hash_many(&[a, b]), hasher.hash_two(&a, &b));
        assert_eq!(hasher.hash_one(&a), hasher.hash_many(&[a]));
    }

    #[test]
    fn test_bytes_to_field() {
        assert_eq!(bytes_to_field(b"uidai"), bytes_to_field(b"uidai"));
        assert_ne!(bytes_to_field(b"uidai"), bytes_to_field(b"UIDAI"));
    }
}
