//! Signal-bound verification.
//!
//! A proof is accepted for an action only if the pairing check passes and
//! the signal bound into the proof at generation time equals the signal the
//! verifying application expects (typically the transaction sender).
//! Replay protection across actions is the consumer's job: it records
//! accepted user nullifiers per scope, see [`crate::nullifier::NullifierRegistry`].

use ark_bn254::Fr;
use ark_ff::PrimeField;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::{decimal, PackedProof};

/// Errors that can occur while encoding signals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    #[error("invalid address {0:?}: expected 0x followed by 40 hex digits")]
    InvalidAddress(String),

    #[error("signal is not below the scalar field modulus")]
    OutOfField,
}

/// Modulus of the BN254 scalar field that public signals live in.
pub fn scalar_field_modulus() -> BigUint {
    Fr::MODULUS.into()
}

/// Application value a proof is bound to.
///
/// Canonical encoding of an EVM address is the big-endian 160-bit integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signal(#[serde(with = "decimal")] BigUint);

impl Signal {
    pub fn from_address(address: &str) -> Result<Self, SignalError> {
        let digits = address
            .strip_prefix("0x")
            .or_else(|| address.strip_prefix("0X"))
            .filter(|d| d.len() == 40)
            .ok_or_else(|| SignalError::InvalidAddress(address.to_string()))?;
        let bytes =
            hex::decode(digits).map_err(|_| SignalError::InvalidAddress(address.to_string()))?;
        Ok(Self(BigUint::from_bytes_be(&bytes)))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(BigUint::from(value))
    }

    /// Arbitrary integer signal; must fit the scalar field.
    pub fn from_biguint(value: BigUint) -> Result<Self, SignalError> {
        if value >= scalar_field_modulus() {
            return Err(SignalError::OutOfField);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> &BigUint {
        &self.0
    }

    pub fn to_field(&self) -> Fr {
        Fr::from(self.0.clone())
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public outputs of an identity proof.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSignals {
    #[serde(with = "decimal")]
    pub identity_nullifier: BigUint,
    #[serde(with = "decimal")]
    pub user_nullifier: BigUint,
    #[serde(with = "decimal")]
    pub timestamp: BigUint,
    #[serde(with = "decimal")]
    pub external_signal: BigUint,
}

impl PublicSignals {
    /// Every value is a reduced scalar field element.
    ///
    /// Values at or above the modulus reduce onto the same public input as a
    /// smaller one, so they would pass the pairing check while comparing
    /// unequal to the value a consumer has already recorded.
    pub fn is_canonical(&self) -> bool {
        let modulus = scalar_field_modulus();
        [
            &self.identity_nullifier,
            &self.user_nullifier,
            &self.timestamp,
            &self.external_signal,
        ]
        .iter()
        .all(|value| *value < &modulus)
    }

    /// Pairing-check public inputs:
    /// `[identity_nullifier, user_nullifier, timestamp, issuer_key_hash, signal]`.
    pub fn to_public_inputs(&self, issuer_key_hash: &BigUint) -> [Fr; 5] {
        [
            Fr::from(self.identity_nullifier.clone()),
            Fr::from(self.user_nullifier.clone()),
            Fr::from(self.timestamp.clone()),
            Fr::from(issuer_key_hash.clone()),
            Fr::from(self.external_signal.clone()),
        ]
    }

    /// Issuance time as unix seconds, if it fits.
    pub fn timestamp_secs(&self) -> Option<u64> {
        u64::try_from(&self.timestamp).ok()
    }
}

/// The external elliptic-curve verifier.
pub trait PairingCheck {
    fn check(&self, proof: &PackedProof, signals: &PublicSignals) -> bool;
}

impl<F> PairingCheck for F
where
    F: Fn(&PackedProof, &PublicSignals) -> bool,
{
    fn check(&self, proof: &PackedProof, signals: &PublicSignals) -> bool {
        self(proof, signals)
    }
}

/// Why a proof was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    ProofInvalid,
    SignalMismatch,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProofInvalid => write!(f, "proof does not verify"),
            Self::SignalMismatch => write!(f, "proof is bound to a different signal"),
        }
    }
}

/// Result of [`verify`]. Rejection is data, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationOutcome {
    Valid,
    Invalid(RejectReason),
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Valid => None,
            Self::Invalid(reason) => Some(*reason),
        }
    }
}

/// Pairing check, then signal binding. Non-canonical signals never reach
/// the pairing check.
pub fn verify(
    proof: &PackedProof,
    signals: &PublicSignals,
    app_signal: &Signal,
    pairing: &impl PairingCheck,
) -> VerificationOutcome {
    if !signals.is_canonical() || !pairing.check(proof, signals) {
        return VerificationOutcome::Invalid(RejectReason::ProofInvalid);
    }
    if &signals.external_signal != app_signal.value() {
        return VerificationOutcome::Invalid(RejectReason::SignalMismatch);
    }
    VerificationOutcome::Valid
}
