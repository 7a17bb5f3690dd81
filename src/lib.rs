//! Anon Aadhaar - prove you hold a government-signed identity QR without
//! revealing it
//!
//! The pipeline turns the signed QR payload into a zero-knowledge proof
//! bound to an application signal (typically the sender address):
//!
//! 1. [`witness`] pulls the signed message, RSA signature and issuer modulus
//!    out of the payload
//! 2. [`args`] splits them into circuit words with [`words`]
//! 3. a [`prover::ProvingEngine`] produces a Groth16 proof and public signals
//! 4. [`codec`] packs the proof into 8 calldata elements
//! 5. [`protocol::verify`] checks the pairing and the signal binding
//!
//! Consumers keep replay state themselves: see [`nullifier`] and the [`vote`]
//! application. [`session::ProofSession`] drives generation without blocking
//! the caller.

pub mod args;
pub mod circuit;
pub mod codec;
pub mod config;
pub mod logging;
pub mod nullifier;
pub mod protocol;
pub mod prover;
pub mod session;
pub mod verifier;
pub mod vote;
pub mod witness;
pub mod words;

// WASM bindings (only compiled when wasm feature is enabled)
#[cfg(feature = "wasm")]
pub mod wasm;

#[cfg(test)]
mod fixtures;

// Re-export main types
pub use args::{ArgumentBuilder, ArgumentRecord, ArgumentSchema};
pub use codec::{Groth16Proof, PackedProof};
pub use config::PipelineConfig;
pub use nullifier::{NullifierRegistry, NullifierScope};
pub use protocol::{PublicSignals, Signal, VerificationOutcome};
pub use prover::{IdentityProver, ProvingEngine};
pub use session::{Pipeline, ProofSession, SessionState};
pub use verifier::IdentityVerifier;
pub use witness::{Witness, WitnessExtractor};
