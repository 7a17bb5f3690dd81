//! WASM bindings for Anon Aadhaar
//!
//! Exposes argument building, proof packing and Groth16 proving/verification
//! to JavaScript via wasm-bindgen. Payloads cross the boundary as base64,
//! structured results as JSON strings.

use anyhow::{anyhow, Context};
use base64::{engine::general_purpose, Engine as _};
use num_bigint::BigUint;
use rsa::traits::PublicKeyParts;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use wasm_bindgen::prelude::*;

use crate::args::{ArgumentBuilder, ArgumentSchema};
use crate::codec::{self, decimal, Groth16Proof, PackedProof};
use crate::config::PipelineConfig;
use crate::nullifier::{self, hash::field_to_biguint, NullifierScope, PoseidonHasher};
use crate::protocol::{self, PublicSignals, Signal};
use crate::prover::{IdentityProver, ProvingEngine};
use crate::verifier::IdentityVerifier;
use crate::witness::{issuer::parse_public_key_pem, StaticKeyStore, WitnessExtractor};
use crate::words;

// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

// ============== PROVER STATE ==============

/// Prover and verifier for one issuer key and nullifier scope.
struct ProverState {
    config: PipelineConfig,
    keys: Arc<StaticKeyStore>,
    prover: IdentityProver,
    verifier: IdentityVerifier,
}

static PROVER: Mutex<Option<ProverState>> = Mutex::new(None);

/// JSON shape returned by [`prove_identity`].
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentityProofJson {
    packed_proof: PackedProof,
    public_signals: PublicSignals,
    #[serde(with = "decimal")]
    issuer_key_hash: BigUint,
}

fn to_js(e: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", e))
}

/// Pipeline settings and key store for a single issuer PEM.
fn issuer_pipeline(issuer_pem: &str) -> anyhow::Result<(PipelineConfig, StaticKeyStore)> {
    let key = parse_public_key_pem(issuer_pem)?;
    let config = PipelineConfig {
        key_bits: key.size() * 8,
        ..PipelineConfig::default()
    };
    config.validate()?;

    let mut keys = StaticKeyStore::new();
    keys.insert_modulus(config.issuer.clone(), key.n().to_bytes_be());
    Ok((config, keys))
}

fn parse_signal(signal: &str) -> anyhow::Result<Signal> {
    let signal = signal.trim();
    if signal.starts_with("0x") || signal.starts_with("0X") {
        return Ok(Signal::from_address(signal)?);
    }
    let value = BigUint::parse_bytes(signal.as_bytes(), 10)
        .ok_or_else(|| anyhow!("signal must be an address or a decimal integer"))?;
    Ok(Signal::from_biguint(value)?)
}

fn decode_payload(payload_b64: &str) -> anyhow::Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(payload_b64.trim())
        .context("payload is not valid base64")
}

// ============== ARGUMENTS & PACKING ==============

fn build_proof_args_inner(payload_b64: &str, issuer_pem: &str) -> anyhow::Result<String> {
    let payload = decode_payload(payload_b64)?;
    let (config, keys) = issuer_pipeline(issuer_pem)?;

    let witness = WitnessExtractor::new(&config, Arc::new(keys)).extract(&payload)?;
    let record = ArgumentBuilder::new(ArgumentSchema::standard(&config)).build(&witness)?;
    Ok(record.to_json()?)
}

/// Build circuit arguments from a base64 QR payload.
///
/// Returns the argument JSON expected by circom-style provers.
#[wasm_bindgen]
pub fn build_proof_args(payload_b64: &str, issuer_pem: &str) -> Result<String, JsValue> {
    build_proof_args_inner(payload_b64, issuer_pem).map_err(to_js)
}

fn pack_groth16_proof_inner(proof_json: &str) -> anyhow::Result<String> {
    let proof: Groth16Proof =
        serde_json::from_str(proof_json).context("not a snarkjs groth16 proof")?;
    Ok(serde_json::to_string(&codec::pack(&proof))?)
}

/// Pack a snarkjs `proof.json` into the 8-element calldata array.
#[wasm_bindgen]
pub fn pack_groth16_proof(proof_json: &str) -> Result<String, JsValue> {
    pack_groth16_proof_inner(proof_json).map_err(to_js)
}

// ============== PROVING ==============

fn init_prover_inner(issuer_pem: &str, scope_label: &str) -> anyhow::Result<()> {
    let (config, keys) = issuer_pipeline(issuer_pem)?;
    let scope = PipelineConfig {
        nullifier_scope: Some(scope_label.to_string()),
        ..config.clone()
    }
    .nullifier_scope()?;

    let modulus = BigUint::from_bytes_be(&parse_public_key_pem(issuer_pem)?.n().to_bytes_be());
    let modulus_words = words::split(&modulus, config.word_bits, config.word_count())?;
    let key_hash = nullifier::issuer_key_hash(&PoseidonHasher::new(), modulus_words.words());

    let (prover, vk) = IdentityProver::setup(scope, config.word_count())?;
    let verifier = IdentityVerifier::new(vk, field_to_biguint(&key_hash))?;
    let ready = ProverState {
        config,
        keys: Arc::new(keys),
        prover,
        verifier,
    };

    // setup runs unlocked; only the swap holds the lock
    *PROVER.lock().map_err(|_| anyhow!("prover state poisoned"))? = Some(ready);
    Ok(())
}

/// Run trusted setup for an issuer key and nullifier scope.
///
/// Development setup with a fixed seed; call once at startup.
#[wasm_bindgen]
pub fn init_prover(issuer_pem: &str, scope_label: &str) -> bool {
    match init_prover_inner(issuer_pem, scope_label) {
        Ok(()) => {
            web_sys::console::log_1(&"Anon Aadhaar prover initialized".into());
            true
        }
        Err(e) => {
            web_sys::console::error_1(&format!("Failed to init prover: {:#}", e).into());
            false
        }
    }
}

/// Check if the prover is initialized
#[wasm_bindgen]
pub fn is_prover_ready() -> bool {
    PROVER.lock().map(|state| state.is_some()).unwrap_or(false)
}

fn prove_identity_inner(payload_b64: &str, signal: &str) -> anyhow::Result<String> {
    let payload = decode_payload(payload_b64)?;
    let signal = parse_signal(signal)?;

    let state = PROVER.lock().map_err(|_| anyhow!("prover state poisoned"))?;
    let state = state
        .as_ref()
        .ok_or_else(|| anyhow!("prover not initialized; call init_prover() first"))?;

    let witness = WitnessExtractor::new(&state.config, state.keys.clone()).extract(&payload)?;
    let record = ArgumentBuilder::new(ArgumentSchema::standard(&state.config)).build(&witness)?;
    let output = state.prover.prove(&record, &signal)?;

    Ok(serde_json::to_string(&IdentityProofJson {
        packed_proof: codec::pack(&output.proof),
        public_signals: output.public_signals,
        issuer_key_hash: output.issuer_key_hash,
    })?)
}

/// Generate a Groth16 identity proof bound to `signal` (address or decimal).
#[wasm_bindgen]
pub fn prove_identity(payload_b64: &str, signal: &str) -> Result<String, JsValue> {
    prove_identity_inner(payload_b64, signal).map_err(to_js)
}

fn verify_identity_proof_inner(
    packed_json: &str,
    signals_json: &str,
    app_signal: &str,
) -> anyhow::Result<bool> {
    let packed: PackedProof = serde_json::from_str(packed_json).context("invalid packed proof")?;
    let signals: PublicSignals =
        serde_json::from_str(signals_json).context("invalid public signals")?;
    let app_signal = parse_signal(app_signal)?;

    let state = PROVER.lock().map_err(|_| anyhow!("prover state poisoned"))?;
    let state = state
        .as_ref()
        .ok_or_else(|| anyhow!("prover not initialized; call init_prover() first"))?;

    Ok(protocol::verify(&packed, &signals, &app_signal, &state.verifier).is_valid())
}

/// Verify a packed proof for `app_signal`. Malformed input counts as invalid.
#[wasm_bindgen]
pub fn verify_identity_proof(packed_json: &str, signals_json: &str, app_signal: &str) -> bool {
    verify_identity_proof_inner(packed_json, signals_json, app_signal).unwrap_or(false)
}

// ============== UTILITIES ==============

/// Derive the field element for a nullifier scope label.
#[wasm_bindgen]
pub fn scope_to_field(label: &str) -> String {
    field_to_biguint(&NullifierScope::from_label(label).to_field()).to_str_radix(10)
}

/// Get version info
#[wasm_bindgen]
pub fn version() -> String {
    format!("Anon Aadhaar WASM v{} (Groth16/BN254)", env!("CARGO_PKG_VERSION"))
}
