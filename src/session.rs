//! Proof generation sessions.
//!
//! A [`ProofSession`] runs extract -> build -> prove -> pack off the caller's
//! task and exposes a two-state lifecycle: `Idle` or `Generating`. At most
//! one generation is in flight per session; independent sessions share
//! nothing.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::args::{ArgumentBuilder, ArgumentError};
use crate::codec::{self, PackedProof};
use crate::protocol::{PublicSignals, Signal};
use crate::prover::{ProvingEngine, ProvingError};
use crate::witness::{WitnessError, WitnessExtractor};

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Generating,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a proof is already being generated")]
    Busy,

    #[error(transparent)]
    Witness(#[from] WitnessError),

    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    #[error(transparent)]
    Proving(#[from] ProvingError),

    #[error("proof generation was cancelled")]
    Cancelled,

    #[error("proof generation panicked: {0}")]
    Panicked(String),

    #[error("no async runtime available to run proof generation")]
    NoRuntime,
}

impl SessionError {
    /// One human-readable message per error kind, for display to the holder.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Busy => "A proof is already being generated. Please wait.",
            Self::Witness(WitnessError::UnsupportedScheme(_)) => {
                "This QR code version is not supported. Please download a new secure QR."
            }
            Self::Witness(WitnessError::UnsupportedIssuer(_)) => {
                "The document issuer is not recognised."
            }
            Self::Witness(WitnessError::InvalidSignature) => {
                "The document signature is not valid."
            }
            Self::Witness(WitnessError::SignatureSize(_)) => {
                "The document signature does not match the issuer key."
            }
            Self::Witness(WitnessError::MessageTooLong { .. }) => {
                "The document is too large to prove."
            }
            Self::Witness(WitnessError::Malformed(_)) => "The QR code could not be read.",
            Self::Arguments(_) => "The document does not match the proving circuit.",
            Self::Proving(_) => "Proof generation failed. You may try again.",
            Self::Cancelled => "Proof generation was cancelled.",
            Self::Panicked(_) | Self::NoRuntime => "An internal error occurred.",
        }
    }
}

/// Output of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProof {
    pub packed: PackedProof,
    pub public_signals: PublicSignals,
    pub issuer_key_hash: num_bigint::BigUint,
}

/// The synchronous extract -> build -> prove -> pack pipeline.
pub struct Pipeline {
    extractor: WitnessExtractor,
    builder: ArgumentBuilder,
    engine: Arc<dyn ProvingEngine>,
}

impl Pipeline {
    pub fn new(
        extractor: WitnessExtractor,
        builder: ArgumentBuilder,
        engine: Arc<dyn ProvingEngine>,
    ) -> Self {
        Self {
            extractor,
            builder,
            engine,
        }
    }

    /// Run every stage on the current thread. Blocks for the duration of proving.
    pub fn generate(&self, raw: &[u8], signal: &Signal) -> Result<GeneratedProof, SessionError> {
        let witness = self.extractor.extract(raw)?;
        let record = self.builder.build(&witness)?;
        // the witness is not needed past this point
        drop(witness);

        let output = self.engine.prove(&record, signal)?;
        let packed = codec::pack(&output.proof);
        tracing::debug!(signal = %signal, "packed proof");

        Ok(GeneratedProof {
            packed,
            public_signals: output.public_signals,
            issuer_key_hash: output.issuer_key_hash,
        })
    }
}

/// Resets the session to idle when the generation ends, however it ends.
struct IdleGuard(Arc<watch::Sender<SessionState>>);

impl Drop for IdleGuard {
    fn drop(&mut self) {
        self.0.send_replace(SessionState::Idle);
    }
}

/// Handle to an in-flight generation.
pub struct ProofHandle {
    task: JoinHandle<Result<GeneratedProof, SessionError>>,
}

impl ProofHandle {
    /// Wait for the single completion of this generation.
    pub async fn wait(self) -> Result<GeneratedProof, SessionError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(SessionError::Cancelled),
            Err(e) => Err(SessionError::Panicked(e.to_string())),
        }
    }

    /// Abandon the result.
    ///
    /// The proving engine has no cancellation hook, so a generation that has
    /// already started runs to completion in the background; the session
    /// returns to idle when it does.
    pub fn cancel(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// One holder's proof generation lifecycle.
pub struct ProofSession {
    pipeline: Arc<Pipeline>,
    state: Arc<watch::Sender<SessionState>>,
}

impl ProofSession {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            pipeline,
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receive state changes, e.g. to re-render a prove button.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Start generating a proof bound to `signal`.
    ///
    /// Returns immediately; fails with [`SessionError::Busy`] if a generation
    /// is already in flight, leaving that generation untouched. Must be
    /// called from within a tokio runtime.
    pub fn start(&self, raw: Vec<u8>, signal: Signal) -> Result<ProofHandle, SessionError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        let claimed = self.state.send_if_modified(|state| match state {
            SessionState::Idle => {
                *state = SessionState::Generating;
                true
            }
            SessionState::Generating => false,
        });
        if !claimed {
            tracing::debug!("rejected start while generating");
            return Err(SessionError::Busy);
        }

        let guard = IdleGuard(self.state.clone());
        let pipeline = self.pipeline.clone();
        tracing::info!(signal = %signal, "proof generation started");

        let task = runtime.spawn_blocking(move || {
            let _guard = guard;
            let result = pipeline.generate(&raw, &signal);
            match &result {
                Ok(_) => tracing::info!("proof generation finished"),
                Err(e) => tracing::warn!(error = %e, "proof generation failed"),
            }
            result
        });

        Ok(ProofHandle { task })
    }
}
