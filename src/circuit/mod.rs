//! ZK circuit definitions.

mod identity;

pub use identity::{IdentityCircuit, IdentityInputs, NUM_PUBLIC_INPUTS};
