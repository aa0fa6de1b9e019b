//! The gating decision. Reencryption happens if and only if this says
//! `Accept`.

use tracing::{debug, warn};

use crate::proof::{Proof, ProofSystem, PublicSignals, VerificationKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(Rejection),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The verifier ran and refused the proof.
    Invalid,
    /// The verifier could not run. The same evidence may be accepted later.
    VerifierUnavailable,
}

/// Delegate to the verifier. A verifier that cannot run rejects.
pub fn decide<P: ProofSystem + ?Sized>(
    verifier: &P,
    proof: &Proof,
    public_signals: &PublicSignals,
    verification_key: &VerificationKey,
) -> Decision {
    match verifier.verify(proof, public_signals, verification_key) {
        Ok(true) => {
            debug!("proof verified");
            Decision::Accept
        }
        Ok(false) => {
            debug!("proof did not verify");
            Decision::Reject(Rejection::Invalid)
        }
        Err(e) => {
            warn!(error = %e, "verifier failed, rejecting");
            Decision::Reject(Rejection::VerifierUnavailable)
        }
    }
}
