//! Proof-gated release of a threshold-shared secret.
//!
//! Three roles take part. The issuer garbles the policy circuit and deals a
//! secret to a fixed set of identities held by the gatekeeper. The requester
//! fetches wire labels for its attributes, proves that they satisfy the
//! policy and hands the proof to the gatekeeper, which reencrypts the
//! release set's shares towards the requester only if the proof verifies.

pub mod config;
pub mod error;
pub mod gate;
pub mod gatekeeper;
pub mod issuer;
pub mod logging;
pub mod msgs;
pub mod orchestrator;
pub mod proof;
pub mod requester;

pub use config::ProtocolConfig;
pub use error::*;
pub use gate::{decide, Decision};
pub use gatekeeper::{GatekeeperSession, GatekeeperState};
pub use issuer::IssuerSession;
pub use msgs::*;
pub use orchestrator::{run_local, LocalOutcome};
pub use proof::{
    PolicyWitness, Proof, ProofArtifact, ProofSystem, PublicSignals, SnarkjsToolchain,
    TransparentProofSystem, VerificationKey,
};
pub use requester::RequesterSession;
