use std::io;

use circuit::{CircuitError, CircuitLoadError};
use pvss::PvssError;
use twopc::{AuditError, GeneratorError};

use crate::gatekeeper::GatekeeperState;
use crate::msgs::RejectReason;

#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    #[error("malformed circuit: {0}")]
    MalformedCircuit(#[from] CircuitError),
    #[error("circuit {0} is already prepared")]
    DuplicateCircuit(String),
    #[error("threshold {threshold} needs at least {threshold} identities, got {supplied}")]
    InsufficientIdentities { threshold: usize, supplied: usize },
    #[error("dealer parameters have not been generated")]
    DealerNotInitialized,
    #[error("shares were already distributed in this session")]
    AlreadyDistributed,
    #[error("unknown circuit {0}")]
    UnknownCircuit(String),
    #[error("wire {wire} is not a requester input of circuit {circuit_id}")]
    UnknownWire { circuit_id: String, wire: usize },
    #[error("shares have not been distributed yet")]
    SharingNotReady,
    #[error("garbling failed: {0}")]
    Garble(#[from] GeneratorError),
    #[error("sharing failed: {0}")]
    Sharing(#[from] PvssError),
    #[error("audit failed: {0}")]
    Audit(#[from] AuditError),
    #[error("channel failure: {0}")]
    ChannelFailure(#[from] io::Error),
    #[error("unexpected message, wanted {0}")]
    UnexpectedMessage(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum GatekeeperError {
    #[error("operation needs state {expected:?}, session is in {actual:?}")]
    InvalidState {
        expected: GatekeeperState,
        actual: GatekeeperState,
    },
    #[error("malformed circuit: {0}")]
    MalformedCircuit(#[from] CircuitError),
    #[error("offer for circuit {0} does not match its gate count or outputs")]
    MalformedOffer(String),
    #[error("no circuit {0} was offered")]
    UnknownCircuit(String),
    #[error("release set is invalid: {0}")]
    InvalidReleaseSet(String),
    #[error("sharing instance does not match the session identities: {0}")]
    IdentityMismatch(String),
    #[error("sharing threshold is {got}, session expects {expected}")]
    ThresholdMismatch { expected: usize, got: usize },
    #[error("sharing failed: {0}")]
    Sharing(#[from] PvssError),
    #[error("proof backend failed: {0}")]
    Proof(#[from] ProofError),
    #[error("audit failed: {0}")]
    Audit(#[from] AuditError),
    #[error("channel failure: {0}")]
    ChannelFailure(#[from] io::Error),
    #[error("unexpected message, wanted {0}")]
    UnexpectedMessage(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum RequesterError {
    #[error("issuer has no circuit {0}")]
    CircuitNotFound(String),
    #[error("wire {0} is not a requester input")]
    UnknownWire(usize),
    #[error("issuer has not distributed shares yet")]
    SharingNotReady,
    #[error("no labels have been retrieved")]
    NoLabels,
    #[error("no label pair for wire {0}")]
    MissingLabel(usize),
    #[error("circuit takes {expected} attributes, got {got}")]
    AttributeCountMismatch { expected: usize, got: usize },
    #[error("proof backend failed: {0}")]
    Proof(#[from] ProofError),
    #[error("gatekeeper rejected the proof: {0:?}")]
    GateRejected(RejectReason),
    #[error("gatekeeper failed: {0}")]
    GatekeeperFailed(String),
    #[error("sharing failed: {0}")]
    Sharing(#[from] PvssError),
    #[error("channel failure: {0}")]
    ChannelFailure(#[from] io::Error),
    #[error("unexpected message, wanted {0}")]
    UnexpectedMessage(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    #[error("proof toolchain io error: {0}")]
    Io(#[from] io::Error),
    #[error("proof artifact is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("`{command}` exited with {status}: {stderr}")]
    Toolchain {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("witness does not match the policy circuit: {0}")]
    MalformedWitness(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("threshold must be at least 1")]
    InvalidThreshold,
    #[error("identity {0} is listed twice")]
    DuplicateIdentity(String),
    #[error("release set names unknown identity {0}")]
    UnknownReleaseIdentity(String),
    #[error("release set has {size} identities, threshold is {threshold}")]
    ReleaseSetTooSmall { threshold: usize, size: usize },
    #[error("{threshold} identities needed, {supplied} configured")]
    TooFewIdentities { threshold: usize, supplied: usize },
    #[error("failed to load circuits: {0}")]
    Circuit(#[from] CircuitLoadError),
    #[error("circuit file has no circuit {0}")]
    UnknownCircuit(String),
    #[error("invalid attribute list {0:?}, expected comma separated 0/1")]
    InvalidAttributes(String),
    #[error("proof backend setup failed: {0}")]
    Proof(#[from] ProofError),
}

/// Failures of a whole protocol run.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("issuer: {0}")]
    Issuer(#[from] IssuerError),
    #[error("gatekeeper: {0}")]
    Gatekeeper(#[from] GatekeeperError),
    #[error("requester: {0}")]
    Requester(#[from] RequesterError),
    #[error("channel setup failed: {0}")]
    ChannelFailure(#[from] io::Error),
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
