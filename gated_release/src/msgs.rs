//! Messages exchanged between the three roles. Every message is a JSON
//! frame on a `crypto_core` channel.

use std::collections::BTreeMap;

use circuit::Circuit;
use crypto_core::Block;
use pvss::{PublicKey, ReencryptedShare, SharingInstance, SharingParameters};
use serde::{Deserialize, Serialize};
use twopc::{GarbledCircuitTable, OutputDecodeInfo};

use crate::proof::ProofArtifact;

/// The label of one wire value together with its point-and-permute bit
/// `v ^ p`, where `p` is the permutation bit of the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireKey {
    pub key: Block,
    pub bit: bool,
}

/// `[label for 0, label for 1]` of a requester wire.
pub type LabelPair = [WireKey; 2];

/// Everything a requester receives for one circuit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelGrant {
    pub circuit: Circuit,
    pub labels: BTreeMap<usize, LabelPair>,
    pub sharing: SharingInstance,
}

impl LabelGrant {
    pub fn circuit_id(&self) -> &str {
        &self.circuit.id
    }
}

/// What the gatekeeper learns about a garbled circuit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitOffer {
    pub circuit: Circuit,
    pub garbled_tables: GarbledCircuitTable,
    pub output_decode_info: Vec<OutputDecodeInfo>,
}

/// Issuer ⇄ gatekeeper setup conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupMsg {
    /// issuer → gatekeeper
    Setup {
        params: SharingParameters,
        offers: Vec<CircuitOffer>,
        oblivious_transfer: bool,
    },
    /// gatekeeper → issuer
    IdentityKeys(BTreeMap<String, PublicKey>),
    /// issuer → gatekeeper
    Shares(SharingInstance),
    /// gatekeeper → issuer
    SharesAccepted,
}

/// Requester → issuer. An empty wire list asks for every requester wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRequest {
    pub circuit_id: String,
    #[serde(default)]
    pub wires: Vec<usize>,
}

/// Issuer → requester.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelReply {
    Granted(Box<LabelGrant>),
    UnknownCircuit { circuit_id: String },
    UnknownWire { wire: usize },
    SharingNotReady,
}

/// Requester → gatekeeper.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRequest {
    pub artifact: ProofArtifact,
    pub receiver: PublicKey,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The verifier did not accept the proof.
    ProofInvalid,
    /// The artifact carries a verification key the gatekeeper does not trust.
    UntrustedVerificationKey,
    /// The proof is not bound to the key the shares would be encrypted to.
    ReceiverMismatch,
    /// The proof is for another circuit.
    CircuitMismatch,
    /// The proof does not show the policy output `1`.
    PolicyNotSatisfied,
    /// The verifier could not run. The artifact is not recorded and may be
    /// resubmitted.
    VerifierUnavailable,
    /// This artifact was rejected before.
    ReplayedRejectedArtifact,
    /// This artifact already released shares to another receiver.
    ArtifactReplay,
}

/// Gatekeeper → requester. `Released` carries one share per release-set
/// identity; `Rejected` and `Failed` carry no share material at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseReply {
    Released(Vec<ReencryptedShare>),
    Rejected(RejectReason),
    /// The gatekeeper could not handle the request and closes the connection.
    Failed(String),
}
