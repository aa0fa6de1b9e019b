//! The gatekeeper holds every identity key, evaluates audit traffic and
//! reencrypts the release set's shares for requesters that present a valid
//! proof.
//!
//! ```text
//! AwaitParams -> KeyGen -> AwaitShares -> Ready -> { Evaluating | Verifying } -> Ready
//!                                                                 `-> Terminated
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::io::ErrorKind;

use crypto_core::{AbstractChannel, AesRng};
use pvss::{reencrypt, Keypair, PublicKey, ReencryptedShare, SharingInstance, SharingParameters};
use tracing::{debug, info, warn};
use twopc::{AuditEvaluator, AuditReport, MAX_AUDIT_INPUTS};

use crate::error::GatekeeperError;
use crate::gate::{decide, Decision, Rejection};
use crate::msgs::{CircuitOffer, RejectReason, ReleaseReply, ReleaseRequest, SetupMsg};
use crate::proof::{
    receiver_binding, ProofArtifact, ProofSystem, VerificationKey, NUM_SIGNALS, SIGNAL_OUTPUT,
    SIGNAL_RECEIVER,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatekeeperState {
    AwaitParams,
    KeyGen,
    AwaitShares,
    Ready,
    Evaluating,
    Verifying,
    Terminated,
}

type Digest = [u8; 32];

/// Artifacts remembered per outcome and session. The oldest are forgotten
/// first. A forgotten artifact is verified again; a forgotten release gets
/// the shares already reencrypted for its receiver, never fresh ones.
pub const MAX_TRACKED_ARTIFACTS: usize = 4096;

/// Outcomes by artifact digest, oldest evicted beyond `MAX_TRACKED_ARTIFACTS`.
struct ArtifactLog<V> {
    entries: HashMap<Digest, V>,
    order: VecDeque<Digest>,
}

impl<V> ArtifactLog<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, digest: &Digest) -> Option<&V> {
        self.entries.get(digest)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn insert(&mut self, digest: Digest, value: V) {
        if self.entries.insert(digest, value).is_none() {
            self.order.push_back(digest);
        }
        while self.order.len() > MAX_TRACKED_ARTIFACTS {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}

pub struct GatekeeperSession<P: ProofSystem> {
    state: GatekeeperState,
    identity_names: Vec<String>,
    release_set: Vec<String>,
    threshold: usize,
    circuit_id: String,
    verifier: P,
    trusted_key: VerificationKey,
    rng: AesRng,

    params: Option<SharingParameters>,
    identities: BTreeMap<String, Keypair>,
    offers: Vec<CircuitOffer>,
    oblivious_transfer: bool,
    sharing: Option<SharingInstance>,

    released: ArtifactLog<(PublicKey, Vec<ReencryptedShare>)>,
    rejected: ArtifactLog<RejectReason>,
    /// One reencryption per (identity, receiver).
    reencrypted: BTreeMap<(String, [u8; 32]), ReencryptedShare>,
}

impl<P: ProofSystem> GatekeeperSession<P> {
    /// The identity set and the release set are fixed here for the whole
    /// session. `circuit_id` names the policy that gates release.
    pub fn new(
        identities: Vec<String>,
        release_set: Vec<String>,
        threshold: usize,
        circuit_id: impl Into<String>,
        verifier: P,
    ) -> Result<Self, GatekeeperError> {
        let names: BTreeSet<&String> = identities.iter().collect();
        if names.len() != identities.len() {
            return Err(GatekeeperError::InvalidReleaseSet(
                "duplicate identity".to_string(),
            ));
        }
        let released: BTreeSet<&String> = release_set.iter().collect();
        if released.len() != release_set.len() {
            return Err(GatekeeperError::InvalidReleaseSet(
                "duplicate release identity".to_string(),
            ));
        }
        if let Some(unknown) = release_set.iter().find(|n| !names.contains(n)) {
            return Err(GatekeeperError::InvalidReleaseSet(format!(
                "{} is not a session identity",
                unknown
            )));
        }
        if threshold == 0 || release_set.len() < threshold {
            return Err(GatekeeperError::InvalidReleaseSet(format!(
                "{} identities cannot meet threshold {}",
                release_set.len(),
                threshold
            )));
        }
        let trusted_key = verifier.verification_key()?;

        Ok(Self {
            state: GatekeeperState::AwaitParams,
            identity_names: identities,
            release_set,
            threshold,
            circuit_id: circuit_id.into(),
            verifier,
            trusted_key,
            rng: AesRng::new(),
            params: None,
            identities: BTreeMap::new(),
            offers: Vec::new(),
            oblivious_transfer: true,
            sharing: None,
            released: ArtifactLog::new(),
            rejected: ArtifactLog::new(),
            reencrypted: BTreeMap::new(),
        })
    }

    pub fn state(&self) -> GatekeeperState {
        self.state
    }

    fn expect_state(&self, expected: GatekeeperState) -> Result<(), GatekeeperError> {
        if self.state != expected {
            return Err(GatekeeperError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    pub fn offers(&self) -> &[CircuitOffer] {
        &self.offers
    }

    /// Number of reencryptions performed so far.
    pub fn reencryption_count(&self) -> usize {
        self.reencrypted.len()
    }

    /// Released and rejected artifacts currently remembered.
    pub fn tracked_artifacts(&self) -> usize {
        self.released.len() + self.rejected.len()
    }

    /// Accept the issuer's parameters and offers and generate the identity
    /// keys. Returns the public keys to hand back to the issuer.
    pub fn receive_params(
        &mut self,
        params: SharingParameters,
        offers: Vec<CircuitOffer>,
        oblivious_transfer: bool,
    ) -> Result<BTreeMap<String, PublicKey>, GatekeeperError> {
        self.expect_state(GatekeeperState::AwaitParams)?;
        for offer in offers.iter() {
            offer.circuit.validate()?;
            let decode_wires = offer.output_decode_info.iter().map(|d| d.id);
            if offer.garbled_tables.table.len() != offer.circuit.nand
                || !decode_wires.eq(offer.circuit.output_wires.iter().copied())
            {
                return Err(GatekeeperError::MalformedOffer(offer.circuit.id.clone()));
            }
        }
        if !offers.iter().any(|o| o.circuit.id == self.circuit_id) {
            warn!(circuit = %self.circuit_id, "policy circuit was not offered");
        }

        self.state = GatekeeperState::KeyGen;
        let mut identities = BTreeMap::new();
        for name in self.identity_names.iter() {
            let keypair = Keypair::generate(&mut self.rng, &params, name.as_str());
            identities.insert(name.clone(), keypair);
        }
        self.identities = identities;
        self.params = Some(params);
        self.offers = offers;
        self.oblivious_transfer = oblivious_transfer;
        self.state = GatekeeperState::AwaitShares;
        info!(identities = self.identities.len(), "identity keys generated");

        Ok(self
            .identities
            .iter()
            .map(|(name, kp)| (name.clone(), kp.public))
            .collect())
    }

    /// Verify the dealt shares against the session identities.
    pub fn receive_shares(&mut self, instance: SharingInstance) -> Result<(), GatekeeperError> {
        self.expect_state(GatekeeperState::AwaitShares)?;
        if Some(instance.params) != self.params {
            return Err(GatekeeperError::IdentityMismatch(
                "sharing parameters differ".to_string(),
            ));
        }
        if instance.threshold != self.threshold {
            return Err(GatekeeperError::ThresholdMismatch {
                expected: self.threshold,
                got: instance.threshold,
            });
        }
        let holders_match = instance.holders.len() == self.identities.len()
            && instance
                .holders
                .iter()
                .all(|(name, pk)| self.identities.get(name).map(|kp| kp.public) == Some(*pk));
        if !holders_match {
            return Err(GatekeeperError::IdentityMismatch(
                "holder keys differ".to_string(),
            ));
        }
        instance.verify()?;

        self.sharing = Some(instance);
        self.state = GatekeeperState::Ready;
        info!(threshold = self.threshold, "shares verified");
        Ok(())
    }

    /// Evaluate the offered tables of one circuit on every input assignment,
    /// with the issuer supplying input labels.
    pub fn evaluate_audit<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        circuit_id: &str,
    ) -> Result<AuditReport, GatekeeperError> {
        self.expect_state(GatekeeperState::Ready)?;
        let offer = self
            .offers
            .iter()
            .find(|o| o.circuit.id == circuit_id)
            .cloned()
            .ok_or_else(|| GatekeeperError::UnknownCircuit(circuit_id.to_string()))?;

        self.state = GatekeeperState::Evaluating;
        let result = AuditEvaluator::new(self.oblivious_transfer).run(
            channel,
            &mut self.rng,
            &offer.circuit,
            &offer.garbled_tables,
            &offer.output_decode_info,
        );
        self.state = GatekeeperState::Ready;
        let report = result?;
        debug!(circuit = circuit_id, rows = report.rows.len(), "audit evaluated");
        Ok(report)
    }

    /// Audit every offered circuit narrow enough to enumerate, in offer order.
    pub fn run_audits<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
    ) -> Result<Vec<AuditReport>, GatekeeperError> {
        let ids: Vec<String> = self
            .offers
            .iter()
            .filter(|o| o.circuit.ninput_wires() <= MAX_AUDIT_INPUTS)
            .map(|o| o.circuit.id.clone())
            .collect();
        ids.iter()
            .map(|id| self.evaluate_audit(channel, id))
            .collect()
    }

    /// The only path to reencryption.
    pub fn verify_and_release(
        &mut self,
        artifact: &ProofArtifact,
        receiver: &PublicKey,
    ) -> Result<ReleaseReply, GatekeeperError> {
        self.expect_state(GatekeeperState::Ready)?;
        self.state = GatekeeperState::Verifying;
        let reply = self.gate(artifact, receiver);
        self.state = GatekeeperState::Ready;
        reply
    }

    fn gate(
        &mut self,
        artifact: &ProofArtifact,
        receiver: &PublicKey,
    ) -> Result<ReleaseReply, GatekeeperError> {
        let digest = artifact.digest()?;
        if self.rejected.get(&digest).is_some() {
            info!(circuit = %artifact.circuit_id, "rejected artifact resubmitted");
            return Ok(ReleaseReply::Rejected(RejectReason::ReplayedRejectedArtifact));
        }
        if let Some((released_to, shares)) = self.released.get(&digest) {
            if released_to == receiver {
                info!(circuit = %artifact.circuit_id, "artifact replayed, returning cached shares");
                return Ok(ReleaseReply::Released(shares.clone()));
            }
            warn!(circuit = %artifact.circuit_id, "artifact replayed for another receiver");
            return Ok(ReleaseReply::Rejected(RejectReason::ArtifactReplay));
        }

        if let Some(reason) = self.precheck(artifact, receiver) {
            return Ok(self.reject(digest, reason));
        }
        match decide(
            &self.verifier,
            &artifact.proof,
            &artifact.public_signals,
            &artifact.verification_key,
        ) {
            Decision::Accept => {}
            Decision::Reject(Rejection::Invalid) => {
                let reason = if artifact.public_signals[SIGNAL_OUTPUT] != "1" {
                    RejectReason::PolicyNotSatisfied
                } else {
                    RejectReason::ProofInvalid
                };
                return Ok(self.reject(digest, reason));
            }
            Decision::Reject(Rejection::VerifierUnavailable) => {
                warn!(circuit = %artifact.circuit_id, "verifier unavailable, artifact not recorded");
                return Ok(ReleaseReply::Rejected(RejectReason::VerifierUnavailable));
            }
        }

        let shares = self.reencrypt_release_set(receiver)?;
        info!(
            circuit = %artifact.circuit_id,
            shares = shares.len(),
            "proof accepted, shares released"
        );
        self.released.insert(digest, (*receiver, shares.clone()));
        Ok(ReleaseReply::Released(shares))
    }

    fn precheck(&self, artifact: &ProofArtifact, receiver: &PublicKey) -> Option<RejectReason> {
        let signals = &artifact.public_signals;
        if artifact.circuit_id != self.circuit_id
            || !self.offers.iter().any(|o| o.circuit.id == artifact.circuit_id)
        {
            Some(RejectReason::CircuitMismatch)
        } else if artifact.verification_key != self.trusted_key {
            Some(RejectReason::UntrustedVerificationKey)
        } else if signals.len() != NUM_SIGNALS {
            Some(RejectReason::ProofInvalid)
        } else if artifact.receiver != *receiver
            || signals[SIGNAL_RECEIVER] != receiver_binding(receiver)
        {
            Some(RejectReason::ReceiverMismatch)
        } else {
            None
        }
    }

    fn reject(&mut self, digest: Digest, reason: RejectReason) -> ReleaseReply {
        info!(?reason, "release rejected");
        self.rejected.insert(digest, reason);
        ReleaseReply::Rejected(reason)
    }

    /// Reencrypt every release-set share for `receiver`, or nothing at all.
    fn reencrypt_release_set(
        &mut self,
        receiver: &PublicKey,
    ) -> Result<Vec<ReencryptedShare>, GatekeeperError> {
        let sharing = self
            .sharing
            .as_ref()
            .ok_or(GatekeeperError::InvalidState {
                expected: GatekeeperState::Ready,
                actual: self.state,
            })?;
        let receiver_bytes = receiver.to_bytes();

        let mut shares = Vec::with_capacity(self.release_set.len());
        let mut fresh = Vec::new();
        for name in self.release_set.iter() {
            let key = (name.clone(), receiver_bytes);
            if let Some(share) = self.reencrypted.get(&key) {
                shares.push(share.clone());
                continue;
            }
            let holder = self
                .identities
                .get(name)
                .ok_or_else(|| GatekeeperError::IdentityMismatch(name.clone()))?;
            let share = reencrypt(
                &mut self.rng,
                &sharing.params,
                holder,
                sharing.share_for(name)?,
                receiver,
            )?;
            debug!(identity = %name, index = share.index, "share reencrypted");
            fresh.push((key, share.clone()));
            shares.push(share);
        }
        self.reencrypted.extend(fresh);
        Ok(shares)
    }

    /// Setup and audits with the issuer, in that order.
    pub fn serve_issuer<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
    ) -> Result<Vec<AuditReport>, GatekeeperError> {
        let keys = match channel.recv_msg::<SetupMsg>()? {
            SetupMsg::Setup {
                params,
                offers,
                oblivious_transfer,
            } => self.receive_params(params, offers, oblivious_transfer)?,
            _ => return Err(GatekeeperError::UnexpectedMessage("Setup")),
        };
        channel.send_msg(&SetupMsg::IdentityKeys(keys))?;

        match channel.recv_msg::<SetupMsg>()? {
            SetupMsg::Shares(instance) => self.receive_shares(instance)?,
            _ => return Err(GatekeeperError::UnexpectedMessage("Shares")),
        }
        channel.send_msg(&SetupMsg::SharesAccepted)?;

        self.run_audits(channel)
    }

    /// Answer release requests until the requester hangs up.
    pub fn serve_requester<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
    ) -> Result<(), GatekeeperError> {
        loop {
            let request = match channel.recv_msg::<ReleaseRequest>() {
                Ok(request) => request,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            let reply = match self.verify_and_release(&request.artifact, &request.receiver) {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(error = %e, "release request failed");
                    if let Err(send) = channel.send_msg(&ReleaseReply::Failed(e.to_string())) {
                        debug!(error = %send, "could not report failure to requester");
                    }
                    return Err(e);
                }
            };
            channel.send_msg(&reply)?;
        }
    }

    /// End the session and drop every identity key.
    pub fn terminate(&mut self) {
        self.identities.clear();
        self.sharing = None;
        self.state = GatekeeperState::Terminated;
        info!("gatekeeper session terminated");
    }
}
