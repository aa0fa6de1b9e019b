//! The requester fetches labels, proves its attributes satisfy the policy
//! and reconstructs the secret from the shares the gatekeeper releases.

use crypto_core::{AbstractChannel, AesRng};
use pvss::{reconstruct, Keypair, PublicKey, Secret};
use tracing::{debug, info, warn};

use crate::error::RequesterError;
use crate::msgs::{LabelGrant, LabelReply, LabelRequest, ReleaseReply, ReleaseRequest};
use crate::proof::{PolicyWitness, ProofArtifact, ProofSystem};

pub struct RequesterSession<P: ProofSystem> {
    prover: P,
    rng: AesRng,
    grant: Option<LabelGrant>,
    /// Receiver key for released shares, generated from the grant's
    /// sharing parameters.
    keypair: Option<Keypair>,
}

impl<P: ProofSystem> RequesterSession<P> {
    pub fn new(prover: P) -> Self {
        Self {
            prover,
            rng: AesRng::new(),
            grant: None,
            keypair: None,
        }
    }

    pub fn grant(&self) -> Option<&LabelGrant> {
        self.grant.as_ref()
    }

    pub fn public_key(&self) -> Option<PublicKey> {
        self.keypair.as_ref().map(|kp| kp.public)
    }

    /// One round trip to the issuer for every requester wire of `circuit_id`.
    pub fn request_labels<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        circuit_id: &str,
    ) -> Result<&LabelGrant, RequesterError> {
        channel.send_msg(&LabelRequest {
            circuit_id: circuit_id.to_string(),
            wires: Vec::new(),
        })?;
        let grant = match channel.recv_msg::<LabelReply>()? {
            LabelReply::Granted(grant) => *grant,
            LabelReply::UnknownCircuit { circuit_id } => {
                return Err(RequesterError::CircuitNotFound(circuit_id))
            }
            LabelReply::UnknownWire { wire } => return Err(RequesterError::UnknownWire(wire)),
            LabelReply::SharingNotReady => return Err(RequesterError::SharingNotReady),
        };
        if grant.circuit_id() != circuit_id {
            return Err(RequesterError::UnexpectedMessage("grant for the requested circuit"));
        }
        grant.sharing.verify()?;
        debug!(circuit = circuit_id, wires = grant.labels.len(), "labels received");

        let refresh = self
            .grant
            .as_ref()
            .map_or(true, |g| g.sharing.params != grant.sharing.params);
        if refresh || self.keypair.is_none() {
            self.keypair = Some(Keypair::generate(
                &mut self.rng,
                &grant.sharing.params,
                "requester",
            ));
        }
        Ok(self.grant.insert(grant))
    }

    /// Bind each attribute bit to the label pair of its own wire and prove
    /// the policy holds.
    pub fn build_proof(
        &self,
        attributes: &[bool],
        grant: &LabelGrant,
    ) -> Result<ProofArtifact, RequesterError> {
        let receiver = self.public_key().ok_or(RequesterError::NoLabels)?;
        let wires = &grant.circuit.requester_wires;
        if attributes.len() != wires.len() {
            return Err(RequesterError::AttributeCountMismatch {
                expected: wires.len(),
                got: attributes.len(),
            });
        }
        let labels = wires
            .iter()
            .map(|w| {
                grant
                    .labels
                    .get(w)
                    .copied()
                    .ok_or(RequesterError::MissingLabel(*w))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let witness = PolicyWitness {
            circuit_id: grant.circuit_id().to_string(),
            attributes: attributes.to_vec(),
            labels,
            receiver,
        };
        let (proof, public_signals) = self.prover.prove(&witness)?;
        info!(circuit = grant.circuit_id(), "proof generated");

        Ok(ProofArtifact {
            circuit_id: witness.circuit_id,
            proof,
            public_signals,
            verification_key: self.prover.verification_key()?,
            receiver,
        })
    }

    /// Submit `artifact` and combine the released shares.
    pub fn submit_and_reconstruct<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        artifact: ProofArtifact,
    ) -> Result<Secret, RequesterError> {
        let keypair = self.keypair.as_ref().ok_or(RequesterError::NoLabels)?;
        let threshold = self
            .grant
            .as_ref()
            .map(|g| g.sharing.threshold)
            .ok_or(RequesterError::NoLabels)?;

        channel.send_msg(&ReleaseRequest {
            artifact,
            receiver: keypair.public,
        })?;
        match channel.recv_msg::<ReleaseReply>()? {
            ReleaseReply::Released(shares) => {
                let secret = reconstruct(keypair, &shares, threshold)?;
                info!(shares = shares.len(), "secret reconstructed");
                Ok(secret)
            }
            ReleaseReply::Rejected(reason) => {
                info!(?reason, "release rejected");
                Err(RequesterError::GateRejected(reason))
            }
            ReleaseReply::Failed(error) => {
                warn!(%error, "gatekeeper failed");
                Err(RequesterError::GatekeeperFailed(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issuer::IssuerSession;
    use crate::msgs::RejectReason;
    use crate::proof::TransparentProofSystem;
    use circuit::Circuit;
    use crypto_core::local_channel_pair;
    use pvss::SharingParameters;
    use std::collections::BTreeMap;
    use std::thread;

    fn circuits() -> Vec<Circuit> {
        Circuit::load_file("../circuit/circuit_files/default.json").unwrap()
    }

    fn requester() -> RequesterSession<TransparentProofSystem> {
        RequesterSession::new(TransparentProofSystem::new(circuits().remove(0)).unwrap())
    }

    fn issuer() -> IssuerSession {
        let mut issuer = IssuerSession::new(true);
        for circ in circuits() {
            issuer.prepare(circ).unwrap();
        }
        let params: SharingParameters = issuer.init_dealer();
        let mut rng = AesRng::new();
        let keys: BTreeMap<String, PublicKey> = ["Alice", "Boris"]
            .iter()
            .map(|n| (n.to_string(), Keypair::generate(&mut rng, &params, *n).public))
            .collect();
        issuer.distribute_shares(&keys, 2).unwrap();
        issuer
    }

    #[test]
    fn labels_and_proof_from_issuer() {
        let (mut req_channel, mut issuer_channel) = local_channel_pair().unwrap();
        let handle = thread::spawn(move || {
            issuer().serve_requester(&mut issuer_channel).unwrap();
        });

        let mut req = requester();
        assert!(matches!(
            req.request_labels(&mut req_channel, "Missing"),
            Err(RequesterError::CircuitNotFound(id)) if id == "Missing"
        ));
        assert!(req.public_key().is_none());

        let grant = req.request_labels(&mut req_channel, "Smart").unwrap().clone();
        assert_eq!(grant.labels.len(), 2);
        assert!(req.public_key().is_some());

        assert!(matches!(
            req.build_proof(&[true], &grant),
            Err(RequesterError::AttributeCountMismatch {
                expected: 2,
                got: 1
            })
        ));
        let artifact = req.build_proof(&[true, false], &grant).unwrap();
        assert_eq!(artifact.public_signals[0], "1");
        assert_eq!(Some(artifact.receiver), req.public_key());

        let mut partial = grant.clone();
        partial.labels.remove(&2);
        assert!(matches!(
            req.build_proof(&[true, false], &partial),
            Err(RequesterError::MissingLabel(2))
        ));

        drop(req_channel);
        handle.join().unwrap();
    }

    #[test]
    fn rejection_carries_the_reason() {
        let (mut req_channel, mut gk_channel) = local_channel_pair().unwrap();
        let handle = thread::spawn(move || {
            let _ = gk_channel.recv_msg::<ReleaseRequest>().unwrap();
            gk_channel
                .send_msg(&ReleaseReply::Rejected(RejectReason::PolicyNotSatisfied))
                .unwrap();
        });

        let issuer = issuer();
        let mut req = requester();
        let grant = issuer.retrieve_labels("Smart", &[]).unwrap();
        req.keypair = Some(Keypair::generate(
            &mut AesRng::new(),
            &grant.sharing.params,
            "requester",
        ));
        req.grant = Some(grant.clone());
        let artifact = req.build_proof(&[false, false], &grant).unwrap();
        assert!(matches!(
            req.submit_and_reconstruct(&mut req_channel, artifact),
            Err(RequesterError::GateRejected(RejectReason::PolicyNotSatisfied))
        ));
        handle.join().unwrap();
    }

    #[test]
    fn nothing_to_submit_without_labels() {
        let (mut channel, _peer) = local_channel_pair().unwrap();
        let req = requester();
        let issuer = issuer();
        let grant = issuer.retrieve_labels("Smart", &[]).unwrap();
        assert!(matches!(
            req.build_proof(&[true, false], &grant),
            Err(RequesterError::NoLabels)
        ));
        let mut req = req;
        let artifact = ProofArtifact {
            circuit_id: "Smart".to_string(),
            proof: crate::proof::Proof(serde_json::json!({})),
            public_signals: Vec::new(),
            verification_key: crate::proof::VerificationKey(serde_json::json!({})),
            receiver: grant.sharing.holders["Alice"],
        };
        assert!(matches!(
            req.submit_and_reconstruct(&mut channel, artifact),
            Err(RequesterError::NoLabels)
        ));
    }
}
