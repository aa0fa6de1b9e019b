//! A backend without zero knowledge: the proof is the witness itself and
//! verification re-evaluates the policy, accepting only a satisfied one. Useful for local runs and tests
//! where no SNARK toolchain is installed.

use circuit::Circuit;
use pvss::PublicKey;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

use super::{
    label_commitment, receiver_binding, PolicyWitness, Proof, ProofSystem, PublicSignals,
    VerificationKey, SIGNAL_OUTPUT,
};
use crate::error::ProofError;
use crate::msgs::LabelPair;

#[derive(Serialize, Deserialize)]
struct TransparentProof {
    circuit_id: String,
    attributes: Vec<bool>,
    labels: Vec<LabelPair>,
    receiver: PublicKey,
}

pub struct TransparentProofSystem {
    policy: Circuit,
    verification_key: VerificationKey,
}

/// A label pair is well formed when each pointer bit is the lsb of its key
/// and the two keys differ in that bit.
fn well_formed(pair: &LabelPair) -> bool {
    pair.iter().all(|wk| wk.bit == wk.key.lsb()) && pair[0].bit != pair[1].bit
}

impl TransparentProofSystem {
    /// The policy must take requester inputs only.
    pub fn new(policy: Circuit) -> Result<Self, ProofError> {
        if !policy.gatekeeper_wires.is_empty() {
            return Err(ProofError::MalformedWitness(format!(
                "policy {} has gatekeeper inputs",
                policy.id
            )));
        }
        let descriptor = serde_json::to_vec(&policy.to_descriptor())?;
        let digest: String = Sha256::digest(&descriptor)
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        let verification_key = VerificationKey(json!({
            "backend": "transparent",
            "circuit": policy.id,
            "digest": digest,
        }));
        Ok(Self {
            policy,
            verification_key,
        })
    }

    fn signals(&self, witness: &PolicyWitness) -> Result<PublicSignals, ProofError> {
        if witness.circuit_id != self.policy.id {
            return Err(ProofError::MalformedWitness(format!(
                "witness is for circuit {}, policy is {}",
                witness.circuit_id, self.policy.id
            )));
        }
        if witness.labels.len() != witness.attributes.len() {
            return Err(ProofError::MalformedWitness(
                "one label pair per attribute".to_string(),
            ));
        }
        if let Some(i) = witness.labels.iter().position(|p| !well_formed(p)) {
            return Err(ProofError::MalformedWitness(format!(
                "label pair {} is malformed",
                i
            )));
        }
        let outputs = self
            .policy
            .eval_split(&witness.attributes, &[])
            .map_err(|e| ProofError::MalformedWitness(e.to_string()))?;
        let satisfied = outputs.first().copied().unwrap_or(false);

        Ok(vec![
            if satisfied { "1" } else { "0" }.to_string(),
            label_commitment(&witness.chosen_keys(), &witness.receiver),
            receiver_binding(&witness.receiver),
        ])
    }
}

impl ProofSystem for TransparentProofSystem {
    fn prove(&self, witness: &PolicyWitness) -> Result<(Proof, PublicSignals), ProofError> {
        let signals = self.signals(witness)?;
        let proof = serde_json::to_value(TransparentProof {
            circuit_id: witness.circuit_id.clone(),
            attributes: witness.attributes.clone(),
            labels: witness.labels.clone(),
            receiver: witness.receiver,
        })?;
        Ok((Proof(proof), signals))
    }

    fn verify(
        &self,
        proof: &Proof,
        public_signals: &PublicSignals,
        verification_key: &VerificationKey,
    ) -> Result<bool, ProofError> {
        if *verification_key != self.verification_key {
            return Ok(false);
        }
        let proof: TransparentProof = match serde_json::from_value(proof.0.clone()) {
            Ok(proof) => proof,
            Err(_) => return Ok(false),
        };
        let witness = PolicyWitness {
            circuit_id: proof.circuit_id,
            attributes: proof.attributes,
            labels: proof.labels,
            receiver: proof.receiver,
        };
        match self.signals(&witness) {
            Ok(expected) => Ok(expected == *public_signals && expected[SIGNAL_OUTPUT] == "1"),
            Err(ProofError::MalformedWitness(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn verification_key(&self) -> Result<VerificationKey, ProofError> {
        Ok(self.verification_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msgs::WireKey;
    use crypto_core::{AesRng, Block};
    use pvss::{Keypair, SharingParameters};
    use rand::Rng;

    fn smart() -> Circuit {
        Circuit::load_file("../circuit/circuit_files/default.json")
            .unwrap()
            .remove(0)
    }

    fn witness(attributes: Vec<bool>) -> PolicyWitness {
        let mut rng = AesRng::new();
        let params = SharingParameters::generate(&mut rng);
        let delta = rng.gen::<Block>().set_lsb();
        let labels = attributes
            .iter()
            .map(|_| {
                let zero = rng.gen::<Block>();
                let one = zero ^ delta;
                [
                    WireKey {
                        key: zero,
                        bit: zero.lsb(),
                    },
                    WireKey {
                        key: one,
                        bit: one.lsb(),
                    },
                ]
            })
            .collect();
        PolicyWitness {
            circuit_id: "Smart".to_string(),
            attributes,
            labels,
            receiver: Keypair::generate(&mut rng, &params, "requester").public,
        }
    }

    #[test]
    fn only_satisfied_policy_verifies() {
        let ps = TransparentProofSystem::new(smart()).unwrap();
        let vk = ps.verification_key().unwrap();
        let (proof, signals) = ps.prove(&witness(vec![true, false])).unwrap();
        assert_eq!(signals[0], "1");
        assert!(ps.verify(&proof, &signals, &vk).unwrap());

        let (proof, signals) = ps.prove(&witness(vec![false, false])).unwrap();
        assert_eq!(signals[0], "0");
        assert!(!ps.verify(&proof, &signals, &vk).unwrap());
    }

    #[test]
    fn forged_signals_fail() {
        let ps = TransparentProofSystem::new(smart()).unwrap();
        let vk = ps.verification_key().unwrap();
        let (proof, mut signals) = ps.prove(&witness(vec![false, true])).unwrap();
        signals[0] = "1".to_string();
        assert!(!ps.verify(&proof, &signals, &vk).unwrap());

        let (proof, signals) = ps.prove(&witness(vec![true, false])).unwrap();
        let other_vk = VerificationKey(json!({"backend": "transparent"}));
        assert!(!ps.verify(&proof, &signals, &other_vk).unwrap());
        assert!(!ps
            .verify(&Proof(json!({"garbage": true})), &signals, &vk)
            .unwrap());
    }

    #[test]
    fn malformed_witness_is_refused() {
        let ps = TransparentProofSystem::new(smart()).unwrap();
        let mut w = witness(vec![true, false]);
        w.labels[1][0].bit = !w.labels[1][0].bit;
        assert!(matches!(ps.prove(&w), Err(ProofError::MalformedWitness(_))));

        let w = witness(vec![true]);
        assert!(ps.prove(&w).is_err());
    }

    #[test]
    fn policy_with_gatekeeper_inputs_is_refused() {
        let audit = Circuit::load_file("../circuit/circuit_files/default.json")
            .unwrap()
            .remove(1);
        assert!(TransparentProofSystem::new(audit).is_err());
    }
}
