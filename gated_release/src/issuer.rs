//! The issuer garbles the policy circuits and deals the secret.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::time::Instant;

use circuit::Circuit;
use crypto_core::{AbstractChannel, AesRng, Block};
use pvss::{share_secret, PublicKey, Secret, SharingInstance, SharingParameters};
use tracing::{debug, info, warn};
use twopc::{AuditGarbler, AuditReport, GarbledCircuit, HalfGateGenerator, MAX_AUDIT_INPUTS};

use crate::error::IssuerError;
use crate::msgs::{CircuitOffer, LabelGrant, LabelPair, LabelReply, LabelRequest, SetupMsg, WireKey};

struct PreparedCircuit {
    circuit: Circuit,
    delta: Block,
    gc: GarbledCircuit,
}

impl PreparedCircuit {
    /// `((key0, 0 ^ p), (key1, 1 ^ p))` with `p` the permutation bit of `wire`.
    fn label_pair(&self, wire: usize) -> Option<LabelPair> {
        let [zero, one] = self.gc.label_pair(wire, self.delta)?;
        let p = zero.lsb();
        Some([
            WireKey { key: zero, bit: p },
            WireKey { key: one, bit: !p },
        ])
    }
}

pub struct IssuerSession {
    oblivious_transfer: bool,
    rng: AesRng,
    prepared: Vec<PreparedCircuit>,
    params: Option<SharingParameters>,
    sharing: Option<(Secret, SharingInstance)>,
}

impl IssuerSession {
    pub fn new(oblivious_transfer: bool) -> Self {
        Self {
            oblivious_transfer,
            rng: AesRng::new(),
            prepared: Vec::new(),
            params: None,
            sharing: None,
        }
    }

    fn find(&self, circuit_id: &str) -> Option<&PreparedCircuit> {
        self.prepared.iter().find(|p| p.circuit.id == circuit_id)
    }

    /// Validate and garble `circuit`. Each id can be prepared once.
    pub fn prepare(&mut self, circuit: Circuit) -> Result<&GarbledCircuit, IssuerError> {
        circuit.validate()?;
        if self.find(&circuit.id).is_some() {
            return Err(IssuerError::DuplicateCircuit(circuit.id));
        }

        let start = Instant::now();
        let mut gen = HalfGateGenerator::random(&mut self.rng);
        let gc = gen.garble_fresh(&mut self.rng, &circuit)?;
        info!(
            circuit = %circuit.id,
            and_gates = circuit.nand,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "circuit garbled"
        );

        self.prepared.push(PreparedCircuit {
            delta: gen.delta(),
            circuit,
            gc,
        });
        let prepared = self.prepared.len() - 1;
        Ok(&self.prepared[prepared].gc)
    }

    /// Sharing parameters of this session, generated on first use.
    pub fn init_dealer(&mut self) -> SharingParameters {
        if let Some(params) = self.params {
            return params;
        }
        let params = SharingParameters::generate(&mut self.rng);
        info!("sharing parameters generated");
        self.params = Some(params);
        params
    }

    /// Deal a fresh secret to the given identities. Happens once per session.
    pub fn distribute_shares(
        &mut self,
        identities: &BTreeMap<String, PublicKey>,
        threshold: usize,
    ) -> Result<(Secret, SharingInstance), IssuerError> {
        if self.sharing.is_some() {
            return Err(IssuerError::AlreadyDistributed);
        }
        let params = self.params.ok_or(IssuerError::DealerNotInitialized)?;
        if identities.len() < threshold {
            return Err(IssuerError::InsufficientIdentities {
                threshold,
                supplied: identities.len(),
            });
        }

        let start = Instant::now();
        let (secret, instance) = share_secret(&mut self.rng, &params, identities, threshold)?;
        info!(
            identities = identities.len(),
            threshold,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "shares distributed"
        );
        self.sharing = Some((secret, instance.clone()));
        Ok((secret, instance))
    }

    /// Label pairs for `wires` (every requester wire when empty) of a
    /// prepared circuit, together with the public sharing instance.
    pub fn retrieve_labels(
        &self,
        circuit_id: &str,
        wires: &[usize],
    ) -> Result<LabelGrant, IssuerError> {
        let prepared = self
            .find(circuit_id)
            .ok_or_else(|| IssuerError::UnknownCircuit(circuit_id.to_string()))?;
        let (_, sharing) = self.sharing.as_ref().ok_or(IssuerError::SharingNotReady)?;

        let wires = if wires.is_empty() {
            prepared.circuit.requester_wires.as_slice()
        } else {
            wires
        };
        let mut labels = BTreeMap::new();
        for &wire in wires.iter() {
            let pair = prepared
                .circuit
                .requester_wires
                .contains(&wire)
                .then(|| prepared.label_pair(wire))
                .flatten()
                .ok_or_else(|| IssuerError::UnknownWire {
                    circuit_id: circuit_id.to_string(),
                    wire,
                })?;
            labels.insert(wire, pair);
        }
        debug!(circuit = circuit_id, wires = labels.len(), "labels retrieved");

        Ok(LabelGrant {
            circuit: prepared.circuit.clone(),
            labels,
            sharing: sharing.clone(),
        })
    }

    /// What the gatekeeper may see of every prepared circuit.
    pub fn offers(&self) -> Vec<CircuitOffer> {
        self.prepared
            .iter()
            .map(|p| CircuitOffer {
                circuit: p.circuit.clone(),
                garbled_tables: p.gc.gc_table.clone(),
                output_decode_info: p.gc.decode_info(),
            })
            .collect()
    }

    pub fn secret(&self) -> Option<Secret> {
        self.sharing.as_ref().map(|(secret, _)| *secret)
    }

    pub fn sharing(&self) -> Option<&SharingInstance> {
        self.sharing.as_ref().map(|(_, instance)| instance)
    }

    /// Parameters out, identity keys in, shares out, acknowledgement in.
    pub fn setup_gatekeeper<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        threshold: usize,
    ) -> Result<(), IssuerError> {
        let params = self.init_dealer();
        channel.send_msg(&SetupMsg::Setup {
            params,
            offers: self.offers(),
            oblivious_transfer: self.oblivious_transfer,
        })?;

        let identities = match channel.recv_msg::<SetupMsg>()? {
            SetupMsg::IdentityKeys(keys) => keys,
            _ => return Err(IssuerError::UnexpectedMessage("IdentityKeys")),
        };
        debug!(identities = identities.len(), "received identity keys");

        let (_, instance) = self.distribute_shares(&identities, threshold)?;
        channel.send_msg(&SetupMsg::Shares(instance))?;

        match channel.recv_msg::<SetupMsg>()? {
            SetupMsg::SharesAccepted => Ok(()),
            _ => Err(IssuerError::UnexpectedMessage("SharesAccepted")),
        }
    }

    /// Truth-table audit of every prepared circuit narrow enough to
    /// enumerate, in preparation order. The gatekeeper evaluates the tables
    /// it was offered, with input labels of the same garbling.
    pub fn run_audits<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
    ) -> Result<Vec<AuditReport>, IssuerError> {
        let garbler = AuditGarbler::new(self.oblivious_transfer);
        let mut reports = Vec::new();
        for prepared in self.prepared.iter() {
            if prepared.circuit.ninput_wires() > MAX_AUDIT_INPUTS {
                warn!(circuit = %prepared.circuit.id, "circuit too wide to audit");
                continue;
            }
            let report = garbler.run(
                channel,
                &mut self.rng,
                &prepared.circuit,
                &prepared.gc,
                prepared.delta,
            )?;
            info!("audit table\n{}", report.render());
            reports.push(report);
        }
        Ok(reports)
    }

    /// Answer label requests until the requester hangs up.
    pub fn serve_requester<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
    ) -> Result<(), IssuerError> {
        loop {
            let request = match channel.recv_msg::<LabelRequest>() {
                Ok(request) => request,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            let reply = match self.retrieve_labels(&request.circuit_id, &request.wires) {
                Ok(grant) => LabelReply::Granted(Box::new(grant)),
                Err(IssuerError::UnknownCircuit(circuit_id)) => {
                    warn!(circuit = %circuit_id, "label request for unknown circuit");
                    LabelReply::UnknownCircuit { circuit_id }
                }
                Err(IssuerError::UnknownWire { wire, .. }) => LabelReply::UnknownWire { wire },
                Err(IssuerError::SharingNotReady) => LabelReply::SharingNotReady,
                Err(e) => return Err(e),
            };
            channel.send_msg(&reply)?;
        }
    }
}
