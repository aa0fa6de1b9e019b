//! Truth-table audit between the garbler and the evaluator.
//!
//! The evaluator already holds the garbled tables and output decode bits of a
//! prepared circuit. For every assignment of requester and gatekeeper inputs
//! the garbler sends the requester labels of that circuit directly and the
//! gatekeeper labels through OT (or in the clear when OT is disabled). The
//! evaluator runs the tables, returns the decoded outputs and both sides check
//! them against plaintext evaluation, so tampered tables fail the audit.

use std::collections::BTreeMap;

use circuit::{Circuit, CircuitEvalError};
use crypto_core::{
    utils::{bits_to_string, int_to_bits},
    AbstractChannel, Block,
};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    receive_wirelabels, send_wirelabels, COReceiver, COSender, EvaluatorError, GCEvaluator,
    GarbledCircuit, GarbledCircuitTable, GeneratorError, HalfGateEvaluator, OTReceiverError,
    OTSenderError, OtReceiver, OtSender, OutputDecodeInfo, WireLabel,
};

/// Largest input width the audit enumerates.
pub const MAX_AUDIT_INPUTS: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("circuit has {ninputs} inputs, audit enumerates at most {max}")]
    TooManyInputs { ninputs: usize, max: usize },
    #[error("peer announced {got} audit rows, expected {expected}")]
    RowCountMismatch { expected: usize, got: usize },
    #[error("row {row}: evaluator reported {got:?}, plaintext gives {expected:?}")]
    Mismatch {
        row: usize,
        expected: Vec<bool>,
        got: Vec<bool>,
    },
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),
    #[error(transparent)]
    OTSender(#[from] OTSenderError),
    #[error(transparent)]
    OTReceiver(#[from] OTReceiverError),
    #[error(transparent)]
    Eval(#[from] CircuitEvalError),
    #[error("audit channel failure")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRow {
    pub requester_bits: Vec<bool>,
    pub gatekeeper_bits: Vec<bool>,
    pub outputs: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub circuit_id: String,
    pub rows: Vec<AuditRow>,
}

impl AuditReport {
    /// One line per row: `requester | gatekeeper | outputs`.
    pub fn render(&self) -> String {
        let mut out = format!("{}: requester | gatekeeper | outputs\n", self.circuit_id);
        for row in self.rows.iter() {
            out.push_str(&format!(
                "{} | {} | {}\n",
                bits_to_string(&row.requester_bits),
                bits_to_string(&row.gatekeeper_bits),
                bits_to_string(&row.outputs)
            ));
        }
        out
    }
}

/// Every input assignment, requester bits most significant.
pub fn assignments(circ: &Circuit) -> Result<Vec<(Vec<bool>, Vec<bool>)>, AuditError> {
    let nreq = circ.requester_wires.len();
    let ngk = circ.gatekeeper_wires.len();
    let ninputs = nreq + ngk;
    if ninputs > MAX_AUDIT_INPUTS {
        return Err(AuditError::TooManyInputs {
            ninputs,
            max: MAX_AUDIT_INPUTS,
        });
    }
    Ok((0..1u64 << ninputs)
        .map(|x| {
            let bits = int_to_bits(x, ninputs);
            let (req, gk) = bits.split_at(nreq);
            (req.to_vec(), gk.to_vec())
        })
        .collect())
}

/// Garbler side of the audit.
pub struct AuditGarbler {
    oblivious_transfer: bool,
}

impl AuditGarbler {
    pub fn new(oblivious_transfer: bool) -> Self {
        Self { oblivious_transfer }
    }

    /// Audit `gc`, garbled from `circ` under `delta`.
    pub fn run<C: AbstractChannel, R: Rng + CryptoRng>(
        &self,
        channel: &mut C,
        rng: &mut R,
        circ: &Circuit,
        gc: &GarbledCircuit,
        delta: Block,
    ) -> Result<AuditReport, AuditError> {
        let rows = assignments(circ)?;
        let pairs = circ
            .gatekeeper_wires
            .iter()
            .map(|&id| {
                gc.label_pair(id, delta)
                    .ok_or(GeneratorError::UnknownInputWire(id))
            })
            .collect::<Result<Vec<[Block; 2]>, GeneratorError>>()?;
        channel.write_usize(rows.len())?;
        channel.flush()?;

        let mut report = AuditReport {
            circuit_id: circ.id.clone(),
            rows: Vec::with_capacity(rows.len()),
        };
        for (row, (requester_bits, gatekeeper_bits)) in rows.into_iter().enumerate() {
            let requester_labels = circ
                .requester_wires
                .iter()
                .zip(requester_bits.iter())
                .map(|(&id, &bit)| {
                    let pair = gc
                        .label_pair(id, delta)
                        .ok_or(GeneratorError::UnknownInputWire(id))?;
                    Ok(WireLabel {
                        id,
                        label: pair[bit as usize],
                    })
                })
                .collect::<Result<Vec<_>, GeneratorError>>()?;
            send_wirelabels(channel, &requester_labels)?;

            if self.oblivious_transfer {
                COSender.send(channel, &pairs, rng)?;
            } else {
                for [zero, one] in pairs.iter() {
                    channel.write_block(zero)?;
                    channel.write_block(one)?;
                }
                channel.flush()?;
            }

            let outputs = channel.read_bools(circ.noutput_wires())?;
            let expected = circ.eval_split(&requester_bits, &gatekeeper_bits)?;
            if outputs != expected {
                return Err(AuditError::Mismatch {
                    row,
                    expected,
                    got: outputs,
                });
            }
            debug!(
                circuit = %circ.id,
                row,
                outputs = %bits_to_string(&outputs),
                "audit row verified"
            );
            report.rows.push(AuditRow {
                requester_bits,
                gatekeeper_bits,
                outputs,
            });
        }

        info!(circuit = %circ.id, rows = report.rows.len(), "audit complete");
        Ok(report)
    }
}

/// Evaluator side of the audit.
pub struct AuditEvaluator {
    oblivious_transfer: bool,
}

impl AuditEvaluator {
    pub fn new(oblivious_transfer: bool) -> Self {
        Self { oblivious_transfer }
    }

    /// Audit the offered `gc_table` and `decode_info` of `circ`.
    pub fn run<C: AbstractChannel, R: Rng + CryptoRng>(
        &self,
        channel: &mut C,
        rng: &mut R,
        circ: &Circuit,
        gc_table: &GarbledCircuitTable,
        decode_info: &[OutputDecodeInfo],
    ) -> Result<AuditReport, AuditError> {
        let rows = assignments(circ)?;
        let announced = channel.read_usize()?;
        if announced != rows.len() {
            return Err(AuditError::RowCountMismatch {
                expected: rows.len(),
                got: announced,
            });
        }

        let mut report = AuditReport {
            circuit_id: circ.id.clone(),
            rows: Vec::with_capacity(rows.len()),
        };
        for (row, (requester_bits, gatekeeper_bits)) in rows.into_iter().enumerate() {
            let mut labels = receive_wirelabels(channel, circ.requester_wires.len())?;

            let chosen = if self.oblivious_transfer {
                COReceiver.receive(channel, &gatekeeper_bits, rng)?
            } else {
                let mut chosen = Vec::with_capacity(gatekeeper_bits.len());
                for bit in gatekeeper_bits.iter() {
                    let zero = channel.read_block()?;
                    let one = channel.read_block()?;
                    chosen.push(if *bit { one } else { zero });
                }
                chosen
            };
            labels.extend(
                circ.gatekeeper_wires
                    .iter()
                    .zip(chosen)
                    .map(|(&id, label)| WireLabel { id, label }),
            );

            let mut ev = HalfGateEvaluator::new();
            let output_labels = ev.eval(circ, gc_table, &labels)?;
            let outputs = ev.finalize(&output_labels, decode_info)?;
            channel.write_bools(&outputs)?;
            channel.flush()?;

            let expected = circ.eval_split(&requester_bits, &gatekeeper_bits)?;
            if outputs != expected {
                return Err(AuditError::Mismatch {
                    row,
                    expected,
                    got: outputs,
                });
            }

            report.rows.push(AuditRow {
                requester_bits,
                gatekeeper_bits,
                outputs,
            });
        }
        Ok(report)
    }
}

/// Plaintext truth table, for comparing against a received report.
pub fn plaintext_report(circ: &Circuit) -> Result<AuditReport, AuditError> {
    let rows = assignments(circ)?
        .into_iter()
        .map(|(requester_bits, gatekeeper_bits)| {
            let inputs: BTreeMap<usize, bool> = circ
                .input_wires()
                .zip(requester_bits.iter().chain(gatekeeper_bits.iter()).copied())
                .collect();
            let outputs = circ.eval(&inputs)?;
            Ok(AuditRow {
                requester_bits,
                gatekeeper_bits,
                outputs,
            })
        })
        .collect::<Result<Vec<_>, AuditError>>()?;
    Ok(AuditReport {
        circuit_id: circ.id.clone(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HalfGateGenerator;
    use crypto_core::{local_channel_pair, AesRng};
    use std::thread;

    fn garble(circ: &Circuit) -> (GarbledCircuit, Block) {
        let mut rng = AesRng::new();
        let mut gen = HalfGateGenerator::random(&mut rng);
        let gc = gen.garble_fresh(&mut rng, circ).unwrap();
        (gc, gen.delta())
    }

    /// Audit `gc` while the evaluator holds `table` and `decode_info`.
    fn run_audit(
        circ: Circuit,
        oblivious_transfer: bool,
        gc: GarbledCircuit,
        delta: Block,
        table: GarbledCircuitTable,
        decode_info: Vec<OutputDecodeInfo>,
    ) -> (
        Result<AuditReport, AuditError>,
        Result<AuditReport, AuditError>,
    ) {
        let (mut gen_channel, mut ev_channel) = local_channel_pair().unwrap();
        let gen_circ = circ.clone();
        let handle = thread::spawn(move || {
            let mut rng = AesRng::new();
            AuditGarbler::new(oblivious_transfer).run(
                &mut gen_channel,
                &mut rng,
                &gen_circ,
                &gc,
                delta,
            )
        });

        let mut rng = AesRng::new();
        let ev_report = AuditEvaluator::new(oblivious_transfer).run(
            &mut ev_channel,
            &mut rng,
            &circ,
            &table,
            &decode_info,
        );
        (handle.join().unwrap(), ev_report)
    }

    fn honest_audit(circ: Circuit, oblivious_transfer: bool) -> (AuditReport, AuditReport) {
        let (gc, delta) = garble(&circ);
        let table = gc.gc_table.clone();
        let decode_info = gc.decode_info();
        let (gen_report, ev_report) =
            run_audit(circ, oblivious_transfer, gc, delta, table, decode_info);
        (gen_report.unwrap(), ev_report.unwrap())
    }

    fn default_circuit(id: &str) -> Circuit {
        Circuit::load_file("../circuit/circuit_files/default.json")
            .unwrap()
            .into_iter()
            .find(|c| c.id == id)
            .unwrap()
    }

    #[test]
    fn audit_with_ot_matches_plaintext() {
        let circ = default_circuit("Audit");
        let (gen_report, ev_report) = honest_audit(circ.clone(), true);
        assert_eq!(gen_report, ev_report);
        assert_eq!(gen_report.rows.len(), 16);
        assert_eq!(gen_report, plaintext_report(&circ).unwrap());
    }

    #[test]
    fn audit_without_ot_matches_plaintext() {
        let circ = default_circuit("Smart");
        let (gen_report, ev_report) = honest_audit(circ.clone(), false);
        assert_eq!(gen_report, ev_report);
        assert_eq!(
            ev_report.rows.iter().map(|r| r.outputs[0]).collect::<Vec<_>>(),
            vec![false, false, true, false]
        );
        assert!(gen_report.render().contains("1 0 |  | 1"));
    }

    #[test]
    fn flipped_decode_bits_fail_the_audit() {
        let circ = default_circuit("Audit");
        let (gc, delta) = garble(&circ);
        let table = gc.gc_table.clone();
        let decode_info = gc
            .decode_info()
            .into_iter()
            .map(|d| OutputDecodeInfo {
                id: d.id,
                decode_info: !d.decode_info,
            })
            .collect();

        let (gen_report, ev_report) = run_audit(circ, true, gc, delta, table, decode_info);
        assert!(matches!(gen_report, Err(AuditError::Mismatch { row: 0, .. })));
        assert!(matches!(ev_report, Err(AuditError::Mismatch { row: 0, .. })));
    }

    #[test]
    fn tables_of_another_garbling_fail_the_audit() {
        let circ = default_circuit("Audit");
        let (gc, delta) = garble(&circ);
        let (other, _) = garble(&circ);

        let (gen_report, ev_report) = run_audit(
            circ,
            false,
            gc,
            delta,
            other.gc_table.clone(),
            other.decode_info(),
        );
        assert!(matches!(gen_report, Err(AuditError::Mismatch { .. })));
        assert!(matches!(ev_report, Err(AuditError::Mismatch { .. })));
    }

    #[test]
    fn audit_rejects_wide_circuits() {
        let circ = Circuit::new("wide", (0..17).collect(), vec![], vec![0], vec![]).unwrap();
        assert!(matches!(
            assignments(&circ),
            Err(AuditError::TooManyInputs { ninputs: 17, .. })
        ));
    }

    #[test]
    fn audit_detects_row_count_mismatch() {
        let circ = default_circuit("Smart");
        let (gc, _) = garble(&circ);
        let (mut gen_channel, mut ev_channel) = local_channel_pair().unwrap();
        gen_channel.write_usize(3).unwrap();
        gen_channel.flush().unwrap();
        let mut rng = AesRng::new();
        assert!(matches!(
            AuditEvaluator::new(true).run(
                &mut ev_channel,
                &mut rng,
                &circ,
                &gc.gc_table,
                &gc.decode_info()
            ),
            Err(AuditError::RowCountMismatch { expected: 4, got: 3 })
        ));
    }
}
