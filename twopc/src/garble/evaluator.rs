use super::errors::EvaluatorError;
use super::gc::{GarbledCircuitTable, OutputDecodeInfo, WireLabel};
use circuit::{Circuit, Gate};
use crypto_core::{block::SELECT_MASK, Block, AES_HASH};

pub trait GCEvaluator {
    /// Evaluate a garbled circuit and return the output value labels.
    fn eval(
        &mut self,
        circ: &Circuit,
        gc: &GarbledCircuitTable,
        input_value_labels: &[WireLabel],
    ) -> Result<Vec<WireLabel>, EvaluatorError>;

    /// Decode output value labels into bits.
    fn finalize(
        &self,
        output_value_labels: &[WireLabel],
        output_decode_info: &[OutputDecodeInfo],
    ) -> Result<Vec<bool>, EvaluatorError>;
}

/// Evaluator side of half gates. The gate counter must start where the
/// generator's started, so use a new evaluator per garbled circuit.
#[derive(Default)]
pub struct HalfGateEvaluator {
    counter: u128,
}

impl HalfGateEvaluator {
    pub fn new() -> Self {
        Self { counter: 0 }
    }

    #[inline]
    pub fn and_gate(&mut self, x: Block, y: Block, table: [Block; 2]) -> Block {
        let sa = x.lsb() as usize;
        let sb = y.lsb() as usize;

        let index = self.counter;
        self.counter += 1;
        let index_next = self.counter;
        self.counter += 1;

        let hash_x = AES_HASH.tccr_hash(index.into(), x);
        let hash_y = AES_HASH.tccr_hash(index_next.into(), y);

        let w_g = hash_x ^ (SELECT_MASK[sa] & table[0]);
        let w_e = hash_y ^ (SELECT_MASK[sb] & (table[1] ^ x));

        w_g ^ w_e
    }

    #[inline]
    pub fn xor_gate(&self, x: Block, y: Block) -> Block {
        x ^ y
    }

    #[inline]
    pub fn inv_gate(&self, x: Block, public_one_label: Block) -> Block {
        x ^ public_one_label
    }
}

impl GCEvaluator for HalfGateEvaluator {
    fn eval(
        &mut self,
        circ: &Circuit,
        gc: &GarbledCircuitTable,
        input_value_labels: &[WireLabel],
    ) -> Result<Vec<WireLabel>, EvaluatorError> {
        if input_value_labels.len() != circ.ninput_wires() {
            return Err(EvaluatorError::InputLabelCount {
                expected: circ.ninput_wires(),
                got: input_value_labels.len(),
            });
        }

        let mut wire_labels: Vec<Option<Block>> = vec![None; circ.nwires];
        for input_value_label in input_value_labels {
            let slot = wire_labels
                .get_mut(input_value_label.id)
                .ok_or(EvaluatorError::UninitializedLabel(input_value_label.id))?;
            *slot = Some(input_value_label.label);
        }

        let mut rows = gc.table.iter();
        for gate in circ.gates.iter() {
            match *gate {
                Gate::Inv { lin_id, out_id, .. } => {
                    let x =
                        wire_labels[lin_id].ok_or(EvaluatorError::UninitializedLabel(lin_id))?;
                    let z = self.inv_gate(x, gc.public_one_label);

                    wire_labels[out_id] = Some(z);
                }
                Gate::Xor {
                    lin_id,
                    rin_id,
                    out_id,
                    ..
                } => {
                    let x =
                        wire_labels[lin_id].ok_or(EvaluatorError::UninitializedLabel(lin_id))?;
                    let y =
                        wire_labels[rin_id].ok_or(EvaluatorError::UninitializedLabel(rin_id))?;
                    let z = self.xor_gate(x, y);

                    wire_labels[out_id] = Some(z);
                }
                Gate::And {
                    lin_id,
                    rin_id,
                    out_id,
                    ..
                } => {
                    let x =
                        wire_labels[lin_id].ok_or(EvaluatorError::UninitializedLabel(lin_id))?;
                    let y =
                        wire_labels[rin_id].ok_or(EvaluatorError::UninitializedLabel(rin_id))?;
                    let row = rows
                        .next()
                        .ok_or(EvaluatorError::TableExhausted(gc.table.len()))?;
                    let z = self.and_gate(x, y, *row);

                    wire_labels[out_id] = Some(z);
                }
            };
        }

        circ.output_wires
            .iter()
            .map(|&id| {
                let label = wire_labels[id].ok_or(EvaluatorError::UninitializedLabel(id))?;
                Ok(WireLabel { id, label })
            })
            .collect()
    }

    fn finalize(
        &self,
        output_value_labels: &[WireLabel],
        output_decode_info: &[OutputDecodeInfo],
    ) -> Result<Vec<bool>, EvaluatorError> {
        if output_value_labels.len() != output_decode_info.len() {
            return Err(EvaluatorError::DecodeInfoMismatch {
                expected: output_value_labels.len(),
                got: output_decode_info.len(),
            });
        }
        Ok(output_value_labels
            .iter()
            .zip(output_decode_info.iter())
            .map(|(x, y)| x.label.lsb() ^ y.decode_info)
            .collect())
    }
}
