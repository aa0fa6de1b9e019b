//! Half-gate garbling with free XOR.
//! Part of the code is derived from TLSNotary.

use super::errors::GeneratorError;
use super::gc::{decode_info, GarbledCircuit, GarbledCircuitTable, OutputDecodeInfo, WireLabel};
use circuit::{AndForm, Circuit, Gate};
use crypto_core::{
    block::{Block, SELECT_MASK},
    AES_HASH,
};
use rand::{CryptoRng, Rng};

pub trait GCGenerator {
    /// Generate a garbled circuit from the zero labels of its input wires.
    fn garble<R: Rng + CryptoRng>(
        &mut self,
        rng: &mut R,
        circ: &Circuit,
        input_zero_labels: &[WireLabel],
    ) -> Result<GarbledCircuit, GeneratorError>;

    /// Decoding information revealed to the evaluator.
    fn finalize(&self, output_zero_labels: &[WireLabel]) -> Vec<OutputDecodeInfo>;
}

pub struct HalfGateGenerator {
    counter: u128,
    delta: Block,
}

#[inline]
fn swap(x: [Block; 2], negate: bool) -> [Block; 2] {
    if negate {
        [x[1], x[0]]
    } else {
        x
    }
}

impl HalfGateGenerator {
    /// `delta` must have its least significant bit set.
    pub fn new(delta: Block) -> Self {
        Self { counter: 0, delta }
    }

    /// A generator with a fresh global offset.
    pub fn random<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        Self::new(rng.gen::<Block>().set_lsb())
    }

    pub fn delta(&self) -> Block {
        self.delta
    }

    #[inline]
    pub fn and_gate(&mut self, x: [Block; 2], y: [Block; 2]) -> ([Block; 2], [Block; 2]) {
        let pa = x[0].lsb() as usize;
        let pb = y[0].lsb() as usize;

        let index = self.counter;
        self.counter += 1;
        let index_next = self.counter;
        self.counter += 1;

        let hash_x0 = AES_HASH.tccr_hash(index.into(), x[0]);
        let hash_y0 = AES_HASH.tccr_hash(index_next.into(), y[0]);

        // First half gate: garbler knows pb
        let t_g = hash_x0 ^ AES_HASH.tccr_hash(index.into(), x[1]) ^ (SELECT_MASK[pb] & self.delta);
        // Output label w_g for wire 0
        let w_g = hash_x0 ^ (SELECT_MASK[pa] & t_g);

        // Second half gate: evaluator knows (pb xor b)
        let t_e = hash_y0 ^ AES_HASH.tccr_hash(index_next.into(), y[1]) ^ x[0];
        // Output label w_e for wire 0
        let w_e = hash_y0 ^ (SELECT_MASK[pb] & (t_e ^ x[0]));

        let z_0 = w_g ^ w_e;
        let z = [z_0, z_0 ^ self.delta];

        (z, [t_g, t_e])
    }

    /// AND with optional negation of each input and of the output. Negating
    /// a wire swaps its label pair, so the evaluator runs a plain AND.
    #[inline]
    pub fn and_form_gate(
        &mut self,
        x: [Block; 2],
        y: [Block; 2],
        form: AndForm,
    ) -> ([Block; 2], [Block; 2]) {
        let (z, t) = self.and_gate(swap(x, form.negate_lin), swap(y, form.negate_rin));
        (swap(z, form.negate_out), t)
    }

    #[inline]
    pub fn xor_gate(&self, x: [Block; 2], y: [Block; 2], negated: bool) -> [Block; 2] {
        let z_0 = x[0] ^ y[0];
        swap([z_0, z_0 ^ self.delta], negated)
    }

    #[inline]
    pub fn inv_gate(&self, x: [Block; 2], public_one_label: Block) -> [Block; 2] {
        self.xor_gate(x, [public_one_label ^ self.delta, public_one_label], false)
    }

    pub fn gen_core(
        &mut self,
        circ: &Circuit,
        input_zero_labels: &[WireLabel],
        public_one_label: Block,
    ) -> Result<(Vec<[Block; 2]>, Vec<WireLabel>), GeneratorError> {
        if input_zero_labels.len() != circ.ninput_wires() {
            return Err(GeneratorError::InputLabelCount {
                expected: circ.ninput_wires(),
                got: input_zero_labels.len(),
            });
        }

        let mut table: Vec<[Block; 2]> = Vec::with_capacity(circ.nand);
        let mut wire_labels: Vec<Option<[Block; 2]>> = vec![None; circ.nwires];

        // Initiate input labels.
        for wire in circ.input_wires() {
            let label = input_zero_labels
                .iter()
                .find(|wl| wl.id == wire)
                .ok_or(GeneratorError::UnknownInputWire(wire))?;
            wire_labels[wire] = Some([label.label, label.label ^ self.delta]);
        }

        // Process each gate
        for gate in circ.gates.iter() {
            match *gate {
                Gate::Inv { lin_id, out_id, .. } => {
                    let x =
                        wire_labels[lin_id].ok_or(GeneratorError::UninitializedLabel(lin_id))?;

                    let z = self.inv_gate(x, public_one_label);
                    wire_labels[out_id] = Some(z);
                }
                Gate::Xor {
                    lin_id,
                    rin_id,
                    out_id,
                    negated,
                    ..
                } => {
                    let x =
                        wire_labels[lin_id].ok_or(GeneratorError::UninitializedLabel(lin_id))?;
                    let y =
                        wire_labels[rin_id].ok_or(GeneratorError::UninitializedLabel(rin_id))?;
                    let z = self.xor_gate(x, y, negated);
                    wire_labels[out_id] = Some(z);
                }
                Gate::And {
                    lin_id,
                    rin_id,
                    out_id,
                    form,
                    ..
                } => {
                    let x =
                        wire_labels[lin_id].ok_or(GeneratorError::UninitializedLabel(lin_id))?;
                    let y =
                        wire_labels[rin_id].ok_or(GeneratorError::UninitializedLabel(rin_id))?;
                    let (z, t) = self.and_form_gate(x, y, form);
                    table.push(t);
                    wire_labels[out_id] = Some(z);
                }
            };
        }

        let output_zero_labels = circ
            .output_wires
            .iter()
            .map(|&id| {
                let pair = wire_labels[id].ok_or(GeneratorError::UninitializedLabel(id))?;
                Ok(WireLabel { id, label: pair[0] })
            })
            .collect::<Result<Vec<_>, GeneratorError>>()?;

        Ok((table, output_zero_labels))
    }

    /// Garble `circ` with fresh random zero labels on every input wire.
    pub fn garble_fresh<R: Rng + CryptoRng>(
        &mut self,
        rng: &mut R,
        circ: &Circuit,
    ) -> Result<GarbledCircuit, GeneratorError> {
        let input_zero_labels: Vec<WireLabel> = circ
            .input_wires()
            .map(|id| WireLabel {
                id,
                label: rng.gen::<Block>(),
            })
            .collect();
        self.garble(rng, circ, &input_zero_labels)
    }
}

impl GCGenerator for HalfGateGenerator {
    fn garble<R: Rng + CryptoRng>(
        &mut self,
        rng: &mut R,
        circ: &Circuit,
        input_zero_labels: &[WireLabel],
    ) -> Result<GarbledCircuit, GeneratorError> {
        // Generate a random label for public 1.
        let public_one_label = rng.gen::<Block>() ^ self.delta;

        let (table, output_zero_labels) = self.gen_core(circ, input_zero_labels, public_one_label)?;

        let gc_table = GarbledCircuitTable::new(table, public_one_label);

        Ok(GarbledCircuit::new(
            gc_table,
            input_zero_labels.to_vec(),
            output_zero_labels,
        ))
    }

    fn finalize(&self, output_zero_labels: &[WireLabel]) -> Vec<OutputDecodeInfo> {
        decode_info(output_zero_labels)
    }
}
