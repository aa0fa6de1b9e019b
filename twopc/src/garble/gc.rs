//! Define the struct of garbled circuit.

use std::collections::BTreeMap;

use crypto_core::Block;
use serde::{Deserialize, Serialize};

use super::errors::GeneratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireLabel {
    /// wire id
    pub id: usize,
    ///  wire label
    pub label: Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDecodeInfo {
    /// Output wire id
    pub id: usize,
    /// Output decode info
    pub decode_info: bool,
}

/// garbled tables and related info (independent of the inputs) sent to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarbledCircuitTable {
    pub table: Vec<[Block; 2]>,
    pub public_one_label: Block,
}

impl GarbledCircuitTable {
    pub fn new(table: Vec<[Block; 2]>, public_one_label: Block) -> Self {
        Self {
            table,
            public_one_label,
        }
    }
}

/// The garbler's view of a garbled circuit. The zero labels never leave the
/// garbler; the one label of a wire is `zero ^ delta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarbledCircuit {
    pub gc_table: GarbledCircuitTable,
    pub input_zero_labels: Vec<WireLabel>,
    pub output_zero_labels: Vec<WireLabel>,
}

impl GarbledCircuit {
    pub fn new(
        gc_table: GarbledCircuitTable,
        input_zero_labels: Vec<WireLabel>,
        output_zero_labels: Vec<WireLabel>,
    ) -> Self {
        Self {
            gc_table,
            input_zero_labels,
            output_zero_labels,
        }
    }

    pub fn zero_label(&self, wire: usize) -> Option<Block> {
        self.input_zero_labels
            .iter()
            .find(|wl| wl.id == wire)
            .map(|wl| wl.label)
    }

    /// `[label for 0, label for 1]` of an input wire.
    pub fn label_pair(&self, wire: usize, delta: Block) -> Option<[Block; 2]> {
        self.zero_label(wire).map(|zero| [zero, zero ^ delta])
    }

    pub fn decode_info(&self) -> Vec<OutputDecodeInfo> {
        decode_info(&self.output_zero_labels)
    }
}

/// Select the value label of every input wire, in `labels` order.
pub fn encode(
    labels: &[WireLabel],
    inputs: &BTreeMap<usize, bool>,
    delta: Block,
) -> Result<Vec<WireLabel>, GeneratorError> {
    labels
        .iter()
        .map(|x| {
            let value = inputs
                .get(&x.id)
                .ok_or(GeneratorError::MissingInput(x.id))?;
            let label = if *value { x.label ^ delta } else { x.label };
            Ok(WireLabel { id: x.id, label })
        })
        .collect()
}

pub fn decode_info(labels: &[WireLabel]) -> Vec<OutputDecodeInfo> {
    labels
        .iter()
        .map(|x| OutputDecodeInfo {
            id: x.id,
            decode_info: x.label.lsb(),
        })
        .collect()
}
