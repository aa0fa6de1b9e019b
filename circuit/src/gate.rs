//! Define the structure of gates and circuits.
//! Part of the code is derived from TLSNotary. https://github.com/tlsnotary/tlsn

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::{CircuitError, CircuitEvalError};

/// Negations around an AND gate. Every two-input gate that is not linear
/// (AND, NAND, OR, NOR) is `(a ⊕ lin) ∧ (b ⊕ rin) ⊕ out`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndForm {
    pub negate_lin: bool,
    pub negate_rin: bool,
    pub negate_out: bool,
}

impl AndForm {
    pub const AND: AndForm = AndForm::new(false, false, false);
    pub const NAND: AndForm = AndForm::new(false, false, true);
    pub const OR: AndForm = AndForm::new(true, true, true);
    pub const NOR: AndForm = AndForm::new(true, true, false);

    pub const fn new(negate_lin: bool, negate_rin: bool, negate_out: bool) -> Self {
        Self {
            negate_lin,
            negate_rin,
            negate_out,
        }
    }

    #[inline]
    pub fn apply(&self, x: bool, y: bool) -> bool {
        ((x ^ self.negate_lin) & (y ^ self.negate_rin)) ^ self.negate_out
    }
}

/// `gate_id`: the gate id.
/// `lin_id`, `rin_id` are the wire ids of two fan-in gate inputs.
/// `out_id` is the wire id of the gate output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gate {
    /// XOR, or XNOR when `negated`.
    Xor {
        gate_id: usize,
        lin_id: usize,
        rin_id: usize,
        out_id: usize,
        negated: bool,
    },
    And {
        gate_id: usize,
        lin_id: usize,
        rin_id: usize,
        out_id: usize,
        form: AndForm,
    },
    Inv {
        gate_id: usize,
        lin_id: usize,
        out_id: usize,
    },
}

impl Gate {
    pub fn gate_id(&self) -> usize {
        match *self {
            Gate::Xor { gate_id, .. } | Gate::And { gate_id, .. } | Gate::Inv { gate_id, .. } => {
                gate_id
            }
        }
    }

    pub fn out_id(&self) -> usize {
        match *self {
            Gate::Xor { out_id, .. } | Gate::And { out_id, .. } | Gate::Inv { out_id, .. } => {
                out_id
            }
        }
    }

    pub fn input_ids(&self) -> Vec<usize> {
        match *self {
            Gate::Xor { lin_id, rin_id, .. } | Gate::And { lin_id, rin_id, .. } => {
                vec![lin_id, rin_id]
            }
            Gate::Inv { lin_id, .. } => vec![lin_id],
        }
    }
}

/// A boolean circuit whose inputs are split between the requester and the
/// gatekeeper. Wire ids are arbitrary but must be below `nwires`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    /// Circuit identifier used to look the circuit up.
    pub id: String,
    /// Number of wires
    pub nwires: usize,
    /// Requester-controlled input wires, in attribute order.
    pub requester_wires: Vec<usize>,
    /// Gatekeeper-controlled input wires.
    pub gatekeeper_wires: Vec<usize>,
    /// Output wires, in output order.
    pub output_wires: Vec<usize>,
    /// All gates in the circuit, in topological order.
    pub gates: Vec<Gate>,
    /// Number of AND-like gates
    pub nand: usize,
    /// Number of XOR/XNOR gates
    pub nxor: usize,
    /// Number of INV gates
    pub ninv: usize,
}

impl Circuit {
    /// Build and validate a circuit.
    pub fn new(
        id: impl Into<String>,
        requester_wires: Vec<usize>,
        gatekeeper_wires: Vec<usize>,
        output_wires: Vec<usize>,
        gates: Vec<Gate>,
    ) -> Result<Self, CircuitError> {
        let nwires = requester_wires
            .iter()
            .chain(gatekeeper_wires.iter())
            .chain(output_wires.iter())
            .copied()
            .chain(gates.iter().flat_map(|g| {
                let mut ids = g.input_ids();
                ids.push(g.out_id());
                ids
            }))
            .max()
            .map_or(0, |m| m + 1);

        let (nand, nxor, ninv) = count_gates(&gates);

        let circ = Self {
            id: id.into(),
            nwires,
            requester_wires,
            gatekeeper_wires,
            output_wires,
            gates,
            nand,
            nxor,
            ninv,
        };
        circ.validate()?;
        Ok(circ)
    }

    pub fn ninput_wires(&self) -> usize {
        self.requester_wires.len() + self.gatekeeper_wires.len()
    }

    pub fn noutput_wires(&self) -> usize {
        self.output_wires.len()
    }

    /// All input wires: requester wires first, then gatekeeper wires.
    pub fn input_wires(&self) -> impl Iterator<Item = usize> + '_ {
        self.requester_wires
            .iter()
            .chain(self.gatekeeper_wires.iter())
            .copied()
    }

    /// Check the wire topology: disjoint input sets, every gate reads only
    /// defined wires, every wire is written once, every output is defined.
    pub fn validate(&self) -> Result<(), CircuitError> {
        let in_range = |wire: usize| {
            if wire < self.nwires {
                Ok(())
            } else {
                Err(CircuitError::WireOutOfRange {
                    wire,
                    nwires: self.nwires,
                })
            }
        };

        let requester: BTreeSet<usize> = self.requester_wires.iter().copied().collect();
        if requester.len() != self.requester_wires.len() {
            return Err(CircuitError::DuplicateInput(first_duplicate(
                &self.requester_wires,
            )));
        }

        let mut defined = requester;
        let mut gatekeeper = BTreeSet::new();
        for &wire in self.gatekeeper_wires.iter() {
            if defined.contains(&wire) {
                return Err(CircuitError::OverlappingInputs(wire));
            }
            if !gatekeeper.insert(wire) {
                return Err(CircuitError::DuplicateInput(wire));
            }
        }
        defined.extend(gatekeeper);
        for &wire in defined.iter() {
            in_range(wire)?;
        }

        for gate in self.gates.iter() {
            let gate_id = gate.gate_id();
            for wire in gate.input_ids() {
                if !defined.contains(&wire) {
                    return Err(CircuitError::UndeclaredWire { gate_id, wire });
                }
            }
            let out = gate.out_id();
            in_range(out)?;
            if !defined.insert(out) {
                return Err(CircuitError::WireRedefined { gate_id, wire: out });
            }
        }

        if self.output_wires.is_empty() {
            return Err(CircuitError::NoOutputs);
        }
        for &wire in self.output_wires.iter() {
            if !defined.contains(&wire) {
                return Err(CircuitError::UnknownOutput(wire));
            }
        }

        if count_gates(&self.gates) != (self.nand, self.nxor, self.ninv) {
            return Err(CircuitError::CountMismatch);
        }
        Ok(())
    }

    /// Evaluate the circuit in plaintext with the provided input assignment.
    pub fn eval(&self, inputs: &BTreeMap<usize, bool>) -> Result<Vec<bool>, CircuitEvalError> {
        let mut wires: Vec<Option<bool>> = vec![None; self.nwires];
        for wire in self.input_wires() {
            let value = inputs
                .get(&wire)
                .ok_or(CircuitEvalError::MissingInput(wire))?;
            wires[wire] = Some(*value);
        }

        for gate in self.gates.iter() {
            let (out_id, val) = match *gate {
                Gate::Xor {
                    lin_id,
                    rin_id,
                    out_id,
                    negated,
                    ..
                } => {
                    let x = wires[lin_id].ok_or(CircuitEvalError::UninitializedValue(lin_id))?;
                    let y = wires[rin_id].ok_or(CircuitEvalError::UninitializedValue(rin_id))?;
                    (out_id, x ^ y ^ negated)
                }
                Gate::And {
                    lin_id,
                    rin_id,
                    out_id,
                    form,
                    ..
                } => {
                    let x = wires[lin_id].ok_or(CircuitEvalError::UninitializedValue(lin_id))?;
                    let y = wires[rin_id].ok_or(CircuitEvalError::UninitializedValue(rin_id))?;
                    (out_id, form.apply(x, y))
                }
                Gate::Inv { lin_id, out_id, .. } => {
                    let x = wires[lin_id].ok_or(CircuitEvalError::UninitializedValue(lin_id))?;
                    (out_id, !x)
                }
            };
            wires[out_id] = Some(val);
        }

        self.output_wires
            .iter()
            .map(|&id| wires[id].ok_or(CircuitEvalError::UninitializedValue(id)))
            .collect()
    }

    /// Evaluate with requester and gatekeeper bits given in wire-declaration order.
    pub fn eval_split(
        &self,
        requester_bits: &[bool],
        gatekeeper_bits: &[bool],
    ) -> Result<Vec<bool>, CircuitEvalError> {
        let got = requester_bits.len() + gatekeeper_bits.len();
        if requester_bits.len() != self.requester_wires.len()
            || gatekeeper_bits.len() != self.gatekeeper_wires.len()
        {
            return Err(CircuitEvalError::InvalidInputCount {
                expected: self.ninput_wires(),
                got,
            });
        }
        let inputs = self
            .input_wires()
            .zip(requester_bits.iter().chain(gatekeeper_bits.iter()).copied())
            .collect();
        self.eval(&inputs)
    }
}

fn count_gates(gates: &[Gate]) -> (usize, usize, usize) {
    gates.iter().fold((0, 0, 0), |(a, x, i), gate| match gate {
        Gate::And { .. } => (a + 1, x, i),
        Gate::Xor { .. } => (a, x + 1, i),
        Gate::Inv { .. } => (a, x, i + 1),
    })
}

fn first_duplicate(wires: &[usize]) -> usize {
    let mut seen = BTreeSet::new();
    wires
        .iter()
        .copied()
        .find(|w| !seen.insert(*w))
        .unwrap_or_default()
}
