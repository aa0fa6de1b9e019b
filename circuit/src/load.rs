//! Load circuits from JSON descriptor files and Bristol format files.
//! The Bristol parser is derived from TLSNotary. https://github.com/tlsnotary/tlsn

use crate::errors::{CircuitError, CircuitLoadError};
use crate::gate::{AndForm, Circuit, Gate};
use anyhow::{anyhow, Context};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// A file holding one or more named circuits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitFile {
    pub name: String,
    pub circuits: Vec<CircuitDescriptor>,
}

/// Serialized form of a single circuit. `alice` lists the requester wires
/// and `bob` the gatekeeper wires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitDescriptor {
    pub id: String,
    #[serde(rename = "alice", default)]
    pub requester_wires: Vec<usize>,
    #[serde(rename = "bob", default)]
    pub gatekeeper_wires: Vec<usize>,
    #[serde(rename = "out")]
    pub output_wires: Vec<usize>,
    pub gates: Vec<GateDescriptor>,
}

/// A gate writing wire `id` from the wires in `inputs`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDescriptor {
    pub id: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "in")]
    pub inputs: Vec<usize>,
}

impl CircuitFile {
    /// Parse a circuit file from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, CircuitLoadError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validate every descriptor in the file.
    pub fn into_circuits(self) -> Result<Vec<Circuit>, CircuitLoadError> {
        self.circuits
            .iter()
            .map(|desc| Circuit::from_descriptor(desc).map_err(CircuitLoadError::from))
            .collect()
    }
}

impl Circuit {
    /// Build a circuit from its descriptor. Gates keep their file order.
    pub fn from_descriptor(desc: &CircuitDescriptor) -> Result<Self, CircuitError> {
        let gates = desc
            .gates
            .iter()
            .enumerate()
            .map(|(gate_id, g)| gate_from_descriptor(gate_id, g))
            .collect::<Result<Vec<_>, _>>()?;

        Circuit::new(
            desc.id.clone(),
            desc.requester_wires.clone(),
            desc.gatekeeper_wires.clone(),
            desc.output_wires.clone(),
            gates,
        )
    }

    pub fn to_descriptor(&self) -> CircuitDescriptor {
        let gates = self
            .gates
            .iter()
            .map(|gate| {
                let kind = match gate {
                    Gate::Xor { negated: false, .. } => "XOR",
                    Gate::Xor { negated: true, .. } => "XNOR",
                    Gate::And { form, .. } => match *form {
                        AndForm::NAND => "NAND",
                        AndForm::OR => "OR",
                        AndForm::NOR => "NOR",
                        _ => "AND",
                    },
                    Gate::Inv { .. } => "NOT",
                };
                GateDescriptor {
                    id: gate.out_id(),
                    kind: kind.to_string(),
                    inputs: gate.input_ids(),
                }
            })
            .collect();

        CircuitDescriptor {
            id: self.id.clone(),
            requester_wires: self.requester_wires.clone(),
            gatekeeper_wires: self.gatekeeper_wires.clone(),
            output_wires: self.output_wires.clone(),
            gates,
        }
    }

    /// Load every circuit of a JSON circuit file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, CircuitLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read circuit file {}", path.display()))?;
        CircuitFile::from_json(&text)?.into_circuits()
    }

    /// Load a circuit file by extension: `.json` holds descriptors, anything
    /// else is parsed as a single Bristol circuit named after the file stem.
    pub fn load_any<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, CircuitLoadError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::load_file(path),
            _ => {
                let id = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("bristol")
                    .to_string();
                Ok(vec![Self::load_bristol(path, id)?])
            }
        }
    }

    /// Load and Parse circuit files in Bristol Fashion format as specified here:
    /// `https://homes.esat.kuleuven.be/~nsmart/MPC/`
    ///
    /// The first input group becomes the requester wires and all remaining
    /// groups the gatekeeper wires. Outputs are the last wires of the circuit.
    pub fn load_bristol<P: AsRef<Path>>(
        path: P,
        id: impl Into<String>,
    ) -> Result<Self, CircuitLoadError> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("Failed to read circuit from {}", path.display()))?;
        let mut lines = BufReader::new(f).lines();
        let mut next_line = || -> Result<String, CircuitLoadError> {
            let line = lines
                .next()
                .ok_or_else(|| anyhow!("Unexpected end of circuit file"))?
                .context("Failed to read line")?;
            Ok(line)
        };

        let re = Regex::new(r"(\d+)").context("Failed to compile regex")?;

        // Parse first line: ngates nwires
        let line = next_line()?;
        let line_1 = parse_numbers(&re, &line)?;
        if line_1.len() != 2 {
            return Err(CircuitLoadError::ParsingError(anyhow!(
                "Expecting line to be ngates, nwires: {}",
                line
            )));
        }
        let (ngates, nwires) = (line_1[0], line_1[1]);

        // Parse second line: ninputs input_0_nwires input_1_nwires...
        let line = next_line()?;
        let line_2 = parse_numbers(&re, &line)?;
        let input_nwires = counted_groups(&line_2, &line, "input")?;

        // Parse third line: noutputs output_0_nwires output_1_nwires...
        let line = next_line()?;
        let line_3 = parse_numbers(&re, &line)?;
        let output_nwires = counted_groups(&line_3, &line, "output")?;

        let nrequester = input_nwires.first().copied().unwrap_or(0);
        let ninput_wires: usize = input_nwires.iter().sum();
        let noutput_wires: usize = output_nwires.iter().sum();
        if ninput_wires + noutput_wires > nwires {
            return Err(CircuitLoadError::ParsingError(anyhow!(
                "Circuit declares more input and output wires than {nwires}"
            )));
        }

        let gate_re = Regex::new(r"(\d+|\S+)\s*").context("Failed to compile regex")?;
        let mut gates = Vec::with_capacity(ngates);
        for (lineno, line) in lines.enumerate() {
            let line = line.context("Failed to read line")?;
            if line.trim().is_empty() {
                continue;
            }
            let gate_info: Vec<&str> = gate_re
                .captures_iter(&line)
                .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
                .collect();
            let gate = parse_bristol_gate(gates.len(), &gate_info).with_context(|| {
                format!("Failed to parse gate on line {}: {}", lineno + 4, line)
            })?;
            gates.push(gate);
        }
        if gates.len() != ngates {
            return Err(CircuitLoadError::ParsingError(anyhow!(
                "Expecting {ngates} gates, parsed {}",
                gates.len()
            )));
        }

        Ok(Circuit::new(
            id,
            (0..nrequester).collect(),
            (nrequester..ninput_wires).collect(),
            (nwires - noutput_wires..nwires).collect(),
            gates,
        )?)
    }
}

fn gate_from_descriptor(gate_id: usize, desc: &GateDescriptor) -> Result<Gate, CircuitError> {
    let unsupported = || CircuitError::UnsupportedGate {
        kind: desc.kind.clone(),
        arity: desc.inputs.len(),
    };
    let out_id = desc.id;
    let gate = match (desc.kind.as_str(), desc.inputs.as_slice()) {
        ("NOT", &[lin_id]) => Gate::Inv {
            gate_id,
            lin_id,
            out_id,
        },
        ("XOR", &[lin_id, rin_id]) | ("XNOR", &[lin_id, rin_id]) => Gate::Xor {
            gate_id,
            lin_id,
            rin_id,
            out_id,
            negated: desc.kind == "XNOR",
        },
        (kind, &[lin_id, rin_id]) => {
            let form = match kind {
                "AND" => AndForm::AND,
                "NAND" => AndForm::NAND,
                "OR" => AndForm::OR,
                "NOR" => AndForm::NOR,
                _ => return Err(unsupported()),
            };
            Gate::And {
                gate_id,
                lin_id,
                rin_id,
                out_id,
                form,
            }
        }
        _ => return Err(unsupported()),
    };
    Ok(gate)
}

fn parse_numbers(re: &Regex, line: &str) -> Result<Vec<usize>, CircuitLoadError> {
    re.captures_iter(line)
        .filter_map(|cap| cap.get(1))
        .map(|m| {
            m.as_str()
                .parse::<usize>()
                .with_context(|| format!("Failed to parse number: {}", m.as_str()))
                .map_err(CircuitLoadError::from)
        })
        .collect()
}

/// Split `n w_0 .. w_{n-1}` into the wire counts, checking `n`.
fn counted_groups(
    values: &[usize],
    line: &str,
    what: &str,
) -> Result<Vec<usize>, CircuitLoadError> {
    let (count, groups) = values
        .split_first()
        .ok_or_else(|| anyhow!("Expecting {what} count: {line}"))?;
    if groups.len() != *count {
        return Err(CircuitLoadError::ParsingError(anyhow!(
            "Expecting wire count to be specified for every {what}: {line}"
        )));
    }
    Ok(groups.to_vec())
}

fn parse_bristol_gate(gate_id: usize, info: &[&str]) -> anyhow::Result<Gate> {
    let kind = info.last().ok_or_else(|| anyhow!("Empty gate line"))?;
    let wire = |i: usize| -> anyhow::Result<usize> {
        info.get(i)
            .ok_or_else(|| anyhow!("Missing wire {i}"))?
            .parse()
            .context("Failed to parse gate")
    };
    let gate = match *kind {
        "INV" => Gate::Inv {
            gate_id,
            lin_id: wire(2)?,
            out_id: wire(3)?,
        },
        "AND" => Gate::And {
            gate_id,
            lin_id: wire(2)?,
            rin_id: wire(3)?,
            out_id: wire(4)?,
            form: AndForm::AND,
        },
        "XOR" => Gate::Xor {
            gate_id,
            lin_id: wire(2)?,
            rin_id: wire(3)?,
            out_id: wire(4)?,
            negated: false,
        },
        _ => return Err(anyhow!("Encountered unsupported gate type: {}", kind)),
    };
    Ok(gate)
}
