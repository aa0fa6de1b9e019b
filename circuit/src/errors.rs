/// Structural defects that make a circuit unusable for garbling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError {
    #[error("wire {0} is declared as both a requester and a gatekeeper input")]
    OverlappingInputs(usize),
    #[error("input wire {0} is declared more than once")]
    DuplicateInput(usize),
    #[error("gate {gate_id} reads wire {wire} before it is defined")]
    UndeclaredWire { gate_id: usize, wire: usize },
    #[error("gate {gate_id} writes wire {wire}, which is already defined")]
    WireRedefined { gate_id: usize, wire: usize },
    #[error("output wire {0} is never defined")]
    UnknownOutput(usize),
    #[error("wire {wire} is out of range for a circuit with {nwires} wires")]
    WireOutOfRange { wire: usize, nwires: usize },
    #[error("circuit has no output wires")]
    NoOutputs,
    #[error("unsupported gate type {kind} with {arity} inputs")]
    UnsupportedGate { kind: String, arity: usize },
    #[error("gate counters do not match the gate list")]
    CountMismatch,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitEvalError {
    #[error("uninitialized value, wire {0}")]
    UninitializedValue(usize),
    #[error("missing value for input wire {0}")]
    MissingInput(usize),
    #[error("expected {expected} input values, got {got}")]
    InvalidInputCount { expected: usize, got: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitLoadError {
    #[error("encountered error while parsing circuit")]
    ParsingError(#[from] anyhow::Error),
    /// An I/O error occurred.
    #[error("encountered io error while loading circuit")]
    IoError(#[from] std::io::Error),
    #[error("circuit file is not valid JSON")]
    JsonError(#[from] serde_json::Error),
    #[error("malformed circuit: {0}")]
    Malformed(#[from] CircuitError),
}
