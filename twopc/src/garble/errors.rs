#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("uninitialized label, wire {0}")]
    UninitializedLabel(usize),
    #[error("expected {expected} input labels, got {got}")]
    InputLabelCount { expected: usize, got: usize },
    #[error("no zero label for input wire {0}")]
    UnknownInputWire(usize),
    #[error("no value for input wire {0}")]
    MissingInput(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error("uninitialized label, wire {0}")]
    UninitializedLabel(usize),
    #[error("expected {expected} input labels, got {got}")]
    InputLabelCount { expected: usize, got: usize },
    #[error("garbled table has {0} rows, circuit needs more")]
    TableExhausted(usize),
    #[error("expected {expected} decode entries, got {got}")]
    DecodeInfoMismatch { expected: usize, got: usize },
}
