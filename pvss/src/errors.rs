#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PvssError {
    #[error("threshold {threshold} needs at least {threshold} identity keys, got {supplied}")]
    InsufficientKeys { threshold: usize, supplied: usize },
    #[error("threshold must be at least 1")]
    InvalidThreshold,
    #[error("reconstruction needs {threshold} shares, got {supplied}")]
    InsufficientShares { threshold: usize, supplied: usize },
    #[error("share index {0} appears more than once")]
    DuplicateShareIndex(u32),
    #[error("DLEQ proof of share {0} does not verify")]
    InvalidShareProof(u32),
    #[error("no share is held by {0}")]
    UnknownHolder(String),
    #[error("share {index} is held by {holder}, not {expected}")]
    HolderMismatch {
        index: u32,
        holder: String,
        expected: String,
    },
    #[error("share {0} is encrypted for a different receiver")]
    ReceiverMismatch(u32),
    #[error("sharing instance is inconsistent: {0}")]
    MalformedInstance(&'static str),
}
