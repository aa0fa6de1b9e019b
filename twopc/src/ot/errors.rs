#[derive(Debug, thiserror::Error)]
pub enum OTSenderError {
    #[error("OT sender channel failure")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum OTReceiverError {
    #[error("OT receiver channel failure")]
    IoError(#[from] std::io::Error),
}
