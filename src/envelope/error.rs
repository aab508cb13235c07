use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Missing or malformed shared key
    #[error("Encryption key misconfigured: {0}")]
    Configuration(String),

    /// Any decode, integrity or cipher failure on an inbound envelope.
    /// Deliberately carries no detail.
    #[error("Invalid encrypted payload")]
    InvalidPayload,

    #[error("Encryption failed")]
    Encryption,
}
