//! Payload envelope: AES-256-CBC + HMAC-SHA256 around every JSON body.

pub mod codec;
pub mod error;
pub mod key;

pub use codec::{EncryptedEnvelope, EnvelopeCodec};
pub use error::EnvelopeError;
pub use key::EnvelopeKey;
