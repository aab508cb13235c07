use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::EnvelopeError;

pub const KEY_LENGTH: usize = 32;
const HEX_KEY_LENGTH: usize = KEY_LENGTH * 2;

/// The 256-bit secret shared by AES-256-CBC and HMAC-SHA256.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EnvelopeKey([u8; KEY_LENGTH]);

impl EnvelopeKey {
    /// Accepts either 32 raw bytes or 64 hexadecimal characters.
    pub fn parse(raw: &[u8]) -> Result<Self, EnvelopeError> {
        if raw.is_empty() {
            return Err(EnvelopeError::Configuration("API_SECRET_KEY is not set".to_string()));
        }

        if raw.len() == HEX_KEY_LENGTH && raw.iter().all(u8::is_ascii_hexdigit) {
            let mut bytes = [0u8; KEY_LENGTH];
            hex::decode_to_slice(raw, &mut bytes)
                .map_err(|e| EnvelopeError::Configuration(format!("invalid hex key: {}", e)))?;
            return Ok(Self(bytes));
        }

        let bytes: [u8; KEY_LENGTH] = raw.try_into().map_err(|_| {
            EnvelopeError::Configuration(format!(
                "key must be {} raw bytes or {} hex characters, got {} bytes",
                KEY_LENGTH,
                HEX_KEY_LENGTH,
                raw.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Generate a fresh random key, hex encoded, for `keygen`.
    pub fn generate_hex() -> String {
        use rand::RngCore;
        let mut bytes = [0u8; KEY_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let encoded = hex::encode(bytes);
        bytes.zeroize();
        encoded
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EnvelopeKey(..)")
    }
}
