use aes::Aes256;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;

use super::error::EnvelopeError;
use super::key::EnvelopeKey;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

pub const IV_LENGTH: usize = 16;

/// Wire form of a protected payload: `{"iv": .., "data": .., "mac": ..}`, all base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    pub iv: String,
    pub data: String,
    pub mac: String,
}

impl EncryptedEnvelope {
    /// Pull the three envelope fields out of an arbitrary JSON body.
    /// Missing, null, empty or non-string fields are all the same failure.
    pub fn from_value(value: &Value) -> Result<Self, EnvelopeError> {
        let field = |name: &str| -> Result<String, EnvelopeError> {
            match value.get(name) {
                Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
                _ => Err(EnvelopeError::InvalidPayload),
            }
        };

        Ok(Self {
            iv: field("iv")?,
            data: field("data")?,
            mac: field("mac")?,
        })
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "iv": self.iv, "data": self.data, "mac": self.mac })
    }
}

/// Encrypt-then-MAC codec (AES-256-CBC + HMAC-SHA256) over JSON bodies.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    key: EnvelopeKey,
}

impl EnvelopeCodec {
    pub fn new(key: EnvelopeKey) -> Self {
        Self { key }
    }

    pub fn encrypt<T: Serialize + ?Sized>(&self, payload: &T) -> Result<EncryptedEnvelope, EnvelopeError> {
        let plaintext = serde_json::to_vec(payload).map_err(|e| {
            tracing::error!("Failed to serialize outbound payload: {}", e);
            EnvelopeError::Encryption
        })?;

        let mut iv = [0u8; IV_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new_from_slices(self.key.as_bytes(), &iv)
            .map_err(|_| EnvelopeError::Encryption)?
            .encrypt_padded_vec_mut::<Pkcs7>(&plaintext);

        let mac = self.mac_over(&iv, &ciphertext)?.finalize().into_bytes();

        Ok(EncryptedEnvelope {
            iv: BASE64.encode(iv),
            data: BASE64.encode(&ciphertext),
            mac: BASE64.encode(mac),
        })
    }

    /// Verify, then decrypt. The MAC is checked before any cipher work happens.
    pub fn decrypt(&self, envelope: &EncryptedEnvelope) -> Result<Map<String, Value>, EnvelopeError> {
        let iv = decode_field(&envelope.iv)?;
        let ciphertext = decode_field(&envelope.data)?;
        let mac = decode_field(&envelope.mac)?;

        if iv.len() != IV_LENGTH {
            return Err(EnvelopeError::InvalidPayload);
        }

        self.mac_over(&iv, &ciphertext)
            .map_err(|_| EnvelopeError::InvalidPayload)?
            .verify_slice(&mac)
            .map_err(|_| EnvelopeError::InvalidPayload)?;

        let plaintext = Aes256CbcDec::new_from_slices(self.key.as_bytes(), &iv)
            .map_err(|_| EnvelopeError::InvalidPayload)?
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| EnvelopeError::InvalidPayload)?;

        match serde_json::from_slice::<Value>(&plaintext) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(EnvelopeError::InvalidPayload),
        }
    }

    /// Convenience for request bodies that arrive as raw JSON.
    pub fn decrypt_value(&self, body: &Value) -> Result<Map<String, Value>, EnvelopeError> {
        let envelope = EncryptedEnvelope::from_value(body)?;
        self.decrypt(&envelope)
    }

    fn mac_over(&self, iv: &[u8], ciphertext: &[u8]) -> Result<HmacSha256, EnvelopeError> {
        let mut mac = HmacSha256::new_from_slice(self.key.as_bytes()).map_err(|_| EnvelopeError::Encryption)?;
        mac.update(iv);
        mac.update(ciphertext);
        Ok(mac)
    }
}

fn decode_field(text: &str) -> Result<Vec<u8>, EnvelopeError> {
    BASE64.decode(text).map_err(|_| EnvelopeError::InvalidPayload)
}
