// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encrypted Envelope
//!
//! Wire container for one encrypted message body.
//!
//! ## Format
//! ```json
//! {
//!   "iv": "<base64, 12 bytes>",
//!   "ciphertext": "<base64>",
//!   "tag": "<base64, 16 bytes>",
//!   "hmac": "<base64, 32 bytes>",
//!   "sessionId": "<plaintext session id>"
//! }
//! ```
//!
//! `hmac = HMAC-SHA256(hmac_key, sessionId || iv || ciphertext || tag)`, which
//! binds the envelope to exactly one session. `open` verifies the HMAC before
//! attempting AES-GCM and never returns unverified plaintext.

use super::{
    aes_gcm::{NONCE_LEN, TAG_LEN},
    mac::HMAC_LEN,
    CryptoError, CryptoProvider, SessionKeys,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

/// JSON body of every protected request and response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    pub iv: String,
    pub ciphertext: String,
    pub tag: String,
    pub hmac: String,
    pub session_id: String,
}

/// Envelope with binary fields decoded and length-checked
struct DecodedEnvelope {
    iv: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
    hmac: Vec<u8>,
}

impl EncryptedEnvelope {
    fn decode(&self) -> Result<DecodedEnvelope, CryptoError> {
        let iv_bytes = decode_field("iv", &self.iv)?;
        let iv: [u8; NONCE_LEN] = iv_bytes.as_slice().try_into().map_err(|_| {
            CryptoError::invalid_envelope(
                "iv",
                format!("expected {} bytes, got {}", NONCE_LEN, iv_bytes.len()),
            )
        })?;

        let tag = decode_field("tag", &self.tag)?;
        if tag.len() != TAG_LEN {
            return Err(CryptoError::invalid_envelope(
                "tag",
                format!("expected {} bytes, got {}", TAG_LEN, tag.len()),
            ));
        }

        let hmac = decode_field("hmac", &self.hmac)?;
        if hmac.len() != HMAC_LEN {
            return Err(CryptoError::invalid_envelope(
                "hmac",
                format!("expected {} bytes, got {}", HMAC_LEN, hmac.len()),
            ));
        }

        Ok(DecodedEnvelope {
            iv,
            ciphertext: decode_field("ciphertext", &self.ciphertext)?,
            tag,
            hmac,
        })
    }
}

fn decode_field(field: &str, value: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64
        .decode(value)
        .map_err(|e| CryptoError::invalid_envelope(field, format!("base64 decode error: {}", e)))
}

/// Bytes covered by the envelope HMAC
fn mac_input(session_id: &str, iv: &[u8], ciphertext: &[u8], tag: &[u8]) -> Vec<u8> {
    let mut data =
        Vec::with_capacity(session_id.len() + iv.len() + ciphertext.len() + tag.len());
    data.extend_from_slice(session_id.as_bytes());
    data.extend_from_slice(iv);
    data.extend_from_slice(ciphertext);
    data.extend_from_slice(tag);
    data
}

/// Encrypt `plaintext` into a session-bound envelope
///
/// A fresh random nonce is drawn from the provider on every call.
pub fn seal(
    provider: &dyn CryptoProvider,
    session_id: &str,
    keys: &SessionKeys,
    plaintext: &str,
) -> Result<EncryptedEnvelope, CryptoError> {
    let mut iv = [0u8; NONCE_LEN];
    provider.random_bytes(&mut iv);

    let mut sealed = provider.aead_encrypt(&keys.aes_key, &iv, plaintext.as_bytes())?;
    if sealed.len() < TAG_LEN {
        return Err(CryptoError::Encryption {
            reason: "AEAD output shorter than the authentication tag".to_string(),
        });
    }
    let tag = sealed.split_off(sealed.len() - TAG_LEN);
    let ciphertext = sealed;

    let hmac = provider.hmac_sign(&keys.hmac_key, &mac_input(session_id, &iv, &ciphertext, &tag))?;
    debug_assert_eq!(hmac.len(), HMAC_LEN);

    Ok(EncryptedEnvelope {
        iv: BASE64.encode(iv),
        ciphertext: BASE64.encode(&ciphertext),
        tag: BASE64.encode(&tag),
        hmac: BASE64.encode(hmac),
        session_id: session_id.to_string(),
    })
}

/// Verify and decrypt an envelope belonging to `session_id`
///
/// # Errors
///
/// - `Integrity` if the envelope names another session or its HMAC does not
///   verify; AES-GCM is not attempted in that case
/// - `Decryption` if the AEAD tag does not verify or the plaintext is not UTF-8
/// - `InvalidEnvelope` if a field is not base64 or has the wrong size
pub fn open(
    provider: &dyn CryptoProvider,
    session_id: &str,
    keys: &SessionKeys,
    envelope: &EncryptedEnvelope,
) -> Result<String, CryptoError> {
    if envelope.session_id != session_id {
        return Err(CryptoError::Integrity);
    }

    let decoded = envelope.decode()?;
    let data = mac_input(session_id, &decoded.iv, &decoded.ciphertext, &decoded.tag);
    if !provider.hmac_verify(&keys.hmac_key, &data, &decoded.hmac)? {
        return Err(CryptoError::Integrity);
    }

    let mut sealed = decoded.ciphertext;
    sealed.extend_from_slice(&decoded.tag);
    let plaintext = provider.aead_decrypt(&keys.aes_key, &decoded.iv, &sealed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Decryption {
        reason: "decrypted data is not valid UTF-8".to_string(),
    })
}
