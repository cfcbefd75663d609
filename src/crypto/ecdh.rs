// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH Key Exchange Implementation
//!
//! Implements Elliptic Curve Diffie-Hellman over P-256 (secp256r1), the curve
//! browsers expose through Web Crypto. Public keys travel in the "raw" format:
//! the 65-byte uncompressed SEC1 point `0x04 || X || Y`.

use super::{CryptoError, EcdhKeyPair, RAW_PUBLIC_KEY_LEN};
use p256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Generate a fresh ephemeral P-256 key pair
pub fn generate_key_pair() -> EcdhKeyPair {
    let secret = SecretKey::random(&mut OsRng);
    let public_key = secret
        .public_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec();

    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&secret.to_bytes());
    EcdhKeyPair::from_parts(scalar, public_key)
}

/// Parse a peer's raw public key
///
/// Accepts the 65-byte uncompressed form only, which is what Web Crypto's
/// `exportKey("raw")` produces. Points not on the curve are rejected.
pub fn parse_public_key(raw: &[u8]) -> Result<PublicKey, CryptoError> {
    if raw.len() != RAW_PUBLIC_KEY_LEN {
        return Err(CryptoError::invalid_key(
            "peer_public_key",
            format!(
                "expected {} bytes, got {}",
                RAW_PUBLIC_KEY_LEN,
                raw.len()
            ),
        ));
    }

    Ok(PublicKey::from_sec1_bytes(raw)?)
}

/// Compute the ECDH shared secret between our key pair and a peer public key
///
/// # Returns
///
/// The 32-byte x-coordinate of the shared point, the same bits Web Crypto's
/// `deriveBits({name: "ECDH"}, 256)` yields.
pub fn shared_secret(
    key_pair: &EcdhKeyPair,
    peer_public_key: &[u8],
) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let peer = parse_public_key(peer_public_key)?;

    let secret = SecretKey::from_slice(key_pair.secret_bytes()).map_err(|_| {
        CryptoError::KeyDerivation {
            operation: "ecdh".to_string(),
            reason: "ephemeral private key is not a valid scalar".to_string(),
        }
    })?;

    // shared_point = peer_pub * our_secret
    let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());

    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(shared.raw_secret_bytes());
    Ok(out)
}
