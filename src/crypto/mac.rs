// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HMAC-SHA256 envelope authentication

use super::{CryptoError, MacKey};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 output length in bytes
pub const HMAC_LEN: usize = 32;

pub fn sign(key: &MacKey, data: &[u8]) -> Result<[u8; HMAC_LEN], CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::invalid_key("mac_key", "rejected by HMAC-SHA256"))?;
    mac.update(data);

    let mut out = [0u8; HMAC_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Recompute the MAC over `data` and compare it with `expected`
pub fn verify(key: &MacKey, data: &[u8], expected: &[u8]) -> Result<bool, CryptoError> {
    let computed = sign(key, data)?;
    Ok(constant_time_eq(&computed, expected))
}

/// Compare two byte strings without data-dependent early exit
///
/// Every byte position up to the longer input is visited and the XOR
/// difference is OR-accumulated. A length mismatch is folded into the
/// accumulator rather than returned on.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}
