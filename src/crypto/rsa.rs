// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Raw RSA modular exponentiation plus the lenient, PKCS#1-v1.5-flavored
//! pad/unpad used only inside the handshake to wrap/unwrap the
//! Diffie-Hellman integers as hex strings. This is not a general-purpose
//! RSA implementation — no OAEP, no timing-safe comparisons, no private
//! exponent — because the protocol never asks the client to hold a
//! private key.

use anyhow::{Context, Result, bail};
use num_bigint::BigUint;
use rand::RngExt;

fn modulus_len_bytes(n: &BigUint) -> usize {
    n.bits().div_ceil(8) as usize
}

fn to_fixed_be(v: &BigUint, len: usize) -> Vec<u8> {
    let raw = v.to_bytes_be();
    let mut out = vec![0u8; len];
    let start = len.saturating_sub(raw.len());
    let copy_from = raw.len().saturating_sub(len);
    out[start..].copy_from_slice(&raw[copy_from..]);
    out
}

fn parse_hex_biguint(hex_str: &str) -> Result<BigUint> {
    let cleaned = hex_str.trim().trim_start_matches("0x");
    BigUint::parse_bytes(cleaned.as_bytes(), 16)
        .with_context(|| format!("not valid hex: {hex_str}"))
}

/// Loads `(n, e)` from the configuration's hex strings.
pub fn load_key(modulus_hex: &str, exponent_hex: &str) -> Result<(BigUint, BigUint)> {
    Ok((parse_hex_biguint(modulus_hex)?, parse_hex_biguint(exponent_hex)?))
}

/// Pads `m` as `0x00 0x02 PS 0x00 m` (PS random non-zero, filling the
/// modulus to size), raises the block to `e mod n`, and returns the
/// result as a zero-padded big-endian hex string of exactly
/// `modulus_len*2` characters.
pub fn pad_and_encrypt(n: &BigUint, e: &BigUint, m: &[u8]) -> Result<String> {
    let key_len = modulus_len_bytes(n);
    if m.len() + 11 > key_len {
        bail!("message too long for a {key_len}-byte RSA modulus");
    }

    let ps_len = key_len - 3 - m.len();
    let mut rng = rand::rng();
    let ps: Vec<u8> = (0..ps_len).map(|_| rng.random_range(1u8..=255)).collect();

    let mut block = Vec::with_capacity(key_len);
    block.push(0x00);
    block.push(0x02);
    block.extend_from_slice(&ps);
    block.push(0x00);
    block.extend_from_slice(m);

    let plain = BigUint::from_bytes_be(&block);
    let cipher = plain.modpow(e, n);

    Ok(hex::encode(to_fixed_be(&cipher, key_len)))
}

/// Raises the hex-encoded block to `e mod n`, then unpads it leniently:
/// the peer's bignum library may drop the leading `0x00`, so both a
/// `00 01 ...` and a bare `01 ...` prefix are accepted. The separator
/// search starts right after whichever prefix matched. The remaining
/// bytes are decoded as an ASCII decimal integer.
pub fn verify_and_unpad(n: &BigUint, e: &BigUint, hex_block: &str) -> Result<BigUint> {
    let cipher = parse_hex_biguint(hex_block)?;
    let plain = cipher.modpow(e, n);
    let key_len = modulus_len_bytes(n);
    let block = to_fixed_be(&plain, key_len);

    let scan_start = if block.len() >= 2 && block[0] == 0x00 && block[1] == 0x01 {
        2
    } else if !block.is_empty() && block[0] == 0x01 {
        1
    } else {
        bail!("rsa block has neither '00 01' nor '01' prefix");
    };

    let sep = block[scan_start..]
        .iter()
        .position(|&b| b == 0x00)
        .map(|p| scan_start + p)
        .context("no 0x00 separator found in rsa block")?;

    let digits = std::str::from_utf8(&block[sep + 1..])
        .context("rsa payload is not valid ascii")?
        .trim_end_matches('\0');

    BigUint::parse_bytes(digits.as_bytes(), 10)
        .with_context(|| format!("rsa payload is not a decimal integer: {digits:?}"))
}
