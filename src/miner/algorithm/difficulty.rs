// src/miner/algorithm/difficulty.rs
//! Compact target encoding
//!
//! The compact form packs a 256-bit target into 32 bits: the high byte is
//! the length of the target in bytes, the low three bytes are its most
//! significant bytes.

/// Expands a compact difficulty into a 32-byte big-endian target
///
/// Returns the all-zero target for a zero mantissa. Mantissa bytes that fall
/// outside the 32-byte range are dropped.
pub fn compact_to_target(compact: u32) -> [u8; 32] {
    let mut target = [0u8; 32];
    let exponent = (compact >> 24) as usize;
    let mantissa = compact & 0x00ff_ffff;
    if mantissa == 0 {
        return target;
    }

    let bytes = mantissa.to_be_bytes();
    for (i, b) in bytes[1..].iter().enumerate() {
        // byte i of the mantissa lands `exponent - 1 - i` bytes above the LSB
        let Some(pos_from_lsb) = exponent.checked_sub(1 + i) else {
            continue;
        };
        if pos_from_lsb < 32 {
            target[31 - pos_from_lsb] = *b;
        }
    }
    target
}

/// True when `hash` (read big-endian) does not exceed `target`
pub fn meets_target(hash: &[u8; 32], target: &[u8; 32]) -> bool {
    hash <= target
}
