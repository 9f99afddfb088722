// src/miner/algorithm/cryptonight.rs
//! CryptoNight search backend
//!
//! Wraps the native `cryptonight` library as a [`HashSearch`]. The nonce is
//! appended to the header as little-endian bytes and the resulting hash is
//! compared big-endian against the target expanded from the compact
//! difficulty.

use crate::miner::algorithm::difficulty::{compact_to_target, meets_target};
use crate::miner::algorithm::{HashSearch, SearchOutcome};
use crate::utils::error::MinerError;
use cryptonight::cryptonight;

/// CryptoNight variant 1 (V7)
pub const VARIANT_V7: i32 = 1;

/// CryptoNight variant 4 (R)
pub const VARIANT_R: i32 = 4;

/// CryptoNight search for a fixed variant
pub struct CryptoNightSearch {
    /// Algorithm variant identifier passed to the native library
    variant: i32,
}

impl CryptoNightSearch {
    /// Creates a search backend for `variant`
    ///
    /// # Errors
    /// Returns `MinerError::InputError` for variants other than
    /// [`VARIANT_V7`] and [`VARIANT_R`].
    pub fn new(variant: i32) -> Result<Self, MinerError> {
        match variant {
            VARIANT_V7 | VARIANT_R => Ok(Self { variant }),
            other => Err(MinerError::InputError(format!(
                "Unsupported CryptoNight variant: {}",
                other
            ))),
        }
    }

    fn hash(&self, header: &[u8], nonce: u64) -> Result<[u8; 32], MinerError> {
        let mut data = Vec::with_capacity(header.len() + 8);
        data.extend_from_slice(header);
        data.extend_from_slice(&nonce.to_le_bytes());

        let hash = cryptonight(&data, data.len(), self.variant);
        hash.as_slice().try_into().map_err(|_| {
            MinerError::SearchError(format!("Unexpected hash length {}", hash.len()))
        })
    }
}

impl HashSearch for CryptoNightSearch {
    fn search(
        &self,
        header: &[u8],
        difficulty: u32,
        start: u64,
        end: u64,
    ) -> Result<SearchOutcome, MinerError> {
        let target = compact_to_target(difficulty);
        for nonce in start..end {
            let hash = self.hash(header, nonce)?;
            if meets_target(&hash, &target) {
                return Ok(SearchOutcome::Found { nonce, hash });
            }
        }
        Ok(SearchOutcome::Exhausted)
    }

    fn name(&self) -> &'static str {
        match self.variant {
            VARIANT_R => "cryptonight-r",
            _ => "cryptonight-v7",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_variant() {
        assert!(CryptoNightSearch::new(99).is_err());
        assert!(CryptoNightSearch::new(VARIANT_V7).is_ok());
    }

    #[test]
    fn easy_target_finds_share_in_range() {
        let cn = CryptoNightSearch::new(VARIANT_V7).unwrap();
        // target ffff00..00
        let outcome = cn.search(b"header", 0x21ffffff, 7, 12).unwrap();
        match outcome {
            SearchOutcome::Found { nonce, hash } => {
                assert!((7..12).contains(&nonce));
                assert_eq!(hash, cn.hash(b"header", nonce).unwrap());
            }
            SearchOutcome::Exhausted => panic!("expected a share"),
        }
    }

    #[test]
    fn zero_target_exhausts_range() {
        let cn = CryptoNightSearch::new(VARIANT_V7).unwrap();
        let outcome = cn.search(b"header", 0, 0, 4).unwrap();
        assert_eq!(outcome, SearchOutcome::Exhausted);
    }
}
