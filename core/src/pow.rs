//! Proof-of-work search and verification (component C4).
//!
//! A block is solved once its hash, interpreted as a big-endian 256-bit
//! integer, is less than or equal to the configured target. The search
//! walks the nonce space `0..=u64::MAX`; the block's timestamp is fixed at
//! construction and is never touched here.

use std::sync::atomic::{AtomicBool, Ordering};

use num_bigint::BigUint;

use crate::block::Block;
use crate::error::Result;
use crate::Hash;

/// How many nonces to try between cancellation-flag checks.
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Outcome of a [`solve`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// A valid nonce was found; `block.header.nonce` and `block.hash` are set.
    Solved,
    /// The entire `u64` nonce space was exhausted without success.
    Exhausted,
    /// The caller's cancellation flag was observed before a solution was found.
    Cancelled,
}

/// Returns `true` iff `hash`, read as a big-endian integer, is `<= target`.
pub fn meets_target(hash: &Hash, target: &Hash) -> bool {
    BigUint::from_bytes_be(hash) <= BigUint::from_bytes_be(target)
}

/// Searches for a nonce that makes `block`'s hash satisfy its target.
///
/// If `cancel` is provided, it is polled every [`CANCEL_CHECK_INTERVAL`]
/// nonces; setting it to `true` from another thread stops the search at the
/// next checkpoint with [`SolveOutcome::Cancelled`]. This is a best-effort
/// mitigation, not an interrupt: a check that has already started hashing a
/// batch will finish that batch first.
pub fn solve(block: &mut Block, cancel: Option<&AtomicBool>) -> Result<SolveOutcome> {
    let target = block.header.target;
    let mut nonce: u64 = 0;
    loop {
        block.header.nonce = nonce;
        let hash = block.compute_hash()?;
        if meets_target(&hash, &target) {
            block.hash = Some(hash);
            return Ok(SolveOutcome::Solved);
        }

        if nonce == u64::MAX {
            return Ok(SolveOutcome::Exhausted);
        }
        nonce += 1;

        if nonce % CANCEL_CHECK_INTERVAL == 0 {
            if let Some(flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    return Ok(SolveOutcome::Cancelled);
                }
            }
        }
    }
}

/// Verifies that `block.hash` is both set, correctly computed, and meets
/// `block.header.target`.
pub fn verify(block: &Block) -> Result<bool> {
    let Some(claimed) = block.hash else {
        return Ok(false);
    };
    let recomputed = block.compute_hash()?;
    Ok(claimed == recomputed && meets_target(&recomputed, &block.header.target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn solving_with_max_target_succeeds_immediately() {
        let cfg = Config::default();
        let mut block = Block::new([0u8; 32], Vec::new(), [0xFF; 32]).unwrap();
        let outcome = solve(&mut block, None).unwrap();
        assert_eq!(outcome, SolveOutcome::Solved);
        assert!(verify(&block).unwrap());
        let _ = cfg;
    }

    #[test]
    fn solved_block_fails_verification_if_tampered() {
        let mut block = Block::new([0u8; 32], Vec::new(), [0xFF; 32]).unwrap();
        solve(&mut block, None).unwrap();
        block.header.nonce = block.header.nonce.wrapping_add(1);
        assert!(!verify(&block).unwrap());
    }

    #[test]
    fn unsolved_block_does_not_verify() {
        let block = Block::new([0u8; 32], Vec::new(), [0xFF; 32]).unwrap();
        assert!(!verify(&block).unwrap());
    }

    #[test]
    fn cancellation_flag_stops_the_search() {
        let flag = AtomicBool::new(true);
        let mut block = Block::new([0u8; 32], Vec::new(), [0u8; 32]).unwrap();
        let outcome = solve(&mut block, Some(&flag)).unwrap();
        assert_eq!(outcome, SolveOutcome::Cancelled);
    }
}
