//! Difficulty retargeting
//!
//! Below the fork height the target is recomputed every `legacy_interval`
//! blocks from the time the last interval took, limited to a factor of four
//! either way. From the fork height on it is recomputed on every block from
//! the last block time, damped to an eighth of the deviation and limited to
//! -25% / +50%.

use crate::chain::{ensure_contiguous, ChainHeader};
use crate::consensus::ConsensusParams;
use crate::pow::{CompactTarget, U256};
use crate::{Error, Result};
use tracing::debug;

/// Retargeting rule in force at a height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetargetAlgorithm {
    /// Fixed-interval retargeting before the fork
    Legacy,
    /// Damped per-block retargeting from the fork on
    PerBlock,
}

/// Computes the target each block must meet.
///
/// Pure function of its inputs and the consensus parameters.
#[derive(Debug, Clone, Copy)]
pub struct DifficultyPolicy<'a> {
    consensus: &'a ConsensusParams,
}

impl<'a> DifficultyPolicy<'a> {
    /// Policy for a parameter set
    pub fn new(consensus: &'a ConsensusParams) -> Self {
        Self { consensus }
    }

    /// Whether minimum-difficulty blocks are permitted. Always `false` on
    /// mainnet.
    pub fn allow_min_difficulty_blocks(&self) -> bool {
        self.consensus.allow_min_difficulty_blocks
    }

    /// Whether `height` is retargeted by the post-fork algorithm
    pub fn is_post_fork(&self, height: u32) -> bool {
        height >= self.consensus.difficulty_fork_height
    }

    /// Algorithm in force for the block at `height`
    pub fn algorithm_for(&self, height: u32) -> RetargetAlgorithm {
        if self.is_post_fork(height) {
            RetargetAlgorithm::PerBlock
        } else {
            RetargetAlgorithm::Legacy
        }
    }

    /// Whether the block at `height` gets a freshly computed target
    pub fn is_retarget_height(&self, height: u32) -> bool {
        if height == 0 || self.consensus.no_retargeting {
            return false;
        }
        match self.algorithm_for(height) {
            RetargetAlgorithm::PerBlock => true,
            RetargetAlgorithm::Legacy => height % self.consensus.legacy_interval() == 0,
        }
    }

    /// Target for the block at `height`.
    ///
    /// `prior` holds the chain's headers in ascending, contiguous order and
    /// ends at `height - 1`; it must reach back far enough to cover the
    /// retarget window.
    pub fn next_difficulty(&self, height: u32, prior: &[ChainHeader]) -> Result<CompactTarget> {
        self.compute(height, prior, None)
    }

    /// Like [`next_difficulty`], additionally applying the minimum-difficulty
    /// rule of test networks for a block stamped `block_time`.
    ///
    /// [`next_difficulty`]: DifficultyPolicy::next_difficulty
    pub fn next_difficulty_at(
        &self,
        height: u32,
        prior: &[ChainHeader],
        block_time: u32,
    ) -> Result<CompactTarget> {
        self.compute(height, prior, Some(block_time))
    }

    fn compute(
        &self,
        height: u32,
        prior: &[ChainHeader],
        block_time: Option<u32>,
    ) -> Result<CompactTarget> {
        if height == 0 {
            return Ok(self.consensus.genesis_bits);
        }

        let last = self.check_prior(height, prior)?;

        if let Some(time) = block_time {
            if self.min_difficulty_allowed(last, time) {
                debug!(
                    "Block {} arrives {}s after its parent, minimum difficulty allowed",
                    height,
                    i64::from(time) - i64::from(last.time)
                );
                return Ok(self.consensus.pow_limit);
            }
        }

        if !self.is_retarget_height(height) {
            if self.consensus.allow_min_difficulty_blocks && !self.consensus.no_retargeting {
                return self.last_regular_bits(prior);
            }
            return Ok(last.bits);
        }

        self.retarget(height, prior, last)
    }

    fn min_difficulty_allowed(&self, last: &ChainHeader, block_time: u32) -> bool {
        self.consensus.allow_min_difficulty_blocks
            && u64::from(block_time)
                > u64::from(last.time) + 2 * u64::from(self.consensus.pow_target_spacing)
    }

    fn check_prior<'h>(&self, height: u32, prior: &'h [ChainHeader]) -> Result<&'h ChainHeader> {
        let last = prior.last().ok_or_else(|| {
            Error::InvalidChainState(format!("no prior headers for block {}", height))
        })?;
        if last.height != height - 1 {
            return Err(Error::InvalidChainState(format!(
                "last prior header is at {}, block {} needs {}",
                last.height,
                height,
                height - 1
            )));
        }
        ensure_contiguous(prior)?;
        Ok(last)
    }

    fn header_at<'h>(&self, prior: &'h [ChainHeader], height: u32) -> Result<&'h ChainHeader> {
        let first = prior[0].height;
        height
            .checked_sub(first)
            .and_then(|offset| prior.get(offset as usize))
            .ok_or_else(|| {
                Error::InvalidChainState(format!(
                    "missing header {} (headers start at {})",
                    height, first
                ))
            })
    }

    /// Bits of the most recent block that is not a minimum-difficulty block,
    /// stopping at interval boundaries.
    fn last_regular_bits(&self, prior: &[ChainHeader]) -> Result<CompactTarget> {
        let interval = self.consensus.legacy_interval();
        let limit = self.consensus.pow_limit;
        for header in prior.iter().rev() {
            if header.height == 0 || header.height % interval == 0 || header.bits != limit {
                return Ok(header.bits);
            }
        }
        Err(Error::InvalidChainState(format!(
            "headers from {} on are all minimum difficulty; need earlier headers",
            prior[0].height
        )))
    }

    fn retarget(
        &self,
        height: u32,
        prior: &[ChainHeader],
        last: &ChainHeader,
    ) -> Result<CompactTarget> {
        let algorithm = self.algorithm_for(height);
        let (interval, timespan) = match algorithm {
            RetargetAlgorithm::Legacy => (
                self.consensus.legacy_interval(),
                i64::from(self.consensus.legacy_target_timespan),
            ),
            RetargetAlgorithm::PerBlock => (1, i64::from(self.consensus.pow_target_spacing)),
        };

        // The first retarget of the chain can only see interval - 1 blocks
        let go_back = if height == interval { interval - 1 } else { interval };
        let first = self.header_at(prior, last.height - go_back)?;
        let actual = i64::from(last.time) - i64::from(first.time);

        let (modulated, min, max) = match algorithm {
            RetargetAlgorithm::Legacy => (actual, timespan / 4, timespan * 4),
            RetargetAlgorithm::PerBlock => (
                timespan + (actual - timespan) / 8,
                timespan - timespan / 4,
                timespan + timespan / 2,
            ),
        };
        let modulated = modulated.clamp(min, max);

        let old = last.bits.to_target()?;
        let limit = self.consensus.pow_limit.to_target()?;
        let new = scale(old, modulated as u64, timespan as u64).min(limit);
        let bits = CompactTarget::from_target(new);

        debug!(
            "Retarget at {} ({:?}): actual {}s, modulated {}s, {} -> {}",
            height, algorithm, actual, modulated, last.bits, bits
        );
        Ok(bits)
    }
}

/// `target * numerator / denominator`, dividing first when the product
/// would not fit in 256 bits.
fn scale(target: U256, numerator: u64, denominator: u64) -> U256 {
    let numerator = U256::from(numerator);
    let denominator = U256::from(denominator);
    match target.checked_mul(numerator) {
        Some(product) => product / denominator,
        None => (target / denominator).saturating_mul(numerator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::BlockHash;

    const BITS: u32 = 0x1c0f_fff0;

    fn run(start: u32, end: u32, spacing: u32, bits: u32) -> Vec<ChainHeader> {
        (start..end)
            .map(|height| ChainHeader {
                height,
                version: 1,
                time: 1_400_000_000 + (height - start) * spacing,
                bits: CompactTarget::from_consensus(bits),
                nonce: 0,
                hash: BlockHash::hash(&height.to_le_bytes()),
            })
            .collect()
    }

    fn target(bits: u32) -> U256 {
        CompactTarget::from_consensus(bits).to_target().unwrap()
    }

    #[test]
    fn test_genesis_height() {
        let params = ConsensusParams::mainnet();
        let policy = DifficultyPolicy::new(&params);
        assert_eq!(policy.next_difficulty(0, &[]).unwrap(), params.genesis_bits);
    }

    #[test]
    fn test_legacy_carries_bits_between_retargets() {
        let params = ConsensusParams::mainnet();
        let policy = DifficultyPolicy::new(&params);
        let prior = run(1000, 1100, 60, BITS);
        assert!(!policy.is_retarget_height(1100));
        assert_eq!(policy.next_difficulty(1100, &prior).unwrap().to_consensus(), BITS);
    }

    #[test]
    fn test_legacy_on_schedule_keeps_target() {
        let params = ConsensusParams::mainnet();
        let policy = DifficultyPolicy::new(&params);
        // 240 blocks spaced 60s: exactly the target timespan
        let prior = run(1199, 1440, 60, BITS);
        assert!(policy.is_retarget_height(1440));
        let next = policy.next_difficulty(1440, &prior).unwrap();
        assert_eq!(next.to_consensus(), BITS);
    }

    #[test]
    fn test_legacy_missing_window_is_error() {
        let params = ConsensusParams::mainnet();
        let policy = DifficultyPolicy::new(&params);
        let prior = run(1300, 1440, 60, BITS);
        assert!(matches!(
            policy.next_difficulty(1440, &prior),
            Err(Error::InvalidChainState(_))
        ));
    }

    #[test]
    fn test_legacy_fast_blocks_clamped_to_quarter() {
        let params = ConsensusParams::mainnet();
        let policy = DifficultyPolicy::new(&params);
        // Every block 1s apart: far faster than target, clamp to timespan / 4
        let prior = run(1199, 1440, 1, BITS);
        let next = policy.next_difficulty(1440, &prior).unwrap();
        let expected = CompactTarget::from_target(target(BITS) / U256::from(4u64));
        assert_eq!(next, expected);
    }

    #[test]
    fn test_legacy_slow_blocks_clamped_to_four_times() {
        let params = ConsensusParams::mainnet();
        let policy = DifficultyPolicy::new(&params);
        let prior = run(1199, 1440, 6000, BITS);
        let next = policy.next_difficulty(1440, &prior).unwrap();
        let expected = CompactTarget::from_target(target(BITS) * U256::from(4u64));
        assert_eq!(next, expected);
    }

    #[test]
    fn test_legacy_clamped_to_pow_limit() {
        let params = ConsensusParams::mainnet();
        let policy = DifficultyPolicy::new(&params);
        let prior = run(1199, 1440, 6000, params.pow_limit.to_consensus());
        let next = policy.next_difficulty(1440, &prior).unwrap();
        assert_eq!(next, params.pow_limit);
    }

    #[test]
    fn test_first_retarget_uses_one_block_less() {
        let params = ConsensusParams::mainnet();
        let policy = DifficultyPolicy::new(&params);
        // Heights 0..=239; first retarget at 240 measures 239 blocks
        let prior = run(0, 240, 60, BITS);
        let next = policy.next_difficulty(240, &prior).unwrap();
        let expected = CompactTarget::from_target(
            target(BITS) * U256::from(239u64 * 60) / U256::from(14_400u64),
        );
        assert_eq!(next, expected);
    }

    #[test]
    fn test_switch_happens_exactly_at_fork() {
        let params = ConsensusParams::mainnet();
        let policy = DifficultyPolicy::new(&params);
        let fork = params.difficulty_fork_height;

        assert_eq!(policy.algorithm_for(fork - 1), RetargetAlgorithm::Legacy);
        assert_eq!(policy.algorithm_for(fork), RetargetAlgorithm::PerBlock);

        // Blocks every 120s: legacy carries bits at fork - 1, per-block reacts at fork
        let prior = run(fork - 300, fork, 120, BITS);
        let before = policy.next_difficulty(fork - 1, &prior[..prior.len() - 1]).unwrap();
        assert_eq!(before.to_consensus(), BITS);

        let at = policy.next_difficulty(fork, &prior).unwrap();
        // 60 + (120 - 60) / 8 = 67
        let expected =
            CompactTarget::from_target(target(BITS) * U256::from(67u64) / U256::from(60u64));
        assert_eq!(at, expected);
        assert_ne!(at.to_consensus(), BITS);
    }

    #[test]
    fn test_per_block_damping_limits() {
        let params = ConsensusParams::mainnet();
        let policy = DifficultyPolicy::new(&params);
        let fork = params.difficulty_fork_height;

        // Instant blocks: 60 + (0 - 60) / 8 = 53, above the 45s floor
        let prior = run(fork, fork + 10, 0, BITS);
        let next = policy.next_difficulty(fork + 10, &prior).unwrap();
        let expected =
            CompactTarget::from_target(target(BITS) * U256::from(53u64) / U256::from(60u64));
        assert_eq!(next, expected);

        // Hour-long gap: capped at 90s
        let prior = run(fork, fork + 10, 3600, BITS);
        let next = policy.next_difficulty(fork + 10, &prior).unwrap();
        let expected =
            CompactTarget::from_target(target(BITS) * U256::from(90u64) / U256::from(60u64));
        assert_eq!(next, expected);
    }

    #[test]
    fn test_malformed_input() {
        let params = ConsensusParams::mainnet();
        let policy = DifficultyPolicy::new(&params);

        assert!(matches!(
            policy.next_difficulty(10, &[]),
            Err(Error::InvalidChainState(_))
        ));

        // Ends at the wrong height
        let prior = run(0, 9, 60, BITS);
        assert!(policy.next_difficulty(10, &prior).is_err());

        // Gap in the middle
        let mut prior = run(0, 10, 60, BITS);
        prior.remove(4);
        assert!(policy.next_difficulty(10, &prior).is_err());

        // Undecodable bits at a retarget
        let prior = run(0, 240, 60, 0x0480_0001);
        assert!(policy.next_difficulty(240, &prior).is_err());
    }

    #[test]
    fn test_mainnet_ignores_block_time() {
        let params = ConsensusParams::mainnet();
        let policy = DifficultyPolicy::new(&params);
        assert!(!policy.allow_min_difficulty_blocks());
        let prior = run(1000, 1100, 60, BITS);
        let late = prior.last().unwrap().time + 100_000;
        assert_eq!(
            policy.next_difficulty_at(1100, &prior, late).unwrap().to_consensus(),
            BITS
        );
    }

    #[test]
    fn test_testnet_min_difficulty_after_gap() {
        let params = ConsensusParams::testnet();
        let policy = DifficultyPolicy::new(&params);
        let prior = run(1000, 1100, 60, BITS);
        let last_time = prior.last().unwrap().time;

        assert_eq!(
            policy.next_difficulty_at(1100, &prior, last_time + 121).unwrap(),
            params.pow_limit
        );
        assert_eq!(
            policy.next_difficulty_at(1100, &prior, last_time + 120).unwrap().to_consensus(),
            BITS
        );
    }

    #[test]
    fn test_testnet_late_block_at_retarget_height_gets_limit() {
        let params = ConsensusParams::testnet();
        let policy = DifficultyPolicy::new(&params);
        let prior = run(1199, 1440, 60, BITS);
        let last_time = prior.last().unwrap().time;
        assert!(policy.is_retarget_height(1440));

        // The gap rule takes precedence over the interval retarget
        assert_eq!(
            policy.next_difficulty_at(1440, &prior, last_time + 1000).unwrap(),
            params.pow_limit
        );
        assert_eq!(
            policy.next_difficulty_at(1440, &prior, last_time + 60).unwrap(),
            policy.next_difficulty(1440, &prior).unwrap()
        );
    }

    #[test]
    fn test_testnet_skips_min_difficulty_blocks() {
        let params = ConsensusParams::testnet();
        let policy = DifficultyPolicy::new(&params);
        let limit = params.pow_limit.to_consensus();
        let mut prior = run(1000, 1100, 60, BITS);
        for header in prior.iter_mut().skip(95) {
            header.bits = CompactTarget::from_consensus(limit);
        }
        let last_time = prior.last().unwrap().time;
        let next = policy.next_difficulty_at(1100, &prior, last_time + 60).unwrap();
        assert_eq!(next.to_consensus(), BITS);
    }

    #[test]
    fn test_regtest_never_retargets() {
        let params = ConsensusParams::regtest();
        let policy = DifficultyPolicy::new(&params);
        let prior = run(0, 50, 1000, 0x207f_ffff);
        assert!(!policy.is_retarget_height(20));
        assert_eq!(
            policy.next_difficulty(50, &prior).unwrap().to_consensus(),
            0x207f_ffff
        );
    }

    #[test]
    fn test_scale_divides_first_on_overflow() {
        let big = U256::MAX >> 4;
        let scaled = scale(big, 64, 32);
        assert_eq!(scaled, (big / U256::from(32u64)) * U256::from(64u64));
    }
}
