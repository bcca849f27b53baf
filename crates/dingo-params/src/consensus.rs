//! Consensus parameters for Dingocoin

use crate::chain::ChainHeader;
use crate::network::NetworkType;
use crate::pow::CompactTarget;
use crate::{Error, Result};

/// Consensus parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusParams {
    /// Target block time in seconds
    pub pow_target_spacing: u32,
    /// Time the legacy algorithm spreads one retarget over, in seconds
    pub legacy_target_timespan: u32,
    /// First height retargeted by the per-block algorithm
    pub difficulty_fork_height: u32,
    /// Easiest target any block may carry
    pub pow_limit: CompactTarget,
    /// Target of the genesis block
    pub genesis_bits: CompactTarget,
    /// Permit minimum-difficulty blocks after a long gap (test networks only)
    pub allow_min_difficulty_blocks: bool,
    /// Never retarget (regtest)
    pub no_retargeting: bool,
    /// Blocks between subsidy reductions
    pub subsidy_decrease_block_count: u32,
    /// Confirmations before a coinbase output can be spent
    pub spendable_coinbase_depth: u32,
}

impl ConsensusParams {
    /// Create consensus params for mainnet
    pub fn mainnet() -> Self {
        Self {
            pow_target_spacing: 60, // 1 minute
            legacy_target_timespan: 4 * 60 * 60, // 4 hours
            difficulty_fork_height: 145_000,
            pow_limit: CompactTarget::from_consensus(0x1e0f_ffff),
            genesis_bits: CompactTarget::from_consensus(0x1e0f_fff0),
            allow_min_difficulty_blocks: false,
            no_retargeting: false,
            subsidy_decrease_block_count: 100_000,
            spendable_coinbase_depth: 100,
        }
    }

    /// Create consensus params for testnet
    pub fn testnet() -> Self {
        Self {
            pow_target_spacing: 60,
            legacy_target_timespan: 4 * 60 * 60,
            difficulty_fork_height: 145_000,
            pow_limit: CompactTarget::from_consensus(0x1e0f_ffff),
            genesis_bits: CompactTarget::from_consensus(0x1e0f_fff0),
            allow_min_difficulty_blocks: true,
            no_retargeting: false,
            subsidy_decrease_block_count: 100_000,
            spendable_coinbase_depth: 30,
        }
    }

    /// Create consensus params for regtest
    pub fn regtest() -> Self {
        Self {
            pow_target_spacing: 1, // 1 second for testing
            legacy_target_timespan: 1,
            difficulty_fork_height: 10,
            pow_limit: CompactTarget::from_consensus(0x207f_ffff),
            genesis_bits: CompactTarget::from_consensus(0x207f_ffff),
            allow_min_difficulty_blocks: true,
            no_retargeting: true,
            subsidy_decrease_block_count: 150, // Fast reductions for testing
            spendable_coinbase_depth: 60,
        }
    }

    /// Get consensus params by network type
    pub fn from_network(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Testnet => Self::testnet(),
            NetworkType::Regtest => Self::regtest(),
        }
    }

    /// Blocks between legacy retargets
    pub fn legacy_interval(&self) -> u32 {
        (self.legacy_target_timespan / self.pow_target_spacing).max(1)
    }

    /// Number of subsidy reductions applied at `height`
    pub fn subsidy_epoch(&self, height: u32) -> u32 {
        height / self.subsidy_decrease_block_count
    }

    /// Whether a coinbase mined at `coinbase_height` may be spent in a block at
    /// `spend_height`
    pub fn is_coinbase_spendable(&self, coinbase_height: u32, spend_height: u32) -> bool {
        spend_height >= coinbase_height.saturating_add(self.spendable_coinbase_depth)
    }

    /// Check internal consistency of the preset
    pub fn validate(&self) -> Result<()> {
        if self.pow_target_spacing == 0 || self.legacy_target_timespan == 0 {
            return Err(Error::InvalidParams(
                "target spacing and timespan must be non-zero".to_string(),
            ));
        }
        if self.subsidy_decrease_block_count == 0 {
            return Err(Error::InvalidParams(
                "subsidy decrease interval must be non-zero".to_string(),
            ));
        }
        let limit = self.pow_limit.to_target()?;
        let genesis = self.genesis_bits.to_target()?;
        if genesis > limit {
            return Err(Error::InvalidParams(format!(
                "genesis target {} is easier than the proof-of-work limit {}",
                self.genesis_bits, self.pow_limit
            )));
        }
        Ok(())
    }
}

/// Soft-fork activation thresholds over a window of recent block versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MajorityParams {
    /// Number of recent blocks inspected
    pub window: u32,
    /// Upgraded blocks needed before the new rules apply to upgraded blocks
    pub enforce_block_upgrade: u32,
    /// Upgraded blocks needed before outdated versions are rejected
    pub reject_block_outdated: u32,
}

impl MajorityParams {
    /// Mainnet thresholds
    pub const fn mainnet() -> Self {
        Self {
            window: 2000,
            enforce_block_upgrade: 1500,
            reject_block_outdated: 1900,
        }
    }

    /// Testnet and regtest thresholds
    pub const fn testnet() -> Self {
        Self {
            window: 1000,
            enforce_block_upgrade: 501,
            reject_block_outdated: 750,
        }
    }

    /// Get thresholds by network type
    pub const fn from_network(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Testnet | NetworkType::Regtest => Self::testnet(),
        }
    }

    /// Require `0 < enforce <= reject <= window`
    pub fn validate(&self) -> Result<()> {
        if self.enforce_block_upgrade == 0
            || self.enforce_block_upgrade > self.reject_block_outdated
            || self.reject_block_outdated > self.window
        {
            return Err(Error::InvalidParams(format!(
                "majority thresholds out of order: enforce {} reject {} window {}",
                self.enforce_block_upgrade, self.reject_block_outdated, self.window
            )));
        }
        Ok(())
    }

    /// Count blocks with version >= `min_version` among the last `window`
    /// entries of `recent` (ordered oldest to newest).
    pub fn count_at_least(&self, min_version: i32, recent: &[ChainHeader]) -> u32 {
        let count = recent
            .iter()
            .rev()
            .take(self.window as usize)
            .filter(|h| h.version >= min_version)
            .count();
        count as u32
    }

    /// Whether blocks of `min_version` must follow the new rules
    pub fn should_enforce_upgrade(&self, min_version: i32, recent: &[ChainHeader]) -> bool {
        self.count_at_least(min_version, recent) >= self.enforce_block_upgrade
    }

    /// Whether blocks below `min_version` are now invalid
    pub fn should_reject_outdated(&self, min_version: i32, recent: &[ChainHeader]) -> bool {
        self.count_at_least(min_version, recent) >= self.reject_block_outdated
    }
}
