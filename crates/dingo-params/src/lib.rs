//! Dingocoin network parameters and consensus rules
//!
//! This crate provides network-specific constants, the genesis integrity
//! check, checkpoint data and validation, and the difficulty retargeting
//! policy for Dingocoin mainnet, testnet and regtest.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chain;
pub mod checkpoints;
pub mod config;
pub mod consensus;
pub mod difficulty;
pub mod genesis;
pub mod hash;
pub mod network;
pub mod params;
pub mod pow;

pub use chain::{CandidateChain, ChainHeader};
pub use checkpoints::{Checkpoint, CheckpointList, CheckpointValidator, CheckpointViolation};
pub use config::ParamsConfig;
pub use consensus::{ConsensusParams, MajorityParams};
pub use difficulty::DifficultyPolicy;
pub use genesis::{BlockHeader, GenesisBlock};
pub use hash::BlockHash;
pub use network::{Network, NetworkType};
pub use params::{ChainParams, ParamsSummary};
pub use pow::{CompactTarget, U256};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Recomputed genesis hash differs from the compiled-in value.
    ///
    /// The parameter set is self-inconsistent; startup must not continue.
    #[error("Genesis integrity failure: expected {expected}, computed {computed}")]
    GenesisIntegrityFailure {
        /// Hash the preset declares
        expected: BlockHash,
        /// Hash recomputed from the genesis header fields
        computed: BlockHash,
    },

    /// Malformed header sequence handed in by the caller
    #[error("Invalid chain state: {0}")]
    InvalidChainState(String),

    /// Candidate chain conflicts with a trusted checkpoint
    #[error(transparent)]
    Checkpoint(#[from] CheckpointViolation),

    /// Invalid network specified
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// Preset violates one of its own invariants
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Invalid hash literal
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller is expected to recover (reject a peer or chain)
    /// rather than treat the error as a build or integration defect.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Checkpoint(_))
    }
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
