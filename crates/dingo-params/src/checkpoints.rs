//! Blockchain checkpoints and reorganization guards

use crate::chain::CandidateChain;
use crate::hash::BlockHash;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A trusted (height, hash) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Block height
    pub height: u32,
    /// Block hash
    pub hash: BlockHash,
}

impl Checkpoint {
    /// Parse a checkpoint from its display-order hex hash
    pub fn new(height: u32, hash: &str) -> Result<Self> {
        Ok(Self {
            height,
            hash: BlockHash::from_hex(hash)?,
        })
    }
}

/// Checkpoints ordered by strictly increasing height
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckpointList {
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointList {
    /// Create a checkpoint list.
    ///
    /// Entries are sorted by height; two entries at one height are rejected.
    pub fn new(mut checkpoints: Vec<Checkpoint>) -> Result<Self> {
        checkpoints.sort_by_key(|cp| cp.height);
        if let Some(pair) = checkpoints.windows(2).find(|p| p[0].height == p[1].height) {
            return Err(Error::InvalidParams(format!(
                "duplicate checkpoint at height {}",
                pair[0].height
            )));
        }
        Ok(Self { checkpoints })
    }

    /// Parse `(height, hex hash)` literals
    pub fn from_literals(literals: &[(u32, &str)]) -> Result<Self> {
        let checkpoints = literals
            .iter()
            .map(|(height, hash)| Checkpoint::new(*height, hash))
            .collect::<Result<Vec<_>>>()?;
        Self::new(checkpoints)
    }

    /// Expected hash at `height`, if it is checkpointed
    pub fn get(&self, height: u32) -> Option<&BlockHash> {
        self.checkpoints
            .binary_search_by_key(&height, |cp| cp.height)
            .ok()
            .map(|i| &self.checkpoints[i].hash)
    }

    /// Get checkpoint at or before given height
    pub fn checkpoint_at_height(&self, height: u32) -> Option<&Checkpoint> {
        self.checkpoints.iter().rev().find(|cp| cp.height <= height)
    }

    /// Get all checkpoints
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Get latest checkpoint
    pub fn latest(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    /// Get checkpoint count
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Check that the list starts at genesis with the given hash.
    pub fn ensure_anchored(&self, genesis_hash: &BlockHash) -> Result<()> {
        match self.checkpoints.first() {
            Some(cp) if cp.height == 0 && cp.hash == *genesis_hash => Ok(()),
            Some(cp) if cp.height == 0 => Err(Error::InvalidParams(format!(
                "checkpoint 0 is {}, genesis is {}",
                cp.hash, genesis_hash
            ))),
            _ => Err(Error::InvalidParams(
                "checkpoint list has no genesis entry".to_string(),
            )),
        }
    }
}

/// A chain that conflicts with the trusted checkpoints
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckpointViolation {
    /// The block at a checkpointed height has the wrong hash
    #[error("Checkpoint mismatch at height {height}: expected {expected}, found {found}")]
    Mismatch {
        /// Checkpointed height
        height: u32,
        /// Trusted hash
        expected: BlockHash,
        /// Hash the candidate carries
        found: BlockHash,
    },

    /// A reorganization would replace blocks at or below a passed checkpoint
    #[error("Reorganization forking at height {fork_height} crosses checkpoint {checkpoint_height}")]
    ReorgBelowCheckpoint {
        /// Last block shared by both chains
        fork_height: u32,
        /// Checkpoint the current chain has already passed
        checkpoint_height: u32,
    },
}

impl CheckpointViolation {
    /// Height of the checkpoint that was violated
    pub fn height(&self) -> u32 {
        match self {
            Self::Mismatch { height, .. } => *height,
            Self::ReorgBelowCheckpoint {
                checkpoint_height, ..
            } => *checkpoint_height,
        }
    }
}

/// Rejects chains that disagree with a checkpoint list.
///
/// Stateless; a chain shorter than the last checkpoint passes provisionally
/// and has to be checked again as it grows (see [`check_block`]).
///
/// [`check_block`]: CheckpointValidator::check_block
#[derive(Debug, Clone, Copy)]
pub struct CheckpointValidator<'a> {
    checkpoints: &'a [Checkpoint],
}

impl<'a> CheckpointValidator<'a> {
    /// Validator over a checkpoint list
    pub fn new(list: &'a CheckpointList) -> Self {
        Self {
            checkpoints: list.checkpoints(),
        }
    }

    /// Validator that accepts every chain
    pub fn disabled() -> CheckpointValidator<'static> {
        CheckpointValidator { checkpoints: &[] }
    }

    /// Validate every checkpoint the candidate reaches.
    pub fn validate<C>(&self, chain: &C) -> std::result::Result<(), CheckpointViolation>
    where
        C: CandidateChain + ?Sized,
    {
        let Some(tip) = chain.tip_height() else {
            return Ok(());
        };

        for cp in self.checkpoints.iter().take_while(|cp| cp.height <= tip) {
            if let Some(found) = chain.hash_at(cp.height) {
                self.check_hash(cp, found)?;
            }
        }

        if self.checkpoints.last().is_some_and(|cp| cp.height > tip) {
            debug!("Chain at height {} accepted provisionally", tip);
        }
        Ok(())
    }

    /// Check one newly connected block.
    pub fn check_block(
        &self,
        height: u32,
        hash: &BlockHash,
    ) -> std::result::Result<(), CheckpointViolation> {
        match self.find(height) {
            Some(cp) => self.check_hash(cp, *hash),
            None => Ok(()),
        }
    }

    /// Refuse a reorganization whose fork point lies below the last
    /// checkpoint `current_tip` has passed.
    pub fn check_reorg(
        &self,
        fork_height: u32,
        current_tip: u32,
    ) -> std::result::Result<(), CheckpointViolation> {
        match self.last_passed(current_tip) {
            Some(cp) if fork_height < cp.height => {
                warn!(
                    "Rejecting reorganization from height {}: checkpoint {} already passed",
                    fork_height, cp.height
                );
                Err(CheckpointViolation::ReorgBelowCheckpoint {
                    fork_height,
                    checkpoint_height: cp.height,
                })
            }
            _ => Ok(()),
        }
    }

    /// Highest checkpoint at or below `tip`
    pub fn last_passed(&self, tip: u32) -> Option<&'a Checkpoint> {
        self.checkpoints.iter().rev().find(|cp| cp.height <= tip)
    }

    /// Whether `height` is covered by some checkpoint
    pub fn is_below_last_checkpoint(&self, height: u32) -> bool {
        self.checkpoints
            .last()
            .is_some_and(|cp| height <= cp.height)
    }

    fn find(&self, height: u32) -> Option<&'a Checkpoint> {
        self.checkpoints
            .binary_search_by_key(&height, |cp| cp.height)
            .ok()
            .map(|i| &self.checkpoints[i])
    }

    fn check_hash(
        &self,
        cp: &Checkpoint,
        found: BlockHash,
    ) -> std::result::Result<(), CheckpointViolation> {
        if found == cp.hash {
            return Ok(());
        }
        warn!(
            "Checkpoint mismatch at height {}: expected {}, found {}",
            cp.height, cp.hash, found
        );
        Err(CheckpointViolation::Mismatch {
            height: cp.height,
            expected: cp.hash,
            found,
        })
    }
}
