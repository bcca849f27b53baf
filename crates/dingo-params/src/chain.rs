//! Chain views supplied by the block validation engine

use crate::hash::BlockHash;
use crate::pow::CompactTarget;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header summary of a block already on a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHeader {
    /// Block height
    pub height: u32,
    /// Block version
    pub version: i32,
    /// Unix timestamp
    pub time: u32,
    /// Compact difficulty target
    pub bits: CompactTarget,
    /// Nonce
    pub nonce: u32,
    /// Block hash
    pub hash: BlockHash,
}

/// Check that `headers` is an ascending run of consecutive heights.
pub(crate) fn ensure_contiguous(headers: &[ChainHeader]) -> Result<()> {
    for pair in headers.windows(2) {
        if pair[1].height != pair[0].height.wrapping_add(1) || pair[1].height == 0 {
            return Err(Error::InvalidChainState(format!(
                "header heights not contiguous: {} followed by {}",
                pair[0].height, pair[1].height
            )));
        }
    }
    Ok(())
}

/// A chain whose blocks can be looked up by height.
pub trait CandidateChain {
    /// Height of the last block, `None` for an empty chain
    fn tip_height(&self) -> Option<u32>;

    /// Hash of the block at `height`, if the chain reaches it
    fn hash_at(&self, height: u32) -> Option<BlockHash>;
}

/// Hashes indexed by height, starting at genesis
impl CandidateChain for [BlockHash] {
    fn tip_height(&self) -> Option<u32> {
        self.len().checked_sub(1).and_then(|h| u32::try_from(h).ok())
    }

    fn hash_at(&self, height: u32) -> Option<BlockHash> {
        self.get(height as usize).copied()
    }
}

impl CandidateChain for Vec<BlockHash> {
    fn tip_height(&self) -> Option<u32> {
        self.as_slice().tip_height()
    }

    fn hash_at(&self, height: u32) -> Option<BlockHash> {
        self.as_slice().hash_at(height)
    }
}

/// Sparse chains, e.g. only the heights a peer has announced
impl CandidateChain for BTreeMap<u32, BlockHash> {
    fn tip_height(&self) -> Option<u32> {
        self.keys().next_back().copied()
    }

    fn hash_at(&self, height: u32) -> Option<BlockHash> {
        self.get(&height).copied()
    }
}

/// Header runs that may start above genesis
impl CandidateChain for [ChainHeader] {
    fn tip_height(&self) -> Option<u32> {
        self.last().map(|h| h.height)
    }

    fn hash_at(&self, height: u32) -> Option<BlockHash> {
        let first = self.first()?.height;
        let offset = height.checked_sub(first)? as usize;
        self.get(offset)
            .filter(|h| h.height == height)
            .map(|h| h.hash)
            .or_else(|| self.iter().find(|h| h.height == height).map(|h| h.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(height: u32) -> ChainHeader {
        ChainHeader {
            height,
            version: 1,
            time: 1_600_000_000 + height * 60,
            bits: CompactTarget::from_consensus(0x1e0f_fff0),
            nonce: 0,
            hash: BlockHash::hash(&height.to_le_bytes()),
        }
    }

    #[test]
    fn test_contiguous() {
        let headers: Vec<_> = (10..20).map(header).collect();
        assert!(ensure_contiguous(&headers).is_ok());
        assert!(ensure_contiguous(&[]).is_ok());
    }

    #[test]
    fn test_gap_and_reorder_rejected() {
        let gap = vec![header(1), header(3)];
        assert!(matches!(ensure_contiguous(&gap), Err(Error::InvalidChainState(_))));

        let reordered = vec![header(5), header(4)];
        assert!(ensure_contiguous(&reordered).is_err());

        let repeated = vec![header(5), header(5)];
        assert!(ensure_contiguous(&repeated).is_err());
    }

    #[test]
    fn test_hash_slice_view() {
        let hashes: Vec<_> = (0..3).map(|h| header(h).hash).collect();
        assert_eq!(hashes.tip_height(), Some(2));
        assert_eq!(hashes.hash_at(1), Some(header(1).hash));
        assert_eq!(hashes.hash_at(3), None);

        let empty: Vec<BlockHash> = Vec::new();
        assert_eq!(empty.tip_height(), None);
    }

    #[test]
    fn test_header_slice_view() {
        let headers: Vec<_> = (100..105).map(header).collect();
        assert_eq!(headers.as_slice().tip_height(), Some(104));
        assert_eq!(headers.as_slice().hash_at(102), Some(header(102).hash));
        assert_eq!(headers.as_slice().hash_at(99), None);
        assert_eq!(headers.as_slice().hash_at(105), None);
    }

    #[test]
    fn test_sparse_view() {
        let mut chain = BTreeMap::new();
        chain.insert(0, header(0).hash);
        chain.insert(500, header(500).hash);
        assert_eq!(chain.tip_height(), Some(500));
        assert_eq!(chain.hash_at(250), None);
    }
}
