//! Genesis blocks and the header encoding used to hash them

use crate::hash::BlockHash;
use crate::pow::CompactTarget;
use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// Size of a serialized block header
pub const HEADER_SIZE: usize = 80;

/// Fields of a block header in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version
    pub version: i32,
    /// Hash of the previous block
    pub prev_blockhash: BlockHash,
    /// Merkle root of the block's transactions
    pub merkle_root: BlockHash,
    /// Unix timestamp
    pub time: u32,
    /// Compact difficulty target
    pub bits: CompactTarget,
    /// Nonce
    pub nonce: u32,
}

impl BlockHeader {
    /// Serialize to the 80-byte little-endian layout
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(self.prev_blockhash.as_bytes());
        out[36..68].copy_from_slice(self.merkle_root.as_bytes());
        out[68..72].copy_from_slice(&self.time.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_consensus().to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Double-SHA256 of the encoded header.
    ///
    /// This is the block identifier, not the Scrypt proof-of-work hash.
    pub fn block_hash(&self) -> BlockHash {
        BlockHash::hash(&self.encode())
    }
}

/// A genesis header together with the hash the network declares for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisBlock {
    /// Header fields
    pub header: BlockHeader,
    /// Declared hash
    pub expected_hash: BlockHash,
}

/// Merkle root of the single coinbase ("Nintondo") shared by every
/// Dogecoin-lineage genesis block
pub const GENESIS_MERKLE_ROOT: &str =
    "5b2a3f53f605d62c53e62932dac6925e3d74afa5a4b459745c36d42d0ed26a69";

impl GenesisBlock {
    /// Build a genesis block from its declared time, bits and nonce.
    pub fn new(time: u32, bits: u32, nonce: u32, expected_hash: &str) -> Result<Self> {
        Ok(Self {
            header: BlockHeader {
                version: 1,
                prev_blockhash: BlockHash::ZERO,
                merkle_root: BlockHash::from_hex(GENESIS_MERKLE_ROOT)?,
                time,
                bits: CompactTarget::from_consensus(bits),
                nonce,
            },
            expected_hash: BlockHash::from_hex(expected_hash)?,
        })
    }

    /// Recompute the header hash and compare it with the declared one.
    pub fn verify(&self) -> Result<BlockHash> {
        let computed = self.header.block_hash();
        if computed != self.expected_hash {
            return Err(Error::GenesisIntegrityFailure {
                expected: self.expected_hash,
                computed,
            });
        }
        Ok(computed)
    }

    /// Genesis timestamp
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.header.time), 0)
    }
}
