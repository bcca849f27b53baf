//! Complete per-network parameter sets.
//!
//! A [`ChainParams`] is built once per network and never mutated. Callers
//! either construct one with [`ChainParams::try_new`] and pass it around, or
//! use the process-wide cache behind [`get`], which builds each network's
//! parameters at most once.

use crate::checkpoints::{Checkpoint, CheckpointList, CheckpointValidator};
use crate::consensus::{ConsensusParams, MajorityParams};
use crate::difficulty::DifficultyPolicy;
use crate::genesis::GenesisBlock;
use crate::hash::BlockHash;
use crate::network::{Network, NetworkType};
use crate::{Error, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Genesis time, bits, nonce and hash of a network
struct GenesisLiteral {
    time: u32,
    bits: u32,
    nonce: u32,
    hash: &'static str,
}

const MAINNET_GENESIS: GenesisLiteral = GenesisLiteral {
    time: 1386325540,
    bits: 0x1e0f_fff0,
    nonce: 99943,
    hash: "1a91e3dace36e2be3bf030a65679fe821aa1d6ef92e7c9902eb318182c355691",
};

const TESTNET_GENESIS: GenesisLiteral = GenesisLiteral {
    time: 1391503289,
    bits: 0x1e0f_fff0,
    nonce: 997879,
    hash: "bb0a78264637406b6360aad926284d544d7049f45189db5664f3c4d07350559e",
};

const REGTEST_GENESIS: GenesisLiteral = GenesisLiteral {
    time: 1296688602,
    bits: 0x207f_ffff,
    nonce: 2,
    hash: "3d2160a3b5dc4a9d62e7e66a295f70313ac808440ef7400d6c0772171ce973a5",
};

const MAINNET_CHECKPOINTS: &[(u32, &str)] = &[
    (0, "1a91e3dace36e2be3bf030a65679fe821aa1d6ef92e7c9902eb318182c355691"),
    (581_515, "1a8e374e25b4c175669dae9beea1f5d2cc035ef5d4301defaf4a4ca7778fa83c"),
];

const TESTNET_CHECKPOINTS: &[(u32, &str)] = &[(
    0,
    "bb0a78264637406b6360aad926284d544d7049f45189db5664f3c4d07350559e",
)];

const REGTEST_CHECKPOINTS: &[(u32, &str)] = &[(
    0,
    "3d2160a3b5dc4a9d62e7e66a295f70313ac808440ef7400d6c0772171ce973a5",
)];

/// Everything a validation engine needs to know about one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParams {
    /// Wire and address constants
    pub network: Network,
    /// Consensus and difficulty constants
    pub consensus: ConsensusParams,
    /// Soft-fork majority thresholds
    pub majority: MajorityParams,
    /// Genesis block
    pub genesis: GenesisBlock,
    /// Verified genesis hash
    pub genesis_hash: BlockHash,
    /// Trusted checkpoints
    pub checkpoints: CheckpointList,
}

impl ChainParams {
    /// Build and verify the preset for `network_type`.
    pub fn try_new(network_type: NetworkType) -> Result<Self> {
        let (genesis, checkpoints) = match network_type {
            NetworkType::Mainnet => (&MAINNET_GENESIS, MAINNET_CHECKPOINTS),
            NetworkType::Testnet => (&TESTNET_GENESIS, TESTNET_CHECKPOINTS),
            NetworkType::Regtest => (&REGTEST_GENESIS, REGTEST_CHECKPOINTS),
        };

        Self::from_parts(
            Network::from_type(network_type),
            ConsensusParams::from_network(network_type),
            MajorityParams::from_network(network_type),
            GenesisBlock::new(genesis.time, genesis.bits, genesis.nonce, genesis.hash)?,
            CheckpointList::from_literals(checkpoints)?,
        )
    }

    /// Assemble a parameter set, running every integrity check.
    ///
    /// The genesis hash is recomputed from the header fields; any mismatch is
    /// a [`Error::GenesisIntegrityFailure`].
    pub fn from_parts(
        network: Network,
        consensus: ConsensusParams,
        majority: MajorityParams,
        genesis: GenesisBlock,
        checkpoints: CheckpointList,
    ) -> Result<Self> {
        let genesis_hash = genesis.verify().map_err(|e| {
            error!("{} genesis block failed verification: {}", network.network_type, e);
            e
        })?;

        network.validate()?;
        consensus.validate()?;
        majority.validate()?;

        if genesis.header.bits != consensus.genesis_bits {
            return Err(Error::InvalidParams(format!(
                "genesis header bits {} differ from consensus genesis bits {}",
                genesis.header.bits, consensus.genesis_bits
            )));
        }
        checkpoints.ensure_anchored(&genesis_hash)?;

        info!(
            "Loaded {} parameters: genesis {}, {} checkpoints",
            network.network_type,
            genesis_hash,
            checkpoints.len()
        );

        Ok(Self {
            network,
            consensus,
            majority,
            genesis,
            genesis_hash,
            checkpoints,
        })
    }

    /// Cached mainnet parameters
    pub fn mainnet() -> &'static Self {
        get(NetworkType::Mainnet)
    }

    /// Cached testnet parameters
    pub fn testnet() -> &'static Self {
        get(NetworkType::Testnet)
    }

    /// Cached regtest parameters
    pub fn regtest() -> &'static Self {
        get(NetworkType::Regtest)
    }

    /// Network type
    pub fn network_type(&self) -> NetworkType {
        self.network.network_type
    }

    /// Message start bytes in wire order
    pub fn magic_bytes(&self) -> [u8; 4] {
        self.network.magic_bytes()
    }

    /// Identifier used by the payment protocol
    pub fn payment_protocol_id(&self) -> &'static str {
        self.network.payment_protocol_id
    }

    /// Whether this is a test network
    pub fn is_testnet(&self) -> bool {
        self.network.is_testnet()
    }

    /// Whether minimum-difficulty blocks are permitted
    pub fn allow_min_difficulty_blocks(&self) -> bool {
        self.consensus.allow_min_difficulty_blocks
    }

    /// Difficulty policy over these parameters
    pub fn difficulty_policy(&self) -> DifficultyPolicy<'_> {
        DifficultyPolicy::new(&self.consensus)
    }

    /// Checkpoint validator over these parameters
    pub fn checkpoint_validator(&self) -> CheckpointValidator<'_> {
        CheckpointValidator::new(&self.checkpoints)
    }

    /// Serializable description for export
    pub fn summary(&self) -> ParamsSummary {
        ParamsSummary {
            network: self.network.network_type,
            id: self.network.id.to_string(),
            magic: hex::encode(self.magic_bytes()),
            default_port: self.network.default_port,
            address_header: self.network.address_header,
            p2sh_header: self.network.p2sh_header,
            dumped_private_key_header: self.network.dumped_private_key_header,
            segwit_hrp: self.network.segwit_hrp.to_string(),
            bip32_header_pub: format!("{:08x}", self.network.bip32_header_pub),
            bip32_header_priv: format!("{:08x}", self.network.bip32_header_priv),
            genesis_hash: self.genesis_hash,
            genesis_time: self.genesis.timestamp().map(|ts| ts.to_rfc3339()),
            difficulty_fork_height: self.consensus.difficulty_fork_height,
            allow_min_difficulty_blocks: self.consensus.allow_min_difficulty_blocks,
            majority_window: self.majority.window,
            majority_enforce_block_upgrade: self.majority.enforce_block_upgrade,
            majority_reject_block_outdated: self.majority.reject_block_outdated,
            checkpoints: self.checkpoints.checkpoints().to_vec(),
            dns_seeds: self.network.dns_seeds.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Flat, serializable view of a [`ChainParams`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsSummary {
    /// Network type
    pub network: NetworkType,
    /// Network identifier
    pub id: String,
    /// Message start bytes, hex
    pub magic: String,
    /// P2P port
    pub default_port: u16,
    /// P2PKH version byte
    pub address_header: u8,
    /// P2SH version byte
    pub p2sh_header: u8,
    /// Private key version byte
    pub dumped_private_key_header: u8,
    /// Bech32 human-readable part
    pub segwit_hrp: String,
    /// BIP32 public version, hex
    pub bip32_header_pub: String,
    /// BIP32 private version, hex
    pub bip32_header_priv: String,
    /// Genesis hash
    pub genesis_hash: BlockHash,
    /// Genesis time, RFC 3339
    pub genesis_time: Option<String>,
    /// First per-block retarget height
    pub difficulty_fork_height: u32,
    /// Minimum-difficulty blocks permitted
    pub allow_min_difficulty_blocks: bool,
    /// Majority window
    pub majority_window: u32,
    /// Majority enforce threshold
    pub majority_enforce_block_upgrade: u32,
    /// Majority reject threshold
    pub majority_reject_block_outdated: u32,
    /// Checkpoints
    pub checkpoints: Vec<Checkpoint>,
    /// DNS seeds
    pub dns_seeds: Vec<String>,
}

fn cell(network_type: NetworkType) -> &'static OnceCell<ChainParams> {
    static MAINNET: OnceCell<ChainParams> = OnceCell::new();
    static TESTNET: OnceCell<ChainParams> = OnceCell::new();
    static REGTEST: OnceCell<ChainParams> = OnceCell::new();
    match network_type {
        NetworkType::Mainnet => &MAINNET,
        NetworkType::Testnet => &TESTNET,
        NetworkType::Regtest => &REGTEST,
    }
}

/// Get shared parameters (lazy init), returning construction errors.
pub fn try_get(network_type: NetworkType) -> Result<&'static ChainParams> {
    cell(network_type).get_or_try_init(|| ChainParams::try_new(network_type))
}

/// Get shared parameters (lazy init).
///
/// # Panics
///
/// If the compiled-in parameters fail their integrity checks. The build is
/// corrupt and no block can be validated against it.
pub fn get(network_type: NetworkType) -> &'static ChainParams {
    try_get(network_type)
        .unwrap_or_else(|e| panic!("{} parameters are corrupt: {}", network_type, e))
}
