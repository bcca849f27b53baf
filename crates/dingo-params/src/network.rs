//! Dingocoin network definitions

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Mainnet
    #[default]
    Mainnet,
    /// Testnet
    Testnet,
    /// Regtest (local development)
    Regtest,
}

impl NetworkType {
    /// Lowercase name
    pub const fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Mainnet => "mainnet",
            NetworkType::Testnet => "testnet",
            NetworkType::Regtest => "regtest",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(NetworkType::Mainnet),
            "testnet" | "test" => Ok(NetworkType::Testnet),
            "regtest" => Ok(NetworkType::Regtest),
            other => Err(Error::InvalidNetwork(other.to_string())),
        }
    }
}

/// Wire and address constants of a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    /// Network type
    pub network_type: NetworkType,
    /// Network identifier
    pub id: &'static str,
    /// Identifier used by the payment protocol
    pub payment_protocol_id: &'static str,
    /// Message start bytes as a big-endian word
    pub packet_magic: u32,
    /// P2P port
    pub default_port: u16,
    /// Base58 version byte of pay-to-pubkey-hash addresses
    pub address_header: u8,
    /// Base58 version byte of pay-to-script-hash addresses
    pub p2sh_header: u8,
    /// Base58 version byte of dumped private keys
    pub dumped_private_key_header: u8,
    /// Bech32 human-readable part
    pub segwit_hrp: &'static str,
    /// BIP32 extended public key version
    pub bip32_header_pub: u32,
    /// BIP32 extended private key version
    pub bip32_header_priv: u32,
    /// DNS seeds for peer discovery
    pub dns_seeds: &'static [&'static str],
}

impl Network {
    /// Get mainnet parameters
    pub const fn mainnet() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            id: "org.dingocoin.production",
            payment_protocol_id: "org.dingocoin.production",
            packet_magic: 0xc1c1_c1c1,
            default_port: 33117,
            address_header: 30,
            p2sh_header: 22,
            dumped_private_key_header: 158,
            segwit_hrp: "dingo",
            bip32_header_pub: 0x02fa_cafd,  // "dgub"
            bip32_header_priv: 0x02fa_c398, // "dgpv"
            dns_seeds: &[
                "seed.dingocoin.org",
                "seed2.dingocoin.org",
                "seed3.dingocoin.org",
                "seed.dingocoin.com",
                "seed2.dingocoin.com",
                "seed3.dingocoin.com",
            ],
        }
    }

    /// Get testnet parameters
    pub const fn testnet() -> Self {
        Self {
            network_type: NetworkType::Testnet,
            id: "org.dingocoin.test",
            payment_protocol_id: "org.dingocoin.test",
            packet_magic: 0xfcc1_b7dc,
            default_port: 44556,
            address_header: 113,
            p2sh_header: 196,
            dumped_private_key_header: 241,
            segwit_hrp: "tdingo",
            bip32_header_pub: 0x0435_87cf,  // "tpub"
            bip32_header_priv: 0x0435_8394, // "tprv"
            dns_seeds: &[],
        }
    }

    /// Get regtest parameters
    pub const fn regtest() -> Self {
        Self {
            network_type: NetworkType::Regtest,
            id: "org.dingocoin.regtest",
            payment_protocol_id: "org.dingocoin.regtest",
            packet_magic: 0xfabf_b5da,
            default_port: 18444,
            address_header: 111,
            p2sh_header: 196,
            dumped_private_key_header: 239,
            segwit_hrp: "dingort",
            bip32_header_pub: 0x0435_87cf,
            bip32_header_priv: 0x0435_8394,
            dns_seeds: &[],
        }
    }

    /// Get network by type
    pub const fn from_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Testnet => Self::testnet(),
            NetworkType::Regtest => Self::regtest(),
        }
    }

    /// Message start bytes in wire order
    pub const fn magic_bytes(&self) -> [u8; 4] {
        self.packet_magic.to_be_bytes()
    }

    /// Whether this is a test network
    pub const fn is_testnet(&self) -> bool {
        !matches!(self.network_type, NetworkType::Mainnet)
    }

    /// Check header-byte conventions
    pub fn validate(&self) -> Result<()> {
        if self.dumped_private_key_header != self.address_header.wrapping_add(128) {
            return Err(Error::InvalidParams(format!(
                "private key header {} is not address header {} + 128",
                self.dumped_private_key_header, self.address_header
            )));
        }
        if self.address_header == self.p2sh_header {
            return Err(Error::InvalidParams(format!(
                "address and p2sh headers collide at {}",
                self.address_header
            )));
        }
        if self.bip32_header_pub == self.bip32_header_priv {
            return Err(Error::InvalidParams(
                "BIP32 public and private headers collide".to_string(),
            ));
        }
        Ok(())
    }
}
