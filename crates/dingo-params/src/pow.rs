//! Proof-of-work targets in compact ("nBits") form

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// The macro expansion names `Result` and `Error` unqualified
mod u256 {
    #![allow(missing_docs)]

    uint::construct_uint! {
        /// Unsigned 256-bit integer for target arithmetic
        pub struct U256(4);
    }
}

pub use u256::U256;

/// A target encoded in the 32-bit compact form carried by block headers.
///
/// The top byte is a base-256 exponent, the low 23 bits the mantissa and
/// bit 23 a sign flag that valid targets never set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompactTarget(u32);

impl CompactTarget {
    /// Wrap raw header bits
    pub const fn from_consensus(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw header bits
    pub const fn to_consensus(self) -> u32 {
        self.0
    }

    /// Expand to a full 256-bit target.
    ///
    /// Negative or overflowing encodings are rejected; no header may
    /// legitimately carry them.
    pub fn to_target(self) -> Result<U256> {
        let bits = self.0;
        let size = bits >> 24;
        let word = bits & 0x007f_ffff;

        if word != 0 && bits & 0x0080_0000 != 0 {
            return Err(Error::InvalidChainState(format!(
                "negative compact target {:#010x}",
                bits
            )));
        }
        if word != 0 && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32)) {
            return Err(Error::InvalidChainState(format!(
                "compact target {:#010x} overflows 256 bits",
                bits
            )));
        }

        let target = if size <= 3 {
            U256::from(word >> (8 * (3 - size)))
        } else {
            U256::from(word) << (8 * (size - 3)) as usize
        };
        Ok(target)
    }

    /// Compress a 256-bit target, truncating the mantissa to 23 bits
    pub fn from_target(target: U256) -> Self {
        let mut size = (target.bits() + 7) / 8;
        let mut compact = if size <= 3 {
            target.low_u64() << (8 * (3 - size))
        } else {
            (target >> (8 * (size - 3))).low_u64()
        };

        // Keep the sign bit clear by moving one byte into the exponent
        if compact & 0x0080_0000 != 0 {
            compact >>= 8;
            size += 1;
        }

        Self(compact as u32 | (size as u32) << 24)
    }
}

impl fmt::Debug for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompactTarget({:#010x})", self.0)
    }
}

impl fmt::Display for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
