//! Addressing modes.
//!
//! Every operand-taking instruction encodes as an opcode byte, an
//! addressing-mode byte, and the operand bytes. Modes `>= 0x10` are the
//! *short* variants of the memory modes: the operand shrinks to a single
//! byte and the access is byte-granular instead of word-granular.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

/// Added to a memory mode's code to select its short variant.
pub const SHORT_BIT: u8 = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum AddrMode {
    /// `$1234` — `mem[op]`
    Absolute = 0x00,
    /// `$1234, x` — `mem[op + X]`
    XIndexed = 0x01,
    /// `$1234, y` — `mem[op + Y]`
    YIndexed = 0x02,
    /// `#$1234` — the operand itself
    Immediate = 0x03,
    /// `($1234)` — `mem[mem[op]]`
    Indirect = 0x04,
    /// `($12), x` — `mem[mem[op] + X]`
    IndirectIndexedX = 0x05,
    /// `($12), y` — `mem[mem[op] + Y]`
    IndirectIndexedY = 0x06,
    /// `($12, x)` — `mem[mem[op + X]]`
    IndexedIndirectX = 0x07,
    /// `($12, y)` — `mem[mem[op + Y]]`
    IndexedIndirectY = 0x08,
    /// `A` — the A register
    RegA = 0x09,
    /// `B` — the B register
    RegB = 0x0A,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid addressing mode byte: {0:#04x}")]
pub struct BadAddrMode(pub u8);

impl AddrMode {
    /// Decodes a mode byte into the base mode and its short flag.
    pub fn decode(byte: u8) -> Result<(AddrMode, bool), BadAddrMode> {
        let (base, short) = if byte >= SHORT_BIT {
            (byte - SHORT_BIT, true)
        } else {
            (byte, false)
        };
        let mode = AddrMode::try_from(base).map_err(|_| BadAddrMode(byte))?;
        if short && !mode.is_memory() {
            return Err(BadAddrMode(byte));
        }
        Ok((mode, short))
    }

    /// Encodes the mode back to its byte; `short` selects the short variant.
    pub fn encode(self, short: bool) -> u8 {
        let base: u8 = self.into();
        if short {
            base + SHORT_BIT
        } else {
            base
        }
    }

    /// True for modes whose operand is a memory address.
    pub fn is_memory(self) -> bool {
        !matches!(self, AddrMode::Immediate | AddrMode::RegA | AddrMode::RegB)
    }

    /// True for the register modes, which carry no operand bytes.
    pub fn is_register(self) -> bool {
        matches!(self, AddrMode::RegA | AddrMode::RegB)
    }

    /// Operand byte count for this mode.
    pub fn operand_len(self, short: bool) -> u16 {
        if self.is_register() {
            0
        } else if short {
            1
        } else {
            crate::WORD_BYTES
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_word_modes() {
        assert_eq!(AddrMode::decode(0x00), Ok((AddrMode::Absolute, false)));
        assert_eq!(AddrMode::decode(0x03), Ok((AddrMode::Immediate, false)));
        assert_eq!(AddrMode::decode(0x0A), Ok((AddrMode::RegB, false)));
    }

    #[test]
    fn decode_short_modes() {
        assert_eq!(AddrMode::decode(0x10), Ok((AddrMode::Absolute, true)));
        assert_eq!(AddrMode::decode(0x12), Ok((AddrMode::YIndexed, true)));
        // register modes have no short variant
        assert!(AddrMode::decode(0x19).is_err());
        assert!(AddrMode::decode(0x0B).is_err());
    }

    #[test]
    fn encode_is_inverse_of_decode() {
        for byte in 0x00..=0x18u8 {
            if let Ok((mode, short)) = AddrMode::decode(byte) {
                assert_eq!(mode.encode(short), byte);
            }
        }
    }

    #[test]
    fn operand_lengths() {
        assert_eq!(AddrMode::Absolute.operand_len(false), 2);
        assert_eq!(AddrMode::Absolute.operand_len(true), 1);
        assert_eq!(AddrMode::RegA.operand_len(false), 0);
    }
}
