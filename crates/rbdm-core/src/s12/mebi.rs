//! Multiplexed external bus interface (MEBI) register block

use crate::error::Result;
use crate::module::{register_module, Module};

/// Port E assignment register.
pub const PEAR: u16 = 0x000A;
/// Mode register.
pub const MODE: u16 = 0x000B;
/// Pull-up control register.
pub const PUCR: u16 = 0x000C;
/// Reduced drive register.
pub const RDRIV: u16 = 0x000D;
/// External bus interface control register.
pub const EBICTL: u16 = 0x000E;
/// IRQ control register.
pub const IRQCR: u16 = 0x001E;

/// Operating modes encoded in the MODE register's MODC/MODB/MODA bits (plus
/// IVIS/EMK/EME for the emulation variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    /// Special single chip (BDM active out of reset).
    SpecialSingleChip,
    /// Emulation expanded narrow.
    EmulationExpandedNarrow,
    /// Special test.
    SpecialTest,
    /// Emulation expanded wide.
    EmulationExpandedWide,
    /// Normal single chip.
    NormalSingleChip,
    /// Normal expanded narrow.
    NormalExpandedNarrow,
    /// Peripheral.
    Peripheral,
    /// Normal expanded wide.
    NormalExpandedWide,
    /// Reserved or unrecognized encoding.
    Unknown(u8),
}

impl OperatingMode {
    /// Decode a raw MODE register value.
    pub fn decode(mode: u8) -> Self {
        match mode {
            0b0000_0000 => Self::SpecialSingleChip,
            0b0010_1011 => Self::EmulationExpandedNarrow,
            0b0100_1000 => Self::SpecialTest,
            0b0110_1011 => Self::EmulationExpandedWide,
            0b1000_0000 => Self::NormalSingleChip,
            0b1010_0000 => Self::NormalExpandedNarrow,
            0b1100_0000 => Self::Peripheral,
            0b1110_0000 => Self::NormalExpandedWide,
            other => Self::Unknown(other),
        }
    }

    /// Display name of this mode.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SpecialSingleChip => "Special Single Chip",
            Self::EmulationExpandedNarrow => "Emulation Expanded Narrow",
            Self::SpecialTest => "Special Test",
            Self::EmulationExpandedWide => "Emulation Expanded Wide",
            Self::NormalSingleChip => "Normal Single Chip",
            Self::NormalExpandedNarrow => "Normal Expanded Narrow",
            Self::Peripheral => "Peripheral",
            Self::NormalExpandedWide => "Normal Expanded Wide",
            Self::Unknown(_) => "Unknown",
        }
    }
}

register_module! {
    /// Multiplexed external bus interface register block.
    pub struct Mebi, "mebi", [
        byte pear @ PEAR,
        byte mode @ MODE,
        byte pucr @ PUCR,
        byte rdriv @ RDRIV,
        byte ebictl @ EBICTL,
        byte irqcr @ IRQCR,
    ]
}

impl Mebi<'_> {
    /// Read and decode the current operating mode.
    pub fn operating_mode(&mut self) -> Result<OperatingMode> {
        Ok(OperatingMode::decode(self.reg("mode")? as u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_decode_covers_the_documented_encodings() {
        assert_eq!(
            OperatingMode::decode(0x00),
            OperatingMode::SpecialSingleChip
        );
        assert_eq!(OperatingMode::decode(0x80), OperatingMode::NormalSingleChip);
        assert_eq!(
            OperatingMode::decode(0x6B),
            OperatingMode::EmulationExpandedWide
        );
        assert_eq!(OperatingMode::decode(0x42), OperatingMode::Unknown(0x42));
        assert_eq!(OperatingMode::decode(0x42).name(), "Unknown");
    }
}
