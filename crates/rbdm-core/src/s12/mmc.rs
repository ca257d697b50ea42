//! Module mapping control (MMC) register block

use crate::error::Result;
use crate::module::{register_module, Module};

/// RAM position register.
pub const INITRM: u16 = 0x0010;
/// Register block position register.
pub const INITRG: u16 = 0x0011;
/// EEPROM position register.
pub const INITEE: u16 = 0x0012;
/// Miscellaneous mapping control register.
pub const MISC: u16 = 0x0013;
/// Memory size register 0.
pub const MEMSIZ0: u16 = 0x001C;
/// Memory size register 1.
pub const MEMSIZ1: u16 = 0x001D;
/// Program page index register.
pub const PPAGE: u16 = 0x0030;

/// INITEE: EEPROM mapped on.
pub const EEON: u8 = 0x01;
/// MISC: flash mapped on.
pub const ROMON: u8 = 0x01;
/// MISC: flash in the high half of the map.
pub const ROMHM: u8 = 0x02;

register_module! {
    /// Module mapping control register block.
    pub struct Mmc, "mmc", [
        byte initrm @ INITRM,
        byte initrg @ INITRG,
        byte initee @ INITEE,
        byte misc @ MISC,
        byte memsiz0 @ MEMSIZ0,
        byte memsiz1 @ MEMSIZ1,
        byte ppage @ PPAGE,
    ]
}

impl Mmc<'_> {
    /// True when the EEPROM array is mapped into the address space.
    pub fn eeprom_on(&mut self) -> Result<bool> {
        self.bits_set(INITEE, EEON)
    }

    /// True when the flash array is mapped into the address space.
    pub fn flash_on(&mut self) -> Result<bool> {
        self.bits_set(MISC, ROMON)
    }

    /// Current program page.
    pub fn page(&mut self) -> Result<u8> {
        Ok(self.reg("ppage")? as u8)
    }

    /// Select a program page.
    pub fn set_page(&mut self, page: u8) -> Result<()> {
        self.set_reg("ppage", u16::from(page))
    }
}
