//! S12 EEPROM controller (EETS)
//!
//! Same command protocol as the flash controller, with its own register
//! block, a sector-modify command and a single 4 KiB array mapped low.

use crate::error::Result;
use crate::module::{register_module, Module};
use crate::s12::nvm::{self, NvmLayout, NvmStatus};
use crate::target::Target;

/// EEPROM clock divider register.
pub const ECLKDIV: u16 = 0x0110;
/// EEPROM configuration register.
pub const ECNFG: u16 = 0x0113;
/// EEPROM protection register.
pub const EPROT: u16 = 0x0114;
/// EEPROM status register.
pub const ESTAT: u16 = 0x0115;
/// EEPROM command register.
pub const ECMD: u16 = 0x0116;
/// EEPROM address register.
pub const EADDR: u16 = 0x0118;
/// EEPROM data register.
pub const EDATA: u16 = 0x011A;

/// EPROT: protection function open.
pub const EPOPEN: u8 = 0x80;
/// EPROT: protected range disabled.
pub const EPDIS: u8 = 0x08;

/// EEPROM controller commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EepromCommand {
    /// Verify the array reads erased; sets BLANK on success.
    EraseVerify = 0x05,
    /// Program one aligned word.
    Program = 0x20,
    /// Erase the 4-byte sector containing the given address.
    SectorErase = 0x40,
    /// Erase the whole array.
    MassErase = 0x41,
    /// Erase a sector and reprogram its first word in one command.
    SectorModify = 0x60,
}

const LAYOUT: NvmLayout = NvmLayout {
    stat: ESTAT,
    cmd: ECMD,
    name: "eeprom",
};

/// Mass-erase sentinel data.
const ERASE_SENTINEL: u16 = 0xAFFE;
/// In-array sentinel address for the unsecure mass erase.
const UNSECURE_SENTINEL_ADDR: u16 = 0x0F80;

register_module! {
    /// EEPROM controller register block.
    pub struct Eeprom, "eeprom", [
        byte eclkdiv @ ECLKDIV,
        byte ecnfg @ ECNFG,
        byte eprot @ EPROT,
        byte estat @ ESTAT,
        byte ecmd @ ECMD,
        word eaddr @ EADDR,
        word edata @ EDATA,
    ]
}

impl Eeprom<'_> {
    /// Set the EEPROM clock divider for the given oscillator frequency. Must
    /// run once before any program/erase command.
    pub fn set_clock_divider(&mut self, osc_hz: u32) -> Result<()> {
        self.set_reg("eclkdiv", u16::from(nvm::clock_divider(osc_hz)))
    }

    /// Clear latched PVIOL/ACCERR flags.
    pub fn clear_errors(&mut self) -> Result<()> {
        self.set_reg(
            "estat",
            u16::from((NvmStatus::PVIOL | NvmStatus::ACCERR).bits()),
        )
    }

    /// Currently latched error bits.
    pub fn errors(&mut self) -> Result<NvmStatus> {
        let stat = NvmStatus::from_bits_truncate(self.reg("estat")? as u8);
        Ok(stat & (NvmStatus::PVIOL | NvmStatus::ACCERR))
    }

    fn command(&mut self, command: EepromCommand, addr: u16, data: u16) -> Result<()> {
        nvm::run_command(self.target(), &LAYOUT, command as u8, addr, data)
    }

    /// Program one aligned word.
    pub fn program(&mut self, addr: u16, data: u16) -> Result<()> {
        self.command(EepromCommand::Program, addr, data)
    }

    /// Erase the sector containing `addr`.
    pub fn sector_erase(&mut self, addr: u16) -> Result<()> {
        self.command(EepromCommand::SectorErase, addr, 0xFFFF)
    }

    /// Erase the sector containing `addr` and program `data` into its first
    /// word, as one command.
    pub fn sector_modify(&mut self, addr: u16, data: u16) -> Result<()> {
        self.command(EepromCommand::SectorModify, addr, data)
    }

    /// Run erase-verify; true when the array is blank.
    pub fn erase_verify(&mut self) -> Result<bool> {
        self.command(EepromCommand::EraseVerify, UNSECURE_SENTINEL_ADDR, 0xFFFF)?;
        Ok(self.reg("estat")? as u8 & NvmStatus::BLANK.bits() != 0)
    }

    /// Mass-erase the array.
    pub fn mass_erase(&mut self) -> Result<()> {
        self.command(EepromCommand::MassErase, UNSECURE_SENTINEL_ADDR, ERASE_SENTINEL)
    }

    /// Mass-erase the array with protection disabled first; the order is
    /// fixed, reordering trips a protection violation on real hardware.
    pub fn unsecure(&mut self) -> Result<()> {
        log::info!("unsecuring eeprom (mass erase)");
        self.set_reg("ecnfg", 0x00)?;
        self.set_reg("eprot", u16::from(EPOPEN | EPDIS))?;
        self.command(
            EepromCommand::MassErase,
            UNSECURE_SENTINEL_ADDR,
            ERASE_SENTINEL,
        )
    }
}
