//! S12 flash controller (FTS)
//!
//! Program and erase operations go through the shared NVM command sequencer;
//! this module adds the flash-specific register map, bank selection, the
//! security queries and the fixed unsecure recipes.

use crate::error::Result;
use crate::module::{register_module, Module};
use crate::s12::nvm::{self, NvmLayout, NvmStatus};
use crate::target::Target;

/// Flash clock divider register.
pub const FCLKDIV: u16 = 0x0100;
/// Flash security register.
pub const FSEC: u16 = 0x0101;
/// Flash test mode register.
pub const FTSTMOD: u16 = 0x0102;
/// Flash configuration register.
pub const FCNFG: u16 = 0x0103;
/// Flash protection register.
pub const FPROT: u16 = 0x0104;
/// Flash status register.
pub const FSTAT: u16 = 0x0105;
/// Flash command register.
pub const FCMD: u16 = 0x0106;
/// Flash address register.
pub const FADDR: u16 = 0x0108;
/// Flash data register.
pub const FDATA: u16 = 0x011A;

/// FTSTMOD: write-all-banks.
pub const WRALL: u8 = 0x10;

/// FCNFG: command buffer empty interrupt enable.
pub const CBEIE: u8 = 0x80;
/// FCNFG: command complete interrupt enable.
pub const CCIE: u8 = 0x40;
/// FCNFG: security key writing enable.
pub const KEYACC: u8 = 0x20;
/// FCNFG: bank select field.
pub const BKSEL: u8 = 0x03;

/// FPROT: protection function open.
pub const FPOPEN: u8 = 0x80;
/// FPROT: higher protected range disabled.
pub const FPHDIS: u8 = 0x20;
/// FPROT: lower protected range disabled.
pub const FPLDIS: u8 = 0x04;

/// Flash controller commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FlashCommand {
    /// Verify the whole array reads erased; sets BLANK on success.
    EraseVerify = 0x05,
    /// Program one aligned word.
    Program = 0x20,
    /// Erase the sector containing the given address.
    SectorErase = 0x40,
    /// Erase the whole array.
    MassErase = 0x41,
}

const LAYOUT: NvmLayout = NvmLayout {
    stat: FSTAT,
    cmd: FCMD,
    name: "flash",
};

/// Mass-erase sentinel data; the address selects the bank.
const ERASE_SENTINEL: u16 = 0xAFFE;
/// Security byte location in block 0.
const SECURITY_WORD_ADDR: u16 = 0xFF0E;

register_module! {
    /// Flash controller register block.
    pub struct Flash, "flash", [
        byte fclkdiv @ FCLKDIV,
        byte fsec @ FSEC,
        byte ftstmod @ FTSTMOD,
        byte fcnfg @ FCNFG,
        byte fprot @ FPROT,
        byte fstat @ FSTAT,
        byte fcmd @ FCMD,
        word faddr @ FADDR,
        word fdata @ FDATA,
    ]
}

impl Flash<'_> {
    /// Set the flash clock divider for the given oscillator frequency. Must
    /// run once before any program/erase command.
    pub fn set_clock_divider(&mut self, osc_hz: u32) -> Result<()> {
        self.set_reg("fclkdiv", u16::from(nvm::clock_divider(osc_hz)))
    }

    /// Select a flash bank, preserving the interrupt-enable and key-access
    /// bits of the configuration register.
    pub fn select_bank(&mut self, bank: u8) -> Result<()> {
        let kept = self.reg("fcnfg")? as u8 & (CBEIE | CCIE | KEYACC);
        self.set_reg("fcnfg", u16::from(kept | (bank & BKSEL)))
    }

    /// Clear latched PVIOL/ACCERR flags, optionally on a specific bank.
    pub fn clear_errors(&mut self, bank: Option<u8>) -> Result<()> {
        if let Some(bank) = bank {
            self.select_bank(bank)?;
        }
        self.set_reg(
            "fstat",
            u16::from((NvmStatus::PVIOL | NvmStatus::ACCERR).bits()),
        )
    }

    /// Currently latched error bits.
    pub fn errors(&mut self) -> Result<NvmStatus> {
        let stat = NvmStatus::from_bits_truncate(self.reg("fstat")? as u8);
        Ok(stat & (NvmStatus::PVIOL | NvmStatus::ACCERR))
    }

    /// True when the device is secured (FSEC SEC bits != unsecured pattern).
    pub fn secured(&mut self) -> Result<bool> {
        Ok(self.reg("fsec")? as u8 & 0x03 != 0x02)
    }

    /// True when backdoor key access is enabled.
    pub fn key_access(&mut self) -> Result<bool> {
        Ok(self.reg("fsec")? as u8 & 0xC0 == 0x80)
    }

    /// Make subsequent array writes hit all banks simultaneously.
    pub fn write_all(&mut self) -> Result<()> {
        self.set_reg("ftstmod", u16::from(WRALL))
    }

    fn command(&mut self, command: FlashCommand, addr: u16, data: u16) -> Result<()> {
        nvm::run_command(self.target(), &LAYOUT, command as u8, addr, data)
    }

    /// Program one aligned word.
    pub fn program(&mut self, addr: u16, data: u16) -> Result<()> {
        self.command(FlashCommand::Program, addr, data)
    }

    /// Erase the sector containing `addr`.
    pub fn sector_erase(&mut self, addr: u16) -> Result<()> {
        self.command(FlashCommand::SectorErase, addr, 0xFFFF)
    }

    /// Run erase-verify on the selected bank; true when the array is blank.
    pub fn erase_verify(&mut self) -> Result<bool> {
        self.command(FlashCommand::EraseVerify, 0x8000, 0xFFFF)?;
        Ok(self.reg("fstat")? as u8 & NvmStatus::BLANK.bits() != 0)
    }

    /// Mass-erase the selected bank.
    pub fn mass_erase(&mut self) -> Result<()> {
        self.command(FlashCommand::MassErase, 0x8000, ERASE_SENTINEL)
    }

    /// Mass-erase every bank at once. Disables protection first; the order
    /// is fixed, reordering trips a protection violation on real hardware.
    pub fn erase_all(&mut self) -> Result<()> {
        self.write_all()?;
        self.set_reg("fcnfg", 0x00)?;
        self.set_reg("fprot", u16::from(FPOPEN | FPHDIS | FPLDIS))?;
        self.command(FlashCommand::MassErase, 0xC000, ERASE_SENTINEL)
    }

    /// Unsecure the device by mass-erasing all flash banks. Leaves the
    /// security byte in its erased (unsecured) state until the next
    /// programming of the security word.
    pub fn unsecure(&mut self) -> Result<()> {
        log::info!("unsecuring flash (mass erase, all banks)");
        self.erase_all()
    }

    /// Program the security word back to the unsecured pattern so the part
    /// stays unsecured after reset.
    pub fn lock_unsecure(&mut self) -> Result<()> {
        self.set_reg("fcnfg", 0x00)?;
        self.set_reg("fprot", u16::from(FPOPEN | FPHDIS | FPLDIS))?;
        self.command(FlashCommand::Program, SECURITY_WORD_ADDR, 0xFFFE)
    }
}
