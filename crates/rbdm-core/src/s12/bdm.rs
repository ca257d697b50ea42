//! On-chip BDM controller register block
//!
//! These registers live in the BDM-local map at 0xFF00 and are only
//! reachable with in-map accesses.

use bitflags::bitflags;

use crate::error::Result;
use crate::module::{register_module, Module};

/// BDM instruction register.
pub const BDMIST: u16 = 0xFF00;
/// BDM status register.
pub const BDMSTS: u16 = 0xFF01;
/// BDM shift register (high byte).
pub const BDMSHTH: u16 = 0xFF02;
/// BDM address register (high byte).
pub const BDMADDH: u16 = 0xFF04;
/// CCR holding register.
pub const BDMCCR: u16 = 0xFF06;
/// Internal register position register.
pub const BDMINR: u16 = 0xFF07;

bitflags! {
    /// BDMSTS bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BdmSts: u8 {
        /// BDM firmware commands enabled.
        const ENBDM = 0x80;
        /// BDM active (target halted in background mode).
        const BDMACT = 0x40;
        /// Tagging enabled.
        const ENTAG = 0x20;
        /// Shifter data valid.
        const SDV = 0x10;
        /// Trace1 in progress.
        const TRACE = 0x08;
        /// BDM clock switched to alternate source.
        const CLKSW = 0x04;
        /// Device unsecured via backdoor key.
        const UNSEC = 0x02;
    }
}

register_module! {
    /// BDM controller register block.
    pub struct Bdm, "bdm", [
        byte bdmist @ BDMIST,
        byte bdmsts @ BDMSTS,
        byte bdmccr @ BDMCCR,
        byte bdminr @ BDMINR,
        word shifter @ BDMSHTH,
        word address @ BDMADDH,
    ]
}

impl Bdm<'_> {
    /// Current status register contents.
    pub fn status(&mut self) -> Result<BdmSts> {
        Ok(BdmSts::from_bits_truncate(self.reg("bdmsts")? as u8))
    }

    /// Enable the BDM firmware command set (required before GO/TRACE1 and
    /// the CPU register commands work).
    pub fn enable_firmware(&mut self) -> Result<()> {
        self.set_bits(BDMSTS, BdmSts::ENBDM.bits())
    }

    /// Disable the BDM firmware command set.
    pub fn disable_firmware(&mut self) -> Result<()> {
        self.clear_bits(BDMSTS, BdmSts::ENBDM.bits())
    }

    /// True while the target sits halted in background mode.
    pub fn active(&mut self) -> Result<bool> {
        Ok(self.status()?.contains(BdmSts::BDMACT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s12::testutil::{sim_target, Access};

    #[test]
    fn enable_firmware_is_a_read_modify_write() {
        let (mut t, sim) = sim_target(&[]);
        sim.borrow_mut().regs.insert(BDMSTS, 0x44);
        Bdm::new(&mut t).enable_firmware().unwrap();
        assert!(sim.borrow().log.contains(&Access::WriteByte(BDMSTS, 0xC4)));
    }

    #[test]
    fn status_decodes_known_bits() {
        let (mut t, sim) = sim_target(&[]);
        sim.borrow_mut().regs.insert(BDMSTS, 0xC0);
        let sts = Bdm::new(&mut t).status().unwrap();
        assert!(sts.contains(BdmSts::ENBDM | BdmSts::BDMACT));
        assert!(!sts.contains(BdmSts::UNSEC));
    }
}
