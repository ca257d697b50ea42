//! Breakpoint unit (BKP) register block
//!
//! Two comparators, each with an optional expansion-page match. The unit can
//! either pair both comparators into one full address+data breakpoint or run
//! them as two independent address breakpoints.

use crate::error::Result;
use crate::module::{register_module, Module};

/// Breakpoint control register 0.
pub const BKPCT0: u16 = 0x0028;
/// Breakpoint control register 1.
pub const BKPCT1: u16 = 0x0029;
/// Comparator 0 expansion address register.
pub const BKP0X: u16 = 0x002A;
/// Comparator 0 address high register.
pub const BKP0H: u16 = 0x002B;
/// Comparator 0 address low register.
pub const BKP0L: u16 = 0x002C;
/// Comparator 1 expansion address register.
pub const BKP1X: u16 = 0x002D;
/// Comparator 1 address high register.
pub const BKP1H: u16 = 0x002E;
/// Comparator 1 address low register.
pub const BKP1L: u16 = 0x002F;

/// BKPCT0: breakpoint unit enable.
pub const BKEN: u8 = 0x80;
/// BKPCT0: full breakpoint mode (both comparators paired).
pub const BKFULL: u8 = 0x40;
/// BKPCT0: break into BDM instead of SWI.
pub const BKBDM: u8 = 0x20;
/// BKPCT0: tagged (opcode-fetch) matching instead of forced.
pub const BKTAG: u8 = 0x10;

/// The two address comparators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// Comparator 0.
    Zero,
    /// Comparator 1.
    One,
}

register_module! {
    /// Breakpoint unit register block.
    pub struct Bkp, "bkp", [
        byte bkpct0 @ BKPCT0,
        byte bkpct1 @ BKPCT1,
        byte bkp0x @ BKP0X,
        byte bkp0h @ BKP0H,
        byte bkp0l @ BKP0L,
        byte bkp1x @ BKP1X,
        byte bkp1h @ BKP1H,
        byte bkp1l @ BKP1L,
    ]
}

impl Bkp<'_> {
    /// True when the unit is enabled.
    pub fn enabled(&mut self) -> Result<bool> {
        self.bits_set(BKPCT0, BKEN)
    }

    /// Enable the breakpoint unit.
    pub fn enable(&mut self) -> Result<()> {
        self.set_bits(BKPCT0, BKEN)
    }

    /// Disable the breakpoint unit.
    pub fn disable(&mut self) -> Result<()> {
        self.clear_bits(BKPCT0, BKEN)
    }

    /// Pair both comparators into one full address+data breakpoint.
    pub fn full_mode(&mut self) -> Result<()> {
        self.set_bits(BKPCT0, BKFULL)
    }

    /// Run the comparators as two independent address breakpoints.
    pub fn dual_mode(&mut self) -> Result<()> {
        self.clear_bits(BKPCT0, BKFULL)
    }

    /// Break into background mode on match.
    pub fn break_to_bdm(&mut self) -> Result<()> {
        self.set_bits(BKPCT0, BKBDM)
    }

    /// Raise SWI on match instead of entering background mode.
    pub fn break_to_swi(&mut self) -> Result<()> {
        self.clear_bits(BKPCT0, BKBDM)
    }

    /// Match on opcode fetch (tagged) rather than on any access.
    pub fn tagged(&mut self) -> Result<()> {
        self.set_bits(BKPCT0, BKTAG)
    }

    /// Match on any access to the address (forced).
    pub fn forced(&mut self) -> Result<()> {
        self.clear_bits(BKPCT0, BKTAG)
    }

    /// Program one comparator's match address, with an optional expansion
    /// page for banked targets.
    pub fn set_address(&mut self, comparator: Comparator, addr: u16, page: Option<u8>) -> Result<()> {
        let (xreg, hreg, lreg) = match comparator {
            Comparator::Zero => ("bkp0x", "bkp0h", "bkp0l"),
            Comparator::One => ("bkp1x", "bkp1h", "bkp1l"),
        };
        if let Some(page) = page {
            self.set_reg(xreg, u16::from(page))?;
        }
        self.set_reg(hreg, addr >> 8)?;
        self.set_reg(lreg, addr & 0x00FF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s12::testutil::{sim_target, Access};

    #[test]
    fn set_address_splits_high_and_low_bytes() {
        let (mut t, sim) = sim_target(&[]);
        Bkp::new(&mut t)
            .set_address(Comparator::Zero, 0xC0FE, Some(0x3E))
            .unwrap();
        let log = sim.borrow().log.clone();
        assert_eq!(
            log,
            vec![
                Access::WriteByte(BKP0X, 0x3E),
                Access::WriteByte(BKP0H, 0xC0),
                Access::WriteByte(BKP0L, 0xFE),
            ]
        );
    }

    #[test]
    fn control_bits_are_read_modify_write() {
        let (mut t, sim) = sim_target(&[]);
        sim.borrow_mut().regs.insert(BKPCT0, BKFULL);
        let mut bkp = Bkp::new(&mut t);
        bkp.enable().unwrap();
        assert!(sim
            .borrow()
            .log
            .contains(&Access::WriteByte(BKPCT0, BKEN | BKFULL)));

        let mut bkp = Bkp::new(&mut t);
        bkp.dual_mode().unwrap();
        assert_eq!(sim.borrow().regs[&BKPCT0], BKEN);
    }
}
