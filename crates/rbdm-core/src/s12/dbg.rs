//! Debug module (DBG) register block
//!
//! Superset of the breakpoint unit on newer derivatives: the same comparator
//! registers double as trace-buffer trigger comparators when DBG mode is
//! enabled.

use crate::error::Result;
use crate::module::{register_module, Module};

/// Debug control register 1.
pub const DBGC1: u16 = 0x0020;
/// Debug status and control register.
pub const DBGSC: u16 = 0x0021;
/// Trace buffer register (word).
pub const DBGTB: u16 = 0x0022;
/// Debug count register.
pub const DBGCNT: u16 = 0x0024;
/// Comparator C expansion address register.
pub const DBGCCX: u16 = 0x0025;
/// Comparator C address register (word).
pub const DBGCC: u16 = 0x0026;
/// Debug control register 2 (aliases BKPCT0).
pub const DBGC2: u16 = 0x0028;
/// Debug control register 3 (aliases BKPCT1).
pub const DBGC3: u16 = 0x0029;

/// DBGC1: debug module enable.
pub const DBGEN: u8 = 0x80;
/// DBGC1: arm the trigger state machine.
pub const ARM: u8 = 0x40;
/// DBGC1: break on trigger.
pub const DBGBRK: u8 = 0x08;
/// DBGC2: legacy breakpoint mode enable.
pub const BKABEN: u8 = 0x80;
/// DBGCNT: trace buffer full.
pub const TBF: u8 = 0x80;

/// Trace buffer capture modes (DBGC1 CAPMOD field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CaptureMode {
    /// Change-of-flow capture.
    Normal = 0x00,
    /// Loop1: like normal, suppressing duplicate COF entries.
    Loop1 = 0x01,
    /// Detail: capture every bus cycle.
    Detail = 0x02,
    /// Profile: capture program counter samples.
    Profile = 0x03,
}

register_module! {
    /// Debug module register block.
    pub struct Dbg, "dbg", [
        byte dbgc1 @ DBGC1,
        byte dbgsc @ DBGSC,
        byte dbgcnt @ DBGCNT,
        byte dbgccx @ DBGCCX,
        byte dbgc2 @ DBGC2,
        byte dbgc3 @ DBGC3,
        word dbgtb @ DBGTB,
        word dbgcc @ DBGCC,
    ]
}

impl Dbg<'_> {
    /// Run the comparators as a legacy breakpoint unit.
    pub fn enable_bkp_mode(&mut self) -> Result<()> {
        self.set_bits(DBGC2, BKABEN)
    }

    /// Enable the trace-buffer debug mode (mutually exclusive with the
    /// legacy breakpoint mode).
    pub fn enable_dbg_mode(&mut self) -> Result<()> {
        self.clear_bits(DBGC2, BKABEN)?;
        self.set_bits(DBGC1, DBGEN)
    }

    /// Arm the trigger state machine.
    pub fn arm(&mut self) -> Result<()> {
        self.set_bits(DBGC1, ARM)
    }

    /// Disarm the trigger state machine.
    pub fn disarm(&mut self) -> Result<()> {
        self.clear_bits(DBGC1, ARM)
    }

    /// Break into background mode when the trigger fires.
    pub fn break_on_trigger(&mut self) -> Result<()> {
        self.set_bits(DBGC1, DBGBRK)
    }

    /// Select the trace buffer capture mode.
    pub fn set_capture_mode(&mut self, mode: CaptureMode) -> Result<()> {
        self.clear_bits(DBGC1, CaptureMode::Profile as u8)?;
        self.set_bits(DBGC1, mode as u8)
    }

    /// True once the trace buffer has wrapped.
    pub fn trace_buffer_full(&mut self) -> Result<bool> {
        self.bits_set(DBGCNT, TBF)
    }

    /// Pop one word from the trace buffer.
    pub fn read_trace_word(&mut self) -> Result<u16> {
        self.reg("dbgtb")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s12::testutil::{sim_target, Access};

    #[test]
    fn dbg_mode_clears_the_legacy_enable_first() {
        let (mut t, sim) = sim_target(&[]);
        sim.borrow_mut().regs.insert(DBGC2, BKABEN | 0x01);
        Dbg::new(&mut t).enable_dbg_mode().unwrap();
        let log = sim.borrow().log.clone();
        assert!(log.contains(&Access::WriteByte(DBGC2, 0x01)));
        assert!(log.contains(&Access::WriteByte(DBGC1, DBGEN)));
    }

    #[test]
    fn capture_mode_replaces_the_field() {
        let (mut t, sim) = sim_target(&[]);
        sim.borrow_mut().regs.insert(DBGC1, DBGEN | 0x01);
        Dbg::new(&mut t).set_capture_mode(CaptureMode::Detail).unwrap();
        assert_eq!(sim.borrow().regs[&DBGC1], DBGEN | 0x02);
    }
}
