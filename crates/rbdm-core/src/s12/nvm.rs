//! Shared NVM command sequencer
//!
//! The S12 flash and EEPROM controllers use the same command protocol: wait
//! for the command buffer, latch an address/data pair by writing the array,
//! write the command register, trigger via the status register's CBEIF bit
//! and check the error bits before waiting for completion. Only the register
//! addresses and the sentinel locations differ, so the state machine lives
//! here and both controllers drive it with their own layout.

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::target::Target;

bitflags! {
    /// FSTAT/ESTAT status bits (same layout on both controllers).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NvmStatus: u8 {
        /// Command buffer empty; a new command may be loaded.
        const CBEIF = 0x80;
        /// Command complete.
        const CCIF = 0x40;
        /// Protection violation.
        const PVIOL = 0x20;
        /// Access error (illegal command sequence).
        const ACCERR = 0x10;
        /// Erase-verify result: array is blank.
        const BLANK = 0x04;
    }
}

/// Register addresses one controller exposes to the sequencer.
#[derive(Debug, Clone, Copy)]
pub struct NvmLayout {
    /// Status register (FSTAT/ESTAT).
    pub stat: u16,
    /// Command register (FCMD/ECMD).
    pub cmd: u16,
    /// Controller name for logs and timeout errors.
    pub name: &'static str,
}

/// States of one program/erase job. A job is created per operation, driven
/// to `Idle` or a terminal error, then discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    WaitBufferEmpty,
    LoadAddressData,
    IssueCommand,
    StartAndCheck,
    WaitCompletion,
    Idle,
}

/// Status polls allowed before a wait is declared hung. One poll is a full
/// BDM round-trip, so the budget is generous compared to real command
/// completion times (a word program takes tens of microseconds).
const POLL_BUDGET: u32 = 10_000;

fn status(target: &mut Target, layout: &NvmLayout) -> Result<NvmStatus> {
    Ok(NvmStatus::from_bits_truncate(
        target.read_bd_byte(layout.stat)?,
    ))
}

fn wait_status_bit(target: &mut Target, layout: &NvmLayout, bit: NvmStatus) -> Result<()> {
    let cancel = target.cancel_token();
    for _ in 0..POLL_BUDGET {
        cancel.check()?;
        if status(target, layout)?.contains(bit) {
            return Ok(());
        }
    }
    Err(Error::Timeout(layout.name))
}

/// Decode the error bits into the matching terminal error, if any.
fn check_errors(status: NvmStatus, addr: u16) -> Result<()> {
    if status.contains(NvmStatus::PVIOL) {
        Err(Error::FlashProtectionViolation { addr })
    } else if status.contains(NvmStatus::ACCERR) {
        Err(Error::FlashAccessError { addr })
    } else {
        Ok(())
    }
}

/// Drive one command through the controller state machine.
///
/// `addr`/`data` are latched by a word write to the array itself (for mass
/// erase this is the bank-specific sentinel pair). If the controller flags
/// PVIOL or ACCERR right after the start trigger the job is terminal; the
/// hardware will not complete an errored command, so completion is not
/// polled.
pub fn run_command(
    target: &mut Target,
    layout: &NvmLayout,
    command: u8,
    addr: u16,
    data: u16,
) -> Result<()> {
    log::debug!(
        "{}: command 0x{:02X} @ 0x{:04X} = 0x{:04X}",
        layout.name,
        command,
        addr,
        data
    );

    let mut state = JobState::WaitBufferEmpty;
    loop {
        state = match state {
            JobState::WaitBufferEmpty => {
                wait_status_bit(target, layout, NvmStatus::CBEIF)?;
                JobState::LoadAddressData
            }
            JobState::LoadAddressData => {
                target.write_word(addr, data)?;
                JobState::IssueCommand
            }
            JobState::IssueCommand => {
                target.write_bd_byte(layout.cmd, command)?;
                JobState::StartAndCheck
            }
            JobState::StartAndCheck => {
                // Writing CBEIF back launches the command.
                target.write_bd_byte(layout.stat, NvmStatus::CBEIF.bits())?;
                let st = status(target, layout)?;
                check_errors(st, addr)?;
                JobState::WaitCompletion
            }
            JobState::WaitCompletion => {
                wait_status_bit(target, layout, NvmStatus::CCIF)?;
                JobState::Idle
            }
            JobState::Idle => return Ok(()),
        };
    }
}

/// Compute a clock divider register value putting the NVM clock into its
/// 150-200 kHz programming window.
///
/// Returns the PRDIV8 bit (0x40) ored with the FDIV field. Oscillators above
/// 12.8 MHz need the extra divide-by-8 prescaler to keep FDIV in range.
pub fn clock_divider(osc_hz: u32) -> u8 {
    const PRDIV8: u8 = 0x40;
    const FCLK_MAX: u32 = 200_000;

    let (prdiv8, base) = if osc_hz > 12_800_000 {
        (PRDIV8, osc_hz / 8)
    } else {
        (0, osc_hz)
    };
    // fclk = base / (FDIV + 1), rounded so fclk never exceeds 200 kHz.
    let divider = base.div_ceil(FCLK_MAX).max(1);
    prdiv8 | ((divider - 1).min(0x3F) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_divider_uses_prescaler_above_12_8_mhz() {
        // 16 MHz: /8 -> 2 MHz, FDIV 9 -> 200 kHz.
        assert_eq!(clock_divider(16_000_000), 0x40 | 9);
        // 8 MHz: FDIV 39 -> 200 kHz.
        assert_eq!(clock_divider(8_000_000), 39);
        // 4 MHz: FDIV 19.
        assert_eq!(clock_divider(4_000_000), 19);
    }

    #[test]
    fn clock_divider_stays_within_window() {
        for osc in [2_000_000u32, 4_000_000, 8_000_000, 16_000_000, 25_000_000] {
            let value = clock_divider(osc);
            let base = if value & 0x40 != 0 { osc / 8 } else { osc };
            let fclk = base / (u32::from(value & 0x3F) + 1);
            assert!(fclk <= 200_000, "osc {} -> fclk {}", osc, fclk);
            assert!(fclk >= 150_000, "osc {} -> fclk {}", osc, fclk);
        }
    }

    #[test]
    fn error_bits_map_to_terminal_errors() {
        assert!(matches!(
            check_errors(NvmStatus::PVIOL | NvmStatus::CBEIF, 0x8000),
            Err(Error::FlashProtectionViolation { addr: 0x8000 })
        ));
        assert!(matches!(
            check_errors(NvmStatus::ACCERR, 0xC000),
            Err(Error::FlashAccessError { addr: 0xC000 })
        ));
        assert!(check_errors(NvmStatus::CBEIF | NvmStatus::CCIF, 0).is_ok());
    }
}
