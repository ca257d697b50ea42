//! Interrupt vector table command implementation

use rbdm_core::target::{Target, Vector};

use super::CmdResult;

/// Print the interrupt vector table.
pub fn run(target: &mut Target) -> CmdResult {
    target.halt()?;
    for vector in Vector::ALL {
        let handler = target.vector(vector)?;
        println!(
            "{:<5} @ 0x{:04X} -> 0x{:04X}",
            vector.name(),
            vector.address(),
            handler
        );
    }
    Ok(())
}
