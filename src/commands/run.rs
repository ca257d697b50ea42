//! Run control command implementations

use rbdm_core::target::Target;

use super::CmdResult;

/// Resume the user program.
pub fn go(target: &mut Target) -> CmdResult {
    target.go()?;
    println!("Target running");
    Ok(())
}

/// Halt the user program into active background mode.
pub fn halt(target: &mut Target) -> CmdResult {
    target.halt()?;
    let pc = target.read_pc()?;
    println!("Target halted, PC = 0x{:04X}", pc);
    Ok(())
}

/// Single-step `count` user instructions, printing the PC after each.
pub fn trace(target: &mut Target, count: u32) -> CmdResult {
    for _ in 0..count {
        target.trace()?;
        let pc = target.read_pc()?;
        println!("PC = 0x{:04X}", pc);
    }
    Ok(())
}

/// Reset the target. It comes out of reset running user code.
pub fn reset(target: &mut Target) -> CmdResult {
    target.reset()?;
    println!("Target reset");
    Ok(())
}
