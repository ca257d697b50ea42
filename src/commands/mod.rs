//! CLI command implementations
//!
//! Every command works on an open [`rbdm_core::target::Target`], whatever
//! pod it sits behind. Commands that touch memory or registers halt the
//! target into active background mode first.

pub mod dump;
pub mod fill;
pub mod nvm;
pub mod probe;
pub mod regs;
pub mod run;
pub mod vectors;
pub mod write;

/// Result alias for command entry points.
pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Check that `addr + length` stays inside the 64 KiB map.
pub fn check_range(addr: u16, length: usize) -> CmdResult {
    let end = addr as usize + length;
    if end > 0x1_0000 {
        return Err(format!(
            "area 0x{:04X}+0x{:X} runs past the end of the 64 KiB address space",
            addr, length
        )
        .into());
    }
    Ok(())
}
