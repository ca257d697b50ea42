//! Fill command implementation

use rbdm_core::target::Target;

use super::CmdResult;

/// Fill a memory area with one byte value.
pub fn run(target: &mut Target, addr: u16, length: usize, value: u8) -> CmdResult {
    super::check_range(addr, length)?;
    target.halt()?;
    target.fill_area(addr, value, length)?;
    println!(
        "Filled 0x{:04X}..0x{:04X} with 0x{:02X}",
        addr,
        addr as usize + length,
        value
    );
    Ok(())
}
