//! CPU register dump command implementation

use rbdm_core::pod::CpuRegister;
use rbdm_core::target::Target;

use super::CmdResult;

/// Dump all CPU registers, including both views of the CCR.
pub fn run(target: &mut Target) -> CmdResult {
    target.halt()?;

    for reg in CpuRegister::ALL {
        let value = target.read_cpu_register(reg)?;
        println!("{:<3} = 0x{:04X}", reg.name(), value);
    }

    let ccr = target.read_ccr_from_hardware()?;
    println!("CCR = 0x{:02X}   {}", ccr, decode_ccr(ccr));
    match target.last_written_ccr() {
        Some(shadow) => println!("      (last written: 0x{:02X})", shadow),
        None => println!("      (not written this session)"),
    }

    Ok(())
}

/// Render the CCR flag bits as `SXHINZVC`, uppercase when set.
fn decode_ccr(ccr: u8) -> String {
    "SXHINZVC"
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if ccr & (0x80 >> i) != 0 {
                c
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ccr_flags_render_by_bit() {
        assert_eq!(decode_ccr(0x00), "sxhinzvc");
        assert_eq!(decode_ccr(0xFF), "SXHINZVC");
        // S, X and I set: the reset value.
        assert_eq!(decode_ccr(0xD0), "SXhInzvc");
    }
}
