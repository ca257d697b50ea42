//! Write command implementation

use indicatif::{ProgressBar, ProgressStyle};
use rbdm_core::target::Target;
use std::path::Path;

use super::CmdResult;

/// Transfer block between progress bar updates.
const WRITE_CHUNK_SIZE: usize = 256;

/// Write a binary file into target memory, optionally verifying by
/// reading the area back.
///
/// This writes through plain BDM bus accesses; it is meant for RAM and
/// registers. Flash and EEPROM arrays ignore bus writes and need the NVM
/// command sequences instead.
pub fn run(target: &mut Target, addr: u16, input: &Path, verify: bool) -> CmdResult {
    let data = std::fs::read(input)?;
    super::check_range(addr, data.len())?;
    target.halt()?;

    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut offset = 0usize;
    while offset < data.len() {
        let chunk = std::cmp::min(WRITE_CHUNK_SIZE, data.len() - offset);
        target.write_area(addr.wrapping_add(offset as u16), &data[offset..offset + chunk])?;
        offset += chunk;
        pb.set_position(offset as u64);
    }
    pb.finish_and_clear();
    println!("Wrote {} bytes to 0x{:04X}", data.len(), addr);

    if verify {
        let readback = target.read_area(addr, data.len())?;
        if let Some(i) = (0..data.len()).find(|&i| readback[i] != data[i]) {
            return Err(format!(
                "verify failed at 0x{:04X}: wrote 0x{:02X}, read 0x{:02X}",
                addr.wrapping_add(i as u16),
                data[i],
                readback[i]
            )
            .into());
        }
        println!("Verified {} bytes", data.len());
    }

    Ok(())
}
