//! Dump command implementation

use indicatif::{ProgressBar, ProgressStyle};
use rbdm_core::target::Target;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::CmdResult;

/// Transfer block between progress bar updates.
const DUMP_CHUNK_SIZE: usize = 256;

/// Read a memory area to a binary file, or hexdump it to stdout.
pub fn run(target: &mut Target, addr: u16, length: usize, output: Option<&Path>) -> CmdResult {
    super::check_range(addr, length)?;
    target.halt()?;

    let data = read_with_progress(target, addr, length)?;

    match output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(&data)?;
            println!("Wrote {} bytes to {:?}", data.len(), path);
        }
        None => print!("{}", hexdump(addr, &data)),
    }

    Ok(())
}

fn read_with_progress(target: &mut Target, addr: u16, length: usize) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(length as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut data = Vec::with_capacity(length);
    let mut offset = 0usize;
    while offset < length {
        let chunk = std::cmp::min(DUMP_CHUNK_SIZE, length - offset);
        data.extend_from_slice(&target.read_area(addr.wrapping_add(offset as u16), chunk)?);
        offset += chunk;
        pb.set_position(offset as u64);
    }
    pb.finish_and_clear();
    Ok(data)
}

/// Render `data` as a canonical 16-bytes-per-line hexdump.
pub fn hexdump(base: u16, data: &[u8]) -> String {
    let mut out = String::new();
    for (i, line) in data.chunks(16).enumerate() {
        let addr = base.wrapping_add((i * 16) as u16);
        out.push_str(&format!("{:04X}: ", addr));
        for j in 0..16 {
            match line.get(j) {
                Some(b) => out.push_str(&format!("{:02X} ", b)),
                None => out.push_str("   "),
            }
            if j == 7 {
                out.push(' ');
            }
        }
        out.push('|');
        for b in line {
            out.push(if b.is_ascii_graphic() || *b == b' ' {
                *b as char
            } else {
                '.'
            });
        }
        out.push_str("|\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexdump_formats_a_full_line() {
        let data: Vec<u8> = (0x41..0x51).collect();
        let dump = hexdump(0x1000, &data);
        assert_eq!(
            dump,
            "1000: 41 42 43 44 45 46 47 48  49 4A 4B 4C 4D 4E 4F 50 |ABCDEFGHIJKLMNOP|\n"
        );
    }

    #[test]
    fn hexdump_pads_a_short_tail() {
        let dump = hexdump(0xFFF0, &[0x00, 0x7F, 0x20]);
        assert!(dump.starts_with("FFF0: 00 7F 20 "));
        assert!(dump.ends_with("|.. |\n"));
        // Every line is the same width up to the ascii gutter.
        assert_eq!(dump.find('|'), Some(6 + 16 * 3 + 1));
    }

    #[test]
    fn hexdump_advances_the_address_column() {
        let dump = hexdump(0x0000, &[0u8; 33]);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("0000: "));
        assert!(lines[1].starts_with("0010: "));
        assert!(lines[2].starts_with("0020: "));
    }
}
