//! Device identification
//!
//! S12 derivatives carry a part-ID register; older HC12 parts do not and
//! have to be identified by sniffing characteristic register signatures
//! (mapping registers, flash test register, BDLC and CAN blocks).

use crate::partids;
use crate::target::{MemorySizes, Target};
use crate::Result;

// HC12 identification addresses.
const INITRM: u16 = 0x0010;
const INITEE: u16 = 0x0012;
const MISC: u16 = 0x0013;
const PPAGE_HC12: u16 = 0x00FF;
const FEETEST: u16 = 0x00F6;
const BCR1: u16 = 0x00F8;
const BCR2: u16 = 0x00FA;
const BARD: u16 = 0x00FC;
const C0MCR0: u16 = 0x0100;
const C0TFLG: u16 = 0x0106;
const C2MCR0: u16 = 0x0200;
const C2TFLG: u16 = 0x0206;

/// What the probe learned about the connected device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Raw part-ID register value; 0 on legacy HC12 parts.
    pub part_id: u16,
    /// Identified device name(s), slash-separated when one die serves
    /// several marketing names.
    pub derivative: Option<String>,
    /// Known mask set codes for this ID.
    pub masks: &'static [&'static str],
    /// Family letter decoded from the ID.
    pub family: Option<&'static str>,
    /// Flash size class in KiB decoded from the ID.
    pub flash_kib: Option<u32>,
    /// Memory sizes from the MEMSIZ register (S12 parts only).
    pub sizes: Option<MemorySizes>,
}

/// Identify the connected device.
///
/// Reads the part-ID register first; a nonzero value is an S12 derivative
/// and is matched against the identification table. Zero means a legacy
/// HC12 without the register, which falls back to signature probing.
pub fn autoprobe(target: &mut Target) -> Result<ProbeReport> {
    let part_id = target.part_id()?;
    if part_id != 0 {
        let derivative = partids::lookup(part_id).map(|e| e.devices.join("/"));
        match &derivative {
            Some(name) => log::info!("part ID 0x{:04X}: {}", part_id, name),
            None => log::warn!("part ID 0x{:04X} not in the identification table", part_id),
        }
        return Ok(ProbeReport {
            part_id,
            derivative,
            masks: partids::lookup(part_id).map_or(&[], |e| e.masks),
            family: partids::family_name(part_id),
            flash_kib: partids::flash_kib(part_id),
            sizes: Some(target.memory_sizes()?),
        });
    }

    log::info!("no part ID register, probing for a HC12 derivative");
    Ok(ProbeReport {
        part_id: 0,
        derivative: probe_hc12(target)?,
        masks: &[],
        family: None,
        flash_kib: None,
        sizes: None,
    })
}

/// Signature-probe legacy HC12 derivatives.
fn probe_hc12(target: &mut Target) -> Result<Option<String>> {
    let signature = (
        target.read_byte(INITRM)?,
        target.read_byte(INITEE)?,
        target.read_byte(MISC)?,
    );
    match signature {
        (0x20, 0x01, 0x0D) => probe_dg128(target).map(Some),
        (0x08, 0x01, 0x0F) => probe_b32(target),
        (0x00, 0x01, 0x0F) => {
            log::info!("mapping signature matches the D60 family");
            Ok(Some("MC68HC912D60".to_string()))
        }
        _ => {
            log::warn!(
                "unknown HC12 mapping signature {:02X}/{:02X}/{:02X}",
                signature.0,
                signature.1,
                signature.2
            );
            Ok(None)
        }
    }
}

/// Distinguish the DG128 from the DT128 by the second CAN block.
fn probe_dg128(target: &mut Target) -> Result<String> {
    let ppage_old = target.read_byte(PPAGE_HC12)?;
    target.write_byte(PPAGE_HC12, 0xFF)?;
    let ppage = target.read_byte(PPAGE_HC12)?;
    if ppage == 0x07 {
        target.write_byte(PPAGE_HC12, ppage_old)?;
    } else {
        log::warn!("PPAGE does not mask to 3 bits, identification is unreliable");
    }

    let has_can2 =
        (target.read_byte(C2MCR0)?, target.read_byte(C2TFLG)?) == (0x21, 0x07);
    Ok(if has_can2 {
        "MC68HC912DT128".to_string()
    } else {
        "MC68HC912DG128".to_string()
    })
}

/// Tell the A4/B32 group apart by flash, BDLC and CAN presence.
fn probe_b32(target: &mut Target) -> Result<Option<String>> {
    target.write_byte(FEETEST, 0xFF)?;
    let has_flash = target.read_byte(FEETEST)? == 0xDF;
    if has_flash {
        target.write_byte(FEETEST, 0x00)?;
    }

    let has_bdlc = (
        target.read_byte(BCR1)?,
        target.read_byte(BCR2)?,
        target.read_byte(BARD)?,
    ) == (0xE0, 0xC0, 0xC7);
    let has_can =
        (target.read_byte(C0MCR0)?, target.read_byte(C0TFLG)?) == (0x21, 0x07);

    let mut name = String::from(if has_flash { "MC68HC912" } else { "MC68HC12" });
    if has_can {
        name.push_str("BC");
    } else if has_bdlc {
        name.push_str(if has_flash { "B" } else { "BE" });
    } else {
        log::warn!("neither BDLC nor CAN found, cannot identify");
        return Ok(None);
    }
    name.push_str("32");
    Ok(Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pod::{CpuRegister, Pod};
    use crate::target::PART_ID;

    use std::collections::HashMap;

    /// Pod answering byte/word reads from a fixed map.
    struct MapPod {
        bytes: HashMap<u16, u8>,
        words: HashMap<u16, u16>,
    }

    impl MapPod {
        fn new(bytes: &[(u16, u8)], words: &[(u16, u16)]) -> Self {
            Self {
                bytes: bytes.iter().copied().collect(),
                words: words.iter().copied().collect(),
            }
        }
    }

    impl Pod for MapPod {
        fn device_name(&self) -> &'static str {
            "map pod"
        }
        fn pod_version(&mut self) -> Result<String> {
            Ok("map pod v0.0".into())
        }
        fn reset(&mut self) -> Result<()> {
            Ok(())
        }
        fn background(&mut self) -> Result<()> {
            Ok(())
        }
        fn go(&mut self) -> Result<()> {
            Ok(())
        }
        fn go_until(&mut self) -> Result<()> {
            Ok(())
        }
        fn tag_go(&mut self) -> Result<()> {
            Ok(())
        }
        fn trace1(&mut self) -> Result<()> {
            Ok(())
        }
        fn read_byte(&mut self, addr: u16) -> Result<u8> {
            Ok(self.bytes.get(&addr).copied().unwrap_or(0))
        }
        fn read_word(&mut self, addr: u16) -> Result<u16> {
            Ok(self.words.get(&addr).copied().unwrap_or(0))
        }
        fn read_bd_byte(&mut self, addr: u16) -> Result<u8> {
            self.read_byte(addr)
        }
        fn read_bd_word(&mut self, addr: u16) -> Result<u16> {
            self.read_word(addr)
        }
        fn write_byte(&mut self, addr: u16, data: u8) -> Result<()> {
            // FEETEST and the 3-bit PPAGE read back fixed values no matter
            // what is written; plain RAM-backed behavior for the rest.
            if addr != FEETEST && addr != PPAGE_HC12 {
                self.bytes.insert(addr, data);
            }
            Ok(())
        }
        fn write_word(&mut self, addr: u16, data: u16) -> Result<()> {
            self.words.insert(addr, data);
            Ok(())
        }
        fn write_bd_byte(&mut self, addr: u16, data: u8) -> Result<()> {
            self.write_byte(addr, data)
        }
        fn write_bd_word(&mut self, addr: u16, data: u16) -> Result<()> {
            self.write_word(addr, data)
        }
        fn read_next(&mut self) -> Result<u16> {
            Ok(0)
        }
        fn write_next(&mut self, _data: u16) -> Result<()> {
            Ok(())
        }
        fn read_cpu_register(&mut self, _reg: CpuRegister) -> Result<u16> {
            Ok(0)
        }
        fn write_cpu_register(&mut self, _reg: CpuRegister, _data: u16) -> Result<()> {
            Ok(())
        }
        fn max_read_payload(&self) -> usize {
            16
        }
        fn max_write_payload(&self) -> usize {
            0xFF
        }
        fn read_area_chunk(&mut self, _addr: u16, len: usize) -> Result<Vec<u8>> {
            Ok(vec![0xFF; len])
        }
        fn write_area_chunk(&mut self, _addr: u16, _data: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn s12_part_is_identified_from_the_table() {
        let pod = MapPod::new(&[], &[(PART_ID, 0x0400)]);
        let mut t = Target::new(Box::new(pod));
        let report = autoprobe(&mut t).unwrap();
        assert_eq!(report.part_id, 0x0400);
        assert_eq!(report.derivative.as_deref(), Some("MC9S12DP512"));
        assert_eq!(report.family, Some("D"));
        assert_eq!(report.flash_kib, Some(512));
        assert!(report.sizes.is_some());
    }

    #[test]
    fn unknown_s12_id_still_reports_decoded_fields() {
        let pod = MapPod::new(&[], &[(PART_ID, 0x3999)]);
        let mut t = Target::new(Box::new(pod));
        let report = autoprobe(&mut t).unwrap();
        assert_eq!(report.derivative, None);
        assert_eq!(report.family, Some("C"));
        assert!(report.masks.is_empty());
    }

    #[test]
    fn zero_part_id_falls_back_to_hc12_signatures() {
        // B32 signature with flash and BDLC, no CAN.
        let pod = MapPod::new(
            &[
                (INITRM, 0x08),
                (INITEE, 0x01),
                (MISC, 0x0F),
                (FEETEST, 0xDF),
                (BCR1, 0xE0),
                (BCR2, 0xC0),
                (BARD, 0xC7),
            ],
            &[],
        );
        let mut t = Target::new(Box::new(pod));
        let report = autoprobe(&mut t).unwrap();
        assert_eq!(report.part_id, 0);
        assert_eq!(report.derivative.as_deref(), Some("MC68HC912B32"));
        assert!(report.sizes.is_none());
    }

    #[test]
    fn dg128_signature_sniffs_the_second_can_block() {
        let pod = MapPod::new(
            &[
                (INITRM, 0x20),
                (INITEE, 0x01),
                (MISC, 0x0D),
                (PPAGE_HC12, 0x07),
                (C2MCR0, 0x21),
                (C2TFLG, 0x07),
            ],
            &[],
        );
        let mut t = Target::new(Box::new(pod));
        let report = autoprobe(&mut t).unwrap();
        assert_eq!(report.derivative.as_deref(), Some("MC68HC912DT128"));
    }

    #[test]
    fn unknown_signature_reports_no_derivative() {
        let pod = MapPod::new(&[(INITRM, 0x42)], &[]);
        let mut t = Target::new(Box::new(pod));
        assert_eq!(autoprobe(&mut t).unwrap().derivative, None);
    }
}
