//! S12 part identification table
//!
//! PARTIDH/PARTIDL at 0x001A/0x001B encode family, flash-size class and mask
//! revision; the table below maps known IDs to device names and mask sets.
//! One ID can cover several marketing names sharing a die.

/// One known part-ID register value.
#[derive(Debug, Clone, Copy)]
pub struct PartEntry {
    /// PARTID register value.
    pub id: u16,
    /// Device names sharing this ID.
    pub devices: &'static [&'static str],
    /// Known mask set codes.
    pub masks: &'static [&'static str],
}

macro_rules! part {
    ($id:expr, [$($dev:literal),+], [$($mask:literal),+]) => {
        PartEntry {
            id: $id,
            devices: &[$($dev),+],
            masks: &[$($mask),+],
        }
    };
}

/// Known part IDs, ascending.
pub static PART_IDS: &[PartEntry] = &[
    part!(0x0010, ["MC9S12DP256"], ["0K79X"]),
    part!(0x0011, ["MC9S12DP256"], ["1K79X"]),
    part!(0x0012, ["MC9S12DP256"], ["2K79X"]),
    part!(0x0030, ["MC9S12DT256"], ["0L91N"]),
    part!(0x0100, ["MC9S12DT128B"], ["0L85D"]),
    part!(0x0101, ["MC9S12DT128B"], ["1L85D"]),
    part!(0x0110, ["MC9S12DT128"], ["0L94R"]),
    part!(0x0111, ["MC9S12DT128"], ["1L40K"]),
    part!(0x0113, ["MC9S12DT128"], ["3L40K"]),
    part!(0x0114, ["MC9S12DT128"], ["4L40K"]),
    part!(0x0115, ["MC9S12DT128"], ["1L59W", "5L40K", "2L94R"]),
    part!(0x0200, ["MC9S12DJ64"], ["0L86D"]),
    part!(0x0201, ["MC9S12DJ64"], ["1L86D", "2L86D"]),
    part!(0x0203, ["MC9S12DJ64"], ["3L86D"]),
    part!(0x0204, ["MC9S12DJ64"], ["4L86D"]),
    part!(0x0400, ["MC9S12DP512"], ["0L00M"]),
    part!(0x0401, ["MC9S12DP512"], ["1L00M"]),
    part!(0x0402, ["MC9S12DP512"], ["2L00M"]),
    part!(0x0403, ["MC9S12DP512"], ["3L00M"]),
    part!(0x0404, ["MC9S12DP512"], ["4L00M"]),
    part!(0x0682, ["MC3S12RG128"], ["2M38B"]),
    part!(0x1000, ["MC9S12H256"], ["0K78X"]),
    part!(0x1001, ["MC9S12H256"], ["1K78X"]),
    part!(0x1402, ["MC9S12HZ256"], ["2L16Y"]),
    part!(0x1403, ["MC9S12HZ256"], ["3L16Y"]),
    part!(
        0x1501,
        ["MC3S12HN32", "MC9S12HN64", "MC3S12HZ32", "MC3S12HZ64", "MC3S12HZ128", "MC3S12HZ256"],
        ["1M36C"]
    ),
    part!(
        0x1A80,
        ["MC9S12HY32", "MC9S12HY48", "MC9S12HY64", "MC9S12HA32", "MC9S12HA48", "MC9S12HA64"],
        ["0M34S"]
    ),
    part!(
        0x3102,
        [
            "MC9S12C64", "MC9S12C96", "MC9S12C128", "MC9S12GC64", "MC9S12GC96", "MC9S12GC128",
            "MC9S12Q64", "MC9S12Q96", "MC9S12Q128"
        ],
        ["2L09S"]
    ),
    part!(
        0x3103,
        [
            "MC9S12C64", "MC9S12C96", "MC9S12C128", "MC9S12GC64", "MC9S12GC96", "MC9S12GC128",
            "MC9S12Q64", "MC9S12Q96", "MC9S12Q128"
        ],
        ["0M66G"]
    ),
    part!(0x3300, ["MC9S12C32"], ["1L45J"]),
    part!(0x3302, ["MC9S12C32", "MC9S12GC16", "MC9S12GC32", "MC9S12Q32"], ["2L45J"]),
    part!(0x3310, ["MC9S12C32", "MC9S12GC32"], ["0M34C"]),
    part!(0x3311, ["MC9S12C32", "MC9S12GC32", "MC3S12Q32"], ["1M34C"]),
    part!(
        0x3980,
        ["MC9S12P32", "MC9S12P64", "MC9S12P96", "MC9S12P128"],
        ["0M01N"]
    ),
    part!(0x5000, ["MC9S12E256"], ["0L43X"]),
    part!(0x5102, ["MC9S12E128"], ["2L15P"]),
    part!(0x5200, ["MC9S12E64"], ["2L15P"]),
    part!(0x6300, ["MC9S12UF32"], ["0L24N", "1L79R"]),
    part!(0x6310, ["MC9S12UF32"], ["0L47S"]),
    part!(0x6311, ["MC9S12UF32"], ["1L47S"]),
    part!(0x7000, ["MC9S12KT256"], ["0L33V"]),
    part!(0x7100, ["MC9S12KG128"], ["0L74N"]),
    part!(0x8200, ["MC9S12NE64"], ["0L19S"]),
    part!(0x8201, ["MC9S12NE64"], ["1L19S"]),
    part!(
        0xC000,
        ["MC9S12XDQ256", "MC9S12XDT256", "MC9S12XB256"],
        ["M84E"]
    ),
    part!(0xC080, ["MC9S12XET256"], ["0M53J"]),
    part!(
        0xC081,
        ["MC9S12XEA128", "MC9S12XEA256", "MC9S12XEG128", "MC9S12XET256"],
        ["1M53J"]
    ),
    part!(0xC410, ["MC9S12XDT384", "MC9S12XDP512"], ["L15Y"]),
    part!(0xC480, ["MC9S12XEQ512"], ["0M25J"]),
    part!(0xC481, ["MC9S12XEQ512"], ["1M25J"]),
    part!(
        0xC482,
        ["MC9S12XEG384", "MC9S12XEQ384", "MC9S12XEQ512", "MC9S12XES384"],
        ["2M25J"]
    ),
    part!(0xCC80, ["MC9S12XEP100"], ["1M22E", "0M22E"]),
    part!(0xCC82, ["MC9S12XEP100"], ["2M22E"]),
    part!(0xCC90, ["MC9S12XEP100"], ["0M48H"]),
    part!(0xCC91, ["MC9S12XEP100"], ["1M48H"]),
    part!(0xCC92, ["MC9S12XEP100"], ["2M48H"]),
    part!(0xCC93, ["MC9S12XEP100"], ["3M48H"]),
    part!(0xCC94, ["MC9S12XEP768", "MC9S12XEP100"], ["4M48H"]),
    part!(0xD480, ["MC9S12XF512"], ["0M64J"]),
];

/// Look up a part-ID register value.
pub fn lookup(id: u16) -> Option<&'static PartEntry> {
    PART_IDS
        .binary_search_by_key(&id, |e| e.id)
        .ok()
        .map(|i| &PART_IDS[i])
}

/// Family letter encoded in bits 15-12.
pub fn family_name(id: u16) -> Option<&'static str> {
    match (id >> 12) & 0xF {
        0x0 => Some("D"),
        0x1 => Some("H"),
        0x2 => Some("B"),
        0x3 => Some("C"),
        0x4 => Some("T"),
        0x5 => Some("E"),
        0x6 => Some("U"),
        0x7 => Some("K"),
        0x8 => Some("NE"),
        _ => None,
    }
}

/// Flash size class in KiB, encoded in bits 11-8.
pub fn flash_kib(id: u16) -> Option<u32> {
    match (id >> 8) & 0xF {
        0x0 => Some(256),
        0x1 => Some(128),
        0x2 => Some(64),
        0x3 => Some(32),
        0x4 => Some(512),
        _ => None,
    }
}

/// Mask set revision, (major, minor), from bits 7-0.
pub fn mask_revision(id: u16) -> (u8, u8) {
    (((id >> 4) & 0xF) as u8, (id & 0xF) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_for_binary_search() {
        assert!(PART_IDS.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn lookup_finds_known_parts() {
        let entry = lookup(0x0400).unwrap();
        assert_eq!(entry.devices, ["MC9S12DP512"]);
        assert_eq!(entry.masks, ["0L00M"]);
        assert!(lookup(0x5300).is_none());
    }

    #[test]
    fn id_field_decoding() {
        // MC9S12DP256, mask 2K79X.
        assert_eq!(family_name(0x0012), Some("D"));
        assert_eq!(flash_kib(0x0012), Some(256));
        assert_eq!(mask_revision(0x0012), (1, 2));

        assert_eq!(family_name(0x8200), Some("NE"));
        assert_eq!(flash_kib(0x8200), Some(64));
        assert_eq!(family_name(0xC080), None);
    }
}
