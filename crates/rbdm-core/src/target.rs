//! Target session: the device facade and the area transfer engine
//!
//! A [`Target`] represents one connected chip across its lifetime. It owns
//! the pod handle, tracks the run state and the CCR shadow, and translates
//! domain operations into pod calls. Bulk transfers are chunked here to the
//! pod's payload maxima.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::pod::{CpuRegister, Pod};

/// Address of the part-ID register (PARTIDH/PARTIDL). Classic HC12 derivates
/// don't have it and read zero.
pub const PART_ID: u16 = 0x001A;
/// Address of the MEMSIZ0/MEMSIZ1 register pair.
pub const MEMSIZ: u16 = 0x001C;
/// Program page index register.
pub const PPAGE: u16 = 0x0030;
/// CCR holding register inside the BDM firmware map.
pub const BDMCCR: u16 = 0xFF06;
/// Top of the 16-bit address space; the vector table grows down from here.
pub const MEMORY_HIGH: u16 = 0xFFFF;

/// Run state of the target CPU as last commanded by this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Halted in active background mode.
    Halted,
    /// Executing user code.
    Running,
    /// Single-stepping.
    Tracing,
}

/// Interrupt vectors available on every HC(S)12, by vector number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vector {
    /// External reset.
    Reset = 0,
    /// Clock monitor fail.
    Cmf = 1,
    /// COP watchdog.
    Cop = 2,
    /// Unimplemented opcode trap.
    Trap = 3,
    /// Software interrupt.
    Swi = 4,
    /// Non-maskable XIRQ pin.
    Xirq = 5,
    /// Maskable IRQ pin.
    Irq = 6,
}

impl Vector {
    /// All vectors in table order.
    pub const ALL: [Vector; 7] = [
        Self::Reset,
        Self::Cmf,
        Self::Cop,
        Self::Trap,
        Self::Swi,
        Self::Xirq,
        Self::Irq,
    ];

    /// Address of this vector: `0xFFFF - 2n - 1`.
    pub const fn address(self) -> u16 {
        MEMORY_HIGH - 2 * (self as u16) - 1
    }

    /// Vector mnemonic.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reset => "RESET",
            Self::Cmf => "CMF",
            Self::Cop => "COP",
            Self::Trap => "TRAP",
            Self::Swi => "SWI",
            Self::Xirq => "XIRQ",
            Self::Irq => "IRQ",
        }
    }
}

/// On-chip memory sizes decoded from the MEMSIZ register pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySizes {
    /// Register space in bytes (1 or 2 KiB).
    pub reg_space: u32,
    /// EEPROM size in bytes.
    pub eep_space: u32,
    /// RAM size in bytes.
    pub ram_space: u32,
    /// Allocated flash/ROM size in bytes.
    pub alloc_rom_space: u32,
}

impl MemorySizes {
    /// Decode the raw MEMSIZ word through the fixed bit-field tables.
    pub fn decode(mem_size: u16) -> Self {
        const EEP_MAP: [u32; 4] = [0, 2 * 1024, 4 * 1024, 8 * 1024];
        const RAM_MAP: [u32; 8] = [
            2 * 1024,
            4 * 1024,
            6 * 1024,
            8 * 1024,
            10 * 1024,
            12 * 1024,
            14 * 1024,
            16 * 1024,
        ];
        const ROM_MAP: [u32; 4] = [0, 16 * 1024, 48 * 1024, 64 * 1024];

        let reg_space = if mem_size & 0x8000 != 0 { 2048 } else { 1024 };
        let eep_space = EEP_MAP[((mem_size & 0x3000) >> 12) as usize];
        let ram_space = RAM_MAP[((mem_size & 0x0700) >> 8) as usize];
        let alloc_rom_space = ROM_MAP[((mem_size & 0x00C0) >> 6) as usize];

        Self {
            reg_space,
            eep_space,
            ram_space,
            alloc_rom_space,
        }
    }
}

/// Cooperative cancellation for long transfers and flash polls.
///
/// Cloned tokens share one flag; cancel from anywhere (e.g. a Ctrl-C
/// handler), the session checks between chunks and poll iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Error out if cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One connected chip. Created on successful pod open, dropped on close.
/// Not thread-shared; operations are strictly ordered by call order.
pub struct Target {
    pod: Box<dyn Pod>,
    run_state: RunState,
    // The hardware exposes CCR only through the BDMCCR holding register;
    // the last value written by software is tracked separately because the
    // two views can diverge (see read_ccr_from_hardware/last_written_ccr).
    ccr_shadow: Option<u8>,
    cancel: CancelToken,
}

impl Target {
    /// Wrap an opened pod into a session. The target state is unknown until
    /// the first reset/halt.
    pub fn new(pod: Box<dyn Pod>) -> Self {
        Self {
            pod,
            run_state: RunState::Running,
            ccr_shadow: None,
            cancel: CancelToken::new(),
        }
    }

    /// A clone of this session's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The pod's device name.
    pub fn device_name(&self) -> &'static str {
        self.pod.device_name()
    }

    /// The pod's firmware version string.
    pub fn pod_version(&mut self) -> Result<String> {
        self.pod.pod_version()
    }

    /// Run state as last commanded through this session.
    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    fn ensure_aligned(addr: u16) -> Result<()> {
        if addr & 1 != 0 {
            Err(Error::Alignment { addr })
        } else {
            Ok(())
        }
    }

    // -- Run control ------------------------------------------------------

    /// Reset the target. The target comes out of reset running; halt before
    /// any further access.
    pub fn reset(&mut self) -> Result<()> {
        log::debug!("RESET");
        self.pod.reset()?;
        self.run_state = RunState::Running;
        self.ccr_shadow = None;
        Ok(())
    }

    /// Enter active background mode.
    pub fn halt(&mut self) -> Result<()> {
        log::debug!("BACKGROUND");
        self.pod.background()?;
        self.run_state = RunState::Halted;
        Ok(())
    }

    /// Go to user program.
    pub fn go(&mut self) -> Result<()> {
        log::debug!("GO");
        self.pod.go()?;
        self.run_state = RunState::Running;
        Ok(())
    }

    /// Go to user program; ACK on return to background mode.
    pub fn go_until(&mut self) -> Result<()> {
        log::debug!("GO_UNTIL");
        self.pod.go_until()?;
        self.run_state = RunState::Running;
        Ok(())
    }

    /// Enable tagging and go to user program.
    pub fn tag_go(&mut self) -> Result<()> {
        log::debug!("TAGGO");
        self.pod.tag_go()?;
        self.run_state = RunState::Running;
        Ok(())
    }

    /// Execute one user instruction then return to background mode.
    pub fn trace(&mut self) -> Result<()> {
        log::debug!("TRACE1");
        self.pod.trace1()?;
        self.run_state = RunState::Tracing;
        Ok(())
    }

    // -- Memory access ----------------------------------------------------

    /// Read a byte with BDM out of map.
    pub fn read_byte(&mut self, addr: u16) -> Result<u8> {
        self.pod.read_byte(addr)
    }

    /// Read a word with BDM out of map. The address must be even.
    pub fn read_word(&mut self, addr: u16) -> Result<u16> {
        Self::ensure_aligned(addr)?;
        self.pod.read_word(addr)
    }

    /// Read a byte with BDM in map.
    pub fn read_bd_byte(&mut self, addr: u16) -> Result<u8> {
        self.pod.read_bd_byte(addr)
    }

    /// Read a word with BDM in map. The address must be even.
    pub fn read_bd_word(&mut self, addr: u16) -> Result<u16> {
        Self::ensure_aligned(addr)?;
        self.pod.read_bd_word(addr)
    }

    /// Write a byte with BDM out of map.
    pub fn write_byte(&mut self, addr: u16, data: u8) -> Result<()> {
        self.pod.write_byte(addr, data)
    }

    /// Write a word with BDM out of map. The address must be even.
    pub fn write_word(&mut self, addr: u16, data: u16) -> Result<()> {
        Self::ensure_aligned(addr)?;
        self.pod.write_word(addr, data)
    }

    /// Write a byte with BDM in map.
    pub fn write_bd_byte(&mut self, addr: u16, data: u8) -> Result<()> {
        self.pod.write_bd_byte(addr, data)
    }

    /// Write a word with BDM in map. The address must be even.
    pub fn write_bd_word(&mut self, addr: u16, data: u16) -> Result<()> {
        Self::ensure_aligned(addr)?;
        self.pod.write_bd_word(addr, data)
    }

    /// X = X + 2; read the next word pointed to by X.
    pub fn read_next(&mut self) -> Result<u16> {
        self.pod.read_next()
    }

    /// X = X + 2; write the next word pointed to by X.
    pub fn write_next(&mut self, data: u16) -> Result<()> {
        self.pod.write_next(data)
    }

    // -- CPU registers ----------------------------------------------------

    /// Read a CPU register.
    pub fn read_cpu_register(&mut self, reg: CpuRegister) -> Result<u16> {
        let value = self.pod.read_cpu_register(reg)?;
        log::debug!("READ_{} -> 0x{:04X}", reg.name(), value);
        Ok(value)
    }

    /// Write a CPU register.
    pub fn write_cpu_register(&mut self, reg: CpuRegister, data: u16) -> Result<()> {
        log::debug!("WRITE_{} <- 0x{:04X}", reg.name(), data);
        self.pod.write_cpu_register(reg, data)
    }

    /// Read the program counter.
    pub fn read_pc(&mut self) -> Result<u16> {
        self.read_cpu_register(CpuRegister::Pc)
    }

    /// Write the program counter.
    pub fn write_pc(&mut self, data: u16) -> Result<()> {
        self.write_cpu_register(CpuRegister::Pc, data)
    }

    /// Read the stack pointer.
    pub fn read_sp(&mut self) -> Result<u16> {
        self.read_cpu_register(CpuRegister::Sp)
    }

    /// Write the stack pointer.
    pub fn write_sp(&mut self, data: u16) -> Result<()> {
        self.write_cpu_register(CpuRegister::Sp, data)
    }

    // -- CCR --------------------------------------------------------------
    //
    // The CCR has no opcode of its own; it is reached through the BDMCCR
    // holding register. Reading the holding register and remembering what
    // software last wrote are genuinely different views (the firmware
    // updates BDMCCR on entry to background mode), so both are exposed.

    /// Read the CCR holding register from hardware.
    pub fn read_ccr_from_hardware(&mut self) -> Result<u8> {
        self.read_bd_byte(BDMCCR)
    }

    /// The last CCR value written through this session, if any.
    pub fn last_written_ccr(&self) -> Option<u8> {
        self.ccr_shadow
    }

    /// Write the CCR holding register and update the shadow.
    pub fn write_ccr(&mut self, value: u8) -> Result<()> {
        self.write_bd_byte(BDMCCR, value)?;
        self.ccr_shadow = Some(value);
        Ok(())
    }

    // -- Identification ---------------------------------------------------

    /// Read the part-ID register. Zero means a legacy chip without one;
    /// see [`crate::probe::autoprobe`].
    pub fn part_id(&mut self) -> Result<u16> {
        self.read_word(PART_ID)
    }

    /// Read and decode the MEMSIZ register pair.
    pub fn memory_sizes(&mut self) -> Result<MemorySizes> {
        Ok(MemorySizes::decode(self.read_word(MEMSIZ)?))
    }

    /// Read the program page register.
    pub fn ppage(&mut self) -> Result<u8> {
        self.read_bd_byte(PPAGE)
    }

    /// Write the program page register.
    pub fn set_ppage(&mut self, value: u8) -> Result<()> {
        self.write_bd_byte(PPAGE, value)
    }

    /// Read one interrupt vector.
    pub fn vector(&mut self, vector: Vector) -> Result<u16> {
        self.read_word(vector.address())
    }

    // -- Area transfer engine ---------------------------------------------
    //
    // Chunk order is strictly ascending by address; some peripherals have
    // side effects on sequential access. A failed chunk aborts the whole
    // operation; bytes already on the wire are not rolled back.

    /// Bulk read of `length` bytes starting at `addr`.
    pub fn read_area(&mut self, addr: u16, length: usize) -> Result<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let max = self.pod.max_read_payload();
        let chunks = length / max;
        let remainder = length % max;
        let mut offset = addr;
        let mut result = Vec::with_capacity(length);
        for _ in 0..chunks {
            self.cancel.check()?;
            log::debug!("Reading {} bytes starting @ 0x{:04X}", max, offset);
            result.extend_from_slice(&self.pod.read_area_chunk(offset, max)?);
            offset = offset.wrapping_add(max as u16);
        }
        if remainder > 0 {
            self.cancel.check()?;
            log::debug!("Reading {} bytes starting @ 0x{:04X}", remainder, offset);
            result.extend_from_slice(&self.pod.read_area_chunk(offset, remainder)?);
        }
        Ok(result)
    }

    /// Bulk write of `data` starting at `addr`.
    pub fn write_area(&mut self, addr: u16, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let max = self.pod.max_write_payload();
        let mut offset = addr;
        for chunk in data.chunks(max) {
            self.cancel.check()?;
            log::debug!("Writing {} bytes starting @ 0x{:04X}", chunk.len(), offset);
            self.pod.write_area_chunk(offset, chunk)?;
            offset = offset.wrapping_add(chunk.len() as u16);
        }
        Ok(())
    }

    /// Bulk fill of `length` bytes of `value` starting at `addr`.
    pub fn fill_area(&mut self, addr: u16, value: u8, length: usize) -> Result<()> {
        if length == 0 {
            return Ok(());
        }
        let max = self.pod.max_write_payload();
        let chunks = length / max;
        let remainder = length % max;
        let mut offset = addr;
        let block = vec![value; max];
        for _ in 0..chunks {
            self.cancel.check()?;
            log::debug!(
                "Filling {} bytes with 0x{:02X} starting @ 0x{:04X}",
                max,
                value,
                offset
            );
            self.pod.write_area_chunk(offset, &block)?;
            offset = offset.wrapping_add(max as u16);
        }
        if remainder > 0 {
            self.cancel.check()?;
            log::debug!(
                "Filling {} bytes with 0x{:02X} starting @ 0x{:04X}",
                remainder,
                value,
                offset
            );
            self.pod.write_area_chunk(offset, &block[..remainder])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pod::{CpuRegister, Pod};

    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Record {
        read_chunks: Vec<(u16, usize)>,
        write_chunks: Vec<(u16, Vec<u8>)>,
        word_writes: usize,
    }

    /// Pod double recording every chunk the engine issues.
    struct RecordingPod {
        max_read: usize,
        max_write: usize,
        record: Rc<RefCell<Record>>,
    }

    impl Pod for RecordingPod {
        fn device_name(&self) -> &'static str {
            "recording pod"
        }
        fn pod_version(&mut self) -> Result<String> {
            Ok("recording pod v0.0".into())
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
        fn read_byte(&mut self, _addr: u16) -> Result<u8> {
            Ok(0)
        }
        fn read_word(&mut self, _addr: u16) -> Result<u16> {
            Ok(0)
        }
        fn read_bd_byte(&mut self, _addr: u16) -> Result<u8> {
            Ok(0)
        }
        fn read_bd_word(&mut self, _addr: u16) -> Result<u16> {
            Ok(0)
        }
        fn write_byte(&mut self, _addr: u16, _data: u8) -> Result<()> {
            Ok(())
        }
        fn write_word(&mut self, _addr: u16, _data: u16) -> Result<()> {
            self.record.borrow_mut().word_writes += 1;
            Ok(())
        }
        fn write_bd_byte(&mut self, _addr: u16, _data: u8) -> Result<()> {
            Ok(())
        }
        fn write_bd_word(&mut self, _addr: u16, _data: u16) -> Result<()> {
            self.record.borrow_mut().word_writes += 1;
            Ok(())
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
            self.max_read
        }
        fn max_write_payload(&self) -> usize {
            self.max_write
        }
        fn read_area_chunk(&mut self, addr: u16, len: usize) -> Result<Vec<u8>> {
            self.record.borrow_mut().read_chunks.push((addr, len));
            Ok(vec![0xA5; len])
        }
        fn write_area_chunk(&mut self, addr: u16, data: &[u8]) -> Result<()> {
            self.record
                .borrow_mut()
                .write_chunks
                .push((addr, data.to_vec()));
            Ok(())
        }
    }

    fn target(max_read: usize, max_write: usize) -> (Target, Rc<RefCell<Record>>) {
        let record = Rc::new(RefCell::new(Record::default()));
        let pod = RecordingPod {
            max_read,
            max_write,
            record: record.clone(),
        };
        (Target::new(Box::new(pod)), record)
    }

    #[test]
    fn zero_length_transfers_touch_nothing() {
        let (mut t, rec) = target(16, 16);
        assert!(t.read_area(0x1000, 0).unwrap().is_empty());
        t.write_area(0x1000, &[]).unwrap();
        t.fill_area(0x1000, 0xFF, 0).unwrap();
        assert!(rec.borrow().read_chunks.is_empty());
        assert!(rec.borrow().write_chunks.is_empty());
    }

    #[test]
    fn read_chunking_is_ascending_and_bounded() {
        let (mut t, rec) = target(16, 0xFF);
        let data = t.read_area(0x2000, 3 * 16 + 7).unwrap();
        assert_eq!(data.len(), 55);
        assert_eq!(
            rec.borrow().read_chunks,
            vec![(0x2000, 16), (0x2010, 16), (0x2020, 16), (0x2030, 7)]
        );
    }

    #[test]
    fn read_of_exact_multiple_has_no_remainder_chunk() {
        let (mut t, rec) = target(16, 0xFF);
        t.read_area(0x0000, 32).unwrap();
        assert_eq!(rec.borrow().read_chunks, vec![(0x0000, 16), (0x0010, 16)]);
    }

    #[test]
    fn write_slices_source_in_chunk_order() {
        let (mut t, rec) = target(16, 4);
        let data: Vec<u8> = (0..10).collect();
        t.write_area(0x8000, &data).unwrap();
        let rec = rec.borrow();
        assert_eq!(rec.write_chunks.len(), 3);
        assert_eq!(rec.write_chunks[0], (0x8000, vec![0, 1, 2, 3]));
        assert_eq!(rec.write_chunks[1], (0x8004, vec![4, 5, 6, 7]));
        assert_eq!(rec.write_chunks[2], (0x8008, vec![8, 9]));
    }

    #[test]
    fn fill_replicates_value_per_chunk() {
        let (mut t, rec) = target(16, 4);
        t.fill_area(0x1234, 0xEE, 6).unwrap();
        let rec = rec.borrow();
        assert_eq!(rec.write_chunks[0], (0x1234, vec![0xEE; 4]));
        assert_eq!(rec.write_chunks[1], (0x1238, vec![0xEE; 2]));
    }

    #[test]
    fn odd_word_write_fails_before_any_pod_call() {
        let (mut t, rec) = target(16, 16);
        let err = t.write_word(0x1001, 0xBEEF).unwrap_err();
        assert!(matches!(err, Error::Alignment { addr: 0x1001 }));
        assert_eq!(rec.borrow().word_writes, 0);
    }

    #[test]
    fn odd_word_read_fails() {
        let (mut t, _) = target(16, 16);
        assert!(matches!(
            t.read_word(0xFFFF),
            Err(Error::Alignment { addr: 0xFFFF })
        ));
        assert!(t.read_word(0xFFFE).is_ok());
    }

    #[test]
    fn cancelled_token_aborts_between_chunks() {
        let (mut t, rec) = target(16, 16);
        t.cancel_token().cancel();
        assert!(matches!(t.read_area(0, 32), Err(Error::Cancelled)));
        assert!(rec.borrow().read_chunks.is_empty());
    }

    #[test]
    fn memsize_decode_matches_field_tables() {
        // REG_SW=1 (2K), EEP_SW=2 (4K), RAM_SW=3 (8K), ROM_SW=2 (48K)
        let sizes = MemorySizes::decode(0x8000 | 0x2000 | 0x0300 | 0x0080);
        assert_eq!(
            sizes,
            MemorySizes {
                reg_space: 2048,
                eep_space: 4096,
                ram_space: 8192,
                alloc_rom_space: 48 * 1024,
            }
        );

        // All fields zero: 1K registers, no EEPROM, 2K RAM, no flash.
        let sizes = MemorySizes::decode(0x0000);
        assert_eq!(
            sizes,
            MemorySizes {
                reg_space: 1024,
                eep_space: 0,
                ram_space: 2048,
                alloc_rom_space: 0,
            }
        );
    }

    #[test]
    fn vector_addresses_follow_the_table() {
        assert_eq!(Vector::Reset.address(), 0xFFFE);
        assert_eq!(Vector::Cmf.address(), 0xFFFC);
        assert_eq!(Vector::Cop.address(), 0xFFFA);
        assert_eq!(Vector::Trap.address(), 0xFFF8);
        assert_eq!(Vector::Swi.address(), 0xFFF6);
        assert_eq!(Vector::Xirq.address(), 0xFFF4);
        assert_eq!(Vector::Irq.address(), 0xFFF2);
    }

    #[test]
    fn ccr_views_are_distinct() {
        let (mut t, _) = target(16, 16);
        assert_eq!(t.last_written_ccr(), None);
        t.write_ccr(0xD8).unwrap();
        assert_eq!(t.last_written_ccr(), Some(0xD8));
        // Hardware view goes through the pod regardless of the shadow.
        assert!(t.read_ccr_from_hardware().is_ok());
    }

    #[test]
    fn run_state_follows_commands() {
        let (mut t, _) = target(16, 16);
        assert_eq!(t.run_state(), RunState::Running);
        t.halt().unwrap();
        assert_eq!(t.run_state(), RunState::Halted);
        t.trace().unwrap();
        assert_eq!(t.run_state(), RunState::Tracing);
        t.go().unwrap();
        assert_eq!(t.run_state(), RunState::Running);
    }
}
