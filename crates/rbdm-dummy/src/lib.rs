//! rbdm-dummy - In-memory target emulator for testing
//!
//! Emulates a ComPOD12-compatible pod wired to an S12 target, entirely in
//! memory: a flat 64 KiB address space, CPU registers and a simplified
//! flash/EEPROM controller. It implements [`Transport`], so the full command
//! codec and any pod built on it run unchanged against the emulator.
//!
//! Useful for development and tests without hardware; fault injection can
//! drop, corrupt or truncate the next response to exercise error paths.
//!
//! Simplifications: in-map and out-of-map accesses hit the same flat array,
//! and command completion is instantaneous (CCIF is always set once a
//! command has run).

use rbdm_core::error::Result;
use rbdm_core::protocol;
use rbdm_core::transport::Transport;

const MEMORY_SIZE: usize = 0x1_0000;

// Controller register addresses.
const FSEC: u16 = 0x0101;
const FCNFG: u16 = 0x0103;
const FPROT: u16 = 0x0104;
const FSTAT: u16 = 0x0105;
const FCMD: u16 = 0x0106;
const ECNFG: u16 = 0x0113;
const EPROT: u16 = 0x0114;
const ESTAT: u16 = 0x0115;
const ECMD: u16 = 0x0116;

// Status bits.
const CBEIF: u8 = 0x80;
const CCIF: u8 = 0x40;
const PVIOL: u8 = 0x20;
const ACCERR: u8 = 0x10;
const BLANK: u8 = 0x04;

// Protection bits required for erase commands to pass.
const FPROT_OPEN: u8 = 0x80 | 0x20 | 0x04;
const EPROT_OPEN: u8 = 0x80 | 0x08;

// Emulated array ranges.
const FLASH_START: u16 = 0x4000;
const EEPROM_START: u16 = 0x0400;
const EEPROM_END: u16 = 0x0FFF;
const FLASH_SECTOR: usize = 512;
const EEPROM_SECTOR: usize = 4;

/// A fault applied to the next response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Swallow the response entirely.
    DropResponse,
    /// Flip bits in the echo byte.
    CorruptEcho,
    /// Cut the response short by one byte.
    TruncateResponse,
}

/// Configuration of the emulated target.
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Part-ID register value at 0x001A.
    pub part_id: u16,
    /// MEMSIZ register value at 0x001C.
    pub memsiz: u16,
    /// Pod firmware version reported by VERSION.
    pub version: (u8, u8),
    /// FSEC register value; 0x02 in the SEC bits means unsecured.
    pub fsec: u8,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            // MC9S12DP512, 2K registers / 4K EEPROM / 8K RAM / 48K ROM.
            part_id: 0x0400,
            memsiz: 0xA380,
            version: (4, 7),
            fsec: 0x02,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CpuState {
    pc: u16,
    d: u16,
    x: u16,
    y: u16,
    sp: u16,
}

/// Simplified NVM controller state, shared shape for flash and EEPROM.
#[derive(Debug, Default, Clone, Copy)]
struct NvmState {
    errors: u8,
    blank: bool,
}

impl NvmState {
    fn status(&self) -> u8 {
        let mut stat = CBEIF | CCIF | self.errors;
        if self.blank {
            stat |= BLANK;
        }
        stat
    }
}

/// Transport call counters, for asserting on traffic shape in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct Counters {
    /// Transport write calls.
    pub writes: usize,
    /// Transport read calls.
    pub reads: usize,
    /// Fully decoded commands.
    pub commands: usize,
}

/// The emulated pod-plus-target.
pub struct DummyPod {
    config: DummyConfig,
    memory: Vec<u8>,
    cpu: CpuState,
    halted: bool,
    flash: NvmState,
    eeprom: NvmState,
    /// Last word written through the facade, latched for NVM commands.
    latched: Option<(u16, u16)>,
    rx: Vec<u8>,
    tx: Vec<u8>,
    fault: Option<Fault>,
    counters: Counters,
}

impl DummyPod {
    /// Create an emulated target with the given configuration.
    pub fn new(config: DummyConfig) -> Self {
        let mut memory = vec![0xFF; MEMORY_SIZE];
        memory[0x001A..0x001C].copy_from_slice(&config.part_id.to_be_bytes());
        memory[0x001C..0x001E].copy_from_slice(&config.memsiz.to_be_bytes());
        memory[FSEC as usize] = config.fsec;
        Self {
            config,
            memory,
            cpu: CpuState {
                pc: 0xC000,
                d: 0,
                x: 0,
                y: 0,
                sp: 0x3FFF,
            },
            halted: false,
            flash: NvmState::default(),
            eeprom: NvmState::default(),
            latched: None,
            rx: Vec::new(),
            tx: Vec::new(),
            fault: None,
            counters: Counters::default(),
        }
    }

    /// Create an emulated target with the default configuration.
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Apply a fault to the next response.
    pub fn inject(&mut self, fault: Fault) {
        self.fault = Some(fault);
    }

    /// Transport call counters so far.
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Direct view of the emulated memory, for test assertions.
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Preload emulated memory, bypassing the wire protocol.
    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let addr = addr as usize;
        self.memory[addr..addr + data.len()].copy_from_slice(data);
    }

    /// True while the emulated target sits in background mode.
    pub fn halted(&self) -> bool {
        self.halted
    }

    fn read_mem_byte(&mut self, addr: u16) -> u8 {
        match addr {
            FSTAT => self.flash.status(),
            ESTAT => self.eeprom.status(),
            _ => self.memory[addr as usize],
        }
    }

    fn read_mem_word(&mut self, addr: u16) -> u16 {
        u16::from_be_bytes([
            self.read_mem_byte(addr),
            self.read_mem_byte(addr.wrapping_add(1)),
        ])
    }

    fn in_nvm_array(addr: u16) -> bool {
        addr >= FLASH_START || (EEPROM_START..=EEPROM_END).contains(&addr)
    }

    fn write_mem_byte(&mut self, addr: u16, data: u8) {
        match addr {
            FSTAT => {
                if data & (PVIOL | ACCERR) != 0 {
                    self.flash.errors &= !(data & (PVIOL | ACCERR));
                }
                if data & CBEIF != 0 {
                    self.run_nvm_command(false);
                }
            }
            ESTAT => {
                if data & (PVIOL | ACCERR) != 0 {
                    self.eeprom.errors &= !(data & (PVIOL | ACCERR));
                }
                if data & CBEIF != 0 {
                    self.run_nvm_command(true);
                }
            }
            // Bus writes into the flash/EEPROM arrays latch command
            // operands but never change the cells.
            _ if Self::in_nvm_array(addr) => {}
            _ => self.memory[addr as usize] = data,
        }
    }

    fn write_mem_word(&mut self, addr: u16, data: u16) {
        let [hi, lo] = data.to_be_bytes();
        self.write_mem_byte(addr, hi);
        self.write_mem_byte(addr.wrapping_add(1), lo);
        self.latched = Some((addr, data));
    }

    fn erase(&mut self, start: u16, end: u16) {
        for cell in &mut self.memory[start as usize..=end as usize] {
            *cell = 0xFF;
        }
    }

    fn nvm_error(&mut self, eeprom: bool, bits: u8) {
        if eeprom {
            self.eeprom.errors |= bits;
        } else {
            self.flash.errors |= bits;
        }
    }

    /// Execute the latched NVM command. Word programming can only clear
    /// bits, like the real array.
    fn run_nvm_command(&mut self, eeprom: bool) {
        let Some((addr, data)) = self.latched else {
            self.nvm_error(eeprom, ACCERR);
            return;
        };
        let cmd = self.memory[if eeprom { ECMD } else { FCMD } as usize];
        let prot = self.memory[if eeprom { EPROT } else { FPROT } as usize];
        let prot_open = if eeprom {
            prot & EPROT_OPEN == EPROT_OPEN
        } else {
            prot & FPROT_OPEN == FPROT_OPEN
        };
        log::debug!(
            "dummy {} command 0x{:02X} @ 0x{:04X}=0x{:04X}",
            if eeprom { "eeprom" } else { "flash" },
            cmd,
            addr,
            data
        );

        if addr & 1 != 0 {
            self.nvm_error(eeprom, ACCERR);
            return;
        }
        match cmd {
            0x05 => {
                let (start, end) = if eeprom {
                    (EEPROM_START, EEPROM_END)
                } else {
                    (FLASH_START, 0xFFFF)
                };
                let blank = self.memory[start as usize..=end as usize]
                    .iter()
                    .all(|&b| b == 0xFF);
                if eeprom {
                    self.eeprom.blank = blank;
                } else {
                    self.flash.blank = blank;
                }
            }
            0x20 => {
                if !prot_open && !eeprom {
                    self.nvm_error(eeprom, PVIOL);
                    return;
                }
                let a = addr as usize;
                self.memory[a] &= (data >> 8) as u8;
                self.memory[a + 1] &= data as u8;
            }
            0x40 => {
                if !prot_open {
                    self.nvm_error(eeprom, PVIOL);
                    return;
                }
                let sector = if eeprom { EEPROM_SECTOR } else { FLASH_SECTOR };
                let base = addr as usize & !(sector - 1);
                let end = (base + sector - 1).min(MEMORY_SIZE - 1) as u16;
                self.erase(base as u16, end);
            }
            0x41 => {
                if !prot_open {
                    self.nvm_error(eeprom, PVIOL);
                    return;
                }
                if eeprom {
                    self.erase(EEPROM_START, EEPROM_END);
                } else {
                    self.erase(FLASH_START, 0xFFFF);
                    // A mass erase leaves the part unsecured.
                    self.memory[FSEC as usize] = 0x02;
                }
            }
            0x60 if eeprom => {
                if !prot_open {
                    self.nvm_error(eeprom, PVIOL);
                    return;
                }
                let base = addr as usize & !(EEPROM_SECTOR - 1);
                self.erase(base as u16, (base + EEPROM_SECTOR - 1) as u16);
                self.memory[addr as usize..addr as usize + 2].copy_from_slice(&data.to_be_bytes());
            }
            _ => self.nvm_error(eeprom, ACCERR),
        }
    }

    fn cpu_reg(&mut self, opcode: u8) -> &mut u16 {
        match opcode & 0x07 {
            0x03 => &mut self.cpu.pc,
            0x04 => &mut self.cpu.d,
            0x05 => &mut self.cpu.x,
            0x06 => &mut self.cpu.y,
            _ => &mut self.cpu.sp,
        }
    }

    /// Wire length of the frame starting at `rx[0]`, or None if the header
    /// is still incomplete.
    fn frame_len(&self) -> Option<usize> {
        let opcode = self.rx[0];
        Some(match opcode {
            protocol::WRITE_AREA => {
                if self.rx.len() < 4 {
                    return None;
                }
                4 + self.rx[3] as usize
            }
            protocol::READ_AREA => 4,
            protocol::READ_BYTE
            | protocol::READ_BD_BYTE
            | protocol::READ_WORD
            | protocol::READ_BD_WORD => 3,
            protocol::WRITE_BYTE | protocol::WRITE_BD_BYTE => 4,
            protocol::WRITE_WORD | protocol::WRITE_BD_WORD => 5,
            protocol::WRITE_NEXT
            | protocol::WRITE_PC
            | protocol::WRITE_D
            | protocol::WRITE_X
            | protocol::WRITE_Y
            | protocol::WRITE_SP => 3,
            _ => 1,
        })
    }

    /// Decode and execute every complete frame in the receive buffer.
    fn pump(&mut self) {
        while !self.rx.is_empty() {
            let Some(len) = self.frame_len() else { return };
            if self.rx.len() < len {
                return;
            }
            let frame: Vec<u8> = self.rx.drain(..len).collect();
            self.counters.commands += 1;
            self.execute(&frame);
        }
    }

    fn execute(&mut self, frame: &[u8]) {
        let opcode = frame[0];
        let addr =
            |f: &[u8]| u16::from_be_bytes([f[1], f[2]]);
        let mut response = vec![protocol::complement(opcode)];

        match opcode {
            protocol::RESET => {
                self.cpu.pc = self.read_mem_word(0xFFFE);
                self.halted = false;
            }
            protocol::VERSION => {
                response = vec![
                    protocol::complement(opcode),
                    self.config.version.0,
                    self.config.version.1,
                ];
            }
            protocol::BACKGROUND => self.halted = true,
            protocol::GO | protocol::GO_UNTIL | protocol::TAGGO => self.halted = false,
            protocol::TRACE1 => self.cpu.pc = self.cpu.pc.wrapping_add(2),
            protocol::ACK_ENABLE | protocol::ACK_DISABLE => {}
            protocol::READ_BYTE | protocol::READ_BD_BYTE => {
                let value = self.read_mem_byte(addr(frame));
                response.push(value);
            }
            protocol::READ_WORD | protocol::READ_BD_WORD => {
                let value = self.read_mem_word(addr(frame));
                response.extend_from_slice(&value.to_be_bytes());
            }
            protocol::WRITE_BYTE | protocol::WRITE_BD_BYTE => {
                self.write_mem_byte(addr(frame), frame[3]);
            }
            protocol::WRITE_WORD | protocol::WRITE_BD_WORD => {
                self.write_mem_word(addr(frame), u16::from_be_bytes([frame[3], frame[4]]));
            }
            protocol::READ_NEXT => {
                self.cpu.x = self.cpu.x.wrapping_add(2);
                let value = self.read_mem_word(self.cpu.x);
                response.extend_from_slice(&value.to_be_bytes());
            }
            protocol::WRITE_NEXT => {
                self.cpu.x = self.cpu.x.wrapping_add(2);
                let data = u16::from_be_bytes([frame[1], frame[2]]);
                self.write_mem_word(self.cpu.x, data);
            }
            protocol::READ_PC
            | protocol::READ_D
            | protocol::READ_X
            | protocol::READ_Y
            | protocol::READ_SP => {
                let value = *self.cpu_reg(opcode);
                response.extend_from_slice(&value.to_be_bytes());
            }
            protocol::WRITE_PC
            | protocol::WRITE_D
            | protocol::WRITE_X
            | protocol::WRITE_Y
            | protocol::WRITE_SP => {
                let data = u16::from_be_bytes([frame[1], frame[2]]);
                *self.cpu_reg(opcode) = data;
            }
            protocol::READ_AREA => {
                // Raw bytes, no complement echo.
                let base = addr(frame);
                let len = frame[3] as usize;
                response.clear();
                for offset in 0..len {
                    response.push(self.read_mem_byte(base.wrapping_add(offset as u16)));
                }
            }
            protocol::WRITE_AREA => {
                let base = addr(frame);
                for (offset, &byte) in frame[4..].iter().enumerate() {
                    self.write_mem_byte(base.wrapping_add(offset as u16), byte);
                }
            }
            other => {
                log::warn!("dummy pod: unknown opcode 0x{:02X}", other);
                response.clear();
            }
        }

        match self.fault.take() {
            Some(Fault::DropResponse) => response.clear(),
            Some(Fault::CorruptEcho) => {
                if let Some(first) = response.first_mut() {
                    *first ^= 0xA5;
                }
            }
            Some(Fault::TruncateResponse) => {
                response.pop();
            }
            None => {}
        }
        self.tx.extend_from_slice(&response);
    }
}

impl Transport for DummyPod {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.counters.writes += 1;
        self.rx.extend_from_slice(data);
        self.pump();
        Ok(())
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        self.counters.reads += 1;
        let take = len.min(self.tx.len());
        Ok(self.tx.drain(..take).collect())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
