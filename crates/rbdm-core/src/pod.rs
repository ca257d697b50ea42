//! The pod interface
//!
//! A pod is the hardware adapter translating host serial bytes into BDM
//! signaling. Every vendor backend implements [`Pod`]; the
//! [`Target`](crate::target::Target) facade drives it and is the only place
//! that knows about peripheral semantics.
//!
//! The trait is object-safe so a session can own `Box<dyn Pod>`.

use crate::error::Result;

/// CPU registers reachable through fixed-purpose BDM firmware opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuRegister {
    /// Program counter.
    Pc,
    /// D accumulator.
    D,
    /// X index register.
    X,
    /// Y index register.
    Y,
    /// Stack pointer.
    Sp,
}

impl CpuRegister {
    /// All registers, in conventional dump order.
    pub const ALL: [CpuRegister; 5] = [Self::Pc, Self::D, Self::X, Self::Y, Self::Sp];

    /// The BDM firmware opcode reading this register.
    pub const fn read_opcode(self) -> u8 {
        match self {
            Self::Pc => crate::protocol::READ_PC,
            Self::D => crate::protocol::READ_D,
            Self::X => crate::protocol::READ_X,
            Self::Y => crate::protocol::READ_Y,
            Self::Sp => crate::protocol::READ_SP,
        }
    }

    /// The BDM firmware opcode writing this register.
    pub const fn write_opcode(self) -> u8 {
        match self {
            Self::Pc => crate::protocol::WRITE_PC,
            Self::D => crate::protocol::WRITE_D,
            Self::X => crate::protocol::WRITE_X,
            Self::Y => crate::protocol::WRITE_Y,
            Self::Sp => crate::protocol::WRITE_SP,
        }
    }

    /// Register mnemonic, for logs and register dumps.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pc => "PC",
            Self::D => "D",
            Self::X => "X",
            Self::Y => "Y",
            Self::Sp => "SP",
        }
    }
}

/// One BDM pod, strictly single-master with a single outstanding command.
pub trait Pod {
    /// Human-readable device name of this pod.
    fn device_name(&self) -> &'static str;

    /// Query the pod firmware version string.
    fn pod_version(&mut self) -> Result<String>;

    /// Reset the target. Does not wait for target readiness; callers must
    /// halt before further access.
    fn reset(&mut self) -> Result<()>;

    /// Enter background mode (halt).
    fn background(&mut self) -> Result<()>;

    /// Go to user program.
    fn go(&mut self) -> Result<()>;

    /// Go to user program; ACK on return to background mode.
    fn go_until(&mut self) -> Result<()>;

    /// Enable tagging and go to user program.
    fn tag_go(&mut self) -> Result<()>;

    /// Execute one user instruction then return to background mode.
    fn trace1(&mut self) -> Result<()>;

    /// Read a byte with BDM out of map.
    fn read_byte(&mut self, addr: u16) -> Result<u8>;

    /// Read a word with BDM out of map.
    fn read_word(&mut self, addr: u16) -> Result<u16>;

    /// Read a byte with BDM in map.
    fn read_bd_byte(&mut self, addr: u16) -> Result<u8>;

    /// Read a word with BDM in map.
    fn read_bd_word(&mut self, addr: u16) -> Result<u16>;

    /// Write a byte with BDM out of map.
    fn write_byte(&mut self, addr: u16, data: u8) -> Result<()>;

    /// Write a word with BDM out of map.
    fn write_word(&mut self, addr: u16, data: u16) -> Result<()>;

    /// Write a byte with BDM in map.
    fn write_bd_byte(&mut self, addr: u16, data: u8) -> Result<()>;

    /// Write a word with BDM in map.
    fn write_bd_word(&mut self, addr: u16, data: u16) -> Result<()>;

    /// X = X + 2; read the next word pointed to by X.
    fn read_next(&mut self) -> Result<u16>;

    /// X = X + 2; write the next word pointed to by X.
    fn write_next(&mut self, data: u16) -> Result<()>;

    /// Read a CPU register.
    fn read_cpu_register(&mut self, reg: CpuRegister) -> Result<u16>;

    /// Write a CPU register.
    fn write_cpu_register(&mut self, reg: CpuRegister, data: u16) -> Result<()>;

    /// Largest chunk `read_area_chunk` accepts.
    fn max_read_payload(&self) -> usize;

    /// Largest chunk `write_area_chunk` accepts.
    fn max_write_payload(&self) -> usize;

    /// Read one pod-limited chunk. `len` must not exceed
    /// [`max_read_payload`](Self::max_read_payload) and must be nonzero.
    fn read_area_chunk(&mut self, addr: u16, len: usize) -> Result<Vec<u8>>;

    /// Write one pod-limited chunk. `data.len()` must not exceed
    /// [`max_write_payload`](Self::max_write_payload) and must be nonzero.
    fn write_area_chunk(&mut self, addr: u16, data: &[u8]) -> Result<()>;
}
