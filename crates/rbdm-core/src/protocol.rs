//! BDM command codec
//!
//! Opcode constants and the byte-exact request/response framing shared by all
//! pods that forward the standard HC12/S12 BDM command set.
//!
//! Every command is one write followed by one read. A response begins with
//! the bitwise complement of the opcode that was sent; payload bytes, if any,
//! follow the echo. All multi-byte values are big-endian.

use crate::error::{Error, ResponseFault, Result};
use crate::transport::Transport;

// BDM hardware commands (executed by the BDM logic, target may keep running).

/// Enter background mode if firmware enabled.
pub const BACKGROUND: u8 = 0x90;
/// Enable the ACK handshake pulse.
pub const ACK_ENABLE: u8 = 0xD5;
/// Disable the ACK handshake pulse.
pub const ACK_DISABLE: u8 = 0xD6;
/// Read from memory with BDM in map.
pub const READ_BD_BYTE: u8 = 0xE4;
/// Read from memory with BDM in map.
pub const READ_BD_WORD: u8 = 0xEC;
/// Read from memory with BDM out of map.
pub const READ_BYTE: u8 = 0xE0;
/// Read from memory with BDM out of map.
pub const READ_WORD: u8 = 0xE8;
/// Write to memory with BDM in map.
pub const WRITE_BD_BYTE: u8 = 0xC4;
/// Write to memory with BDM in map.
pub const WRITE_BD_WORD: u8 = 0xCC;
/// Write to memory with BDM out of map.
pub const WRITE_BYTE: u8 = 0xC0;
/// Write to memory with BDM out of map.
pub const WRITE_WORD: u8 = 0xC8;

// BDM firmware commands (target must be halted in background mode).

/// X = X + 2; read next word pointed to by X.
pub const READ_NEXT: u8 = 0x62;
/// Read program counter.
pub const READ_PC: u8 = 0x63;
/// Read D accumulator.
pub const READ_D: u8 = 0x64;
/// Read X index register.
pub const READ_X: u8 = 0x65;
/// Read Y index register.
pub const READ_Y: u8 = 0x66;
/// Read stack pointer.
pub const READ_SP: u8 = 0x67;
/// X = X + 2; write next word pointed to by X.
pub const WRITE_NEXT: u8 = 0x42;
/// Write program counter.
pub const WRITE_PC: u8 = 0x43;
/// Write D accumulator.
pub const WRITE_D: u8 = 0x44;
/// Write X index register.
pub const WRITE_X: u8 = 0x45;
/// Write Y index register.
pub const WRITE_Y: u8 = 0x46;
/// Write stack pointer.
pub const WRITE_SP: u8 = 0x47;
/// Go to user program.
pub const GO: u8 = 0x08;
/// Go to user program, ACK on return to background mode.
pub const GO_UNTIL: u8 = 0x0C;
/// Execute one user instruction then return to background mode.
pub const TRACE1: u8 = 0x10;
/// Enable tagging and go to user program.
pub const TAGGO: u8 = 0x18;

// Pod vendor extensions (ComPOD12 firmware).

/// Reset the target.
pub const RESET: u8 = 0x80;
/// WRITE_AREA ADDR_HI ADDR_LO CNT DATA...
pub const WRITE_AREA: u8 = 0x82;
/// READ_AREA ADDR_HI ADDR_LO CNT
pub const READ_AREA: u8 = 0x83;
/// Query pod firmware version.
pub const VERSION: u8 = 0xFF;

/// The complement-echo a pod must answer for `opcode`.
pub const fn complement(opcode: u8) -> u8 {
    !opcode
}

/// Optional data operand of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// No data operand.
    None,
    /// 8-bit operand.
    Byte(u8),
    /// 16-bit operand, transmitted high byte first.
    Word(u16),
}

/// An immutable command descriptor: opcode, optional 16-bit address, optional
/// data operand and the exact payload length the pod must answer with.
///
/// Commands are stateless value objects; the codec does not retain them after
/// issuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    opcode: u8,
    addr: Option<u16>,
    operand: Operand,
    payload_len: usize,
}

impl Command {
    /// A bare command answered by the echo byte only (GO, TRACE1, ...).
    pub const fn control(opcode: u8) -> Self {
        Self {
            opcode,
            addr: None,
            operand: Operand::None,
            payload_len: 0,
        }
    }

    /// A bare command answered by the echo plus `payload_len` payload bytes.
    pub const fn query(opcode: u8, payload_len: usize) -> Self {
        Self {
            opcode,
            addr: None,
            operand: Operand::None,
            payload_len,
        }
    }

    /// Address-qualified byte read.
    pub const fn read_mem_byte(opcode: u8, addr: u16) -> Self {
        Self {
            opcode,
            addr: Some(addr),
            operand: Operand::None,
            payload_len: 1,
        }
    }

    /// Address-qualified word read.
    pub const fn read_mem_word(opcode: u8, addr: u16) -> Self {
        Self {
            opcode,
            addr: Some(addr),
            operand: Operand::None,
            payload_len: 2,
        }
    }

    /// Address-qualified byte write, echo-only response.
    pub const fn write_mem_byte(opcode: u8, addr: u16, data: u8) -> Self {
        Self {
            opcode,
            addr: Some(addr),
            operand: Operand::Byte(data),
            payload_len: 0,
        }
    }

    /// Address-qualified word write, echo-only response.
    pub const fn write_mem_word(opcode: u8, addr: u16, data: u16) -> Self {
        Self {
            opcode,
            addr: Some(addr),
            operand: Operand::Word(data),
            payload_len: 0,
        }
    }

    /// CPU register read (no address on the wire).
    pub const fn read_reg(opcode: u8) -> Self {
        Self {
            opcode,
            addr: None,
            operand: Operand::None,
            payload_len: 2,
        }
    }

    /// CPU register write (no address on the wire), echo-only response.
    pub const fn write_reg(opcode: u8, data: u16) -> Self {
        Self {
            opcode,
            addr: None,
            operand: Operand::Word(data),
            payload_len: 0,
        }
    }

    /// The opcode byte.
    pub const fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Total response length in bytes, complement echo included.
    pub const fn response_len(&self) -> usize {
        1 + self.payload_len
    }

    /// Append the exact wire frame `[opcode, addrHi?, addrLo?, data...?]`.
    pub fn encode_into(&self, frame: &mut Vec<u8>) {
        frame.push(self.opcode);
        if let Some(addr) = self.addr {
            frame.extend_from_slice(&addr.to_be_bytes());
        }
        match self.operand {
            Operand::None => {}
            Operand::Byte(b) => frame.push(b),
            Operand::Word(w) => frame.extend_from_slice(&w.to_be_bytes()),
        }
    }
}

/// Issue one command: exactly one transport write and one transport read.
///
/// Validation, in order: an empty response is [`Error::NoResponse`]; a
/// response of the wrong length, or one whose first byte is not the
/// complement of the opcode, is [`Error::InvalidResponse`]. On success the
/// payload (bytes after the echo) is returned.
pub fn transact<T: Transport + ?Sized>(transport: &mut T, cmd: &Command) -> Result<Vec<u8>> {
    let mut frame = Vec::with_capacity(5);
    cmd.encode_into(&mut frame);
    transport.write(&frame)?;

    let response = transport.read(cmd.response_len())?;
    if response.is_empty() {
        return Err(Error::NoResponse {
            opcode: cmd.opcode(),
        });
    }
    if response.len() != cmd.response_len() {
        return Err(Error::InvalidResponse {
            opcode: cmd.opcode(),
            fault: ResponseFault::WrongLength {
                expected: cmd.response_len(),
                actual: response.len(),
            },
        });
    }
    if response[0] != complement(cmd.opcode()) {
        return Err(Error::InvalidResponse {
            opcode: cmd.opcode(),
            fault: ResponseFault::BadEcho { echo: response[0] },
        });
    }
    Ok(response[1..].to_vec())
}

/// [`transact`] for commands whose payload is a single big-endian word.
pub fn transact_word<T: Transport + ?Sized>(transport: &mut T, cmd: &Command) -> Result<u16> {
    let payload = transact(transport, cmd)?;
    debug_assert_eq!(payload.len(), 2);
    Ok(u16::from_be_bytes([payload[0], payload[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted transport: canned responses plus call counters.
    pub(crate) struct MockTransport {
        pub written: Vec<Vec<u8>>,
        pub responses: Vec<Vec<u8>>,
        pub reads: usize,
    }

    impl MockTransport {
        pub fn new(responses: Vec<Vec<u8>>) -> Self {
            Self {
                written: Vec::new(),
                responses,
                reads: 0,
            }
        }
    }

    impl Transport for MockTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.written.push(data.to_vec());
            Ok(())
        }

        fn read(&mut self, len: usize) -> Result<Vec<u8>> {
            self.reads += 1;
            let mut r = if self.responses.is_empty() {
                Vec::new()
            } else {
                self.responses.remove(0)
            };
            r.truncate(len);
            Ok(r)
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn encodes_word_read_big_endian() {
        let mut frame = Vec::new();
        Command::read_mem_word(READ_WORD, 0xFFFE).encode_into(&mut frame);
        assert_eq!(frame, vec![0xE8, 0xFF, 0xFE]);
    }

    #[test]
    fn encodes_word_write_big_endian() {
        let mut frame = Vec::new();
        Command::write_mem_word(WRITE_WORD, 0x1234, 0xAFFE).encode_into(&mut frame);
        assert_eq!(frame, vec![0xC8, 0x12, 0x34, 0xAF, 0xFE]);
    }

    #[test]
    fn encodes_register_write_without_address() {
        let mut frame = Vec::new();
        Command::write_reg(WRITE_PC, 0x4B09).encode_into(&mut frame);
        assert_eq!(frame, vec![0x43, 0x4B, 0x09]);
    }

    #[test]
    fn word_read_round_trip() {
        let mut t = MockTransport::new(vec![vec![complement(READ_WORD), 0x47, 0x12]]);
        let value = transact_word(&mut t, &Command::read_mem_word(READ_WORD, 0xFFFE)).unwrap();
        assert_eq!(value, 0x4712);
        assert_eq!(t.written, vec![vec![0xE8, 0xFF, 0xFE]]);
        assert_eq!(t.reads, 1);
    }

    #[test]
    fn empty_response_is_no_response() {
        let mut t = MockTransport::new(vec![]);
        let err = transact(&mut t, &Command::control(GO)).unwrap_err();
        assert!(matches!(err, Error::NoResponse { opcode: GO }));
    }

    #[test]
    fn short_response_is_invalid() {
        let mut t = MockTransport::new(vec![vec![complement(READ_WORD), 0x47]]);
        let err = transact(&mut t, &Command::read_mem_word(READ_WORD, 0x1000)).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidResponse {
                opcode: READ_WORD,
                fault: ResponseFault::WrongLength {
                    expected: 3,
                    actual: 2
                },
            }
        ));
    }

    /// Mutation property: flipping any first response byte away from the
    /// complement must always yield InvalidResponse.
    #[test]
    fn corrupted_echo_is_invalid() {
        for flip in 1..=0xFFu8 {
            let echo = complement(TRACE1) ^ flip;
            let mut t = MockTransport::new(vec![vec![echo]]);
            let err = transact(&mut t, &Command::control(TRACE1)).unwrap_err();
            assert!(matches!(
                err,
                Error::InvalidResponse {
                    opcode: TRACE1,
                    fault: ResponseFault::BadEcho { .. },
                }
            ));
        }
    }

    #[test]
    fn echo_only_commands_return_empty_payload() {
        let mut t = MockTransport::new(vec![vec![complement(BACKGROUND)]]);
        let payload = transact(&mut t, &Command::control(BACKGROUND)).unwrap();
        assert!(payload.is_empty());
    }
}
