//! Kevin Ross BDM12 device implementation

use std::thread;
use std::time::{Duration, Instant};

use rbdm_core::error::{Error, ResponseFault, Result};
use rbdm_core::pod::{CpuRegister, Pod};
use rbdm_core::protocol::{self, complement, Command};
use rbdm_core::transport::{SerialTransport, Transport};

// Pod commands.

/// Resynchronize the link.
pub const SYNC: u8 = 0x00;
/// Pulse the target reset line.
pub const RESET_CPU: u8 = 0x01;
/// Hold the target reset line low.
pub const RESET_LOW: u8 = 0x02;
/// Release the target reset line.
pub const RESET_HIGH: u8 = 0x03;
/// Extended command prefix (firmware v4.5 and later).
pub const EXTENDED: u8 = 0x04;

// Extended command codes.

/// Query the firmware version byte.
pub const EXT_VERSION: u8 = 0x00;
/// Dump all CPU registers.
pub const EXT_REGDUMP: u8 = 0x01;
/// Trace until an address is reached.
pub const EXT_TRACETO: u8 = 0x02;
/// Block memory read.
pub const EXT_MEMDUMP: u8 = 0x03;
/// Set a pod parameter.
pub const EXT_SETPARAM: u8 = 0x04;
/// Pod I/O control.
pub const EXT_IOCTL: u8 = 0x05;
/// Block memory write.
pub const EXT_MEMPUT: u8 = 0x06;
/// Switch to the extended communication speed.
pub const EXT_EXTENDEDSPEED: u8 = 0x07;

/// Extended block transfers carry a 16-bit count.
const MAX_PAYLOAD: usize = 0xFFFF;

/// How long to wait for CTS to assert before a byte goes out.
const CTS_ASSERT_TIMEOUT: Duration = Duration::from_millis(100);
/// How long to wait for CTS to clear afterwards, per handshake generation.
const CTS_CLEAR_TIMEOUT_V45: Duration = Duration::from_millis(100);
const CTS_CLEAR_TIMEOUT_V44: Duration = Duration::from_millis(20);

/// Transport wrapper pacing each transmitted byte with the pod's CTS
/// handshake. Reads pass through untouched.
struct Gated<T: Transport> {
    inner: T,
    /// Full RTS/CTS per-byte control (firmware v4.5+).
    cts_rts_control: bool,
}

impl<T: Transport> Gated<T> {
    fn wait_cts(&mut self, level: bool, timeout: Duration) -> Result<bool> {
        let start = Instant::now();
        loop {
            if self.inner.read_cts()? == level {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
        }
    }
}

impl<T: Transport> Transport for Gated<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        for &byte in data {
            if self.cts_rts_control {
                self.inner.set_rts(true)?;
            }
            if !self.wait_cts(true, CTS_ASSERT_TIMEOUT)? {
                return Err(Error::Communication(
                    "CTS not asserted by the pod; check cable and power".into(),
                ));
            }
            self.inner.write(&[byte])?;
            let clear_timeout = if self.cts_rts_control {
                CTS_CLEAR_TIMEOUT_V45
            } else {
                CTS_CLEAR_TIMEOUT_V44
            };
            self.wait_cts(false, clear_timeout)?;
            if self.cts_rts_control {
                self.inner.set_rts(false)?;
                if self.inner.read_cts()? {
                    log::debug!("CTS not cleared after byte");
                }
            }
        }
        Ok(())
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        self.inner.read(len)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

/// A Kevin Ross BDM12 pod.
pub struct KevinRoBdm12<T: Transport> {
    transport: Gated<T>,
    extended: bool,
}

impl KevinRoBdm12<SerialTransport> {
    /// Open a pod on a serial port and run the connect handshake.
    pub fn open_serial(device: &str, baud: u32) -> Result<Self> {
        Self::connect(SerialTransport::open(device, baud)?)
    }
}

impl<T: Transport> KevinRoBdm12<T> {
    /// Run the RTS/CTS connect handshake on an already-open transport.
    ///
    /// A rising RTS edge must make the pod assert CTS; whether CTS follows
    /// RTS back down distinguishes the v4.5+ handshake (and with it the
    /// extended command set) from older firmware.
    pub fn connect(mut transport: T) -> Result<Self> {
        transport.set_rts(false)?;
        transport.set_rts(true)?;
        thread::sleep(Duration::from_millis(10));
        if !transport.read_cts()? {
            return Err(Error::Communication(
                "nothing attached; check cable and BDM12 power".into(),
            ));
        }
        transport.set_rts(false)?;
        thread::sleep(Duration::from_millis(10));
        let extended = transport.read_cts()?;
        log::info!(
            "BDM12 attached, {} firmware handshake",
            if extended { "v4.5+" } else { "pre-v4.5" }
        );
        Ok(Self {
            transport: Gated {
                inner: transport,
                cts_rts_control: extended,
            },
            extended,
        })
    }

    /// True when the pod firmware supports the extended command set.
    pub fn extended_commands_supported(&self) -> bool {
        self.extended
    }

    fn transact(&mut self, cmd: &Command) -> Result<Vec<u8>> {
        let payload = protocol::transact(&mut self.transport, cmd)?;
        self.transport.flush()?;
        Ok(payload)
    }

    fn control(&mut self, opcode: u8) -> Result<()> {
        self.transact(&Command::control(opcode)).map(|_| ())
    }

    fn transact_word(&mut self, cmd: &Command) -> Result<u16> {
        let word = protocol::transact_word(&mut self.transport, cmd)?;
        self.transport.flush()?;
        Ok(word)
    }

    /// Issue an extended command. The response is the complement echo of the
    /// prefix byte followed by `response_len` payload bytes.
    fn extended_command(
        &mut self,
        code: u8,
        operands: &[u8],
        response_len: usize,
    ) -> Result<Vec<u8>> {
        if !self.extended {
            return Err(Error::Communication(
                "pod firmware predates the extended command set".into(),
            ));
        }
        let mut frame = Vec::with_capacity(2 + operands.len());
        frame.push(EXTENDED);
        frame.push(code);
        frame.extend_from_slice(operands);
        self.transport.write(&frame)?;

        let response = self.transport.read(1 + response_len)?;
        self.transport.flush()?;
        if response.is_empty() {
            return Err(Error::NoResponse { opcode: EXTENDED });
        }
        if response.len() != 1 + response_len {
            return Err(Error::InvalidResponse {
                opcode: EXTENDED,
                fault: ResponseFault::WrongLength {
                    expected: 1 + response_len,
                    actual: response.len(),
                },
            });
        }
        if response[0] != complement(EXTENDED) {
            return Err(Error::InvalidResponse {
                opcode: EXTENDED,
                fault: ResponseFault::BadEcho { echo: response[0] },
            });
        }
        Ok(response[1..].to_vec())
    }
}

impl<T: Transport> Pod for KevinRoBdm12<T> {
    fn device_name(&self) -> &'static str {
        "Kevin Ross BDM12"
    }

    fn pod_version(&mut self) -> Result<String> {
        if self.extended {
            let data = self.extended_command(EXT_VERSION, &[], 1)?;
            Ok(format!(
                "{} v{:02}.{:02}",
                self.device_name(),
                (data[0] >> 4) & 0x07,
                data[0] & 0x0F
            ))
        } else {
            Ok(format!("{} <v4.5", self.device_name()))
        }
    }

    fn reset(&mut self) -> Result<()> {
        log::debug!("RESET_CPU");
        self.control(RESET_CPU)
    }

    fn background(&mut self) -> Result<()> {
        log::debug!("BACKGROUND");
        self.control(protocol::BACKGROUND)
    }

    fn go(&mut self) -> Result<()> {
        log::debug!("GO");
        self.control(protocol::GO)
    }

    fn go_until(&mut self) -> Result<()> {
        log::debug!("GO_UNTIL");
        self.control(protocol::GO_UNTIL)
    }

    fn tag_go(&mut self) -> Result<()> {
        log::debug!("TAGGO");
        self.control(protocol::TAGGO)
    }

    fn trace1(&mut self) -> Result<()> {
        log::debug!("TRACE1");
        self.control(protocol::TRACE1)
    }

    fn read_byte(&mut self, addr: u16) -> Result<u8> {
        let payload = self.transact(&Command::read_mem_byte(protocol::READ_BYTE, addr))?;
        Ok(payload[0])
    }

    fn read_word(&mut self, addr: u16) -> Result<u16> {
        self.transact_word(&Command::read_mem_word(protocol::READ_WORD, addr))
    }

    fn read_bd_byte(&mut self, addr: u16) -> Result<u8> {
        let payload = self.transact(&Command::read_mem_byte(protocol::READ_BD_BYTE, addr))?;
        Ok(payload[0])
    }

    fn read_bd_word(&mut self, addr: u16) -> Result<u16> {
        self.transact_word(&Command::read_mem_word(protocol::READ_BD_WORD, addr))
    }

    fn write_byte(&mut self, addr: u16, data: u8) -> Result<()> {
        self.transact(&Command::write_mem_byte(protocol::WRITE_BYTE, addr, data))
            .map(|_| ())
    }

    fn write_word(&mut self, addr: u16, data: u16) -> Result<()> {
        self.transact(&Command::write_mem_word(protocol::WRITE_WORD, addr, data))
            .map(|_| ())
    }

    fn write_bd_byte(&mut self, addr: u16, data: u8) -> Result<()> {
        self.transact(&Command::write_mem_byte(
            protocol::WRITE_BD_BYTE,
            addr,
            data,
        ))
        .map(|_| ())
    }

    fn write_bd_word(&mut self, addr: u16, data: u16) -> Result<()> {
        self.transact(&Command::write_mem_word(
            protocol::WRITE_BD_WORD,
            addr,
            data,
        ))
        .map(|_| ())
    }

    fn read_next(&mut self) -> Result<u16> {
        self.transact_word(&Command::read_reg(protocol::READ_NEXT))
    }

    fn write_next(&mut self, data: u16) -> Result<()> {
        self.transact(&Command::write_reg(protocol::WRITE_NEXT, data))
            .map(|_| ())
    }

    fn read_cpu_register(&mut self, reg: CpuRegister) -> Result<u16> {
        self.transact_word(&Command::read_reg(reg.read_opcode()))
    }

    fn write_cpu_register(&mut self, reg: CpuRegister, data: u16) -> Result<()> {
        self.transact(&Command::write_reg(reg.write_opcode(), data))
            .map(|_| ())
    }

    fn max_read_payload(&self) -> usize {
        if self.extended {
            MAX_PAYLOAD
        } else {
            // No block commands; the area engine falls back to word-sized
            // chunks through the standard command set.
            2
        }
    }

    fn max_write_payload(&self) -> usize {
        if self.extended {
            MAX_PAYLOAD
        } else {
            2
        }
    }

    fn read_area_chunk(&mut self, addr: u16, len: usize) -> Result<Vec<u8>> {
        debug_assert!(len > 0 && len <= self.max_read_payload());
        if self.extended {
            log::trace!("MEMDUMP[0x{:04X}], {} bytes", addr, len);
            let mut operands = Vec::with_capacity(4);
            operands.extend_from_slice(&addr.to_be_bytes());
            operands.extend_from_slice(&(len as u16).to_be_bytes());
            self.extended_command(EXT_MEMDUMP, &operands, len)
        } else {
            let mut data = Vec::with_capacity(len);
            for offset in 0..len {
                data.push(self.read_byte(addr.wrapping_add(offset as u16))?);
            }
            Ok(data)
        }
    }

    fn write_area_chunk(&mut self, addr: u16, data: &[u8]) -> Result<()> {
        debug_assert!(!data.is_empty() && data.len() <= self.max_write_payload());
        if self.extended {
            log::trace!("MEMPUT[0x{:04X}], {} bytes", addr, data.len());
            let mut operands = Vec::with_capacity(4 + data.len());
            operands.extend_from_slice(&addr.to_be_bytes());
            operands.extend_from_slice(&(data.len() as u16).to_be_bytes());
            operands.extend_from_slice(data);
            self.extended_command(EXT_MEMPUT, &operands, 0).map(|_| ())
        } else {
            for (offset, &byte) in data.iter().enumerate() {
                self.write_byte(addr.wrapping_add(offset as u16), byte)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scripted CTS behavior. A v4.5 pod holds CTS asserted through the
    /// handshake; an older pod drops CTS briefly when RTS falls, which the
    /// connect sequence observes as a single deasserted sample.
    struct HandshakeTransport {
        v45: bool,
        attached: bool,
        cts_drop_pending: bool,
        written: Rc<RefCell<Vec<u8>>>,
        responses: Vec<Vec<u8>>,
    }

    impl HandshakeTransport {
        fn new(v45: bool, attached: bool, responses: Vec<Vec<u8>>) -> Self {
            Self {
                v45,
                attached,
                cts_drop_pending: false,
                written: Rc::new(RefCell::new(Vec::new())),
                responses,
            }
        }
    }

    impl Transport for HandshakeTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.written.borrow_mut().extend_from_slice(data);
            Ok(())
        }

        fn read(&mut self, len: usize) -> Result<Vec<u8>> {
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

        fn set_rts(&mut self, level: bool) -> Result<()> {
            if !self.v45 {
                self.cts_drop_pending = !level;
            }
            Ok(())
        }

        fn read_cts(&mut self) -> Result<bool> {
            if !self.attached {
                return Ok(false);
            }
            if self.cts_drop_pending {
                self.cts_drop_pending = false;
                return Ok(false);
            }
            Ok(true)
        }
    }

    #[test]
    fn connect_detects_the_handshake_generation() {
        let pod = KevinRoBdm12::connect(HandshakeTransport::new(true, true, vec![])).unwrap();
        assert!(pod.extended_commands_supported());

        let pod = KevinRoBdm12::connect(HandshakeTransport::new(false, true, vec![])).unwrap();
        assert!(!pod.extended_commands_supported());
    }

    #[test]
    fn connect_fails_with_nothing_attached() {
        assert!(matches!(
            KevinRoBdm12::connect(HandshakeTransport::new(true, false, vec![])),
            Err(Error::Communication(_))
        ));
    }

    #[test]
    fn version_query_uses_the_extended_command() {
        let transport = HandshakeTransport::new(true, true, vec![vec![complement(EXTENDED), 0x45]]);
        let written = transport.written.clone();
        let mut pod = KevinRoBdm12::connect(transport).unwrap();
        assert_eq!(pod.pod_version().unwrap(), "Kevin Ross BDM12 v04.05");
        assert_eq!(*written.borrow(), vec![EXTENDED, EXT_VERSION]);
    }

    #[test]
    fn old_firmware_reports_a_generic_version() {
        let mut pod =
            KevinRoBdm12::connect(HandshakeTransport::new(false, true, vec![])).unwrap();
        assert_eq!(pod.pod_version().unwrap(), "Kevin Ross BDM12 <v4.5");
    }

    #[test]
    fn memdump_frames_a_16_bit_count() {
        let transport = HandshakeTransport::new(
            true,
            true,
            vec![vec![complement(EXTENDED), 0xDE, 0xAD, 0xBE, 0xEF]],
        );
        let written = transport.written.clone();
        let mut pod = KevinRoBdm12::connect(transport).unwrap();
        let data = pod.read_area_chunk(0x1234, 4).unwrap();
        assert_eq!(data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(
            *written.borrow(),
            vec![EXTENDED, EXT_MEMDUMP, 0x12, 0x34, 0x00, 0x04]
        );
    }

    #[test]
    fn old_firmware_falls_back_to_byte_reads() {
        let transport = HandshakeTransport::new(
            false,
            true,
            vec![
                vec![complement(protocol::READ_BYTE), 0x11],
                vec![complement(protocol::READ_BYTE), 0x22],
            ],
        );
        let written = transport.written.clone();
        let mut pod = KevinRoBdm12::connect(transport).unwrap();
        assert_eq!(pod.max_read_payload(), 2);
        assert_eq!(pod.read_area_chunk(0x0800, 2).unwrap(), vec![0x11, 0x22]);
        assert_eq!(
            *written.borrow(),
            vec![
                protocol::READ_BYTE,
                0x08,
                0x00,
                protocol::READ_BYTE,
                0x08,
                0x01
            ]
        );
    }
}
