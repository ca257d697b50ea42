//! ComPOD12 device implementation

use rbdm_core::error::{Error, ResponseFault, Result};
use rbdm_core::pod::{CpuRegister, Pod};
use rbdm_core::protocol::{self, complement, Command};
use rbdm_core::transport::{SerialTransport, TcpTransport, Transport};

/// Default baud rate of the pod firmware.
pub const DEFAULT_BAUD: u32 = 19200;

/// WRITE_AREA takes a one-byte count.
const MAX_WRITE_PAYLOAD: usize = 0xFF;
/// READ_AREA is limited by the pod's internal buffer.
const MAX_READ_PAYLOAD: usize = 16;

/// An Elektronik-Laden ComPOD12 BDM pod.
pub struct ComPod12<T: Transport> {
    transport: T,
}

impl ComPod12<SerialTransport> {
    /// Open a pod on a serial port.
    pub fn open_serial(device: &str, baud: u32) -> Result<Self> {
        Ok(Self::new(SerialTransport::open(device, baud)?))
    }
}

impl ComPod12<TcpTransport> {
    /// Open a pod behind a serial-to-TCP bridge.
    pub fn open_tcp(host: &str, port: u16) -> Result<Self> {
        Ok(Self::new(TcpTransport::connect(host, port)?))
    }
}

impl<T: Transport> ComPod12<T> {
    /// Wrap an already-open transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
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
}

impl<T: Transport> Pod for ComPod12<T> {
    fn device_name(&self) -> &'static str {
        "Elektronik-Laden ComPOD12"
    }

    fn pod_version(&mut self) -> Result<String> {
        let data = self.transact(&Command::query(protocol::VERSION, 2))?;
        Ok(format!(
            "{} v{:02}.{:02}",
            self.device_name(),
            data[0],
            data[1]
        ))
    }

    fn reset(&mut self) -> Result<()> {
        log::debug!("RESET");
        self.control(protocol::RESET)
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
        log::trace!("READ_BYTE[0x{:04X}]", addr);
        let payload = self.transact(&Command::read_mem_byte(protocol::READ_BYTE, addr))?;
        Ok(payload[0])
    }

    fn read_word(&mut self, addr: u16) -> Result<u16> {
        log::trace!("READ_WORD[0x{:04X}]", addr);
        self.transact_word(&Command::read_mem_word(protocol::READ_WORD, addr))
    }

    fn read_bd_byte(&mut self, addr: u16) -> Result<u8> {
        log::trace!("READ_BD_BYTE[0x{:04X}]", addr);
        let payload = self.transact(&Command::read_mem_byte(protocol::READ_BD_BYTE, addr))?;
        Ok(payload[0])
    }

    fn read_bd_word(&mut self, addr: u16) -> Result<u16> {
        log::trace!("READ_BD_WORD[0x{:04X}]", addr);
        self.transact_word(&Command::read_mem_word(protocol::READ_BD_WORD, addr))
    }

    fn write_byte(&mut self, addr: u16, data: u8) -> Result<()> {
        log::trace!("WRITE_BYTE[0x{:04X}]=0x{:02X}", addr, data);
        self.transact(&Command::write_mem_byte(protocol::WRITE_BYTE, addr, data))
            .map(|_| ())
    }

    fn write_word(&mut self, addr: u16, data: u16) -> Result<()> {
        log::trace!("WRITE_WORD[0x{:04X}]=0x{:04X}", addr, data);
        self.transact(&Command::write_mem_word(protocol::WRITE_WORD, addr, data))
            .map(|_| ())
    }

    fn write_bd_byte(&mut self, addr: u16, data: u8) -> Result<()> {
        log::trace!("WRITE_BD_BYTE[0x{:04X}]=0x{:02X}", addr, data);
        self.transact(&Command::write_mem_byte(
            protocol::WRITE_BD_BYTE,
            addr,
            data,
        ))
        .map(|_| ())
    }

    fn write_bd_word(&mut self, addr: u16, data: u16) -> Result<()> {
        log::trace!("WRITE_BD_WORD[0x{:04X}]=0x{:04X}", addr, data);
        self.transact(&Command::write_mem_word(
            protocol::WRITE_BD_WORD,
            addr,
            data,
        ))
        .map(|_| ())
    }

    fn read_next(&mut self) -> Result<u16> {
        log::trace!("READ_NEXT");
        self.transact_word(&Command::read_reg(protocol::READ_NEXT))
    }

    fn write_next(&mut self, data: u16) -> Result<()> {
        log::trace!("WRITE_NEXT[0x{:04X}]", data);
        self.transact(&Command::write_reg(protocol::WRITE_NEXT, data))
            .map(|_| ())
    }

    fn read_cpu_register(&mut self, reg: CpuRegister) -> Result<u16> {
        log::trace!("READ_{}", reg.name());
        self.transact_word(&Command::read_reg(reg.read_opcode()))
    }

    fn write_cpu_register(&mut self, reg: CpuRegister, data: u16) -> Result<()> {
        log::trace!("WRITE_{}[0x{:04X}]", reg.name(), data);
        self.transact(&Command::write_reg(reg.write_opcode(), data))
            .map(|_| ())
    }

    fn max_read_payload(&self) -> usize {
        MAX_READ_PAYLOAD
    }

    fn max_write_payload(&self) -> usize {
        MAX_WRITE_PAYLOAD
    }

    /// READ_AREA answers with the raw bytes, no complement echo.
    fn read_area_chunk(&mut self, addr: u16, len: usize) -> Result<Vec<u8>> {
        debug_assert!(len > 0 && len <= MAX_READ_PAYLOAD);
        log::trace!("READ_AREA[0x{:04X}], {} bytes", addr, len);

        let mut frame = Vec::with_capacity(4);
        frame.push(protocol::READ_AREA);
        frame.extend_from_slice(&addr.to_be_bytes());
        frame.push(len as u8);
        self.transport.write(&frame)?;

        let data = self.transport.read(len)?;
        self.transport.flush()?;
        if data.is_empty() {
            return Err(Error::NoResponse {
                opcode: protocol::READ_AREA,
            });
        }
        if data.len() != len {
            return Err(Error::InvalidResponse {
                opcode: protocol::READ_AREA,
                fault: ResponseFault::WrongLength {
                    expected: len,
                    actual: data.len(),
                },
            });
        }
        Ok(data)
    }

    fn write_area_chunk(&mut self, addr: u16, data: &[u8]) -> Result<()> {
        debug_assert!(!data.is_empty() && data.len() <= MAX_WRITE_PAYLOAD);
        log::trace!("WRITE_AREA[0x{:04X}], {} bytes", addr, data.len());

        let mut frame = Vec::with_capacity(4 + data.len());
        frame.push(protocol::WRITE_AREA);
        frame.extend_from_slice(&addr.to_be_bytes());
        frame.push(data.len() as u8);
        frame.extend_from_slice(data);
        self.transport.write(&frame)?;

        let echo = self.transport.read(1)?;
        self.transport.flush()?;
        if echo.is_empty() {
            return Err(Error::NoResponse {
                opcode: protocol::WRITE_AREA,
            });
        }
        if echo[0] != complement(protocol::WRITE_AREA) {
            return Err(Error::InvalidResponse {
                opcode: protocol::WRITE_AREA,
                fault: ResponseFault::BadEcho { echo: echo[0] },
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbdm_core::target::Target;

    /// Scripted transport: canned responses plus a record of frames.
    struct MockTransport {
        written: Vec<Vec<u8>>,
        responses: Vec<Vec<u8>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Vec<u8>>) -> Self {
            Self {
                written: Vec::new(),
                responses,
            }
        }
    }

    impl Transport for MockTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.written.push(data.to_vec());
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
    }

    #[test]
    fn version_formats_major_minor() {
        let mut pod = ComPod12::new(MockTransport::new(vec![vec![
            complement(protocol::VERSION),
            4,
            7,
        ]]));
        assert_eq!(
            pod.pod_version().unwrap(),
            "Elektronik-Laden ComPOD12 v04.07"
        );
        assert_eq!(pod.transport.written, vec![vec![protocol::VERSION]]);
    }

    #[test]
    fn read_area_frame_and_raw_response() {
        let mut pod = ComPod12::new(MockTransport::new(vec![vec![1, 2, 3, 4]]));
        let data = pod.read_area_chunk(0x0800, 4).unwrap();
        assert_eq!(data, vec![1, 2, 3, 4]);
        assert_eq!(
            pod.transport.written,
            vec![vec![protocol::READ_AREA, 0x08, 0x00, 4]]
        );
    }

    #[test]
    fn short_read_area_response_is_invalid() {
        let mut pod = ComPod12::new(MockTransport::new(vec![vec![1, 2]]));
        assert!(matches!(
            pod.read_area_chunk(0x0800, 4).unwrap_err(),
            Error::InvalidResponse {
                opcode: protocol::READ_AREA,
                fault: ResponseFault::WrongLength {
                    expected: 4,
                    actual: 2
                },
            }
        ));
    }

    #[test]
    fn write_area_is_echo_validated() {
        let mut pod = ComPod12::new(MockTransport::new(vec![vec![complement(
            protocol::WRITE_AREA,
        )]]));
        pod.write_area_chunk(0x2000, &[0xAA, 0xBB]).unwrap();
        assert_eq!(
            pod.transport.written,
            vec![vec![protocol::WRITE_AREA, 0x20, 0x00, 2, 0xAA, 0xBB]]
        );

        let mut pod = ComPod12::new(MockTransport::new(vec![vec![0x00]]));
        assert!(matches!(
            pod.write_area_chunk(0x2000, &[0xAA]).unwrap_err(),
            Error::InvalidResponse {
                opcode: protocol::WRITE_AREA,
                fault: ResponseFault::BadEcho { echo: 0x00 },
            }
        ));
    }

    #[test]
    fn missing_reset_echo_is_no_response() {
        let mut pod = ComPod12::new(MockTransport::new(vec![]));
        assert!(matches!(
            pod.reset().unwrap_err(),
            Error::NoResponse {
                opcode: protocol::RESET
            }
        ));
    }

    /// Session scenario: reset, halt, then fetch the reset vector.
    #[test]
    fn reset_halt_read_vector() {
        let transport = MockTransport::new(vec![
            vec![complement(protocol::RESET)],
            vec![complement(protocol::BACKGROUND)],
            vec![complement(protocol::READ_WORD), 0x47, 0x12],
        ]);
        let mut target = Target::new(Box::new(ComPod12::new(transport)));
        target.reset().unwrap();
        target.halt().unwrap();
        assert_eq!(target.read_word(0xFFFE).unwrap(), 0x4712);
    }
}
