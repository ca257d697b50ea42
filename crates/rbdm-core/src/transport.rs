//! Transport layer abstraction for pod communication
//!
//! A transport is a raw byte channel to the debug pod. It knows nothing about
//! the BDM command set; framing and validation live in [`crate::protocol`].

use crate::error::{Error, Result};

/// Byte channel to a debug pod.
pub trait Transport {
    /// Write bytes to the transport.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `len` bytes.
    ///
    /// Returns fewer bytes (possibly none) once the transport's timeout
    /// expires. Never blocks indefinitely.
    fn read(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<()>;

    /// Raise or drop the RTS line, where the transport has one.
    fn set_rts(&mut self, _level: bool) -> Result<()> {
        Err(Error::Communication(
            "transport has no modem control lines".into(),
        ))
    }

    /// Sample the CTS line, where the transport has one.
    fn read_cts(&mut self) -> Result<bool> {
        Err(Error::Communication(
            "transport has no modem control lines".into(),
        ))
    }
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{Read, Write};
    use std::time::Duration;

    /// Default read timeout. BDM pods answer within a few character times;
    /// a tenth of a second marks the target as unresponsive.
    const READ_TIMEOUT: Duration = Duration::from_millis(100);

    /// Serial port transport (8N1, no flow control).
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        /// Open a serial port with the specified baud rate.
        pub fn open(device: &str, baud: u32) -> Result<Self> {
            let port = serialport::new(device, baud)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(READ_TIMEOUT)
                .open()?;

            log::info!("Opened serial port {} at {} baud", device, baud);

            Ok(Self { port })
        }

        /// Set the read timeout.
        pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
            self.port.set_timeout(timeout)?;
            Ok(())
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            Ok(())
        }

        fn read(&mut self, len: usize) -> Result<Vec<u8>> {
            let mut buf = vec![0u8; len];
            let mut filled = 0;
            while filled < len {
                match self.port.read(&mut buf[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                    Err(e) => return Err(Error::Io(e)),
                }
            }
            buf.truncate(filled);
            Ok(buf)
        }

        fn flush(&mut self) -> Result<()> {
            self.port.flush()?;
            Ok(())
        }

        fn set_rts(&mut self, level: bool) -> Result<()> {
            self.port.write_request_to_send(level)?;
            Ok(())
        }

        fn read_cts(&mut self) -> Result<bool> {
            Ok(self.port.read_clear_to_send()?)
        }
    }
}

pub mod tcp {
    //! TCP socket transport implementation, for pods behind a serial-to-TCP
    //! bridge.

    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    /// TCP socket transport.
    pub struct TcpTransport {
        stream: TcpStream,
    }

    impl TcpTransport {
        /// Connect to a pod bridge at the specified host and port.
        pub fn connect(host: &str, port: u16) -> Result<Self> {
            let addr = format!("{}:{}", host, port);
            log::info!("Connecting to pod bridge at {}", addr);

            let stream = TcpStream::connect(&addr)
                .map_err(|e| Error::Communication(format!("connect to {}: {}", addr, e)))?;

            // Commands are a handful of bytes each; latency dominates.
            stream
                .set_nodelay(true)
                .map_err(|e| Error::Communication(format!("TCP_NODELAY: {}", e)))?;
            stream
                .set_read_timeout(Some(Duration::from_millis(500)))
                .map_err(|e| Error::Communication(format!("read timeout: {}", e)))?;

            Ok(Self { stream })
        }
    }

    impl Transport for TcpTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.stream.write_all(data)?;
            Ok(())
        }

        fn read(&mut self, len: usize) -> Result<Vec<u8>> {
            let mut buf = vec![0u8; len];
            let mut filled = 0;
            while filled < len {
                match self.stream.read(&mut buf[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e)
                        if e.kind() == std::io::ErrorKind::TimedOut
                            || e.kind() == std::io::ErrorKind::WouldBlock =>
                    {
                        break
                    }
                    Err(e) => return Err(Error::Io(e)),
                }
            }
            buf.truncate(filled);
            Ok(buf)
        }

        fn flush(&mut self) -> Result<()> {
            self.stream.flush()?;
            Ok(())
        }
    }
}

pub use serial::SerialTransport;
pub use tcp::TcpTransport;
