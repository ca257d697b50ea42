//! rbdm-compod12 - Elektronik-Laden ComPOD12 pod support
//!
//! The ComPOD12 forwards the standard BDM command set over a plain serial
//! link and adds a handful of vendor commands: target reset, a firmware
//! version query and block transfers (READ_AREA/WRITE_AREA).
//!
//! # Supported transports
//!
//! - Serial port: `/dev/ttyUSB0`, `COM1`, ... at 19200 baud
//! - TCP socket, for pods behind a serial-to-TCP bridge
//!
//! # Example
//!
//! ```no_run
//! use rbdm_compod12::ComPod12;
//! use rbdm_core::target::Target;
//!
//! let pod = ComPod12::open_serial("/dev/ttyUSB0", 19200)?;
//! let mut target = Target::new(Box::new(pod));
//! target.reset()?;
//! target.halt()?;
//! println!("reset vector: 0x{:04X}", target.read_word(0xFFFE)?);
//! # Ok::<(), rbdm_core::Error>(())
//! ```

pub mod device;

pub use device::ComPod12;
