//! rbdm-kevinro - Kevin Ross BDM12 pod support
//!
//! The BDM12 forwards the standard BDM command set over a serial link and
//! paces every transmitted byte with an RTS/CTS handshake. Firmware v4.5 and
//! later adds an extended command set (version query, block memory dump/put)
//! whose availability is detected during the connect handshake.
//!
//! # Example
//!
//! ```no_run
//! use rbdm_kevinro::KevinRoBdm12;
//! use rbdm_core::target::Target;
//!
//! let pod = KevinRoBdm12::open_serial("/dev/ttyUSB0", 9600)?;
//! let mut target = Target::new(Box::new(pod));
//! target.halt()?;
//! # Ok::<(), rbdm_core::Error>(())
//! ```

pub mod device;

pub use device::KevinRoBdm12;
