//! rbdm-core - Core library for the HC12/S12 Background Debug Mode host driver
//!
//! This crate provides the protocol and device-control stack for talking to a
//! Motorola/Freescale HC12/S12 target through a serial-line BDM pod:
//!
//! - [`protocol`] - the binary command codec (opcodes, big-endian framing,
//!   complement-echo validation)
//! - [`transport`] - the raw byte channel abstraction (serial, TCP)
//! - [`pod`] - the pod interface implemented by vendor backends
//! - [`target`] - the device facade: run control, memory and CPU register
//!   access, bulk area transfers
//! - [`module`] - named peripheral register access with bit-masking helpers
//! - [`s12`] - the S12 on-chip peripheral modules, including the flash and
//!   EEPROM command sequencers
//! - [`probe`] - part identification and legacy-HC12 autoprobing
//!
//! # Example
//!
//! ```ignore
//! use rbdm_core::target::Target;
//!
//! fn dump_vectors(target: &mut Target) -> rbdm_core::Result<()> {
//!     target.reset()?;
//!     target.halt()?;
//!     println!("reset vector: 0x{:04X}", target.vector(rbdm_core::target::Vector::Reset)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod module;
pub mod partids;
pub mod pod;
pub mod probe;
pub mod protocol;
pub mod s12;
pub mod target;
pub mod transport;

pub use error::{Error, Result};
