//! S12 on-chip peripheral modules
//!
//! Each submodule maps one peripheral's register block by name and address
//! and wraps its operations. The flash and EEPROM controllers share the NVM
//! command sequencer in [`nvm`].

pub mod bdm;
pub mod bkp;
pub mod dbg;
pub mod eeprom;
pub mod flash;
pub mod mebi;
pub mod mmc;
pub mod nvm;

#[cfg(test)]
pub(crate) mod testutil;
