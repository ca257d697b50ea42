//! Register module abstraction
//!
//! A module is a named group of 8- or 16-bit peripheral registers, each bound
//! to one fixed target address. Modules are views, not stores: reading or
//! writing a named register issues one in-map byte/word access through the
//! target facade; nothing is cached.
//!
//! Peripheral modules declare their registers as a construction-time table of
//! `(name, address, width)` triples and get generic `reg`/`set_reg` access on
//! top of their typed accessors.

use crate::error::{Error, Result};
use crate::target::Target;

/// Register width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// 8-bit register.
    Byte,
    /// 16-bit register.
    Word,
}

/// One named register binding.
#[derive(Debug, Clone, Copy)]
pub struct RegisterDef {
    /// Symbolic register name, lowercase as in the datasheets.
    pub name: &'static str,
    /// Bound target address.
    pub addr: u16,
    /// Register width.
    pub width: Width,
}

impl RegisterDef {
    /// Shorthand for an 8-bit register entry.
    pub const fn byte(name: &'static str, addr: u16) -> Self {
        Self {
            name,
            addr,
            width: Width::Byte,
        }
    }

    /// Shorthand for a 16-bit register entry.
    pub const fn word(name: &'static str, addr: u16) -> Self {
        Self {
            name,
            addr,
            width: Width::Word,
        }
    }
}

/// A peripheral register module bound to one target facade.
///
/// Writes are whole-register, last-writer-wins; use
/// [`set_bits`](Module::set_bits)/[`clear_bits`](Module::clear_bits) wherever
/// other bits must be preserved. Writes to secured/protected registers are
/// silently ignored by hardware; callers must check the module's protection
/// queries before relying on such a write taking effect.
pub trait Module {
    /// Module name, for logs.
    fn module_name(&self) -> &'static str;

    /// The register table this module was constructed with.
    fn registers(&self) -> &'static [RegisterDef];

    /// The facade this module borrows.
    fn target(&mut self) -> &mut Target;

    /// Look up a register by name.
    fn register(&self, name: &str) -> Result<RegisterDef> {
        self.registers()
            .iter()
            .find(|r| r.name == name)
            .copied()
            .ok_or_else(|| Error::UnknownRegister(name.to_string()))
    }

    /// Read a named register; 8-bit values are zero-extended.
    fn reg(&mut self, name: &str) -> Result<u16> {
        let def = self.register(name)?;
        match def.width {
            Width::Byte => Ok(u16::from(self.target().read_bd_byte(def.addr)?)),
            Width::Word => self.target().read_bd_word(def.addr),
        }
    }

    /// Write a named register whole.
    fn set_reg(&mut self, name: &str, value: u16) -> Result<()> {
        let def = self.register(name)?;
        match def.width {
            Width::Byte => self.target().write_bd_byte(def.addr, value as u8),
            Width::Word => self.target().write_bd_word(def.addr, value),
        }
    }

    /// Read-modify-write: set `mask` bits at `addr`, preserving the rest.
    fn set_bits(&mut self, addr: u16, mask: u8) -> Result<()> {
        let value = self.target().read_bd_byte(addr)?;
        self.target().write_bd_byte(addr, value | mask)
    }

    /// Read-modify-write: clear `mask` bits at `addr`, preserving the rest.
    fn clear_bits(&mut self, addr: u16, mask: u8) -> Result<()> {
        let value = self.target().read_bd_byte(addr)?;
        self.target().write_bd_byte(addr, value & !mask)
    }

    /// True when all `mask` bits at `addr` are set.
    fn bits_set(&mut self, addr: u16, mask: u8) -> Result<bool> {
        Ok(self.target().read_bd_byte(addr)? & mask == mask)
    }
}

/// Declare a peripheral module struct borrowing the target facade, with its
/// register table and the [`Module`] plumbing.
///
/// ```ignore
/// register_module! {
///     /// Flash controller.
///     pub struct Flash, "flash", [
///         byte fclkdiv @ 0x0100,
///         word faddr @ 0x0108,
///     ]
/// }
/// ```
macro_rules! register_module {
    (
        $(#[$meta:meta])*
        pub struct $name:ident, $modname:literal, [
            $($width:ident $reg:ident @ $addr:expr),+ $(,)?
        ]
    ) => {
        $(#[$meta])*
        pub struct $name<'a> {
            target: &'a mut $crate::target::Target,
        }

        impl<'a> $name<'a> {
            /// Register table of this module.
            pub const REGISTERS: &'static [$crate::module::RegisterDef] = &[
                $($crate::module::RegisterDef::$width(stringify!($reg), $addr),)+
            ];

            /// Bind this module to a target facade.
            pub fn new(target: &'a mut $crate::target::Target) -> Self {
                Self { target }
            }
        }

        impl<'a> $crate::module::Module for $name<'a> {
            fn module_name(&self) -> &'static str {
                $modname
            }

            fn registers(&self) -> &'static [$crate::module::RegisterDef] {
                Self::REGISTERS
            }

            fn target(&mut self) -> &mut $crate::target::Target {
                self.target
            }
        }
    };
}

pub(crate) use register_module;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_def_constructors() {
        let def = RegisterDef::byte("fstat", 0x0105);
        assert_eq!(def.name, "fstat");
        assert_eq!(def.addr, 0x0105);
        assert_eq!(def.width, Width::Byte);

        let def = RegisterDef::word("faddr", 0x0108);
        assert_eq!(def.width, Width::Word);
    }
}
