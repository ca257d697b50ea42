//! Error types for rbdm-core

use thiserror::Error;

/// Why a response failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFault {
    /// The transport returned a different number of bytes than the command
    /// declared.
    WrongLength {
        /// Bytes the command expected, echo byte included.
        expected: usize,
        /// Bytes actually read before the transport timed out.
        actual: usize,
    },
    /// The first response byte was not the bitwise complement of the opcode.
    BadEcho {
        /// The byte received in place of the complement echo.
        echo: u8,
    },
}

impl core::fmt::Display for ResponseFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WrongLength { expected, actual } => {
                write!(f, "expected {} bytes, got {}", expected, actual)
            }
            Self::BadEcho { echo } => write!(f, "bad complement echo 0x{:02X}", echo),
        }
    }
}

/// Error type shared by every layer of the driver.
///
/// The codec and the device facade never retry or swallow: each failure
/// propagates to the immediate caller carrying the opcode or address being
/// attempted.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport returned zero bytes for a command. Cable, power or
    /// timeout problem.
    #[error("no response to command 0x{opcode:02X}")]
    NoResponse {
        /// Opcode of the command that went unanswered.
        opcode: u8,
    },

    /// The response had the wrong length or a wrong complement echo.
    /// Protocol desync or a command the pod does not support.
    #[error("invalid response to command 0x{opcode:02X}: {fault}")]
    InvalidResponse {
        /// Opcode of the offending command.
        opcode: u8,
        /// What exactly was wrong with the response.
        fault: ResponseFault,
    },

    /// Word access at an odd address. Raised before any transport traffic.
    #[error("word access at odd address 0x{addr:04X}")]
    Alignment {
        /// The misaligned target address.
        addr: u16,
    },

    /// The flash/EEPROM controller flagged PVIOL after a command start.
    #[error("flash protection violation (PVIOL) at 0x{addr:04X}")]
    FlashProtectionViolation {
        /// Address the errored command was loaded with.
        addr: u16,
    },

    /// The flash/EEPROM controller flagged ACCERR after a command start.
    #[error("flash access error (ACCERR) at 0x{addr:04X}")]
    FlashAccessError {
        /// Address the errored command was loaded with.
        addr: u16,
    },

    /// A bounded status poll ran out of its attempt budget.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// The operation was aborted through a cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// Transport-level failure, e.g. the pod handshake failed during connect.
    #[error("communication error: {0}")]
    Communication(String),

    /// A register module was asked for a name it does not declare.
    #[error("no register named {0:?} in this module")]
    UnknownRegister(String),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Result type alias using the core error.
pub type Result<T> = std::result::Result<T, Error>;
