//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u16
pub fn parse_hex_u16(s: &str) -> Result<u16, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u16>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u8>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Pod backend to talk through.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodKind {
    /// Elektronik-Laden ComPOD12
    Compod12,
    /// Kevin Ross BDM12
    Kevinro,
    /// In-memory emulated target, no hardware needed
    Dummy,
}

/// Pod selection, shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct PodArgs {
    /// Pod backend
    #[arg(short = 'P', long, value_enum, default_value = "compod12", global = true)]
    pub pod: PodKind,

    /// Serial device (e.g. /dev/ttyUSB0) or ip=host:port for a TCP bridge
    #[arg(short = 'p', long, global = true)]
    pub port: Option<String>,

    /// Baud rate for serial pods
    #[arg(short, long, global = true)]
    pub baud: Option<u32>,
}

#[derive(Parser)]
#[command(name = "rbdm")]
#[command(author, version, about = "HC12/S12 Background Debug Mode driver", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub pod: PodArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the pod and the connected device
    Probe,

    /// Read a memory area to a hexdump or binary file
    Dump {
        /// Start address (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u16, default_value = "0x0000")]
        address: u16,

        /// Number of bytes to read
        #[arg(short, long, value_parser = parse_hex_u16, default_value = "0x100")]
        length: u16,

        /// Output file; hexdump to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a binary file into target memory
    Write {
        /// Start address (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u16)]
        address: u16,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Skip the read-back verification pass
        #[arg(long)]
        no_verify: bool,
    },

    /// Fill a memory area with a byte value
    Fill {
        /// Start address (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u16)]
        address: u16,

        /// Number of bytes to fill
        #[arg(short, long, value_parser = parse_hex_u16)]
        length: u16,

        /// Fill value
        #[arg(long, value_parser = parse_hex_u8, default_value = "0xFF")]
        value: u8,
    },

    /// Mass-erase all flash banks
    Erase {
        /// Oscillator frequency in Hz, used to derive the flash clock divider
        #[arg(long, default_value = "16000000")]
        osc: u32,
    },

    /// Unsecure a secured device (erases flash and EEPROM)
    Unsecure {
        /// Oscillator frequency in Hz, used to derive the NVM clock dividers
        #[arg(long, default_value = "16000000")]
        osc: u32,

        /// Program the security word back to the unsecured pattern
        #[arg(long)]
        lock: bool,
    },

    /// Dump the CPU registers, including both CCR views
    Regs,

    /// Print the interrupt vector table
    Vectors,

    /// Resume the user program
    Go,

    /// Halt the user program into background mode
    Halt,

    /// Single-step user instructions
    Trace {
        /// Number of instructions to step
        #[arg(short, long, default_value = "1")]
        count: u32,
    },

    /// Reset the target
    Reset,
}
