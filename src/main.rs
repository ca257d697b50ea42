//! rbdm - a Background Debug Mode driver for HC12/S12 microcontrollers
//!
//! rbdm talks to the single-wire BKGD debug interface through a serial
//! debug pod and exposes memory access, run control, CPU registers, flash
//! and EEPROM programming, and device identification.
//!
//! # Architecture
//!
//! All commands run against a `Target` session from `rbdm-core`, which
//! chunks bulk transfers and tracks run state. The pod backends plug in
//! underneath:
//! - **ComPOD12** (`rbdm-compod12`) - Elektronik-Laden pod with block
//!   transfer commands, over serial or a TCP bridge
//! - **BDM12** (`rbdm-kevinro`) - Kevin Ross pod with RTS/CTS byte pacing
//!   and optional v4.5 extended commands
//! - **Dummy** (`rbdm-dummy`) - in-memory emulated S12 for trying commands
//!   without hardware

mod cli;
mod commands;
mod pods;

use clap::Parser;
use cli::{Cli, Commands};
use rbdm_core::target::Target;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let pod = match pods::open_pod(&cli.pod) {
        Ok(pod) => pod,
        Err(e) => {
            eprintln!("Failed to open pod: {}", e);
            std::process::exit(1);
        }
    };
    let mut target = Target::new(pod);

    let result = match cli.command {
        Commands::Probe => commands::probe::run(&mut target),
        Commands::Dump {
            address,
            length,
            output,
        } => commands::dump::run(&mut target, address, length as usize, output.as_deref()),
        Commands::Write {
            address,
            input,
            no_verify,
        } => commands::write::run(&mut target, address, &input, !no_verify),
        Commands::Fill {
            address,
            length,
            value,
        } => commands::fill::run(&mut target, address, length as usize, value),
        Commands::Erase { osc } => commands::nvm::erase(&mut target, osc),
        Commands::Unsecure { osc, lock } => commands::nvm::unsecure(&mut target, osc, lock),
        Commands::Regs => commands::regs::run(&mut target),
        Commands::Vectors => commands::vectors::run(&mut target),
        Commands::Go => commands::run::go(&mut target),
        Commands::Halt => commands::run::halt(&mut target),
        Commands::Trace { count } => commands::run::trace(&mut target, count),
        Commands::Reset => commands::run::reset(&mut target),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
