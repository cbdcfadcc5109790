//! spinor - serial NOR flash driver tool
//!
//! Drives an IS25LP040E-class flash chip through the spinor-core protocol
//! layer. The chip itself is emulated by spinor-dummy and persisted as a
//! plain image file, so every command exercises the full command-protocol
//! path (identify, write-enable gating, busy polling, range decomposition)
//! without hardware attached.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use spinor_core::flash::Flash;
use spinor_dummy::DummyBus;
use std::path::Path;

/// Top-level CLI error
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Flash driver error
    #[error("flash error: {0}")]
    Flash(#[from] spinor_core::Error),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let mut flash = open_flash(&cli.image)?;

    match &cli.command {
        Commands::Probe => commands::run_probe(&mut flash)?,
        Commands::Read {
            address,
            length,
            output,
            fast,
        } => commands::run_read(&mut flash, *address, *length, output.as_deref(), *fast)?,
        Commands::Write { address, input } => {
            commands::run_write(&mut flash, *address, input)?;
            save_image(flash, &cli.image)?;
            return Ok(());
        }
        Commands::Erase { address, size } => {
            commands::run_erase(&mut flash, *address, *size)?;
            save_image(flash, &cli.image)?;
            return Ok(());
        }
        Commands::EraseChip => {
            commands::run_erase_chip(&mut flash)?;
            save_image(flash, &cli.image)?;
            return Ok(());
        }
    }

    Ok(())
}

/// Load the chip image and initialize a flash handle over it
fn open_flash(image: &Path) -> Result<Flash<DummyBus>, CliError> {
    let config = spinor_dummy::DummyConfig::default();
    let bus = match std::fs::read(image) {
        Ok(data) => DummyBus::with_data(config, &data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("image {} not found, starting erased", image.display());
            DummyBus::new(config)
        }
        Err(e) => return Err(e.into()),
    };

    let mut flash = Flash::new(bus);
    flash.init()?;
    Ok(flash)
}

/// Persist the (possibly modified) chip image back to disk
fn save_image(flash: Flash<DummyBus>, image: &Path) -> Result<(), CliError> {
    let bus = flash.release();
    std::fs::write(image, bus.data())?;
    Ok(())
}
