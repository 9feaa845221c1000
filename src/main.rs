//! spixfer - full-duplex SPI transfer tool
//!
//! Exercises a Linux spidev character device: applies the requested bus
//! parameters, transmits frames taken from the command line, a config file,
//! or a built-in default, and reports every TX/RX pair as hex.

mod cli;
mod config;
mod device;
mod error;
mod hex;
mod repeater;
mod source;

use clap::Parser;
use cli::Cli;
use device::SpiDevice;
use source::FrameSource;

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    // Every fatal error funnels through this one site.
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> error::Result<()> {
    let config = cli.into_config()?;
    let mut source = FrameSource::from_config(&config.source)?;
    let mut device = SpiDevice::open(&config)?;

    let tags = repeater::run(&config, &mut source, &mut device)?;
    log::debug!("Completed {} transfers", tags.len());

    Ok(())
}
