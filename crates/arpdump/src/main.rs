//! ARP table dump
//!
//! Main entry point for arpdump. Prints the IPv4 neighbor cache, or the entry
//! for a single host, to standard output. Diagnostics go to standard error.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - AU-3: Content of Audit Records - Structured logging
//! - CM-6: Configuration Settings - Config file with CLI overrides
//! - CM-8: System Component Inventory - Neighbor listing

use anyhow::{Context, anyhow};
use clap::Parser;
use sonic_arpdump::{
    ArpDump, ArpdumpConfig, ArpdumpError, Filter, StaticSource, no_entry_line, resolve_host,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "arpdump")]
#[command(version, about = "Dump the IPv4 ARP table", long_about = None)]
struct Args {
    /// Show only the entry for this host name or address
    host: Option<String>,

    /// Show addresses numerically (the default)
    #[arg(short = 'n', long, conflicts_with = "resolve")]
    numeric: bool,

    /// Resolve addresses to host names
    #[arg(short = 'r', long)]
    resolve: bool,

    /// Only show entries on this interface
    #[arg(short = 'i', long, value_name = "IFNAME")]
    interface: Option<String>,

    /// Decode a captured NET_RT_FLAGS dump instead of the live table
    #[arg(long, value_name = "FILE")]
    snapshot_file: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("arpdump: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize structured logging on stderr
fn init_logging(level: &str, verbose: bool) -> Result<(), ArpdumpError> {
    let default = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ArpdumpError::Config(format!("Failed to set logger: {}", e)))
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = match &args.config {
        Some(path) => ArpdumpConfig::load(path)?,
        None => ArpdumpConfig::default(),
    };
    init_logging(&config.logging.level, args.verbose)?;

    let resolve_hostnames = !args.numeric && (args.resolve || config.lookup.resolve_hostnames);
    let filter = Filter {
        address: None,
        interface: args.interface.or(config.filter.interface),
    };
    debug!(?filter, resolve_hostnames, "Starting ARP table dump");

    let mut dump = ArpDump::system()
        .with_hostname_lookup(resolve_hostnames)
        .with_filter(filter);
    if let Some(path) = &args.snapshot_file {
        let source = StaticSource::from_file(path)
            .map_err(|e| anyhow!("{}: {}", path.display(), e))?;
        dump = dump.with_source(Box::new(source));
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let Some(host) = args.host else {
        dump.run(&mut out)?;
        return Ok(ExitCode::SUCCESS);
    };

    let addr = resolve_host(&host)?;
    if dump.search(addr, &mut out)? {
        return Ok(ExitCode::SUCCESS);
    }

    let interface = dump.filter().interface.clone();
    writeln!(out, "{}", no_entry_line(&host, addr, interface.as_deref()))
        .context("writing to stdout")?;
    Ok(ExitCode::FAILURE)
}
