// src/main.rs

//! The main entry point for the StompHub server application.

use anyhow::Result;
use std::env;
use std::str::FromStr;
use stomphub::config::{Config, ServerType};
use stomphub::server;
use tracing::error;
use tracing_subscriber::{filter::EnvFilter, prelude::*};

const USAGE: &str = "Usage: stomphub <port> <tpc|reactor> [--config /path/to/stomphub.toml]";

fn main() -> Result<()> {
    // Version information, stamped by build.rs.
    const VERSION: &str = env!("STOMPHUB_BUILD_VERSION");
    const PROFILE: &str = env!("STOMPHUB_BUILD_PROFILE");

    let args: Vec<String> = env::args().skip(1).collect();

    // Handle the --version flag.
    if args.iter().any(|a| a == "--version") {
        println!("StompHub version {VERSION} ({PROFILE} build)");
        return Ok(());
    }

    // Split off the optional --config flag; what remains are positional arguments.
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            match iter.next() {
                Some(path) => config_path = Some(path.clone()),
                None => usage_exit("--config flag requires a value"),
            }
        } else {
            positional.push(arg.as_str());
        }
    }

    let [port_str, server_type_str] = positional.as_slice() else {
        usage_exit("expected exactly two arguments: <port> <serverType>");
    };
    let port = match port_str.parse::<u16>() {
        Ok(port) if port != 0 => port,
        _ => usage_exit(&format!("Invalid port number: {port_str}")),
    };
    let server_type = match ServerType::from_str(server_type_str) {
        Ok(server_type) => server_type,
        Err(_) => usage_exit(&format!("Unknown server type: {server_type_str}")),
    };

    // Load the configuration file if one was given; the command line wins over it.
    let mut config = match &config_path {
        Some(path) => match Config::from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load configuration from \"{path}\": {e}");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    config.port = port;
    config.server_type = server_type;
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Get initial log level from env var or config.
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .compact() // Use the compact, single-line format.
                .with_ansi(true), // Enable ANSI color codes for log levels.
        )
        .init();

    if let Err(e) = server::run(config) {
        error!("Server runtime error: {}", e);
        return Err(e);
    }
    Ok(())
}

fn usage_exit(reason: &str) -> ! {
    eprintln!("{reason}");
    eprintln!("{USAGE}");
    std::process::exit(1);
}
