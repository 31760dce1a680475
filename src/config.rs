// src/config.rs

//! Manages server configuration: loading, defaulting and validation.

use crate::connection::DEFAULT_OUTBOUND_QUEUE_FRAMES;
use crate::core::protocol::codec::DEFAULT_MAX_FRAME_BYTES;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// Selects how client connections are mapped onto execution contexts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ServerType {
    /// One dedicated OS thread per connection, blocking I/O.
    #[default]
    Tpc,
    /// A fixed pool of workers multiplexing every connection.
    Reactor,
}

/// Represents the final, validated server configuration.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub server_type: ServerType,
    /// The only `host` value accepted in CONNECT frames.
    #[serde(default = "default_virtual_host")]
    pub virtual_host: String,
    /// Number of workers in the reactor pool.
    #[serde(default = "default_reactor_threads")]
    pub reactor_threads: usize,
    /// A frame growing past this many bytes without a terminator closes the connection.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Frames queued per connection before further deliveries to it are dropped.
    #[serde(default = "default_outbound_queue_frames")]
    pub outbound_queue_frames: usize,
    /// A single socket write stalling longer than this closes the connection.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    7777
}
fn default_virtual_host() -> String {
    "stomp.cs.bgu.ac.il".to_string()
}
fn default_reactor_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}
fn default_outbound_queue_frames() -> usize {
    DEFAULT_OUTBOUND_QUEUE_FRAMES
}
fn default_write_timeout_ms() -> u64 {
    30_000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            server_type: ServerType::default(),
            virtual_host: default_virtual_host(),
            reactor_threads: default_reactor_threads(),
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue_frames: default_outbound_queue_frames(),
            write_timeout_ms: default_write_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.virtual_host.trim().is_empty() {
            return Err(anyhow!("virtual_host cannot be empty"));
        }
        if self.reactor_threads == 0 {
            return Err(anyhow!("reactor_threads cannot be 0"));
        }
        if self.max_frame_bytes == 0 {
            return Err(anyhow!("max_frame_bytes cannot be 0"));
        }
        if self.outbound_queue_frames == 0 {
            return Err(anyhow!("outbound_queue_frames cannot be 0"));
        }
        if self.write_timeout_ms == 0 {
            return Err(anyhow!("write_timeout_ms cannot be 0"));
        }
        Ok(())
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}
