// src/core/state/mod.rs

//! Defines the central `ServerState` struct and all related state components.
//! This module is broken down into logical parts for better organization.

mod connections;
mod core;
mod directory;
mod stats;

pub use connections::{ConnectionHandle, ConnectionRegistry};
pub use core::ServerState;
pub use directory::{ClientDirectory, LoginOutcome};
pub use stats::StatsState;
