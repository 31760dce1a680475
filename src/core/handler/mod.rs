// src/core/handler/mod.rs

// Declare the actions submodule here, in the parent module file.
mod actions;

pub mod engine;

pub use engine::ProtocolEngine;
