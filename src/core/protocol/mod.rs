// src/core/protocol/mod.rs

pub mod codec;
pub mod frame;
pub use codec::StompCodec;
pub use frame::{Command, Frame};
