// src/core/protocol/codec.rs

//! A `tokio_util::codec` implementation splitting a byte stream on NUL terminators.
//!
//! The reactor drives it through `FramedRead`; the thread-per-connection model
//! calls `decode` directly on its own `BytesMut`, so both share the exact same
//! framing rules.

use super::frame::Frame;
use crate::core::StompError;
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// The byte that ends every frame on the wire.
pub const FRAME_TERMINATOR: u8 = 0;

/// Upper bound for a single frame when no explicit limit is configured.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct StompCodec {
    max_frame_bytes: usize,
    /// Offset up to which the buffer is known not to contain a terminator.
    scanned: usize,
}

impl Default for StompCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl StompCodec {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            max_frame_bytes,
            scanned: 0,
        }
    }
}

impl Decoder for StompCodec {
    type Item = String;
    type Error = StompError;

    /// Yields the text accumulated before the next NUL, dropping the terminator.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let start = self.scanned.min(src.len());
        match src[start..].iter().position(|b| *b == FRAME_TERMINATOR) {
            Some(offset) => {
                let end = start + offset;
                self.scanned = 0;
                let raw = src.split_to(end);
                src.advance(1);
                let text = std::str::from_utf8(&raw)?;
                Ok(Some(text.to_string()))
            }
            None => {
                if src.len() > self.max_frame_bytes {
                    return Err(StompError::FrameTooLarge(self.max_frame_bytes));
                }
                self.scanned = src.len();
                Ok(None)
            }
        }
    }

    /// Bytes left without a terminator when the peer hangs up are discarded.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                buf.clear();
                self.scanned = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<Frame> for StompCodec {
    type Error = StompError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to(dst);
        Ok(())
    }
}

impl Encoder<&Frame> for StompCodec {
    type Error = StompError;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to(dst);
        Ok(())
    }
}
