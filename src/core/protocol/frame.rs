// src/core/protocol/frame.rs

//! The parsed, text-level representation of a single STOMP frame.
//!
//! A frame on the wire looks like:
//!
//! ```text
//! COMMAND
//! header-name:value
//! other-header:value
//!
//! optional body
//! ```
//!
//! followed by a NUL terminator, which is owned by the codec and never part
//! of the frame text itself.

use crate::core::StompError;
use bytes::{BufMut, Bytes, BytesMut};
use indexmap::IndexMap;
use std::fmt::Write as _;
use strum_macros::{Display, EnumString};

/// The only protocol version this server negotiates.
pub const SUPPORTED_VERSION: &str = "1.2";

// Header names used by the server.
pub const ACCEPT_VERSION: &str = "accept-version";
pub const HOST: &str = "host";
pub const LOGIN: &str = "login";
pub const PASSCODE: &str = "passcode";
pub const VERSION: &str = "version";
pub const DESTINATION: &str = "destination";
pub const ID: &str = "id";
pub const RECEIPT: &str = "receipt";
pub const RECEIPT_ID: &str = "receipt-id";
pub const SUBSCRIPTION: &str = "subscription";
pub const MESSAGE_ID: &str = "message-id";
pub const MESSAGE: &str = "message";

/// The command token on the first line of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Command {
    Connect,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Message,
    Receipt,
    Error,
}

/// An immutable protocol message: a command, ordered headers and an optional body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: Command,
    headers: IndexMap<String, String>,
    body: Option<String>,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: IndexMap::new(),
            body: None,
        }
    }

    /// Adds a header. A repeated name overwrites the earlier value in place.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.body = if body.is_empty() { None } else { Some(body) };
        self
    }

    /// Builds the ERROR frame sent before a connection is torn down.
    ///
    /// The offending frame is echoed back in the body so the client can see what
    /// was rejected.
    pub fn error(err: &StompError, receipt: Option<&str>, original: &str) -> Self {
        let mut frame = Frame::new(Command::Error);
        if let Some(receipt) = receipt.filter(|r| !r.is_empty()) {
            frame = frame.with_header(RECEIPT_ID, receipt);
        }
        frame = frame.with_header(MESSAGE, err.to_string());
        if original.is_empty() {
            return frame;
        }
        let mut body = String::from("The message:\n-------\n");
        body.push_str(original);
        if !original.ends_with('\n') {
            body.push('\n');
        }
        body.push_str("-------\n");
        frame.with_body(body)
    }

    /// A RECEIPT frame. Without a receipt id the header is left out.
    pub fn receipt(receipt_id: Option<&str>) -> Self {
        let frame = Frame::new(Command::Receipt);
        match receipt_id {
            Some(id) => frame.with_header(RECEIPT_ID, id),
            None => frame,
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Returns a header that must be present and non-empty.
    pub fn required_header(&self, name: &'static str) -> Result<&str, StompError> {
        match self.header(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(StompError::MissingHeader(name)),
        }
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    /// Parses the text of one frame, as yielded by the codec.
    ///
    /// Header names are everything before the first `:`, values are trimmed.
    /// Leading blank lines (heart-beats between frames) are skipped and `\r\n`
    /// line endings are accepted.
    pub fn parse(text: &str) -> Result<Self, StompError> {
        let text = text.replace("\r\n", "\n");
        let text = text.trim_start_matches('\n');
        if text.trim().is_empty() {
            return Err(StompError::EmptyFrame);
        }

        let (head, body) = match text.find("\n\n") {
            Some(pos) => (&text[..pos], &text[pos + 2..]),
            None => (text, ""),
        };

        let mut lines = head.lines();
        let token = lines.next().unwrap_or_default().trim();
        let command: Command = token
            .parse()
            .map_err(|_| StompError::UnknownCommand(token.to_string()))?;

        let mut frame = Frame::new(command);
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| StompError::MalformedHeader(line.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(StompError::MalformedHeader(line.to_string()));
            }
            frame.headers.insert(name.to_string(), value.trim().to_string());
        }

        Ok(frame.with_body(body))
    }

    /// Renders the frame text, without the NUL terminator.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(64 + self.body().len());
        out.push_str(&self.command.to_string());
        out.push('\n');
        for (name, value) in &self.headers {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{name}:{value}");
        }
        out.push('\n');
        out.push_str(self.body());
        out
    }

    /// Writes the frame text followed by the NUL terminator into `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) {
        let text = self.to_text();
        dst.reserve(text.len() + 1);
        dst.put_slice(text.as_bytes());
        dst.put_u8(0);
    }

    /// Encodes the frame into wire bytes, terminator included.
    pub fn encode_to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.write_to(&mut buf);
        buf.freeze()
    }
}
