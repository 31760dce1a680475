// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

use stomphub::config::Config;
use stomphub::connection::{ChannelHandle, Outbound, SessionPhase};
use stomphub::core::protocol::Command;
use stomphub::core::{Frame, ProtocolEngine};
use stomphub::core::state::ServerState;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tokio::sync::mpsc::error::TryRecvError;
use tracing_subscriber::EnvFilter;

pub const VIRTUAL_HOST: &str = "stomp.cs.bgu.ac.il";

/// TestContext provides an isolated server state per test
pub struct TestContext {
    pub state: Arc<ServerState>,
}

impl TestContext {
    /// Creates a new test context with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new test context with custom configuration
    pub fn with_config(config: Config) -> Self {
        // Initialize tracing (ignore error if already initialized)
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("warn"))
            .with_test_writer()
            .try_init();

        Self {
            state: ServerState::new(config),
        }
    }

    /// Opens a new in-memory connection that has not sent anything yet
    pub fn client(&self) -> TestClient {
        let connection_id = self.state.next_connection_id();
        let (handle, rx) = ChannelHandle::channel(self.state.config.outbound_queue_frames);
        let engine = ProtocolEngine::new(connection_id, Arc::new(handle), self.state.clone());
        TestClient {
            connection_id,
            engine,
            rx,
            closed: false,
        }
    }

    /// Opens a connection and logs it in, asserting the CONNECTED reply
    pub fn connected_client(&self, login: &str, passcode: &str) -> TestClient {
        let mut client = self.client();
        client.send(&connect_frame(login, passcode));
        let frames = client.frames();
        assert_eq!(frames.len(), 1, "expected a single reply, got {:?}", frames);
        assert_eq!(frames[0].command(), Command::Connected);
        assert_eq!(frames[0].header("version"), Some("1.2"));
        client
    }
}

/// One simulated client: an engine plus the receiving end of its outbound queue
pub struct TestClient {
    pub connection_id: u64,
    pub engine: ProtocolEngine,
    rx: Receiver<Outbound>,
    closed: bool,
}

impl TestClient {
    /// Feeds raw frame text to the engine, exactly as a codec would
    pub fn send(&mut self, raw: &str) {
        self.engine.process(raw);
    }

    /// Drains and parses everything the server sent to this client so far
    pub fn frames(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(Outbound::Frame(bytes)) => {
                    assert_eq!(bytes.last(), Some(&0u8), "frame must end with NUL");
                    let text = std::str::from_utf8(&bytes[..bytes.len() - 1])
                        .expect("frames are UTF-8");
                    frames.push(Frame::parse(text).expect("server frames must parse"));
                }
                Ok(Outbound::Close) => self.closed = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        frames
    }

    /// True once the server asked for this connection to be closed
    pub fn is_closed(&mut self) -> bool {
        let _ = self.frames();
        self.closed
    }

    pub fn phase(&self) -> SessionPhase {
        self.engine.phase()
    }

    pub fn subscribe(&mut self, destination: &str, id: &str) {
        self.send(&format!(
            "SUBSCRIBE\ndestination:{destination}\nid:{id}\n\n"
        ));
    }
}

pub fn connect_frame(login: &str, passcode: &str) -> String {
    format!(
        "CONNECT\naccept-version:1.2\nhost:{VIRTUAL_HOST}\nlogin:{login}\npasscode:{passcode}\n\n"
    )
}

pub fn send_frame(destination: &str, body: &str, receipt: Option<&str>) -> String {
    match receipt {
        Some(receipt) => {
            format!("SEND\ndestination:{destination}\nreceipt:{receipt}\n\n{body}\n")
        }
        None => format!("SEND\ndestination:{destination}\n\n{body}\n"),
    }
}
