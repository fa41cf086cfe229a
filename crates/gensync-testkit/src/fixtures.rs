//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::time::Duration;

use gensync_core::{
    CommunicationMode, Configuration, ConfigurationBuilder, ElementSet, ProtocolIdentity, Role,
};
use gensync_sync::{SessionOptions, SessionOutcome, SessionState, SyncSession};

/// Bound on how long fixture sessions wait for their peer.
pub const FIXTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// Find a localhost port that is free right now.
///
/// The port is released before returning, so another process could grab it
/// in between. Good enough for tests.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("no free localhost port")
}

/// Build an element set from characters.
pub fn element_set(items: &[char]) -> ElementSet {
    items.iter().copied().collect()
}

/// Session options with finite timeouts so a broken test fails instead of hanging.
pub fn test_options() -> SessionOptions {
    SessionOptions {
        connect_timeout: Some(FIXTURE_TIMEOUT),
        retry_interval: Duration::from_millis(10),
        exchange_timeout: Some(FIXTURE_TIMEOUT),
    }
}

/// Matched initiator and responder configurations on a fresh port.
pub struct SessionPairFixture {
    pub initiator: Configuration,
    pub responder: Configuration,
}

impl SessionPairFixture {
    /// Both sides run `protocol` with the harness defaults.
    pub fn new(protocol: ProtocolIdentity) -> Self {
        Self::with_bits(protocol, 8, 8)
    }

    /// Let the two sides disagree on the base bit width.
    pub fn with_bits(protocol: ProtocolIdentity, initiator_bits: u32, responder_bits: u32) -> Self {
        let port = free_port();
        Self {
            initiator: config(protocol, port, initiator_bits),
            responder: config(protocol, port, responder_bits),
        }
    }

    /// Create the two sessions with test timeouts applied.
    pub fn sessions(
        &self,
        initiator_elements: ElementSet,
        responder_elements: ElementSet,
    ) -> (SyncSession, SyncSession) {
        (
            SyncSession::new(self.initiator.clone(), initiator_elements, Role::Initiator)
                .with_options(test_options()),
            SyncSession::new(self.responder.clone(), responder_elements, Role::Responder)
                .with_options(test_options()),
        )
    }
}

fn config(protocol: ProtocolIdentity, port: u16, bits: u32) -> Configuration {
    ConfigurationBuilder::new()
        .protocol(protocol)
        .comm(CommunicationMode::Socket)
        .port(port)
        .bits(bits)
        .build()
        .expect("fixture configuration is valid")
}

/// Result of running both sides of a session.
pub struct PairResult {
    pub initiator_outcome: SessionOutcome,
    pub responder_outcome: SessionOutcome,
    pub initiator_state: SessionState,
    pub responder_state: SessionState,
    pub initiator_elements: ElementSet,
    pub responder_elements: ElementSet,
}

/// Run an initiator and a responder concurrently over localhost TCP.
pub async fn run_pair(mut initiator: SyncSession, mut responder: SyncSession) -> PairResult {
    let (oi, or) = tokio::join!(initiator.begin(), responder.begin());
    PairResult {
        initiator_outcome: oi.expect("initiator session was configured"),
        responder_outcome: or.expect("responder session was configured"),
        initiator_state: initiator.state(),
        responder_state: responder.state(),
        initiator_elements: initiator.into_elements(),
        responder_elements: responder.into_elements(),
    }
}
