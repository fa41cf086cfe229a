//! # GenSync Sync
//!
//! Drives a two-party set-reconciliation session from connection to outcome.
//!
//! ## Overview
//!
//! A [`SyncSession`] owns a [`Configuration`](gensync_core::Configuration),
//! an [`ElementSet`](gensync_core::ElementSet) and a
//! [`Role`](gensync_core::Role). Calling [`SyncSession::begin`] walks it
//! through `Configured → Connecting → Exchanging → {Reconciled | Failed}`:
//!
//! - **Connecting**: the initiator connects to the configured endpoint, the
//!   responder listens on it and accepts exactly one peer.
//! - **Exchanging**: control passes to a [`SyncEngine`], which reconciles the
//!   local set with the peer over the established [`Transport`].
//!
//! The outcome is always an explicit [`SessionOutcome`]; returning from
//! `begin` does not by itself mean the sets agree.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gensync_core::{CommunicationMode, ConfigurationBuilder, ElementSet, ProtocolIdentity, Role};
//! use gensync_sync::SyncSession;
//!
//! async fn example() {
//!     let config = ConfigurationBuilder::new()
//!         .protocol(ProtocolIdentity::CpiSync)
//!         .comm(CommunicationMode::Socket)
//!         .port(8001)
//!         .build()
//!         .unwrap();
//!     let elements: ElementSet = ['a', 'b', 'c'].into_iter().collect();
//!
//!     let mut session = SyncSession::new(config, elements, Role::Initiator);
//!     let outcome = session.begin().await.unwrap();
//!     println!("reconciled: {}", outcome.is_reconciled());
//! }
//! ```
//!
//! ## Message Flow
//!
//! The bundled [`AntiEntropyEngine`] exchanges content digests:
//!
//! ```text
//! Initiator                           Responder
//!   |-------- Hello(params) --------->|
//!   |<------- Hello(params) ----------|
//!   |-------- Digest ---------------->|
//!   |<------- Digest -----------------|
//!   |-------- Need ------------------>|
//!   |<------- Elements ---------------|
//!   |<------- Need -------------------|
//!   |-------- Elements -------------->|
//!   |<------- Done -------------------|
//! ```

pub mod engine;
pub mod error;
pub mod messages;
pub mod session;
pub mod transport;

pub use engine::{AntiEntropyEngine, ExchangeReport, SyncEngine};
pub use error::{Result, SyncError};
pub use messages::{limits, SyncErrorCode, SyncMessage, PROTOCOL_VERSION};
pub use session::{
    FailureKind, SessionOptions, SessionOutcome, SessionState, SessionStats, SyncSession,
};
pub use transport::{
    memory, tcp, FramedTransport, TcpTransport, TransferStats, Transport, MAX_FRAME_SIZE,
};
