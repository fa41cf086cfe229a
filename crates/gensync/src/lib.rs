//! # GenSync
//!
//! Command-line harness for a two-party set-reconciliation session.
//!
//! ## Overview
//!
//! Run one process as `client` and another as `server`, naming the same
//! protocol on both sides:
//!
//! ```text
//! tryme server IBLTSync      # terminal 1
//! tryme client IBLTSync      # terminal 2
//! ```
//!
//! Both start from `{a, b, c}`; the client adds `d` and the server adds `e`.
//! After a successful two-way session both hold `{a, b, c, d, e}`.
//!
//! ## Flow
//!
//! CLI input → [`core::resolve`] → [`core::ConfigurationBuilder`] (seeded from
//! [`HarnessDefaults`]) → [`sync::SyncSession`] → [`sync::SessionOutcome`].
//!
//! ## Re-exports
//!
//! - `gensync::core` - Protocol catalog, configuration, element sets
//! - `gensync::sync` - Session, transports and engine

pub mod cli;
pub mod error;
pub mod harness;

pub use gensync_core as core;
pub use gensync_sync as sync;

pub use cli::{parse_args, Cli, Command, Mode};
pub use error::{HarnessError, Result};
pub use harness::{
    configure, demo_elements, exit_code, observation, run, summary, HarnessDefaults, EXIT_FAILED,
    EXIT_INVALID, EXIT_OK,
};

pub use gensync_core::{
    resolve, CommunicationMode, Configuration, ConfigurationBuilder, DataObject, ElementSet,
    ProtocolIdentity, Role,
};
pub use gensync_sync::{SessionOptions, SessionOutcome, SessionState, SyncSession};
