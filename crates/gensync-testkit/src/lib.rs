//! # GenSync Testkit
//!
//! Testing utilities for GenSync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: free ports, matched configuration pairs, and a helper that
//!   runs an initiator and a responder session against each other
//! - **Generators**: Proptest strategies for protocols, elements and builder
//!   parameters
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use gensync_core::ProtocolIdentity;
//! use gensync_testkit::fixtures::{element_set, run_pair, SessionPairFixture};
//!
//! async fn example() {
//!     let fixture = SessionPairFixture::new(ProtocolIdentity::IbltSync);
//!     let (initiator, responder) =
//!         fixture.sessions(element_set(&['a', 'b']), element_set(&['b', 'c']));
//!     let result = run_pair(initiator, responder).await;
//!     assert!(result.initiator_outcome.is_reconciled());
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use gensync_testkit::generators::{ConfigParams, config_from_params};
//!
//! proptest! {
//!     #[test]
//!     fn builds_are_deterministic(params: ConfigParams) {
//!         prop_assert_eq!(config_from_params(&params), config_from_params(&params));
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{element_set, free_port, run_pair, PairResult, SessionPairFixture};
pub use generators::{config_from_params, ConfigParams};
