//! # GenSync Core
//!
//! Pure primitives for bootstrapping a set-reconciliation session: the
//! protocol catalog, the session configuration builder, and element sets.
//!
//! This crate contains no I/O and no networking.
//!
//! ## Key Types
//!
//! - [`ProtocolIdentity`] - One of the closed set of reconciliation protocols
//! - [`Configuration`] - Immutable, validated session parameters
//! - [`ConfigurationBuilder`] - Staged construction of a [`Configuration`]
//! - [`DataObject`] - An opaque, content-compared element
//! - [`ElementSet`] - The local collection that gets reconciled
//! - [`Role`] - Initiator or responder
//!
//! ## Usage
//!
//! ```rust
//! use gensync_core::{resolve, CommunicationMode, ConfigurationBuilder};
//!
//! let protocol = resolve("IBLTSync").unwrap();
//! let config = ConfigurationBuilder::new()
//!     .protocol(protocol)
//!     .comm(CommunicationMode::Socket)
//!     .port(8001)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.bits(), 8);
//! ```

pub mod config;
pub mod element;
pub mod error;
pub mod protocol;
pub mod types;

pub use config::{
    CommunicationMode, Configuration, ConfigurationBuilder, ProtocolParams, BITS_PER_UNIT,
};
pub use element::{DataObject, ElementSet};
pub use error::{CoreError, Result};
pub use protocol::{resolve, Interaction, ProtocolFamily, ProtocolIdentity};
pub use types::{ElementId, Role};
