//! Strong type definitions for GenSync.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte element identifier, computed as Blake3(element bytes).
///
/// This is the content-address of a [`DataObject`](crate::DataObject). Two
/// elements with the same content have the same ElementId, which is what lets
/// peers compare sets without shipping the elements themselves.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub [u8; 32]);

impl ElementId {
    /// Create a new ElementId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash arbitrary content into an ElementId.
    pub fn hash(content: &[u8]) -> Self {
        Self(*blake3::hash(content).as_bytes())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for ElementId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Which side of the session this process plays.
///
/// The initiator opens the transport and speaks first; the responder listens
/// and accepts exactly one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Initiator,
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Responder => f.write_str("responder"),
        }
    }
}
