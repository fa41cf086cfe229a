//! Sync protocol message types.
//!
//! These messages are exchanged by the anti-entropy engine. Every message
//! travels as a single CBOR frame.

use gensync_core::{DataObject, ElementId, ProtocolParams};
use serde::{Deserialize, Serialize};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 0;

/// Message size limits.
pub mod limits {
    /// Max ids in one Digest or Need message; longer lists are chunked.
    /// A full chunk encodes to roughly 4 MiB, well under the frame cap.
    pub const MAX_IDS_PER_MESSAGE: usize = 65_536;
    /// Max elements in one Elements message; larger transfers are chunked.
    pub const MAX_ELEMENTS_PER_MESSAGE: usize = 1024;
}

/// Sync protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// Handshake: announce version and the parameters this side runs with.
    Hello {
        protocol_version: u8,
        params: ProtocolParams,
    },

    /// State advertisement: one chunk of the element ids this side holds.
    Digest {
        /// Order-independent digest of the whole set, repeated in every chunk.
        set_hash: ElementId,
        ids: Vec<ElementId>,
        /// Another Digest chunk follows.
        more: bool,
    },

    /// Request the elements with these ids. May be empty.
    Need {
        ids: Vec<ElementId>,
        /// Another Need chunk follows.
        more: bool,
    },

    /// Provide requested elements.
    Elements { elements: Vec<DataObject> },

    /// Responder is finished; carries how many elements it learned.
    Done { learned: u64 },

    /// Error condition.
    Error {
        /// Error code for programmatic handling.
        code: SyncErrorCode,
        /// Human-readable description.
        message: String,
    },
}

impl SyncMessage {
    /// Short name of the variant, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::Hello { .. } => "Hello",
            SyncMessage::Digest { .. } => "Digest",
            SyncMessage::Need { .. } => "Need",
            SyncMessage::Elements { .. } => "Elements",
            SyncMessage::Done { .. } => "Done",
            SyncMessage::Error { .. } => "Error",
        }
    }

    /// Check if this message respects size limits.
    pub fn validate_limits(&self) -> Result<(), &'static str> {
        match self {
            SyncMessage::Digest { ids, .. } | SyncMessage::Need { ids, .. } => {
                if ids.len() > limits::MAX_IDS_PER_MESSAGE {
                    return Err("too many ids");
                }
            }
            SyncMessage::Elements { elements } => {
                if elements.len() > limits::MAX_ELEMENTS_PER_MESSAGE {
                    return Err("too many elements");
                }
            }
            SyncMessage::Hello { .. } | SyncMessage::Done { .. } | SyncMessage::Error { .. } => {}
        }
        Ok(())
    }
}

/// Error codes for sync protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum SyncErrorCode {
    /// Protocol version mismatch.
    VersionMismatch = 1,
    /// Protocol identity or derived parameters differ.
    ParameterMismatch = 2,
    /// Invalid message format or sequencing.
    InvalidMessage = 3,
    /// Internal error on peer.
    InternalError = 4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_limits_valid() {
        let msg = SyncMessage::Need {
            ids: vec![ElementId::hash(b"a")],
            more: false,
        };
        assert!(msg.validate_limits().is_ok());
    }

    #[test]
    fn test_message_limits_exceeded() {
        let msg = SyncMessage::Elements {
            elements: (0..=limits::MAX_ELEMENTS_PER_MESSAGE)
                .map(|i| DataObject::from(i.to_string()))
                .collect(),
        };
        assert_eq!(msg.validate_limits(), Err("too many elements"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(SyncMessage::Done { learned: 0 }.kind(), "Done");
        let need = SyncMessage::Need {
            ids: vec![],
            more: false,
        };
        assert_eq!(need.kind(), "Need");
    }
}
