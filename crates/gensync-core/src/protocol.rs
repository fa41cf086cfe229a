//! The protocol catalog.
//!
//! Maps the human-readable protocol names accepted on the command line to a
//! [`ProtocolIdentity`], and classifies each identity by structural family.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// A reconciliation protocol drawn from the closed catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolIdentity {
    /// Characteristic polynomial interpolation, single round.
    CpiSync,
    /// Characteristic polynomial interpolation with recursive partitioning.
    InteractiveCpiSync,
    /// Characteristic polynomial interpolation, only the responder learns.
    OneWayCpiSync,
    /// Ship everything, no encoding.
    FullSync,
    /// Invertible Bloom lookup table, single round.
    IbltSync,
    /// Invertible Bloom lookup table, only the responder learns.
    OneWayIbltSync,
}

/// How a protocol encodes set membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolFamily {
    /// Polynomial coefficients over a finite field.
    Interpolation,
    /// Fixed-size hashed slots.
    Table,
    /// The whole set is transferred.
    FullTransfer,
}

/// How many rounds a protocol takes and who learns from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interaction {
    /// A single exchange, both parties learn.
    OneShot,
    /// Multiple rounds, both parties learn.
    Interactive,
    /// A single exchange, only the responder learns.
    OneWay,
}

impl ProtocolIdentity {
    /// Every identity in the catalog.
    pub const ALL: [ProtocolIdentity; 6] = [
        ProtocolIdentity::CpiSync,
        ProtocolIdentity::InteractiveCpiSync,
        ProtocolIdentity::OneWayCpiSync,
        ProtocolIdentity::FullSync,
        ProtocolIdentity::IbltSync,
        ProtocolIdentity::OneWayIbltSync,
    ];

    /// The catalog name, as accepted by [`resolve`].
    pub const fn name(self) -> &'static str {
        match self {
            ProtocolIdentity::CpiSync => "CPISync",
            ProtocolIdentity::InteractiveCpiSync => "InterCPISync",
            ProtocolIdentity::OneWayCpiSync => "OneWayCPISync",
            ProtocolIdentity::FullSync => "FullSync",
            ProtocolIdentity::IbltSync => "IBLTSync",
            ProtocolIdentity::OneWayIbltSync => "OneWayIBLTSync",
        }
    }

    pub const fn family(self) -> ProtocolFamily {
        match self {
            ProtocolIdentity::CpiSync
            | ProtocolIdentity::InteractiveCpiSync
            | ProtocolIdentity::OneWayCpiSync => ProtocolFamily::Interpolation,
            ProtocolIdentity::FullSync => ProtocolFamily::FullTransfer,
            ProtocolIdentity::IbltSync | ProtocolIdentity::OneWayIbltSync => ProtocolFamily::Table,
        }
    }

    pub const fn interaction(self) -> Interaction {
        match self {
            ProtocolIdentity::InteractiveCpiSync => Interaction::Interactive,
            ProtocolIdentity::OneWayCpiSync | ProtocolIdentity::OneWayIbltSync => {
                Interaction::OneWay
            }
            ProtocolIdentity::CpiSync | ProtocolIdentity::FullSync | ProtocolIdentity::IbltSync => {
                Interaction::OneShot
            }
        }
    }

    /// Check if this protocol belongs to the table-based family.
    pub const fn is_table_based(self) -> bool {
        matches!(self.family(), ProtocolFamily::Table)
    }

    /// Check if only the responder learns the other side's elements.
    pub const fn is_one_way(self) -> bool {
        matches!(self.interaction(), Interaction::OneWay)
    }
}

/// Resolve a catalog name to its protocol identity.
///
/// Matching is exact and case-sensitive.
pub fn resolve(name: &str) -> Result<ProtocolIdentity> {
    ProtocolIdentity::ALL
        .into_iter()
        .find(|p| p.name() == name)
        .ok_or_else(|| CoreError::UnknownProtocol(name.to_string()))
}

impl FromStr for ProtocolIdentity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        resolve(s)
    }
}

impl fmt::Display for ProtocolIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
