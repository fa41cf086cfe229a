//! Session configuration and its builder.
//!
//! A [`Configuration`] is accumulated through [`ConfigurationBuilder`] setters,
//! validated and derived once in [`ConfigurationBuilder::build`], and never
//! mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::protocol::ProtocolIdentity;

/// Bit count of the base unit. Non-table protocols widen each entry by this factor.
pub const BITS_PER_UNIT: u32 = u8::BITS;

/// Default error tolerance (inverse log of the failure chance).
pub const DEFAULT_ERR: u32 = 8;
/// Default upper bound on set differences.
pub const DEFAULT_MBAR: u32 = 1;
/// Default base bit width per entry.
pub const DEFAULT_BITS: u32 = BITS_PER_UNIT;
/// Default partitions per level for partitioned protocols.
pub const DEFAULT_PARTITIONS: u32 = 3;
/// Default expected element count per set.
pub const DEFAULT_EXPECTED_ELEMENTS: u32 = 4;
/// Default host for both listening and connecting.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Transport selector, orthogonal to the protocol identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommunicationMode {
    /// Reliable, ordered byte stream.
    Socket,
}

/// Parameters that both peers of a session must agree on.
///
/// This is the subset of a [`Configuration`] that shapes the protocol
/// itself. Host, port and transport mode are excluded since they
/// legitimately differ between peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolParams {
    pub protocol: ProtocolIdentity,
    pub err: u32,
    pub mbar: u32,
    pub bits: u32,
    pub partitions: u32,
    pub expected_elements: u32,
}

/// Immutable, validated session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    protocol: ProtocolIdentity,
    comm: CommunicationMode,
    host: String,
    port: u16,
    err: u32,
    mbar: u32,
    bits: u32,
    partitions: u32,
    expected_elements: u32,
}

impl Configuration {
    pub fn protocol(&self) -> ProtocolIdentity {
        self.protocol
    }

    pub fn comm(&self) -> CommunicationMode {
        self.comm
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Error tolerance, as the inverse log of the failure probability.
    pub fn err(&self) -> u32 {
        self.err
    }

    /// Upper bound on the number of differing elements.
    pub fn mbar(&self) -> u32 {
        self.mbar
    }

    /// Derived bit width per entry.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    pub fn expected_elements(&self) -> u32 {
        self.expected_elements
    }

    /// The parameters a peer must match for the session to reconcile.
    pub fn params(&self) -> ProtocolParams {
        ProtocolParams {
            protocol: self.protocol,
            err: self.err,
            mbar: self.mbar,
            bits: self.bits,
            partitions: self.partitions,
            expected_elements: self.expected_elements,
        }
    }
}

/// Builder for a [`Configuration`].
///
/// Protocol, communication mode and port are required. Everything else falls
/// back to the harness defaults. `build` consumes the builder, so a builder
/// cannot be reused once it has produced a configuration.
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    protocol: Option<ProtocolIdentity>,
    comm: Option<CommunicationMode>,
    host: String,
    port: Option<u16>,
    err: u32,
    mbar: u32,
    base_bits: u32,
    partitions: u32,
    expected_elements: u32,
}

impl ConfigurationBuilder {
    /// Start building a configuration.
    pub fn new() -> Self {
        Self {
            protocol: None,
            comm: None,
            host: DEFAULT_HOST.to_string(),
            port: None,
            err: DEFAULT_ERR,
            mbar: DEFAULT_MBAR,
            base_bits: DEFAULT_BITS,
            partitions: DEFAULT_PARTITIONS,
            expected_elements: DEFAULT_EXPECTED_ELEMENTS,
        }
    }

    /// Set the protocol identity.
    pub fn protocol(mut self, protocol: ProtocolIdentity) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Set the communication mode.
    pub fn comm(mut self, comm: CommunicationMode) -> Self {
        self.comm = Some(comm);
        self
    }

    /// Set the host to connect to (initiator) or bind on (responder).
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the error tolerance.
    pub fn err(mut self, err: u32) -> Self {
        self.err = err;
        self
    }

    /// Set the maximum expected difference.
    pub fn mbar(mut self, mbar: u32) -> Self {
        self.mbar = mbar;
        self
    }

    /// Set the base bit width. The stored width is derived from it in `build`.
    pub fn bits(mut self, base_bits: u32) -> Self {
        self.base_bits = base_bits;
        self
    }

    /// Set the partition fan-out.
    pub fn partitions(mut self, partitions: u32) -> Self {
        self.partitions = partitions;
        self
    }

    /// Set the expected element count.
    pub fn expected_elements(mut self, expected_elements: u32) -> Self {
        self.expected_elements = expected_elements;
        self
    }

    /// Validate, derive and freeze the configuration.
    pub fn build(self) -> Result<Configuration> {
        let protocol = self
            .protocol
            .ok_or(CoreError::IncompleteConfiguration { field: "protocol" })?;
        let comm = self
            .comm
            .ok_or(CoreError::IncompleteConfiguration { field: "comm" })?;
        let port = self
            .port
            .ok_or(CoreError::IncompleteConfiguration { field: "port" })?;

        if port == 0 {
            return Err(CoreError::not_positive("port"));
        }
        if self.host.is_empty() {
            return Err(CoreError::InvalidParameter {
                name: "host",
                reason: "must not be empty".into(),
            });
        }
        for (name, value) in [
            ("err", self.err),
            ("mbar", self.mbar),
            ("bits", self.base_bits),
            ("partitions", self.partitions),
            ("expected_elements", self.expected_elements),
        ] {
            if value == 0 {
                return Err(CoreError::not_positive(name));
            }
        }

        let bits = derive_bits(protocol, self.base_bits)?;

        Ok(Configuration {
            protocol,
            comm,
            host: self.host,
            port,
            err: self.err,
            mbar: self.mbar,
            bits,
            partitions: self.partitions,
            expected_elements: self.expected_elements,
        })
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Table slots hold entries at the base width; every other family encodes
/// entries as field coefficients, widened by the unit's bit count.
fn derive_bits(protocol: ProtocolIdentity, base_bits: u32) -> Result<u32> {
    if protocol.is_table_based() {
        return Ok(base_bits);
    }
    base_bits
        .checked_mul(BITS_PER_UNIT)
        .ok_or_else(|| CoreError::InvalidParameter {
            name: "bits",
            reason: format!("{} widened by {} overflows", base_bits, BITS_PER_UNIT),
        })
}
