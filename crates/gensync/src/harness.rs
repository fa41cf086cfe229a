//! Session bootstrap: defaults, configuration, execution and reporting.

use gensync_core::{
    resolve, CommunicationMode, Configuration, ConfigurationBuilder, CoreError, ElementSet,
    ProtocolIdentity, Role,
};
use gensync_sync::{SessionOptions, SessionOutcome, SyncSession};

use crate::error::{HarnessError, Result};

/// Usage was printed, or the session reconciled.
pub const EXIT_OK: i32 = 0;
/// Unknown protocol name or invalid configuration.
pub const EXIT_INVALID: i32 = 1;
/// The session ran and failed.
pub const EXIT_FAILED: i32 = 2;

/// Tuning parameters the harness feeds into the configuration builder.
///
/// Both peers must run with equal values for everything except host and
/// port, or the session fails with a parameter mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessDefaults {
    pub host: String,
    /// Port on which to connect or listen.
    pub port: u16,
    /// Inverse log of the error chance.
    pub err: u32,
    /// Max differences between server and client.
    pub mbar: u32,
    /// Base bits per entry.
    pub bits: u32,
    /// Partitions per level for partitioned protocols.
    pub partitions: u32,
    /// Expected number of elements per set.
    pub expected_elements: u32,
}

impl Default for HarnessDefaults {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            err: 8,
            mbar: 1,
            bits: u8::BITS,
            partitions: 3,
            expected_elements: 4,
        }
    }
}

impl HarnessDefaults {
    /// A builder seeded with these values for `protocol`.
    pub fn builder(&self, protocol: ProtocolIdentity) -> ConfigurationBuilder {
        ConfigurationBuilder::new()
            .protocol(protocol)
            .comm(CommunicationMode::Socket)
            .host(self.host.clone())
            .port(self.port)
            .err(self.err)
            .mbar(self.mbar)
            .bits(self.bits)
            .partitions(self.partitions)
            .expected_elements(self.expected_elements)
    }
}

/// Resolve a protocol name and build its configuration.
pub fn configure(protocol_name: &str, defaults: &HarnessDefaults) -> Result<Configuration> {
    let protocol = resolve(protocol_name).map_err(|e| match e {
        CoreError::UnknownProtocol(name) => HarnessError::UnknownProtocol(name),
        other => HarnessError::Core(other),
    })?;
    Ok(defaults.builder(protocol).build()?)
}

/// The demo elements: `{a, b, c}` plus `d` for the initiator or `e` for the
/// responder.
pub fn demo_elements(role: Role) -> ElementSet {
    let mut elements: ElementSet = ['a', 'b', 'c'].into_iter().collect();
    match role {
        Role::Initiator => elements.add('d'),
        Role::Responder => elements.add('e'),
    };
    elements
}

/// Configure and run one session with the demo elements.
///
/// Returns `Err` only for bootstrap failures. A session that ran and failed
/// comes back as `Ok(SessionOutcome::Failed { .. })`.
pub async fn run(
    role: Role,
    protocol_name: &str,
    defaults: &HarnessDefaults,
    options: SessionOptions,
) -> Result<(SessionOutcome, ElementSet)> {
    let config = configure(protocol_name, defaults)?;
    tracing::info!(
        "{} running {} (err={}, mbar={}, bits={}, partitions={}, expected={})",
        role,
        config.protocol(),
        config.err(),
        config.mbar(),
        config.bits(),
        config.partitions(),
        config.expected_elements()
    );

    let mut session = SyncSession::new(config, demo_elements(role), role).with_options(options);
    let outcome = session.begin().await?;
    Ok((outcome, session.into_elements()))
}

/// Process exit status for a session outcome.
pub fn exit_code(outcome: &SessionOutcome) -> i32 {
    if outcome.is_reconciled() {
        EXIT_OK
    } else {
        EXIT_FAILED
    }
}

/// One-line, user-facing description of the outcome.
pub fn summary(outcome: &SessionOutcome) -> String {
    match outcome {
        SessionOutcome::Reconciled { learned, sent, .. } => {
            format!("sync succeeded: learned {}, sent {}.", learned, sent)
        }
        SessionOutcome::Failed { kind, message, .. } => {
            format!("sync failed ({:?}): {}", kind, message)
        }
    }
}

/// Traffic and timing observations in `Key: value` lines, one record per
/// session.
pub fn observation(outcome: &SessionOutcome) -> String {
    let stats = outcome.stats();
    [
        format!("Bytes Transmitted: {}", stats.transfer.bytes_sent),
        format!("Bytes Received: {}", stats.transfer.bytes_received),
        format!(
            "Communication Time(s): {:.6}",
            stats.communication_time.as_secs_f64()
        ),
        format!("Idle Time(s): {:.6}", stats.idle_time.as_secs_f64()),
        format!(
            "Computation Time(s): {:.6}",
            stats.computation_time.as_secs_f64()
        ),
    ]
    .join("\n")
}
