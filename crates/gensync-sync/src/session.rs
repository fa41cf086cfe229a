//! Sync session state machine.
//!
//! `Configured → Connecting → Exchanging → {Reconciled | Failed}`.

use std::time::{Duration, Instant};

use gensync_core::{CommunicationMode, Configuration, ElementSet, Role};

use crate::engine::{AntiEntropyEngine, SyncEngine};
use crate::error::{Result, SyncError};
use crate::transport::{tcp, TcpTransport, TransferStats, Transport};

/// Lifecycle state of a [`SyncSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Holds configuration, elements and role; no I/O yet.
    Configured,
    /// Establishing the transport.
    Connecting,
    /// The engine is reconciling over the transport.
    Exchanging,
    /// Terminal success.
    Reconciled,
    /// Terminal failure.
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Reconciled | SessionState::Failed)
    }
}

/// Why a session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Connection refused, reset, timed out, or listen failure.
    Transport,
    /// The engine reported incompatible parameters or a decoding failure.
    Reconciliation,
}

/// Observations about one session: traffic and timing.
///
/// Communication, idle and computation time partition the time spent in
/// Exchanging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub transfer: TransferStats,
    /// Time spent writing and reading frames.
    pub communication_time: Duration,
    /// Time spent waiting for the peer to send.
    pub idle_time: Duration,
    /// The rest of Exchanging: engine work between transport calls.
    pub computation_time: Duration,
    /// Time from `begin` to the terminal state, connecting included.
    pub total_time: Duration,
}

/// Terminal result of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The local set now reflects what the protocol lets this side learn.
    Reconciled {
        learned: usize,
        sent: usize,
        stats: SessionStats,
    },
    /// The session terminated without reconciling. The element set may
    /// hold a partial update.
    Failed {
        kind: FailureKind,
        message: String,
        stats: SessionStats,
    },
}

impl SessionOutcome {
    pub fn is_reconciled(&self) -> bool {
        matches!(self, SessionOutcome::Reconciled { .. })
    }

    /// Elements learned plus elements sent. Zero for failed sessions.
    pub fn exchanged(&self) -> usize {
        match self {
            SessionOutcome::Reconciled { learned, sent, .. } => learned + sent,
            SessionOutcome::Failed { .. } => 0,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SessionOutcome::Reconciled { .. } => None,
            SessionOutcome::Failed { kind, .. } => Some(*kind),
        }
    }

    pub fn stats(&self) -> &SessionStats {
        match self {
            SessionOutcome::Reconciled { stats, .. } | SessionOutcome::Failed { stats, .. } => {
                stats
            }
        }
    }
}

/// Transport-level knobs. None of these are protocol parameters, so peers
/// need not agree on them.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How long to wait for the peer during Connecting. `None` waits forever.
    pub connect_timeout: Option<Duration>,
    /// Delay between connection attempts while the responder is not yet listening.
    pub retry_interval: Duration,
    /// How long the exchange may take. `None` waits forever.
    pub exchange_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            retry_interval: Duration::from_millis(100),
            exchange_timeout: None,
        }
    }
}

/// One reconciliation session between this process and a single peer.
pub struct SyncSession<E: SyncEngine = AntiEntropyEngine> {
    config: Configuration,
    elements: ElementSet,
    role: Role,
    engine: E,
    options: SessionOptions,
    state: SessionState,
    outcome: Option<SessionOutcome>,
}

impl SyncSession<AntiEntropyEngine> {
    /// Create a session in the `Configured` state.
    pub fn new(config: Configuration, elements: ElementSet, role: Role) -> Self {
        Self {
            config,
            elements,
            role,
            engine: AntiEntropyEngine,
            options: SessionOptions::default(),
            state: SessionState::Configured,
            outcome: None,
        }
    }
}

impl<E: SyncEngine> SyncSession<E> {
    /// Swap in a different reconciliation engine.
    pub fn with_engine<F: SyncEngine>(self, engine: F) -> SyncSession<F> {
        SyncSession {
            config: self.config,
            elements: self.elements,
            role: self.role,
            engine,
            options: self.options,
            state: self.state,
            outcome: self.outcome,
        }
    }

    /// Set transport options.
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn elements(&self) -> &ElementSet {
        &self.elements
    }

    pub fn into_elements(self) -> ElementSet {
        self.elements
    }

    /// The terminal outcome, once `begin` has run.
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    /// Connect, exchange, and report the outcome.
    ///
    /// Transport and reconciliation failures are reported as
    /// [`SessionOutcome::Failed`]. `Err` is returned only for API misuse:
    /// calling `begin` on a session that is not `Configured`.
    pub async fn begin(&mut self) -> Result<SessionOutcome> {
        self.ensure_configured()?;
        let started = Instant::now();

        self.transition(SessionState::Connecting);
        let transport = match self.connect().await {
            Ok(transport) => transport,
            Err(e) => {
                let stats = SessionStats {
                    total_time: started.elapsed(),
                    ..SessionStats::default()
                };
                return Ok(self.finish(Err(e), stats));
            }
        };

        Ok(self.exchange(transport, started).await)
    }

    /// Run the exchange over a transport the caller already established,
    /// skipping Connecting.
    pub async fn begin_over<T: Transport>(&mut self, transport: T) -> Result<SessionOutcome> {
        self.ensure_configured()?;
        let started = Instant::now();
        Ok(self.exchange(transport, started).await)
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.state != SessionState::Configured {
            return Err(SyncError::InvalidState { state: self.state });
        }
        Ok(())
    }

    async fn connect(&self) -> Result<TcpTransport> {
        let host = self.config.host();
        let port = self.config.port();

        match self.config.comm() {
            CommunicationMode::Socket => match self.role {
                Role::Initiator => {
                    tracing::info!("connecting to {}:{}...", host, port);
                    tcp::connect(
                        host,
                        port,
                        self.options.connect_timeout,
                        self.options.retry_interval,
                    )
                    .await
                }
                Role::Responder => {
                    tracing::info!("listening on {}:{}...", host, port);
                    tcp::accept(host, port, self.options.connect_timeout).await
                }
            },
        }
    }

    async fn exchange<T: Transport>(&mut self, mut transport: T, started: Instant) -> SessionOutcome {
        self.transition(SessionState::Exchanging);
        let exchange_started = Instant::now();
        let limit = self.options.exchange_timeout;

        let run = self
            .engine
            .run(self.role, &self.config, &mut self.elements, &mut transport);
        let result = match limit {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Timeout(format!(
                    "exchange did not finish within {:?}",
                    limit
                ))),
            },
            None => run.await,
        };

        // The connection is released on every exit path.
        if let Err(e) = transport.close().await {
            tracing::warn!("closing connection to {} failed: {}", transport.peer(), e);
        }

        let exchanging = exchange_started.elapsed();
        let transfer = transport.stats();
        let stats = SessionStats {
            transfer,
            communication_time: transfer.io_time,
            idle_time: transfer.idle_time,
            computation_time: exchanging.saturating_sub(transfer.io_time + transfer.idle_time),
            total_time: started.elapsed(),
        };
        self.finish(result.map(|r| (r.learned, r.sent)), stats)
    }

    fn finish(&mut self, result: Result<(usize, usize)>, stats: SessionStats) -> SessionOutcome {
        let outcome = match result {
            Ok((learned, sent)) => {
                self.transition(SessionState::Reconciled);
                tracing::info!(
                    "sync succeeded: learned {}, sent {}, {} bytes out, {} bytes in",
                    learned,
                    sent,
                    stats.transfer.bytes_sent,
                    stats.transfer.bytes_received
                );
                SessionOutcome::Reconciled {
                    learned,
                    sent,
                    stats,
                }
            }
            Err(e) => {
                self.transition(SessionState::Failed);
                tracing::warn!("sync failed: {}", e);
                SessionOutcome::Failed {
                    kind: e.failure_kind(),
                    message: e.to_string(),
                    stats,
                }
            }
        };
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!("{} session: {:?} -> {:?}", self.role, self.state, next);
        self.state = next;
    }
}
