//! The synchronization engine seam.
//!
//! The session layer hands an established transport to a [`SyncEngine`],
//! which performs the actual reconciliation. The contract: given a local set
//! and a connected peer running the same protocol identity with matching
//! parameters, both sides converge to the union of their original sets (or,
//! for one-way protocols, the responder learns the initiator's elements), or
//! an error is reported.
//!
//! [`AntiEntropyEngine`] is the bundled implementation. It compares content
//! digests and ships the missing elements in full, for every protocol
//! identity. Protocol-specific encodings (interpolation, lookup tables) plug in
//! behind the same trait.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use gensync_core::{Configuration, DataObject, ElementId, ElementSet, Role};

use crate::error::{Result, SyncError};
use crate::messages::{limits, SyncErrorCode, SyncMessage, PROTOCOL_VERSION};
use crate::transport::Transport;

/// What an engine run changed locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeReport {
    /// Elements learned from the peer and added to the local set.
    pub learned: usize,
    /// Elements shipped to the peer.
    pub sent: usize,
}

/// Reconciliation engine driven by a [`SyncSession`](crate::SyncSession).
#[async_trait]
pub trait SyncEngine: Send + Sync {
    /// Run the initiator side over an established transport.
    async fn run_as_initiator(
        &self,
        config: &Configuration,
        elements: &mut ElementSet,
        transport: &mut dyn Transport,
    ) -> Result<ExchangeReport>;

    /// Run the responder side over an established transport.
    async fn run_as_responder(
        &self,
        config: &Configuration,
        elements: &mut ElementSet,
        transport: &mut dyn Transport,
    ) -> Result<ExchangeReport>;

    /// Dispatch on role.
    async fn run(
        &self,
        role: Role,
        config: &Configuration,
        elements: &mut ElementSet,
        transport: &mut dyn Transport,
    ) -> Result<ExchangeReport> {
        match role {
            Role::Initiator => self.run_as_initiator(config, elements, transport).await,
            Role::Responder => self.run_as_responder(config, elements, transport).await,
        }
    }
}

/// Digest-based anti-entropy reconciliation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AntiEntropyEngine;

/// Local view of the set plus what the peer advertised.
struct Comparison {
    local: BTreeMap<ElementId, DataObject>,
    peer: BTreeSet<ElementId>,
    in_agreement: bool,
}

impl Comparison {
    /// Ids the peer holds that we do not.
    fn missing(&self) -> Vec<ElementId> {
        self.peer
            .iter()
            .filter(|id| !self.local.contains_key(*id))
            .copied()
            .collect()
    }
}

#[async_trait]
impl SyncEngine for AntiEntropyEngine {
    async fn run_as_initiator(
        &self,
        config: &Configuration,
        elements: &mut ElementSet,
        transport: &mut dyn Transport,
    ) -> Result<ExchangeReport> {
        // Hello: we speak first, the responder validates.
        transport.send(&hello(config)).await?;
        let reply = transport.recv().await?;
        check_hello(config, reply)?;

        // Digest
        send_digest(transport, elements).await?;
        let comparison = recv_digest(transport, elements).await?;
        if comparison.in_agreement {
            tracing::info!("sets already agree, nothing to exchange");
            return Ok(ExchangeReport::default());
        }

        // Only the responder learns in one-way protocols.
        let wanted = if config.protocol().is_one_way() {
            Vec::new()
        } else {
            comparison.missing()
        };
        send_need(transport, &wanted).await?;
        let learned = receive_elements(transport, elements, wanted).await?;

        let request = recv_need(transport).await?;
        let sent = serve(transport, &comparison, request).await?;

        match transport.recv().await? {
            SyncMessage::Done { learned: peer_learned } => {
                tracing::debug!("peer learned {} elements", peer_learned);
            }
            other => return Err(unexpected("Done", other)),
        }

        Ok(ExchangeReport { learned, sent })
    }

    async fn run_as_responder(
        &self,
        config: &Configuration,
        elements: &mut ElementSet,
        transport: &mut dyn Transport,
    ) -> Result<ExchangeReport> {
        // Hello: validate before answering so a mismatched peer learns why.
        let greeting = transport.recv().await?;
        if let Err(e) = check_hello(config, greeting) {
            reject(transport, &e).await;
            return Err(e);
        }
        transport.send(&hello(config)).await?;

        // Digest
        let comparison = recv_digest(transport, elements).await?;
        send_digest(transport, elements).await?;
        if comparison.in_agreement {
            tracing::info!("sets already agree, nothing to exchange");
            return Ok(ExchangeReport::default());
        }

        let request = recv_need(transport).await?;
        let sent = serve(transport, &comparison, request).await?;

        let wanted = comparison.missing();
        send_need(transport, &wanted).await?;
        let learned = receive_elements(transport, elements, wanted).await?;

        transport
            .send(&SyncMessage::Done {
                learned: learned as u64,
            })
            .await?;

        Ok(ExchangeReport { learned, sent })
    }
}

fn hello(config: &Configuration) -> SyncMessage {
    SyncMessage::Hello {
        protocol_version: PROTOCOL_VERSION,
        params: config.params(),
    }
}

fn check_hello(config: &Configuration, message: SyncMessage) -> Result<()> {
    match message {
        SyncMessage::Hello {
            protocol_version,
            params,
        } => {
            if protocol_version != PROTOCOL_VERSION {
                return Err(SyncError::VersionMismatch {
                    local: PROTOCOL_VERSION,
                    peer: protocol_version,
                });
            }
            let local = config.params();
            if params != local {
                return Err(SyncError::ParameterMismatch {
                    local,
                    peer: params,
                });
            }
            Ok(())
        }
        other => Err(unexpected("Hello", other)),
    }
}

/// Tell the peer why we are giving up. Best effort.
async fn reject(transport: &mut dyn Transport, error: &SyncError) {
    let code = match error {
        SyncError::VersionMismatch { .. } => SyncErrorCode::VersionMismatch,
        SyncError::ParameterMismatch { .. } => SyncErrorCode::ParameterMismatch,
        SyncError::InvalidMessage(_) => SyncErrorCode::InvalidMessage,
        // The peer already failed and told us so.
        SyncError::PeerError { .. } => return,
        _ => SyncErrorCode::InternalError,
    };
    let message = SyncMessage::Error {
        code,
        message: error.to_string(),
    };
    if let Err(e) = transport.send(&message).await {
        tracing::warn!("could not notify peer of failure: {}", e);
    }
}

/// Send `ids` in chunks of at most `MAX_IDS_PER_MESSAGE`. An empty list still
/// goes out as one empty chunk.
async fn send_ids<F>(transport: &mut dyn Transport, ids: &[ElementId], wrap: F) -> Result<()>
where
    F: Fn(Vec<ElementId>, bool) -> SyncMessage + Send,
{
    let mut chunks = ids.chunks(limits::MAX_IDS_PER_MESSAGE).peekable();
    if chunks.peek().is_none() {
        return transport.send(&wrap(Vec::new(), false)).await;
    }
    while let Some(chunk) = chunks.next() {
        let more = chunks.peek().is_some();
        transport.send(&wrap(chunk.to_vec(), more)).await?;
    }
    Ok(())
}

async fn send_digest(transport: &mut dyn Transport, elements: &ElementSet) -> Result<()> {
    let set_hash = elements.digest();
    let ids: Vec<ElementId> = elements.ids().map(|(id, _)| id).collect();
    send_ids(transport, &ids, move |ids, more| SyncMessage::Digest {
        set_hash,
        ids,
        more,
    })
    .await
}

async fn send_need(transport: &mut dyn Transport, ids: &[ElementId]) -> Result<()> {
    send_ids(transport, ids, |ids, more| SyncMessage::Need { ids, more }).await
}

/// Collect every Digest chunk from the peer and compare it with the local set.
async fn recv_digest(transport: &mut dyn Transport, elements: &ElementSet) -> Result<Comparison> {
    let mut set_hash: Option<ElementId> = None;
    let mut peer = BTreeSet::new();

    loop {
        match transport.recv().await? {
            SyncMessage::Digest {
                set_hash: chunk_hash,
                ids,
                more,
            } => {
                if *set_hash.get_or_insert(chunk_hash) != chunk_hash {
                    return Err(SyncError::InvalidMessage(
                        "digest chunks disagree on the set hash".into(),
                    ));
                }
                peer.extend(ids);
                if !more {
                    break;
                }
            }
            other => return Err(unexpected("Digest", other)),
        }
    }

    let local: BTreeMap<ElementId, DataObject> = elements
        .ids()
        .map(|(id, element)| (id, element.clone()))
        .collect();
    Ok(Comparison {
        in_agreement: set_hash == Some(elements.digest()),
        local,
        peer,
    })
}

/// Collect every Need chunk from the peer.
async fn recv_need(transport: &mut dyn Transport) -> Result<Vec<ElementId>> {
    let mut wanted = Vec::new();
    loop {
        match transport.recv().await? {
            SyncMessage::Need { ids, more } => {
                wanted.extend(ids);
                if !more {
                    return Ok(wanted);
                }
            }
            other => return Err(unexpected("Need", other)),
        }
    }
}

/// Ship the requested elements in chunks. Every requested id must be one we
/// advertised.
async fn serve(
    transport: &mut dyn Transport,
    comparison: &Comparison,
    request: Vec<ElementId>,
) -> Result<usize> {
    let mut batch = Vec::new();
    let mut sent = 0;

    for id in request {
        let element = match comparison.local.get(&id) {
            Some(element) => element.clone(),
            None => {
                let e = SyncError::InvalidMessage(format!("peer requested unknown element {}", id));
                reject(transport, &e).await;
                return Err(e);
            }
        };
        batch.push(element);
        sent += 1;

        if batch.len() >= limits::MAX_ELEMENTS_PER_MESSAGE {
            let elements = std::mem::take(&mut batch);
            transport.send(&SyncMessage::Elements { elements }).await?;
        }
    }

    if !batch.is_empty() {
        transport
            .send(&SyncMessage::Elements { elements: batch })
            .await?;
    }
    Ok(sent)
}

/// Read Elements messages until every wanted id has arrived, adding each
/// element to the local set.
async fn receive_elements(
    transport: &mut dyn Transport,
    elements: &mut ElementSet,
    wanted: Vec<ElementId>,
) -> Result<usize> {
    let mut pending: BTreeSet<ElementId> = wanted.into_iter().collect();
    let mut learned = 0;

    while !pending.is_empty() {
        match transport.recv().await? {
            SyncMessage::Elements { elements: batch } => {
                for element in batch {
                    if !pending.remove(&element.id()) {
                        let e = SyncError::InvalidMessage(format!(
                            "peer sent unrequested element {}",
                            element.id()
                        ));
                        reject(transport, &e).await;
                        return Err(e);
                    }
                    if elements.add(element) {
                        learned += 1;
                    }
                }
            }
            other => return Err(unexpected("Elements", other)),
        }
    }

    Ok(learned)
}

fn unexpected(expected: &str, got: SyncMessage) -> SyncError {
    match got {
        SyncMessage::Error { code, message } => SyncError::PeerError { code, message },
        other => SyncError::InvalidMessage(format!("expected {}, got {}", expected, other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory;
    use gensync_core::{CommunicationMode, ConfigurationBuilder, ProtocolIdentity};

    fn config(protocol: ProtocolIdentity, bits: u32) -> Configuration {
        ConfigurationBuilder::new()
            .protocol(protocol)
            .comm(CommunicationMode::Socket)
            .port(8001)
            .bits(bits)
            .build()
            .unwrap()
    }

    fn set(items: &[char]) -> ElementSet {
        items.iter().copied().collect()
    }

    async fn run_pair(
        initiator_config: Configuration,
        responder_config: Configuration,
        mut initiator_set: ElementSet,
        mut responder_set: ElementSet,
    ) -> (
        Result<ExchangeReport>,
        Result<ExchangeReport>,
        ElementSet,
        ElementSet,
    ) {
        let (mut a, mut b) = memory::pair();
        let engine = AntiEntropyEngine;
        let (ri, rr) = tokio::join!(
            engine.run(Role::Initiator, &initiator_config, &mut initiator_set, &mut a),
            engine.run(Role::Responder, &responder_config, &mut responder_set, &mut b),
        );
        (ri, rr, initiator_set, responder_set)
    }

    #[tokio::test]
    async fn test_two_way_union() {
        let c = config(ProtocolIdentity::CpiSync, 8);
        let (ri, rr, si, sr) = run_pair(
            c.clone(),
            c,
            set(&['a', 'b', 'c', 'd']),
            set(&['a', 'b', 'c', 'e']),
        )
        .await;

        assert_eq!(ri.unwrap(), ExchangeReport { learned: 1, sent: 1 });
        assert_eq!(rr.unwrap(), ExchangeReport { learned: 1, sent: 1 });
        assert_eq!(si, set(&['a', 'b', 'c', 'd', 'e']));
        assert_eq!(si, sr);
    }

    #[tokio::test]
    async fn test_one_way_only_responder_learns() {
        let c = config(ProtocolIdentity::OneWayIbltSync, 8);
        let (ri, rr, si, sr) = run_pair(
            c.clone(),
            c,
            set(&['a', 'b', 'c', 'd']),
            set(&['a', 'b', 'c', 'e']),
        )
        .await;

        assert_eq!(ri.unwrap(), ExchangeReport { learned: 0, sent: 1 });
        assert_eq!(rr.unwrap(), ExchangeReport { learned: 1, sent: 0 });
        assert_eq!(si, set(&['a', 'b', 'c', 'd']));
        assert_eq!(sr, set(&['a', 'b', 'c', 'd', 'e']));
    }

    #[tokio::test]
    async fn test_equal_sets_exchange_nothing() {
        let c = config(ProtocolIdentity::FullSync, 8);
        let (ri, rr, si, sr) =
            run_pair(c.clone(), c, set(&['x', 'y']), set(&['y', 'x'])).await;

        assert_eq!(ri.unwrap(), ExchangeReport::default());
        assert_eq!(rr.unwrap(), ExchangeReport::default());
        assert_eq!(si, sr);
    }

    #[tokio::test]
    async fn test_empty_side_learns_everything() {
        let c = config(ProtocolIdentity::InteractiveCpiSync, 8);
        let (ri, rr, si, sr) = run_pair(c.clone(), c, set(&[]), set(&['p', 'q', 'r'])).await;

        assert_eq!(ri.unwrap().learned, 3);
        assert_eq!(rr.unwrap().sent, 3);
        assert_eq!(si, sr);
    }

    #[tokio::test]
    async fn test_large_transfer_is_chunked() {
        let c = config(ProtocolIdentity::IbltSync, 8);
        let big: ElementSet = (0..(limits::MAX_ELEMENTS_PER_MESSAGE * 2 + 5))
            .map(|i| i.to_string())
            .collect();
        let (ri, rr, si, sr) = run_pair(c.clone(), c, big.clone(), ElementSet::new()).await;

        assert_eq!(ri.unwrap().sent, big.len());
        assert_eq!(rr.unwrap().learned, big.len());
        assert_eq!(si, sr);
    }

    #[tokio::test]
    async fn test_long_id_lists_span_several_messages() {
        let c = config(ProtocolIdentity::CpiSync, 8);
        let big: ElementSet = (0..(limits::MAX_IDS_PER_MESSAGE + 10))
            .map(|i| i.to_string())
            .collect();
        let (mut a, mut b) = memory::pair();
        let mut initiator_set = big.clone();
        let mut responder_set = set(&['x']);

        let engine = AntiEntropyEngine;
        let (ri, rr) = tokio::join!(
            engine.run(Role::Initiator, &c, &mut initiator_set, &mut a),
            engine.run(Role::Responder, &c, &mut responder_set, &mut b),
        );

        // Digest from the initiator and Need from the responder both need two chunks.
        assert_eq!(ri.unwrap(), ExchangeReport { learned: 1, sent: big.len() });
        assert_eq!(rr.unwrap(), ExchangeReport { learned: big.len(), sent: 1 });
        assert_eq!(initiator_set, responder_set);
        assert_eq!(initiator_set.len(), big.len() + 1);
        assert!(a.stats().messages_sent > b.stats().messages_sent);
    }

    #[tokio::test]
    async fn test_digest_chunks_with_different_hashes_rejected() {
        let (mut a, mut b) = memory::pair();
        let local = set(&['a']);
        for (hash, more) in [(ElementId::hash(b"one"), true), (ElementId::hash(b"two"), false)] {
            a.send(&SyncMessage::Digest {
                set_hash: hash,
                ids: vec![],
                more,
            })
            .await
            .unwrap();
        }

        let err = recv_digest(&mut b, &local).await.err().unwrap();
        assert!(matches!(err, SyncError::InvalidMessage(_)));
    }

    #[tokio::test]
    async fn test_mismatched_bits_fail_both_sides() {
        let (ri, rr, _, _) = run_pair(
            config(ProtocolIdentity::CpiSync, 8),
            config(ProtocolIdentity::CpiSync, 16),
            set(&['a']),
            set(&['b']),
        )
        .await;

        assert!(matches!(
            ri.unwrap_err(),
            SyncError::PeerError {
                code: SyncErrorCode::ParameterMismatch,
                ..
            }
        ));
        assert!(matches!(rr.unwrap_err(), SyncError::ParameterMismatch { .. }));
    }

    #[tokio::test]
    async fn test_mismatched_protocol_fails() {
        let (ri, rr, _, _) = run_pair(
            config(ProtocolIdentity::IbltSync, 8),
            config(ProtocolIdentity::OneWayIbltSync, 8),
            set(&['a']),
            set(&['b']),
        )
        .await;

        assert_eq!(
            ri.unwrap_err().failure_kind(),
            crate::FailureKind::Reconciliation
        );
        assert_eq!(
            rr.unwrap_err().failure_kind(),
            crate::FailureKind::Reconciliation
        );
    }

    #[tokio::test]
    async fn test_unknown_request_rejected() {
        let c = config(ProtocolIdentity::FullSync, 8);
        let (mut a, mut b) = memory::pair();
        let mut local = set(&['a']);

        let responder = AntiEntropyEngine.run_as_responder(&c, &mut local, &mut b);
        let rogue = async {
            a.send(&hello(&c)).await.unwrap();
            a.recv().await.unwrap();
            send_digest(&mut a, &set(&['z'])).await.unwrap();
            a.recv().await.unwrap();
            a.send(&SyncMessage::Need {
                ids: vec![ElementId::hash(b"not-there")],
                more: false,
            })
            .await
            .unwrap();
            a.recv().await.unwrap()
        };
        let (result, reply) = tokio::join!(responder, rogue);

        assert!(matches!(result, Err(SyncError::InvalidMessage(_))));
        assert!(matches!(
            reply,
            SyncMessage::Error {
                code: SyncErrorCode::InvalidMessage,
                ..
            }
        ));
    }
}
