//! End-to-end sessions over localhost TCP.
//!
//! Each test runs an initiator and a responder in the same process, the way
//! `tryme client` and `tryme server` would run side by side.

use std::time::Duration;

use gensync::sync::{FailureKind, SessionOptions, SessionState, SyncError};
use gensync::{
    configure, demo_elements, exit_code, observation, run, HarnessDefaults, ProtocolIdentity,
    Role, SessionOutcome, SyncSession, EXIT_FAILED, EXIT_OK,
};
use gensync_testkit::fixtures::{element_set, free_port, run_pair, test_options, SessionPairFixture};

#[tokio::test]
async fn test_demo_sets_reconcile_for_every_two_way_protocol() {
    for protocol in ProtocolIdentity::ALL.into_iter().filter(|p| !p.is_one_way()) {
        let fixture = SessionPairFixture::new(protocol);
        let (initiator, responder) = fixture.sessions(
            element_set(&['a', 'b', 'c', 'd']),
            element_set(&['a', 'b', 'c', 'e']),
        );
        let result = run_pair(initiator, responder).await;

        let union = element_set(&['a', 'b', 'c', 'd', 'e']);
        assert!(result.initiator_outcome.is_reconciled(), "{}", protocol);
        assert!(result.responder_outcome.is_reconciled(), "{}", protocol);
        assert_eq!(result.initiator_elements, union, "{}", protocol);
        assert_eq!(result.responder_elements, union, "{}", protocol);
        assert_eq!(result.initiator_state, SessionState::Reconciled);
        assert_eq!(result.responder_state, SessionState::Reconciled);
    }
}

#[tokio::test]
async fn test_one_way_protocols_update_only_the_responder() {
    for protocol in [ProtocolIdentity::OneWayCpiSync, ProtocolIdentity::OneWayIbltSync] {
        let fixture = SessionPairFixture::new(protocol);
        let (initiator, responder) = fixture.sessions(
            element_set(&['a', 'b', 'c', 'd']),
            element_set(&['a', 'b', 'c', 'e']),
        );
        let result = run_pair(initiator, responder).await;

        assert!(result.initiator_outcome.is_reconciled(), "{}", protocol);
        assert!(result.responder_outcome.is_reconciled(), "{}", protocol);
        assert_eq!(result.initiator_elements, element_set(&['a', 'b', 'c', 'd']));
        assert_eq!(
            result.responder_elements,
            element_set(&['a', 'b', 'c', 'd', 'e'])
        );
    }
}

#[tokio::test]
async fn test_equal_sets_exchange_nothing() {
    let fixture = SessionPairFixture::new(ProtocolIdentity::IbltSync);
    let (initiator, responder) =
        fixture.sessions(element_set(&['a', 'b']), element_set(&['a', 'b']));
    let result = run_pair(initiator, responder).await;

    assert!(result.initiator_outcome.is_reconciled());
    assert_eq!(result.initiator_outcome.exchanged(), 0);
    assert_eq!(result.responder_outcome.exchanged(), 0);
    assert_eq!(result.initiator_elements, element_set(&['a', 'b']));
}

#[tokio::test]
async fn test_mismatched_bits_fail_both_sides() {
    let fixture = SessionPairFixture::with_bits(ProtocolIdentity::IbltSync, 8, 16);
    let (initiator, responder) = fixture.sessions(
        element_set(&['a', 'b', 'c', 'd']),
        element_set(&['a', 'b', 'c', 'e']),
    );
    let result = run_pair(initiator, responder).await;

    assert_eq!(
        result.initiator_outcome.failure_kind(),
        Some(FailureKind::Reconciliation)
    );
    assert_eq!(
        result.responder_outcome.failure_kind(),
        Some(FailureKind::Reconciliation)
    );
    assert_eq!(result.initiator_state, SessionState::Failed);
    assert_eq!(result.responder_state, SessionState::Failed);
    // Neither side learned anything.
    assert_eq!(result.initiator_elements, element_set(&['a', 'b', 'c', 'd']));
    assert_eq!(result.responder_elements, element_set(&['a', 'b', 'c', 'e']));
}

#[tokio::test]
async fn test_initiator_without_responder_fails_with_transport() {
    let fixture = SessionPairFixture::new(ProtocolIdentity::CpiSync);
    let options = SessionOptions {
        connect_timeout: Some(Duration::from_millis(200)),
        retry_interval: Duration::from_millis(20),
        exchange_timeout: None,
    };
    let mut session = SyncSession::new(
        fixture.initiator.clone(),
        element_set(&['a']),
        Role::Initiator,
    )
    .with_options(options);

    let outcome = session.begin().await.unwrap();
    assert_eq!(outcome.failure_kind(), Some(FailureKind::Transport));
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(exit_code(&outcome), EXIT_FAILED);
    assert_eq!(session.elements(), &element_set(&['a']));
}

#[tokio::test]
async fn test_responder_without_initiator_fails_with_transport() {
    let fixture = SessionPairFixture::new(ProtocolIdentity::FullSync);
    let options = SessionOptions {
        connect_timeout: Some(Duration::from_millis(100)),
        ..SessionOptions::default()
    };
    let mut session = SyncSession::new(
        fixture.responder.clone(),
        element_set(&['a']),
        Role::Responder,
    )
    .with_options(options);

    let outcome = session.begin().await.unwrap();
    assert_eq!(outcome.failure_kind(), Some(FailureKind::Transport));
}

#[tokio::test]
async fn test_begin_is_single_use() {
    let fixture = SessionPairFixture::new(ProtocolIdentity::FullSync);
    let (mut initiator, mut responder) =
        fixture.sessions(element_set(&['a']), element_set(&['b']));
    let (oi, or) = tokio::join!(initiator.begin(), responder.begin());
    assert!(oi.unwrap().is_reconciled());
    assert!(or.unwrap().is_reconciled());

    let err = initiator.begin().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::InvalidState {
            state: SessionState::Reconciled
        }
    ));
    assert!(initiator.outcome().is_some_and(SessionOutcome::is_reconciled));
}

#[tokio::test]
async fn test_harness_run_with_demo_elements() {
    let defaults = HarnessDefaults {
        port: free_port(),
        ..HarnessDefaults::default()
    };

    let (client, server) = tokio::join!(
        run(Role::Initiator, "IBLTSync", &defaults, test_options()),
        run(Role::Responder, "IBLTSync", &defaults, test_options()),
    );
    let (client_outcome, client_elements) = client.unwrap();
    let (server_outcome, server_elements) = server.unwrap();

    assert_eq!(exit_code(&client_outcome), EXIT_OK);
    assert_eq!(exit_code(&server_outcome), EXIT_OK);
    assert_eq!(client_elements, server_elements);
    assert_eq!(client_elements.len(), 5);
    assert!(client_elements.contains(&'e'.into()));
    assert!(server_elements.contains(&'d'.into()));

    let report = observation(&client_outcome);
    assert!(!report.contains("Bytes Transmitted: 0\n"));
    assert!(client_outcome.stats().transfer.bytes_received > 0);
}

#[tokio::test]
async fn test_harness_run_unknown_protocol_never_connects() {
    let defaults = HarnessDefaults {
        port: free_port(),
        ..HarnessDefaults::default()
    };
    let err = run(Role::Initiator, "NoSuchSync", &defaults, test_options())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid sync type: NoSuchSync");
}

#[test]
fn test_peers_built_from_same_defaults_agree() {
    let defaults = HarnessDefaults::default();
    for protocol in ProtocolIdentity::ALL {
        let a = configure(protocol.name(), &defaults).unwrap();
        let b = configure(protocol.name(), &defaults).unwrap();
        assert_eq!(a.params(), b.params());
    }
    assert_ne!(demo_elements(Role::Initiator), demo_elements(Role::Responder));
}
