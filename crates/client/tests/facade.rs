// Path: crates/client/tests/facade.rs
//! End-to-end tests of the ledger client façade against the in-memory network.

use ledger_client::{ClientState, HistoryDelivery, LedgerClient, MemoryNetwork, PeerFault};
use ledger_types::app::{HistoryEntry, PeerId, SubmissionOutcome, Transaction};
use ledger_types::codec::DecodedValue;
use ledger_types::config::{CallOptions, ClientConfig, EndorsementPolicy};
use ledger_types::error::LedgerError;
use std::sync::Arc;
use std::time::Duration;

const CHANNEL: &str = "chainhero";
const CONTRACT: &str = "heroes-service";
const USER: &str = r#"{"id":1,"name":"Bharathi","Gender":"Male"}"#;

fn network() -> MemoryNetwork {
    let network = MemoryNetwork::new(&["peer0.org1", "peer1.org1", "peer2.org1"]);
    network.instantiate(CHANNEL, CONTRACT);
    network
}

async fn connected(network: &MemoryNetwork) -> LedgerClient {
    let client = LedgerClient::new(Arc::new(network.clone()));
    client.initialize(ClientConfig::default()).await.unwrap();
    client
}

async fn put(client: &LedgerClient, key: &str, value: &str) -> SubmissionOutcome {
    let tx = client.transaction("put", [key, value]).unwrap();
    client.invoke(tx).await.unwrap().outcome
}

#[tokio::test]
async fn test_query_before_initialize_never_contacts_network() {
    let network = network();
    let client = LedgerClient::new(Arc::new(network.clone()));

    assert_eq!(
        client.query("get", ["hello"]).await,
        Err(LedgerError::NotConnected)
    );
    assert_eq!(
        client.query_history("hello").await,
        Err(LedgerError::NotConnected)
    );
    let tx = Transaction::new(CHANNEL, CONTRACT, "put", ["hello", "world"]);
    assert_eq!(client.invoke(tx).await, Err(LedgerError::NotConnected));
    assert_eq!(network.contacts(), 0);
}

#[tokio::test]
async fn test_demo_flow_invoke_query_history() {
    let network = network();
    let client = connected(&network).await;

    assert_eq!(put(&client, "hello", USER).await, SubmissionOutcome::Success);
    let result = client.query("get", ["hello"]).await.unwrap();
    assert_eq!(
        result.value.get("name").and_then(DecodedValue::as_str),
        Some("Bharathi")
    );
    assert_eq!(result.endorsers.len(), 3);
    assert!(result.tx_id.is_some());

    for name in ["Sylendra Bharathi", "Sylendra Bharathi C"] {
        let user = format!(r#"{{"id":1,"name":"{}","Gender":"Male"}}"#, name);
        assert_eq!(put(&client, "hello", &user).await, SubmissionOutcome::Success);
    }
    let result = client.query("get", ["hello"]).await.unwrap();
    assert_eq!(
        result.value.get("name").and_then(DecodedValue::as_str),
        Some("Sylendra Bharathi C")
    );

    let history = client.query_history("hello").await.unwrap();
    let names: Vec<String> = history
        .iter()
        .map(|e| {
            e.value()
                .unwrap()
                .get("name")
                .and_then(DecodedValue::as_str)
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(
        names,
        vec!["Bharathi", "Sylendra Bharathi", "Sylendra Bharathi C"]
    );

    client.close().await.unwrap();
    assert_eq!(network.open_connections(), 0);
}

#[tokio::test]
async fn test_absent_key_queries_to_absent_value() {
    let network = network();
    let client = connected(&network).await;
    let result = client.query("get", ["missing"]).await.unwrap();
    assert!(result.value.is_absent());
    assert!(client.query_history("missing").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lifecycle_transitions() {
    let network = network();
    let client = LedgerClient::new(Arc::new(network.clone()));
    assert_eq!(client.state(), ClientState::Uninitialized);

    client.initialize(ClientConfig::default()).await.unwrap();
    assert_eq!(client.state(), ClientState::Connected);
    assert_eq!(
        client.initialize(ClientConfig::default()).await,
        Err(LedgerError::AlreadyInitialized)
    );
    assert_eq!(network.open_connections(), 1);

    client.close().await.unwrap();
    client.close().await.unwrap();
    assert_eq!(client.state(), ClientState::Closed);
    assert_eq!(network.open_connections(), 0);
    assert_eq!(
        client.query("get", ["hello"]).await,
        Err(LedgerError::NotConnected)
    );
    assert_eq!(
        client.initialize(ClientConfig::default()).await,
        Err(LedgerError::Closed)
    );
}

#[tokio::test]
async fn test_unavailable_network_leaves_client_retryable() {
    let network = network();
    network.set_unavailable(true);
    let client = LedgerClient::new(Arc::new(network.clone()));

    assert!(matches!(
        client.initialize(ClientConfig::default()).await,
        Err(LedgerError::NetworkUnavailable(_))
    ));
    assert_eq!(client.state(), ClientState::Uninitialized);

    network.set_unavailable(false);
    client.initialize(ClientConfig::default()).await.unwrap();
    assert_eq!(client.state(), ClientState::Connected);
}

#[tokio::test]
async fn test_failed_bind_releases_connection() {
    let network = MemoryNetwork::new(&["peer0.org1"]);
    let client = LedgerClient::new(Arc::new(network.clone()));

    assert!(matches!(
        client.initialize(ClientConfig::default()).await,
        Err(LedgerError::Network(_))
    ));
    assert_eq!(client.state(), ClientState::Uninitialized);
    assert_eq!(network.open_connections(), 0);

    network.instantiate(CHANNEL, CONTRACT);
    client.initialize(ClientConfig::default()).await.unwrap();
    assert_eq!(network.open_connections(), 1);
}

#[tokio::test]
async fn test_rejected_submission_is_reported_not_raised() {
    let network = network();
    let client = connected(&network).await;
    let tx = client.transaction("transfer", ["a", "b"]).unwrap();
    let result = client.invoke(tx).await.unwrap();
    assert!(matches!(result.outcome, SubmissionOutcome::Rejected(_)));
    assert!(!result.is_committed());
}

#[tokio::test(start_paused = true)]
async fn test_submission_timeout_is_ambiguous() {
    let network = network();
    let client = connected(&network).await;
    network.set_submit_delay(Some(Duration::from_secs(60)));

    let tx = client.transaction("put", ["hello", USER]).unwrap();
    let opts = CallOptions::default().with_timeout(Duration::from_secs(1));
    assert_eq!(
        client.invoke_with(tx, opts).await,
        Err(LedgerError::SubmissionTimeout {
            function: "put".into(),
            timeout: Duration::from_secs(1)
        })
    );

    // The network committed the write even though the caller stopped waiting.
    let result = client.query("get", ["hello"]).await.unwrap();
    assert_eq!(
        result.value.get("name").and_then(DecodedValue::as_str),
        Some("Bharathi")
    );
}

#[tokio::test(start_paused = true)]
async fn test_query_timeout() {
    let network = network();
    let client = connected(&network).await;
    network.set_query_delay(Some(Duration::from_secs(45)));

    assert!(matches!(
        client.query("get", ["hello"]).await,
        Err(LedgerError::QueryTimeout { .. })
    ));
    assert!(matches!(
        client
            .query_history_with("hello", CallOptions::default().with_timeout(Duration::from_secs(5)))
            .await,
        Err(LedgerError::QueryTimeout { .. })
    ));
}

#[tokio::test]
async fn test_disagreeing_peer_is_reported() {
    let network = network();
    let client = connected(&network).await;
    put(&client, "hello", "\"v1\"").await;
    network.set_peer_fault("peer2.org1", Some(PeerFault::Payload(b"\"v2\"".to_vec())));

    assert_eq!(
        client.query("get", ["hello"]).await,
        Err(LedgerError::EndorsementMismatch {
            dissenting: vec![PeerId::from("peer2.org1")]
        })
    );

    let quorum = CallOptions::default().with_policy(EndorsementPolicy::RequireQuorum(2));
    let result = client.query_with("get", ["hello"], quorum).await.unwrap();
    assert_eq!(result.value.as_str(), Some("v1"));
    assert_eq!(
        result.endorsers,
        vec![PeerId::from("peer0.org1"), PeerId::from("peer1.org1")]
    );

    let strict = CallOptions::default().with_policy(EndorsementPolicy::RequireQuorum(3));
    assert_eq!(
        client.query_with("get", ["hello"], strict).await,
        Err(LedgerError::InsufficientEndorsements {
            required: 3,
            obtained: 2
        })
    );
}

#[tokio::test]
async fn test_configured_policy_applies_to_queries() {
    let network = network();
    let client = LedgerClient::new(Arc::new(network.clone()));
    let config = ClientConfig {
        policy: EndorsementPolicy::BestEffort,
        ..ClientConfig::default()
    };
    client.initialize(config).await.unwrap();
    put(&client, "hello", "\"v1\"").await;
    network.set_peer_fault("peer0.org1", Some(PeerFault::Payload(b"\"v2\"".to_vec())));

    let result = client.query("get", ["hello"]).await.unwrap();
    assert_eq!(result.value.as_str(), Some("v1"));
}

#[tokio::test]
async fn test_malformed_payload_reaches_caller() {
    let network = network();
    let client = connected(&network).await;
    network.set_peer_fault("peer1.org1", Some(PeerFault::Payload(b"{\"name\":".to_vec())));

    match client.query("get", ["hello"]).await {
        Err(LedgerError::MalformedPayload { peer, raw, .. }) => {
            assert_eq!(peer, Some(PeerId::from("peer1.org1")));
            assert_eq!(raw, b"{\"name\":".to_vec());
        }
        other => panic!("expected MalformedPayload, got {:?}", other),
    }
}

#[tokio::test]
async fn test_no_responses_and_rejections() {
    let network = network();
    let client = connected(&network).await;

    for peer in ["peer0.org1", "peer1.org1", "peer2.org1"] {
        network.set_peer_fault(peer, Some(PeerFault::Silent));
    }
    assert_eq!(
        client.query("get", ["hello"]).await,
        Err(LedgerError::NoResponses)
    );

    for peer in ["peer0.org1", "peer1.org1", "peer2.org1"] {
        network.set_peer_fault(peer, None);
    }
    assert!(matches!(
        client.query("scan", ["hello"]).await,
        Err(LedgerError::EndorsementRejected { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_history_survives_shuffled_duplicate_delivery() {
    let network = network();
    let client = connected(&network).await;
    for v in ["\"a\"", "\"b\"", "\"c\""] {
        put(&client, "k", v).await;
    }
    let tx = client.transaction("delete", ["k"]).unwrap();
    client.invoke(tx).await.unwrap();
    network.set_history_delivery(HistoryDelivery::ShuffledWithDuplicates);

    let history = client.query_history("k").await.unwrap();
    let positions: Vec<i64> = history.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);
    assert_eq!(history.latest().map(|e| e.is_delete), Some(true));
    assert_eq!(
        history.as_slice()[1].value().unwrap().as_str(),
        Some("b")
    );
}

#[tokio::test]
async fn test_corrupt_history_position_is_rejected() {
    let network = network();
    let client = LedgerClient::new(Arc::new(network.clone()));
    let config = ClientConfig {
        max_history_position: 100,
        ..ClientConfig::default()
    };
    client.initialize(config).await.unwrap();
    network.inject_history_entry(
        CHANNEL,
        CONTRACT,
        "k",
        HistoryEntry::new("bogus", 101, b"\"x\"".to_vec()),
    );

    assert!(matches!(
        client.query_history("k").await,
        Err(LedgerError::OutOfRangeEntry { position: 101, max: 100, .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_share_one_connection() {
    let network = network();
    let client = Arc::new(connected(&network).await);
    put(&client, "hello", USER).await;

    let mut handles = Vec::new();
    for i in 0..16 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                let result = client.query("get", ["hello"]).await.unwrap();
                assert!(!result.value.is_absent());
            } else {
                let key = format!("key-{}", i);
                let tx = client.transaction("put", [key.as_str(), "\"v\""]).unwrap();
                assert!(client.invoke(tx).await.unwrap().is_committed());
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(network.open_connections(), 1);
}
