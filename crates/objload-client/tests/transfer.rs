//! End-to-end PUT/GET behaviour against the in-memory store

use assert_matches::assert_matches;
use objload_client::Client;
use objload_core::{
    Address, Attribute, ClientConfig, ContainerId, ErrorKind, Lifetime, LoadError, Metric,
    ObjectId, SessionTemplate, SigningKey,
};
use objload_effects::{FaultPlan, InMemoryMetrics, InMemoryStore, StoreConfig};
use std::sync::Arc;

const CONTAINER: ContainerId = ContainerId::from_bytes([7u8; 32]);
const CHUNK: usize = 1024;
const MAX_SIZE: u64 = 4 * CHUNK as u64;

struct Harness {
    store: Arc<InMemoryStore>,
    metrics: Arc<InMemoryMetrics>,
    client: Client<InMemoryStore>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn store() -> InMemoryStore {
    InMemoryStore::new(StoreConfig {
        max_object_size: MAX_SIZE,
        epoch: 5,
        homomorphic_hashing_disabled: false,
    })
}

fn harness_with(store: InMemoryStore, config: ClientConfig) -> Harness {
    init_tracing();
    let key = SigningKey::from_bytes(&[11u8; 32]);
    let template = SessionTemplate::new(
        Lifetime {
            issued_at: 1,
            not_before: 1,
            expires_at: 100,
        },
        SigningKey::from_bytes(&[12u8; 32]).verifying_key(),
    );
    let store = Arc::new(store);
    let metrics = Arc::new(InMemoryMetrics::new());
    let client = Client::new(store.clone(), key, template, config, metrics.clone()).unwrap();
    Harness {
        store,
        metrics,
        client,
    }
}

fn harness(store: InMemoryStore) -> Harness {
    harness_with(
        store,
        ClientConfig {
            buffer_size: CHUNK as i64,
            verify_get_payload: true,
            ..ClientConfig::default()
        },
    )
}

fn container() -> String {
    CONTAINER.to_string()
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn no_attributes() -> Vec<Attribute> {
    Vec::new()
}

#[tokio::test]
async fn round_trip_at_chunk_boundaries() {
    let h = harness(store());
    let sizes = [0, 1, CHUNK - 1, CHUNK, CHUNK + 1, MAX_SIZE as usize];

    for size in sizes {
        let data = payload(size);
        let put = h
            .client
            .put(&container(), [("FileName", format!("{size}.bin"))], &data)
            .await
            .unwrap();
        assert!(put.success, "put of {size} bytes failed: {:?}", put.error);
        let id_str = put.object_id.unwrap();
        let id: ObjectId = id_str.parse().unwrap();

        let address = Address::object(CONTAINER, id);
        let stored = h.store.object(&address).await.unwrap();
        assert_eq!(stored.id(), id);
        assert_eq!(h.store.payload(&address).await.unwrap(), data);

        let get = h.client.get(&container(), &id_str).await.unwrap();
        assert!(get.success, "get of {size} bytes failed: {:?}", get.error);
        assert_eq!(get.bytes_received, size as u64);
    }

    let stats = h.store.stats().await;
    assert!(stats.largest_chunk <= CHUNK);
    assert!(stats.largest_read_buffer <= CHUNK);

    let snap = h.metrics.snapshot();
    assert_eq!(snap.count(Metric::PutTotal), sizes.len() as u64);
    assert_eq!(snap.count(Metric::PutFails), 0);
    assert_eq!(snap.count(Metric::GetTotal), sizes.len() as u64);
    assert_eq!(snap.samples(Metric::PutDuration), sizes.len());
    let total: u64 = sizes.iter().map(|s| *s as u64).sum();
    assert_eq!(snap.data_sent, total);
    assert_eq!(snap.data_received, total);
}

#[tokio::test]
async fn payload_over_limit_is_rejected_before_streaming() {
    let h = harness(store());

    let ok = h
        .client
        .put(&container(), no_attributes(), &payload(MAX_SIZE as usize))
        .await
        .unwrap();
    assert!(ok.success);

    let err = h
        .client
        .put(&container(), no_attributes(), &payload(MAX_SIZE as usize + 1))
        .await
        .unwrap_err();
    assert_matches!(err, LoadError::PayloadTooLarge { size, limit } if size == MAX_SIZE + 1 && limit == MAX_SIZE);

    let err = h
        .client
        .prepare(&container(), payload(MAX_SIZE as usize + 1))
        .await
        .unwrap_err();
    assert_matches!(err, LoadError::PayloadTooLarge { .. });

    // prepare is not an attempt; the rejected put is
    assert_eq!(h.metrics.count(Metric::PutTotal), 2);
    assert_eq!(h.metrics.count(Metric::PutFails), 1);
    assert_eq!(h.store.stats().await.objects_stored, 1);
}

#[tokio::test]
async fn cancellation_mid_stream_fails_once_and_stops_writing() {
    let h = harness(store().with_faults(FaultPlan {
        stall_at_chunk: Some(1),
        ..FaultPlan::default()
    }));
    let data = payload(3 * CHUNK);
    let container = container();

    let (resp, ()) = tokio::join!(h.client.put(&container, no_attributes(), &data), async {
        h.store.wait_for_stall().await;
        h.client.cancellation_token().cancel();
    });

    let resp = resp.unwrap();
    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::Cancellation));
    assert_eq!(h.metrics.count(Metric::PutTotal), 1);
    assert_eq!(h.metrics.count(Metric::PutFails), 1);
    assert_eq!(h.metrics.snapshot().samples(Metric::PutDuration), 0);

    let stats = h.store.stats().await;
    assert_eq!(stats.chunks_written, 1);
    assert_eq!(stats.objects_stored, 0);
}

#[tokio::test]
async fn cancellation_mid_download_fails_once() {
    let h = harness(store().with_faults(FaultPlan {
        stall_at_read: Some(1),
        ..FaultPlan::default()
    }));
    let id = h
        .client
        .put(&container(), no_attributes(), &payload(3 * CHUNK))
        .await
        .unwrap()
        .object_id
        .unwrap();
    let container = container();

    let (resp, ()) = tokio::join!(h.client.get(&container, &id), async {
        h.store.wait_for_stall().await;
        h.client.cancellation_token().cancel();
    });

    let resp = resp.unwrap();
    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::Cancellation));
    assert_eq!(h.metrics.count(Metric::GetTotal), 1);
    assert_eq!(h.metrics.count(Metric::GetFails), 1);
    let snapshot = h.metrics.snapshot();
    assert_eq!(snapshot.samples(Metric::GetDuration), 0);
    assert_eq!(snapshot.data_received, 0);
}

#[tokio::test]
async fn read_longer_than_buffer_is_a_transport_failure() {
    let h = harness(store().with_faults(FaultPlan {
        overstate_read_len: true,
        ..FaultPlan::default()
    }));
    let id = h
        .client
        .put(&container(), no_attributes(), &payload(CHUNK + 10))
        .await
        .unwrap()
        .object_id
        .unwrap();

    let resp = h.client.get(&container(), &id).await.unwrap();
    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::Transport));
    assert_eq!(resp.bytes_received, 0);
    assert_eq!(h.metrics.count(Metric::GetFails), 1);
}

#[tokio::test]
async fn durations_recorded_only_for_completed_streams() {
    let h = harness(store());
    let id = h
        .client
        .put(&container(), no_attributes(), &payload(2 * CHUNK))
        .await
        .unwrap()
        .object_id
        .unwrap();
    assert!(h.client.get(&container(), &id).await.unwrap().success);
    let missing = ObjectId::from_bytes([3u8; 32]).to_string();
    assert!(!h.client.get(&container(), &missing).await.unwrap().success);

    let snapshot = h.metrics.snapshot();
    assert_eq!(snapshot.samples(Metric::PutDuration), 1);
    assert_eq!(snapshot.samples(Metric::GetDuration), 1);
    assert_eq!(snapshot.count(Metric::GetTotal), 2);
}

#[tokio::test(start_paused = true)]
async fn operation_deadline_cancels_stalled_upload() {
    let h = harness_with(
        store().with_faults(FaultPlan {
            stall_at_chunk: Some(0),
            ..FaultPlan::default()
        }),
        ClientConfig {
            operation_timeout_ms: Some(50),
            ..ClientConfig::default()
        },
    );

    let resp = h
        .client
        .put(&container(), no_attributes(), &payload(10))
        .await
        .unwrap();
    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::Cancellation));
    assert_eq!(h.metrics.count(Metric::PutFails), 1);
}

#[tokio::test]
async fn rejected_header_is_a_failed_response() {
    let h = harness(store().with_faults(FaultPlan {
        reject_header: true,
        ..FaultPlan::default()
    }));

    let resp = h
        .client
        .put(&container(), no_attributes(), &payload(100))
        .await
        .unwrap();
    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::Transport));
    assert_eq!(resp.object_id, None);
    assert_eq!(h.metrics.count(Metric::PutFails), 1);
    assert_eq!(h.store.stats().await.chunks_written, 0);
}

#[tokio::test]
async fn rejected_chunk_stops_streaming() {
    for accept_after in [false, true] {
        let h = harness(store().with_faults(FaultPlan {
            reject_chunk_at: Some(2),
            accept_after_rejected_chunk: accept_after,
            ..FaultPlan::default()
        }));

        let resp = h
            .client
            .put(&container(), no_attributes(), &payload(4 * CHUNK))
            .await
            .unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error_kind, Some(ErrorKind::Transport));
        assert_eq!(h.store.stats().await.chunks_written, 2);
        assert_eq!(h.metrics.count(Metric::PutFails), 1);
    }
}

#[tokio::test]
async fn get_failures_are_reported_as_responses() {
    let h = harness(store().with_faults(FaultPlan {
        corrupt_payload_on_get: true,
        ..FaultPlan::default()
    }));
    let put = h
        .client
        .put(&container(), no_attributes(), &payload(CHUNK + 7))
        .await
        .unwrap();
    let id = put.object_id.unwrap();

    let corrupted = h.client.get(&container(), &id).await.unwrap();
    assert!(!corrupted.success);
    assert_eq!(corrupted.error_kind, Some(ErrorKind::ChecksumMismatch));

    let missing = ObjectId::from_bytes([0xaa; 32]).to_string();
    let not_found = h.client.get(&container(), &missing).await.unwrap();
    assert_eq!(not_found.error_kind, Some(ErrorKind::Transport));

    assert_eq!(h.metrics.count(Metric::GetTotal), 2);
    assert_eq!(h.metrics.count(Metric::GetFails), 2);
}

#[tokio::test]
async fn read_failure_surfaces_transport_error() {
    let h = harness(store().with_faults(FaultPlan {
        fail_read_at_chunk: Some(1),
        ..FaultPlan::default()
    }));
    let id = h
        .client
        .put(&container(), no_attributes(), &payload(3 * CHUNK))
        .await
        .unwrap()
        .object_id
        .unwrap();

    let resp = h.client.get(&container(), &id).await.unwrap();
    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::Transport));
    assert_eq!(resp.bytes_received, 0);
}

#[tokio::test]
async fn malformed_identifiers_are_configuration_errors() {
    let h = harness(store());
    assert_matches!(
        h.client.put("not-hex", no_attributes(), b"x").await,
        Err(LoadError::Configuration { .. })
    );
    assert_matches!(
        h.client.get(&container(), "abcd").await,
        Err(LoadError::Configuration { .. })
    );
    assert_eq!(h.metrics.count(Metric::PutTotal), 1);
    assert_eq!(h.metrics.count(Metric::PutFails), 1);
    assert_eq!(h.metrics.count(Metric::GetTotal), 1);
    assert_eq!(h.metrics.count(Metric::GetFails), 1);
}

#[tokio::test]
async fn invalid_attributes_fail_identity_computation() {
    let h = harness(store());
    let err = h
        .client
        .put(&container(), [("Name", "a"), ("Name", "b")], b"x")
        .await
        .unwrap_err();
    assert_matches!(err, LoadError::IdentityComputation { .. });
    assert_eq!(h.metrics.count(Metric::PutTotal), 1);
    assert_eq!(h.metrics.count(Metric::PutFails), 1);
}

#[tokio::test]
async fn buffer_size_setting() {
    let mut h = harness(store());
    assert_matches!(
        h.client.set_buffer_size(-1),
        Err(LoadError::Configuration { .. })
    );
    assert_eq!(h.client.buffer_size().get(), CHUNK);

    h.client.set_buffer_size(0).unwrap();
    assert_eq!(h.client.buffer_size().get(), objload_core::DEFAULT_CHUNK_SIZE);

    h.client.set_buffer_size(100).unwrap();
    let resp = h
        .client
        .put(&container(), no_attributes(), &payload(1000))
        .await
        .unwrap();
    assert!(resp.success);
    let stats = h.store.stats().await;
    assert_eq!(stats.largest_chunk, 100);
    assert_eq!(stats.chunks_written, 10);
}

#[tokio::test]
async fn negative_configured_buffer_rejects_client() {
    let key = SigningKey::from_bytes(&[1u8; 32]);
    let template = SessionTemplate::new(
        Lifetime {
            issued_at: 0,
            not_before: 0,
            expires_at: 10,
        },
        key.verifying_key(),
    );
    let config = ClientConfig {
        buffer_size: -5,
        ..ClientConfig::default()
    };
    let result = Client::new(
        Arc::new(store()),
        key,
        template,
        config,
        Arc::new(InMemoryMetrics::new()),
    );
    assert_matches!(result, Err(LoadError::Configuration { .. }));
}

#[tokio::test]
async fn missing_or_malformed_parameters_abort_put() {
    let missing = harness(store().with_raw_parameters(vec![]));
    assert_matches!(
        missing.client.put(&container(), no_attributes(), b"x").await,
        Err(LoadError::MissingRequiredParameter { .. })
    );

    let malformed = harness(store().with_raw_parameters(vec![
        (b"MaxObjectSize".to_vec(), 1024u64.to_le_bytes().to_vec()),
        (b"HomomorphicHashingDisabled".to_vec(), vec![1u8; 33]),
    ]));
    assert_matches!(
        malformed.client.prepare(&container(), b"x".as_slice()).await,
        Err(LoadError::MalformedParameter { .. })
    );
}

#[tokio::test]
async fn homomorphic_hash_omitted_when_disabled() {
    let h = harness(InMemoryStore::new(StoreConfig {
        max_object_size: MAX_SIZE,
        epoch: 5,
        homomorphic_hashing_disabled: true,
    }));
    let id: ObjectId = h
        .client
        .put(&container(), no_attributes(), &payload(64))
        .await
        .unwrap()
        .object_id
        .unwrap()
        .parse()
        .unwrap();
    let stored = h.store.object(&Address::object(CONTAINER, id)).await.unwrap();
    assert_eq!(stored.header().checksums().homomorphic, None);
    assert_eq!(stored.header().creation_epoch(), 5);
}

#[tokio::test]
async fn responses_serialize_for_the_host() {
    let h = harness(store());
    let resp = h
        .client
        .put(&container(), no_attributes(), b"hi")
        .await
        .unwrap();
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["object_id"], resp.object_id.unwrap().as_str());
    assert!(json["error"].is_null());
}

#[tokio::test]
async fn store_unavailability_is_a_failed_response() {
    let unreachable = harness(store().with_faults(FaultPlan {
        fail_network_info: true,
        ..FaultPlan::default()
    }));
    let resp = unreachable
        .client
        .put(&container(), no_attributes(), b"x")
        .await
        .unwrap();
    assert_eq!(resp.error_kind, Some(ErrorKind::Transport));
    assert_eq!(unreachable.metrics.count(Metric::PutTotal), 1);
    assert_eq!(unreachable.metrics.count(Metric::PutFails), 1);

    let refusing = harness(store().with_faults(FaultPlan {
        fail_open: true,
        ..FaultPlan::default()
    }));
    let resp = refusing
        .client
        .put(&container(), no_attributes(), b"x")
        .await
        .unwrap();
    assert_eq!(resp.error_kind, Some(ErrorKind::Transport));
    assert_eq!(refusing.metrics.count(Metric::PutTotal), 1);
    assert_eq!(refusing.metrics.count(Metric::PutFails), 1);
}

#[tokio::test]
async fn unreadable_header_fails_get() {
    let h = harness(store().with_faults(FaultPlan {
        drop_header_on_get: true,
        ..FaultPlan::default()
    }));
    let id = h
        .client
        .put(&container(), no_attributes(), &payload(10))
        .await
        .unwrap()
        .object_id
        .unwrap();

    let resp = h.client.get(&container(), &id).await.unwrap();
    assert!(!resp.success);
    assert_matches!(resp.error.as_deref(), Some(msg) if msg.contains("header unavailable"));
    assert_eq!(h.metrics.count(Metric::GetFails), 1);
}
