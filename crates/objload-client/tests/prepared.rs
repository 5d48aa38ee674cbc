//! Two-phase prepare/put flow

use objload_client::Client;
use objload_core::{
    Address, ClientConfig, ContainerId, Lifetime, Metric, ObjectId, SessionTemplate, SigningKey,
};
use objload_effects::{InMemoryMetrics, InMemoryStore, StoreConfig};
use std::sync::Arc;

const CONTAINER: ContainerId = ContainerId::from_bytes([9u8; 32]);

fn setup() -> (Arc<InMemoryStore>, Arc<InMemoryMetrics>, Client<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new(StoreConfig::default()));
    let metrics = Arc::new(InMemoryMetrics::new());
    let key = SigningKey::from_bytes(&[21u8; 32]);
    let template = SessionTemplate::new(
        Lifetime {
            issued_at: 0,
            not_before: 0,
            expires_at: 10,
        },
        key.verifying_key(),
    );
    let client = Client::new(
        store.clone(),
        key,
        template,
        ClientConfig {
            buffer_size: 512,
            ..ClientConfig::default()
        },
        metrics.clone(),
    )
    .unwrap();
    (store, metrics, client)
}

#[tokio::test]
async fn distinct_attributes_give_distinct_ids_with_shared_checksums() {
    let (store, metrics, client) = setup();
    let payload: Vec<u8> = (0..2000u32).map(|i| (i % 256) as u8).collect();
    let prepared = client
        .prepare(&CONTAINER.to_string(), payload.clone())
        .await
        .unwrap();
    assert_eq!(prepared.payload_len(), payload.len());
    assert!(prepared.header().checksums().homomorphic.is_some());

    let first = prepared.put([("FileName", "one")]).await.unwrap();
    let second = prepared.put([("FileName", "two")]).await.unwrap();
    assert!(first.success && second.success);

    let ids: Vec<ObjectId> = [first, second]
        .into_iter()
        .map(|r| r.object_id.unwrap().parse().unwrap())
        .collect();
    assert_ne!(ids[0], ids[1]);

    let a = store.object(&Address::object(CONTAINER, ids[0])).await.unwrap();
    let b = store.object(&Address::object(CONTAINER, ids[1])).await.unwrap();
    assert_eq!(a.header().checksums(), b.header().checksums());
    assert_eq!(a.attributes()[0].value(), "one");
    assert_eq!(b.attributes()[0].value(), "two");

    assert_eq!(metrics.count(Metric::PutTotal), 2);
    assert_eq!(store.stats().await.objects_stored, 2);
}

#[tokio::test]
async fn clones_upload_concurrently() {
    let (store, metrics, client) = setup();
    let prepared = client
        .prepare(&CONTAINER.to_string(), vec![7u8; 1500])
        .await
        .unwrap();
    let other = prepared.clone();

    let (a, b) = tokio::join!(
        prepared.put([("Worker", "a")]),
        other.put([("Worker", "b")]),
    );
    assert!(a.unwrap().success);
    assert!(b.unwrap().success);
    assert_eq!(metrics.count(Metric::PutFails), 0);
    assert_eq!(store.stats().await.chunks_written, 6);
}

#[tokio::test]
async fn same_attributes_reproduce_the_same_id() {
    let (_store, _metrics, client) = setup();
    let prepared = client
        .prepare(&CONTAINER.to_string(), b"same".as_slice())
        .await
        .unwrap();
    let first = prepared.put([("K", "v")]).await.unwrap();
    let second = prepared.put([("K", "v")]).await.unwrap();
    assert_eq!(first.object_id, second.object_id);
}
