//! End-to-end orchestrator tests
//!
//! Exercise one full ingestion attempt against an in-memory object store,
//! a fixed postcode store and a mocked dataset endpoint: dedup gate,
//! enrichment, chunked export, hash marker lifecycle.

mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{MemoryStore, StaticPostcodeStore};
use pps_common::hashing::content_hash;
use pps_ingest::pricepaid::download::DatasetSource;
use pps_ingest::pricepaid::export::ExportKind;
use pps_ingest::pricepaid::store::{chunk_name, marker_name, DatasetStore};
use pps_ingest::pricepaid::{DatasetSelector, IngestOutcome, IngestionOrchestrator};

const HEADER: &str = "transaction_id,price,date_of_transfer,postcode,property_type,new_build,duration,paon,saon,street,locality,town,district,county";

fn dataset(rows: &[&str]) -> String {
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text
}

fn three_row_dataset() -> String {
    dataset(&[
        r#"{T1},285000,2024-03-01,SW1A 1AA,D,N,F,12,,Downing Street,,LONDON,WESTMINSTER,GREATER LONDON"#,
        r#"{T2},145000,2024-03-02,,,N,L,30,FLAT 3,Oxford Road,,MANCHESTER,MANCHESTER,GREATER MANCHESTER"#,
        r#"{T3},99500,2024-03-03,ZZ9 9ZZ,T,Y,F,1,,,,YORK,YORK,NORTH YORKSHIRE"#,
    ])
}

async fn mount_dataset(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/pp-monthly-update-new-version.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.into_bytes()))
        .mount(server)
        .await;
}

fn orchestrator(
    server: &MockServer,
    store: Arc<MemoryStore>,
    export: ExportKind,
) -> IngestionOrchestrator<MemoryStore, StaticPostcodeStore> {
    let postcodes = StaticPostcodeStore::new(&[("SW1A 1AA", 51.501, -0.141)]);
    IngestionOrchestrator::new(
        DatasetSource::new(server.uri()).unwrap(),
        DatasetStore::new(store),
        postcodes,
        export,
    )
}

#[tokio::test]
async fn test_ingest_completes_then_short_circuits() {
    let server = MockServer::start().await;
    let payload = three_row_dataset();
    mount_dataset(&server, payload.clone()).await;

    let store = Arc::new(MemoryStore::default());
    let orchestrator = orchestrator(&server, Arc::clone(&store), ExportKind::Csv);
    let cancel = CancellationToken::new();

    let expected_hash = content_hash(payload.as_bytes());

    let first = orchestrator
        .run(DatasetSelector::LatestMonth, &cancel)
        .await
        .unwrap();
    assert_eq!(
        first,
        IngestOutcome::Completed {
            hash: expected_hash.clone(),
            rows: 3
        }
    );

    assert!(store.object(&chunk_name(&expected_hash, 0, "csv")).is_some());
    assert_eq!(store.object(&marker_name(&expected_hash)), Some(Vec::new()));
    let objects_after_first = store.object_count();

    let second = orchestrator
        .run(DatasetSelector::LatestMonth, &cancel)
        .await
        .unwrap();
    assert_eq!(second, IngestOutcome::NothingToDo { hash: expected_hash });

    // The short-circuited run wrote nothing further.
    assert_eq!(store.object_count(), objects_after_first);
}

#[tokio::test]
async fn test_enriched_chunk_content() {
    let server = MockServer::start().await;
    mount_dataset(&server, three_row_dataset()).await;

    let store = Arc::new(MemoryStore::default());
    let orchestrator = orchestrator(&server, Arc::clone(&store), ExportKind::Csv);

    let outcome = orchestrator
        .run(DatasetSelector::LatestMonth, &CancellationToken::new())
        .await
        .unwrap();
    let IngestOutcome::Completed { hash, .. } = outcome else {
        panic!("expected a completed ingestion");
    };

    let chunk = store.object(&chunk_name(&hash, 0, "csv")).unwrap();
    let chunk = String::from_utf8(chunk).unwrap();
    let lines: Vec<&str> = chunk.lines().collect();

    // Header plus the three rows, in input order.
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("TransactionId,"));
    assert!(lines[1].starts_with("\"{T1}\""));
    assert!(lines[2].starts_with("\"{T2}\""));
    assert!(lines[3].starts_with("\"{T3}\""));

    // Resolved postcode carries the embedded geo JSON; the row without a
    // postcode and the unknown postcode both end with an empty geo cell.
    assert!(lines[1].ends_with(r#""{""type"":""Point"",""coordinates"":[-0.141,51.501]}""#));
    assert!(lines[2].ends_with(r#","""#));
    assert!(lines[3].ends_with(r#","""#));
}

#[tokio::test]
async fn test_json_export_produces_json_chunks() {
    let server = MockServer::start().await;
    mount_dataset(&server, three_row_dataset()).await;

    let store = Arc::new(MemoryStore::default());
    let orchestrator = orchestrator(&server, Arc::clone(&store), ExportKind::Json);

    let outcome = orchestrator
        .run(DatasetSelector::LatestMonth, &CancellationToken::new())
        .await
        .unwrap();
    let IngestOutcome::Completed { hash, .. } = outcome else {
        panic!("expected a completed ingestion");
    };

    let chunk = store.object(&chunk_name(&hash, 0, "json")).unwrap();
    let rows: serde_json::Value = serde_json::from_slice(&chunk).unwrap();
    let rows = rows.as_array().unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["TransactionId"], "{T1}");
    assert_eq!(rows[0]["Geo"]["coordinates"][0], -0.141);
    assert!(rows[1].get("PostCode").is_none());
    assert!(rows[1].get("Geo").is_none());
}

#[tokio::test]
async fn test_changed_upstream_bytes_are_a_new_dataset() {
    let server = MockServer::start().await;
    let first_payload = three_row_dataset();
    mount_dataset(&server, first_payload.clone()).await;

    let store = Arc::new(MemoryStore::default());
    let orchestrator = orchestrator(&server, Arc::clone(&store), ExportKind::Csv);
    let cancel = CancellationToken::new();

    orchestrator
        .run(DatasetSelector::LatestMonth, &cancel)
        .await
        .unwrap();

    // Upstream republishes with one extra row: a different hash, a fully
    // separate ingestion.
    let second_payload = dataset(&[
        r#"{T1},285000,2024-03-01,SW1A 1AA,D,N,F,12,,Downing Street,,LONDON,WESTMINSTER,GREATER LONDON"#,
        r#"{T4},410000,2024-04-01,SW1A 1AA,S,N,F,14,,Downing Street,,LONDON,WESTMINSTER,GREATER LONDON"#,
    ]);
    server.reset().await;
    mount_dataset(&server, second_payload.clone()).await;

    let outcome = orchestrator
        .run(DatasetSelector::LatestMonth, &cancel)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        IngestOutcome::Completed {
            hash: content_hash(second_payload.as_bytes()),
            rows: 2
        }
    );

    // Both datasets are now marked.
    assert!(store
        .object(&marker_name(&content_hash(first_payload.as_bytes())))
        .is_some());
    assert!(store
        .object(&marker_name(&content_hash(second_payload.as_bytes())))
        .is_some());
}

#[tokio::test]
async fn test_download_failure_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pp-monthly-update-new-version.csv"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::default());
    let orchestrator = orchestrator(&server, Arc::clone(&store), ExportKind::Csv);

    let result = orchestrator
        .run(DatasetSelector::LatestMonth, &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(store.object_count(), 0);
}

#[tokio::test]
async fn test_malformed_row_aborts_before_any_write() {
    let server = MockServer::start().await;
    let payload = dataset(&[
        r#"{T1},285000,2024-03-01,SW1A 1AA,D,N,F,12,,,,LONDON,WESTMINSTER,GREATER LONDON"#,
        r#"{T2},not-a-price,2024-03-02,,,N,L,30,,,,LEEDS,LEEDS,WEST YORKSHIRE"#,
    ]);
    mount_dataset(&server, payload).await;

    let store = Arc::new(MemoryStore::default());
    let orchestrator = orchestrator(&server, Arc::clone(&store), ExportKind::Csv);

    let result = orchestrator
        .run(DatasetSelector::LatestMonth, &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(store.object_count(), 0);
}

#[tokio::test]
async fn test_cancellation_aborts_attempt_without_writes() {
    let server = MockServer::start().await;
    mount_dataset(&server, three_row_dataset()).await;

    let store = Arc::new(MemoryStore::default());
    let orchestrator = orchestrator(&server, Arc::clone(&store), ExportKind::Csv);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = orchestrator.run(DatasetSelector::LatestMonth, &cancel).await;

    assert!(result.is_err());
    assert_eq!(store.object_count(), 0);
}
