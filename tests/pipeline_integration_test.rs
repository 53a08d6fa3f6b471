//! End-to-end tests driving extract, transform and load against in-memory fakes

mod common;

use common::*;
use quarry::adapters::storage::{MemoryObjectStore, ObjectStore};
use quarry::core::extract::{ExtractRequest, Extractor};
use quarry::core::pipeline::run_pipeline;
use quarry::core::state::{StateManager, WatermarkState};
use quarry::core::status::StageStatus;
use quarry::domain::{QuarryError, SourceTable, WarehouseTable};
use serde_json::json;
use std::sync::Arc;

fn sales_only() -> ExtractRequest {
    ExtractRequest {
        tables: Some(vec!["sales_order".to_string()]),
    }
}

async fn seed_watermark(store: &Arc<MemoryObjectStore>, table: &str, value: &str) {
    let mut state = WatermarkState::new();
    state.set_raw(table, value);
    StateManager::new(store.clone(), "state/last_updated.json")
        .save(&state)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_new_row_advances_watermark_and_rerun_extracts_nothing() {
    let store = Arc::new(MemoryObjectStore::new());
    let ctx = context(store.clone());
    seed_watermark(&store, "sales_order", "2024-01-01T00:00:00Z").await;

    let source = Arc::new(FakeSource::new());
    source.set_rows(
        SourceTable::SalesOrder,
        vec![
            sales_order("1", "2023-12-15 08:00:00"),
            sales_order("2", "2024-02-01 00:00:00"),
        ],
    );

    let first = Extractor::new(&ctx, source.clone())
        .run(&sales_only())
        .await
        .unwrap();
    assert_eq!(first.status, StageStatus::Success);
    assert_eq!(first.rows, 1);
    assert_eq!(first.s3_keys["sales_order"].len(), 1);
    assert_eq!(first.watermarks["sales_order"], "2024-02-01T00:00:00Z");

    let second = Extractor::new(&ctx, source).run(&sales_only()).await.unwrap();
    assert_eq!(second.rows, 0);
    assert!(second.s3_keys.is_empty());
    assert_eq!(second.watermarks["sales_order"], "2024-02-01T00:00:00Z");

    let saved = StateManager::new(store.clone(), "state/last_updated.json")
        .load()
        .await
        .unwrap();
    assert_eq!(saved.get("sales_order"), Some("2024-02-01T00:00:00Z"));
}

#[tokio::test]
async fn test_watermark_never_moves_backwards() {
    let store = Arc::new(MemoryObjectStore::new());
    let ctx = context(store.clone());
    seed_watermark(&store, "sales_order", "2024-03-01T00:00:00Z").await;

    let source = Arc::new(FakeSource::unfiltered());
    source.set_rows(
        SourceTable::SalesOrder,
        vec![sales_order("1", "2024-02-01 00:00:00")],
    );

    let response = Extractor::new(&ctx, source).run(&sales_only()).await.unwrap();
    assert_eq!(response.rows, 1);
    assert_eq!(response.watermarks["sales_order"], "2024-03-01T00:00:00Z");
}

#[tokio::test]
async fn test_failed_table_keeps_its_watermark_and_others_proceed() {
    let store = Arc::new(MemoryObjectStore::new());
    let ctx = context(store.clone());

    let source = Arc::new(FakeSource::new());
    source.set_rows(SourceTable::Currency, vec![currency("1", "GBP")]);
    source.set_rows(
        SourceTable::Staff,
        vec![staff("1", "1", "2024-02-01 00:00:00")],
    );
    source.fail(SourceTable::Staff);

    let request = ExtractRequest {
        tables: Some(vec!["currency".to_string(), "staff".to_string()]),
    };
    let response = Extractor::new(&ctx, source).run(&request).await.unwrap();

    assert_eq!(response.status, StageStatus::Success);
    assert_eq!(response.failed_tables, vec!["staff".to_string()]);
    assert!(response.s3_keys.contains_key("currency"));
    assert!(!response.watermarks.contains_key("staff"));
    assert!(response.watermarks.contains_key("currency"));
}

#[tokio::test]
async fn test_unknown_table_rejected_before_any_io() {
    let store = Arc::new(MemoryObjectStore::new());
    let ctx = context(store.clone());
    let request = ExtractRequest {
        tables: Some(vec!["staff; DROP TABLE staff".to_string()]),
    };

    let err = Extractor::new(&ctx, Arc::new(FakeSource::new()))
        .run(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, QuarryError::Validation(_)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_full_cycle_loads_dimensions_before_facts() {
    let store = Arc::new(MemoryObjectStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = context_with(memory_config(), store.clone(), notifier.clone());

    let source = Arc::new(FakeSource::new());
    source.set_rows(SourceTable::Currency, vec![currency("1", "GBP")]);
    source.set_rows(SourceTable::Department, vec![department("1", "Sales", "Manchester")]);
    source.set_rows(
        SourceTable::Staff,
        vec![staff("1", "1", "2024-01-10 09:00:00")],
    );
    source.set_rows(SourceTable::Address, vec![address("1", "New Patienceburgh")]);
    source.set_rows(SourceTable::Counterparty, vec![counterparty("1", "1")]);
    source.set_rows(
        SourceTable::SalesOrder,
        vec![sales_order("1", "2024-02-01 14:20:52.186")],
    );
    source.set_rows(SourceTable::Payment, vec![payment("1", "t")]);

    let mut warehouse = FakeWarehouse::new();
    let response = run_pipeline(&ctx, source, Some(&mut warehouse)).await.unwrap();

    assert!(!response.has_failures());
    assert_eq!(response.transform.status, StageStatus::Success);
    let load = response.load.unwrap();
    assert_eq!(load.status_code, 200);
    for table in [
        "dim_currency",
        "dim_staff",
        "dim_location",
        "dim_counterparty",
        "dim_date",
        "fact_sales_order",
        "fact_payment",
    ] {
        assert!(load.loaded_tables.contains(&table.to_string()), "{table}");
    }

    let order = warehouse.tables_in_commit_order();
    let first_fact = order
        .iter()
        .position(|t| t.as_str().starts_with("fact_"))
        .unwrap();
    assert!(order[..first_fact]
        .iter()
        .all(|t| t.as_str().starts_with("dim_")));

    let staff_rows = warehouse.rows(WarehouseTable::DimStaff);
    assert_eq!(staff_rows[0]["department_name"], json!("Sales"));
    assert_eq!(staff_rows[0]["location"], json!("Manchester"));

    let sales = warehouse.rows(WarehouseTable::FactSalesOrder);
    assert_eq!(sales.len(), 1);
    assert!(sales[0].get("sales_record_id").is_none());
    assert_eq!(sales[0]["created_time"], json!("14:20:52.186"));

    let payments = warehouse.rows(WarehouseTable::FactPayment);
    assert_eq!(payments[0]["paid"], json!(true));

    let subjects = notifier.subjects.lock().unwrap().clone();
    assert_eq!(
        subjects,
        vec!["Ingestion Success", "Transform Success", "Load Success"]
    );
}

#[tokio::test]
async fn test_dry_run_writes_nothing_and_skips_load() {
    let store = Arc::new(MemoryObjectStore::new());
    let mut config = memory_config();
    config.application.dry_run = true;
    let ctx = context_with(config, store.clone(), Arc::new(RecordingNotifier::default()));

    let source = Arc::new(FakeSource::new());
    source.set_rows(SourceTable::Currency, vec![currency("1", "GBP")]);

    let mut warehouse = FakeWarehouse::new();
    let response = run_pipeline(&ctx, source, Some(&mut warehouse)).await.unwrap();

    assert_eq!(response.extract.rows, 1);
    assert!(response.extract.s3_keys.is_empty());
    assert!(response.load.is_none());
    assert!(store.list("").await.unwrap().is_empty());
    assert!(warehouse.committed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unparseable_watermark_falls_back_to_full_load() {
    let store = Arc::new(MemoryObjectStore::new());
    let ctx = context(store.clone());
    seed_watermark(&store, "sales_order", "not-a-date").await;

    let source = Arc::new(FakeSource::new());
    source.set_rows(
        SourceTable::SalesOrder,
        vec![
            sales_order("1", "2020-06-01 12:00:00"),
            sales_order("2", "2021-01-01 00:00:00"),
        ],
    );

    let response = Extractor::new(&ctx, source).run(&sales_only()).await.unwrap();
    assert_eq!(response.rows, 2);
    assert_eq!(response.watermarks["sales_order"], "2021-01-01T00:00:00Z");

    let saved = StateManager::new(store.clone(), "state/last_updated.json")
        .load()
        .await
        .unwrap();
    assert_eq!(saved.get("sales_order"), Some("2021-01-01T00:00:00Z"));
}

#[tokio::test]
async fn test_every_table_failing_sends_failure_notification() {
    let store = Arc::new(MemoryObjectStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = context_with(memory_config(), store, notifier.clone());

    let source = Arc::new(FakeSource::new());
    source.fail(SourceTable::SalesOrder);

    let response = Extractor::new(&ctx, source).run(&sales_only()).await.unwrap();
    assert_eq!(response.status, StageStatus::Error);

    let subjects = notifier.subjects.lock().unwrap().clone();
    assert_eq!(subjects, vec!["Ingestion Failed"]);
}

#[tokio::test]
async fn test_pipeline_without_warehouse_stops_after_transform() {
    let store = Arc::new(MemoryObjectStore::new());
    let ctx = context(store.clone());

    let source = Arc::new(FakeSource::new());
    source.set_rows(SourceTable::Currency, vec![currency("1", "GBP")]);

    let response = run_pipeline(&ctx, source, None).await.unwrap();

    assert_eq!(response.extract.s3_keys["currency"].len(), 1);
    assert!(response.transform.output_s3_keys.contains_key("dim_currency"));
    assert!(response.load.is_none());
}
