use futures::stream;
use tokio_util::sync::CancellationToken;

use datamask_core::{ColumnConfig, DataSourceConfig, Error, Result, Row, TableConfig, Value};
use datamask_source::{DataSource, MemoryStore, update_rows};

fn store_with(rows: usize, dry_run: bool, batch_size: usize) -> MemoryStore {
    let mut config = DataSourceConfig::new("memory");
    config.dry_run = dry_run;
    config.update_batch_size = batch_size;
    let store = MemoryStore::with_config(config);
    store.insert_table(
        "customers",
        (1..=rows as i64)
            .map(|id| {
                Row::new()
                    .with("id", id)
                    .with("email", format!("user{id}@example.com"))
            })
            .collect(),
    );
    store
}

fn customers() -> TableConfig {
    TableConfig::new("customers").with_column(ColumnConfig::generate("email", "email"))
}

fn masked(rows: usize) -> Vec<Result<Row>> {
    (1..=rows as i64)
        .map(|id| {
            Ok(Row::new()
                .with("id", id)
                .with("email", format!("masked{id}@example.org")))
        })
        .collect()
}

#[tokio::test]
async fn batches_cover_every_row_in_order() {
    for (rows, batch_size) in [(5, 2), (7, 7), (9, 4), (1, 500)] {
        let store = store_with(rows, false, batch_size);
        let mut progress = Vec::new();
        let summary = update_rows(
            &store,
            store.config(),
            &customers(),
            stream::iter(masked(rows)),
            rows as u64,
            &CancellationToken::new(),
            |done| progress.push(done),
        )
        .await
        .expect("update succeeds");

        let sizes = store.batch_sizes("customers");
        assert_eq!(sizes.len(), rows.div_ceil(batch_size));
        assert_eq!(sizes.iter().sum::<usize>(), rows);
        assert!(sizes.iter().all(|size| *size <= batch_size));
        assert_eq!(summary.rows, rows as u64);
        assert_eq!(summary.written, rows as u64);
        assert_eq!(progress.last().copied(), Some(rows as u64));
        assert!(progress.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

#[tokio::test]
async fn table_batch_size_overrides_the_source_default() {
    let store = store_with(5, false, 500);
    update_rows(
        &store,
        store.config(),
        &customers().with_batch_size(2),
        stream::iter(masked(5)),
        5,
        &CancellationToken::new(),
        |_| {},
    )
    .await
    .expect("update succeeds");
    assert_eq!(store.batch_sizes("customers"), vec![2, 2, 1]);
}

#[tokio::test]
async fn dry_run_reports_progress_without_writing() {
    let store = store_with(5, true, 2);
    let before = store.table("customers");
    let mut progress = Vec::new();

    let summary = update_rows(
        &store,
        store.config(),
        &customers(),
        stream::iter(masked(5)),
        5,
        &CancellationToken::new(),
        |done| progress.push(done),
    )
    .await
    .expect("dry run succeeds");

    assert_eq!(progress, vec![2, 4, 5]);
    assert_eq!(summary.batches, 3);
    assert_eq!(summary.written, 0);
    assert!(store.batch_sizes("customers").is_empty());
    assert_eq!(store.table("customers"), before);
}

#[tokio::test]
async fn given_settings_override_the_store_settings() {
    let store = store_with(5, false, 500);
    let mut settings = DataSourceConfig::new("memory");
    settings.dry_run = true;
    settings.update_batch_size = 2;

    let summary = update_rows(
        &store,
        &settings,
        &customers(),
        stream::iter(masked(5)),
        5,
        &CancellationToken::new(),
        |_| {},
    )
    .await
    .expect("dry run succeeds");

    assert_eq!(summary.batches, 3);
    assert_eq!(summary.written, 0);
    assert!(store.batch_sizes("customers").is_empty());
}

#[tokio::test]
async fn failing_batch_stops_the_table() {
    let store = store_with(6, false, 2);
    store.fail_batch(2);
    let mut progress = Vec::new();

    let err = update_rows(
        &store,
        store.config(),
        &customers(),
        stream::iter(masked(6)),
        6,
        &CancellationToken::new(),
        |done| progress.push(done),
    )
    .await
    .expect_err("second batch fails");

    assert!(err.is_store());
    assert_eq!(progress, vec![2]);
    let rows = store.table("customers");
    assert_eq!(rows[0].get("email"), Some(&Value::from("masked1@example.org")));
    assert_eq!(rows[2].get("email"), Some(&Value::from("user3@example.com")));
}

#[tokio::test]
async fn stream_errors_propagate() {
    let store = store_with(3, false, 2);
    let mut rows = masked(3);
    rows[2] = Err(Error::Store("connection reset".to_string()));

    let err = update_rows(
        &store,
        store.config(),
        &customers(),
        stream::iter(rows),
        3,
        &CancellationToken::new(),
        |_| {},
    )
    .await
    .expect_err("read fails");
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(store.batch_sizes("customers"), vec![2]);
}

#[tokio::test]
async fn cancellation_is_checked_before_each_batch() {
    let store = store_with(4, false, 2);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let err = update_rows(
        &store,
        store.config(),
        &customers(),
        stream::iter(masked(4)),
        4,
        &cancel,
        move |_| trigger.cancel(),
    )
    .await
    .expect_err("cancelled after first batch");

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(store.batch_sizes("customers"), vec![2]);
}

#[tokio::test]
async fn count_matches_streamed_rows() {
    use futures::StreamExt;

    let store = store_with(4, false, 2);
    let table = customers();
    let count = store.count(&table).await.expect("count");
    let streamed = store.rows(&table).await.expect("rows").count().await;
    assert_eq!(count, streamed as u64);
    assert_eq!(store.reads(), 1);
}
