use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;

use datamask_core::{
    ColumnConfig, DataGenerationConfig, LookupSource, MaskStrategy, Result, Row, TableConfig,
    Value,
};
use datamask_mask::{MaskingEngine, default_providers};

#[derive(Default)]
struct FixedLookup {
    values: HashMap<String, Vec<Value>>,
    calls: AtomicUsize,
}

impl FixedLookup {
    fn with(mut self, source: &str, values: Vec<Value>) -> Self {
        self.values.insert(source.to_string(), values);
        self
    }
}

#[async_trait]
impl LookupSource for FixedLookup {
    async fn lookup_values(&self, source: &str) -> Result<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.values.get(source).cloned().unwrap_or_default())
    }
}

fn engine_with(lookup: Arc<FixedLookup>, seed: u64) -> MaskingEngine {
    let generation = DataGenerationConfig {
        locale: "en_US".to_string(),
        seed: Some(seed),
    };
    MaskingEngine::new(default_providers(lookup), &generation)
}

fn customers() -> TableConfig {
    TableConfig::new("customers")
        .with_column(ColumnConfig::generate("email", "email"))
        .with_column(ColumnConfig::generate("full_name", "full_name"))
}

fn customer_row(id: i64, email: &str) -> Row {
    Row::new()
        .with("id", id)
        .with("email", email)
        .with("full_name", "Ada Lovelace")
        .with("created_at", "2021-04-01")
}

#[tokio::test]
async fn masking_preserves_columns_and_passthrough_values() {
    let engine = engine_with(Arc::new(FixedLookup::default()), 11);
    let table = customers();
    let mut masker = engine.prepare(&table).expect("rules resolve");

    let original = customer_row(1, "ada@example.com");
    let masked = masker.mask(original.clone()).await.expect("row masks");

    let columns: Vec<_> = masked.columns().collect();
    assert_eq!(columns, vec!["id", "email", "full_name", "created_at"]);
    assert_eq!(masked.get("id"), original.get("id"));
    assert_eq!(masked.get("created_at"), original.get("created_at"));
    assert_ne!(masked.get("email"), original.get("email"));
    assert!(masked.get("email").and_then(Value::as_str).is_some_and(|email| email.contains('@')));
}

#[tokio::test]
async fn same_seed_reproduces_the_same_rows() {
    let table = customers();
    let mut outputs = Vec::new();
    for _ in 0..2 {
        let engine = engine_with(Arc::new(FixedLookup::default()), 99);
        let mut masker = engine.prepare(&table).expect("rules resolve");
        let mut rows = Vec::new();
        for id in 1..=3 {
            rows.push(masker.mask(customer_row(id, "x@example.com")).await.expect("mask"));
        }
        outputs.push(rows);
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_ne!(outputs[0][0].get("email"), outputs[0][1].get("email"));
}

#[tokio::test]
async fn unsupported_hint_fails_before_any_row() {
    let engine = engine_with(Arc::new(FixedLookup::default()), 1);
    let table =
        TableConfig::new("customers").with_column(ColumnConfig::generate("email", "favourite_colour"));

    let err = engine.validate_table(&table).expect_err("hint is unknown");
    assert!(err.is_configuration());
    assert!(err.to_string().contains("favourite_colour"));
}

#[tokio::test]
async fn unsupported_locale_is_a_configuration_error() {
    let engine = engine_with(Arc::new(FixedLookup::default()), 1);
    let table = TableConfig::new("customers").with_column(ColumnConfig::new(
        "email",
        MaskStrategy::Generate {
            type_hint: "email".to_string(),
            locale: Some("tlh_QO".to_string()),
        },
    ));

    let err = engine.prepare(&table).err().expect("locale is unknown");
    assert!(err.is_configuration());
}

#[tokio::test]
async fn nulls_and_empty_strings_follow_retain_flags() {
    let engine = engine_with(Arc::new(FixedLookup::default()), 5);
    let mut keep_empty = ColumnConfig::generate("nickname", "username");
    keep_empty.retain_empty_string = true;
    let mut mask_null = ColumnConfig::generate("phone", "phone_number");
    mask_null.retain_null = false;
    let table = TableConfig::new("people")
        .with_column(ColumnConfig::generate("email", "email"))
        .with_column(keep_empty)
        .with_column(mask_null);

    let row = Row::new()
        .with("id", 1)
        .with("email", Value::Null)
        .with("nickname", "")
        .with("phone", Value::Null);
    let masked = engine.mask_row(row, &table).await.expect("row masks");

    assert_eq!(masked.get("email"), Some(&Value::Null));
    assert_eq!(masked.get("nickname"), Some(&Value::Text(String::new())));
    assert!(masked.get("phone").is_some_and(|value| !value.is_null()));
}

#[tokio::test]
async fn consistent_columns_reuse_values_within_a_pass() {
    let engine = engine_with(Arc::new(FixedLookup::default()), 3);
    let table =
        TableConfig::new("orders").with_column(ColumnConfig::generate("customer_email", "email").consistent());
    let mut masker = engine.prepare(&table).expect("rules resolve");

    let first = masker
        .mask(Row::new().with("id", 1).with("customer_email", "a@x.io"))
        .await
        .expect("mask");
    let second = masker
        .mask(Row::new().with("id", 2).with("customer_email", "b@x.io"))
        .await
        .expect("mask");
    let third = masker
        .mask(Row::new().with("id", 3).with("customer_email", "a@x.io"))
        .await
        .expect("mask");

    assert_eq!(first.get("customer_email"), third.get("customer_email"));
    assert_ne!(first.get("customer_email"), second.get("customer_email"));
}

#[tokio::test]
async fn literal_rules_write_constants() {
    let engine = engine_with(Arc::new(FixedLookup::default()), 3);
    let table = TableConfig::new("accounts").with_column(ColumnConfig::literal("notes", json!("redacted")));
    let masked = engine
        .mask_row(Row::new().with("id", 1).with("notes", "call me"), &table)
        .await
        .expect("row masks");
    assert_eq!(masked.get("notes"), Some(&Value::Text("redacted".to_string())));
}

#[tokio::test]
async fn lookup_values_are_fetched_once_per_table_pass() {
    let lookup = Arc::new(FixedLookup::default().with(
        "SELECT name FROM countries",
        vec![Value::from("Brazil"), Value::from("France")],
    ));
    let engine = engine_with(Arc::clone(&lookup), 8);
    let table = TableConfig::new("addresses")
        .with_column(ColumnConfig::lookup("country", "SELECT name FROM countries"));

    let mut masker = engine.prepare(&table).expect("rules resolve");
    for id in 1..=4 {
        let masked = masker
            .mask(Row::new().with("id", id).with("country", "Chile"))
            .await
            .expect("mask");
        let country = masked.get("country").and_then(Value::as_str).expect("text");
        assert!(country == "Brazil" || country == "France");
    }
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);

    let mut masker = engine.prepare(&table).expect("rules resolve");
    masker
        .mask(Row::new().with("id", 5).with("country", "Chile"))
        .await
        .expect("mask");
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_lookup_without_default_names_the_row() {
    let engine = engine_with(Arc::new(FixedLookup::default()), 8);
    let table = TableConfig::new("addresses")
        .with_column(ColumnConfig::lookup("country", "SELECT name FROM countries"));

    let mut masker = engine.prepare(&table).expect("rules resolve");
    let err = masker
        .mask(Row::new().with("id", 42).with("country", "Chile"))
        .await
        .expect_err("no candidates");

    assert!(err.is_provider());
    let message = err.to_string();
    assert!(message.contains("id=42"), "{message}");
    assert!(message.contains("country"), "{message}");
}

#[tokio::test]
async fn empty_lookup_uses_the_default() {
    let engine = engine_with(Arc::new(FixedLookup::default()), 8);
    let table = TableConfig::new("addresses").with_column(ColumnConfig::new(
        "country",
        MaskStrategy::Lookup {
            source: "SELECT name FROM countries".to_string(),
            default: Some(json!("Unknown")),
        },
    ));
    let masked = engine
        .mask_row(Row::new().with("id", 1).with("country", "Chile"), &table)
        .await
        .expect("default applies");
    assert_eq!(masked.get("country"), Some(&Value::from("Unknown")));
}

#[tokio::test]
async fn missing_column_is_a_provider_error() {
    let engine = engine_with(Arc::new(FixedLookup::default()), 8);
    let err = engine
        .mask_row(Row::new().with("id", 1), &customers())
        .await
        .expect_err("email is absent");
    assert!(err.is_provider());
}

#[tokio::test]
async fn ignored_rules_leave_values_alone() {
    let engine = engine_with(Arc::new(FixedLookup::default()), 8);
    let mut ignored = ColumnConfig::generate("email", "email");
    ignored.ignore = true;
    let table = TableConfig::new("customers").with_column(ignored);
    let masked = engine
        .mask_row(customer_row(1, "keep@example.com"), &table)
        .await
        .expect("row masks");
    assert_eq!(masked.get("email"), Some(&Value::from("keep@example.com")));
}
