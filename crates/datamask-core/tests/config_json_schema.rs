use datamask_core::config_json_schema;
use jsonschema::JSONSchema;
use serde_json::json;

fn compiled() -> JSONSchema {
    let schema = serde_json::to_value(config_json_schema()).expect("serialize schema");
    JSONSchema::compile(&schema).expect("compile schema")
}

#[test]
fn sample_config_matches_schema() {
    let sample = json!({
        "data_source": { "type": "postgres", "connection_string": "postgres://localhost/app" },
        "tables": [{
            "name": "customers",
            "columns": [
                { "name": "email", "strategy": "generate", "type_hint": "email" },
                { "name": "country", "strategy": "lookup", "source": "select name from countries" }
            ]
        }],
        "sql_statements": [{ "name": "wipe_notes", "body": "update notes set body = ''" }]
    });

    assert!(compiled().is_valid(&sample));
}

#[test]
fn schema_rejects_missing_data_source() {
    let sample = json!({ "tables": [] });
    assert!(!compiled().is_valid(&sample));
}

#[test]
fn schema_rejects_unknown_strategy() {
    let sample = json!({
        "data_source": { "type": "postgres" },
        "tables": [{
            "name": "customers",
            "columns": [{ "name": "email", "strategy": "explode" }]
        }]
    });
    assert!(!compiled().is_valid(&sample));
}
