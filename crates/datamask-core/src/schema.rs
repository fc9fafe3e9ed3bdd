use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::config::Config;

/// Emit the JSON Schema for masking configuration files.
pub fn config_json_schema() -> RootSchema {
    schema_for!(Config)
}
