use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use datamask_core::Config;

/// Errors raised while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Overrides taken from the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub dry_run: Option<bool>,
    pub locale: Option<String>,
    pub update_batch_size: Option<usize>,
    pub seed: Option<u64>,
}

/// Load a configuration file; `.toml` files are read as TOML, anything else
/// as JSON.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn apply_overrides(config: &mut Config, overrides: &Overrides) {
    if let Some(dry_run) = overrides.dry_run {
        config.data_source.dry_run = dry_run;
    }
    if let Some(locale) = overrides.locale.as_deref().filter(|locale| !locale.is_empty()) {
        config.data_generation.locale = locale.to_string();
    }
    if let Some(batch_size) = overrides.update_batch_size {
        config.data_source.update_batch_size = batch_size;
    }
    if let Some(seed) = overrides.seed {
        config.data_generation.seed = Some(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("datamask-config-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join(name);
        fs::write(&path, contents).expect("write config");
        path
    }

    #[test]
    fn loads_toml_by_extension() {
        let path = write_temp(
            "mask.toml",
            r#"
            [data_source]
            type = "postgres"
            connection_string = "postgres://localhost/app"

            [[tables]]
            name = "customers"

            [[tables.columns]]
            name = "email"
            strategy = "generate"
            type_hint = "email"
            "#,
        );
        let config = load_config(&path).expect("toml parses");
        assert_eq!(config.tables[0].columns[0].name, "email");
        assert_eq!(config.data_source.update_batch_size, 500);
    }

    #[test]
    fn reports_the_file_on_parse_errors() {
        let path = write_temp("mask.json", "{ \"data_source\": ");
        let err = load_config(&path).expect_err("truncated json");
        assert!(matches!(err, ConfigError::Json { .. }));
        assert!(err.to_string().contains("mask.json"));
    }

    #[test]
    fn overrides_replace_loaded_values() {
        let path = write_temp("mask.json", r#"{ "data_source": { "type": "postgres" } }"#);
        let mut config = load_config(&path).expect("json parses");
        apply_overrides(
            &mut config,
            &Overrides {
                dry_run: Some(true),
                locale: Some("pt_BR".to_string()),
                update_batch_size: Some(50),
                seed: None,
            },
        );
        assert!(config.data_source.dry_run);
        assert_eq!(config.data_generation.locale, "pt_BR");
        assert_eq!(config.data_source.update_batch_size, 50);
        assert_eq!(config.data_generation.seed, None);
    }
}
