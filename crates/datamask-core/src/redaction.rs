use serde::{Deserialize, Serialize};

use crate::config::DataSourceConfig;

const MASK: &str = "***";

/// Connection metadata with secrets redacted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedConnection {
    pub engine: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub redacted: String,
}

/// Redact secrets from a URL-style or `key=value` connection string while
/// extracting non-sensitive metadata.
pub fn redact_connection_string(conn: &str) -> RedactedConnection {
    let mut out = RedactedConnection {
        engine: None,
        user: None,
        host: None,
        port: None,
        database: None,
        redacted: conn.to_string(),
    };

    let Some((scheme, rest)) = conn.split_once("://") else {
        let redacted = redact_key_values(conn, &mut out);
        out.redacted = redacted;
        return out;
    };
    out.engine = Some(scheme.to_string());

    let (authority, location) = match rest.split_once('@') {
        Some((auth, location)) => (Some(auth), location),
        None => (None, rest),
    };

    let mut rebuilt = format!("{scheme}://");
    if let Some(auth) = authority {
        match auth.split_once(':') {
            Some((user, _password)) => {
                out.user = Some(user.to_string());
                rebuilt.push_str(&format!("{user}:{MASK}@"));
            }
            None => {
                out.user = Some(auth.to_string());
                rebuilt.push_str(&format!("{auth}@"));
            }
        }
    }
    rebuilt.push_str(location);

    let location = location.split('?').next().unwrap_or_default();
    let (host_port, path) = location.split_once('/').unwrap_or((location, ""));
    if !host_port.is_empty() {
        match host_port.rsplit_once(':') {
            Some((host, port)) => {
                out.host = Some(host.to_string());
                out.port = port.parse::<u16>().ok();
            }
            None => out.host = Some(host_port.to_string()),
        }
    }
    if !path.is_empty() {
        out.database = Some(path.to_string());
    }

    out.redacted = redact_query_params(&rebuilt);
    out
}

/// Copy of a data source config that is safe to persist or log.
pub fn redact_data_source(config: &DataSourceConfig) -> DataSourceConfig {
    let mut redacted = config.clone();
    redacted.connection_string = config
        .connection_string
        .as_deref()
        .map(|conn| redact_connection_string(conn).redacted);
    redacted
}

fn redact_query_params(conn: &str) -> String {
    let Some((base, query)) = conn.split_once('?') else {
        return conn.to_string();
    };

    let params = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive_key(key) => format!("{key}={MASK}"),
            Some((key, value)) if !value.is_empty() => format!("{key}={value}"),
            Some((key, _)) => key.to_string(),
            None => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{base}?{params}")
}

/// libpq (`host=db password=x`) and ADO (`Server=db;Password=x`) styles.
fn redact_key_values(conn: &str, out: &mut RedactedConnection) -> String {
    let mut redacted = String::with_capacity(conn.len());
    let mut rest = conn;
    while !rest.is_empty() {
        let separators = rest.len() - rest.trim_start_matches(is_separator).len();
        redacted.push_str(&rest[..separators]);
        rest = &rest[separators..];

        let (pair, tail) = rest.split_at(pair_len(rest));
        redacted.push_str(&redact_pair(pair, out));
        rest = tail;
    }
    redacted
}

fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || ch == ';'
}

/// Byte length of the leading pair; quoted values may contain separators.
fn pair_len(input: &str) -> usize {
    let mut quoted = false;
    let mut escaped = false;
    for (idx, ch) in input.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '\'' => quoted = !quoted,
            ch if !quoted && is_separator(ch) => return idx,
            _ => {}
        }
    }
    input.len()
}

fn redact_pair(pair: &str, out: &mut RedactedConnection) -> String {
    let Some((key, value)) = pair.split_once('=') else {
        return pair.to_string();
    };
    if is_sensitive_key(key.trim()) {
        return format!("{key}={MASK}");
    }

    let value = value.trim_matches('\'').to_string();
    match key.trim().to_lowercase().as_str() {
        "user" | "username" | "uid" => out.user = Some(value),
        "host" | "hostaddr" | "server" => out.host = Some(value),
        "port" => out.port = value.parse::<u16>().ok(),
        "dbname" | "database" => out.database = Some(value),
        _ => {}
    }
    pair.to_string()
}

fn is_sensitive_key(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "password" | "pass" | "pwd" | "token" | "api_key" | "apikey"
    )
}
