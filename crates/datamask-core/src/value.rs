use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Dynamic value of a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, Value::Text(value) if value.is_empty())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) | Value::Uuid(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Convert a JSON literal from configuration into a column value.
    ///
    /// Arrays and objects are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Bool(*value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => Value::Int(value),
                None => Value::Float(number.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(value) => Value::Text(value.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Text form understood by SQL stores when bound as a parameter and cast
    /// to the column type. `None` means SQL NULL.
    pub fn to_sql_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bytes(bytes) => Some(format!("\\x{}", hex::encode(bytes))),
            other => Some(other.to_string()),
        }
    }

    /// Stable key used to cache masked values by original value.
    pub fn fingerprint(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(value) => format!("b:{value}"),
            Value::Int(value) => format!("i:{value}"),
            Value::Float(value) => format!("f:{}", value.to_bits()),
            Value::Text(value) => format!("t:{value}"),
            Value::Uuid(value) => format!("u:{value}"),
            Value::Date(value) => format!("d:{value}"),
            Value::Time(value) => format!("tm:{value}"),
            Value::Timestamp(value) => format!("ts:{value}"),
            Value::Bytes(value) => format!("x:{}", hex::encode(value)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Text(value) | Value::Uuid(value) => f.write_str(value),
            Value::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Value::Time(value) => write!(f, "{}", value.format("%H:%M:%S%.f")),
            Value::Timestamp(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Bytes(value) => write!(f, "\\x{}", hex::encode(value)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Ordered mapping of column name to value. Column names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Builder form of [`Row::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Insert a column, replacing the value when the name already exists.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Replace the value of an existing column and return the previous one.
    /// Returns `None` without touching the row when the column is absent.
    pub fn replace(&mut self, column: &str, value: Value) -> Option<Value> {
        self.fields
            .iter_mut()
            .find(|(name, _)| name == column)
            .map(|(_, slot)| std::mem::replace(slot, value))
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_names_unique_and_order_stable() {
        let mut row = Row::new().with("id", 1).with("email", "a@b.c");
        row.insert("id", 2);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["id", "email"]);
        assert_eq!(row.get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn replace_never_adds_columns() {
        let mut row = Row::new().with("id", 1);
        assert_eq!(row.replace("email", Value::Null), None);
        assert_eq!(row.len(), 1);
        assert_eq!(row.replace("id", Value::Int(5)), Some(Value::Int(1)));
    }

    #[test]
    fn renders_sql_text() {
        let date = NaiveDate::from_ymd_opt(1990, 4, 2).unwrap_or_default();
        assert_eq!(Value::Date(date).to_sql_text().as_deref(), Some("1990-04-02"));
        assert_eq!(
            Value::Bytes(vec![0xde, 0xad]).to_sql_text().as_deref(),
            Some("\\xdead")
        );
        assert_eq!(Value::Null.to_sql_text(), None);
    }

    #[test]
    fn converts_json_literals() {
        assert_eq!(Value::from_json(&serde_json::json!(3)), Value::Int(3));
        assert_eq!(Value::from_json(&serde_json::json!(1.5)), Value::Float(1.5));
        assert_eq!(
            Value::from_json(&serde_json::json!("x")),
            Value::Text("x".to_string())
        );
        assert_eq!(Value::from_json(&serde_json::Value::Null), Value::Null);
    }
}
