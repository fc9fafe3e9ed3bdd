use sqlx::postgres::PgRow;
use sqlx::types::Uuid;
use sqlx::types::chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{Column, Row as _, TypeInfo};

use datamask_core::{Error, Result, Row, Value};

/// Convert a fetched row into a datamask row, keeping column order.
pub fn decode_row(row: &PgRow) -> Result<Row> {
    let mut out = Row::with_capacity(row.len());
    for idx in 0..row.len() {
        out.insert(row.column(idx).name(), decode_value(row, idx)?);
    }
    Ok(out)
}

pub fn decode_value(row: &PgRow, idx: usize) -> Result<Value> {
    let column = row.column(idx);
    let type_name = column.type_info().name().to_ascii_lowercase();

    let value = match type_name.as_str() {
        "bool" => row.try_get::<Option<bool>, _>(idx).map(|v| v.map(Value::Bool)),
        "int2" => row
            .try_get::<Option<i16>, _>(idx)
            .map(|v| v.map(|n| Value::Int(n.into()))),
        "int4" => row
            .try_get::<Option<i32>, _>(idx)
            .map(|v| v.map(|n| Value::Int(n.into()))),
        "int8" => row.try_get::<Option<i64>, _>(idx).map(|v| v.map(Value::Int)),
        "float4" => row
            .try_get::<Option<f32>, _>(idx)
            .map(|v| v.map(|n| Value::Float(n.into()))),
        "float8" => row.try_get::<Option<f64>, _>(idx).map(|v| v.map(Value::Float)),
        "uuid" => row
            .try_get::<Option<Uuid>, _>(idx)
            .map(|v| v.map(|id| Value::Uuid(id.to_string()))),
        "date" => row
            .try_get::<Option<NaiveDate>, _>(idx)
            .map(|v| v.map(Value::Date)),
        "time" => row
            .try_get::<Option<NaiveTime>, _>(idx)
            .map(|v| v.map(Value::Time)),
        "timestamp" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map(|v| v.map(Value::Timestamp)),
        "bytea" => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .map(|v| v.map(Value::Bytes)),
        _ => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map(Value::Text)),
    }
    .map_err(|err| {
        Error::Store(format!(
            "decoding column '{}' ({type_name}): {err}",
            column.name()
        ))
    })?;

    Ok(value.unwrap_or(Value::Null))
}
