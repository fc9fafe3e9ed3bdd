use sqlx::PgPool;

use datamask_core::{Error, Result, TableConfig};

/// Types decoded natively; anything else is read back as text.
const NATIVE_TYPES: &[&str] = &[
    "bool", "int2", "int4", "int8", "float4", "float8", "text", "varchar", "bpchar", "name",
    "uuid", "date", "time", "timestamp", "bytea",
];

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ColumnMeta {
    pub name: String,
    pub udt_schema: String,
    pub udt_name: String,
}

impl ColumnMeta {
    fn is_native(&self) -> bool {
        self.udt_schema == "pg_catalog" && NATIVE_TYPES.contains(&self.udt_name.as_str())
    }

    /// Expression used in the select list.
    fn select_expr(&self) -> String {
        let ident = quote_ident(&self.name);
        if self.is_native() {
            ident
        } else {
            format!("{ident}::text AS {ident}")
        }
    }

    /// Cast applied to a text parameter bound for this column.
    fn cast_param(&self, position: usize) -> String {
        format!(
            "CAST(${position} AS {}.{})",
            quote_ident(&self.udt_schema),
            quote_ident(&self.udt_name)
        )
    }
}

pub async fn list_columns(pool: &PgPool, table: &TableConfig) -> Result<Vec<ColumnMeta>> {
    let columns = sqlx::query_as::<_, ColumnMeta>(
        r#"
        select
          column_name::text as name,
          udt_schema::text as udt_schema,
          udt_name::text as udt_name
        from information_schema.columns
        where table_schema = coalesce($1, current_schema())
          and table_name = $2
        order by ordinal_position
        "#,
    )
    .bind(table.schema.as_deref())
    .bind(&table.name)
    .fetch_all(pool)
    .await
    .map_err(store_error)?;

    if columns.is_empty() {
        return Err(Error::Configuration(format!(
            "table '{}' does not exist or has no visible columns",
            table.qualified_name()
        )));
    }
    Ok(columns)
}

pub async fn count_rows(pool: &PgPool, table: &TableConfig) -> Result<u64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {}{}",
        qualified_table(table),
        where_clause(table)
    );
    let count = sqlx::query_scalar::<_, i64>(&sql)
        .fetch_one(pool)
        .await
        .map_err(store_error)?;
    Ok(count.max(0) as u64)
}

/// Primary key plus masked columns, ordered by primary key.
pub fn select_sql(table: &TableConfig, columns: &[ColumnMeta]) -> Result<String> {
    let mut select = vec![find_column(table, columns, &table.primary_key_column)?.select_expr()];
    for name in table.masked_column_names() {
        select.push(find_column(table, columns, name)?.select_expr());
    }

    Ok(format!(
        "SELECT {} FROM {}{} ORDER BY {}.{}",
        select.join(", "),
        qualified_table(table),
        where_clause(table),
        qualified_table(table),
        quote_ident(&table.primary_key_column)
    ))
}

/// Parameterized update for one row: masked columns first, primary key last.
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub sql: String,
    pub columns: Vec<String>,
}

impl UpdatePlan {
    pub fn new(table: &TableConfig, columns: &[ColumnMeta]) -> Result<Self> {
        let masked = table.masked_column_names();
        let mut assignments = Vec::with_capacity(masked.len());
        for (idx, name) in masked.iter().enumerate() {
            let meta = find_column(table, columns, name)?;
            assignments.push(format!("{} = {}", quote_ident(name), meta.cast_param(idx + 1)));
        }
        let pk = find_column(table, columns, &table.primary_key_column)?;

        Ok(Self {
            sql: format!(
                "UPDATE {} SET {} WHERE {} = {}",
                qualified_table(table),
                assignments.join(", "),
                quote_ident(&pk.name),
                pk.cast_param(masked.len() + 1)
            ),
            columns: masked.into_iter().map(str::to_string).collect(),
        })
    }
}

fn find_column<'a>(
    table: &TableConfig,
    columns: &'a [ColumnMeta],
    name: &str,
) -> Result<&'a ColumnMeta> {
    columns
        .iter()
        .find(|column| column.name == name)
        .ok_or_else(|| {
            Error::Configuration(format!(
                "column '{name}' does not exist in table '{}'",
                table.qualified_name()
            ))
        })
}

fn where_clause(table: &TableConfig) -> String {
    match table.filter.as_deref().map(str::trim) {
        Some(filter) if !filter.is_empty() => format!(" WHERE {filter}"),
        _ => String::new(),
    }
}

pub fn qualified_table(table: &TableConfig) -> String {
    match &table.schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&table.name)),
        None => quote_ident(&table.name),
    }
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn store_error(err: sqlx::Error) -> Error {
    Error::Store(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamask_core::ColumnConfig;

    fn meta(name: &str, udt_name: &str) -> ColumnMeta {
        ColumnMeta {
            name: name.to_string(),
            udt_schema: "pg_catalog".to_string(),
            udt_name: udt_name.to_string(),
        }
    }

    fn customers() -> (TableConfig, Vec<ColumnMeta>) {
        let mut table = TableConfig::new("customers")
            .with_filter("region = 'north'")
            .with_column(ColumnConfig::generate("email", "email"))
            .with_column(ColumnConfig::generate("balance", "word"));
        table.schema = Some("crm".to_string());
        let columns = vec![
            meta("id", "int8"),
            meta("email", "varchar"),
            meta("balance", "numeric"),
            meta("region", "text"),
        ];
        (table, columns)
    }

    #[test]
    fn select_reads_key_and_masked_columns_in_key_order() {
        let (table, columns) = customers();
        let sql = select_sql(&table, &columns).expect("select");
        assert_eq!(
            sql,
            "SELECT \"id\", \"email\", \"balance\"::text AS \"balance\" FROM \"crm\".\"customers\" \
             WHERE region = 'north' ORDER BY \"crm\".\"customers\".\"id\""
        );
    }

    #[test]
    fn text_read_keys_still_order_by_the_column() {
        let (table, mut columns) = customers();
        columns[0] = meta("id", "numeric");
        let sql = select_sql(&table, &columns).expect("select");
        assert!(sql.starts_with("SELECT \"id\"::text AS \"id\", "));
        assert!(sql.ends_with("ORDER BY \"crm\".\"customers\".\"id\""));
    }

    #[test]
    fn update_casts_text_parameters() {
        let (table, columns) = customers();
        let plan = UpdatePlan::new(&table, &columns).expect("plan");
        assert_eq!(
            plan.sql,
            "UPDATE \"crm\".\"customers\" SET \"email\" = CAST($1 AS \"pg_catalog\".\"varchar\"), \
             \"balance\" = CAST($2 AS \"pg_catalog\".\"numeric\") \
             WHERE \"id\" = CAST($3 AS \"pg_catalog\".\"int8\")"
        );
        assert_eq!(plan.columns, vec!["email", "balance"]);
    }

    #[test]
    fn unknown_columns_are_configuration_errors() {
        let (table, mut columns) = customers();
        columns.retain(|column| column.name != "email");
        let err = select_sql(&table, &columns).expect_err("email missing");
        assert!(err.is_configuration());
    }

    #[test]
    fn quotes_embedded_quotes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
