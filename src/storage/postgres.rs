//! PostgreSQL storage backend using sqlx.
//!
//! Provides `PostgresDatabase`, a [`Database`] backed by a `sqlx::PgPool`.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! villa-inventory = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! # Schema
//!
//! Rows of every entity table live in one `entity_rows` table: a
//! `BIGSERIAL` identity, the owning `entity_table` and a JSONB `data`
//! column holding the serialized entity without its `id`. Unique columns
//! become partial unique expression indexes, created by [`ensure_schema`].
//! Referential checks run inside the write transaction.
//!
//! Filters are translated to SQL with every value and field name bound as
//! a parameter. JSON values are compared as `jsonb`, date-times as
//! `timestamptz`.

use crate::core::entity::TableSchema;
use crate::core::error::{PersistenceError, StoreError};
use crate::core::field::FieldValue;
use crate::core::filter::{CompareOp, Filter};
use crate::core::store::{Database, RowQuery, StoreResult, with_id};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, warn};

const BACKEND: &str = "postgres";

// ---------------------------------------------------------------------------
// Schema management
// ---------------------------------------------------------------------------

/// Apply the shared table and the per-entity unique indexes (idempotent).
///
/// Safe to call on every startup.
pub async fn ensure_schema(pool: &PgPool, schemas: &[&'static TableSchema]) -> StoreResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS entity_rows (
            id BIGSERIAL PRIMARY KEY,
            entity_table TEXT NOT NULL,
            data JSONB NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| {
        PersistenceError::backend(BACKEND, format!("Failed to create entity_rows: {}", e))
    })?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_entity_rows_table ON entity_rows (entity_table, id)",
    )
    .execute(pool)
    .await
    .map_err(|e| PersistenceError::backend(BACKEND, format!("Failed to create index: {}", e)))?;

    // index DDL cannot take bind parameters, names are checked instead
    let identifier = Regex::new(r"^[a-z_][a-z0-9_]*$")
        .map_err(|e| PersistenceError::backend(BACKEND, e))?;

    for schema in schemas {
        for column in schema.unique {
            for name in [schema.table, *column] {
                if !identifier.is_match(name) {
                    return Err(PersistenceError::backend(
                        BACKEND,
                        format!("Invalid identifier '{}'", name),
                    )
                    .into());
                }
            }

            let ddl = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_{table}_{column} \
                 ON entity_rows ((data ->> '{column}')) WHERE entity_table = '{table}'",
                table = schema.table,
                column = column
            );
            sqlx::query(&ddl).execute(pool).await.map_err(|e| {
                PersistenceError::backend(
                    BACKEND,
                    format!("Failed to create unique index on {}.{}: {}", schema.table, column, e),
                )
            })?;
        }
    }

    debug!(tables = schemas.len(), "Postgres schema ready");
    Ok(())
}

// ---------------------------------------------------------------------------
// PostgresDatabase
// ---------------------------------------------------------------------------

/// Database backed by PostgreSQL
#[derive(Clone, Debug)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    /// Create a new `PostgresDatabase` with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url`
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| PersistenceError::backend(BACKEND, format!("Failed to connect: {}", e)))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Reject foreign keys naming no row, locking the referenced rows
    /// until the surrounding transaction ends.
    async fn check_references(
        tx: &mut Transaction<'_, Postgres>,
        schema: &'static TableSchema,
        row: &Value,
    ) -> StoreResult<()> {
        for navigation in schema.navigations {
            let key = match row.get(navigation.foreign_key) {
                None | Some(Value::Null) => continue,
                Some(key) => key,
            };
            let target = navigation.target_schema();

            let present = match key.as_i64() {
                Some(id) => sqlx::query_scalar::<_, i64>(
                    "SELECT id FROM entity_rows WHERE entity_table = $1 AND id = $2 FOR KEY SHARE",
                )
                .bind(target.table)
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error(schema, e))?
                .is_some(),
                None => false,
            };

            if !present {
                warn!(
                    table = schema.table,
                    foreign_key = navigation.foreign_key,
                    "Foreign key constraint violated"
                );
                return Err(PersistenceError::constraint(
                    schema.table,
                    format!(
                        "'{}' = {} references no row in '{}'",
                        navigation.foreign_key, key, target.table
                    ),
                )
                .into());
            }
        }
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| {
            PersistenceError::backend(BACKEND, format!("Failed to begin transaction: {}", e)).into()
        })
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn insert(&self, schema: &'static TableSchema, row: Value) -> StoreResult<i64> {
        let data = without_id(row);
        let mut tx = self.begin().await?;

        Self::check_references(&mut tx, schema, &data).await?;

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO entity_rows (entity_table, data) VALUES ($1, $2) RETURNING id",
        )
        .bind(schema.table)
        .bind(&data)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(schema, e))?;

        tx.commit().await.map_err(|e| map_sqlx_error(schema, e))?;
        Ok(id)
    }

    async fn select(
        &self,
        schema: &'static TableSchema,
        query: RowQuery<'_>,
    ) -> StoreResult<Vec<Value>> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT id, data FROM entity_rows WHERE entity_table = ");
        builder.push_bind(schema.table);

        if let Some(filter) = query.filter {
            builder.push(" AND ");
            push_filter(&mut builder, filter);
        }

        builder.push(" ORDER BY id");
        if let Some(take) = query.take {
            builder.push(" LIMIT ").push_bind(take as i64);
        }
        if query.skip > 0 {
            builder.push(" OFFSET ").push_bind(query.skip as i64);
        }

        debug!(table = schema.table, sql = builder.sql(), "Executing select");
        let rows = builder
            .build_query_as::<(i64, Value)>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(schema, e))?;

        Ok(rows.into_iter().map(|(id, data)| with_id(&data, id)).collect())
    }

    async fn replace(&self, schema: &'static TableSchema, id: i64, row: Value) -> StoreResult<()> {
        let data = without_id(row);
        let mut tx = self.begin().await?;

        Self::check_references(&mut tx, schema, &data).await?;

        let result =
            sqlx::query("UPDATE entity_rows SET data = $1 WHERE entity_table = $2 AND id = $3")
                .bind(&data)
                .bind(schema.table)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error(schema, e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(schema.table, id));
        }

        tx.commit().await.map_err(|e| map_sqlx_error(schema, e))?;
        Ok(())
    }

    async fn delete(&self, schema: &'static TableSchema, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM entity_rows WHERE entity_table = $1 AND id = $2")
            .bind(schema.table)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(schema, e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(schema.table, id));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn without_id(row: Value) -> Value {
    match row {
        Value::Object(mut object) => {
            object.remove("id");
            Value::Object(object)
        }
        other => other,
    }
}

fn map_sqlx_error(schema: &TableSchema, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            warn!(table = schema.table, "Unique constraint violated");
            return PersistenceError::constraint(schema.table, db.message().to_string()).into();
        }
    }
    PersistenceError::backend(BACKEND, e).into()
}

/// The JSON value a field holds, `id` included
fn push_field(builder: &mut QueryBuilder<'_, Postgres>, field: &str) {
    if field == "id" {
        builder.push("to_jsonb(id)");
    } else {
        builder.push("COALESCE(data -> ");
        builder.push_bind(field.to_string());
        builder.push(", 'null'::jsonb)");
    }
}

fn json_of(value: &FieldValue) -> Value {
    match value {
        FieldValue::String(s) => Value::String(s.clone()),
        FieldValue::Integer(i) => Value::from(*i),
        FieldValue::Float(f) => Value::from(*f),
        FieldValue::Boolean(b) => Value::Bool(*b),
        FieldValue::DateTime(at) => Value::String(at.to_rfc3339()),
        FieldValue::Null => Value::Null,
    }
}

fn push_compare(
    builder: &mut QueryBuilder<'_, Postgres>,
    field: &str,
    op: CompareOp,
    value: &FieldValue,
) {
    if op == CompareOp::Ne {
        // NOT (=) so that mismatched types count as "not equal"
        builder.push("NOT (");
        push_compare(builder, field, CompareOp::Eq, value);
        builder.push(")");
        return;
    }

    match value {
        FieldValue::DateTime(at) => {
            builder.push("(jsonb_typeof(");
            push_field(builder, field);
            builder.push(") = 'string' AND (");
            push_field(builder, field);
            builder.push(" #>> '{}')::timestamptz ");
            builder.push(op.as_sql());
            builder.push(" ");
            builder.push_bind(*at);
            builder.push(")");
        }
        value if op.is_ordering() => {
            let json = json_of(value);
            builder.push("(jsonb_typeof(");
            push_field(builder, field);
            builder.push(") = jsonb_typeof(");
            builder.push_bind(json.clone());
            builder.push(") AND ");
            push_field(builder, field);
            builder.push(" ");
            builder.push(op.as_sql());
            builder.push(" ");
            builder.push_bind(json);
            builder.push(")");
        }
        value => {
            push_field(builder, field);
            builder.push(" = ");
            builder.push_bind(json_of(value));
        }
    }
}

fn push_string_test(builder: &mut QueryBuilder<'_, Postgres>, field: &str) {
    builder.push("(jsonb_typeof(");
    push_field(builder, field);
    builder.push(") = 'string' AND ");
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::Compare { field, op, value } => push_compare(builder, field, *op, value),
        Filter::EqIgnoreCase { field, value } => {
            push_string_test(builder, field);
            builder.push("lower(");
            push_field(builder, field);
            builder.push(" #>> '{}') = lower(");
            builder.push_bind(value.clone());
            builder.push("))");
        }
        Filter::Contains { field, value } => {
            push_string_test(builder, field);
            builder.push("strpos(lower(");
            push_field(builder, field);
            builder.push(" #>> '{}'), lower(");
            builder.push_bind(value.clone());
            builder.push(")) > 0)");
        }
        Filter::In { values, .. } if values.is_empty() => {
            builder.push("FALSE");
        }
        Filter::In { field, values }
            if values.iter().any(|v| matches!(v, FieldValue::DateTime(_))) =>
        {
            // timestamps compare as instants, not as their JSON text
            builder.push("(");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                push_compare(builder, field, CompareOp::Eq, value);
            }
            builder.push(")");
        }
        Filter::In { field, values } => {
            push_field(builder, field);
            builder.push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                builder.push_bind(json_of(value));
            }
            builder.push(")");
        }
        Filter::And(parts) | Filter::Or(parts) => {
            let joiner = if matches!(filter, Filter::And(_)) {
                " AND "
            } else {
                " OR "
            };
            builder.push("(");
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    builder.push(joiner);
                }
                push_filter(builder, part);
            }
            builder.push(")");
        }
        Filter::Not(inner) => {
            builder.push("NOT (");
            push_filter(builder, inner);
            builder.push(")");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(filter: &Filter) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("");
        push_filter(&mut builder, filter);
        builder.sql().to_string()
    }

    #[test]
    fn test_field_names_are_bound() {
        let sql = sql_for(&Filter::eq("name", "x; DROP TABLE entity_rows"));
        assert_eq!(sql, "COALESCE(data -> $1, 'null'::jsonb) = $2");
    }

    #[test]
    fn test_id_uses_column() {
        assert_eq!(sql_for(&Filter::is_in("id", [1i64, 2])), "to_jsonb(id) IN ($1, $2)");
        assert_eq!(sql_for(&Filter::is_in("id", Vec::<i64>::new())), "FALSE");
    }

    #[test]
    fn test_ne_is_negated_equality() {
        let sql = sql_for(&Filter::ne("id", 3));
        assert_eq!(sql, "NOT (to_jsonb(id) = $1)");
    }

    #[test]
    fn test_combinators_are_parenthesised() {
        let sql = sql_for(&Filter::id(1).or(Filter::id(2)).negate());
        assert_eq!(sql, "NOT ((to_jsonb(id) = $1 OR to_jsonb(id) = $2))");
    }

    #[test]
    fn test_without_id() {
        let row = serde_json::json!({"id": 4, "name": "a"});
        assert_eq!(without_id(row), serde_json::json!({"name": "a"}));
    }
}
