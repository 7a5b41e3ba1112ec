//! In-memory implementation of Database for testing and development

use crate::core::entity::TableSchema;
use crate::core::error::{PersistenceError, StoreError};
use crate::core::store::{Database, RowQuery, StoreResult, with_id};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tracing::warn;

const BACKEND: &str = "in_memory";

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    // BTreeMap keeps rows in identity order for stable pagination
    rows: BTreeMap<i64, Value>,
}

/// In-memory database
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
/// Cloning shares the same underlying tables.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<HashMap<&'static str, Table>>>,
}

impl InMemoryDatabase {
    /// Create a new, empty in-memory database
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn insert(&self, schema: &'static TableSchema, row: Value) -> StoreResult<i64> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| lock_error("write", e))?;

        check_constraints(&tables, schema, &row, None)?;

        let table = tables.entry(schema.table).or_default();
        table.last_id += 1;
        let id = table.last_id;
        table.rows.insert(id, with_id(&row, id));

        Ok(id)
    }

    async fn select(
        &self,
        schema: &'static TableSchema,
        query: RowQuery<'_>,
    ) -> StoreResult<Vec<Value>> {
        let tables = self.tables.read().map_err(|e| lock_error("read", e))?;

        let Some(table) = tables.get(schema.table) else {
            return Ok(Vec::new());
        };

        let matching = table
            .rows
            .values()
            .filter(|row| query.filter.is_none_or(|f| f.matches(row)))
            .skip(query.skip)
            .cloned();

        Ok(match query.take {
            Some(take) => matching.take(take).collect(),
            None => matching.collect(),
        })
    }

    async fn replace(&self, schema: &'static TableSchema, id: i64, row: Value) -> StoreResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| lock_error("write", e))?;

        let exists = tables
            .get(schema.table)
            .is_some_and(|table| table.rows.contains_key(&id));
        if !exists {
            return Err(StoreError::not_found(schema.table, id));
        }

        check_constraints(&tables, schema, &row, Some(id))?;

        tables
            .entry(schema.table)
            .or_default()
            .rows
            .insert(id, with_id(&row, id));

        Ok(())
    }

    async fn delete(&self, schema: &'static TableSchema, id: i64) -> StoreResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| lock_error("write", e))?;

        tables
            .get_mut(schema.table)
            .and_then(|table| table.rows.remove(&id))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(schema.table, id))
    }
}

fn lock_error(kind: &str, e: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::backend(
        BACKEND,
        format!("Failed to acquire {} lock: {}", kind, e),
    )
}

/// Unique and referential checks, `exclude` being the row being replaced
fn check_constraints(
    tables: &HashMap<&'static str, Table>,
    schema: &'static TableSchema,
    row: &Value,
    exclude: Option<i64>,
) -> Result<(), PersistenceError> {
    for column in schema.unique {
        let value = match row.get(*column) {
            None | Some(Value::Null) => continue,
            Some(value) => value,
        };

        let taken = tables.get(schema.table).is_some_and(|table| {
            table
                .rows
                .iter()
                .any(|(id, other)| Some(*id) != exclude && other.get(*column) == Some(value))
        });
        if taken {
            warn!(table = schema.table, column, "Unique constraint violated");
            return Err(PersistenceError::constraint(
                schema.table,
                format!("duplicate value {} for unique column '{}'", value, column),
            ));
        }
    }

    for navigation in schema.navigations {
        let key = match row.get(navigation.foreign_key) {
            None | Some(Value::Null) => continue,
            Some(key) => key,
        };

        let target = navigation.target_schema();
        let present = key.as_i64().is_some_and(|key| {
            tables
                .get(target.table)
                .is_some_and(|table| table.rows.contains_key(&key))
        });
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
            ));
        }
    }

    Ok(())
}
