//! Generic entity store and the backend trait it runs on
//!
//! [`Database`] is the narrow seam a storage backend implements: it moves
//! JSON rows in and out of a table and enforces the table's unique and
//! referential constraints at commit. [`EntityStore`] composes filters,
//! pagination and eager-loading on top of it for one entity type.

use crate::core::entity::{Entity, TableSchema};
use crate::core::error::{PersistenceError, StoreError, ValidationError};
use crate::core::filter::Filter;
use crate::core::query::{IncludeSpec, Page};
use crate::core::tracking::{ChangeTracker, TrackingMode};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

pub type StoreResult<T> = Result<T, StoreError>;

/// Row selection handed to a backend
#[derive(Debug, Clone, Copy, Default)]
pub struct RowQuery<'a> {
    pub filter: Option<&'a Filter>,
    pub skip: usize,
    /// `None` means no limit
    pub take: Option<usize>,
}

impl<'a> RowQuery<'a> {
    pub fn filtered(filter: Option<&'a Filter>) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }
}

/// Storage backend contract
///
/// Rows are JSON objects. Every row returned by `select` carries its `id`.
/// Every call is its own commit, there is no batching.
///
/// # Constraints
///
/// `insert` and `replace` must reject, with
/// [`PersistenceError::ConstraintViolation`]:
/// - a value already held by another row in a `schema.unique` column
/// - a non-null foreign key of a navigation that names no row of the target table
#[async_trait]
pub trait Database: Send + Sync {
    /// Name used in logs and backend errors
    fn backend_name(&self) -> &'static str;

    /// Insert a row and return the generated identity.
    ///
    /// Any `id` member of `row` is ignored.
    async fn insert(&self, schema: &'static TableSchema, row: Value) -> StoreResult<i64>;

    /// Rows matching the query, ordered by identity ascending
    async fn select(
        &self,
        schema: &'static TableSchema,
        query: RowQuery<'_>,
    ) -> StoreResult<Vec<Value>>;

    /// Replace the full row stored under `id`; `NotFound` if there is none
    async fn replace(&self, schema: &'static TableSchema, id: i64, row: Value) -> StoreResult<()>;

    /// Delete the row stored under `id`; `NotFound` if there is none
    async fn delete(&self, schema: &'static TableSchema, id: i64) -> StoreResult<()>;
}

/// CRUD and query composition over one entity type
///
/// A store is meant to live for one logical operation (one request): its
/// change tracker is dropped with it. The underlying [`Database`] is
/// shared.
///
/// ```rust,ignore
/// let store = EntityStore::<Villa>::new(db.clone());
/// let page = store
///     .get_all(Some(&Filter::gte("occupancy", 4)), &IncludeSpec::none(), Page::new(10, 2))
///     .await?;
/// ```
pub struct EntityStore<T: Entity> {
    db: Arc<dyn Database>,
    tracker: ChangeTracker,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> EntityStore<T> {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            tracker: ChangeTracker::new(),
            _entity: PhantomData,
        }
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    /// Whether `save` would accept this entity
    pub fn is_tracked(&self, entity: &T) -> bool {
        self.tracker.is_tracked(entity.id())
    }

    /// Insert the entity and commit; the returned copy carries its identity
    pub async fn create(&self, mut entity: T) -> StoreResult<T> {
        let row = to_row(&entity)?;
        let id = self.db.insert(T::schema(), row).await?;
        entity.set_id(id);

        self.tracker.track(id, to_row(&entity)?);
        debug!(table = T::table(), id, "Created entity");
        Ok(entity)
    }

    /// First entity matching `filter`, with the requested navigations loaded
    pub async fn get(
        &self,
        filter: Option<&Filter>,
        tracking: TrackingMode,
        includes: &IncludeSpec,
    ) -> StoreResult<Option<T>> {
        let query = RowQuery {
            filter,
            skip: 0,
            take: Some(1),
        };
        let mut rows = self.load(query, includes).await?;
        let Some(row) = rows.pop() else {
            return Ok(None);
        };

        let entity: T = from_row(row)?;
        if tracking == TrackingMode::Tracked {
            self.tracker.track(entity.id(), to_row(&entity)?);
        }
        Ok(Some(entity))
    }

    /// Like [`get`](Self::get) by identity, but absence is a `NotFound` error
    pub async fn get_by_id(
        &self,
        id: i64,
        tracking: TrackingMode,
        includes: &IncludeSpec,
    ) -> StoreResult<T> {
        self.get(Some(&Filter::id(id)), tracking, includes)
            .await?
            .ok_or_else(|| StoreError::not_found(T::table(), id))
    }

    /// Filter, then paginate, then eager-load.
    ///
    /// Pagination is computed against the filtered set in identity order.
    /// Results are never tracked.
    pub async fn get_all(
        &self,
        filter: Option<&Filter>,
        includes: &IncludeSpec,
        page: Page,
    ) -> StoreResult<Vec<T>> {
        page.validate()?;
        let query = RowQuery {
            filter,
            skip: page.skip(),
            take: page.effective_size(),
        };

        self.load(query, includes)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    /// Replace the full entity by identity
    pub async fn update(&self, entity: &T) -> StoreResult<()> {
        let id = entity.id();
        let row = to_row(entity)?;
        self.db.replace(T::schema(), id, row.clone()).await?;

        self.tracker.refresh(id, row);
        debug!(table = T::table(), id, "Updated entity");
        Ok(())
    }

    /// Delete by identity and commit
    pub async fn remove(&self, entity: &T) -> StoreResult<()> {
        let id = entity.id();
        self.db.delete(T::schema(), id).await?;

        self.tracker.untrack(id);
        debug!(table = T::table(), id, "Removed entity");
        Ok(())
    }

    /// Write a tracked entity back if it changed since it was read.
    ///
    /// Returns whether a write happened. The tracker is keyed by identity
    /// only: once this store has handed out a tracked instance of an id, any
    /// instance carrying that id is accepted, a `Detached` copy included.
    pub async fn save(&self, entity: &T) -> StoreResult<bool> {
        let id = entity.id();
        let snapshot = self.tracker.snapshot(id).ok_or_else(|| {
            StoreError::from(ValidationError::NotTracked {
                entity_type: T::table().to_string(),
                id,
            })
        })?;

        let row = to_row(entity)?;
        if row == snapshot {
            return Ok(false);
        }

        self.db.replace(T::schema(), id, row.clone()).await?;
        self.tracker.track(id, row);
        debug!(table = T::table(), id, "Saved tracked entity");
        Ok(true)
    }

    async fn load(&self, query: RowQuery<'_>, includes: &IncludeSpec) -> StoreResult<Vec<Value>> {
        let schema = T::schema();
        if let Some(filter) = query.filter {
            filter.validate(schema)?;
        }
        let navigations = includes.resolve(schema)?;

        let mut rows = self.db.select(schema, query).await?;
        debug!(
            backend = self.db.backend_name(),
            table = schema.table,
            rows = rows.len(),
            "Selected rows"
        );

        // one In(id, ...) round-trip per include, issued together
        let lookups = navigations.iter().map(|navigation| {
            let mut keys: Vec<i64> = rows
                .iter()
                .filter_map(|row| row.get(navigation.foreign_key).and_then(Value::as_i64))
                .collect();
            keys.sort_unstable();
            keys.dedup();
            self.related_by_id(navigation.target_schema(), keys)
        });
        let related = try_join_all(lookups).await?;

        for (navigation, by_id) in navigations.iter().zip(related) {
            for row in rows.iter_mut() {
                let key = row.get(navigation.foreign_key).and_then(Value::as_i64);
                // a dangling key leaves the navigation empty
                if let (Some(related), Some(object)) =
                    (key.and_then(|k| by_id.get(&k)), row.as_object_mut())
                {
                    object.insert(navigation.name.to_string(), related.clone());
                }
            }
        }

        Ok(rows)
    }

    async fn related_by_id(
        &self,
        target: &'static TableSchema,
        keys: Vec<i64>,
    ) -> StoreResult<HashMap<i64, Value>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let filter = Filter::is_in("id", keys);
        Ok(self
            .db
            .select(target, RowQuery::filtered(Some(&filter)))
            .await?
            .into_iter()
            .filter_map(|row| row.get("id").and_then(Value::as_i64).map(|id| (id, row)))
            .collect())
    }
}

/// Serialize an entity to its stored form: navigation members are dropped
pub(crate) fn to_row<T: Entity>(entity: &T) -> StoreResult<Value> {
    let value = serde_json::to_value(entity).map_err(|e| serialization_error::<T>(e))?;
    let Value::Object(mut object) = value else {
        return Err(serialization_error::<T>("entity did not serialize to a JSON object").into());
    };

    for navigation in T::schema().navigations {
        object.remove(navigation.name);
    }
    Ok(Value::Object(object))
}

pub(crate) fn from_row<T: Entity>(row: Value) -> StoreResult<T> {
    serde_json::from_value(row).map_err(|e| serialization_error::<T>(e).into())
}

/// Copy of `row` with its `id` member set, used by backends on read
pub fn with_id(row: &Value, id: i64) -> Value {
    let mut object = row.as_object().cloned().unwrap_or_else(Map::new);
    object.insert("id".to_string(), Value::from(id));
    Value::Object(object)
}

fn serialization_error<T: Entity>(message: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::Serialization {
        entity_type: T::table().to_string(),
        message: message.to_string(),
    }
}
