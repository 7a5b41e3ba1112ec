//! Entity trait defining the core abstraction for all stored record types

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Base trait for all entities in the system.
///
/// An entity is a record type with an integer identity key assigned by the
/// store. Rows cross the storage boundary as JSON objects, so every entity
/// must round-trip through serde.
///
/// An identity of `0` means "not yet assigned"; `EntityStore::create`
/// replaces it with the store-generated key.
///
/// Implementations are normally generated with `impl_entity!`.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Static description of the backing table
    fn schema() -> &'static TableSchema;

    /// Get the identity key of this instance
    fn id(&self) -> i64;

    /// Set the identity key (used by the store after insert)
    fn set_id(&mut self, id: i64);

    /// The table name, shorthand for `Self::schema().table`
    fn table() -> &'static str {
        Self::schema().table
    }
}

/// Static description of an entity table.
///
/// `fields` lists every name a filter may reference and always includes
/// `id`. Navigation properties are not fields: they are never written to
/// storage and only materialise through an include.
#[derive(Debug)]
pub struct TableSchema {
    pub table: &'static str,
    pub fields: &'static [&'static str],
    /// Columns carrying a storage-level unique constraint
    pub unique: &'static [&'static str],
    pub navigations: &'static [Navigation],
}

impl TableSchema {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    pub fn navigation(&self, name: &str) -> Option<&'static Navigation> {
        // navigations is 'static, so the found element is too
        self.navigations.iter().find(|n| n.name == name)
    }

    /// Whether `name` is a navigation property of this table
    pub fn is_navigation(&self, name: &str) -> bool {
        self.navigation(name).is_some()
    }
}

/// A many-to-one navigation property.
///
/// `foreign_key` is a field on the owning table holding the identity of a
/// row in `target`. The same descriptor drives eager-loading and the
/// referential check performed at commit.
#[derive(Debug)]
pub struct Navigation {
    pub name: &'static str,
    pub foreign_key: &'static str,
    pub target: fn() -> &'static TableSchema,
}

impl Navigation {
    pub fn target_schema(&self) -> &'static TableSchema {
        (self.target)()
    }
}
