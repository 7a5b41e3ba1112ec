//! Filter expression tree evaluated by the storage backend
//!
//! A [`Filter`] is plain data: the in-memory backend evaluates it over JSON
//! rows with [`Filter::matches`], the Postgres backend translates it into a
//! `WHERE` clause with bound parameters. Absence of a filter means
//! "match all".
//!
//! # Example
//!
//! ```rust,ignore
//! let cheap_and_large = Filter::lte("rate", 200.0).and(Filter::gte("occupancy", 4));
//! let by_name = Filter::eq_ignore_case("name", "Royal Villa");
//! ```

use crate::core::entity::TableSchema;
use crate::core::error::ValidationError;
use crate::core::field::FieldValue;
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison operator of a [`Filter::Compare`] node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Whether the operator needs an ordering, not just equality
    pub fn is_ordering(&self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }

    /// Whether `stored.cmp(expected)` satisfies this operator
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
        }
    }
}

/// A boolean predicate over an entity's fields
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        field: String,
        op: CompareOp,
        value: FieldValue,
    },
    /// Case-insensitive string equality
    EqIgnoreCase { field: String, value: String },
    /// Case-insensitive substring match
    Contains { field: String, value: String },
    /// Field equals any of the values; an empty list matches nothing
    In {
        field: String,
        values: Vec<FieldValue>,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<FieldValue>) -> Self {
        Filter::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, CompareOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    /// Shorthand for `Filter::eq("id", id)`
    pub fn id(id: i64) -> Self {
        Self::eq("id", id)
    }

    pub fn eq_ignore_case(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::EqIgnoreCase {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V, I>(field: impl Into<String>, values: I) -> Self
    where
        V: Into<FieldValue>,
        I: IntoIterator<Item = V>,
    {
        Filter::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Combine with another filter, flattening nested conjunctions
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), other) => {
                left.push(other);
                Filter::And(left)
            }
            (this, other) => Filter::And(vec![this, other]),
        }
    }

    /// Combine with another filter, flattening nested disjunctions
    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Or(mut left), Filter::Or(right)) => {
                left.extend(right);
                Filter::Or(left)
            }
            (Filter::Or(mut left), other) => {
                left.push(other);
                Filter::Or(left)
            }
            (this, other) => Filter::Or(vec![this, other]),
        }
    }

    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// AND-combine optional filters; `None` when every input is `None`
    pub fn all(filters: impl IntoIterator<Item = Option<Filter>>) -> Option<Filter> {
        filters
            .into_iter()
            .flatten()
            .reduce(|acc, next| acc.and(next))
    }

    /// Parse the query-string object syntax.
    ///
    /// # Format
    /// - Exact match: `{"field": "value"}`
    /// - Membership: `{"field": [1, 2, 3]}`
    /// - Comparison: `{"field>": v, "field>=": v, "field<": v, "field<=": v, "field!=": v}`
    ///
    /// Entries are AND-combined. An empty object yields `None`.
    pub fn from_json(value: &Value) -> Result<Option<Filter>, ValidationError> {
        let object = value
            .as_object()
            .ok_or_else(|| ValidationError::invalid_filter("filter must be a JSON object"))?;

        let mut parts = Vec::with_capacity(object.len());
        for (key, raw) in object {
            let (field, op) = split_operator(key);

            if let (CompareOp::Eq, Value::Array(items)) = (op, raw) {
                let values = items
                    .iter()
                    .map(|item| scalar(field, item))
                    .collect::<Result<Vec<_>, _>>()?;
                parts.push(Filter::is_in(field, values));
                continue;
            }

            parts.push(Filter::compare(field, op, scalar(field, raw)?));
        }

        Ok(Filter::all(parts.into_iter().map(Some)))
    }

    /// Check field names and filter shape against a table schema
    pub fn validate(&self, schema: &TableSchema) -> Result<(), ValidationError> {
        match self {
            Filter::Compare { field, op, value } => {
                check_field(schema, field)?;
                if op.is_ordering() && !value.is_ordered() {
                    return Err(ValidationError::invalid_filter(format!(
                        "operator '{}' cannot be applied to {:?} on field '{}'",
                        op.as_sql(),
                        value,
                        field
                    )));
                }
                Ok(())
            }
            Filter::EqIgnoreCase { field, .. } | Filter::Contains { field, .. } => {
                check_field(schema, field)
            }
            Filter::In { field, .. } => check_field(schema, field),
            Filter::And(parts) | Filter::Or(parts) => {
                if parts.is_empty() {
                    return Err(ValidationError::invalid_filter(
                        "AND/OR requires at least one operand",
                    ));
                }
                parts.iter().try_for_each(|p| p.validate(schema))
            }
            Filter::Not(inner) => inner.validate(schema),
        }
    }

    /// Evaluate against a JSON row. Missing fields read as null.
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Compare { field, op, value } => {
                match value.compare_to_json(field_of(row, field)) {
                    Some(ordering) => op.accepts(ordering),
                    // incomparable values are never equal
                    None => *op == CompareOp::Ne,
                }
            }
            Filter::EqIgnoreCase { field, value } => field_of(row, field)
                .as_str()
                .is_some_and(|s| s.to_lowercase() == value.to_lowercase()),
            Filter::Contains { field, value } => field_of(row, field)
                .as_str()
                .is_some_and(|s| s.to_lowercase().contains(&value.to_lowercase())),
            Filter::In { field, values } => {
                let stored = field_of(row, field);
                values
                    .iter()
                    .any(|v| v.compare_to_json(stored) == Some(Ordering::Equal))
            }
            Filter::And(parts) => parts.iter().all(|p| p.matches(row)),
            Filter::Or(parts) => parts.iter().any(|p| p.matches(row)),
            Filter::Not(inner) => !inner.matches(row),
        }
    }
}

fn field_of<'a>(row: &'a Value, field: &str) -> &'a Value {
    row.get(field).unwrap_or(&Value::Null)
}

fn check_field(schema: &TableSchema, field: &str) -> Result<(), ValidationError> {
    if field.is_empty() {
        return Err(ValidationError::invalid_filter("empty field name"));
    }
    if !schema.has_field(field) {
        return Err(ValidationError::UnknownField {
            entity_type: schema.table.to_string(),
            field: field.to_string(),
        });
    }
    Ok(())
}

fn split_operator(key: &str) -> (&str, CompareOp) {
    // two-character suffixes first so "a>=" is not read as "a>" + "="
    const SUFFIXES: [(&str, CompareOp); 5] = [
        (">=", CompareOp::Gte),
        ("<=", CompareOp::Lte),
        ("!=", CompareOp::Ne),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
    ];

    for (suffix, op) in SUFFIXES {
        if let Some(field) = key.strip_suffix(suffix) {
            return (field.trim_end(), op);
        }
    }
    (key, CompareOp::Eq)
}

fn scalar(field: &str, raw: &Value) -> Result<FieldValue, ValidationError> {
    FieldValue::from_json(raw).ok_or_else(|| {
        ValidationError::invalid_filter(format!("unsupported value for field '{}'", field))
    })
}
