//! Pagination and eager-load descriptors

use crate::core::entity::{Navigation, TableSchema};
use crate::core::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Hard ceiling on the number of rows a single page may return
pub const MAX_PAGE_SIZE: usize = 100;

/// Page descriptor
///
/// `size == 0` means "unbounded" (no pagination). Any other size is
/// silently clamped to [`MAX_PAGE_SIZE`]. Pages are numbered from 1.
///
/// # Example
/// ```rust,ignore
/// // rows 11..=20 of the filtered set
/// store.get_all(None, &IncludeSpec::none(), Page::new(10, 2)).await?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub size: usize,
    pub number: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self { size: 0, number: 1 }
    }
}

impl Page {
    pub fn new(size: usize, number: usize) -> Self {
        Self { size, number }
    }

    /// Everything, in one page
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Check the page number, pages start at 1
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.number == 0 {
            return Err(ValidationError::InvalidPage {
                number: self.number,
            });
        }
        Ok(())
    }

    /// Rows to take, after clamping. `None` when unbounded.
    pub fn effective_size(&self) -> Option<usize> {
        match self.size {
            0 => None,
            size => Some(size.min(MAX_PAGE_SIZE)),
        }
    }

    /// Rows to skip before the page starts
    pub fn skip(&self) -> usize {
        self.effective_size()
            .map(|size| size.saturating_mul(self.number.saturating_sub(1)))
            .unwrap_or(0)
    }
}

/// Ordered, de-duplicated set of navigation names to eager-load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeSpec {
    names: Vec<String>,
}

impl IncludeSpec {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let mut spec = Self::default();
        for name in names {
            spec.push(name);
        }
        spec
    }

    /// Parse the comma-separated form, e.g. `"villa, owner"`.
    ///
    /// Surrounding whitespace is trimmed and empty segments are ignored.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }

    /// Append a name unless it is already present
    pub fn push(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Resolve every name to its navigation, in order
    pub fn resolve(
        &self,
        schema: &'static TableSchema,
    ) -> Result<Vec<&'static Navigation>, ValidationError> {
        self.names
            .iter()
            .map(|name| {
                schema
                    .navigation(name)
                    .ok_or_else(|| ValidationError::UnknownInclude {
                        entity_type: schema.table.to_string(),
                        include: name.clone(),
                    })
            })
            .collect()
    }
}

impl From<&str> for IncludeSpec {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}
