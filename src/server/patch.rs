//! JSON-Patch documents applied to update DTOs
//!
//! Only `add`, `replace` and `remove` are supported, and only on top-level
//! members of a JSON object (`/name`, `/rate`). Member names match
//! case-insensitively.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatchError {
    #[error("Invalid patch path '{0}': expected '/member'")]
    InvalidPath(String),

    #[error("Unknown member '{0}'")]
    UnknownMember(String),

    #[error("Patch target is not an object")]
    NotAnObject,
}

impl PatchOperation {
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Add { path, .. }
            | PatchOperation::Replace { path, .. }
            | PatchOperation::Remove { path } => path,
        }
    }
}

/// Apply `operations` in order; the first failure aborts and leaves
/// `target` partially patched.
pub fn apply_patch(target: &mut Value, operations: &[PatchOperation]) -> Result<(), PatchError> {
    let object = target.as_object_mut().ok_or(PatchError::NotAnObject)?;

    for operation in operations {
        let member = member_name(operation.path())?;
        let key = object
            .keys()
            .find(|k| k.eq_ignore_ascii_case(&member))
            .cloned()
            .ok_or(PatchError::UnknownMember(member))?;

        match operation {
            PatchOperation::Add { value, .. } | PatchOperation::Replace { value, .. } => {
                object.insert(key, value.clone());
            }
            // Members of a DTO cannot disappear; removal resets to null
            PatchOperation::Remove { .. } => {
                object.insert(key, Value::Null);
            }
        }
    }
    Ok(())
}

fn member_name(path: &str) -> Result<String, PatchError> {
    let name = path
        .strip_prefix('/')
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
        .ok_or_else(|| PatchError::InvalidPath(path.to_string()))?;
    Ok(name.replace("~1", "/").replace("~0", "~"))
}
