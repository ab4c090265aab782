//! Path-addressed mutation engine.
//!
//! Every operation navigates read-only and performs its single write only after all
//! checks pass, so an `Err` always leaves the document exactly as it was.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::document::path::{FieldPath, PathError, Segment};

const EXPERIENCE: &str = "experience";
const BULLET_POINTS: &str = "bulletPoints";
const ID: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("no field '{segment}' at {at}")]
    PathNotFound { at: String, segment: String },

    #[error("index {index} is out of range at {at} (length {len})")]
    IndexOutOfRange { at: String, index: usize, len: usize },

    #[error("{at} cannot hold '{segment}'")]
    NotAContainer { at: String, segment: String },

    #[error("{at} is not an array")]
    NotAnArray { at: String },

    #[error("no item with id '{id}' in {at}")]
    ItemNotFound { at: String, id: String },

    #[error("no experience item with id '{id}'")]
    ExperienceNotFound { id: String },
}

impl EditError {
    /// Stable machine-readable code, surfaced in edit outcomes.
    pub fn code(&self) -> &'static str {
        match self {
            EditError::InvalidPath(_) => "invalid_path",
            EditError::PathNotFound { .. } => "path_not_found",
            EditError::IndexOutOfRange { .. } => "index_out_of_range",
            EditError::NotAContainer { .. } => "not_a_container",
            EditError::NotAnArray { .. } => "not_an_array",
            EditError::ItemNotFound { .. } => "item_not_found",
            EditError::ExperienceNotFound { .. } => "experience_not_found",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Item identity
// ────────────────────────────────────────────────────────────────────────────

/// Source of fresh item ids. Ids must never repeat within a process.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> String;
}

/// Time-ordered ids (UUIDv7): timestamp-derived, unique even for same-millisecond inserts.
pub struct TimestampIds;

impl IdSource for TimestampIds {
    fn next_id(&self) -> String {
        Uuid::now_v7().to_string()
    }
}

/// Deterministic `prefix-1`, `prefix-2`, ... ids.
#[cfg(test)]
pub struct SequentialIds {
    prefix: String,
    next: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: std::sync::atomic::AtomicU64::new(1),
        }
    }
}

#[cfg(test)]
impl IdSource for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Addresses one element of a collection, by stable id or by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemRef {
    Id(String),
    Index(usize),
}

/// Where an appended item landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendedItem {
    pub index: usize,
    pub id: Option<String>,
}

pub fn item_id(item: &Value) -> Option<&str> {
    item.get(ID).and_then(Value::as_str)
}

// ────────────────────────────────────────────────────────────────────────────
// Navigation
// ────────────────────────────────────────────────────────────────────────────

fn location(segments: &[Segment]) -> String {
    if segments.is_empty() {
        return "document root".to_string();
    }
    let joined = segments
        .iter()
        .map(Segment::as_key)
        .collect::<Vec<_>>()
        .join(".");
    format!("'{joined}'")
}

/// One navigation step. `walked` is the prefix already traversed, for error context.
fn step_mut<'a>(
    cursor: &'a mut Value,
    segment: &Segment,
    walked: &[Segment],
) -> Result<&'a mut Value, EditError> {
    match cursor {
        Value::Array(items) => {
            let len = items.len();
            let index = segment.as_index().ok_or_else(|| EditError::NotAContainer {
                at: location(walked),
                segment: segment.as_key().to_string(),
            })?;
            items.get_mut(index).ok_or_else(|| EditError::IndexOutOfRange {
                at: location(walked),
                index,
                len,
            })
        }
        Value::Object(map) => {
            map.get_mut(segment.as_key())
                .ok_or_else(|| EditError::PathNotFound {
                    at: location(walked),
                    segment: segment.as_key().to_string(),
                })
        }
        _ => Err(EditError::NotAContainer {
            at: location(walked),
            segment: segment.as_key().to_string(),
        }),
    }
}

fn descend_mut<'a>(doc: &'a mut Value, segments: &[Segment]) -> Result<&'a mut Value, EditError> {
    let mut cursor = doc;
    for (depth, segment) in segments.iter().enumerate() {
        cursor = step_mut(cursor, segment, &segments[..depth])?;
    }
    Ok(cursor)
}

fn resolve_mut<'a>(doc: &'a mut Value, path: &FieldPath) -> Result<&'a mut Value, EditError> {
    let (parents, last) = path.split_last();
    let container = descend_mut(doc, parents)?;
    step_mut(container, last, parents)
}

fn resolve_array_mut<'a>(
    doc: &'a mut Value,
    path: &FieldPath,
) -> Result<&'a mut Vec<Value>, EditError> {
    resolve_mut(doc, path)?
        .as_array_mut()
        .ok_or_else(|| EditError::NotAnArray {
            at: format!("'{path}'"),
        })
}

// ────────────────────────────────────────────────────────────────────────────
// Collection-level operations
// ────────────────────────────────────────────────────────────────────────────

/// Assigns `value` at `path`.
///
/// The final segment sets an object property (created if absent), replaces an array
/// element, or appends when it equals the array length.
pub fn update_field(doc: &mut Value, path: &FieldPath, value: Value) -> Result<(), EditError> {
    let (parents, last) = path.split_last();
    let container = descend_mut(doc, parents)?;

    match container {
        Value::Object(map) => {
            map.insert(last.as_key().to_string(), value);
            Ok(())
        }
        Value::Array(items) => match last.as_index() {
            Some(index) if index < items.len() => {
                items[index] = value;
                Ok(())
            }
            Some(index) if index == items.len() => {
                items.push(value);
                Ok(())
            }
            Some(index) => Err(EditError::IndexOutOfRange {
                at: location(parents),
                index,
                len: items.len(),
            }),
            None => Err(EditError::NotAContainer {
                at: location(parents),
                segment: last.as_key().to_string(),
            }),
        },
        _ => Err(EditError::NotAContainer {
            at: location(parents),
            segment: last.as_key().to_string(),
        }),
    }
}

/// Appends `item` to the array at `path`.
///
/// Object items always leave with an id: a supplied non-empty id is kept unless a
/// sibling already carries it, otherwise `ids` provides a fresh one. Primitives are
/// appended as given.
pub fn add_array_item(
    doc: &mut Value,
    path: &FieldPath,
    mut item: Value,
    ids: &dyn IdSource,
) -> Result<AppendedItem, EditError> {
    let items = resolve_array_mut(doc, path)?;

    let id = match &mut item {
        Value::Object(fields) => {
            let supplied = fields
                .get(ID)
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .filter(|id| !items.iter().any(|sibling| item_id(sibling) == Some(*id)))
                .map(str::to_string);
            let id = supplied.unwrap_or_else(|| ids.next_id());
            fields.insert(ID.to_string(), Value::String(id.clone()));
            Some(id)
        }
        _ => None,
    };

    items.push(item);
    Ok(AppendedItem {
        index: items.len() - 1,
        id,
    })
}

/// Removes one element of the array at `path` and returns it.
pub fn remove_array_item(
    doc: &mut Value,
    path: &FieldPath,
    target: &ItemRef,
) -> Result<Value, EditError> {
    let items = resolve_array_mut(doc, path)?;

    let index = match target {
        ItemRef::Index(index) if *index < items.len() => *index,
        ItemRef::Index(index) => {
            return Err(EditError::IndexOutOfRange {
                at: format!("'{path}'"),
                index: *index,
                len: items.len(),
            })
        }
        ItemRef::Id(id) => items
            .iter()
            .position(|item| item_id(item) == Some(id.as_str()))
            .ok_or_else(|| EditError::ItemNotFound {
                at: format!("'{path}'"),
                id: id.clone(),
            })?,
    };

    Ok(items.remove(index))
}

// ────────────────────────────────────────────────────────────────────────────
// Bullet points (addressed by owning experience id)
// ────────────────────────────────────────────────────────────────────────────

fn experience_mut<'a>(
    doc: &'a mut Value,
    experience_id: &str,
) -> Result<&'a mut Map<String, Value>, EditError> {
    doc.get_mut(EXPERIENCE)
        .and_then(Value::as_array_mut)
        .and_then(|items| {
            items
                .iter_mut()
                .find(|item| item_id(item) == Some(experience_id))
        })
        .and_then(Value::as_object_mut)
        .ok_or_else(|| EditError::ExperienceNotFound {
            id: experience_id.to_string(),
        })
}

/// `create` controls lazy initialisation of a missing (or null) `bulletPoints`.
fn bullets_mut<'a>(
    experience: &'a mut Map<String, Value>,
    experience_id: &str,
    create: bool,
) -> Result<&'a mut Vec<Value>, EditError> {
    let missing = experience.get(BULLET_POINTS).map_or(true, Value::is_null);
    if missing {
        if !create {
            return Err(EditError::IndexOutOfRange {
                at: bullets_location(experience_id),
                index: 0,
                len: 0,
            });
        }
        experience.insert(BULLET_POINTS.to_string(), Value::Array(Vec::new()));
    }

    experience
        .get_mut(BULLET_POINTS)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| EditError::NotAnArray {
            at: bullets_location(experience_id),
        })
}

fn bullets_location(experience_id: &str) -> String {
    format!("'experience[id={experience_id}].bulletPoints'")
}

/// Appends an empty bullet to the experience item `experience_id`. Returns its index.
pub fn add_bullet_point(doc: &mut Value, experience_id: &str) -> Result<usize, EditError> {
    let experience = experience_mut(doc, experience_id)?;
    let bullets = bullets_mut(experience, experience_id, true)?;
    bullets.push(Value::String(String::new()));
    Ok(bullets.len() - 1)
}

/// Removes and returns bullet `bullet_index` of the experience item `experience_id`.
pub fn remove_bullet_point(
    doc: &mut Value,
    experience_id: &str,
    bullet_index: usize,
) -> Result<Value, EditError> {
    let experience = experience_mut(doc, experience_id)?;
    let bullets = bullets_mut(experience, experience_id, false)?;
    if bullet_index >= bullets.len() {
        return Err(EditError::IndexOutOfRange {
            at: bullets_location(experience_id),
            index: bullet_index,
            len: bullets.len(),
        });
    }
    Ok(bullets.remove(bullet_index))
}

/// Replaces the text of an existing bullet.
pub fn update_bullet_point(
    doc: &mut Value,
    experience_id: &str,
    bullet_index: usize,
    text: String,
) -> Result<(), EditError> {
    let experience = experience_mut(doc, experience_id)?;
    let bullets = bullets_mut(experience, experience_id, false)?;
    let len = bullets.len();
    let slot = bullets
        .get_mut(bullet_index)
        .ok_or_else(|| EditError::IndexOutOfRange {
            at: bullets_location(experience_id),
            index: bullet_index,
            len,
        })?;
    *slot = Value::String(text);
    Ok(())
}
