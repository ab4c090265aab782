//! Edit commands and their outcomes.
//!
//! `Edit` is the wire form of the mutation API: one variant per operation, paths as raw
//! strings so that a malformed path becomes an `ignored` outcome instead of a rejected
//! request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::engine::{self, AppendedItem, EditError, IdSource, ItemRef};
use crate::document::path::FieldPath;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    UpdateField {
        path: String,
        value: Value,
    },
    AddArrayItem {
        path: String,
        item: Value,
    },
    RemoveArrayItem {
        path: String,
        target: ItemRef,
    },
    AddBulletPoint {
        experience_id: String,
    },
    RemoveBulletPoint {
        experience_id: String,
        bullet_index: usize,
    },
    UpdateBulletPoint {
        experience_id: String,
        bullet_index: usize,
        text: String,
    },
}

/// What an applied edit did, for callers that need more than "it worked".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EditEffect {
    Updated,
    Appended(AppendedItem),
    Removed { item: Value },
    BulletAdded { index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EditOutcome {
    Applied {
        revision: u64,
        #[serde(flatten)]
        effect: EditEffect,
    },
    Ignored {
        code: &'static str,
        reason: String,
    },
}

impl EditOutcome {
    pub fn ignored(err: &EditError) -> Self {
        EditOutcome::Ignored {
            code: err.code(),
            reason: err.to_string(),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied { .. })
    }
}

impl Edit {
    pub fn op_name(&self) -> &'static str {
        match self {
            Edit::UpdateField { .. } => "update_field",
            Edit::AddArrayItem { .. } => "add_array_item",
            Edit::RemoveArrayItem { .. } => "remove_array_item",
            Edit::AddBulletPoint { .. } => "add_bullet_point",
            Edit::RemoveBulletPoint { .. } => "remove_bullet_point",
            Edit::UpdateBulletPoint { .. } => "update_bullet_point",
        }
    }

    /// Runs this edit against `doc`. On error `doc` is left untouched.
    pub fn apply(self, doc: &mut Value, ids: &dyn IdSource) -> Result<EditEffect, EditError> {
        match self {
            Edit::UpdateField { path, value } => {
                engine::update_field(doc, &FieldPath::parse(&path)?, value)?;
                Ok(EditEffect::Updated)
            }
            Edit::AddArrayItem { path, item } => {
                let appended = engine::add_array_item(doc, &FieldPath::parse(&path)?, item, ids)?;
                Ok(EditEffect::Appended(appended))
            }
            Edit::RemoveArrayItem { path, target } => {
                let item = engine::remove_array_item(doc, &FieldPath::parse(&path)?, &target)?;
                Ok(EditEffect::Removed { item })
            }
            Edit::AddBulletPoint { experience_id } => {
                let index = engine::add_bullet_point(doc, &experience_id)?;
                Ok(EditEffect::BulletAdded { index })
            }
            Edit::RemoveBulletPoint {
                experience_id,
                bullet_index,
            } => {
                let item = engine::remove_bullet_point(doc, &experience_id, bullet_index)?;
                Ok(EditEffect::Removed { item })
            }
            Edit::UpdateBulletPoint {
                experience_id,
                bullet_index,
                text,
            } => {
                engine::update_bullet_point(doc, &experience_id, bullet_index, text)?;
                Ok(EditEffect::Updated)
            }
        }
    }
}
