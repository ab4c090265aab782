//! Document Store: the canonical résumé document of one editing session.
//!
//! The store is the only writer. Consumers hold it (or a snapshot of it) explicitly;
//! every edit runs against whatever the document is when the edit is applied, so edits
//! queued back to back never overwrite each other.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::document::edit::{Edit, EditEffect, EditOutcome};
use crate::document::engine::{EditError, IdSource};

pub struct DocumentStore {
    current: Arc<Value>,
    revision: u64,
    ids: Arc<dyn IdSource>,
}

impl DocumentStore {
    pub fn with_ids(document: Value, ids: Arc<dyn IdSource>) -> Self {
        Self {
            current: Arc::new(document),
            revision: 0,
            ids,
        }
    }

    /// A read-only view of the current document. Later edits never alter it.
    pub fn snapshot(&self) -> Arc<Value> {
        Arc::clone(&self.current)
    }

    /// Number of edits applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Applies an updater to the latest document.
    ///
    /// Copy-on-write: the document is cloned only if a snapshot of it is still held
    /// elsewhere. The updater must leave the document untouched when it fails.
    pub fn modify<F>(&mut self, op: &str, updater: F) -> EditOutcome
    where
        F: FnOnce(&mut Value, &dyn IdSource) -> Result<EditEffect, EditError>,
    {
        let document = Arc::make_mut(&mut self.current);
        match updater(document, self.ids.as_ref()) {
            Ok(effect) => {
                self.revision += 1;
                debug!(op, revision = self.revision, "edit applied");
                EditOutcome::Applied {
                    revision: self.revision,
                    effect,
                }
            }
            Err(err) => {
                warn!(op, code = err.code(), "edit ignored: {err}");
                EditOutcome::ignored(&err)
            }
        }
    }

    pub fn apply(&mut self, edit: Edit) -> EditOutcome {
        let op = edit.op_name();
        self.modify(op, |doc, ids| edit.apply(doc, ids))
    }

    /// Applies edits in order; each one sees the result of those before it.
    pub fn apply_all(&mut self, edits: impl IntoIterator<Item = Edit>) -> Vec<EditOutcome> {
        edits.into_iter().map(|edit| self.apply(edit)).collect()
    }
}
