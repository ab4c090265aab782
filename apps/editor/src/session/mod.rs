//! Editing sessions, the in-memory owners of résumé documents.
//!
//! Each session owns one `DocumentStore` for its lifetime. Edits for a session are
//! applied under the session map's write lock, in request order, each against the
//! latest document. Sessions left idle past the configured TTL are closed. Nothing is
//! persisted.

pub mod handlers;
pub mod reaper;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::document::{DocumentStore, Edit, EditOutcome, IdSource, TimestampIds};
use crate::errors::AppError;
use crate::models::resume::{sanitize, ResumeData};
use crate::preview::{build_preview, ResumePreview};

pub use reaper::start_reaper;

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub revision: u64,
    pub document: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditBatchResult {
    pub revision: u64,
    pub outcomes: Vec<EditOutcome>,
    pub document: Value,
}

struct Session {
    store: DocumentStore,
    last_touched: Instant,
}

impl Session {
    fn touch(&mut self) -> &mut DocumentStore {
        self.last_touched = Instant::now();
        &mut self.store
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    max_sessions: usize,
    /// Sessions untouched for this long are closed by [`SessionStore::evict_idle`].
    idle_ttl: Duration,
    ids: Arc<dyn IdSource>,
}

impl SessionStore {
    pub fn new(max_sessions: usize, idle_ttl: Duration) -> Self {
        Self::with_ids(max_sessions, idle_ttl, Arc::new(TimestampIds))
    }

    pub fn with_ids(max_sessions: usize, idle_ttl: Duration, ids: Arc<dyn IdSource>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            idle_ttl,
            ids,
        }
    }

    /// Opens a session on a sanitised copy of `raw`. `null` starts from a blank résumé.
    ///
    /// Idle sessions are evicted first, so abandoned ones never hold the limit.
    pub async fn create(&self, raw: Value) -> Result<SessionSnapshot, AppError> {
        let data = sanitize(raw, self.ids.as_ref())
            .map_err(|e| AppError::UnprocessableEntity(format!("Invalid resume document: {e}")))?;
        for duplicate in data.duplicate_ids() {
            tracing::warn!(
                "Duplicate id '{}' left in {} after sanitising",
                duplicate.id,
                duplicate.collection
            );
        }
        let document = serde_json::to_value(&data).map_err(anyhow::Error::from)?;

        let mut sessions = self.sessions.write().await;
        evict_expired(&mut sessions, self.idle_ttl);
        if sessions.len() >= self.max_sessions {
            return Err(AppError::UnprocessableEntity(format!(
                "Session limit of {} reached",
                self.max_sessions
            )));
        }

        let id = Uuid::now_v7();
        let store = DocumentStore::with_ids(document.clone(), Arc::clone(&self.ids));
        sessions.insert(
            id,
            Session {
                store,
                last_touched: Instant::now(),
            },
        );
        info!("Opened editing session {id} ({} open)", sessions.len());

        Ok(SessionSnapshot {
            id,
            revision: 0,
            document,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<SessionSnapshot, AppError> {
        let mut sessions = self.sessions.write().await;
        let store = sessions.get_mut(&id).ok_or_else(|| not_found(id))?.touch();
        Ok(SessionSnapshot {
            id,
            revision: store.revision(),
            document: (*store.snapshot()).clone(),
        })
    }

    pub async fn close(&self, id: Uuid) -> Result<(), AppError> {
        let removed = self.sessions.write().await.remove(&id);
        match removed {
            Some(session) => {
                info!(
                    "Closed editing session {id} at revision {}",
                    session.store.revision()
                );
                Ok(())
            }
            None => Err(not_found(id)),
        }
    }

    /// Applies `edits` in order. Ignored edits do not stop the batch.
    pub async fn apply(&self, id: Uuid, edits: Vec<Edit>) -> Result<EditBatchResult, AppError> {
        let mut sessions = self.sessions.write().await;
        let store = sessions.get_mut(&id).ok_or_else(|| not_found(id))?.touch();

        let outcomes = store.apply_all(edits);
        let ignored = outcomes.iter().filter(|o| !o.is_applied()).count();
        if ignored > 0 {
            tracing::warn!(
                "Session {id}: {ignored} of {} edits ignored",
                outcomes.len()
            );
        }

        Ok(EditBatchResult {
            revision: store.revision(),
            outcomes,
            document: (*store.snapshot()).clone(),
        })
    }

    /// Renders the current document. Edits may leave shapes the typed model does not
    /// accept directly (nulls, bare-string skills); those are repaired on read.
    pub async fn preview(&self, id: Uuid) -> Result<ResumePreview, AppError> {
        let snapshot = {
            let mut sessions = self.sessions.write().await;
            sessions.get_mut(&id).ok_or_else(|| not_found(id))?.touch().snapshot()
        };
        let data = ResumeData::from_document(&snapshot)
            .map_err(|e| AppError::UnprocessableEntity(format!("Document no longer renders: {e}")))?;
        Ok(build_preview(&data))
    }

    /// Closes every session idle for at least the configured TTL. Returns how many.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        evict_expired(&mut sessions, self.idle_ttl)
    }

    pub async fn open_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn evict_expired(sessions: &mut HashMap<Uuid, Session>, idle_ttl: Duration) -> usize {
    let now = Instant::now();
    let before = sessions.len();
    sessions.retain(|id, session| {
        let live = now.duration_since(session.last_touched) < idle_ttl;
        if !live {
            info!(
                "Evicted idle editing session {id} at revision {}",
                session.store.revision()
            );
        }
        live
    });
    before - sessions.len()
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SequentialIds;
    use assert_matches::assert_matches;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(60);

    fn store(max: usize) -> SessionStore {
        SessionStore::with_ids(max, TTL, Arc::new(SequentialIds::new("item")))
    }

    #[tokio::test]
    async fn test_create_sanitises_document() {
        let sessions = store(10);
        let snapshot = sessions
            .create(json!({ "experience": [{ "company": "Acme", "description": "Did X" }] }))
            .await
            .unwrap();

        assert_eq!(snapshot.revision, 0);
        assert_eq!(snapshot.document["experience"][0]["id"], "item-1");
        assert_eq!(snapshot.document["experience"][0]["bulletPoints"], json!(["Did X"]));
        assert_eq!(snapshot.document["skills"], json!([]));
    }

    #[tokio::test]
    async fn test_session_limit() {
        let sessions = store(1);
        sessions.create(Value::Null).await.unwrap();
        let err = sessions.create(Value::Null).await.unwrap_err();
        assert_matches!(err, AppError::UnprocessableEntity(_));
        assert_eq!(sessions.open_count().await, 1);
    }

    #[tokio::test]
    async fn test_apply_and_read_back() {
        let sessions = store(10);
        let id = sessions.create(Value::Null).await.unwrap().id;

        let result = sessions
            .apply(
                id,
                vec![
                    Edit::UpdateField {
                        path: "personalInfo.fullName".into(),
                        value: json!("Ada"),
                    },
                    Edit::AddBulletPoint {
                        experience_id: "missing".into(),
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(result.revision, 1);
        assert!(result.outcomes[0].is_applied());
        assert!(!result.outcomes[1].is_applied());

        let snapshot = sessions.get(id).await.unwrap();
        assert_eq!(snapshot.document["personalInfo"]["fullName"], "Ada");
        assert_eq!(snapshot.revision, 1);
    }

    #[tokio::test]
    async fn test_concurrent_batches_are_all_applied() {
        let sessions = Arc::new(store(10));
        let id = sessions.create(Value::Null).await.unwrap().id;

        let fields = ["fullName", "email", "phone", "location", "title", "summary"];
        let tasks: Vec<_> = fields
            .iter()
            .map(|field| {
                let sessions = Arc::clone(&sessions);
                let edit = Edit::UpdateField {
                    path: format!("personalInfo.{field}"),
                    value: json!(format!("{field}-value")),
                };
                tokio::spawn(async move { sessions.apply(id, vec![edit]).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let snapshot = sessions.get(id).await.unwrap();
        assert_eq!(snapshot.revision, fields.len() as u64);
        for field in fields {
            assert_eq!(
                snapshot.document["personalInfo"][field],
                json!(format!("{field}-value"))
            );
        }
    }

    #[tokio::test]
    async fn test_close_and_unknown_session() {
        let sessions = store(10);
        let id = sessions.create(Value::Null).await.unwrap().id;
        sessions.close(id).await.unwrap();

        assert_matches!(sessions.get(id).await, Err(AppError::NotFound(_)));
        assert_matches!(sessions.close(id).await, Err(AppError::NotFound(_)));
        assert_matches!(sessions.apply(id, vec![]).await, Err(AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_preview_reports_unrenderable_document() {
        let sessions = store(10);
        let id = sessions.create(Value::Null).await.unwrap().id;
        sessions
            .apply(
                id,
                vec![Edit::UpdateField {
                    path: "personalInfo.fullName".into(),
                    value: json!(42),
                }],
            )
            .await
            .unwrap();

        assert_matches!(
            sessions.preview(id).await,
            Err(AppError::UnprocessableEntity(_))
        );
    }

    #[tokio::test]
    async fn test_preview_after_shape_changing_edits() {
        let sessions = store(10);
        let id = sessions
            .create(json!({ "personalInfo": { "fullName": "Ada", "photo": "data:image/png;base64,AA" } }))
            .await
            .unwrap()
            .id;

        let result = sessions
            .apply(
                id,
                vec![
                    Edit::AddArrayItem {
                        path: "skills".into(),
                        item: json!("Go"),
                    },
                    Edit::UpdateField {
                        path: "personalInfo.photo".into(),
                        value: Value::Null,
                    },
                    Edit::UpdateField {
                        path: "experience".into(),
                        value: json!("not a list"),
                    },
                ],
            )
            .await
            .unwrap();
        assert!(result.outcomes.iter().all(EditOutcome::is_applied));

        let preview = sessions.preview(id).await.unwrap();
        assert_eq!(preview.header.full_name, "Ada");
        assert!(preview.header.photo.is_none());
        assert_eq!(preview.skills.len(), 1);
        assert_eq!(preview.skills[0].name, "Go");
        assert!(preview.experience.is_empty());

        // the stored document keeps exactly what was edited
        let snapshot = sessions.get(id).await.unwrap();
        assert_eq!(snapshot.document["skills"], json!(["Go"]));
        assert_eq!(snapshot.document["personalInfo"]["photo"], Value::Null);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_is_evicted() {
        let sessions = store(10);
        let idle = sessions.create(Value::Null).await.unwrap().id;
        let active = sessions.create(Value::Null).await.unwrap().id;

        tokio::time::advance(TTL / 2).await;
        sessions.get(active).await.unwrap();
        tokio::time::advance(TTL / 2).await;

        assert_eq!(sessions.evict_idle().await, 1);
        assert_matches!(sessions.get(idle).await, Err(AppError::NotFound(_)));
        assert!(sessions.get(active).await.is_ok());
        assert_eq!(sessions.open_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_reclaims_idle_sessions_at_limit() {
        let sessions = store(1);
        let abandoned = sessions.create(Value::Null).await.unwrap().id;
        assert_matches!(
            sessions.create(Value::Null).await,
            Err(AppError::UnprocessableEntity(_))
        );

        tokio::time::advance(TTL).await;

        let fresh = sessions.create(Value::Null).await.unwrap().id;
        assert_ne!(fresh, abandoned);
        assert_eq!(sessions.open_count().await, 1);
        assert_matches!(sessions.get(abandoned).await, Err(AppError::NotFound(_)));
    }
}
