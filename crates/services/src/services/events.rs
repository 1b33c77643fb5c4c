use std::time::Duration;

use db::{
    DBService,
    events::{
        CardEventPayload, CardMovedPayload, ChecklistEventPayload, EVENT_CARD_ARCHIVED,
        EVENT_CARD_CREATED, EVENT_CARD_MOVED, EVENT_CARD_UPDATED, EVENT_CHECKLIST_CREATED,
        EVENT_CHECKLIST_DELETED, EVENT_CHECKLIST_UPDATED, EVENT_LIST_ARCHIVED, EVENT_LIST_CREATED,
        EVENT_LIST_REORDERED, EVENT_LIST_UPDATED, ListEventPayload,
    },
    models::event_outbox::EventOutbox,
};
use thiserror::Error;

use crate::services::presence::{PresenceStore, ServerEvent};

const OUTBOX_POLL_INTERVAL: Duration = Duration::from_millis(250);
const OUTBOX_BATCH_LIMIT: u64 = 100;

#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Database(#[from] db::DbErr),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Bridges the transactional outbox to the realtime rooms: every committed
/// mutation eventually reaches the project's room as an invalidation hint,
/// even when the mutating client never sent a socket event itself.
#[derive(Clone)]
pub struct EventService {
    db: DBService,
    presence: PresenceStore,
}

impl EventService {
    pub fn new(db: DBService, presence: PresenceStore) -> Self {
        let service = Self { db, presence };
        service.spawn_outbox_worker();
        service
    }

    #[cfg(test)]
    fn new_without_worker(db: DBService, presence: PresenceStore) -> Self {
        Self { db, presence }
    }

    fn spawn_outbox_worker(&self) {
        let service = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(err) = service.flush_pending().await {
                    tracing::error!(error = %err, "event outbox flush failed");
                }
                tokio::time::sleep(OUTBOX_POLL_INTERVAL).await;
            }
        });
    }

    pub async fn flush_pending(&self) -> Result<(), EventError> {
        let entries = EventOutbox::fetch_unpublished(&self.db.pool, OUTBOX_BATCH_LIMIT).await?;
        if entries.is_empty() {
            return Ok(());
        }

        for entry in entries {
            match self.dispatch_entry(&entry) {
                Ok(()) => {
                    EventOutbox::mark_published(&self.db.pool, entry.id).await?;
                }
                Err(err) => {
                    let err_msg = err.to_string();
                    tracing::warn!(
                        event_id = entry.uuid.to_string(),
                        error = %err_msg,
                        "event dispatch failed"
                    );
                    EventOutbox::mark_failed(&self.db.pool, entry.id, &err_msg).await?;
                }
            }
        }

        Ok(())
    }

    fn dispatch_entry(&self, entry: &db::entities::event_outbox::Model) -> Result<(), EventError> {
        match entry.event_type.as_str() {
            EVENT_CARD_MOVED => {
                let payload: CardMovedPayload = serde_json::from_value(entry.payload.clone())?;
                self.presence.broadcast(
                    payload.project_id,
                    ServerEvent::CardMoved {
                        project_id: payload.project_id,
                        card_id: payload.card_id,
                        source_list_id: payload.source_list_id,
                        destination_list_id: payload.destination_list_id,
                        position: payload.position,
                        moved_by: None,
                    },
                    None,
                );
            }
            EVENT_CARD_CREATED | EVENT_CARD_UPDATED | EVENT_CARD_ARCHIVED => {
                let payload: CardEventPayload = serde_json::from_value(entry.payload.clone())?;
                self.presence.broadcast(
                    payload.project_id,
                    ServerEvent::CardUpdated {
                        project_id: payload.project_id,
                        data: entry.payload.clone(),
                        updated_by: None,
                    },
                    None,
                );
            }
            EVENT_LIST_CREATED | EVENT_LIST_UPDATED | EVENT_LIST_ARCHIVED
            | EVENT_LIST_REORDERED => {
                let payload: ListEventPayload = serde_json::from_value(entry.payload.clone())?;
                self.presence.broadcast(
                    payload.project_id,
                    ServerEvent::ListUpdated {
                        project_id: payload.project_id,
                        data: entry.payload.clone(),
                        updated_by: None,
                    },
                    None,
                );
            }
            EVENT_CHECKLIST_CREATED | EVENT_CHECKLIST_UPDATED | EVENT_CHECKLIST_DELETED => {
                let payload: ChecklistEventPayload = serde_json::from_value(entry.payload.clone())?;
                self.presence.broadcast(
                    payload.project_id,
                    ServerEvent::ChecklistUpdated {
                        project_id: payload.project_id,
                        data: entry.payload.clone(),
                        updated_by: None,
                    },
                    None,
                );
            }
            _ => {
                tracing::debug!(event_type = entry.event_type.as_str(), "unrouted event type");
            }
        }

        Ok(())
    }
}
