use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const EVENT_PROJECT_CREATED: &str = "project.created";
pub const EVENT_PROJECT_UPDATED: &str = "project.updated";
pub const EVENT_PROJECT_ARCHIVED: &str = "project.archived";

pub const EVENT_LIST_CREATED: &str = "list.created";
pub const EVENT_LIST_UPDATED: &str = "list.updated";
pub const EVENT_LIST_ARCHIVED: &str = "list.archived";
pub const EVENT_LIST_REORDERED: &str = "list.reordered";

pub const EVENT_CARD_CREATED: &str = "card.created";
pub const EVENT_CARD_UPDATED: &str = "card.updated";
pub const EVENT_CARD_MOVED: &str = "card.moved";
pub const EVENT_CARD_ARCHIVED: &str = "card.archived";

pub const EVENT_CHECKLIST_CREATED: &str = "checklist.created";
pub const EVENT_CHECKLIST_UPDATED: &str = "checklist.updated";
pub const EVENT_CHECKLIST_DELETED: &str = "checklist.deleted";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEventPayload {
    pub project_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEventPayload {
    pub list_id: Uuid,
    pub project_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardEventPayload {
    pub card_id: Uuid,
    pub list_id: Uuid,
    pub project_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardMovedPayload {
    pub card_id: Uuid,
    pub source_list_id: Uuid,
    pub destination_list_id: Uuid,
    pub position: i32,
    pub project_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistEventPayload {
    pub checklist_id: Uuid,
    pub card_id: Uuid,
    pub project_id: Uuid,
}
