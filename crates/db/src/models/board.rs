use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{card, checklist, checklist_item, list},
    models::{
        card::Card, checklist::Checklist, checklist_item::ChecklistItem, ids, list::List,
        project::Project, project_member::ProjectMember,
    },
};

/// Assembled snapshot of one project for client rendering: lists ordered by
/// position, cards within each list ordered by position, checklists and
/// items nested the same way. Archived rows never appear. Read-only; clients
/// reconcile against this after any mutation or missed realtime hint.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardData {
    pub project: Project,
    pub members: Vec<ProjectMember>,
    pub lists: Vec<BoardList>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardList {
    #[serde(flatten)]
    #[ts(flatten)]
    pub list: List,
    pub cards: Vec<BoardCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardCard {
    #[serde(flatten)]
    #[ts(flatten)]
    pub card: Card,
    pub checklists: Vec<BoardChecklist>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardChecklist {
    #[serde(flatten)]
    #[ts(flatten)]
    pub checklist: Checklist,
    pub items: Vec<ChecklistItem>,
}

pub struct Board;

impl Board {
    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Option<BoardData>, DbErr> {
        let Some(project) = Project::find_by_id(db, project_id).await? else {
            return Ok(None);
        };
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let members = match ProjectMember::find_by_project_id(db, project_id).await {
            Ok(members) => members,
            Err(crate::models::project_member::ProjectMemberError::Database(err)) => {
                return Err(err);
            }
            Err(_) => Vec::new(),
        };

        let list_models = list::Entity::find()
            .filter(list::Column::ProjectId.eq(project_row_id))
            .filter(list::Column::Archived.eq(false))
            .order_by_asc(list::Column::Position)
            .all(db)
            .await?;
        let list_row_ids: Vec<i64> = list_models.iter().map(|l| l.id).collect();

        let card_models = if list_row_ids.is_empty() {
            Vec::new()
        } else {
            card::Entity::find()
                .filter(card::Column::ListId.is_in(list_row_ids.clone()))
                .filter(card::Column::Archived.eq(false))
                .order_by_asc(card::Column::Position)
                .all(db)
                .await?
        };
        let card_row_ids: Vec<i64> = card_models.iter().map(|c| c.id).collect();

        let checklist_models = if card_row_ids.is_empty() {
            Vec::new()
        } else {
            checklist::Entity::find()
                .filter(checklist::Column::CardId.is_in(card_row_ids.clone()))
                .order_by_asc(checklist::Column::Position)
                .all(db)
                .await?
        };
        let checklist_row_ids: Vec<i64> = checklist_models.iter().map(|c| c.id).collect();

        let item_models = if checklist_row_ids.is_empty() {
            Vec::new()
        } else {
            checklist_item::Entity::find()
                .filter(checklist_item::Column::ChecklistId.is_in(checklist_row_ids))
                .order_by_asc(checklist_item::Column::Position)
                .all(db)
                .await?
        };

        let checklist_uuid_by_row: HashMap<i64, Uuid> =
            checklist_models.iter().map(|c| (c.id, c.uuid)).collect();
        let card_uuid_by_row: HashMap<i64, Uuid> =
            card_models.iter().map(|c| (c.id, c.uuid)).collect();
        let list_uuid_by_row: HashMap<i64, Uuid> =
            list_models.iter().map(|l| (l.id, l.uuid)).collect();

        let mut items_by_checklist: HashMap<i64, Vec<ChecklistItem>> = HashMap::new();
        for model in item_models {
            let checklist_uuid = checklist_uuid_by_row
                .get(&model.checklist_id)
                .copied()
                .ok_or(DbErr::RecordNotFound("Checklist not found".to_string()))?;
            items_by_checklist
                .entry(model.checklist_id)
                .or_default()
                .push(ChecklistItem {
                    id: model.uuid,
                    checklist_id: checklist_uuid,
                    title: model.title,
                    completed: model.completed,
                    position: model.position,
                    created_at: model.created_at,
                    updated_at: model.updated_at,
                });
        }

        let mut checklists_by_card: HashMap<i64, Vec<BoardChecklist>> = HashMap::new();
        for model in checklist_models {
            let card_uuid = card_uuid_by_row
                .get(&model.card_id)
                .copied()
                .ok_or(DbErr::RecordNotFound("Card not found".to_string()))?;
            let items = items_by_checklist.remove(&model.id).unwrap_or_default();
            checklists_by_card
                .entry(model.card_id)
                .or_default()
                .push(BoardChecklist {
                    checklist: Checklist {
                        id: model.uuid,
                        card_id: card_uuid,
                        title: model.title,
                        position: model.position,
                        created_at: model.created_at,
                        updated_at: model.updated_at,
                    },
                    items,
                });
        }

        let mut cards_by_list: HashMap<i64, Vec<BoardCard>> = HashMap::new();
        for model in card_models {
            let list_uuid = list_uuid_by_row
                .get(&model.list_id)
                .copied()
                .ok_or(DbErr::RecordNotFound("List not found".to_string()))?;
            let checklists = checklists_by_card.remove(&model.id).unwrap_or_default();
            cards_by_list
                .entry(model.list_id)
                .or_default()
                .push(BoardCard {
                    card: Card {
                        id: model.uuid,
                        list_id: list_uuid,
                        title: model.title,
                        description: model.description,
                        position: model.position,
                        archived: model.archived,
                        completed: model.completed,
                        due_date: model.due_date,
                        content_id: model.content_id,
                        created_at: model.created_at,
                        updated_at: model.updated_at,
                    },
                    checklists,
                });
        }

        let lists = list_models
            .into_iter()
            .map(|model| BoardList {
                cards: cards_by_list.remove(&model.id).unwrap_or_default(),
                list: List {
                    id: model.uuid,
                    project_id,
                    title: model.title,
                    position: model.position,
                    archived: model.archived,
                    created_at: model.created_at,
                    updated_at: model.updated_at,
                },
            })
            .collect();

        Ok(Some(BoardData {
            project,
            members,
            lists,
        }))
    }
}
