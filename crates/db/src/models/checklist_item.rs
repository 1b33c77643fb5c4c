use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{checklist, checklist_item},
    events::{EVENT_CHECKLIST_UPDATED, ChecklistEventPayload},
    models::{checklist::card_and_project_uuids, event_outbox::EventOutbox, ids},
};

#[derive(Debug, Error)]
pub enum ChecklistItemError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Checklist item not found")]
    NotFound,
    #[error("Checklist not found")]
    ChecklistNotFound,
    #[error("Invalid position: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub checklist_id: Uuid,
    pub title: String,
    pub completed: bool,
    pub position: i32,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateChecklistItem {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateChecklistItem {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl ChecklistItem {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: checklist_item::Model,
    ) -> Result<Self, DbErr> {
        let checklist_id = ids::checklist_uuid_by_id(db, model.checklist_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Checklist not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            checklist_id,
            title: model.title,
            completed: model.completed,
            position: model.position,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub(crate) async fn next_position<C: ConnectionTrait>(
        db: &C,
        checklist_row_id: i64,
    ) -> Result<i32, DbErr> {
        let max: Option<Option<i32>> = checklist_item::Entity::find()
            .select_only()
            .column_as(
                Expr::col(checklist_item::Column::Position).max(),
                "max_position",
            )
            .filter(checklist_item::Column::ChecklistId.eq(checklist_row_id))
            .into_tuple()
            .one(db)
            .await?;
        Ok(max.flatten().map_or(0, |p| p + 1))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = checklist_item::Entity::find()
            .filter(checklist_item::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_checklist_id<C: ConnectionTrait>(
        db: &C,
        checklist_id: Uuid,
    ) -> Result<Vec<Self>, ChecklistItemError> {
        let checklist_row_id = ids::checklist_id_by_uuid(db, checklist_id)
            .await?
            .ok_or(ChecklistItemError::ChecklistNotFound)?;

        let models = checklist_item::Entity::find()
            .filter(checklist_item::Column::ChecklistId.eq(checklist_row_id))
            .order_by_asc(checklist_item::Column::Position)
            .all(db)
            .await?;

        let mut items = Vec::with_capacity(models.len());
        for model in models {
            items.push(Self::from_model(db, model).await?);
        }
        Ok(items)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        checklist_id: Uuid,
        data: &CreateChecklistItem,
        item_id: Uuid,
    ) -> Result<Self, ChecklistItemError> {
        let checklist_record = checklist::Entity::find()
            .filter(checklist::Column::Uuid.eq(checklist_id))
            .one(db)
            .await?
            .ok_or(ChecklistItemError::ChecklistNotFound)?;

        let position = Self::next_position(db, checklist_record.id).await?;
        let now = Utc::now();
        let active = checklist_item::ActiveModel {
            uuid: Set(item_id),
            checklist_id: Set(checklist_record.id),
            title: Set(data.title.clone()),
            completed: Set(false),
            position: Set(position),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Self::notify_checklist(db, checklist_record.card_id, checklist_id).await?;
        Ok(Self::from_model(db, model).await?)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateChecklistItem,
    ) -> Result<Self, ChecklistItemError> {
        let record = checklist_item::Entity::find()
            .filter(checklist_item::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ChecklistItemError::NotFound)?;

        let checklist_record = checklist::Entity::find_by_id(record.checklist_id)
            .one(db)
            .await?
            .ok_or(ChecklistItemError::ChecklistNotFound)?;
        let checklist_id = checklist_record.uuid;

        let mut active: checklist_item::ActiveModel = record.into();
        if let Some(title) = data.title.clone() {
            active.title = Set(title);
        }
        if let Some(completed) = data.completed {
            active.completed = Set(completed);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        Self::notify_checklist(db, checklist_record.card_id, checklist_id).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Same-checklist reorder: the shift mirrors the card move engine, minus
    /// cross-container moves (items never change checklist). Run inside one
    /// transaction.
    pub async fn move_to<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        new_position: i32,
    ) -> Result<Self, ChecklistItemError> {
        if new_position < 0 {
            return Err(ChecklistItemError::ValidationError(format!(
                "negative position {new_position}"
            )));
        }

        let record = checklist_item::Entity::find()
            .filter(checklist_item::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ChecklistItemError::NotFound)?;

        let checklist_record = checklist::Entity::find_by_id(record.checklist_id)
            .one(db)
            .await?
            .ok_or(ChecklistItemError::ChecklistNotFound)?;

        let current = record.position;
        let total = checklist_item::Entity::find()
            .filter(checklist_item::Column::ChecklistId.eq(record.checklist_id))
            .count(db)
            .await? as i32;
        let target = Ord::min(new_position, Ord::max(total - 1, 0));

        if target == current {
            return Ok(Self::from_model(db, record).await?);
        }

        if target > current {
            checklist_item::Entity::update_many()
                .col_expr(
                    checklist_item::Column::Position,
                    Expr::col(checklist_item::Column::Position).sub(1),
                )
                .filter(checklist_item::Column::ChecklistId.eq(record.checklist_id))
                .filter(checklist_item::Column::Position.gt(current))
                .filter(checklist_item::Column::Position.lte(target))
                .filter(checklist_item::Column::Id.ne(record.id))
                .exec(db)
                .await?;
        } else {
            checklist_item::Entity::update_many()
                .col_expr(
                    checklist_item::Column::Position,
                    Expr::col(checklist_item::Column::Position).add(1),
                )
                .filter(checklist_item::Column::ChecklistId.eq(record.checklist_id))
                .filter(checklist_item::Column::Position.gte(target))
                .filter(checklist_item::Column::Position.lt(current))
                .filter(checklist_item::Column::Id.ne(record.id))
                .exec(db)
                .await?;
        }

        let row_id = record.id;
        let mut active: checklist_item::ActiveModel = record.into();
        active.position = Set(target);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        Self::notify_checklist(db, checklist_record.card_id, checklist_record.uuid).await?;

        let moved = checklist_item::Entity::find_by_id(row_id)
            .one(db)
            .await?
            .ok_or(ChecklistItemError::NotFound)?;
        Ok(Self::from_model(db, moved).await?)
    }

    /// Hard delete with sibling compaction. Run inside one transaction.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), ChecklistItemError> {
        let record = checklist_item::Entity::find()
            .filter(checklist_item::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ChecklistItemError::NotFound)?;

        let checklist_record = checklist::Entity::find_by_id(record.checklist_id)
            .one(db)
            .await?
            .ok_or(ChecklistItemError::ChecklistNotFound)?;

        checklist_item::Entity::delete_many()
            .filter(checklist_item::Column::Id.eq(record.id))
            .exec(db)
            .await?;

        checklist_item::Entity::update_many()
            .col_expr(
                checklist_item::Column::Position,
                Expr::col(checklist_item::Column::Position).sub(1),
            )
            .filter(checklist_item::Column::ChecklistId.eq(record.checklist_id))
            .filter(checklist_item::Column::Position.gt(record.position))
            .exec(db)
            .await?;

        Self::notify_checklist(db, checklist_record.card_id, checklist_record.uuid).await?;
        Ok(())
    }

    async fn notify_checklist<C: ConnectionTrait>(
        db: &C,
        card_row_id: i64,
        checklist_id: Uuid,
    ) -> Result<(), ChecklistItemError> {
        let (card_id, project_id) = match card_and_project_uuids(db, card_row_id).await {
            Ok(found) => found,
            Err(crate::models::checklist::ChecklistError::Database(err)) => {
                return Err(ChecklistItemError::Database(err));
            }
            Err(_) => return Err(ChecklistItemError::ChecklistNotFound),
        };
        let payload = serde_json::to_value(ChecklistEventPayload {
            checklist_id,
            card_id,
            project_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_CHECKLIST_UPDATED, "checklist", checklist_id, payload)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::{
        models::{
            card::{Card, CreateCard},
            checklist::{Checklist, CreateChecklist},
            list::{CreateList, List},
            project::{CreateProject, Project},
        },
        types::ProjectVisibility,
    };

    use super::*;

    async fn setup_checklist(db: &sea_orm::DatabaseConnection) -> Checklist {
        let project = Project::create(
            db,
            &CreateProject {
                name: "Board".to_string(),
                owner_user_id: Uuid::new_v4(),
                visibility: Some(ProjectVisibility::Private),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let list = List::create(
            db,
            project.id,
            &CreateList {
                title: "L".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let card = Card::create(
            db,
            list.id,
            &CreateCard {
                title: "Card".to_string(),
                description: None,
                due_date: None,
                content_id: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        Checklist::create(
            db,
            card.id,
            &CreateChecklist {
                title: "Steps".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    async fn titles_in_order(
        db: &sea_orm::DatabaseConnection,
        checklist_id: Uuid,
    ) -> Vec<(String, i32)> {
        ChecklistItem::find_by_checklist_id(db, checklist_id)
            .await
            .unwrap()
            .into_iter()
            .map(|i| (i.title, i.position))
            .collect()
    }

    #[tokio::test]
    async fn items_reorder_within_checklist() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        let checklist = setup_checklist(&db).await;

        let mut items = Vec::new();
        for title in ["a", "b", "c"] {
            items.push(
                ChecklistItem::create(
                    &db,
                    checklist.id,
                    &CreateChecklistItem {
                        title: title.to_string(),
                    },
                    Uuid::new_v4(),
                )
                .await
                .unwrap(),
            );
        }

        ChecklistItem::move_to(&db, items[0].id, 2).await.unwrap();
        assert_eq!(
            titles_in_order(&db, checklist.id).await,
            vec![
                ("b".to_string(), 0),
                ("c".to_string(), 1),
                ("a".to_string(), 2)
            ]
        );

        ChecklistItem::move_to(&db, items[2].id, 0).await.unwrap();
        assert_eq!(
            titles_in_order(&db, checklist.id).await,
            vec![
                ("c".to_string(), 0),
                ("b".to_string(), 1),
                ("a".to_string(), 2)
            ]
        );
    }

    #[tokio::test]
    async fn item_delete_compacts_and_toggle_persists() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        let checklist = setup_checklist(&db).await;

        let mut items = Vec::new();
        for title in ["a", "b", "c"] {
            items.push(
                ChecklistItem::create(
                    &db,
                    checklist.id,
                    &CreateChecklistItem {
                        title: title.to_string(),
                    },
                    Uuid::new_v4(),
                )
                .await
                .unwrap(),
            );
        }

        let toggled = ChecklistItem::update(
            &db,
            items[1].id,
            &UpdateChecklistItem {
                title: None,
                completed: Some(true),
            },
        )
        .await
        .unwrap();
        assert!(toggled.completed);

        ChecklistItem::delete(&db, items[0].id).await.unwrap();
        assert_eq!(
            titles_in_order(&db, checklist.id).await,
            vec![("b".to_string(), 0), ("c".to_string(), 1)]
        );
    }
}
