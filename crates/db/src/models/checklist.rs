use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{card, checklist},
    events::{
        EVENT_CHECKLIST_CREATED, EVENT_CHECKLIST_DELETED, EVENT_CHECKLIST_UPDATED,
        ChecklistEventPayload,
    },
    models::{event_outbox::EventOutbox, ids},
};

#[derive(Debug, Error)]
pub enum ChecklistError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Checklist not found")]
    NotFound,
    #[error("Card not found")]
    CardNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Checklist {
    pub id: Uuid,
    pub card_id: Uuid,
    pub title: String,
    pub position: i32,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateChecklist {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateChecklist {
    pub title: Option<String>,
}

impl Checklist {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: checklist::Model,
    ) -> Result<Self, DbErr> {
        let card_id = ids::card_uuid_by_id(db, model.card_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Card not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            card_id,
            title: model.title,
            position: model.position,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub(crate) async fn next_position<C: ConnectionTrait>(
        db: &C,
        card_row_id: i64,
    ) -> Result<i32, DbErr> {
        let max: Option<Option<i32>> = checklist::Entity::find()
            .select_only()
            .column_as(Expr::col(checklist::Column::Position).max(), "max_position")
            .filter(checklist::Column::CardId.eq(card_row_id))
            .into_tuple()
            .one(db)
            .await?;
        Ok(max.flatten().map_or(0, |p| p + 1))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = checklist::Entity::find()
            .filter(checklist::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_card_id<C: ConnectionTrait>(
        db: &C,
        card_id: Uuid,
    ) -> Result<Vec<Self>, ChecklistError> {
        let card_row_id = ids::card_id_by_uuid(db, card_id)
            .await?
            .ok_or(ChecklistError::CardNotFound)?;

        let models = checklist::Entity::find()
            .filter(checklist::Column::CardId.eq(card_row_id))
            .order_by_asc(checklist::Column::Position)
            .all(db)
            .await?;

        let mut checklists = Vec::with_capacity(models.len());
        for model in models {
            checklists.push(Self::from_model(db, model).await?);
        }
        Ok(checklists)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        card_id: Uuid,
        data: &CreateChecklist,
        checklist_id: Uuid,
    ) -> Result<Self, ChecklistError> {
        let card_record = card::Entity::find()
            .filter(card::Column::Uuid.eq(card_id))
            .one(db)
            .await?
            .ok_or(ChecklistError::CardNotFound)?;
        if card_record.archived {
            return Err(ChecklistError::CardNotFound);
        }

        let project_id = project_uuid_for_card(db, &card_record).await?;
        let position = Self::next_position(db, card_record.id).await?;
        let now = Utc::now();
        let active = checklist::ActiveModel {
            uuid: Set(checklist_id),
            card_id: Set(card_record.id),
            title: Set(data.title.clone()),
            position: Set(position),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        let payload = serde_json::to_value(ChecklistEventPayload {
            checklist_id,
            card_id,
            project_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_CHECKLIST_CREATED, "checklist", checklist_id, payload)
            .await?;
        Ok(Self::from_model(db, model).await?)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateChecklist,
    ) -> Result<Self, ChecklistError> {
        let record = checklist::Entity::find()
            .filter(checklist::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ChecklistError::NotFound)?;

        let (card_id, project_id) = card_and_project_uuids(db, record.card_id).await?;

        let mut active: checklist::ActiveModel = record.into();
        if let Some(title) = data.title.clone() {
            active.title = Set(title);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        let payload = serde_json::to_value(ChecklistEventPayload {
            checklist_id: id,
            card_id,
            project_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_CHECKLIST_UPDATED, "checklist", id, payload).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Hard delete (checklists have no archive flag); the card's remaining
    /// checklists compact to close the gap. Run inside one transaction.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), ChecklistError> {
        let record = checklist::Entity::find()
            .filter(checklist::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ChecklistError::NotFound)?;

        let (card_id, project_id) = card_and_project_uuids(db, record.card_id).await?;
        let card_row_id = record.card_id;
        let former_position = record.position;

        checklist::Entity::delete_many()
            .filter(checklist::Column::Id.eq(record.id))
            .exec(db)
            .await?;

        checklist::Entity::update_many()
            .col_expr(
                checklist::Column::Position,
                Expr::col(checklist::Column::Position).sub(1),
            )
            .filter(checklist::Column::CardId.eq(card_row_id))
            .filter(checklist::Column::Position.gt(former_position))
            .exec(db)
            .await?;

        let payload = serde_json::to_value(ChecklistEventPayload {
            checklist_id: id,
            card_id,
            project_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_CHECKLIST_DELETED, "checklist", id, payload).await?;
        Ok(())
    }
}

async fn project_uuid_for_card<C: ConnectionTrait>(
    db: &C,
    card_record: &card::Model,
) -> Result<Uuid, ChecklistError> {
    let list_record = crate::entities::list::Entity::find_by_id(card_record.list_id)
        .one(db)
        .await?
        .ok_or(ChecklistError::CardNotFound)?;
    ids::project_uuid_by_id(db, list_record.project_id)
        .await?
        .ok_or(ChecklistError::CardNotFound)
}

pub(crate) async fn card_and_project_uuids<C: ConnectionTrait>(
    db: &C,
    card_row_id: i64,
) -> Result<(Uuid, Uuid), ChecklistError> {
    let card_record = card::Entity::find_by_id(card_row_id)
        .one(db)
        .await?
        .ok_or(ChecklistError::CardNotFound)?;
    let project_id = project_uuid_for_card(db, &card_record).await?;
    Ok((card_record.uuid, project_id))
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::{
        models::{
            card::{Card, CreateCard},
            list::{CreateList, List},
            project::{CreateProject, Project},
        },
        types::ProjectVisibility,
    };

    use super::*;

    async fn setup_card(db: &sea_orm::DatabaseConnection) -> Card {
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
        Card::create(
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
        .unwrap()
    }

    #[tokio::test]
    async fn checklists_append_and_compact_on_delete() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        let card = setup_card(&db).await;

        let mut ids = Vec::new();
        for title in ["One", "Two", "Three"] {
            let checklist = Checklist::create(
                &db,
                card.id,
                &CreateChecklist {
                    title: title.to_string(),
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
            ids.push(checklist.id);
        }

        let all = Checklist::find_by_card_id(&db, card.id).await.unwrap();
        assert_eq!(
            all.iter().map(|c| c.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        Checklist::delete(&db, ids[0]).await.unwrap();
        let remaining = Checklist::find_by_card_id(&db, card.id).await.unwrap();
        assert_eq!(
            remaining
                .iter()
                .map(|c| (c.title.as_str(), c.position))
                .collect::<Vec<_>>(),
            vec![("Two", 0), ("Three", 1)]
        );

        let missing = Checklist::delete(&db, ids[0]).await;
        assert!(matches!(missing, Err(ChecklistError::NotFound)));
    }
}
