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
    entities::{card, list},
    events::{
        EVENT_CARD_ARCHIVED, EVENT_LIST_ARCHIVED, EVENT_LIST_CREATED, EVENT_LIST_REORDERED,
        EVENT_LIST_UPDATED, CardEventPayload, ListEventPayload,
    },
    models::{event_outbox::EventOutbox, ids},
};

#[derive(Debug, Error)]
pub enum ListError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("List not found")]
    NotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Invalid position assignment: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct List {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub position: i32,
    pub archived: bool,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateList {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateList {
    pub title: Option<String>,
}

/// One entry of a full list-order assignment for a project.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ListPosition {
    pub id: Uuid,
    pub position: i32,
}

impl List {
    async fn from_model<C: ConnectionTrait>(db: &C, model: list::Model) -> Result<Self, DbErr> {
        let project_id = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            project_id,
            title: model.title,
            position: model.position,
            archived: model.archived,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    /// Append slot for a new list: `max(position) + 1` among active lists,
    /// `0` for an empty project. Call inside the insert transaction.
    pub(crate) async fn next_position<C: ConnectionTrait>(
        db: &C,
        project_row_id: i64,
    ) -> Result<i32, DbErr> {
        let max: Option<Option<i32>> = list::Entity::find()
            .select_only()
            .column_as(Expr::col(list::Column::Position).max(), "max_position")
            .filter(list::Column::ProjectId.eq(project_row_id))
            .filter(list::Column::Archived.eq(false))
            .into_tuple()
            .one(db)
            .await?;
        Ok(max.flatten().map_or(0, |p| p + 1))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = list::Entity::find()
            .filter(list::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_active_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, ListError> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(ListError::ProjectNotFound)?;

        let models = list::Entity::find()
            .filter(list::Column::ProjectId.eq(project_row_id))
            .filter(list::Column::Archived.eq(false))
            .order_by_asc(list::Column::Position)
            .all(db)
            .await?;

        let mut lists = Vec::with_capacity(models.len());
        for model in models {
            lists.push(Self::from_model(db, model).await?);
        }
        Ok(lists)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        data: &CreateList,
        list_id: Uuid,
    ) -> Result<Self, ListError> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(ListError::ProjectNotFound)?;

        let position = Self::next_position(db, project_row_id).await?;
        let now = Utc::now();
        let active = list::ActiveModel {
            uuid: Set(list_id),
            project_id: Set(project_row_id),
            title: Set(data.title.clone()),
            position: Set(position),
            archived: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        let payload = serde_json::to_value(ListEventPayload { list_id, project_id })
            .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_LIST_CREATED, "list", list_id, payload).await?;
        Ok(Self::from_model(db, model).await?)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateList,
    ) -> Result<Self, ListError> {
        let record = list::Entity::find()
            .filter(list::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ListError::NotFound)?;

        let project_id = ids::project_uuid_by_id(db, record.project_id)
            .await?
            .ok_or(ListError::ProjectNotFound)?;

        let mut active: list::ActiveModel = record.into();
        if let Some(title) = data.title.clone() {
            active.title = Set(title);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        let payload = serde_json::to_value(ListEventPayload { list_id: id, project_id })
            .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_LIST_UPDATED, "list", id, payload).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Writes a caller-supplied `{id, position}` assignment for the project's
    /// lists. The caller owns the permutation; every referenced list must
    /// belong to the project. Run inside one transaction.
    pub async fn reorder<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        positions: &[ListPosition],
    ) -> Result<(), ListError> {
        let Some(first) = positions.first() else {
            return Ok(());
        };
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(ListError::ProjectNotFound)?;

        for entry in positions {
            if entry.position < 0 {
                return Err(ListError::ValidationError(format!(
                    "negative position {} for list {}",
                    entry.position, entry.id
                )));
            }

            let result = list::Entity::update_many()
                .col_expr(list::Column::Position, Expr::value(entry.position))
                .col_expr(list::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(list::Column::Uuid.eq(entry.id))
                .filter(list::Column::ProjectId.eq(project_row_id))
                .exec(db)
                .await?;
            if result.rows_affected == 0 {
                return Err(ListError::NotFound);
            }
        }

        let payload = serde_json::to_value(ListEventPayload {
            list_id: first.id,
            project_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_LIST_REORDERED, "project", project_id, payload).await?;
        Ok(())
    }

    /// Archives the list, cascades to every card in it, and closes the gap in
    /// the sibling position sequence. Run inside one transaction.
    pub async fn archive<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), ListError> {
        let record = list::Entity::find()
            .filter(list::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ListError::NotFound)?;
        if record.archived {
            return Ok(());
        }

        let project_id = ids::project_uuid_by_id(db, record.project_id)
            .await?
            .ok_or(ListError::ProjectNotFound)?;
        let project_row_id = record.project_id;
        let list_row_id = record.id;
        let former_position = record.position;

        // Cascade first so the cards vanish from active views together with
        // their list. No card-position compaction here: the archived list's
        // sequence is no longer rendered.
        let cards = card::Entity::find()
            .filter(card::Column::ListId.eq(list_row_id))
            .filter(card::Column::Archived.eq(false))
            .all(db)
            .await?;
        card::Entity::update_many()
            .col_expr(card::Column::Archived, Expr::value(true))
            .col_expr(card::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(card::Column::ListId.eq(list_row_id))
            .filter(card::Column::Archived.eq(false))
            .exec(db)
            .await?;

        let mut active: list::ActiveModel = record.into();
        active.archived = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        list::Entity::update_many()
            .col_expr(
                list::Column::Position,
                Expr::col(list::Column::Position).sub(1),
            )
            .filter(list::Column::ProjectId.eq(project_row_id))
            .filter(list::Column::Archived.eq(false))
            .filter(list::Column::Position.gt(former_position))
            .exec(db)
            .await?;

        for card_model in cards {
            let payload = serde_json::to_value(CardEventPayload {
                card_id: card_model.uuid,
                list_id: id,
                project_id,
            })
            .map_err(|err| DbErr::Custom(err.to_string()))?;
            EventOutbox::enqueue(db, EVENT_CARD_ARCHIVED, "card", card_model.uuid, payload)
                .await?;
        }

        let payload = serde_json::to_value(ListEventPayload { list_id: id, project_id })
            .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_LIST_ARCHIVED, "list", id, payload).await?;
        Ok(())
    }
}
