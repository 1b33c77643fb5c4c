use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{card, list},
    events::{
        EVENT_CARD_ARCHIVED, EVENT_CARD_CREATED, EVENT_CARD_MOVED, EVENT_CARD_UPDATED,
        CardEventPayload, CardMovedPayload,
    },
    models::{event_outbox::EventOutbox, ids},
};

/// A moved card's final write is guarded by its `version` column; when a
/// racing transaction bumped it first, the whole move is retried from the
/// top with backoff before the conflict surfaces to the caller.
const MAX_MOVE_RETRIES: usize = 3;
const INITIAL_BACKOFF_MS: u64 = 25;
const MAX_BACKOFF_MS: u64 = 250;

#[derive(Debug, Error)]
pub enum CardError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Card not found")]
    NotFound,
    #[error("List not found")]
    ListNotFound,
    #[error("Invalid position: {0}")]
    ValidationError(String),
    #[error("Card was moved concurrently; re-sync the board and retry")]
    MoveConflict,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Card {
    pub id: Uuid,
    pub list_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub archived: bool,
    pub completed: bool,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
    pub content_id: Option<Uuid>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateCard {
    pub title: String,
    pub description: Option<String>,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
    pub content_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateCard {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
    pub content_id: Option<Uuid>,
}

impl Card {
    async fn from_model<C: ConnectionTrait>(db: &C, model: card::Model) -> Result<Self, DbErr> {
        let list_id = ids::list_uuid_by_id(db, model.list_id)
            .await?
            .ok_or(DbErr::RecordNotFound("List not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            list_id,
            title: model.title,
            description: model.description,
            position: model.position,
            archived: model.archived,
            completed: model.completed,
            due_date: model.due_date,
            content_id: model.content_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    /// Append slot for a new card: `max(position) + 1` among the list's
    /// active cards, `0` when the list is empty. Runs against the caller's
    /// connection; callers that insert afterwards should hold a transaction
    /// so concurrent creations serialize at the store.
    pub(crate) async fn next_position<C: ConnectionTrait>(
        db: &C,
        list_row_id: i64,
    ) -> Result<i32, DbErr> {
        let max: Option<Option<i32>> = card::Entity::find()
            .select_only()
            .column_as(Expr::col(card::Column::Position).max(), "max_position")
            .filter(card::Column::ListId.eq(list_row_id))
            .filter(card::Column::Archived.eq(false))
            .into_tuple()
            .one(db)
            .await?;
        Ok(max.flatten().map_or(0, |p| p + 1))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = card::Entity::find()
            .filter(card::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_active_by_list_id<C: ConnectionTrait>(
        db: &C,
        list_id: Uuid,
    ) -> Result<Vec<Self>, CardError> {
        let list_row_id = ids::list_id_by_uuid(db, list_id)
            .await?
            .ok_or(CardError::ListNotFound)?;

        let models = card::Entity::find()
            .filter(card::Column::ListId.eq(list_row_id))
            .filter(card::Column::Archived.eq(false))
            .order_by_asc(card::Column::Position)
            .all(db)
            .await?;

        let mut cards = Vec::with_capacity(models.len());
        for model in models {
            cards.push(Self::from_model(db, model).await?);
        }
        Ok(cards)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        list_id: Uuid,
        data: &CreateCard,
        card_id: Uuid,
    ) -> Result<Self, CardError> {
        let list_record = list::Entity::find()
            .filter(list::Column::Uuid.eq(list_id))
            .one(db)
            .await?
            .ok_or(CardError::ListNotFound)?;
        if list_record.archived {
            return Err(CardError::ListNotFound);
        }

        let project_id = ids::project_uuid_by_id(db, list_record.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let position = Self::next_position(db, list_record.id).await?;
        let now = Utc::now();
        let active = card::ActiveModel {
            uuid: Set(card_id),
            list_id: Set(list_record.id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            position: Set(position),
            archived: Set(false),
            completed: Set(false),
            due_date: Set(data.due_date),
            content_id: Set(data.content_id),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        let payload = serde_json::to_value(CardEventPayload {
            card_id,
            list_id,
            project_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_CARD_CREATED, "card", card_id, payload).await?;
        Ok(Self::from_model(db, model).await?)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateCard,
    ) -> Result<Self, CardError> {
        let record = card::Entity::find()
            .filter(card::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(CardError::NotFound)?;

        let (list_id, project_id) = list_and_project_uuids(db, record.list_id).await?;

        let mut active: card::ActiveModel = record.into();
        if let Some(title) = data.title.clone() {
            active.title = Set(title);
        }
        if data.description.is_some() {
            active.description = Set(data.description.clone().filter(|d| !d.trim().is_empty()));
        }
        if let Some(completed) = data.completed {
            active.completed = Set(completed);
        }
        if data.due_date.is_some() {
            active.due_date = Set(data.due_date);
        }
        if data.content_id.is_some() {
            active.content_id = Set(data.content_id);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        let payload = serde_json::to_value(CardEventPayload {
            card_id: id,
            list_id,
            project_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_CARD_UPDATED, "card", id, payload).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Moves a card to `new_position` in `destination_list_id`, shifting the
    /// affected siblings so source and destination stay dense and strictly
    /// increasing. Everything happens in one transaction; a version-guard
    /// miss on the final write aborts it and the move is retried.
    pub async fn move_to<C>(
        db: &C,
        id: Uuid,
        destination_list_id: Uuid,
        new_position: i32,
    ) -> Result<Self, CardError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        if new_position < 0 {
            return Err(CardError::ValidationError(format!(
                "negative position {new_position}"
            )));
        }

        let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
        for attempt in 0..=MAX_MOVE_RETRIES {
            let tx = db.begin().await?;
            match Self::move_in_tx(&tx, id, destination_list_id, new_position).await {
                Ok(card) => {
                    tx.commit().await?;
                    return Ok(card);
                }
                Err(CardError::MoveConflict) if attempt < MAX_MOVE_RETRIES => {
                    tx.rollback().await?;
                    tracing::debug!(
                        card_id = %id,
                        attempt,
                        "move hit a version conflict, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    let next_ms =
                        Ord::min((backoff.as_millis() as u64).saturating_mul(2), MAX_BACKOFF_MS);
                    backoff = Duration::from_millis(next_ms);
                }
                Err(err) => {
                    tx.rollback().await?;
                    return Err(err);
                }
            }
        }

        Err(CardError::MoveConflict)
    }

    async fn move_in_tx<C: ConnectionTrait>(
        tx: &C,
        id: Uuid,
        destination_list_id: Uuid,
        new_position: i32,
    ) -> Result<Self, CardError> {
        let record = card::Entity::find()
            .filter(card::Column::Uuid.eq(id))
            .one(tx)
            .await?
            .ok_or(CardError::NotFound)?;
        if record.archived {
            return Err(CardError::NotFound);
        }

        let destination = list::Entity::find()
            .filter(list::Column::Uuid.eq(destination_list_id))
            .one(tx)
            .await?
            .ok_or(CardError::ListNotFound)?;
        if destination.archived {
            return Err(CardError::ListNotFound);
        }

        let source_list_row_id = record.list_id;
        let current_position = record.position;
        let version = record.version;
        let card_row_id = record.id;

        let source_list_id = ids::list_uuid_by_id(tx, source_list_row_id)
            .await?
            .ok_or(CardError::ListNotFound)?;
        let project_id = ids::project_uuid_by_id(tx, destination.project_id)
            .await?
            .ok_or(CardError::ListNotFound)?;

        let same_list = destination.id == source_list_row_id;

        // Clamp the target so the destination sequence stays gap-free even
        // when the client asks for a slot past the end.
        let destination_active = card::Entity::find()
            .filter(card::Column::ListId.eq(destination.id))
            .filter(card::Column::Archived.eq(false))
            .count(tx)
            .await? as i32;
        let last_slot = if same_list {
            destination_active - 1
        } else {
            destination_active
        };
        let target = Ord::min(new_position, Ord::max(last_slot, 0));

        if same_list && target == current_position {
            return Self::from_model(tx, record).await.map_err(CardError::from);
        }

        if same_list {
            if target > current_position {
                // Forward: everything in (current, target] steps back one.
                card::Entity::update_many()
                    .col_expr(
                        card::Column::Position,
                        Expr::col(card::Column::Position).sub(1),
                    )
                    .col_expr(
                        card::Column::Version,
                        Expr::col(card::Column::Version).add(1),
                    )
                    .filter(card::Column::ListId.eq(source_list_row_id))
                    .filter(card::Column::Archived.eq(false))
                    .filter(card::Column::Position.gt(current_position))
                    .filter(card::Column::Position.lte(target))
                    .filter(card::Column::Id.ne(card_row_id))
                    .exec(tx)
                    .await?;
            } else {
                // Backward: everything in [target, current) steps up one.
                card::Entity::update_many()
                    .col_expr(
                        card::Column::Position,
                        Expr::col(card::Column::Position).add(1),
                    )
                    .col_expr(
                        card::Column::Version,
                        Expr::col(card::Column::Version).add(1),
                    )
                    .filter(card::Column::ListId.eq(source_list_row_id))
                    .filter(card::Column::Archived.eq(false))
                    .filter(card::Column::Position.gte(target))
                    .filter(card::Column::Position.lt(current_position))
                    .filter(card::Column::Id.ne(card_row_id))
                    .exec(tx)
                    .await?;
            }
        } else {
            // Close the gap left behind in the source list.
            card::Entity::update_many()
                .col_expr(
                    card::Column::Position,
                    Expr::col(card::Column::Position).sub(1),
                )
                .col_expr(
                    card::Column::Version,
                    Expr::col(card::Column::Version).add(1),
                )
                .filter(card::Column::ListId.eq(source_list_row_id))
                .filter(card::Column::Archived.eq(false))
                .filter(card::Column::Position.gt(current_position))
                .exec(tx)
                .await?;

            // Open a slot at the target in the destination.
            card::Entity::update_many()
                .col_expr(
                    card::Column::Position,
                    Expr::col(card::Column::Position).add(1),
                )
                .col_expr(
                    card::Column::Version,
                    Expr::col(card::Column::Version).add(1),
                )
                .filter(card::Column::ListId.eq(destination.id))
                .filter(card::Column::Archived.eq(false))
                .filter(card::Column::Position.gte(target))
                .exec(tx)
                .await?;
        }

        let result = card::Entity::update_many()
            .col_expr(card::Column::ListId, Expr::value(destination.id))
            .col_expr(card::Column::Position, Expr::value(target))
            .col_expr(card::Column::Version, Expr::value(version + 1))
            .col_expr(card::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(card::Column::Id.eq(card_row_id))
            .filter(card::Column::Version.eq(version))
            .exec(tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(CardError::MoveConflict);
        }

        let payload = serde_json::to_value(CardMovedPayload {
            card_id: id,
            source_list_id,
            destination_list_id,
            position: target,
            project_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(tx, EVENT_CARD_MOVED, "card", id, payload).await?;

        let moved = card::Entity::find()
            .filter(card::Column::Id.eq(card_row_id))
            .one(tx)
            .await?
            .ok_or(CardError::NotFound)?;
        Ok(Self::from_model(tx, moved).await?)
    }

    /// Archives the card and closes the gap it leaves among its active
    /// siblings. Run inside one transaction.
    pub async fn archive<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), CardError> {
        let record = card::Entity::find()
            .filter(card::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(CardError::NotFound)?;
        if record.archived {
            return Ok(());
        }

        let (list_id, project_id) = list_and_project_uuids(db, record.list_id).await?;
        let list_row_id = record.list_id;
        let former_position = record.position;

        let mut active: card::ActiveModel = record.into();
        active.archived = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        card::Entity::update_many()
            .col_expr(
                card::Column::Position,
                Expr::col(card::Column::Position).sub(1),
            )
            .col_expr(
                card::Column::Version,
                Expr::col(card::Column::Version).add(1),
            )
            .filter(card::Column::ListId.eq(list_row_id))
            .filter(card::Column::Archived.eq(false))
            .filter(card::Column::Position.gt(former_position))
            .exec(db)
            .await?;

        let payload = serde_json::to_value(CardEventPayload {
            card_id: id,
            list_id,
            project_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_CARD_ARCHIVED, "card", id, payload).await?;
        Ok(())
    }
}

async fn list_and_project_uuids<C: ConnectionTrait>(
    db: &C,
    list_row_id: i64,
) -> Result<(Uuid, Uuid), CardError> {
    let list_record = list::Entity::find_by_id(list_row_id)
        .one(db)
        .await?
        .ok_or(CardError::ListNotFound)?;
    let list_id = list_record.uuid;
    let project_id = ids::project_uuid_by_id(db, list_record.project_id)
        .await?
        .ok_or(CardError::ListNotFound)?;
    Ok((list_id, project_id))
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::{
        models::{
            list::{CreateList, List},
            project::{CreateProject, Project},
        },
        types::ProjectVisibility,
    };

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn make_board(db: &sea_orm::DatabaseConnection) -> (Project, List, List) {
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
        let l1 = List::create(
            db,
            project.id,
            &CreateList {
                title: "L1".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let l2 = List::create(
            db,
            project.id,
            &CreateList {
                title: "L2".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        (project, l1, l2)
    }

    async fn make_card(db: &sea_orm::DatabaseConnection, list_id: Uuid, title: &str) -> Card {
        Card::create(
            db,
            list_id,
            &CreateCard {
                title: title.to_string(),
                description: None,
                due_date: None,
                content_id: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    async fn order_of(db: &sea_orm::DatabaseConnection, list_id: Uuid) -> Vec<(String, i32)> {
        Card::find_active_by_list_id(db, list_id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| (c.title, c.position))
            .collect()
    }

    fn assert_dense(cards: &[(String, i32)]) {
        for (expected, (_, position)) in cards.iter().enumerate() {
            assert_eq!(*position, expected as i32);
        }
    }

    #[tokio::test]
    async fn cards_append_at_end_and_stay_dense() {
        let db = setup_db().await;
        let (_, l1, _) = make_board(&db).await;

        for title in ["A", "B", "C"] {
            make_card(&db, l1.id, title).await;
        }

        let order = order_of(&db, l1.id).await;
        assert_eq!(
            order,
            vec![
                ("A".to_string(), 0),
                ("B".to_string(), 1),
                ("C".to_string(), 2)
            ]
        );
    }

    #[tokio::test]
    async fn same_list_move_forward() {
        let db = setup_db().await;
        let (_, l1, _) = make_board(&db).await;
        let a = make_card(&db, l1.id, "A").await;
        make_card(&db, l1.id, "B").await;
        make_card(&db, l1.id, "C").await;

        // [A(0), B(1), C(2)]; move A to 2 -> [B(0), C(1), A(2)]
        Card::move_to(&db, a.id, l1.id, 2).await.unwrap();

        let order = order_of(&db, l1.id).await;
        assert_eq!(
            order,
            vec![
                ("B".to_string(), 0),
                ("C".to_string(), 1),
                ("A".to_string(), 2)
            ]
        );
    }

    #[tokio::test]
    async fn same_list_move_backward() {
        let db = setup_db().await;
        let (_, l1, _) = make_board(&db).await;
        make_card(&db, l1.id, "A").await;
        make_card(&db, l1.id, "B").await;
        let c = make_card(&db, l1.id, "C").await;

        Card::move_to(&db, c.id, l1.id, 0).await.unwrap();

        let order = order_of(&db, l1.id).await;
        assert_eq!(
            order,
            vec![
                ("C".to_string(), 0),
                ("A".to_string(), 1),
                ("B".to_string(), 2)
            ]
        );
    }

    #[tokio::test]
    async fn cross_list_move_shifts_both_lists() {
        let db = setup_db().await;
        let (_, l1, l2) = make_board(&db).await;
        let a = make_card(&db, l1.id, "A").await;
        make_card(&db, l1.id, "B").await;
        make_card(&db, l2.id, "C").await;

        // L1=[A(0),B(1)], L2=[C(0)]; move A -> L2 at 0.
        let moved = Card::move_to(&db, a.id, l2.id, 0).await.unwrap();
        assert_eq!(moved.list_id, l2.id);
        assert_eq!(moved.position, 0);

        assert_eq!(order_of(&db, l1.id).await, vec![("B".to_string(), 0)]);
        assert_eq!(
            order_of(&db, l2.id).await,
            vec![("A".to_string(), 0), ("C".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn noop_move_changes_nothing() {
        let db = setup_db().await;
        let (_, l1, _) = make_board(&db).await;
        make_card(&db, l1.id, "A").await;
        let b = make_card(&db, l1.id, "B").await;
        make_card(&db, l1.id, "C").await;

        let before = order_of(&db, l1.id).await;
        Card::move_to(&db, b.id, l1.id, 1).await.unwrap();
        assert_eq!(order_of(&db, l1.id).await, before);
    }

    #[tokio::test]
    async fn move_roundtrip_restores_original_assignment() {
        let db = setup_db().await;
        let (_, l1, l2) = make_board(&db).await;
        let a = make_card(&db, l1.id, "A").await;
        make_card(&db, l1.id, "B").await;
        make_card(&db, l2.id, "C").await;
        make_card(&db, l2.id, "D").await;

        let l1_before = order_of(&db, l1.id).await;
        let l2_before = order_of(&db, l2.id).await;

        Card::move_to(&db, a.id, l2.id, 1).await.unwrap();
        Card::move_to(&db, a.id, l1.id, a.position).await.unwrap();

        assert_eq!(order_of(&db, l1.id).await, l1_before);
        assert_eq!(order_of(&db, l2.id).await, l2_before);
    }

    #[tokio::test]
    async fn moving_unknown_card_is_not_found_and_touches_nothing() {
        let db = setup_db().await;
        let (_, l1, l2) = make_board(&db).await;
        make_card(&db, l1.id, "A").await;
        make_card(&db, l2.id, "B").await;

        let l1_before = order_of(&db, l1.id).await;
        let l2_before = order_of(&db, l2.id).await;

        let err = Card::move_to(&db, Uuid::new_v4(), l2.id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CardError::NotFound));

        assert_eq!(order_of(&db, l1.id).await, l1_before);
        assert_eq!(order_of(&db, l2.id).await, l2_before);
    }

    #[tokio::test]
    async fn move_rejects_negative_position_and_unknown_list() {
        let db = setup_db().await;
        let (_, l1, _) = make_board(&db).await;
        let a = make_card(&db, l1.id, "A").await;

        let err = Card::move_to(&db, a.id, l1.id, -1).await.unwrap_err();
        assert!(matches!(err, CardError::ValidationError(_)));

        let err = Card::move_to(&db, a.id, Uuid::new_v4(), 0).await.unwrap_err();
        assert!(matches!(err, CardError::ListNotFound));
    }

    #[tokio::test]
    async fn move_target_past_end_is_clamped() {
        let db = setup_db().await;
        let (_, l1, l2) = make_board(&db).await;
        let a = make_card(&db, l1.id, "A").await;
        make_card(&db, l1.id, "B").await;
        make_card(&db, l2.id, "C").await;

        let moved = Card::move_to(&db, a.id, l2.id, 50).await.unwrap();
        assert_eq!(moved.position, 1);

        let order = order_of(&db, l2.id).await;
        assert_dense(&order);
        assert_eq!(
            order,
            vec![("C".to_string(), 0), ("A".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn archive_compacts_remaining_siblings() {
        let db = setup_db().await;
        let (_, l1, _) = make_board(&db).await;
        make_card(&db, l1.id, "A").await;
        let b = make_card(&db, l1.id, "B").await;
        make_card(&db, l1.id, "C").await;
        make_card(&db, l1.id, "D").await;

        Card::archive(&db, b.id).await.unwrap();

        let order = order_of(&db, l1.id).await;
        assert_eq!(
            order,
            vec![
                ("A".to_string(), 0),
                ("C".to_string(), 1),
                ("D".to_string(), 2)
            ]
        );

        // Moving an archived card reads as not found.
        let err = Card::move_to(&db, b.id, l1.id, 0).await.unwrap_err();
        assert!(matches!(err, CardError::NotFound));
    }

    #[tokio::test]
    async fn density_holds_across_mixed_operations() {
        let db = setup_db().await;
        let (_, l1, l2) = make_board(&db).await;

        let a = make_card(&db, l1.id, "A").await;
        let b = make_card(&db, l1.id, "B").await;
        make_card(&db, l1.id, "C").await;
        make_card(&db, l2.id, "D").await;

        Card::move_to(&db, a.id, l2.id, 0).await.unwrap();
        Card::archive(&db, b.id).await.unwrap();
        let e = make_card(&db, l1.id, "E").await;
        Card::move_to(&db, e.id, l2.id, 1).await.unwrap();

        assert_dense(&order_of(&db, l1.id).await);
        assert_dense(&order_of(&db, l2.id).await);
    }
}
