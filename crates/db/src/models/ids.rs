use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::{card, checklist, checklist_item, list, project};

pub async fn project_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    project::Entity::find()
        .select_only()
        .column(project::Column::Id)
        .filter(project::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn project_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    project::Entity::find()
        .select_only()
        .column(project::Column::Uuid)
        .filter(project::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn list_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    list::Entity::find()
        .select_only()
        .column(list::Column::Id)
        .filter(list::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn list_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    list::Entity::find()
        .select_only()
        .column(list::Column::Uuid)
        .filter(list::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn card_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    card::Entity::find()
        .select_only()
        .column(card::Column::Id)
        .filter(card::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn card_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    card::Entity::find()
        .select_only()
        .column(card::Column::Uuid)
        .filter(card::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn checklist_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    checklist::Entity::find()
        .select_only()
        .column(checklist::Column::Id)
        .filter(checklist::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn checklist_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    checklist::Entity::find()
        .select_only()
        .column(checklist::Column::Uuid)
        .filter(checklist::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn checklist_item_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    checklist_item::Entity::find()
        .select_only()
        .column(checklist_item::Column::Id)
        .filter(checklist_item::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}
