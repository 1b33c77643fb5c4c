use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Projects::Table)
                    .col(pk_id_col(manager, Projects::Id))
                    .col(uuid_col(Projects::Uuid))
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(uuid_col(Projects::OwnerUserId))
                    .col(
                        ColumnDef::new(Projects::Visibility)
                            .string_len(16)
                            .not_null()
                            .default(Expr::val("private")),
                    )
                    .col(bool_col(Projects::Archived))
                    .col(timestamp_col(Projects::CreatedAt))
                    .col(timestamp_col(Projects::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_projects_uuid")
                    .table(Projects::Table)
                    .col(Projects::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ProjectMembers::Table)
                    .col(pk_id_col(manager, ProjectMembers::Id))
                    .col(uuid_col(ProjectMembers::Uuid))
                    .col(fk_id_col(manager, ProjectMembers::ProjectId))
                    .col(uuid_col(ProjectMembers::UserId))
                    .col(ColumnDef::new(ProjectMembers::UserName).string().not_null())
                    .col(timestamp_col(ProjectMembers::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_members_project_id")
                            .from(ProjectMembers::Table, ProjectMembers::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_project_members_uuid")
                    .table(ProjectMembers::Table)
                    .col(ProjectMembers::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_project_members_project_user")
                    .table(ProjectMembers::Table)
                    .col(ProjectMembers::ProjectId)
                    .col(ProjectMembers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Lists::Table)
                    .col(pk_id_col(manager, Lists::Id))
                    .col(uuid_col(Lists::Uuid))
                    .col(fk_id_col(manager, Lists::ProjectId))
                    .col(ColumnDef::new(Lists::Title).string().not_null())
                    .col(position_col(Lists::Position))
                    .col(bool_col(Lists::Archived))
                    .col(timestamp_col(Lists::CreatedAt))
                    .col(timestamp_col(Lists::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lists_project_id")
                            .from(Lists::Table, Lists::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_lists_uuid")
                    .table(Lists::Table)
                    .col(Lists::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_lists_project_position")
                    .table(Lists::Table)
                    .col(Lists::ProjectId)
                    .col(Lists::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Cards::Table)
                    .col(pk_id_col(manager, Cards::Id))
                    .col(uuid_col(Cards::Uuid))
                    .col(fk_id_col(manager, Cards::ListId))
                    .col(ColumnDef::new(Cards::Title).string().not_null())
                    .col(ColumnDef::new(Cards::Description).text())
                    .col(position_col(Cards::Position))
                    .col(bool_col(Cards::Archived))
                    .col(bool_col(Cards::Completed))
                    .col(ColumnDef::new(Cards::DueDate).timestamp())
                    .col(uuid_nullable_col(Cards::ContentId))
                    .col(
                        ColumnDef::new(Cards::Version)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(timestamp_col(Cards::CreatedAt))
                    .col(timestamp_col(Cards::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cards_list_id")
                            .from(Cards::Table, Cards::ListId)
                            .to(Lists::Table, Lists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_cards_uuid")
                    .table(Cards::Table)
                    .col(Cards::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_cards_list_position")
                    .table(Cards::Table)
                    .col(Cards::ListId)
                    .col(Cards::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Checklists::Table)
                    .col(pk_id_col(manager, Checklists::Id))
                    .col(uuid_col(Checklists::Uuid))
                    .col(fk_id_col(manager, Checklists::CardId))
                    .col(ColumnDef::new(Checklists::Title).string().not_null())
                    .col(position_col(Checklists::Position))
                    .col(timestamp_col(Checklists::CreatedAt))
                    .col(timestamp_col(Checklists::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checklists_card_id")
                            .from(Checklists::Table, Checklists::CardId)
                            .to(Cards::Table, Cards::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_checklists_uuid")
                    .table(Checklists::Table)
                    .col(Checklists::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ChecklistItems::Table)
                    .col(pk_id_col(manager, ChecklistItems::Id))
                    .col(uuid_col(ChecklistItems::Uuid))
                    .col(fk_id_col(manager, ChecklistItems::ChecklistId))
                    .col(ColumnDef::new(ChecklistItems::Title).string().not_null())
                    .col(bool_col(ChecklistItems::Completed))
                    .col(position_col(ChecklistItems::Position))
                    .col(timestamp_col(ChecklistItems::CreatedAt))
                    .col(timestamp_col(ChecklistItems::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checklist_items_checklist_id")
                            .from(ChecklistItems::Table, ChecklistItems::ChecklistId)
                            .to(Checklists::Table, Checklists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_checklist_items_uuid")
                    .table(ChecklistItems::Table)
                    .col(ChecklistItems::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(EventOutbox::Table)
                    .col(pk_id_col(manager, EventOutbox::Id))
                    .col(uuid_col(EventOutbox::Uuid))
                    .col(ColumnDef::new(EventOutbox::EventType).string().not_null())
                    .col(ColumnDef::new(EventOutbox::EntityType).string().not_null())
                    .col(uuid_col(EventOutbox::EntityUuid))
                    .col(ColumnDef::new(EventOutbox::Payload).json().not_null())
                    .col(timestamp_col(EventOutbox::CreatedAt))
                    .col(ColumnDef::new(EventOutbox::PublishedAt).timestamp())
                    .col(
                        ColumnDef::new(EventOutbox::Attempts)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(ColumnDef::new(EventOutbox::LastError).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_event_outbox_published_at")
                    .table(EventOutbox::Table)
                    .col(EventOutbox::PublishedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventOutbox::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChecklistItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Checklists::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Lists::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn uuid_nullable_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().to_owned()
}

fn position_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .default(Expr::val(0))
        .to_owned()
}

fn bool_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .boolean()
        .not_null()
        .default(Expr::val(false))
        .to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    Uuid,
    Name,
    OwnerUserId,
    Visibility,
    Archived,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ProjectMembers {
    Table,
    Id,
    Uuid,
    ProjectId,
    UserId,
    UserName,
    CreatedAt,
}

#[derive(Iden)]
enum Lists {
    Table,
    Id,
    Uuid,
    ProjectId,
    Title,
    Position,
    Archived,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Cards {
    Table,
    Id,
    Uuid,
    ListId,
    Title,
    Description,
    Position,
    Archived,
    Completed,
    DueDate,
    ContentId,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Checklists {
    Table,
    Id,
    Uuid,
    CardId,
    Title,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ChecklistItems {
    Table,
    Id,
    Uuid,
    ChecklistId,
    Title,
    Completed,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum EventOutbox {
    Table,
    Id,
    Uuid,
    EventType,
    EntityType,
    EntityUuid,
    Payload,
    CreatedAt,
    PublishedAt,
    Attempts,
    LastError,
}
