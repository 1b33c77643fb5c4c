use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

pub use crate::types::ProjectVisibility;

use crate::{
    entities::project,
    events::{
        EVENT_PROJECT_ARCHIVED, EVENT_PROJECT_CREATED, EVENT_PROJECT_UPDATED, ProjectEventPayload,
    },
    models::{event_outbox::EventOutbox, project_member::ProjectMember},
};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    ProjectNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub owner_user_id: Uuid,
    pub visibility: ProjectVisibility,
    pub archived: bool,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateProject {
    pub name: String,
    pub owner_user_id: Uuid,
    pub visibility: Option<ProjectVisibility>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub visibility: Option<ProjectVisibility>,
}

impl Project {
    fn from_model(model: project::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            owner_user_id: model.owner_user_id,
            visibility: model.visibility,
            archived: model.archived,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let records = project::Entity::find()
            .filter(project::Column::Archived.eq(false))
            .order_by_desc(project::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateProject,
        project_id: Uuid,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = project::ActiveModel {
            uuid: Set(project_id),
            name: Set(data.name.clone()),
            owner_user_id: Set(data.owner_user_id),
            visibility: Set(data.visibility.unwrap_or_default()),
            archived: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        let payload = serde_json::to_value(ProjectEventPayload { project_id })
            .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_PROJECT_CREATED, "project", project_id, payload).await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateProject,
    ) -> Result<Self, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let mut active: project::ActiveModel = record.into();
        if let Some(name) = data.name.clone() {
            active.name = Set(name);
        }
        if let Some(visibility) = data.visibility {
            active.visibility = Set(visibility);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        let payload = serde_json::to_value(ProjectEventPayload { project_id: id })
            .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_PROJECT_UPDATED, "project", id, payload).await?;
        Ok(Self::from_model(updated))
    }

    /// Soft delete. The project and everything under it stays in storage;
    /// active views and room joins stop seeing it.
    pub async fn archive<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let mut active: project::ActiveModel = record.into();
        active.archived = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        let payload = serde_json::to_value(ProjectEventPayload { project_id: id })
            .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_PROJECT_ARCHIVED, "project", id, payload).await?;
        Ok(())
    }

    /// Room join gate: the owner, any member, or anyone when the project is
    /// public. Archived projects accept nobody.
    pub async fn is_accessible_by<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
    ) -> Result<bool, DbErr> {
        if self.archived {
            return Ok(false);
        }
        if self.owner_user_id == user_id || self.visibility == ProjectVisibility::Public {
            return Ok(true);
        }
        ProjectMember::is_member(db, self.id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::project_member::CreateProjectMember;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn make_project(
        db: &sea_orm::DatabaseConnection,
        owner: Uuid,
        visibility: ProjectVisibility,
    ) -> Project {
        Project::create(
            db,
            &CreateProject {
                name: "Board".to_string(),
                owner_user_id: owner,
                visibility: Some(visibility),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn archive_hides_project_from_listing() {
        let db = setup_db().await;
        let project = make_project(&db, Uuid::new_v4(), ProjectVisibility::Private).await;

        assert_eq!(Project::find_all(&db).await.unwrap().len(), 1);
        Project::archive(&db, project.id).await.unwrap();
        assert!(Project::find_all(&db).await.unwrap().is_empty());

        let archived = Project::find_by_id(&db, project.id)
            .await
            .unwrap()
            .expect("archived project still exists");
        assert!(archived.archived);
    }

    #[tokio::test]
    async fn access_gate_owner_member_public() {
        let db = setup_db().await;
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let private = make_project(&db, owner, ProjectVisibility::Private).await;
        ProjectMember::add(
            &db,
            private.id,
            &CreateProjectMember {
                user_id: member,
                user_name: "Member".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(private.is_accessible_by(&db, owner).await.unwrap());
        assert!(private.is_accessible_by(&db, member).await.unwrap());
        assert!(!private.is_accessible_by(&db, stranger).await.unwrap());

        let public = make_project(&db, owner, ProjectVisibility::Public).await;
        assert!(public.is_accessible_by(&db, stranger).await.unwrap());
    }

    #[tokio::test]
    async fn archived_project_rejects_everyone() {
        let db = setup_db().await;
        let owner = Uuid::new_v4();
        let project = make_project(&db, owner, ProjectVisibility::Public).await;
        Project::archive(&db, project.id).await.unwrap();

        let archived = Project::find_by_id(&db, project.id).await.unwrap().unwrap();
        assert!(!archived.is_accessible_by(&db, owner).await.unwrap());
    }
}
