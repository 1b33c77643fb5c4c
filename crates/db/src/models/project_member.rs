use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::project_member, models::ids};

#[derive(Debug, Error)]
pub enum ProjectMemberError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    ProjectNotFound,
    #[error("User is already a member of this project")]
    AlreadyMember,
    #[error("Member not found")]
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateProjectMember {
    pub user_id: Uuid,
    pub user_name: String,
}

impl ProjectMember {
    fn from_model(model: project_member::Model, project_id: Uuid) -> Self {
        Self {
            id: model.uuid,
            project_id,
            user_id: model.user_id,
            user_name: model.user_name,
            created_at: model.created_at,
        }
    }

    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, ProjectMemberError> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(ProjectMemberError::ProjectNotFound)?;

        let models = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .order_by_asc(project_member::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(models
            .into_iter()
            .map(|model| Self::from_model(model, project_id))
            .collect())
    }

    pub async fn is_member<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DbErr> {
        let Some(project_row_id) = ids::project_id_by_uuid(db, project_id).await? else {
            return Ok(false);
        };

        let count = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .filter(project_member::Column::UserId.eq(user_id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn add<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        data: &CreateProjectMember,
    ) -> Result<Self, ProjectMemberError> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(ProjectMemberError::ProjectNotFound)?;

        let existing = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .filter(project_member::Column::UserId.eq(data.user_id))
            .count(db)
            .await?;
        if existing > 0 {
            return Err(ProjectMemberError::AlreadyMember);
        }

        let active = project_member::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            project_id: Set(project_row_id),
            user_id: Set(data.user_id),
            user_name: Set(data.user_name.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(model, project_id))
    }

    pub async fn remove<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ProjectMemberError> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(ProjectMemberError::ProjectNotFound)?;

        let result = project_member::Entity::delete_many()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .filter(project_member::Column::UserId.eq(user_id))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ProjectMemberError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::{
        models::project::{CreateProject, Project},
        types::ProjectVisibility,
    };

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn add_duplicate_and_remove_members() {
        let db = setup_db().await;
        let project = Project::create(
            &db,
            &CreateProject {
                name: "Board".to_string(),
                owner_user_id: Uuid::new_v4(),
                visibility: Some(ProjectVisibility::Private),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let user_id = Uuid::new_v4();
        let member = ProjectMember::add(
            &db,
            project.id,
            &CreateProjectMember {
                user_id,
                user_name: "Ada".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(member.user_id, user_id);
        assert!(ProjectMember::is_member(&db, project.id, user_id)
            .await
            .unwrap());

        let duplicate = ProjectMember::add(
            &db,
            project.id,
            &CreateProjectMember {
                user_id,
                user_name: "Ada".to_string(),
            },
        )
        .await;
        assert!(matches!(duplicate, Err(ProjectMemberError::AlreadyMember)));

        let members = ProjectMember::find_by_project_id(&db, project.id)
            .await
            .unwrap();
        assert_eq!(members.len(), 1);

        ProjectMember::remove(&db, project.id, user_id).await.unwrap();
        assert!(!ProjectMember::is_member(&db, project.id, user_id)
            .await
            .unwrap());

        let missing = ProjectMember::remove(&db, project.id, user_id).await;
        assert!(matches!(missing, Err(ProjectMemberError::NotFound)));
    }
}
