use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use db::TransactionTrait;
use db::models::{
    board::{Board, BoardData},
    list::{CreateList, List, ListPosition},
    project::{CreateProject, Project, UpdateProject},
    project_member::{CreateProjectMember, ProjectMember},
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::load_project_middleware};

pub async fn get_projects(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = Project::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn create_project(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Project name is required".to_string()));
    }

    let id = Uuid::new_v4();
    tracing::debug!("Creating project '{}'", payload.name);
    let project = Project::create(&deployment.db().pool, &payload, id).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn get_project(
    Extension(project): Extension<Project>,
    State(_deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn update_project(
    Extension(project): Extension<Project>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let updated = Project::update(&deployment.db().pool, project.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn archive_project(
    Extension(project): Extension<Project>,
    State(deployment): State<DeploymentImpl>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<()>>), ApiError> {
    Project::archive(&deployment.db().pool, project.id).await?;
    Ok((StatusCode::ACCEPTED, ResponseJson(ApiResponse::success(()))))
}

pub async fn get_board(
    Extension(project): Extension<Project>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<BoardData>>, ApiError> {
    let board = Board::find_by_project_id(&deployment.db().pool, project.id)
        .await?
        .ok_or(ApiError::NotFound("Project not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(board)))
}

pub async fn get_members(
    Extension(project): Extension<Project>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectMember>>>, ApiError> {
    let members = ProjectMember::find_by_project_id(&deployment.db().pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

pub async fn add_member(
    Extension(project): Extension<Project>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateProjectMember>,
) -> Result<ResponseJson<ApiResponse<ProjectMember>>, ApiError> {
    if payload.user_name.trim().is_empty() {
        return Err(ApiError::BadRequest("Member name is required".to_string()));
    }
    let member = ProjectMember::add(&deployment.db().pool, project.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(member)))
}

pub async fn remove_member(
    State(deployment): State<DeploymentImpl>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ProjectMember::remove(&deployment.db().pool, project_id, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_list(
    Extension(project): Extension<Project>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateList>,
) -> Result<ResponseJson<ApiResponse<List>>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("List title is required".to_string()));
    }

    let id = Uuid::new_v4();
    // Allocation and insert commit together so concurrent appends serialize.
    let tx = deployment.db().pool.begin().await?;
    let list = List::create(&tx, project.id, &payload, id).await?;
    tx.commit().await?;

    Ok(ResponseJson(ApiResponse::success(list)))
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct ReorderListsRequest {
    pub positions: Vec<ListPosition>,
}

pub async fn reorder_lists(
    Extension(project): Extension<Project>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<ReorderListsRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<List>>>, ApiError> {
    if payload.positions.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one list position is required".to_string(),
        ));
    }

    let tx = deployment.db().pool.begin().await?;
    List::reorder(&tx, project.id, &payload.positions).await?;
    tx.commit().await?;

    let lists = List::find_active_by_project_id(&deployment.db().pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(lists)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let project_id_router = Router::new()
        .route(
            "/",
            get(get_project)
                .patch(update_project)
                .delete(archive_project),
        )
        .route("/board", get(get_board))
        .route("/members", get(get_members).post(add_member))
        .route("/members/{user_id}", delete(remove_member))
        .route("/lists", post(create_list))
        .route("/lists/reorder", put(reorder_lists))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_project_middleware::<DeploymentImpl>,
        ));

    Router::new()
        .route("/projects", get(get_projects).post(create_project))
        .nest("/projects/{project_id}", project_id_router)
}
