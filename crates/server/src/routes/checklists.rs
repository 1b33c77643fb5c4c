use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, patch},
};
use db::TransactionTrait;
use db::models::{
    checklist::{Checklist, UpdateChecklist},
    checklist_item::{ChecklistItem, CreateChecklistItem, UpdateChecklistItem},
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{load_checklist_item_middleware, load_checklist_middleware},
};

pub async fn get_checklist_items(
    Extension(checklist): Extension<Checklist>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<ChecklistItem>>>, ApiError> {
    let items = ChecklistItem::find_by_checklist_id(&deployment.db().pool, checklist.id).await?;
    Ok(ResponseJson(ApiResponse::success(items)))
}

pub async fn update_checklist(
    Extension(checklist): Extension<Checklist>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateChecklist>,
) -> Result<ResponseJson<ApiResponse<Checklist>>, ApiError> {
    let updated = Checklist::update(&deployment.db().pool, checklist.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_checklist(
    Extension(checklist): Extension<Checklist>,
    State(deployment): State<DeploymentImpl>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<()>>), ApiError> {
    let tx = deployment.db().pool.begin().await?;
    Checklist::delete(&tx, checklist.id).await?;
    tx.commit().await?;

    Ok((StatusCode::ACCEPTED, ResponseJson(ApiResponse::success(()))))
}

pub async fn create_item(
    Extension(checklist): Extension<Checklist>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateChecklistItem>,
) -> Result<ResponseJson<ApiResponse<ChecklistItem>>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Item title is required".to_string()));
    }

    let id = Uuid::new_v4();
    let tx = deployment.db().pool.begin().await?;
    let item = ChecklistItem::create(&tx, checklist.id, &payload, id).await?;
    tx.commit().await?;

    Ok(ResponseJson(ApiResponse::success(item)))
}

pub async fn update_item(
    Extension(item): Extension<ChecklistItem>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateChecklistItem>,
) -> Result<ResponseJson<ApiResponse<ChecklistItem>>, ApiError> {
    let updated = ChecklistItem::update(&deployment.db().pool, item.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct MoveItemRequest {
    pub position: i32,
}

pub async fn move_item(
    Extension(item): Extension<ChecklistItem>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<MoveItemRequest>,
) -> Result<ResponseJson<ApiResponse<ChecklistItem>>, ApiError> {
    let tx = deployment.db().pool.begin().await?;
    let moved = ChecklistItem::move_to(&tx, item.id, payload.position).await?;
    tx.commit().await?;

    Ok(ResponseJson(ApiResponse::success(moved)))
}

pub async fn delete_item(
    Extension(item): Extension<ChecklistItem>,
    State(deployment): State<DeploymentImpl>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<()>>), ApiError> {
    let tx = deployment.db().pool.begin().await?;
    ChecklistItem::delete(&tx, item.id).await?;
    tx.commit().await?;

    Ok((StatusCode::ACCEPTED, ResponseJson(ApiResponse::success(()))))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let checklist_id_router = Router::new()
        .route("/", patch(update_checklist).delete(delete_checklist))
        .route("/items", get(get_checklist_items).post(create_item))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_checklist_middleware::<DeploymentImpl>,
        ));

    let item_id_router = Router::new()
        .route("/", patch(update_item).delete(delete_item))
        .route("/move", patch(move_item))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_checklist_item_middleware::<DeploymentImpl>,
        ));

    Router::new()
        .nest("/checklists/{checklist_id}", checklist_id_router)
        .nest("/checklist-items/{item_id}", item_id_router)
}
