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
    card::{Card, UpdateCard},
    checklist::{Checklist, CreateChecklist},
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::load_card_middleware};

pub async fn get_card(
    Extension(card): Extension<Card>,
    State(_deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Card>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(card)))
}

pub async fn update_card(
    Extension(card): Extension<Card>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateCard>,
) -> Result<ResponseJson<ApiResponse<Card>>, ApiError> {
    let updated = Card::update(&deployment.db().pool, card.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct MoveCardRequest {
    pub destination_list_id: Uuid,
    pub position: i32,
}

pub async fn move_card(
    Extension(card): Extension<Card>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<MoveCardRequest>,
) -> Result<ResponseJson<ApiResponse<Card>>, ApiError> {
    tracing::debug!(
        card_id = %card.id,
        destination = %payload.destination_list_id,
        position = payload.position,
        "Moving card"
    );

    let moved = Card::move_to(
        &deployment.db().pool,
        card.id,
        payload.destination_list_id,
        payload.position,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(moved)))
}

/// Archive, not row deletion.
pub async fn archive_card(
    Extension(card): Extension<Card>,
    State(deployment): State<DeploymentImpl>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<()>>), ApiError> {
    let tx = deployment.db().pool.begin().await?;
    Card::archive(&tx, card.id).await?;
    tx.commit().await?;

    Ok((StatusCode::ACCEPTED, ResponseJson(ApiResponse::success(()))))
}

pub async fn get_checklists(
    Extension(card): Extension<Card>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Checklist>>>, ApiError> {
    let checklists = Checklist::find_by_card_id(&deployment.db().pool, card.id).await?;
    Ok(ResponseJson(ApiResponse::success(checklists)))
}

pub async fn create_checklist(
    Extension(card): Extension<Card>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateChecklist>,
) -> Result<ResponseJson<ApiResponse<Checklist>>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Checklist title is required".to_string(),
        ));
    }

    let id = Uuid::new_v4();
    let tx = deployment.db().pool.begin().await?;
    let checklist = Checklist::create(&tx, card.id, &payload, id).await?;
    tx.commit().await?;

    Ok(ResponseJson(ApiResponse::success(checklist)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let card_id_router = Router::new()
        .route("/", get(get_card).patch(update_card).delete(archive_card))
        .route("/move", patch(move_card))
        .route("/checklists", get(get_checklists).post(create_checklist))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_card_middleware::<DeploymentImpl>,
        ));

    Router::new().nest("/cards/{card_id}", card_id_router)
}
