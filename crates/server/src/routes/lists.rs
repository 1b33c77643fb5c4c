use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::TransactionTrait;
use db::models::{
    card::{Card, CreateCard},
    list::{List, UpdateList},
};
use deployment::Deployment;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::load_list_middleware};

pub async fn get_list(
    Extension(list): Extension<List>,
    State(_deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<List>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(list)))
}

pub async fn update_list(
    Extension(list): Extension<List>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateList>,
) -> Result<ResponseJson<ApiResponse<List>>, ApiError> {
    let updated = List::update(&deployment.db().pool, list.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// Archive, not row deletion: the list's cards go with it and the remaining
/// active lists compact their positions.
pub async fn archive_list(
    Extension(list): Extension<List>,
    State(deployment): State<DeploymentImpl>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<()>>), ApiError> {
    let tx = deployment.db().pool.begin().await?;
    List::archive(&tx, list.id).await?;
    tx.commit().await?;

    Ok((StatusCode::ACCEPTED, ResponseJson(ApiResponse::success(()))))
}

pub async fn get_cards(
    Extension(list): Extension<List>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Card>>>, ApiError> {
    let cards = Card::find_active_by_list_id(&deployment.db().pool, list.id).await?;
    Ok(ResponseJson(ApiResponse::success(cards)))
}

pub async fn create_card(
    Extension(list): Extension<List>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateCard>,
) -> Result<ResponseJson<ApiResponse<Card>>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Card title is required".to_string()));
    }

    let id = Uuid::new_v4();
    tracing::debug!("Creating card '{}' in list {}", payload.title, list.id);

    // Allocation and insert commit together so concurrent appends serialize.
    let tx = deployment.db().pool.begin().await?;
    let card = Card::create(&tx, list.id, &payload, id).await?;
    tx.commit().await?;

    Ok(ResponseJson(ApiResponse::success(card)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let list_id_router = Router::new()
        .route("/", get(get_list).patch(update_list).delete(archive_list))
        .route("/cards", get(get_cards).post(create_card))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_list_middleware::<DeploymentImpl>,
        ));

    Router::new().nest("/lists/{list_id}", list_id_router)
}
