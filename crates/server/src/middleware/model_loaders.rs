use std::{fmt::Display, future::Future};

use axum::{
    extract::{RawPathParams, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use db::{
    DBService,
    models::{
        card::Card, checklist::Checklist, checklist_item::ChecklistItem, list::List,
        project::Project,
    },
};
use deployment::Deployment;
use uuid::Uuid;

pub trait ModelLoaderDeps {
    fn db_service(&self) -> &DBService;
}

impl<D> ModelLoaderDeps for D
where
    D: Deployment,
{
    fn db_service(&self) -> &DBService {
        self.db()
    }
}

/// Loaders are keyed by path-param name so routes with more than one id
/// (e.g. `/projects/{project_id}/members/{user_id}`) still resolve.
fn path_uuid(params: &RawPathParams, name: &str) -> Result<Uuid, StatusCode> {
    let raw = params
        .iter()
        .find_map(|(key, value)| (key == name).then_some(value))
        .ok_or(StatusCode::BAD_REQUEST)?;
    Uuid::parse_str(raw).map_err(|_| StatusCode::BAD_REQUEST)
}

async fn fetch_model_or_status<M, E, Fut>(
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<M, StatusCode>
where
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    match load_future.await {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            tracing::warn!("{model_name} {model_id} not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(error) => {
            tracing::error!("Failed to fetch {model_name} {model_id}: {error}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn load_request_extension<M, E, Fut>(
    request: Request,
    next: Next,
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<Response, StatusCode>
where
    M: Clone + Send + Sync + 'static,
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    let model = fetch_model_or_status(model_name, model_id, load_future).await?;
    let mut request = request;
    request.extensions_mut().insert(model);
    Ok(next.run(request).await)
}

pub async fn load_project_middleware<S>(
    State(deployment): State<S>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    let project_id = path_uuid(&params, "project_id")?;
    load_request_extension(
        request,
        next,
        "Project",
        project_id,
        Project::find_by_id(&deployment.db_service().pool, project_id),
    )
    .await
}

pub async fn load_list_middleware<S>(
    State(deployment): State<S>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    let list_id = path_uuid(&params, "list_id")?;
    load_request_extension(
        request,
        next,
        "List",
        list_id,
        List::find_by_id(&deployment.db_service().pool, list_id),
    )
    .await
}

pub async fn load_card_middleware<S>(
    State(deployment): State<S>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    let card_id = path_uuid(&params, "card_id")?;
    load_request_extension(
        request,
        next,
        "Card",
        card_id,
        Card::find_by_id(&deployment.db_service().pool, card_id),
    )
    .await
}

pub async fn load_checklist_middleware<S>(
    State(deployment): State<S>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    let checklist_id = path_uuid(&params, "checklist_id")?;
    load_request_extension(
        request,
        next,
        "Checklist",
        checklist_id,
        Checklist::find_by_id(&deployment.db_service().pool, checklist_id),
    )
    .await
}

pub async fn load_checklist_item_middleware<S>(
    State(deployment): State<S>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    let item_id = path_uuid(&params, "item_id")?;
    load_request_extension(
        request,
        next,
        "ChecklistItem",
        item_id,
        ChecklistItem::find_by_id(&deployment.db_service().pool, item_id),
    )
    .await
}
