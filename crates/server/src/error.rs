use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{
        card::CardError, checklist::ChecklistError, checklist_item::ChecklistItemError,
        list::ListError, project::ProjectError, project_member::ProjectMemberError,
    },
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    ProjectMember(#[from] ProjectMemberError),
    #[error(transparent)]
    List(#[from] ListError),
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Checklist(#[from] ChecklistError),
    #[error(transparent)]
    ChecklistItem(#[from] ChecklistItemError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Project(err) => match err {
                ProjectError::ProjectNotFound => (StatusCode::NOT_FOUND, "ProjectError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ProjectError"),
            },
            ApiError::ProjectMember(err) => match err {
                ProjectMemberError::ProjectNotFound | ProjectMemberError::NotFound => {
                    (StatusCode::NOT_FOUND, "ProjectMemberError")
                }
                ProjectMemberError::AlreadyMember => (StatusCode::CONFLICT, "ProjectMemberError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ProjectMemberError"),
            },
            ApiError::List(err) => match err {
                ListError::NotFound | ListError::ProjectNotFound => {
                    (StatusCode::NOT_FOUND, "ListError")
                }
                ListError::ValidationError(_) => (StatusCode::BAD_REQUEST, "ListError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ListError"),
            },
            ApiError::Card(err) => match err {
                CardError::NotFound | CardError::ListNotFound => {
                    (StatusCode::NOT_FOUND, "CardError")
                }
                CardError::ValidationError(_) => (StatusCode::BAD_REQUEST, "CardError"),
                CardError::MoveConflict => (StatusCode::CONFLICT, "CardError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "CardError"),
            },
            ApiError::Checklist(err) => match err {
                ChecklistError::NotFound | ChecklistError::CardNotFound => {
                    (StatusCode::NOT_FOUND, "ChecklistError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ChecklistError"),
            },
            ApiError::ChecklistItem(err) => match err {
                ChecklistItemError::NotFound | ChecklistItemError::ChecklistNotFound => {
                    (StatusCode::NOT_FOUND, "ChecklistItemError")
                }
                ChecklistItemError::ValidationError(_) => {
                    (StatusCode::BAD_REQUEST, "ChecklistItemError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ChecklistItemError"),
            },
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "ForbiddenError"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        let error_message = match &self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Internal(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
