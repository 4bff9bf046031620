use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument};

use super::dto::{CreateProfileRequest, CreateProfileResponse};
use super::repo_types::ProfileAction;
use crate::body::json_body;
use crate::cors::{cors_headers, method_not_allowed, preflight};
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/user-profile",
        post(create).options(preflight).fallback(method_not_allowed),
    )
}

/// POST /user-profile
#[instrument(skip(state, body))]
pub async fn create(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let req: CreateProfileRequest = json_body(&body)?;
    let (user_id, email) = req.validate()?;

    let action = state
        .profiles
        .create_profile(&user_id, email.as_deref())
        .await
        .map_err(ApiError::internal)?;
    info!(%user_id, ?action, "profile create handled");

    let status = match action {
        ProfileAction::Created => StatusCode::CREATED,
        ProfileAction::Existing => StatusCode::OK,
    };
    let res = CreateProfileResponse::new(user_id, action);
    Ok((status, cors_headers(), Json(res)).into_response())
}
