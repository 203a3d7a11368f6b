use axum::{extract::State, http::StatusCode, Json};

use crate::common::AppError;
use crate::domains::auth::actions::{self, AuthResponse, LoginInput, RegisterInput};
use crate::server::app::AppState;

pub async fn login_handler(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = actions::login(&state.deps, input).await?;
    Ok(Json(response))
}

pub async fn register_handler(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let response = actions::register(&state.deps, input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn onboard_handler(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let response = actions::onboard(&state.deps, input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
