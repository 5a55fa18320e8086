use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::account::dto::{
    ChangePasswordRequest, LoginRequest, LoginResponse, PublicProfile, RegisterRequest,
    ResetPasswordRequest, SendResetRequest, SuccessResponse, UpdateProfileRequest,
};
use crate::account::extractors::{MaybeSession, SessionContext};
use crate::account::service;
use crate::error::ApiError;
use crate::state::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/send-reset-password", post(send_reset_password))
        .route("/reset-password", post(reset_password))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(get_user))
        .route("/update", put(update))
        .route("/change-password", post(change_password))
        .route("/delete", delete(delete_account))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicProfile>), ApiError> {
    let profile = service::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (token, user) = service::login(&state, payload).await?;
    Ok(Json(LoginResponse { token, user }))
}

#[instrument(skip(state, session))]
async fn logout(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Result<Json<SuccessResponse>, ApiError> {
    service::logout(&state, session.map(|ctx| ctx.session)).await?;
    Ok(Json(SuccessResponse {
        success_msg: "User logged out successfully",
    }))
}

#[instrument(skip(state, ctx))]
async fn get_user(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<PublicProfile>, ApiError> {
    let profile = service::public_profile(&state, &ctx.account).await?;
    Ok(Json(profile))
}

#[instrument(skip(state, ctx, payload))]
async fn update(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicProfile>, ApiError> {
    let profile = service::update_profile(&state, ctx.account, payload).await?;
    Ok(Json(profile))
}

#[instrument(skip(state, ctx, payload))]
async fn change_password(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    service::change_password(&state, &ctx, payload).await?;
    Ok(Json(SuccessResponse {
        success_msg: "Password updated successfully",
    }))
}

#[instrument(skip(state, payload))]
async fn send_reset_password(
    State(state): State<AppState>,
    Json(payload): Json<SendResetRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    service::send_reset(&state, payload).await?;
    Ok(Json(SuccessResponse {
        success_msg: "Password reset email sent successfully",
    }))
}

#[instrument(skip(state, payload))]
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    service::reset_password(&state, payload).await?;
    Ok(Json(SuccessResponse {
        success_msg: "Password has been reset",
    }))
}

#[instrument(skip(state, ctx))]
async fn delete_account(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<SuccessResponse>, ApiError> {
    service::delete_account(&state, ctx).await?;
    Ok(Json(SuccessResponse {
        success_msg: "Account deleted",
    }))
}
