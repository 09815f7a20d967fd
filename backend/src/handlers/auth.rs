//! Account, session and verification handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{BearerToken, CurrentUser};
use crate::models::UserProfile;
use crate::services::auth::{AuthToken, LoginResponse, RegisterInput};
use crate::services::user::{MeResponse, ResetPasswordByAccountInput, UpdateMeInput, UserSummary};
use crate::services::{AuthService, UserService, VerificationService};
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub account: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneRequest {
    pub phone_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPhoneRequest {
    pub account: String,
    pub phone_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
    pub phone_number: String,
    pub code: String,
}

/// Plain acknowledgement body
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

fn verification_service(state: &AppState) -> VerificationService {
    VerificationService::new(
        state.db.clone(),
        state.sms.clone(),
        &state.config.verification,
    )
}

/// Register endpoint handler
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let user = auth_service.register(body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let response = auth_service.login(&body.account, &body.password).await?;
    Ok(Json(response))
}

pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    BearerToken(token): BearerToken,
) -> AppResult<Json<MessageResponse>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    auth_service.logout(user.user_id, &token).await?;
    Ok(MessageResponse::new("Logged out"))
}

pub async fn extend(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    BearerToken(token): BearerToken,
) -> AppResult<Json<AuthToken>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let token = auth_service
        .extend(user.user_id, user.uid, user.role, &token)
        .await?;
    Ok(Json(token))
}

pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<MeResponse>> {
    Ok(Json(UserService::new(state.db).me(user.user_id).await?))
}

pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<UpdateMeInput>,
) -> AppResult<Json<UserProfile>> {
    let profile = UserService::new(state.db).update_me(user.user_id, body).await?;
    Ok(Json(profile))
}

pub async fn update_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<UpdatePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    UserService::new(state.db)
        .update_password(user.user_id, &body.current_password, &body.new_password)
        .await?;
    Ok(MessageResponse::new("Password updated"))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordByAccountInput>,
) -> AppResult<Json<MessageResponse>> {
    let verification = verification_service(&state);
    UserService::new(state.db)
        .reset_password_by_account(&verification, body)
        .await?;
    Ok(MessageResponse::new("Password reset"))
}

pub async fn user_by_uid(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> AppResult<Json<UserSummary>> {
    Ok(Json(UserService::new(state.db).user_by_uid(uid).await?))
}

pub async fn send_verification_code(
    State(state): State<AppState>,
    Json(body): Json<PhoneRequest>,
) -> AppResult<Json<MessageResponse>> {
    verification_service(&state)
        .send_code(&body.phone_number)
        .await?;
    Ok(MessageResponse::new("Verification code sent"))
}

pub async fn verify_account_and_phone(
    State(state): State<AppState>,
    Json(body): Json<AccountPhoneRequest>,
) -> AppResult<Json<MessageResponse>> {
    verification_service(&state)
        .verify_account_and_phone(&body.account, &body.phone_number)
        .await?;
    Ok(MessageResponse::new("Verification code sent"))
}

pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeRequest>,
) -> AppResult<Json<MessageResponse>> {
    verification_service(&state)
        .verify_code(&body.phone_number, &body.code)
        .await?;
    Ok(MessageResponse::new("Verification code is correct"))
}
