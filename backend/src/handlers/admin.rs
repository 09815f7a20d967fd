//! Admin handlers: users, vendor approval and the carousel

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::ImageFolder;
use crate::handlers::auth::MessageResponse;
use crate::handlers::upload::UploadForm;
use crate::middleware::{require_admin, require_staff, CurrentUser};
use crate::models::UserProfile;
use crate::services::store::{CarouselImage, CarouselSettings};
use crate::services::user::AdminUpdateUserInput;
use crate::services::{StoreService, UserService};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetUserPasswordRequest {
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct RejectVendorRequest {
    pub reason: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<UserProfile>>> {
    require_admin(&user)?;
    Ok(Json(UserService::new(state.db).list_users().await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(uid): Path<Uuid>,
    Json(body): Json<AdminUpdateUserInput>,
) -> AppResult<Json<UserProfile>> {
    require_admin(&user)?;
    Ok(Json(
        UserService::new(state.db).admin_update_user(uid, body).await?,
    ))
}

pub async fn reset_user_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(uid): Path<Uuid>,
    Json(body): Json<ResetUserPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    require_admin(&user)?;
    UserService::new(state.db)
        .admin_reset_password(uid, &body.new_password)
        .await?;
    Ok(MessageResponse::new("Password reset"))
}

pub async fn pending_vendors(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<UserProfile>>> {
    require_admin(&user)?;
    Ok(Json(UserService::new(state.db).pending_vendors().await?))
}

pub async fn approve_vendor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(uid): Path<Uuid>,
) -> AppResult<Json<UserProfile>> {
    require_admin(&user)?;
    Ok(Json(UserService::new(state.db).approve_vendor(uid).await?))
}

pub async fn reject_vendor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(uid): Path<Uuid>,
    Json(body): Json<RejectVendorRequest>,
) -> AppResult<Json<UserProfile>> {
    require_admin(&user)?;
    Ok(Json(
        UserService::new(state.db)
            .reject_vendor(uid, body.reason)
            .await?,
    ))
}

pub async fn upload_carousel_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<CarouselImage>)> {
    require_staff(&user)?;
    let mut form = UploadForm::read(multipart).await?;
    let image = form.require_image()?;
    let url = state.image_host.upload(ImageFolder::Carousel, &image).await?;

    let image = StoreService::new(state.db).add_carousel_image(&url).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn delete_carousel_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    require_staff(&user)?;
    StoreService::new(state.db).delete_carousel_image(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_carousel_settings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CarouselSettings>,
) -> AppResult<Json<CarouselSettings>> {
    require_staff(&user)?;
    Ok(Json(
        StoreService::new(state.db)
            .update_carousel_settings(body)
            .await?,
    ))
}
