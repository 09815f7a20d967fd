//! Storefront and carousel handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::ImageFolder;
use crate::handlers::upload::UploadForm;
use crate::middleware::{require_staff, CurrentUser};
use crate::models::StoreProfile;
use crate::services::store::{
    CarouselImage, CarouselSettings, StoreDetailsInput, StoreImage, StoreInfo, StoreSummary,
};
use crate::services::StoreService;
use crate::AppState;

#[derive(Deserialize)]
pub struct StoreSearchQuery {
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct ImageUrlResponse {
    pub url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningHoursResponse {
    pub opening_hours: Option<String>,
}

async fn upload_store_image(
    state: AppState,
    user_id: i64,
    multipart: Multipart,
    which: StoreImage,
) -> AppResult<Json<ImageUrlResponse>> {
    let folder = match which {
        StoreImage::Banner => ImageFolder::StoreBanner,
        StoreImage::Cover => ImageFolder::StoreCover,
    };

    let mut form = UploadForm::read(multipart).await?;
    let image = form.require_image()?;
    let url = state.image_host.upload(folder, &image).await?;

    StoreService::new(state.db)
        .set_image(user_id, which, &url)
        .await?;
    Ok(Json(ImageUrlResponse { url }))
}

pub async fn upload_banner(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<ImageUrlResponse>> {
    require_staff(&user)?;
    upload_store_image(state, user.user_id, multipart, StoreImage::Banner).await
}

pub async fn upload_cover(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<ImageUrlResponse>> {
    require_staff(&user)?;
    upload_store_image(state, user.user_id, multipart, StoreImage::Cover).await
}

pub async fn my_store_images(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<StoreProfile>> {
    require_staff(&user)?;
    Ok(Json(StoreService::new(state.db).my_profile(user.user_id).await?))
}

pub async fn update_store_details(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<StoreDetailsInput>,
) -> AppResult<Json<StoreProfile>> {
    require_staff(&user)?;
    Ok(Json(
        StoreService::new(state.db)
            .update_details(user.user_id, body)
            .await?,
    ))
}

pub async fn list_stores(State(state): State<AppState>) -> AppResult<Json<Vec<StoreSummary>>> {
    Ok(Json(StoreService::new(state.db).list_stores(None).await?))
}

pub async fn search_stores(
    State(state): State<AppState>,
    Query(query): Query<StoreSearchQuery>,
) -> AppResult<Json<Vec<StoreSummary>>> {
    Ok(Json(
        StoreService::new(state.db)
            .list_stores(query.q.as_deref())
            .await?,
    ))
}

pub async fn store_info(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> AppResult<Json<StoreInfo>> {
    Ok(Json(StoreService::new(state.db).store_info(uid).await?))
}

pub async fn opening_hours(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> AppResult<Json<OpeningHoursResponse>> {
    let opening_hours = StoreService::new(state.db).opening_hours(uid).await?;
    Ok(Json(OpeningHoursResponse { opening_hours }))
}

pub async fn carousel_images(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CarouselImage>>> {
    Ok(Json(StoreService::new(state.db).carousel_images().await?))
}

pub async fn carousel_settings(
    State(state): State<AppState>,
) -> AppResult<Json<CarouselSettings>> {
    Ok(Json(StoreService::new(state.db).carousel_settings().await?))
}
