//! Product catalog handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::ImageFolder;
use crate::handlers::upload::{store_image, UploadForm};
use crate::middleware::{require_staff, CurrentUser};
use crate::models::{Product, ProductCategory, ProductWithVendor};
use crate::services::catalog::{CreateProductInput, ProductFilter, SearchQuery, UpdateProductInput};
use crate::services::CatalogService;
use crate::AppState;
use shared::types::PaginatedResponse;

fn create_input(form: &UploadForm) -> AppResult<CreateProductInput> {
    Ok(CreateProductInput {
        name: form.require("name")?,
        price: form.require::<Decimal>("price")?,
        description: form.text("description").unwrap_or_default().to_string(),
        sell: form.parse::<bool>("sell")?.unwrap_or(true),
        category: form.require::<ProductCategory>("category")?,
    })
}

fn update_input(form: &UploadForm) -> AppResult<UpdateProductInput> {
    Ok(UpdateProductInput {
        name: form.parse("name")?,
        price: form.parse::<Decimal>("price")?,
        description: form.parse("description")?,
        sell: form.parse::<bool>("sell")?,
        category: form.parse::<ProductCategory>("category")?,
    })
}

/// Multipart: name, price, description, sell, category, optional image
pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Product>)> {
    require_staff(&user)?;
    let mut form = UploadForm::read(multipart).await?;
    let input = create_input(&form)?;
    let image = store_image(&state, ImageFolder::Products, form.take_image()).await?;

    let product = CatalogService::new(state.db)
        .create_product(user.uid, input, image)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Multipart edit; the stored image is kept when none is sent
pub async fn edit_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Json<Product>> {
    require_staff(&user)?;
    let mut form = UploadForm::read(multipart).await?;
    let input = update_input(&form)?;

    let service = CatalogService::new(state.db.clone());
    // Check existence before paying for an upload
    service.get_product(id).await?;
    let image = store_image(&state, ImageFolder::Products, form.take_image()).await?;

    Ok(Json(service.edit_product(&user, id, input, image).await?))
}

pub async fn list_my_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    require_staff(&user)?;
    Ok(Json(
        CatalogService::new(state.db)
            .list_mine(user.uid, &filter)
            .await?,
    ))
}

pub async fn list_all_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<PaginatedResponse<ProductWithVendor>>> {
    require_staff(&user)?;
    Ok(Json(CatalogService::new(state.db).list_all(&filter).await?))
}

pub async fn list_sellable(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ProductWithVendor>>> {
    Ok(Json(CatalogService::new(state.db).list_sellable().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Product>> {
    Ok(Json(CatalogService::new(state.db).get_product(id).await?))
}

pub async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<ProductWithVendor>>> {
    Ok(Json(CatalogService::new(state.db).search(&query).await?))
}

pub async fn store_products(
    State(state): State<AppState>,
    Path(vendor_uid): Path<Uuid>,
) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(
        CatalogService::new(state.db)
            .store_products(vendor_uid)
            .await?,
    ))
}
