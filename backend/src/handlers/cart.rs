//! Cart handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::handlers::auth::MessageResponse;
use crate::middleware::CurrentUser;
use crate::services::cart::{CartItemView, EditCartInput};
use crate::services::CartService;
use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuantityResponse {
    pub cart_quantity: i64,
}

pub async fn edit_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<EditCartInput>,
) -> AppResult<Json<CartQuantityResponse>> {
    let cart_quantity = CartService::new(state.db).edit(user.user_id, body).await?;
    Ok(Json(CartQuantityResponse { cart_quantity }))
}

pub async fn get_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<CartItemView>>> {
    Ok(Json(CartService::new(state.db).get(user.user_id).await?))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<MessageResponse>> {
    CartService::new(state.db).clear(user.user_id).await?;
    Ok(MessageResponse::new("Cart cleared"))
}
