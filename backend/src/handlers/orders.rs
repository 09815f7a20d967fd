//! Order handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::{require_admin, require_staff, CurrentUser};
use crate::models::{BuyerOrderView, OrderRow, OrderStatus, StaffOrderView, StatusChangeLogEntry};
use crate::services::order::{
    CreateOrderInput, LineItemStatusResult, OrderFilter, OrderScope, SetLineItemStatusInput,
    SetOrderStatusInput,
};
use crate::services::{OrderService, UserService};
use crate::AppState;
use shared::types::PaginatedResponse;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub status: OrderStatus,
}

/// Place an order from the caller's cart
pub async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateOrderInput>,
) -> AppResult<Json<OrderRow>> {
    Ok(Json(
        OrderService::new(state.db, &state.config.orders)
            .create_order(&user, body)
            .await?,
    ))
}

async fn buyer_orders(
    state: AppState,
    user_id: i64,
    filter: OrderFilter,
    scope: OrderScope,
) -> AppResult<Json<PaginatedResponse<BuyerOrderView>>> {
    Ok(Json(
        OrderService::new(state.db, &state.config.orders)
            .list_buyer_orders(user_id, &filter, scope)
            .await?,
    ))
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<PaginatedResponse<BuyerOrderView>>> {
    buyer_orders(state, user.user_id, filter, OrderScope::Any).await
}

pub async fn list_incomplete_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<PaginatedResponse<BuyerOrderView>>> {
    buyer_orders(state, user.user_id, filter, OrderScope::Incomplete).await
}

pub async fn list_completed_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<PaginatedResponse<BuyerOrderView>>> {
    buyer_orders(state, user.user_id, filter, OrderScope::Completed).await
}

/// Vendor/admin order view
pub async fn list_all_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<PaginatedResponse<StaffOrderView>>> {
    require_staff(&user)?;
    Ok(Json(
        OrderService::new(state.db, &state.config.orders)
            .list_staff_orders(&user, &filter, OrderScope::Any)
            .await?,
    ))
}

pub async fn list_all_completed_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<PaginatedResponse<StaffOrderView>>> {
    require_admin(&user)?;
    Ok(Json(
        OrderService::new(state.db, &state.config.orders)
            .list_staff_orders(&user, &filter, OrderScope::Completed)
            .await?,
    ))
}

pub async fn set_order_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<SetOrderStatusInput>,
) -> AppResult<Json<OrderStatusResponse>> {
    let status = OrderService::new(state.db, &state.config.orders)
        .set_order_status(&user, body)
        .await?;
    Ok(Json(OrderStatusResponse { status }))
}

/// Accept, reject or ship one line item
pub async fn set_line_item_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<SetLineItemStatusInput>,
) -> AppResult<Json<LineItemStatusResult>> {
    require_staff(&user)?;
    let users = UserService::new(state.db.clone());
    let result = OrderService::new(state.db, &state.config.orders)
        .set_line_item_status(&user, &users, &state.order_events, body)
        .await?;
    Ok(Json(result))
}

pub async fn order_status_log(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_number): Path<String>,
) -> AppResult<Json<Vec<StatusChangeLogEntry>>> {
    Ok(Json(
        OrderService::new(state.db, &state.config.orders)
            .status_log(&user, &order_number)
            .await?,
    ))
}
