//! Route definitions for the group-order marketplace

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::{
    handlers,
    middleware::{auth_middleware, session_middleware},
    AppState,
};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes(state.clone()))
        .nest("/products", product_routes(state.clone()))
        .nest("/orders", order_routes(state))
}

/// Account, storefront and site-content routes
fn user_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/send-verification-code", post(handlers::send_verification_code))
        .route("/verify-account-and-phone", post(handlers::verify_account_and_phone))
        .route("/verify-code", post(handlers::verify_code))
        .route("/reset-password-by-account", post(handlers::reset_password))
        .route("/stores", get(handlers::list_stores))
        .route("/stores/search", get(handlers::search_stores))
        .route("/store/:uid", get(handlers::store_info))
        .route("/carousel-images", get(handlers::carousel_images))
        .route("/carousel-settings", get(handlers::carousel_settings));

    // Expired tokens are still accepted here
    let session = Router::new()
        .route("/logout", delete(handlers::logout))
        .route("/extend", patch(handlers::extend))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    let protected = Router::new()
        .route("/me", get(handlers::me).put(handlers::update_me))
        .route("/update-password", put(handlers::update_password))
        .route(
            "/cart",
            get(handlers::get_cart)
                .post(handlers::edit_cart)
                .delete(handlers::clear_cart),
        )
        .route("/banner", post(handlers::upload_banner))
        .route("/cover", post(handlers::upload_cover))
        .route("/store-images", get(handlers::my_store_images))
        .route("/description", post(handlers::update_store_details))
        .route("/opening-hours/:uid", get(handlers::opening_hours))
        .route("/carousel-image", post(handlers::upload_carousel_image))
        .route("/carousel-image/:id", delete(handlers::delete_carousel_image))
        .route("/carousel-settings", post(handlers::update_carousel_settings))
        .route("/all", get(handlers::list_users))
        .route("/pending-vendors", get(handlers::pending_vendors))
        .route("/approve-vendor/:uid", post(handlers::approve_vendor))
        .route("/reject-vendor/:uid", post(handlers::reject_vendor))
        .route("/update/:uid", put(handlers::update_user))
        .route("/reset-password/:uid", put(handlers::reset_user_password))
        .route("/:uid", get(handlers::user_by_uid))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(session).merge(protected)
}

/// Catalog routes
fn product_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::list_sellable))
        .route("/search", get(handlers::search_products))
        .route("/store/:uid", get(handlers::store_products))
        .route("/:id", get(handlers::get_product));

    let protected = Router::new()
        .route("/", post(handlers::create_product))
        .route("/me", get(handlers::list_my_products))
        .route("/all", get(handlers::list_all_products))
        .route("/:id", patch(handlers::edit_product))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

/// Order routes
fn order_routes(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/events", get(handlers::order_events));

    let protected = Router::new()
        .route(
            "/",
            get(handlers::list_my_orders).post(handlers::create_order),
        )
        .route("/incomplete", get(handlers::list_incomplete_orders))
        .route("/completed", get(handlers::list_completed_orders))
        .route("/all", get(handlers::list_all_orders))
        .route("/completed-all", get(handlers::list_all_completed_orders))
        .route("/status", put(handlers::set_order_status))
        .route("/products-status", put(handlers::set_line_item_status))
        .route("/:order_number/log", get(handlers::order_status_log))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}
