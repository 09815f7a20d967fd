//! Error handling for the group-order marketplace
//!
//! Provides consistent error responses in English and Traditional Chinese

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String, message_zh: String },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_zh: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_zh: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Ordering errors
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart contains products that are no longer for sale")]
    UnavailableProduct,

    #[error("Product {0} could not be resolved while placing the order")]
    ProductNotFound(i64),

    #[error("Invalid order number: {0}")]
    InvalidOrderNumber(#[from] shared::models::OrderNumberError),

    // Verification errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    // External service errors
    #[error("SMS delivery failed: {0}")]
    SmsDelivery(String),

    #[error("Image upload failed: {0}")]
    ImageUpload(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_zh: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: &str, message: &str, message_zh: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_zh: message_zh.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials
            | AppError::TokenExpired
            | AppError::InvalidToken
            | AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AppError::Validation { .. }
            | AppError::ValidationError(_)
            | AppError::DuplicateEntry(_)
            | AppError::Conflict { .. }
            | AppError::EmptyCart
            | AppError::UnavailableProduct
            | AppError::InvalidOrderNumber(_)
            | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::ImageUpload(_) => StatusCode::BAD_GATEWAY,
            AppError::ProductNotFound(_)
            | AppError::SmsDelivery(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> ErrorDetail {
        let (code, message_en, message_zh, field) = match self {
            AppError::InvalidCredentials => (
                "INVALID_CREDENTIALS",
                "Invalid account or password".to_string(),
                "帳號或密碼錯誤".to_string(),
                None,
            ),
            AppError::TokenExpired => (
                "TOKEN_EXPIRED",
                "Token has expired".to_string(),
                "登入已過期".to_string(),
                None,
            ),
            AppError::InvalidToken => (
                "INVALID_TOKEN",
                "Invalid token".to_string(),
                "無效的登入憑證".to_string(),
                None,
            ),
            AppError::InsufficientPermissions => (
                "INSUFFICIENT_PERMISSIONS",
                "You do not have permission to perform this action".to_string(),
                "您沒有執行此操作的權限".to_string(),
                None,
            ),
            AppError::Unauthorized { message, message_zh } => {
                ("UNAUTHORIZED", message.clone(), message_zh.clone(), None)
            }
            AppError::Validation {
                field,
                message,
                message_zh,
            } => (
                "VALIDATION_ERROR",
                message.clone(),
                message_zh.clone(),
                Some(field.clone()),
            ),
            AppError::ValidationError(msg) => (
                "VALIDATION_ERROR",
                msg.clone(),
                format!("資料格式錯誤: {}", msg),
                None,
            ),
            AppError::DuplicateEntry(field) => (
                "DUPLICATE_ENTRY",
                format!("A record with this {} already exists", field),
                format!("此{}已被使用", field),
                Some(field.clone()),
            ),
            AppError::Conflict {
                resource,
                message,
                message_zh,
            } => (
                "CONFLICT",
                message.clone(),
                message_zh.clone(),
                Some(resource.clone()),
            ),
            AppError::NotFound(resource) => (
                "NOT_FOUND",
                format!("{} not found", resource),
                format!("找不到{}", resource),
                None,
            ),
            AppError::EmptyCart => (
                "EMPTY_CART",
                "Cart is empty".to_string(),
                "購物車是空的".to_string(),
                None,
            ),
            AppError::UnavailableProduct => (
                "UNAVAILABLE_PRODUCT",
                "Some products in the cart are no longer for sale".to_string(),
                "購物車中有商品已下架".to_string(),
                None,
            ),
            AppError::ProductNotFound(id) => (
                "PRODUCT_NOT_FOUND",
                format!("Product {} could not be found", id),
                "找不到商品".to_string(),
                None,
            ),
            AppError::InvalidOrderNumber(e) => (
                "INVALID_ORDER_NUMBER",
                e.to_string(),
                "訂單編號格式錯誤".to_string(),
                Some("orderNumber".to_string()),
            ),
            AppError::RateLimited(msg) => (
                "RATE_LIMITED",
                msg.clone(),
                "請求過於頻繁，請稍後再試".to_string(),
                None,
            ),
            AppError::SmsDelivery(_) => (
                "SMS_DELIVERY_ERROR",
                "Could not send verification code".to_string(),
                "無法發送驗證碼".to_string(),
                None,
            ),
            AppError::ImageUpload(_) => (
                "IMAGE_UPLOAD_ERROR",
                "Image upload failed".to_string(),
                "圖片上傳失敗".to_string(),
                None,
            ),
            AppError::Multipart(e) => (
                "VALIDATION_ERROR",
                format!("Malformed upload: {}", e),
                "上傳資料格式錯誤".to_string(),
                None,
            ),
            AppError::DatabaseError(_) => (
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
                "資料庫發生錯誤".to_string(),
                None,
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
                "伺服器內部錯誤".to_string(),
                None,
            ),
        };

        ErrorDetail {
            code: code.to_string(),
            message_en,
            message_zh,
            field,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log the error for debugging
        tracing::error!(status = status.as_u16(), "Error: {:?}", self);

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_errors_are_client_errors() {
        assert_eq!(AppError::EmptyCart.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::UnavailableProduct.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ProductNotFound(7).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let detail = AppError::Internal("pool exhausted".into()).detail();
        assert_eq!(detail.code, "INTERNAL_ERROR");
        assert!(!detail.message_en.contains("pool"));
    }

    #[test]
    fn test_rate_limit_status() {
        assert_eq!(
            AppError::RateLimited("slow down".into()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
