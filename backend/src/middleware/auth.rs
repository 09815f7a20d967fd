//! Authentication middleware
//!
//! Bearer-token authentication and role guards. A token is accepted only if
//! it verifies against the JWT secret and is still registered for its user.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ErrorDetail, ErrorResponse};
use crate::models::UserRole;
use crate::services::AuthService;
use crate::AppState;

/// Authenticated user information extracted from the token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub uid: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Raw bearer token of the current request, kept for logout/extend
#[derive(Clone, Debug)]
pub struct BearerToken(pub String);

/// Reject requests without a valid, registered, unexpired token
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    authenticate(state, bearer, request, next, false).await
}

/// Same as [`auth_middleware`] but lets an expired token through.
/// Only used for logout and token extension.
pub async fn session_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    authenticate(state, bearer, request, next, true).await
}

async fn authenticate(
    state: AppState,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
    allow_expired: bool,
) -> AppResult<Response> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(|| AppError::Unauthorized {
        message: "Missing or invalid Authorization header".to_string(),
        message_zh: "請先登入".to_string(),
    })?;
    let token = bearer.token();

    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let claims = auth_service.decode_token(token, allow_expired)?;

    if !auth_service.is_token_registered(claims.sub, token).await? {
        return Err(AppError::InvalidToken);
    }

    let role = UserRole::from_code(claims.role).ok_or(AppError::InvalidToken)?;
    let uid = Uuid::parse_str(&claims.uid).map_err(|_| AppError::InvalidToken)?;

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        uid,
        role,
    });
    request
        .extensions_mut()
        .insert(BearerToken(token.to_string()));

    Ok(next.run(request).await)
}

fn unauthenticated() -> (StatusCode, Json<ErrorResponse>) {
    let error = ErrorResponse {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message_en: "Authentication required".to_string(),
            message_zh: "請先登入".to_string(),
            field: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(error))
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(unauthenticated)
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<BearerToken>()
            .cloned()
            .ok_or_else(unauthenticated)
    }
}

/// Vendors and admins only
pub fn require_staff(user: &AuthUser) -> AppResult<()> {
    if user.role.is_staff() {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

/// Admins only
pub fn require_admin(user: &AuthUser) -> AppResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: 1,
            uid: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn test_staff_guard() {
        assert!(require_staff(&user(UserRole::Vendor)).is_ok());
        assert!(require_staff(&user(UserRole::Admin)).is_ok());
        assert!(require_staff(&user(UserRole::Customer)).is_err());
    }

    #[test]
    fn test_admin_guard() {
        assert!(require_admin(&user(UserRole::Admin)).is_ok());
        assert!(require_admin(&user(UserRole::Vendor)).is_err());
    }
}
