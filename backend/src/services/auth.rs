//! Authentication service for user registration, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, NaiveDate, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{Gender, UserProfile, UserRole, UserRow};
use shared::validation::{to_local_phone, validate_account, validate_password};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    extended_token_expiry: i64,
}

/// Input for registering a new account
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub account: String,
    pub password: String,
    #[validate(email)]
    pub email: String,
    /// 0 customer, 1 vendor
    pub role: i16,
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
    pub phone_number: String,
    pub gender: Gender,
    pub birthdate: NaiveDate,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub uid: String,
    pub role: i16,
    pub exp: i64,
    pub iat: i64,
}

/// Token issued on login or extension
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: AuthToken,
    pub user: UserProfile,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            extended_token_expiry: config.jwt.extended_token_expiry,
        }
    }

    /// Register a new customer or vendor account
    pub async fn register(&self, input: RegisterInput) -> AppResult<UserProfile> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        validate_account(&input.account)
            .map_err(|m| AppError::validation("account", m, "帳號需為 4-20 位英數字"))?;
        validate_password(&input.password)
            .map_err(|m| AppError::validation("password", m, "密碼長度需為 4-20 字"))?;

        let role = match UserRole::from_code(input.role) {
            Some(role @ (UserRole::Customer | UserRole::Vendor)) => role,
            _ => {
                return Err(AppError::validation(
                    "role",
                    "Role must be customer or vendor",
                    "角色格式錯誤",
                ))
            }
        };

        let phone_number = to_local_phone(&input.phone_number);

        let phone_taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE phone_number = $1)",
        )
        .bind(&phone_number)
        .fetch_one(&self.db)
        .await?;

        if phone_taken {
            return Err(AppError::Conflict {
                resource: "phoneNumber".to_string(),
                message: "Phone number already registered".to_string(),
                message_zh: "手機號碼已註冊".to_string(),
            });
        }

        let account_taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE account = $1)",
        )
        .bind(&input.account)
        .fetch_one(&self.db)
        .await?;

        if account_taken {
            return Err(AppError::Conflict {
                resource: "account".to_string(),
                message: "Account already exists".to_string(),
                message_zh: "帳號已註冊".to_string(),
            });
        }

        // Hash password
        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let user = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (uid, account, password_hash, email, role, name, address,
                               company_name, tax_id, phone_number, gender, birthdate, approval_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            UserRow::COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.account)
        .bind(&password_hash)
        .bind(&input.email)
        .bind(role.code())
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.company_name)
        .bind(&input.tax_id)
        .bind(&phone_number)
        .bind(input.gender)
        .bind(input.birthdate)
        .bind(role.initial_approval())
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::DuplicateEntry("email".to_string())
            }
            other => AppError::DatabaseError(other),
        })?;

        tracing::info!(uid = %user.uid, role = ?role, "Account registered");

        user.into_profile()
    }

    /// Authenticate with account and password
    pub async fn login(&self, account: &str, password: &str) -> AppResult<LoginResponse> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE account = $1",
            UserRow::COLUMNS
        ))
        .bind(account)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        // Verify password
        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AppError::Unauthorized {
                message: "Account is disabled".to_string(),
                message_zh: "帳號已停用".to_string(),
            });
        }

        if user.approval_status != crate::models::ApprovalStatus::Approved {
            return Err(AppError::Unauthorized {
                message: "Vendor account has not been approved".to_string(),
                message_zh: "商家帳號尚未通過審核".to_string(),
            });
        }

        let role = user.role()?;
        let token = self.issue_token(user.id, user.uid, role, self.access_token_expiry)?;
        self.store_token(user.id, &token.token).await?;

        tracing::info!(uid = %user.uid, "User logged in");

        Ok(LoginResponse {
            token,
            user: user.into_profile()?,
        })
    }

    /// Revoke the presented token
    pub async fn logout(&self, user_id: i64, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM user_tokens WHERE user_id = $1 AND token_hash = $2")
            .bind(user_id)
            .bind(Self::hash_token(token))
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Replace the presented token with a longer-lived one
    pub async fn extend(
        &self,
        user_id: i64,
        uid: Uuid,
        role: UserRole,
        old_token: &str,
    ) -> AppResult<AuthToken> {
        let token = self.issue_token(user_id, uid, role, self.extended_token_expiry)?;

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM user_tokens WHERE user_id = $1 AND token_hash = $2")
            .bind(user_id)
            .bind(Self::hash_token(old_token))
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO user_tokens (user_id, token_hash) VALUES ($1, $2)")
            .bind(user_id)
            .bind(Self::hash_token(&token.token))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(token)
    }

    /// Decode and verify a token's signature (and expiry unless allowed)
    pub fn decode_token(&self, token: &str, allow_expired: bool) -> AppResult<Claims> {
        let mut validation = Validation::default();
        if allow_expired {
            validation.validate_exp = false;
        }

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })
    }

    /// Whether the token is still registered for its user
    pub async fn is_token_registered(&self, user_id: i64, token: &str) -> AppResult<bool> {
        let registered = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_tokens t
                JOIN users u ON u.id = t.user_id
                WHERE t.user_id = $1 AND t.token_hash = $2 AND u.is_active = true
            )
            "#,
        )
        .bind(user_id)
        .bind(Self::hash_token(token))
        .fetch_one(&self.db)
        .await?;

        Ok(registered)
    }

    fn issue_token(
        &self,
        user_id: i64,
        uid: Uuid,
        role: UserRole,
        expiry_secs: i64,
    ) -> AppResult<AuthToken> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            uid: uid.to_string(),
            role: role.code(),
            exp: (now + Duration::seconds(expiry_secs)).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthToken {
            token,
            token_type: "Bearer".to_string(),
            expires_in: expiry_secs,
        })
    }

    async fn store_token(&self, user_id: i64, token: &str) -> AppResult<()> {
        sqlx::query("INSERT INTO user_tokens (user_id, token_hash) VALUES ($1, $2)")
            .bind(user_id)
            .bind(Self::hash_token(token))
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Hex SHA-256 of a token for storage
    pub(crate) fn hash_token(token: &str) -> String {
        format!("{:x}", Sha256::digest(token.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let a = AuthService::hash_token("abc");
        assert_eq!(a, AuthService::hash_token("abc"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_token_differs_per_token() {
        assert_ne!(
            AuthService::hash_token("token-a"),
            AuthService::hash_token("token-b")
        );
    }
}
