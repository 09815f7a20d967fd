//! Profiles, password changes and admin user management

use bcrypt::{hash, verify, DEFAULT_COST};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ApprovalStatus, UserProfile, UserRole, UserRow, UNKNOWN_OPERATOR};
use crate::services::VerificationService;
use shared::validation::{to_local_phone, validate_email, validate_password};

#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// Profile plus how many items sit in the cart
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserProfile,
    pub cart_quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeInput {
    pub email: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
    pub phone_number: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordByAccountInput {
    pub account: String,
    pub phone_number: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserInput {
    pub email: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<i16>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

/// Public summary returned by uid lookup
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub account: String,
    pub company_name: Option<String>,
    pub phone_number: String,
}

fn hash_password(password: &str) -> AppResult<String> {
    validate_password(password)
        .map_err(|m| AppError::validation("password", m, "密碼長度需為 4-20 字"))?;
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_by_id(&self, user_id: i64) -> AppResult<UserRow> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            UserRow::COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    async fn find_by_uid(&self, uid: Uuid) -> AppResult<UserRow> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE uid = $1",
            UserRow::COLUMNS
        ))
        .bind(uid)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    async fn ensure_phone_free(&self, phone_number: &str, except_user: i64) -> AppResult<()> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE phone_number = $1 AND id <> $2)",
        )
        .bind(phone_number)
        .bind(except_user)
        .fetch_one(&self.db)
        .await?;

        if taken {
            return Err(AppError::Conflict {
                resource: "phoneNumber".to_string(),
                message: "Phone number already registered".to_string(),
                message_zh: "手機號碼已註冊".to_string(),
            });
        }
        Ok(())
    }

    pub async fn me(&self, user_id: i64) -> AppResult<MeResponse> {
        let user = self.find_by_id(user_id).await?.into_profile()?;
        let cart_quantity = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(MeResponse {
            user,
            cart_quantity,
        })
    }

    pub async fn update_me(&self, user_id: i64, input: UpdateMeInput) -> AppResult<UserProfile> {
        let current = self.find_by_id(user_id).await?;

        if let Some(ref email) = input.email {
            validate_email(email)
                .map_err(|m| AppError::validation("email", m, "電子郵件格式錯誤"))?;
        }

        let phone_number = input.phone_number.as_deref().map(to_local_phone);
        if let Some(ref phone) = phone_number {
            if *phone != current.phone_number {
                self.ensure_phone_free(phone, user_id).await?;
            }
        }

        let password_hash = match input.new_password {
            Some(ref new_password) => {
                let current_password = input.current_password.as_deref().unwrap_or_default();
                self.check_password(&current, current_password)?;
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        let updated = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                name = COALESCE($3, name),
                address = COALESCE($4, address),
                company_name = COALESCE($5, company_name),
                tax_id = COALESCE($6, tax_id),
                phone_number = COALESCE($7, phone_number),
                password_hash = COALESCE($8, password_hash)
            WHERE id = $1
            RETURNING {}
            "#,
            UserRow::COLUMNS
        ))
        .bind(user_id)
        .bind(&input.email)
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.company_name)
        .bind(&input.tax_id)
        .bind(&phone_number)
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::DuplicateEntry("email".to_string())
            }
            other => AppError::DatabaseError(other),
        })?;

        updated.into_profile()
    }

    fn check_password(&self, user: &UserRow, password: &str) -> AppResult<()> {
        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if valid {
            Ok(())
        } else {
            Err(AppError::validation(
                "currentPassword",
                "Current password is incorrect",
                "目前密碼錯誤",
            ))
        }
    }

    pub async fn update_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self.find_by_id(user_id).await?;
        self.check_password(&user, current_password)?;
        self.set_password(user_id, new_password).await
    }

    async fn set_password(&self, user_id: i64, new_password: &str) -> AppResult<()> {
        let password_hash = hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(&password_hash)
            .execute(&self.db)
            .await?;

        // Outstanding sessions end with a password change
        sqlx::query("DELETE FROM user_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Forgotten-password flow: account and phone must match and the code must verify
    pub async fn reset_password_by_account(
        &self,
        verification: &VerificationService,
        input: ResetPasswordByAccountInput,
    ) -> AppResult<()> {
        let user_id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM users WHERE account = $1 AND phone_number = $2",
        )
        .bind(&input.account)
        .bind(to_local_phone(&input.phone_number))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("account with this phone number".to_string()))?;

        verification
            .verify_code(&input.phone_number, &input.code)
            .await?;

        self.set_password(user_id, &input.new_password).await?;
        tracing::info!(account = %input.account, "Password reset by verification code");
        Ok(())
    }

    pub async fn user_by_uid(&self, uid: Uuid) -> AppResult<UserSummary> {
        sqlx::query_as::<_, UserSummary>(
            "SELECT account, company_name, phone_number FROM users WHERE uid = $1",
        )
        .bind(uid)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// Display name recorded with audit entries
    pub async fn fetch_display_name(&self, uid: Uuid) -> AppResult<String> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.db)
            .await?;

        Ok(name.unwrap_or_else(|| UNKNOWN_OPERATOR.to_string()))
    }

    // ------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------

    pub async fn list_users(&self) -> AppResult<Vec<UserProfile>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY id",
            UserRow::COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(UserRow::into_profile).collect()
    }

    pub async fn admin_update_user(
        &self,
        uid: Uuid,
        input: AdminUpdateUserInput,
    ) -> AppResult<UserProfile> {
        let current = self.find_by_uid(uid).await?;

        if let Some(code) = input.role {
            UserRole::from_code(code)
                .ok_or_else(|| AppError::validation("role", "Unknown role", "角色格式錯誤"))?;
        }

        let phone_number = input.phone_number.as_deref().map(to_local_phone);
        if let Some(ref phone) = phone_number {
            if *phone != current.phone_number {
                self.ensure_phone_free(phone, current.id).await?;
            }
        }

        let password_hash = match input.password {
            Some(ref password) => Some(hash_password(password)?),
            None => None,
        };

        let updated = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                name = COALESCE($3, name),
                address = COALESCE($4, address),
                company_name = COALESCE($5, company_name),
                tax_id = COALESCE($6, tax_id),
                phone_number = COALESCE($7, phone_number),
                role = COALESCE($8, role),
                is_active = COALESCE($9, is_active),
                password_hash = COALESCE($10, password_hash)
            WHERE id = $1
            RETURNING {}
            "#,
            UserRow::COLUMNS
        ))
        .bind(current.id)
        .bind(&input.email)
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.company_name)
        .bind(&input.tax_id)
        .bind(&phone_number)
        .bind(input.role)
        .bind(input.is_active)
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await?;

        if input.is_active == Some(false) {
            sqlx::query("DELETE FROM user_tokens WHERE user_id = $1")
                .bind(current.id)
                .execute(&self.db)
                .await?;
        }

        updated.into_profile()
    }

    pub async fn admin_reset_password(&self, uid: Uuid, new_password: &str) -> AppResult<()> {
        let user = self.find_by_uid(uid).await?;
        self.set_password(user.id, new_password).await
    }

    pub async fn pending_vendors(&self) -> AppResult<Vec<UserProfile>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE role = $1 AND approval_status = $2 ORDER BY registered_at",
            UserRow::COLUMNS
        ))
        .bind(UserRole::Vendor.code())
        .bind(ApprovalStatus::Pending)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(UserRow::into_profile).collect()
    }

    pub async fn approve_vendor(&self, uid: Uuid) -> AppResult<UserProfile> {
        self.set_approval(uid, ApprovalStatus::Approved, None).await
    }

    pub async fn reject_vendor(&self, uid: Uuid, reason: Option<String>) -> AppResult<UserProfile> {
        self.set_approval(uid, ApprovalStatus::Rejected, reason).await
    }

    async fn set_approval(
        &self,
        uid: Uuid,
        status: ApprovalStatus,
        reason: Option<String>,
    ) -> AppResult<UserProfile> {
        let updated = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET approval_status = $3, rejection_reason = $4
            WHERE uid = $1 AND role = $2
            RETURNING {}
            "#,
            UserRow::COLUMNS
        ))
        .bind(uid)
        .bind(UserRole::Vendor.code())
        .bind(status)
        .bind(&reason)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Vendor".to_string()))?;

        tracing::info!(uid = %uid, status = ?status, "Vendor approval updated");
        updated.into_profile()
    }
}
