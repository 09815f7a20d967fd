//! Phone verification codes
//!
//! Codes are stored and sent under the international phone form; account
//! lookups use the local form.

use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::{FromRow, PgPool};

use crate::config::VerificationConfig;
use crate::error::{AppError, AppResult};
use crate::external::SmsClient;
use shared::validation::{to_international_phone, to_local_phone, validate_taiwan_mobile};

#[derive(Clone)]
pub struct VerificationService {
    db: PgPool,
    sms: SmsClient,
    daily_limit: i32,
    cooldown_secs: i64,
    code_ttl_secs: i64,
}

#[derive(Debug, FromRow)]
struct TodaysCode {
    id: i64,
    send_count: i32,
    last_sent_at: DateTime<Utc>,
}

/// Why a send is refused before touching the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRefusal {
    DailyLimit,
    Cooldown,
}

/// Decide whether another code may be sent given today's record
pub fn check_send_allowed(
    send_count: i32,
    last_sent_at: DateTime<Utc>,
    now: DateTime<Utc>,
    daily_limit: i32,
    cooldown_secs: i64,
) -> Result<(), SendRefusal> {
    if send_count >= daily_limit {
        return Err(SendRefusal::DailyLimit);
    }
    if (now - last_sent_at).num_seconds() < cooldown_secs {
        return Err(SendRefusal::Cooldown);
    }
    Ok(())
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

fn verification_message(code: &str) -> String {
    format!(
        "歡迎您加入企業餐飲團訂網，您的驗證碼為：{}，請您於10分鐘內輸入驗證碼，逾期將失效。若仍有問題，請與我們聯絡，謝謝！",
        code
    )
}

impl VerificationService {
    pub fn new(db: PgPool, sms: SmsClient, config: &VerificationConfig) -> Self {
        Self {
            db,
            sms,
            daily_limit: config.daily_limit,
            cooldown_secs: config.cooldown_secs,
            code_ttl_secs: config.code_ttl_secs,
        }
    }

    /// Send a code to a phone that is not yet registered
    pub async fn send_code(&self, phone_number: &str) -> AppResult<()> {
        validate_taiwan_mobile(phone_number)
            .map_err(|m| AppError::validation("phoneNumber", m, "手機號碼格式錯誤"))?;

        let registered = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE phone_number = $1)",
        )
        .bind(to_local_phone(phone_number))
        .fetch_one(&self.db)
        .await?;

        if registered {
            return Err(AppError::Conflict {
                resource: "phoneNumber".to_string(),
                message: "Phone number already registered".to_string(),
                message_zh: "手機號碼已被註冊".to_string(),
            });
        }

        self.deliver(phone_number).await
    }

    /// Send a code to the phone on file for `account`
    pub async fn verify_account_and_phone(&self, account: &str, phone_number: &str) -> AppResult<()> {
        let matches = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE account = $1 AND phone_number = $2)",
        )
        .bind(account)
        .bind(to_local_phone(phone_number))
        .fetch_one(&self.db)
        .await?;

        if !matches {
            return Err(AppError::NotFound("account with this phone number".to_string()));
        }

        self.deliver(phone_number).await
    }

    /// Check a code sent within the validity window
    pub async fn verify_code(&self, phone_number: &str, code: &str) -> AppResult<()> {
        let valid = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM verification_codes
                WHERE phone_number = $1
                  AND code = $2
                  AND last_sent_at > NOW() - make_interval(secs => $3)
            )
            "#,
        )
        .bind(to_international_phone(phone_number))
        .bind(code)
        .bind(self.code_ttl_secs as f64)
        .fetch_one(&self.db)
        .await?;

        if !valid {
            return Err(AppError::validation(
                "code",
                "Verification code is incorrect or expired",
                "驗證碼不正確或已失效",
            ));
        }

        Ok(())
    }

    async fn deliver(&self, phone_number: &str) -> AppResult<()> {
        let destination = to_international_phone(phone_number);

        let today = sqlx::query_as::<_, TodaysCode>(
            r#"
            SELECT id, send_count, last_sent_at FROM verification_codes
            WHERE phone_number = $1 AND created_at::date = CURRENT_DATE
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(&destination)
        .fetch_optional(&self.db)
        .await?;

        if let Some(ref record) = today {
            check_send_allowed(
                record.send_count,
                record.last_sent_at,
                Utc::now(),
                self.daily_limit,
                self.cooldown_secs,
            )
            .map_err(|refusal| match refusal {
                SendRefusal::DailyLimit => {
                    AppError::RateLimited("Daily verification limit reached".to_string())
                }
                SendRefusal::Cooldown => AppError::RateLimited(format!(
                    "Please wait {} minutes before requesting another code",
                    self.cooldown_secs / 60
                )),
            })?;
        }

        let code = generate_code();
        if let Err(e) = self.sms.send(&destination, &verification_message(&code)).await {
            tracing::error!(error = %e, "Verification SMS failed");
            return Err(e);
        }

        match today {
            Some(record) => {
                sqlx::query(
                    r#"
                    UPDATE verification_codes
                    SET code = $1, send_count = send_count + 1, last_sent_at = NOW()
                    WHERE id = $2
                    "#,
                )
                .bind(&code)
                .bind(record.id)
                .execute(&self.db)
                .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO verification_codes (phone_number, code, send_count) VALUES ($1, $2, 1)",
                )
                .bind(&destination)
                .bind(&code)
                .execute(&self.db)
                .await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_first_send_after_cooldown_is_allowed() {
        let now = Utc::now();
        assert_eq!(
            check_send_allowed(3, now - Duration::minutes(11), now, 10, 600),
            Ok(())
        );
    }

    #[test]
    fn test_cooldown_blocks_resend() {
        let now = Utc::now();
        assert_eq!(
            check_send_allowed(1, now - Duration::minutes(3), now, 10, 600),
            Err(SendRefusal::Cooldown)
        );
    }

    #[test]
    fn test_daily_limit_takes_precedence() {
        let now = Utc::now();
        assert_eq!(
            check_send_allowed(10, now - Duration::minutes(1), now, 10, 600),
            Err(SendRefusal::DailyLimit)
        );
    }

    #[test]
    fn test_generated_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_message_contains_code() {
        assert!(verification_message("123456").contains("123456"));
    }
}
