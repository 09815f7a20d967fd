//! Vendor storefronts and the home-page carousel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{StoreProfile, UserRole};

#[derive(Clone)]
pub struct StoreService {
    db: PgPool,
}

/// Which storefront image is being replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreImage {
    Banner,
    Cover,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDetailsInput {
    pub description: Option<String>,
    pub opening_hours: Option<String>,
}

/// Store card on the public store list
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    pub uid: Uuid,
    pub company_name: Option<String>,
    pub address: String,
    pub cover: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoreInfo {
    pub company_name: Option<String>,
    pub banner: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CarouselImage {
    pub id: i64,
    pub image_url: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CarouselSettings {
    pub interval_ms: i32,
    pub autoplay: bool,
}

impl StoreService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn set_image(&self, user_id: i64, which: StoreImage, url: &str) -> AppResult<()> {
        let sql = match which {
            StoreImage::Banner => {
                "INSERT INTO store_profiles (user_id, banner) VALUES ($1, $2)
                 ON CONFLICT (user_id) DO UPDATE SET banner = EXCLUDED.banner"
            }
            StoreImage::Cover => {
                "INSERT INTO store_profiles (user_id, cover) VALUES ($1, $2)
                 ON CONFLICT (user_id) DO UPDATE SET cover = EXCLUDED.cover"
            }
        };

        sqlx::query(sql)
            .bind(user_id)
            .bind(url)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    pub async fn my_profile(&self, user_id: i64) -> AppResult<StoreProfile> {
        sqlx::query_as::<_, StoreProfile>(
            "SELECT banner, cover, description, opening_hours FROM store_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Store images".to_string()))
    }

    pub async fn update_details(
        &self,
        user_id: i64,
        input: StoreDetailsInput,
    ) -> AppResult<StoreProfile> {
        let profile = sqlx::query_as::<_, StoreProfile>(
            r#"
            INSERT INTO store_profiles (user_id, description, opening_hours)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                description = COALESCE(EXCLUDED.description, store_profiles.description),
                opening_hours = COALESCE(EXCLUDED.opening_hours, store_profiles.opening_hours)
            RETURNING banner, cover, description, opening_hours
            "#,
        )
        .bind(user_id)
        .bind(&input.description)
        .bind(&input.opening_hours)
        .fetch_one(&self.db)
        .await?;

        Ok(profile)
    }

    /// Vendors with a storefront, optionally filtered by company name
    pub async fn list_stores(&self, query: Option<&str>) -> AppResult<Vec<StoreSummary>> {
        let pattern = query.map(|q| format!("%{}%", q));

        let stores = sqlx::query_as::<_, StoreSummary>(
            r#"
            SELECT u.uid, u.company_name, u.address, s.cover
            FROM users u
            LEFT JOIN store_profiles s ON s.user_id = u.id
            WHERE u.role = $1 AND u.is_active = true AND u.approval_status = 'approved'
              AND ($2::TEXT IS NULL OR u.company_name ILIKE $2)
            ORDER BY u.id
            "#,
        )
        .bind(UserRole::Vendor.code())
        .bind(&pattern)
        .fetch_all(&self.db)
        .await?;

        Ok(stores)
    }

    pub async fn store_info(&self, vendor_uid: Uuid) -> AppResult<StoreInfo> {
        sqlx::query_as::<_, StoreInfo>(
            r#"
            SELECT u.company_name, s.banner, s.description
            FROM users u
            LEFT JOIN store_profiles s ON s.user_id = u.id
            WHERE u.uid = $1 AND u.role = $2
            "#,
        )
        .bind(vendor_uid)
        .bind(UserRole::Vendor.code())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Store".to_string()))
    }

    pub async fn opening_hours(&self, vendor_uid: Uuid) -> AppResult<Option<String>> {
        let hours = sqlx::query_scalar::<_, Option<String>>(
            r#"
            SELECT s.opening_hours
            FROM users u
            JOIN store_profiles s ON s.user_id = u.id
            WHERE u.uid = $1
            "#,
        )
        .bind(vendor_uid)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Store".to_string()))?;

        Ok(hours)
    }

    // ------------------------------------------------------------------
    // Carousel
    // ------------------------------------------------------------------

    pub async fn carousel_images(&self) -> AppResult<Vec<CarouselImage>> {
        let images = sqlx::query_as::<_, CarouselImage>(
            "SELECT id, image_url, sort_order, created_at FROM carousel_images ORDER BY sort_order, id",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(images)
    }

    pub async fn add_carousel_image(&self, url: &str) -> AppResult<CarouselImage> {
        let image = sqlx::query_as::<_, CarouselImage>(
            r#"
            INSERT INTO carousel_images (image_url, sort_order)
            VALUES ($1, (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM carousel_images))
            RETURNING id, image_url, sort_order, created_at
            "#,
        )
        .bind(url)
        .fetch_one(&self.db)
        .await?;

        Ok(image)
    }

    pub async fn delete_carousel_image(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM carousel_images WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Carousel image".to_string()));
        }
        Ok(())
    }

    pub async fn carousel_settings(&self) -> AppResult<CarouselSettings> {
        let settings = sqlx::query_as::<_, CarouselSettings>(
            "SELECT interval_ms, autoplay FROM carousel_settings WHERE id = 1",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(settings)
    }

    pub async fn update_carousel_settings(
        &self,
        input: CarouselSettings,
    ) -> AppResult<CarouselSettings> {
        if input.interval_ms < 1000 {
            return Err(AppError::validation(
                "intervalMs",
                "Interval must be at least 1000 ms",
                "輪播間隔至少 1000 毫秒",
            ));
        }

        let settings = sqlx::query_as::<_, CarouselSettings>(
            r#"
            UPDATE carousel_settings SET interval_ms = $1, autoplay = $2
            WHERE id = 1
            RETURNING interval_ms, autoplay
            "#,
        )
        .bind(input.interval_ms)
        .bind(input.autoplay)
        .fetch_one(&self.db)
        .await?;

        Ok(settings)
    }
}
