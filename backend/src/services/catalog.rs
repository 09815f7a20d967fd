//! Product catalog

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{Product, ProductCategory, ProductWithVendor};
use shared::types::{PaginatedResponse, Pagination};

const PRODUCT_COLUMNS: &str =
    "p.id, p.name, p.price, p.description, p.image, p.sell, p.category, p.vendor_uid";

#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Product fields sent on create
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_sell")]
    pub sell: bool,
    pub category: ProductCategory,
}

fn default_sell() -> bool {
    true
}

/// Product fields sent on edit; absent fields are kept
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub sell: Option<bool>,
    pub category: Option<ProductCategory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub name: Option<String>,
    pub sell: Option<bool>,
    pub manufacturer_name: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductFilter {
    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(self.page, self.limit)
    }

    fn name_pattern(&self) -> Option<String> {
        self.name.as_ref().map(|n| format!("%{}%", n))
    }

    fn manufacturer_pattern(&self) -> Option<String> {
        self.manufacturer_name.as_ref().map(|n| format!("%{}%", n))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub category: Option<ProductCategory>,
    pub store: Option<String>,
}

fn validate_price(price: Decimal) -> AppResult<()> {
    if price < Decimal::ZERO {
        return Err(AppError::validation(
            "price",
            "Price must not be negative",
            "價格不可為負數",
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("name", "Name is required", "請輸入商品名稱"));
    }
    Ok(())
}

/// Sellable products among `ids`
pub async fn fetch_sellable_products(
    conn: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
    ids: &[i64],
) -> AppResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products p WHERE p.id = ANY($1) AND p.sell = true",
        PRODUCT_COLUMNS
    ))
    .bind(ids)
    .fetch_all(conn)
    .await?;

    Ok(products)
}

/// A product regardless of its sell flag
pub async fn fetch_product(
    conn: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
    id: i64,
) -> AppResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products p WHERE p.id = $1",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_product(
        &self,
        vendor_uid: Uuid,
        input: CreateProductInput,
        image: Option<String>,
    ) -> AppResult<Product> {
        validate_name(&input.name)?;
        validate_price(input.price)?;

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, price, description, image, sell, category, vendor_uid)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, price, description, image, sell, category, vendor_uid
            "#,
        )
        .bind(&input.name)
        .bind(input.price)
        .bind(&input.description)
        .bind(image.unwrap_or_default())
        .bind(input.sell)
        .bind(input.category)
        .bind(vendor_uid)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(product_id = product.id, vendor = %vendor_uid, "Product created");
        Ok(product)
    }

    /// Vendors may edit only their own products; admins may edit any
    pub async fn edit_product(
        &self,
        user: &AuthUser,
        id: i64,
        input: UpdateProductInput,
        image: Option<String>,
    ) -> AppResult<Product> {
        let existing = self.get_product(id).await?;
        if !user.is_admin() && existing.vendor_uid != user.uid {
            return Err(AppError::InsufficientPermissions);
        }

        if let Some(ref name) = input.name {
            validate_name(name)?;
        }
        if let Some(price) = input.price {
            validate_price(price)?;
        }

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                price = COALESCE($3, price),
                description = COALESCE($4, description),
                image = COALESCE($5, image),
                sell = COALESCE($6, sell),
                category = COALESCE($7, category)
            WHERE id = $1
            RETURNING id, name, price, description, image, sell, category, vendor_uid
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.price)
        .bind(&input.description)
        .bind(&image)
        .bind(input.sell)
        .bind(input.category)
        .fetch_one(&self.db)
        .await?;

        Ok(product)
    }

    pub async fn list_mine(
        &self,
        vendor_uid: Uuid,
        filter: &ProductFilter,
    ) -> AppResult<PaginatedResponse<Product>> {
        let pagination = filter.pagination();
        let name = filter.name_pattern();

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {} FROM products p
            WHERE p.vendor_uid = $1
              AND ($2::TEXT IS NULL OR p.name ILIKE $2)
              AND ($3::BOOLEAN IS NULL OR p.sell = $3)
            ORDER BY p.id DESC
            LIMIT $4 OFFSET $5
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(vendor_uid)
        .bind(&name)
        .bind(filter.sell)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM products p
            WHERE p.vendor_uid = $1
              AND ($2::TEXT IS NULL OR p.name ILIKE $2)
              AND ($3::BOOLEAN IS NULL OR p.sell = $3)
            "#,
        )
        .bind(vendor_uid)
        .bind(&name)
        .bind(filter.sell)
        .fetch_one(&self.db)
        .await?;

        Ok(PaginatedResponse::new(products, pagination, total))
    }

    pub async fn list_all(
        &self,
        filter: &ProductFilter,
    ) -> AppResult<PaginatedResponse<ProductWithVendor>> {
        let pagination = filter.pagination();
        let name = filter.name_pattern();
        let manufacturer = filter.manufacturer_pattern();

        let products = sqlx::query_as::<_, ProductWithVendor>(&format!(
            r#"
            SELECT {}, u.company_name FROM products p
            JOIN users u ON u.uid = p.vendor_uid
            WHERE ($1::TEXT IS NULL OR p.name ILIKE $1)
              AND ($2::BOOLEAN IS NULL OR p.sell = $2)
              AND ($3::TEXT IS NULL OR u.company_name ILIKE $3)
            ORDER BY p.id DESC
            LIMIT $4 OFFSET $5
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&name)
        .bind(filter.sell)
        .bind(&manufacturer)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM products p
            JOIN users u ON u.uid = p.vendor_uid
            WHERE ($1::TEXT IS NULL OR p.name ILIKE $1)
              AND ($2::BOOLEAN IS NULL OR p.sell = $2)
              AND ($3::TEXT IS NULL OR u.company_name ILIKE $3)
            "#,
        )
        .bind(&name)
        .bind(filter.sell)
        .bind(&manufacturer)
        .fetch_one(&self.db)
        .await?;

        Ok(PaginatedResponse::new(products, pagination, total))
    }

    /// Everything currently for sale, shuffled
    pub async fn list_sellable(&self) -> AppResult<Vec<ProductWithVendor>> {
        let products = sqlx::query_as::<_, ProductWithVendor>(&format!(
            r#"
            SELECT {}, u.company_name FROM products p
            JOIN users u ON u.uid = p.vendor_uid
            WHERE p.sell = true
            ORDER BY RANDOM()
            "#,
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    pub async fn get_product(&self, id: i64) -> AppResult<Product> {
        fetch_product(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Sellable products by category and/or store name
    pub async fn search(&self, query: &SearchQuery) -> AppResult<Vec<ProductWithVendor>> {
        let store = query.store.as_ref().map(|s| format!("%{}%", s));

        let products = sqlx::query_as::<_, ProductWithVendor>(&format!(
            r#"
            SELECT {}, u.company_name FROM products p
            JOIN users u ON u.uid = p.vendor_uid
            WHERE p.sell = true
              AND ($1::product_category IS NULL OR p.category = $1)
              AND ($2::TEXT IS NULL OR u.company_name ILIKE $2)
            ORDER BY p.id DESC
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(query.category)
        .bind(&store)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    pub async fn store_products(&self, vendor_uid: Uuid) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products p WHERE p.vendor_uid = $1 AND p.sell = true ORDER BY p.id DESC",
            PRODUCT_COLUMNS
        ))
        .bind(vendor_uid)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_rejected() {
        assert!(validate_price(Decimal::new(-1, 0)).is_err());
        assert!(validate_price(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name("便當").is_ok());
    }

    #[test]
    fn test_filter_patterns() {
        let filter = ProductFilter {
            name: Some("rice".into()),
            ..Default::default()
        };
        assert_eq!(filter.name_pattern().as_deref(), Some("%rice%"));
        assert_eq!(filter.manufacturer_pattern(), None);
        assert_eq!(filter.pagination().limit, 5);
    }
}
