//! Shopping cart

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{cart_quantity, CartLine, Product};

#[derive(Clone)]
pub struct CartService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCartInput {
    pub product_id: i64,
    /// Added to the current quantity; negative removes
    pub quantity: i32,
}

/// Cart line with its product
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub product_id: i64,
    pub quantity: i32,
    pub product: Product,
}

/// What applying a delta does to a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEdit {
    Set(i32),
    Remove,
}

/// New state of a cart line after adding `delta` to `current`
pub fn apply_delta(current: i32, delta: i32) -> CartEdit {
    let next = current.saturating_add(delta);
    if next <= 0 {
        CartEdit::Remove
    } else {
        CartEdit::Set(next)
    }
}

impl CartService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Adjust a cart line and return the cart's total quantity
    pub async fn edit(&self, user_id: i64, input: EditCartInput) -> AppResult<i64> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_scalar::<_, i32>(
            "SELECT quantity FROM carts WHERE user_id = $1 AND product_id = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(input.product_id)
        .fetch_optional(&mut *tx)
        .await?;

        match current {
            Some(quantity) => match apply_delta(quantity, input.quantity) {
                CartEdit::Set(next) => {
                    sqlx::query(
                        "UPDATE carts SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
                    )
                    .bind(user_id)
                    .bind(input.product_id)
                    .bind(next)
                    .execute(&mut *tx)
                    .await?;
                }
                CartEdit::Remove => {
                    sqlx::query("DELETE FROM carts WHERE user_id = $1 AND product_id = $2")
                        .bind(user_id)
                        .bind(input.product_id)
                        .execute(&mut *tx)
                        .await?;
                }
            },
            None => {
                if input.quantity <= 0 {
                    return Err(AppError::validation(
                        "quantity",
                        "Quantity must be positive",
                        "數量必須大於 0",
                    ));
                }

                let sellable = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND sell = true)",
                )
                .bind(input.product_id)
                .fetch_one(&mut *tx)
                .await?;

                if !sellable {
                    return Err(AppError::NotFound("Product".to_string()));
                }

                sqlx::query("INSERT INTO carts (user_id, product_id, quantity) VALUES ($1, $2, $3)")
                    .bind(user_id)
                    .bind(input.product_id)
                    .bind(input.quantity)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let lines = Self::lines(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok(cart_quantity(&lines))
    }

    pub async fn get(&self, user_id: i64) -> AppResult<Vec<CartItemView>> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT product_id, quantity FROM carts WHERE user_id = $1 ORDER BY product_id",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, description, image, sell, category, vendor_uid
            FROM products WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        Ok(lines
            .into_iter()
            .filter_map(|line| {
                products
                    .iter()
                    .find(|p| p.id == line.product_id)
                    .cloned()
                    .map(|product| CartItemView {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        product,
                    })
            })
            .collect())
    }

    pub async fn clear(&self, user_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Cart lines read inside an open transaction
    pub(crate) async fn lines(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: i64,
    ) -> AppResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT product_id, quantity FROM carts WHERE user_id = $1 ORDER BY product_id",
        )
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_adds_to_line() {
        assert_eq!(apply_delta(2, 3), CartEdit::Set(5));
    }

    #[test]
    fn test_delta_to_zero_removes_line() {
        assert_eq!(apply_delta(2, -2), CartEdit::Remove);
        assert_eq!(apply_delta(2, -5), CartEdit::Remove);
    }
}
