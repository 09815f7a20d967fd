//! Catalog models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "product_category", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Chinese,
    Korean,
    Japanese,
    HandShakenDrinks,
    Other,
}

impl std::str::FromStr for ProductCategory {
    type Err = String;

    /// Accepts the snake_case name or the zh-TW label
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chinese" | "中式料理" => Ok(ProductCategory::Chinese),
            "korean" | "韓式料理" => Ok(ProductCategory::Korean),
            "japanese" | "日式料理" => Ok(ProductCategory::Japanese),
            "hand_shaken_drinks" | "手搖杯飲料" => Ok(ProductCategory::HandShakenDrinks),
            "other" | "其他" => Ok(ProductCategory::Other),
            _ => Err(format!("unknown category: {}", s)),
        }
    }
}

/// A vendor's product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image: String,
    pub sell: bool,
    pub category: ProductCategory,
    pub vendor_uid: Uuid,
}

/// One cart line: product and quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i32,
}

/// Total quantity across cart lines
pub fn cart_quantity(lines: &[CartLine]) -> i64 {
    lines.iter().map(|l| i64::from(l.quantity)).sum()
}

/// Distinct product ids referenced by a cart
pub fn cart_product_ids(lines: &[CartLine]) -> Vec<i64> {
    let mut ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
