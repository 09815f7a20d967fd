//! Database models for the group-order marketplace
//!
//! Re-exports models from the shared crate and adds backend-specific rows

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub use shared::models::*;

use crate::error::{AppError, AppResult};

/// Full user row, including the password hash
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub uid: Uuid,
    pub account: String,
    pub password_hash: String,
    pub email: String,
    pub role: i16,
    pub name: String,
    pub address: String,
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
    pub phone_number: String,
    pub gender: Gender,
    pub birthdate: NaiveDate,
    pub approval_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
}

impl UserRow {
    pub const COLUMNS: &'static str = "id, uid, account, password_hash, email, role, name, address, \
         company_name, tax_id, phone_number, gender, birthdate, approval_status, \
         rejection_reason, is_active, registered_at";

    pub fn role(&self) -> AppResult<UserRole> {
        UserRole::from_code(self.role)
            .ok_or_else(|| AppError::Internal(format!("Unknown role code {}", self.role)))
    }

    pub fn into_profile(self) -> AppResult<UserProfile> {
        let role = self.role()?;
        Ok(UserProfile {
            uid: self.uid,
            account: self.account,
            email: self.email,
            role,
            name: self.name,
            address: self.address,
            company_name: self.company_name,
            tax_id: self.tax_id,
            phone_number: self.phone_number,
            gender: self.gender,
            birthdate: self.birthdate,
            approval_status: self.approval_status,
            is_active: self.is_active,
            registered_at: self.registered_at,
        })
    }
}

/// Order header row
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
    pub id: i64,
    pub order_number: String,
    pub buyer_id: i64,
    pub buyer_uid: Uuid,
    pub created_at: DateTime<Utc>,
    pub delivery_date: NaiveDate,
    pub delivery_time_slot: String,
    pub phone: String,
    pub landline: Option<String>,
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub address: String,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub cancel_reason: Option<String>,
    pub comment: Option<String>,
}

impl OrderRow {
    pub const COLUMNS: &'static str = "o.id, o.order_number, o.buyer_id, o.buyer_uid, o.created_at, \
         o.delivery_date, o.delivery_time_slot, o.phone, o.landline, o.company_name, o.tax_id, \
         o.recipient_name, o.recipient_phone, o.address, o.payment_method, o.status, \
         o.cancel_reason, o.comment";
}

/// Line item joined with its product and vendor, as shown in order lists
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LineItemView {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub total_price: Decimal,
    pub status: LineItemStatus,
    pub cancel_reason: Option<String>,
    /// Current catalog price, which may differ from the snapshot in `total_price`
    pub price: Decimal,
    pub vendor_uid: Uuid,
    pub manufacturer_name: Option<String>,
}

/// Buyer-facing order with its line items
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerOrderView {
    #[serde(flatten)]
    pub order: OrderRow,
    pub products: Vec<LineItemView>,
}

/// Order header joined with the buyer account, for vendor/admin lists
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StaffOrderRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: OrderRow,
    pub user_account: Option<String>,
    pub user_name: Option<String>,
    pub user_phone_number: Option<String>,
}

/// Vendor/admin-facing order with the line items the caller may see
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffOrderView {
    #[serde(flatten)]
    pub order: StaffOrderRow,
    pub products: Vec<LineItemView>,
    pub manufacturer_name: Option<String>,
}

/// Product row joined with the vendor's company name
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithVendor {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub company_name: Option<String>,
}
