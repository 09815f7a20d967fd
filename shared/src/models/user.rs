//! User, role and storefront models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role stored as a small integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Vendor,
    Admin,
}

impl UserRole {
    pub fn code(&self) -> i16 {
        match self {
            UserRole::Customer => 0,
            UserRole::Vendor => 1,
            UserRole::Admin => 2,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(UserRole::Customer),
            1 => Some(UserRole::Vendor),
            2 => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Vendors and admins may manage catalogs and fulfil orders
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Vendor | UserRole::Admin)
    }

    /// Approval status a freshly registered account starts in
    pub fn initial_approval(&self) -> ApprovalStatus {
        match self {
            UserRole::Vendor => ApprovalStatus::Pending,
            _ => ApprovalStatus::Approved,
        }
    }
}

/// Vendor registration approval state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "approval_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "gender", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// Public user profile (never carries the password hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: Uuid,
    pub account: String,
    pub email: String,
    pub role: UserRole,
    pub name: String,
    pub address: String,
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
    pub phone_number: String,
    pub gender: Gender,
    pub birthdate: NaiveDate,
    pub approval_status: ApprovalStatus,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
}

/// Vendor storefront images and details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct StoreProfile {
    pub banner: Option<String>,
    pub cover: Option<String>,
    pub description: Option<String>,
    pub opening_hours: Option<String>,
}
