//! Order and line-item models, plus the status aggregation rules
//!
//! An order's overall status is derived from the statuses of its line
//! items. Vendors accept, reject or ship their own line items; the order
//! follows once every item agrees.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Overall order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "order_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Unconfirmed,
    Received,
    Shipped,
    CancelledByVendor,
    CancelledByBuyer,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unconfirmed => "unconfirmed",
            OrderStatus::Received => "received",
            OrderStatus::Shipped => "shipped",
            OrderStatus::CancelledByVendor => "cancelled_by_vendor",
            OrderStatus::CancelledByBuyer => "cancelled_by_buyer",
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            OrderStatus::CancelledByVendor | OrderStatus::CancelledByBuyer
        )
    }

    /// Orders that still need vendor attention
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Unconfirmed | OrderStatus::Received)
    }

    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Unconfirmed,
        OrderStatus::Received,
        OrderStatus::Shipped,
        OrderStatus::CancelledByVendor,
        OrderStatus::CancelledByBuyer,
    ];
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Unconfirmed => write!(f, "Unconfirmed"),
            OrderStatus::Received => write!(f, "Received"),
            OrderStatus::Shipped => write!(f, "Shipped"),
            OrderStatus::CancelledByVendor => write!(f, "Cancelled by vendor"),
            OrderStatus::CancelledByBuyer => write!(f, "Cancelled by buyer"),
        }
    }
}

/// Per-vendor status of one line item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "line_item_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum LineItemStatus {
    Unconfirmed,
    Accepted,
    Rejected,
    Shipped,
}

impl LineItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineItemStatus::Unconfirmed => "unconfirmed",
            LineItemStatus::Accepted => "accepted",
            LineItemStatus::Rejected => "rejected",
            LineItemStatus::Shipped => "shipped",
        }
    }

    /// Cancel reason to persist alongside this status.
    ///
    /// Only a rejection keeps a reason; a rejection without one stores the
    /// empty string so that a stale reason never survives. Every other
    /// status clears it.
    pub fn retained_cancel_reason(&self, reason: Option<String>) -> Option<String> {
        match self {
            LineItemStatus::Rejected => Some(reason.unwrap_or_default()),
            _ => None,
        }
    }
}

impl std::fmt::Display for LineItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineItemStatus::Unconfirmed => write!(f, "Unconfirmed"),
            LineItemStatus::Accepted => write!(f, "Accepted"),
            LineItemStatus::Rejected => write!(f, "Rejected"),
            LineItemStatus::Shipped => write!(f, "Shipped"),
        }
    }
}

/// How the buyer pays on delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
}

/// Order-level signal produced by a line-item status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOutcome {
    /// Every line item is accepted
    AllAccepted,
    /// Every line item has shipped
    AllShipped,
    /// This change rejected an item and no blanket condition holds
    PartialRejection,
}

impl AggregateOutcome {
    /// Status the order row is overwritten with, if any
    pub fn derived_status(&self) -> Option<OrderStatus> {
        match self {
            AggregateOutcome::AllAccepted => Some(OrderStatus::Received),
            AggregateOutcome::AllShipped => Some(OrderStatus::Shipped),
            AggregateOutcome::PartialRejection => None,
        }
    }

    /// Audit/notification message for an order
    pub fn message(&self, order_number: &OrderNumber) -> String {
        let short = order_number.last_four();
        match self {
            AggregateOutcome::AllAccepted => format!(
                "Order ({}) status automatically updated to {}",
                short,
                OrderStatus::Received
            ),
            AggregateOutcome::AllShipped => format!(
                "Order ({}) status automatically updated to {}",
                short,
                OrderStatus::Shipped
            ),
            AggregateOutcome::PartialRejection => format!(
                "Order ({}) has a vendor that could not fulfil part of the order",
                short
            ),
        }
    }
}

/// Derive the order-level signal from the post-update line-item statuses.
///
/// Precedence is fixed: all-accepted, then all-shipped, then a rejection
/// made by this very change. A mixed state that satisfies none of these
/// yields nothing, even if some items were rejected earlier.
pub fn aggregate_line_items(
    statuses: &[LineItemStatus],
    requested: LineItemStatus,
) -> Option<AggregateOutcome> {
    if statuses.is_empty() {
        return None;
    }

    if statuses.iter().all(|s| *s == LineItemStatus::Accepted) {
        Some(AggregateOutcome::AllAccepted)
    } else if statuses.iter().all(|s| *s == LineItemStatus::Shipped) {
        Some(AggregateOutcome::AllShipped)
    } else if requested == LineItemStatus::Rejected {
        Some(AggregateOutcome::PartialRejection)
    } else {
        None
    }
}

/// Evaluate one line-item change against its order.
///
/// A write of the status the item already had is not a transition and
/// never produces an order-level signal. Cancelled orders are terminal
/// and ignore line-item activity.
pub fn evaluate_line_item_change(
    previous: LineItemStatus,
    requested: LineItemStatus,
    order_status: OrderStatus,
    statuses_after: &[LineItemStatus],
) -> Option<AggregateOutcome> {
    if previous == requested || order_status.is_cancellation() {
        return None;
    }
    aggregate_line_items(statuses_after, requested)
}

/// Total price captured at order time
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Human-facing order number: `YYMM` followed by a 5-digit monthly sequence
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderNumberError {
    #[error("order number must be 9 digits")]
    InvalidFormat,
    #[error("order number month out of range")]
    InvalidMonth,
    #[error("monthly sequence {0} does not fit in 5 digits")]
    SequenceOverflow(u32),
    #[error("monthly counter holds an invalid value {0}")]
    InvalidSequence(i32),
}

impl OrderNumber {
    pub const SEQUENCE_MAX: u32 = 99_999;

    /// Build the number for the `sequence`-th order of the month containing `date`
    pub fn new(date: NaiveDate, sequence: u32) -> Result<Self, OrderNumberError> {
        if sequence == 0 || sequence > Self::SEQUENCE_MAX {
            return Err(OrderNumberError::SequenceOverflow(sequence));
        }
        Ok(Self(format!(
            "{}{:05}",
            Self::month_prefix(date),
            sequence
        )))
    }

    /// Number for a monthly counter value as stored by the database
    pub fn from_counter(date: NaiveDate, last_sequence: i32) -> Result<Self, OrderNumberError> {
        let sequence = u32::try_from(last_sequence)
            .map_err(|_| OrderNumberError::InvalidSequence(last_sequence))?;
        Self::new(date, sequence)
    }

    /// `YYMM` prefix for a date
    pub fn month_prefix(date: NaiveDate) -> String {
        format!("{:02}{:02}", date.year().rem_euclid(100), date.month())
    }

    /// `YYYY-MM` key used to bucket orders by calendar month
    pub fn month_key(date: NaiveDate) -> String {
        format!("{:04}-{:02}", date.year(), date.month())
    }

    /// Calendar date an order placed at `now` is numbered under
    pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
        now.with_timezone(&offset).date_naive()
    }

    pub fn parse(value: &str) -> Result<Self, OrderNumberError> {
        if value.len() != 9 || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(OrderNumberError::InvalidFormat);
        }
        let month: u32 = value[2..4]
            .parse()
            .map_err(|_| OrderNumberError::InvalidFormat)?;
        if !(1..=12).contains(&month) {
            return Err(OrderNumberError::InvalidMonth);
        }
        Ok(Self(value.to_string()))
    }

    /// Last four digits, used in short status messages
    pub fn last_four(&self) -> &str {
        &self.0[self.0.len() - 4..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One vendor's product quantity within an order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub total_price: Decimal,
    pub status: LineItemStatus,
    pub cancel_reason: Option<String>,
}

/// Immutable audit record of an order-level status change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeLogEntry {
    pub order_number: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub operator_id: String,
    pub operator_name: String,
}

/// Payload published to live clients after a qualifying transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusEvent {
    pub order_number: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub operator_id: String,
    pub operator_name: String,
}

impl From<StatusChangeLogEntry> for OrderStatusEvent {
    fn from(entry: StatusChangeLogEntry) -> Self {
        Self {
            order_number: entry.order_number,
            message: entry.message,
            timestamp: entry.created_at,
            operator_id: entry.operator_id,
            operator_name: entry.operator_name,
        }
    }
}

/// Name recorded when the operator cannot be resolved
pub const UNKNOWN_OPERATOR: &str = "unknown operator";
