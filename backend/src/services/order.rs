//! Order lifecycle: creation from the cart, status changes and order views
//!
//! Order creation and line-item status changes each run in a single
//! transaction. The monthly order number is reserved through a counter row
//! so two concurrent checkouts can never share a number. Audit entries and
//! live events are written after commit; failing to write them never undoes
//! a status change.

use chrono::{FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::config::OrderConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{
    cart_product_ids, evaluate_line_item_change, line_total, AggregateOutcome, BuyerOrderView,
    CartLine, LineItemStatus, LineItemView, OrderLineItem, OrderNumber, OrderRow, OrderStatus,
    OrderStatusEvent, PaymentMethod, Product, StaffOrderRow, StaffOrderView, StatusChangeLogEntry,
    UserRole,
};
use crate::services::catalog::fetch_sellable_products;
use crate::services::notification::OrderEventHub;
use crate::services::{CartService, UserService};
use shared::types::{PaginatedResponse, Pagination};

const LINE_ITEM_VIEW_SQL: &str = r#"
    SELECT li.id, li.order_id, li.product_id, p.name AS product_name, li.quantity,
           li.total_price, li.status, li.cancel_reason, p.price, p.vendor_uid,
           u.company_name AS manufacturer_name
    FROM order_line_items li
    JOIN products p ON p.id = li.product_id
    LEFT JOIN users u ON u.uid = p.vendor_uid
    WHERE li.order_id = ANY($1)
    ORDER BY li.id
"#;

#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    utc_offset_secs: i32,
}

/// Delivery and billing details submitted at checkout.
/// Required fields are optional here so that a missing one is reported
/// as a validation error rather than a body parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    pub delivery_date: Option<NaiveDate>,
    pub delivery_time: Option<String>,
    pub phone: Option<String>,
    pub landline: Option<String>,
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub comment: Option<String>,
    pub address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

/// Checkout details after required-field validation
#[derive(Debug, Clone)]
pub struct DeliveryDetails {
    pub delivery_date: NaiveDate,
    pub delivery_time: String,
    pub phone: String,
    pub landline: Option<String>,
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub comment: Option<String>,
    pub address: String,
    pub payment_method: PaymentMethod,
}

fn required_text(value: Option<String>, field: &str, message_zh: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::validation(
            field,
            &format!("{} is required", field),
            message_zh,
        )),
    }
}

impl CreateOrderInput {
    pub fn validate(self) -> AppResult<DeliveryDetails> {
        let delivery_date = self.delivery_date.ok_or_else(|| {
            AppError::validation("deliveryDate", "deliveryDate is required", "請選擇送達日期")
        })?;
        let delivery_time = required_text(self.delivery_time, "deliveryTime", "請選擇送達時間")?;
        let payment_method = self.payment_method.ok_or_else(|| {
            AppError::validation("paymentMethod", "paymentMethod is required", "請選擇付款方式")
        })?;

        Ok(DeliveryDetails {
            delivery_date,
            delivery_time,
            payment_method,
            phone: required_text(self.phone, "phone", "請輸入聯絡電話")?,
            recipient_name: required_text(self.recipient_name, "recipientName", "請輸入收件人")?,
            recipient_phone: required_text(
                self.recipient_phone,
                "recipientPhone",
                "請輸入收件人電話",
            )?,
            address: required_text(self.address, "address", "請輸入送達地址")?,
            landline: self.landline,
            company_name: self.company_name,
            tax_id: self.tax_id,
            comment: self.comment,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetOrderStatusInput {
    /// Human order number
    pub order_id: String,
    pub status: OrderStatus,
    pub cancel_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLineItemStatusInput {
    /// Line-item id
    pub product_id: i64,
    pub status: LineItemStatus,
    pub cancel_reason: Option<String>,
    /// Operator uid; defaults to the caller
    pub uid: Option<Uuid>,
}

/// Result of a line-item status change
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemStatusResult {
    pub line_item: OrderLineItem,
    pub order_number: String,
    pub order_status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub delivery_date: Option<NaiveDate>,
    pub user_name: Option<String>,
    pub order_number: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl OrderFilter {
    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(self.page, self.limit)
    }
}

/// Which statuses a list view is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    Any,
    Incomplete,
    Completed,
}

impl OrderScope {
    fn statuses(&self) -> Option<Vec<String>> {
        let open = match self {
            OrderScope::Any => return None,
            OrderScope::Incomplete => true,
            OrderScope::Completed => false,
        };
        Some(
            OrderStatus::ALL
                .iter()
                .filter(|s| s.is_open() == open)
                .map(|s| s.as_str().to_string())
                .collect(),
        )
    }
}

/// Checks made before any write. An empty cart is reported before an
/// unavailable product, and both before bad delivery details.
fn check_checkout(
    cart: &[CartLine],
    sellable: &[Product],
    input: CreateOrderInput,
) -> AppResult<DeliveryDetails> {
    if cart.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let all_sellable = cart_product_ids(cart)
        .iter()
        .all(|id| sellable.iter().any(|p| p.id == *id));
    if !all_sellable {
        return Err(AppError::UnavailableProduct);
    }

    input.validate()
}

/// Line item ready to insert, priced at checkout time
#[derive(Debug, Clone, PartialEq)]
struct PricedLine {
    product_id: i64,
    quantity: i32,
    total_price: rust_decimal::Decimal,
}

fn price_lines(cart: &[CartLine], products: &[Product]) -> AppResult<Vec<PricedLine>> {
    cart.iter()
        .map(|line| {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or(AppError::ProductNotFound(line.product_id))?;
            Ok(PricedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                total_price: line_total(product.price, line.quantity),
            })
        })
        .collect()
}

/// Only admins may record a change under another operator's uid
fn resolve_operator(actor: &AuthUser, requested: Option<Uuid>) -> Uuid {
    match requested {
        Some(uid) if actor.is_admin() => uid,
        Some(uid) if uid != actor.uid => {
            tracing::warn!(actor = %actor.uid, requested = %uid, "Ignoring operator uid from request body");
            actor.uid
        }
        _ => actor.uid,
    }
}

#[derive(Debug, FromRow)]
struct LockedOrder {
    id: i64,
    order_number: String,
    buyer_id: i64,
    status: OrderStatus,
}

#[derive(Debug, FromRow)]
struct LockedLineItem {
    status: LineItemStatus,
    vendor_uid: Uuid,
}

impl OrderService {
    pub fn new(db: PgPool, config: &OrderConfig) -> Self {
        Self {
            db,
            utc_offset_secs: config.utc_offset_secs,
        }
    }

    fn utc_offset(&self) -> AppResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_secs).ok_or_else(|| {
            AppError::Internal(format!("Invalid order UTC offset {}", self.utc_offset_secs))
        })
    }

    /// Place an order from the buyer's cart and clear the cart
    pub async fn create_order(
        &self,
        buyer: &AuthUser,
        input: CreateOrderInput,
    ) -> AppResult<OrderRow> {
        let mut tx = self.db.begin().await?;

        let cart = CartService::lines(&mut tx, buyer.user_id).await?;
        let products = if cart.is_empty() {
            Vec::new()
        } else {
            fetch_sellable_products(&mut *tx, &cart_product_ids(&cart)).await?
        };

        let details = check_checkout(&cart, &products, input)?;
        let lines = price_lines(&cart, &products)?;

        let offset = self.utc_offset()?;
        let today = OrderNumber::local_date(Utc::now(), offset);
        let order_number = Self::reserve_order_number(&mut tx, today, offset).await?;

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders AS o (order_number, buyer_id, buyer_uid, delivery_date,
                                     delivery_time_slot, phone, landline, company_name, tax_id,
                                     recipient_name, recipient_phone, address, payment_method,
                                     status, comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {}
            "#,
            OrderRow::COLUMNS
        ))
        .bind(order_number.as_str())
        .bind(buyer.user_id)
        .bind(buyer.uid)
        .bind(details.delivery_date)
        .bind(&details.delivery_time)
        .bind(&details.phone)
        .bind(&details.landline)
        .bind(&details.company_name)
        .bind(&details.tax_id)
        .bind(&details.recipient_name)
        .bind(&details.recipient_phone)
        .bind(&details.address)
        .bind(details.payment_method)
        .bind(OrderStatus::Unconfirmed)
        .bind(&details.comment)
        .fetch_one(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO order_line_items (order_id, product_id, quantity, total_price, status)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.total_price)
            .bind(LineItemStatus::Unconfirmed)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(buyer.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_number = %order.order_number,
            buyer = %buyer.uid,
            line_items = lines.len(),
            "Order created"
        );

        Ok(order)
    }

    /// Next number for the month of `date`. The counter row is seeded from
    /// the month's existing order count, so sequential creation still
    /// yields "orders this month + 1". Months follow `offset`, not UTC.
    async fn reserve_order_number(
        tx: &mut Transaction<'_, Postgres>,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> AppResult<OrderNumber> {
        let month_key = OrderNumber::month_key(date);

        let sequence = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO order_number_counters (month_key, last_sequence)
            VALUES (
                $1,
                (SELECT COUNT(*) FROM orders
                 WHERE to_char((created_at AT TIME ZONE 'UTC') + make_interval(secs => $2),
                               'YYYY-MM') = $1) + 1
            )
            ON CONFLICT (month_key)
            DO UPDATE SET last_sequence = order_number_counters.last_sequence + 1
            RETURNING last_sequence
            "#,
        )
        .bind(&month_key)
        .bind(f64::from(offset.local_minus_utc()))
        .fetch_one(&mut **tx)
        .await?;

        Ok(OrderNumber::from_counter(date, sequence)?)
    }

    /// Direct override of an order's status. Never audited or published.
    ///
    /// Buyers may only cancel their own orders; vendors may only touch
    /// orders that contain one of their products.
    pub async fn set_order_status(
        &self,
        actor: &AuthUser,
        input: SetOrderStatusInput,
    ) -> AppResult<OrderStatus> {
        let order_number = OrderNumber::parse(&input.order_id)?;

        let order = sqlx::query_as::<_, LockedOrder>(
            "SELECT id, order_number, buyer_id, status FROM orders WHERE order_number = $1",
        )
        .bind(order_number.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        match actor.role {
            UserRole::Admin => {}
            UserRole::Vendor => {
                if !self.vendor_has_items(order.id, actor.uid).await? {
                    return Err(AppError::InsufficientPermissions);
                }
            }
            UserRole::Customer => {
                if order.buyer_id != actor.user_id
                    || input.status != OrderStatus::CancelledByBuyer
                {
                    return Err(AppError::InsufficientPermissions);
                }
            }
        }

        // A non-cancel status leaves any earlier cancel reason in place
        if input.status.is_cancellation() {
            sqlx::query("UPDATE orders SET status = $2, cancel_reason = $3 WHERE id = $1")
                .bind(order.id)
                .bind(input.status)
                .bind(&input.cancel_reason)
                .execute(&self.db)
                .await?;
        } else {
            sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
                .bind(order.id)
                .bind(input.status)
                .execute(&self.db)
                .await?;
        }

        tracing::info!(
            order_number = %order.order_number,
            from = %order.status,
            to = %input.status,
            actor = %actor.uid,
            "Order status set"
        );

        Ok(input.status)
    }

    async fn vendor_has_items(&self, order_id: i64, vendor_uid: Uuid) -> AppResult<bool> {
        let has = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM order_line_items li
                JOIN products p ON p.id = li.product_id
                WHERE li.order_id = $1 AND p.vendor_uid = $2
            )
            "#,
        )
        .bind(order_id)
        .bind(vendor_uid)
        .fetch_one(&self.db)
        .await?;

        Ok(has)
    }

    /// Change one line item's status and derive the order-level effect
    pub async fn set_line_item_status(
        &self,
        actor: &AuthUser,
        users: &UserService,
        events: &OrderEventHub,
        input: SetLineItemStatusInput,
    ) -> AppResult<LineItemStatusResult> {
        let mut tx = self.db.begin().await?;

        let order_id = sqlx::query_scalar::<_, i64>(
            "SELECT order_id FROM order_line_items WHERE id = $1",
        )
        .bind(input.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order line item".to_string()))?;

        // Order row first, then the item, so concurrent changes to sibling
        // items serialise on the order.
        let order = sqlx::query_as::<_, LockedOrder>(
            "SELECT id, order_number, buyer_id, status FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        let item = sqlx::query_as::<_, LockedLineItem>(
            r#"
            SELECT li.status, p.vendor_uid
            FROM order_line_items li
            JOIN products p ON p.id = li.product_id
            WHERE li.id = $1
            FOR UPDATE OF li
            "#,
        )
        .bind(input.product_id)
        .fetch_one(&mut *tx)
        .await?;

        if !actor.is_admin() && item.vendor_uid != actor.uid {
            return Err(AppError::InsufficientPermissions);
        }

        let line_item = sqlx::query_as::<_, OrderLineItem>(
            r#"
            UPDATE order_line_items SET status = $2, cancel_reason = $3
            WHERE id = $1
            RETURNING id, order_id, product_id, quantity, total_price, status, cancel_reason
            "#,
        )
        .bind(input.product_id)
        .bind(input.status)
        .bind(input.status.retained_cancel_reason(input.cancel_reason))
        .fetch_one(&mut *tx)
        .await?;

        let statuses = sqlx::query_scalar::<_, LineItemStatus>(
            "SELECT status FROM order_line_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order.id)
        .fetch_all(&mut *tx)
        .await?;

        let outcome = evaluate_line_item_change(item.status, input.status, order.status, &statuses);

        let mut order_status = order.status;
        if let Some(derived) = outcome.and_then(|o| o.derived_status()) {
            sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
                .bind(order.id)
                .bind(derived)
                .execute(&mut *tx)
                .await?;
            order_status = derived;
        }

        tx.commit().await?;

        tracing::debug!(
            line_item = line_item.id,
            order_number = %order.order_number,
            from = %item.status,
            to = %input.status,
            outcome = ?outcome,
            "Line item status updated"
        );

        let message = match outcome {
            Some(outcome) => {
                let operator = resolve_operator(actor, input.uid);
                Some(
                    self.record_transition(users, events, &order.order_number, outcome, operator)
                        .await,
                )
            }
            None => None,
        };

        Ok(LineItemStatusResult {
            line_item,
            order_number: order.order_number,
            order_status,
            message,
        })
    }

    /// Write the audit entry and publish the live event. Best-effort: the
    /// status change is already committed, so failures are only logged.
    async fn record_transition(
        &self,
        users: &UserService,
        events: &OrderEventHub,
        order_number: &str,
        outcome: AggregateOutcome,
        operator: Uuid,
    ) -> String {
        let message = match OrderNumber::parse(order_number) {
            Ok(number) => outcome.message(&number),
            Err(_) => format!("Order ({}) status changed", order_number),
        };

        let operator_name = match users.fetch_display_name(operator).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, operator = %operator, "Could not resolve operator name");
                crate::models::UNKNOWN_OPERATOR.to_string()
            }
        };

        let entry = StatusChangeLogEntry {
            order_number: order_number.to_string(),
            message: message.clone(),
            created_at: Utc::now(),
            operator_id: operator.to_string(),
            operator_name,
        };

        if let Err(e) = sqlx::query(
            r#"
            INSERT INTO order_status_log (order_number, message, created_at, operator_id, operator_name)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&entry.order_number)
        .bind(&entry.message)
        .bind(entry.created_at)
        .bind(&entry.operator_id)
        .bind(&entry.operator_name)
        .execute(&self.db)
        .await
        {
            tracing::warn!(error = %e, order_number = %order_number, "Failed to write order status log");
        }

        let delivered = events.publish(OrderStatusEvent::from(entry));
        tracing::debug!(order_number = %order_number, delivered, "Order status event published");

        message
    }

    /// Buyer's own orders, shipped first then newest
    pub async fn list_buyer_orders(
        &self,
        buyer_id: i64,
        filter: &OrderFilter,
        scope: OrderScope,
    ) -> AppResult<PaginatedResponse<BuyerOrderView>> {
        let pagination = filter.pagination();
        let statuses = scope.statuses();

        let orders = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {} FROM orders o
            WHERE o.buyer_id = $1
              AND ($2::order_status IS NULL OR o.status = $2)
              AND ($3::DATE IS NULL OR o.delivery_date = $3)
              AND ($4::TEXT IS NULL OR o.recipient_name = $4)
              AND ($5::TEXT IS NULL OR o.order_number = $5)
              AND ($6::TEXT[] IS NULL OR o.status::TEXT = ANY($6))
            ORDER BY CASE WHEN o.status = 'shipped' THEN 1 ELSE 2 END, o.id DESC
            LIMIT $7 OFFSET $8
            "#,
            OrderRow::COLUMNS
        ))
        .bind(buyer_id)
        .bind(filter.status)
        .bind(filter.delivery_date)
        .bind(&filter.user_name)
        .bind(&filter.order_number)
        .bind(&statuses)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM orders o
            WHERE o.buyer_id = $1
              AND ($2::order_status IS NULL OR o.status = $2)
              AND ($3::DATE IS NULL OR o.delivery_date = $3)
              AND ($4::TEXT IS NULL OR o.recipient_name = $4)
              AND ($5::TEXT IS NULL OR o.order_number = $5)
              AND ($6::TEXT[] IS NULL OR o.status::TEXT = ANY($6))
            "#,
        )
        .bind(buyer_id)
        .bind(filter.status)
        .bind(filter.delivery_date)
        .bind(&filter.user_name)
        .bind(&filter.order_number)
        .bind(&statuses)
        .fetch_one(&self.db)
        .await?;

        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let mut items = self.line_items(&ids).await?;

        let data = orders
            .into_iter()
            .map(|order| {
                let products = take_items(&mut items, order.id);
                BuyerOrderView { order, products }
            })
            .collect();

        Ok(PaginatedResponse::new(data, pagination, total))
    }

    /// Vendor or admin view, ordered by how urgently an order needs attention.
    /// Vendors see only orders with their products, and only those line items.
    pub async fn list_staff_orders(
        &self,
        actor: &AuthUser,
        filter: &OrderFilter,
        scope: OrderScope,
    ) -> AppResult<PaginatedResponse<StaffOrderView>> {
        let pagination = filter.pagination();
        let statuses = scope.statuses();
        let vendor_scope = (!actor.is_admin()).then_some(actor.uid);
        let number_pattern = filter.order_number.as_ref().map(|n| format!("%{}%", n));

        let orders = sqlx::query_as::<_, StaffOrderRow>(&format!(
            r#"
            SELECT {}, u.account AS user_account, u.name AS user_name,
                   u.phone_number AS user_phone_number
            FROM orders o
            LEFT JOIN users u ON u.id = o.buyer_id
            WHERE ($1::UUID IS NULL OR EXISTS(
                      SELECT 1 FROM order_line_items li
                      JOIN products p ON p.id = li.product_id
                      WHERE li.order_id = o.id AND p.vendor_uid = $1))
              AND ($2::order_status IS NULL OR o.status = $2)
              AND ($3::DATE IS NULL OR o.delivery_date = $3)
              AND ($4::TEXT IS NULL OR u.account = $4)
              AND ($5::TEXT IS NULL OR o.order_number LIKE $5)
              AND ($6::TEXT[] IS NULL OR o.status::TEXT = ANY($6))
            ORDER BY CASE o.status
                         WHEN 'unconfirmed' THEN 1
                         WHEN 'received' THEN 2
                         WHEN 'shipped' THEN 3
                         ELSE 4
                     END,
                     o.id DESC
            LIMIT $7 OFFSET $8
            "#,
            OrderRow::COLUMNS
        ))
        .bind(vendor_scope)
        .bind(filter.status)
        .bind(filter.delivery_date)
        .bind(&filter.user_name)
        .bind(&number_pattern)
        .bind(&statuses)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM orders o
            LEFT JOIN users u ON u.id = o.buyer_id
            WHERE ($1::UUID IS NULL OR EXISTS(
                      SELECT 1 FROM order_line_items li
                      JOIN products p ON p.id = li.product_id
                      WHERE li.order_id = o.id AND p.vendor_uid = $1))
              AND ($2::order_status IS NULL OR o.status = $2)
              AND ($3::DATE IS NULL OR o.delivery_date = $3)
              AND ($4::TEXT IS NULL OR u.account = $4)
              AND ($5::TEXT IS NULL OR o.order_number LIKE $5)
              AND ($6::TEXT[] IS NULL OR o.status::TEXT = ANY($6))
            "#,
        )
        .bind(vendor_scope)
        .bind(filter.status)
        .bind(filter.delivery_date)
        .bind(&filter.user_name)
        .bind(&number_pattern)
        .bind(&statuses)
        .fetch_one(&self.db)
        .await?;

        let ids: Vec<i64> = orders.iter().map(|o| o.order.id).collect();
        let mut items = self.line_items(&ids).await?;
        if let Some(vendor) = vendor_scope {
            items.retain(|item| item.vendor_uid == vendor);
        }

        let data = orders
            .into_iter()
            .map(|order| {
                let products = take_items(&mut items, order.order.id);
                let manufacturer_name = products
                    .first()
                    .and_then(|item| item.manufacturer_name.clone());
                StaffOrderView {
                    order,
                    products,
                    manufacturer_name,
                }
            })
            .collect();

        Ok(PaginatedResponse::new(data, pagination, total))
    }

    async fn line_items(&self, order_ids: &[i64]) -> AppResult<Vec<LineItemView>> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        let items = sqlx::query_as::<_, LineItemView>(LINE_ITEM_VIEW_SQL)
            .bind(order_ids)
            .fetch_all(&self.db)
            .await?;

        Ok(items)
    }

    /// Audit trail of an order. Buyers may read only their own orders'.
    pub async fn status_log(
        &self,
        actor: &AuthUser,
        order_number: &str,
    ) -> AppResult<Vec<StatusChangeLogEntry>> {
        let order_number = OrderNumber::parse(order_number)?;

        let order = sqlx::query_as::<_, LockedOrder>(
            "SELECT id, order_number, buyer_id, status FROM orders WHERE order_number = $1",
        )
        .bind(order_number.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        match actor.role {
            UserRole::Admin => {}
            UserRole::Vendor => {
                if !self.vendor_has_items(order.id, actor.uid).await? {
                    return Err(AppError::InsufficientPermissions);
                }
            }
            UserRole::Customer => {
                if order.buyer_id != actor.user_id {
                    return Err(AppError::InsufficientPermissions);
                }
            }
        }

        let entries = sqlx::query_as::<_, StatusChangeLogEntry>(
            r#"
            SELECT order_number, message, created_at, operator_id, operator_name
            FROM order_status_log
            WHERE order_number = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_number.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}

/// Remove and return the items belonging to `order_id`, keeping their order
fn take_items(items: &mut Vec<LineItemView>, order_id: i64) -> Vec<LineItemView> {
    let (mine, rest): (Vec<_>, Vec<_>) = std::mem::take(items)
        .into_iter()
        .partition(|item| item.order_id == order_id);
    *items = rest;
    mine
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_input() -> CreateOrderInput {
        CreateOrderInput {
            delivery_date: NaiveDate::from_ymd_opt(2025, 1, 20),
            delivery_time: Some("11:30-12:00".into()),
            phone: Some("0912345678".into()),
            recipient_name: Some("Lin".into()),
            recipient_phone: Some("0912345678".into()),
            address: Some("Taipei".into()),
            payment_method: Some(PaymentMethod::Cash),
            ..Default::default()
        }
    }

    #[test]
    fn test_complete_input_validates() {
        let details = complete_input().validate().unwrap();
        assert_eq!(details.payment_method, PaymentMethod::Cash);
        assert_eq!(details.delivery_time, "11:30-12:00");
    }

    #[test]
    fn test_missing_delivery_date_is_validation_error() {
        let input = CreateOrderInput {
            delivery_date: None,
            ..complete_input()
        };
        match input.validate() {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "deliveryDate"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_blank_delivery_time_is_validation_error() {
        let input = CreateOrderInput {
            delivery_time: Some("  ".into()),
            ..complete_input()
        };
        assert!(matches!(input.validate(), Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_missing_payment_method_is_validation_error() {
        let input = CreateOrderInput {
            payment_method: None,
            ..complete_input()
        };
        match input.validate() {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "paymentMethod"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    fn product(id: i64, price: i64) -> Product {
        Product {
            id,
            name: format!("Bento {}", id),
            price: rust_decimal::Decimal::new(price, 0),
            description: String::new(),
            image: String::new(),
            sell: true,
            category: crate::models::ProductCategory::Japanese,
            vendor_uid: Uuid::nil(),
        }
    }

    fn line(product_id: i64, quantity: i32) -> CartLine {
        CartLine {
            product_id,
            quantity,
        }
    }

    fn actor(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: 7,
            uid: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn test_checkout_rejects_empty_cart() {
        let result = check_checkout(&[], &[product(1, 100)], complete_input());
        assert!(matches!(result, Err(AppError::EmptyCart)));
    }

    #[test]
    fn test_empty_cart_wins_over_missing_details() {
        let result = check_checkout(&[], &[], CreateOrderInput::default());
        assert!(matches!(result, Err(AppError::EmptyCart)));
    }

    #[test]
    fn test_checkout_rejects_delisted_product() {
        // Product 2 is no longer returned as sellable
        let cart = [line(1, 2), line(2, 1)];
        let result = check_checkout(&cart, &[product(1, 100)], complete_input());
        assert!(matches!(result, Err(AppError::UnavailableProduct)));
    }

    #[test]
    fn test_delisted_product_wins_over_missing_delivery_date() {
        let cart = [line(1, 2), line(2, 1)];
        let input = CreateOrderInput {
            delivery_date: None,
            ..complete_input()
        };
        let result = check_checkout(&cart, &[product(1, 100)], input);
        assert!(matches!(result, Err(AppError::UnavailableProduct)));
    }

    #[test]
    fn test_checkout_validates_details_last() {
        let input = CreateOrderInput {
            delivery_date: None,
            ..complete_input()
        };
        match check_checkout(&[line(1, 1)], &[product(1, 100)], input) {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "deliveryDate"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_checkout_accepts_repeated_product_lines() {
        let cart = [line(1, 2), line(1, 3), line(4, 1)];
        let sellable = [product(1, 100), product(4, 60)];
        assert!(check_checkout(&cart, &sellable, complete_input()).is_ok());
    }

    #[test]
    fn test_price_lines_snapshot_checkout_price() {
        let cart = [line(1, 2), line(4, 3)];
        let mut products = vec![product(1, 100), product(4, 60)];

        let priced = price_lines(&cart, &products).unwrap();

        // A later price edit does not touch lines already priced
        products[0].price = rust_decimal::Decimal::new(150, 0);

        assert_eq!(priced[0].total_price, rust_decimal::Decimal::new(200, 0));
        assert_eq!(priced[1].total_price, rust_decimal::Decimal::new(180, 0));
        assert_eq!(priced[1].quantity, 3);
        assert_eq!(
            price_lines(&cart, &products).unwrap()[0].total_price,
            rust_decimal::Decimal::new(300, 0)
        );
    }

    #[test]
    fn test_price_lines_missing_product() {
        let result = price_lines(&[line(9, 1)], &[product(1, 100)]);
        assert!(matches!(result, Err(AppError::ProductNotFound(9))));
    }

    #[test]
    fn test_vendor_cannot_record_as_another_operator() {
        let vendor = actor(UserRole::Vendor);
        let other = Uuid::new_v4();

        assert_eq!(resolve_operator(&vendor, Some(other)), vendor.uid);
        assert_eq!(resolve_operator(&vendor, Some(vendor.uid)), vendor.uid);
        assert_eq!(resolve_operator(&vendor, None), vendor.uid);
    }

    #[test]
    fn test_admin_may_record_as_another_operator() {
        let admin = actor(UserRole::Admin);
        let other = Uuid::new_v4();

        assert_eq!(resolve_operator(&admin, Some(other)), other);
        assert_eq!(resolve_operator(&admin, None), admin.uid);
    }

    #[test]
    fn test_scope_statuses() {
        assert_eq!(OrderScope::Any.statuses(), None);
        assert_eq!(
            OrderScope::Incomplete.statuses().unwrap(),
            vec!["unconfirmed".to_string(), "received".to_string()]
        );
        let completed = OrderScope::Completed.statuses().unwrap();
        assert_eq!(completed.len(), 3);
        assert!(completed.contains(&"shipped".to_string()));
    }

    #[test]
    fn test_take_items_partitions_by_order() {
        let item = |id: i64, order_id: i64| LineItemView {
            id,
            order_id,
            product_id: 1,
            product_name: "Bento".into(),
            quantity: 1,
            total_price: rust_decimal::Decimal::new(100, 0),
            status: LineItemStatus::Unconfirmed,
            cancel_reason: None,
            price: rust_decimal::Decimal::new(100, 0),
            vendor_uid: Uuid::nil(),
            manufacturer_name: None,
        };
        let mut items = vec![item(1, 10), item(2, 11), item(3, 10)];

        let taken = take_items(&mut items, 10);
        assert_eq!(taken.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].order_id, 11);
    }
}
