use std::{collections::HashSet, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use shop_common::Money;
use sqlx::{sqlite::SqliteRow, types::Json, FromRow, Row, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        UserId        ---------------------------------------------------------
/// Opaque internal user id, as supplied by the authenticating boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(pub String);

impl<S: Into<String>> From<S> for UserId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------          Role        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Staff => write!(f, "staff"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "user" => Ok(Self::Customer),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            _ => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------         Caller       ---------------------------------------------------------
/// The identity behind a request, as established by the boundary layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new<S: Into<String>>(user_id: S, role: Role) -> Self {
        Self { user_id: UserId::from(user_id), role }
    }

    pub fn owns(&self, order: &Order) -> bool {
        self.user_id == order.user_id
    }
}

//--------------------------------------         Item         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    /// Units available for sale. Never negative.
    pub quantity: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn can_supply(&self, quantity: i64) -> bool {
        self.is_active && self.quantity >= quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub is_active: bool,
}

impl NewItem {
    pub fn new<S: Into<String>>(sku: S, name: S, unit_price: Money, quantity: i64) -> Self {
        Self { sku: sku.into(), name: name.into(), unit_price, quantity, is_active: true }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Catalog edits. Quantity is absent: stock only moves through the inventory ledger.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub unit_price: Option<Money>,
    pub is_active: Option<bool>,
}

impl ItemUpdate {
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_unit_price(mut self, price: Money) -> Self {
        self.unit_price = Some(price);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.unit_price.is_none() && self.is_active.is_none()
    }
}

//--------------------------------------     ItemQuantity     ---------------------------------------------------------
/// A request for `quantity` units of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuantity {
    pub item_id: i64,
    pub quantity: i64,
}

impl ItemQuantity {
    pub fn new(item_id: i64, quantity: i64) -> Self {
        Self { item_id, quantity }
    }
}

/// Combines repeated item ids into a single line, keeping the order in which each id first appeared.
pub fn merge_item_quantities(lines: &[ItemQuantity]) -> Vec<ItemQuantity> {
    let mut merged: Vec<ItemQuantity> = Vec::with_capacity(lines.len());
    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        if seen.insert(line.item_id) {
            merged.push(*line);
        } else if let Some(existing) = merged.iter_mut().find(|l| l.item_id == line.item_id) {
            existing.quantity += line.quantity;
        }
    }
    merged
}

//--------------------------------------  InventoryAdjustment  --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct InventoryAdjustment {
    pub id: i64,
    pub item_id: i64,
    /// Negative for reservations, positive for restocks
    pub delta: i64,
    pub operator: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   OrderStatusType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// Newly created. Stock is reserved and payment has not completed.
    Pending,
    /// Payment has been received and the order is being prepared.
    Processing,
    Shipped,
    Delivered,
    /// Cancelled before shipping. Reserved stock has been returned.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Processing => write!(f, "processing"),
            OrderStatusType::Shipped => write!(f, "shipped"),
            OrderStatusType::Delivered => write!(f, "delivered"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------  PaymentStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatusType {
    Pending,
    Paid,
    Failed,
    /// Reserved. Nothing in this crate moves a payment to `Refunded` yet.
    Refunded,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::Pending => write!(f, "pending"),
            PaymentStatusType::Paid => write!(f, "paid"),
            PaymentStatusType::Failed => write!(f, "failed"),
            PaymentStatusType::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------      OrderNumber     ---------------------------------------------------------
/// The human-readable order reference, e.g. `ORD-20240501103000-7QK2MZ0A`. Also used as Paymob's merchant order id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("Order number cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        Address       ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub recipient: String,
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub phone: Option<String>,
}

impl Address {
    /// An address is usable when we know the street, city and country.
    pub fn is_complete(&self) -> bool {
        [&self.street, &self.city, &self.country].iter().all(|s| !s.trim().is_empty())
    }
}

//--------------------------------------       OrderLine      ---------------------------------------------------------
/// One line of the priced snapshot taken when the order was created. It is never re-read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: i64,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

impl OrderLine {
    /// Freezes the item's current price into a line. `None` if the line total overflows.
    pub fn from_item(item: &Item, quantity: i64) -> Option<Self> {
        let line_total = item.unit_price.checked_mul(quantity)?;
        Some(Self {
            item_id: item.id,
            sku: item.sku.clone(),
            name: item.name.clone(),
            quantity,
            unit_price: item.unit_price,
            line_total,
        })
    }

    pub fn as_item_quantity(&self) -> ItemQuantity {
        ItemQuantity::new(self.item_id, self.quantity)
    }
}

//--------------------------------------         Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    pub items: Vec<OrderLine>,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub currency: String,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    /// Paymob's id for this order, set once at the first successful checkout.
    pub gateway_order_id: Option<i64>,
    pub gateway_integration_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn reserved_items(&self) -> Vec<ItemQuantity> {
        self.items.iter().map(OrderLine::as_item_quantity).collect()
    }

    /// `total == subtotal + shipping + tax - discount`
    pub fn totals_are_consistent(&self) -> bool {
        let subtotal = self.items.iter().map(|l| l.line_total).sum::<Money>();
        subtotal == self.subtotal && self.total == self.subtotal + self.shipping + self.tax - self.discount
    }
}

impl<'r> FromRow<'r, SqliteRow> for Order {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let Json(items) = row.try_get::<Json<Vec<OrderLine>>, _>("items")?;
        let Json(shipping_address) = row.try_get::<Json<Address>, _>("shipping_address")?;
        let billing_address = row.try_get::<Option<Json<Address>>, _>("billing_address")?.map(|j| j.0);
        Ok(Self {
            id: row.try_get("id")?,
            order_number: row.try_get("order_number")?,
            user_id: row.try_get("user_id")?,
            status: row.try_get("status")?,
            payment_status: row.try_get("payment_status")?,
            items,
            subtotal: row.try_get("subtotal")?,
            shipping: row.try_get("shipping")?,
            tax: row.try_get("tax")?,
            discount: row.try_get("discount")?,
            total: row.try_get("total")?,
            currency: row.try_get("currency")?,
            shipping_address,
            billing_address,
            gateway_order_id: row.try_get("gateway_order_id")?,
            gateway_integration_id: row.try_get("gateway_integration_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

//--------------------------------------       NewOrder       ---------------------------------------------------------
/// A fully priced order, ready to be persisted together with its stock reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub items: Vec<OrderLine>,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub currency: String,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
}

impl NewOrder {
    pub fn reserved_items(&self) -> Vec<ItemQuantity> {
        self.items.iter().map(OrderLine::as_item_quantity).collect()
    }
}

//--------------------------------------  PaymentTransaction  ---------------------------------------------------------
/// A row in the idempotency ledger. One per Paymob transaction id, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: i64,
    pub order_id: i64,
    pub success: bool,
    pub pending: bool,
    pub amount_cents: i64,
    pub currency: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for PaymentTransaction {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let Json(payload) = row.try_get::<Json<serde_json::Value>, _>("payload")?;
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            success: row.try_get("success")?,
            pending: row.try_get("pending")?,
            amount_cents: row.try_get("amount_cents")?,
            currency: row.try_get("currency")?,
            payload,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPaymentTransaction {
    /// Paymob's transaction id
    pub id: i64,
    pub order_id: i64,
    pub success: bool,
    pub pending: bool,
    pub amount_cents: i64,
    pub currency: String,
    /// The verified callback body, as received
    pub payload: serde_json::Value,
}
