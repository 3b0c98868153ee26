use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use storefront_common::{BasisPoints, Naira, Secret};
use thiserror::Error;

/// Cart lines without a vendor are grouped under this vendor id.
pub const UNASSIGNED_VENDOR: &str = "unassigned";

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    /// Vendor orders are keyed by their checkout and vendor, so the id is unique per vendor per checkout.
    pub fn for_vendor(checkout_id: &CheckoutId, vendor_id: &str) -> Self {
        Self(format!("{}-{vendor_id}", checkout_id.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       CheckoutId      ---------------------------------------------------------
/// Shared by every vendor order produced from one cart, so the original cart can be reconstructed for receipts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct CheckoutId(pub String);

impl CheckoutId {
    pub fn random() -> Self {
        Self(format!("CHK{:016X}", rand::random::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CheckoutId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for CheckoutId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------     DeliveryMethod    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Pickup,
    Delivery,
}

impl Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMethod::Pickup => write!(f, "pickup"),
            DeliveryMethod::Delivery => write!(f, "delivery"),
        }
    }
}

impl FromStr for DeliveryMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pickup" => Ok(Self::Pickup),
            "delivery" => Ok(Self::Delivery),
            s => Err(ConversionError(format!("Invalid delivery method: {s}"))),
        }
    }
}

//--------------------------------------       Fulfilment      ---------------------------------------------------------
/// How a vendor order reaches the buyer. Pickup orders carry the pickup slot they currently own, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Fulfilment {
    Delivery,
    Pickup { slot: Option<DateTime<Utc>> },
}

impl Fulfilment {
    pub fn new(method: DeliveryMethod) -> Self {
        match method {
            DeliveryMethod::Delivery => Self::Delivery,
            DeliveryMethod::Pickup => Self::Pickup { slot: None },
        }
    }

    pub fn method(&self) -> DeliveryMethod {
        match self {
            Fulfilment::Delivery => DeliveryMethod::Delivery,
            Fulfilment::Pickup { .. } => DeliveryMethod::Pickup,
        }
    }

    pub fn pickup_slot(&self) -> Option<DateTime<Utc>> {
        match self {
            Fulfilment::Pickup { slot } => *slot,
            Fulfilment::Delivery => None,
        }
    }

    pub fn pickup_scheduled(&self) -> bool {
        self.pickup_slot().is_some()
    }

    pub fn pickup_date(&self) -> Option<NaiveDate> {
        self.pickup_slot().map(|t| t.date_naive())
    }

    pub fn pickup_time(&self) -> Option<NaiveTime> {
        self.pickup_slot().map(|t| t.time())
    }
}

//--------------------------------------       PaymentType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// The buyer paid the whole vendor total at checkout
    Full,
    /// The buyer paid a partial deposit and settles the balance at pickup
    Deposit,
}

impl Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentType::Full => write!(f, "full"),
            PaymentType::Deposit => write!(f, "deposit"),
        }
    }
}

impl FromStr for PaymentType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "deposit" => Ok(Self::Deposit),
            s => Err(ConversionError(format!("Invalid payment type: {s}"))),
        }
    }
}

//--------------------------------------       OrderStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    /// The order has been created at checkout
    Pending,
    Processing,
    /// Delivery flow: packed and ready to ship
    Processed,
    Shipped,
    Delivered,
    /// Pickup flow: waiting for the buyer at the booked slot
    PickupReady,
    PickupCompleted,
    /// The order is settled. Funds are released to the vendor.
    Completed,
    Disputed,
    Refunded,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Disputed | Self::Refunded | Self::Cancelled)
    }

    /// Terminal states that void the order's earnings.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Disputed | Self::Refunded | Self::Cancelled)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Processed => "processed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::PickupReady => "pickup-ready",
            OrderStatus::PickupCompleted => "pickup-completed",
            OrderStatus::Completed => "completed",
            OrderStatus::Disputed => "disputed",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "pickup-ready" => Ok(Self::PickupReady),
            "pickup-completed" => Ok(Self::PickupCompleted),
            "completed" => Ok(Self::Completed),
            "disputed" => Ok(Self::Disputed),
            "refunded" => Ok(Self::Refunded),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        CartLine       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub unit_price: Naira,
    pub quantity: i64,
    pub vendor_id: String,
    pub vendor_name: String,
}

impl CartLine {
    pub fn new<S: Into<String>>(product_id: S, unit_price: Naira, quantity: i64, vendor_id: S, vendor_name: S) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id: None,
            unit_price,
            quantity,
            vendor_id: vendor_id.into(),
            vendor_name: vendor_name.into(),
        }
    }

    pub fn with_variant<S: Into<String>>(mut self, variant_id: S) -> Self {
        self.variant_id = Some(variant_id.into());
        self
    }

    /// `unit_price * quantity`, or `None` if that does not fit in kobo.
    pub fn line_total(&self) -> Option<Naira> {
        self.unit_price.checked_mul(self.quantity)
    }

    /// The vendor this line settles to. Lines without a vendor settle to [`UNASSIGNED_VENDOR`].
    pub fn settlement_vendor(&self) -> &str {
        let id = self.vendor_id.trim();
        if id.is_empty() {
            UNASSIGNED_VENDOR
        } else {
            id
        }
    }
}

//--------------------------------------      BuyerContact     ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl BuyerContact {
    pub fn new<S: Into<String>>(name: S, email: S) -> Self {
        Self { name: name.into(), email: email.into(), phone: None }
    }

    pub fn with_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

//--------------------------------------   PaymentConfirmation ---------------------------------------------------------
/// The signal from the payment collaborator that funds for a checkout have been received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub reference: String,
    pub amount_confirmed: Naira,
}

impl PaymentConfirmation {
    pub fn new<S: Into<String>>(reference: S, amount_confirmed: Naira) -> Self {
        Self { reference: reference.into(), amount_confirmed }
    }
}

//--------------------------------------     NewVendorOrder    ---------------------------------------------------------
/// A vendor's slice of a checkout, as computed by the splitter and before it has been stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVendorOrder {
    pub order_id: OrderId,
    pub checkout_id: CheckoutId,
    pub vendor_id: String,
    pub vendor_name: String,
    pub items: Vec<CartLine>,
    pub buyer: BuyerContact,
    pub subtotal: Naira,
    pub delivery_fee_share: Naira,
    pub total: Naira,
    pub fulfilment: Fulfilment,
    pub payment_type: PaymentType,
    pub amount_paid: Naira,
    pub balance_due: Naira,
    pub payment_reference: String,
    pub commission_rate: BasisPoints,
    pub admin_commission: Naira,
    pub vendor_net_amount: Naira,
    pub affiliate_id: Option<String>,
    /// The referring affiliate's rate when the order was placed. Zero if there is no affiliate.
    pub affiliate_commission_rate: BasisPoints,
    pub affiliate_commission: Naira,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       VendorOrder     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorOrder {
    pub id: i64,
    pub order_id: OrderId,
    pub checkout_id: CheckoutId,
    pub vendor_id: String,
    pub vendor_name: String,
    pub items: Vec<CartLine>,
    pub buyer: BuyerContact,
    pub subtotal: Naira,
    pub delivery_fee_share: Naira,
    pub total: Naira,
    pub fulfilment: Fulfilment,
    pub payment_type: PaymentType,
    pub amount_paid: Naira,
    pub balance_due: Naira,
    pub payment_reference: String,
    pub payment_released: bool,
    pub status: OrderStatus,
    pub commission_rate: BasisPoints,
    pub admin_commission: Naira,
    pub vendor_net_amount: Naira,
    pub affiliate_id: Option<String>,
    pub affiliate_commission_rate: BasisPoints,
    /// Fixed at checkout, so later changes to the affiliate's rate never rewrite this order's earnings
    pub affiliate_commission: Naira,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VendorOrder {
    pub fn delivery_method(&self) -> DeliveryMethod {
        self.fulfilment.method()
    }

    pub fn pickup_scheduled(&self) -> bool {
        self.fulfilment.pickup_scheduled()
    }
}

//--------------------------------------     Catalog records   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    pub price: Naira,
    pub stock_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ProductVariant {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub stock_quantity: i64,
}

/// The outcome of decrementing one cart line's stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub requested: i64,
    pub remaining: i64,
}

/// A cart line whose product or variant is not in the catalog. The sale stands; only the stock update is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStockLine {
    pub order_id: OrderId,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: i64,
}

//--------------------------------------         Actors        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Vendor {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Affiliate {
    pub id: String,
    pub name: String,
    /// The affiliate's cut of every order attributed to it
    pub commission_rate: BasisPoints,
    pub created_at: DateTime<Utc>,
}

/// Whose wallet a ledger is derived for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum LedgerActor {
    Vendor(String),
    Affiliate(String),
    /// The storefront operator, who earns the admin commission on every order
    Platform,
}

impl Display for LedgerActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerActor::Vendor(id) => write!(f, "vendor:{id}"),
            LedgerActor::Affiliate(id) => write!(f, "affiliate:{id}"),
            LedgerActor::Platform => write!(f, "platform"),
        }
    }
}

/// The party performing an order status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Operator {
    Admin(String),
    Vendor(String),
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Admin(name) => write!(f, "admin:{name}"),
            Operator::Vendor(id) => write!(f, "vendor:{id}"),
        }
    }
}

//--------------------------------------        TimeSlot       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub starts_at: DateTime<Utc>,
    pub order_id: OrderId,
    pub booked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub starts_at: DateTime<Utc>,
    pub available: bool,
}

//--------------------------------------       Withdrawals     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalActorType {
    Vendor,
    Affiliate,
}

impl Display for WithdrawalActorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalActorType::Vendor => write!(f, "vendor"),
            WithdrawalActorType::Affiliate => write!(f, "affiliate"),
        }
    }
}

impl FromStr for WithdrawalActorType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vendor" => Ok(Self::Vendor),
            "affiliate" => Ok(Self::Affiliate),
            s => Err(ConversionError(format!("Invalid withdrawal actor type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalMethod {
    BankTransfer,
    MobileMoney,
}

impl Display for WithdrawalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalMethod::BankTransfer => write!(f, "bank_transfer"),
            WithdrawalMethod::MobileMoney => write!(f, "mobile_money"),
        }
    }
}

impl FromStr for WithdrawalMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank_transfer" | "bank" => Ok(Self::BankTransfer),
            "mobile_money" => Ok(Self::MobileMoney),
            s => Err(ConversionError(format!("Invalid withdrawal method: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    /// Pending and completed withdrawals both hold funds out of the available balance.
    pub fn reserves_funds(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

impl Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Completed => write!(f, "completed"),
            WithdrawalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for WithdrawalStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            s => Err(ConversionError(format!("Invalid withdrawal status: {s}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub actor_id: String,
    pub actor_type: WithdrawalActorType,
    pub amount: Naira,
    pub method: WithdrawalMethod,
    pub account_details: Secret<String>,
}

impl NewWithdrawal {
    pub fn new<S: Into<String>>(
        actor_type: WithdrawalActorType,
        actor_id: S,
        amount: Naira,
        method: WithdrawalMethod,
        account_details: S,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            actor_type,
            amount,
            method,
            account_details: Secret::new(account_details.into()),
        }
    }

    pub fn ledger_actor(&self) -> LedgerActor {
        match self.actor_type {
            WithdrawalActorType::Vendor => LedgerActor::Vendor(self.actor_id.clone()),
            WithdrawalActorType::Affiliate => LedgerActor::Affiliate(self.actor_id.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: i64,
    pub actor_id: String,
    pub actor_type: WithdrawalActorType,
    pub amount: Naira,
    pub method: WithdrawalMethod,
    pub account_details: Secret<String>,
    pub status: WithdrawalStatus,
    pub request_date: DateTime<Utc>,
    pub processed_date: Option<DateTime<Utc>>,
    pub processed_by: Option<String>,
    pub rejection_reason: Option<String>,
}

impl Withdrawal {
    pub fn belongs_to(&self, actor: &LedgerActor) -> bool {
        match actor {
            LedgerActor::Vendor(id) => self.actor_type == WithdrawalActorType::Vendor && &self.actor_id == id,
            LedgerActor::Affiliate(id) => self.actor_type == WithdrawalActorType::Affiliate && &self.actor_id == id,
            LedgerActor::Platform => false,
        }
    }
}

/// An administrator's decision on a pending withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum WithdrawalDecision {
    Approve,
    Reject { reason: String },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_status_round_trips_through_strings() {
        for s in [
            "pending",
            "processing",
            "processed",
            "shipped",
            "delivered",
            "pickup-ready",
            "pickup-completed",
            "completed",
            "disputed",
            "refunded",
            "cancelled",
        ] {
            let status = s.parse::<OrderStatus>().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("paid".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(!OrderStatus::Completed.is_failure());
        assert!(OrderStatus::Refunded.is_failure());
        assert!(!OrderStatus::PickupCompleted.is_terminal());
    }

    #[test]
    fn lines_without_vendor_are_unassigned() {
        let line = CartLine::new("p1", Naira::from_naira(10), 1, " ", "");
        assert_eq!(line.settlement_vendor(), UNASSIGNED_VENDOR);
        let line = CartLine::new("p1", Naira::from_naira(10), 3, "v1", "Vendor one");
        assert_eq!(line.settlement_vendor(), "v1");
        assert_eq!(line.line_total(), Some(Naira::from_naira(30)));
        let line = CartLine::new("p1", Naira::from_naira(10), i64::MAX, "v1", "Vendor one");
        assert_eq!(line.line_total(), None);
    }

    #[test]
    fn pickup_fields_derive_from_the_slot() {
        let slot = "2030-01-10T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let f = Fulfilment::Pickup { slot: Some(slot) };
        assert!(f.pickup_scheduled());
        assert_eq!(f.pickup_date(), NaiveDate::from_ymd_opt(2030, 1, 10));
        assert_eq!(f.pickup_time(), NaiveTime::from_hms_opt(9, 0, 0));
        assert!(!Fulfilment::new(DeliveryMethod::Pickup).pickup_scheduled());
        assert_eq!(Fulfilment::Delivery.pickup_slot(), None);
    }

    #[test]
    fn order_ids_are_unique_per_vendor_per_checkout() {
        let chk = CheckoutId::from("CHK1");
        assert_eq!(OrderId::for_vendor(&chk, "v9").as_str(), "CHK1-v9");
    }
}
