//! Engine configuration.
//!
//! Everything is read from `STOREFRONT_*` environment variables. Malformed values are logged and replaced with the
//! defaults, so a typo in the environment never prevents the engine from starting.
use std::{env, str::FromStr};

use chrono::{Duration, FixedOffset, NaiveTime};
use log::*;
use storefront_common::{
    helpers::{non_blank, parse_boolean_flag},
    BasisPoints,
    Naira,
};

use crate::{db_types::WithdrawalActorType, settlement::slot_calendar::SlotCalendar};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// 2.5% of each vendor order total, delivery fee share included.
const DEFAULT_ADMIN_COMMISSION: BasisPoints = BasisPoints::new(250);
const DEFAULT_DEPOSIT_RATE: BasisPoints = BasisPoints::from_percent(10);
const DEFAULT_VENDOR_MIN_WITHDRAWAL_NAIRA: i64 = 100;
const DEFAULT_AFFILIATE_MIN_WITHDRAWAL_NAIRA: i64 = 500;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;
const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub checkout: CheckoutPolicy,
    pub slots: SlotCalendar,
    pub withdrawals: WithdrawalPolicy,
    /// Capacity of each event hook channel
    pub event_buffer_size: usize,
}

/// Rates applied when a cart is split into vendor orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckoutPolicy {
    /// The platform's cut of every vendor order total
    pub admin_commission_rate: BasisPoints,
    /// The share of the subtotal a pickup order pays up front
    pub deposit_rate: BasisPoints,
    /// When true, a checkout that orders more than the current stock of a product is refused. When false (the
    /// default), the sale goes through and stock is floored at zero.
    pub reject_oversell: bool,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            admin_commission_rate: DEFAULT_ADMIN_COMMISSION,
            deposit_rate: DEFAULT_DEPOSIT_RATE,
            reject_oversell: false,
        }
    }
}

/// Minimum withdrawal amounts, per actor type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WithdrawalPolicy {
    pub vendor_minimum: Naira,
    pub affiliate_minimum: Naira,
}

impl WithdrawalPolicy {
    pub fn minimum_for(&self, actor_type: WithdrawalActorType) -> Naira {
        match actor_type {
            WithdrawalActorType::Vendor => self.vendor_minimum,
            WithdrawalActorType::Affiliate => self.affiliate_minimum,
        }
    }
}

impl Default for WithdrawalPolicy {
    fn default() -> Self {
        Self {
            vendor_minimum: Naira::from_naira(DEFAULT_VENDOR_MIN_WITHDRAWAL_NAIRA),
            affiliate_minimum: Naira::from_naira(DEFAULT_AFFILIATE_MIN_WITHDRAWAL_NAIRA),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            checkout: CheckoutPolicy::default(),
            slots: SlotCalendar::default(),
            withdrawals: WithdrawalPolicy::default(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let database_url = non_blank(env::var("STOREFRONT_DATABASE_URL").ok()).unwrap_or_else(|| {
            info!("🪛️ STOREFRONT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = parse_env("STOREFRONT_MAX_CONNECTIONS", defaults.max_connections);
        let checkout = CheckoutPolicy {
            admin_commission_rate: parse_env(
                "STOREFRONT_ADMIN_COMMISSION_PERCENT",
                defaults.checkout.admin_commission_rate,
            ),
            deposit_rate: parse_env("STOREFRONT_DEPOSIT_PERCENT", defaults.checkout.deposit_rate),
            reject_oversell: parse_boolean_flag(env::var("STOREFRONT_REJECT_OVERSELL").ok(), false),
        };
        let withdrawals = WithdrawalPolicy {
            vendor_minimum: Naira::from_naira(parse_env(
                "STOREFRONT_VENDOR_MIN_WITHDRAWAL",
                DEFAULT_VENDOR_MIN_WITHDRAWAL_NAIRA,
            )),
            affiliate_minimum: Naira::from_naira(parse_env(
                "STOREFRONT_AFFILIATE_MIN_WITHDRAWAL",
                DEFAULT_AFFILIATE_MIN_WITHDRAWAL_NAIRA,
            )),
        };
        let slots = configure_slot_calendar(defaults.slots);
        let event_buffer_size = parse_env("STOREFRONT_EVENT_BUFFER_SIZE", defaults.event_buffer_size);
        Self { database_url, max_connections, checkout, slots, withdrawals, event_buffer_size }
    }
}

fn configure_slot_calendar(default: SlotCalendar) -> SlotCalendar {
    let open = parse_env_with("STOREFRONT_SLOT_OPEN", default.open(), parse_time_of_day);
    let close = parse_env_with("STOREFRONT_SLOT_CLOSE", default.close(), parse_time_of_day);
    let minutes = parse_env_with("STOREFRONT_SLOT_MINUTES", default.granularity().num_minutes(), parse_slot_minutes);
    let offset_minutes = parse_env("STOREFRONT_SLOT_UTC_OFFSET_MINUTES", default.utc_offset().local_minus_utc() / 60);
    let offset = offset_minutes.checked_mul(60).and_then(FixedOffset::east_opt).unwrap_or_else(|| {
        error!("🪛️ {offset_minutes} minutes is not a valid UTC offset. Using UTC instead.");
        default.utc_offset()
    });
    SlotCalendar::new(open, close, Duration::minutes(minutes), offset).unwrap_or_else(|e| {
        error!("🪛️ The pickup slot configuration is invalid. {e} Reverting to the default calendar.");
        default
    })
}

/// Slot lengths run from one minute to a whole day.
fn parse_slot_minutes(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().filter(|m| (1..=MINUTES_PER_DAY).contains(m))
}

fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match non_blank(env::var(key).ok()) {
        None => default,
        Some(s) => s.parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {key}. {e} Using the default, {default}, instead.");
            default
        }),
    }
}

fn parse_env_with<T, F>(key: &str, default: T, parse: F) -> T
where
    T: std::fmt::Display,
    F: Fn(&str) -> Option<T>,
{
    match non_blank(env::var(key).ok()) {
        None => default,
        Some(s) => parse(&s).unwrap_or_else(|| {
            error!("🪛️ {s} is not a valid value for {key}. Using the default, {default}, instead.");
            default
        }),
    }
}
