use std::collections::HashMap;

use cucumber::World;
use log::*;
use settlement_engine::{
    config::EngineConfig,
    db_types::{CartLine, OrderId, Withdrawal},
    events::EventProducers,
    test_utils::fixtures::new_test_db,
    CheckoutApi,
    LedgerApi,
    OrderFlowApi,
    SettlementError,
    SlotApi,
    SqliteDatabase,
    WithdrawalApi,
};

#[derive(Default, Debug, World)]
pub struct StorefrontWorld {
    pub system: Option<StorefrontSystem>,
    pub cart: Vec<CartLine>,
    pub affiliate: Option<String>,
    /// The orders of the most recent checkout, by vendor id
    pub orders: HashMap<String, OrderId>,
    pub last_withdrawal: Option<Withdrawal>,
    pub last_error: Option<SettlementError>,
}

#[derive(Debug)]
pub struct StorefrontSystem {
    pub db: SqliteDatabase,
    pub checkout: CheckoutApi<SqliteDatabase>,
    pub flow: OrderFlowApi<SqliteDatabase>,
    pub slots: SlotApi<SqliteDatabase>,
    pub ledger: LedgerApi<SqliteDatabase>,
    pub withdrawals: WithdrawalApi<SqliteDatabase>,
}

impl StorefrontWorld {
    pub fn system(&self) -> &StorefrontSystem {
        self.system.as_ref().expect("Storefront not initialised")
    }

    pub fn order_for(&self, vendor_id: &str) -> OrderId {
        self.orders.get(vendor_id).cloned().unwrap_or_else(|| panic!("No order for vendor {vendor_id}"))
    }

    /// Keeps the error of a failed request for later steps to inspect.
    pub fn record<T>(&mut self, result: Result<T, SettlementError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                debug!("🚀️ Request failed: {e}");
                self.last_error = Some(e);
                None
            },
        }
    }
}

impl StorefrontSystem {
    pub async fn new() -> Self {
        let db = new_test_db().await;
        debug!("🚀️ Created database: {}", db.url());
        let config = EngineConfig::default();
        let producers = EventProducers::default();
        Self {
            checkout: CheckoutApi::new(db.clone(), producers.clone(), config.checkout),
            flow: OrderFlowApi::new(db.clone(), producers.clone()),
            slots: SlotApi::new(db.clone(), producers.clone(), config.slots),
            ledger: LedgerApi::new(db.clone()),
            withdrawals: WithdrawalApi::new(db.clone(), producers, config.withdrawals),
            db,
        }
    }
}
