//! Shared fixtures for engine tests.

#![allow(dead_code)]

use std::sync::Arc;

use agrimart_billing::{
    BillingEngine, BillingEvent, FixedClock, NotificationDispatcher, NotifyError,
};
use agrimart_core::{Customer, Money, Percent, Product};
use agrimart_db::{Database, DbConfig};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

pub fn march_5() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap()
}

/// In-memory engine pinned to 5 March 2024.
pub async fn memory_engine() -> (BillingEngine, Arc<FixedClock>) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let clock = Arc::new(FixedClock::new(march_5()));
    let engine = BillingEngine::new(db).with_clock(clock.clone());
    (engine, clock)
}

pub async fn add_product(db: &Database, sku: &str, price: Money, tax: i64, stock: i64) -> Product {
    let product = Product::new(
        sku,
        format!("{} (test)", sku),
        "bag",
        price,
        Percent::from_whole(tax).unwrap(),
    )
    .with_stock(stock);
    db.products().insert(&product).await.unwrap();
    product
}

pub async fn add_customer(db: &Database, name: &str) -> Customer {
    let customer = Customer::new(name);
    db.customers().insert(&customer).await.unwrap();
    customer
}

pub async fn stock_of(db: &Database, product_id: &str) -> i64 {
    db.products()
        .get_by_id(product_id)
        .await
        .unwrap()
        .unwrap()
        .stock
}

pub async fn customer_of(db: &Database, customer_id: &str) -> Customer {
    db.customers()
        .get_by_id(customer_id)
        .await
        .unwrap()
        .unwrap()
}

/// Rejects every event.
pub struct FailingDispatcher;

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn dispatch(&self, _event: &BillingEvent) -> Result<(), NotifyError> {
        Err(NotifyError("sms gateway unreachable".to_string()))
    }
}
