#![allow(dead_code)]

use cartforge::{
    config::AppConfig,
    entities::{cart, cart_item, coupon, StockStatus},
    events::{Event, EventSender},
    services::ClientCartItem,
};

// SQLite renditions of the entity schemas. The decimal columns are declared
// REAL here; the sea-query SQLite backend cannot emit the 19,4-precision
// decimal type the entities declare for Postgres.
const SCHEMA_DDL: [&str; 3] = [
    r#"CREATE TABLE IF NOT EXISTS carts (
        id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL,
        store_id TEXT,
        store_name TEXT,
        sub_total REAL NOT NULL,
        total REAL NOT NULL,
        saved_amount REAL NOT NULL,
        savings_message TEXT,
        delivery_charges REAL NOT NULL,
        delivery_time_minutes INTEGER NOT NULL,
        discount REAL NOT NULL,
        free_delivery_threshold REAL NOT NULL,
        coupon_id TEXT,
        note TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );"#,
    r#"CREATE TABLE IF NOT EXISTS cart_items (
        id TEXT PRIMARY KEY NOT NULL,
        cart_id TEXT NOT NULL,
        external_id TEXT,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        image_urls TEXT NOT NULL,
        quantity INTEGER NOT NULL,
        original_price REAL NOT NULL,
        discounted_price REAL NOT NULL,
        stock_status TEXT NOT NULL,
        weight REAL NOT NULL,
        weight_unit TEXT NOT NULL,
        recommended INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );"#,
    r#"CREATE TABLE IF NOT EXISTS coupons (
        id TEXT PRIMARY KEY NOT NULL,
        code TEXT NOT NULL UNIQUE,
        discount_type TEXT NOT NULL,
        discount_value REAL NOT NULL,
        start_date TEXT NOT NULL,
        expiry_date TEXT NOT NULL,
        minimum_order_value REAL NOT NULL,
        maximum_order_value REAL,
        usage_limit INTEGER NOT NULL,
        usage_count INTEGER NOT NULL,
        applied_user_ids TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );"#,
];
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseBackend,
    DatabaseConnection, Set, Statement,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Helper harness backed by an in-memory SQLite database with tables created
/// from raw DDL mirroring the entities. Events are drained by a background
/// task so best-effort sends never block.
pub struct TestDb {
    pub db: Arc<DatabaseConnection>,
    pub event_sender: Arc<EventSender>,
    pub config: Arc<AppConfig>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestDb {
    pub async fn new() -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(options)
            .await
            .expect("failed to open in-memory database");

        for sql in SCHEMA_DDL {
            db.execute(Statement::from_string(DatabaseBackend::Sqlite, sql))
                .await
                .expect("failed to create table");
        }

        let (tx, mut rx) = mpsc::channel::<Event>(64);
        let event_task = tokio::spawn(async move { while rx.recv().await.is_some() {} });

        Self {
            db: Arc::new(db),
            event_sender: Arc::new(EventSender::new(tx)),
            config: Arc::new(AppConfig::new("sqlite::memory:", "test")),
            _event_task: event_task,
        }
    }
}

/// Seeds an empty cart owned by `user_id` with the given delivery charge.
pub async fn seed_cart(db: &DatabaseConnection, user_id: Uuid, delivery: Decimal) -> cart::Model {
    cart::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        store_id: Set(Some("store-1".to_string())),
        store_name: Set(Some("Test Store".to_string())),
        sub_total: Set(Decimal::ZERO),
        total: Set(Decimal::ZERO),
        saved_amount: Set(Decimal::ZERO),
        savings_message: Set(None),
        delivery_charges: Set(delivery),
        delivery_time_minutes: Set(30),
        discount: Set(Decimal::ZERO),
        free_delivery_threshold: Set(dec!(199)),
        coupon_id: Set(None),
        note: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("failed to seed cart")
}

/// Seeds a coupon with a currently valid date window.
pub async fn seed_coupon(
    db: &DatabaseConnection,
    code: &str,
    discount_type: &str,
    discount_value: Decimal,
    minimum_order_value: Decimal,
) -> coupon::Model {
    coupon::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code.to_string()),
        discount_type: Set(discount_type.to_string()),
        discount_value: Set(discount_value),
        start_date: Set(Utc::now() - Duration::days(1)),
        expiry_date: Set(Utc::now() + Duration::days(30)),
        minimum_order_value: Set(minimum_order_value),
        maximum_order_value: Set(None),
        usage_limit: Set(100),
        usage_count: Set(0),
        applied_user_ids: Set(serde_json::json!([])),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("failed to seed coupon")
}

/// Seeds a persisted up-sell line on the cart.
pub async fn seed_recommended_item(
    db: &DatabaseConnection,
    cart_id: Uuid,
    external_id: &str,
    original_price: Decimal,
    discounted_price: Decimal,
    quantity: i32,
) -> cart_item::Model {
    cart_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        cart_id: Set(cart_id),
        external_id: Set(Some(external_id.to_string())),
        name: Set(format!("item {external_id}")),
        description: Set("seeded item".to_string()),
        image_urls: Set(serde_json::json!([])),
        quantity: Set(quantity),
        original_price: Set(original_price),
        discounted_price: Set(discounted_price),
        stock_status: Set(StockStatus::InStock),
        weight: Set(0.5),
        weight_unit: Set("kg".to_string()),
        recommended: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("failed to seed cart item")
}

/// Builds a client-submitted target line.
pub fn target(external_id: &str, quantity: f64, original: f64, discounted: f64) -> ClientCartItem {
    ClientCartItem {
        item_external_id: Some(external_id.to_string()),
        item_name: format!("item {external_id}"),
        item_description: "test item".to_string(),
        item_image_url: vec![],
        item_quantity: quantity,
        item_original_price: original,
        item_discounted_price: discounted,
        item_stock_status: "IN_STOCK".to_string(),
        item_weight: 0.5,
        item_weight_unit: "kg".to_string(),
    }
}
