//! Shared harness for integration tests: in-memory SQLite, migrations, and
//! seed helpers for catalog and warehouse rows.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use sea_orm_migration::MigratorTrait;
use tavola_stock::{
    config::AppConfig,
    db::{self, DbConfig, DbPool},
    entities::{
        item::{self, ItemCategory, ItemStatus},
        recipe, recipe_line,
        warehouse::{self, WarehouseStatus},
    },
    events,
    migrator::Migrator,
    AppState,
};
use uuid::Uuid;

/// Fresh migrated in-memory database. A single pooled connection keeps the
/// in-memory database alive for the whole test.
pub async fn connect() -> Arc<DbPool> {
    let conn = db::establish_connection_with_config(&DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .expect("connect to in-memory sqlite");

    Migrator::up(&conn, None).await.expect("run migrations");
    Arc::new(conn)
}

/// Wires the service graph over a seeded database. Seed warehouses first:
/// registry validation runs here and requires a default per category.
pub async fn build_state(db: Arc<DbPool>) -> AppState {
    let (event_sender, event_rx) = events::event_channel(1024);
    // Drain events so senders never block mid-test.
    let _ = events::spawn_event_logger(event_rx);

    AppState::with_connection(db, AppConfig::new("sqlite::memory:".to_string()), event_sender)
        .await
        .expect("wire services")
}

pub async fn seed_warehouse(
    db: &DbPool,
    name: &str,
    status: WarehouseStatus,
    default_for: Option<ItemCategory>,
) -> warehouse::Model {
    warehouse::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        status: Set(status),
        default_for_category: Set(default_for),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("insert warehouse")
}

/// The usual two-warehouse layout: "Ingredients" is the ingredient default,
/// "Goods" the product default.
pub async fn seed_default_warehouses(db: &DbPool) -> (warehouse::Model, warehouse::Model) {
    let ingredients = seed_warehouse(
        db,
        "Ingredients",
        WarehouseStatus::Active,
        Some(ItemCategory::Ingredient),
    )
    .await;
    let goods = seed_warehouse(
        db,
        "Goods",
        WarehouseStatus::Active,
        Some(ItemCategory::Product),
    )
    .await;
    (ingredients, goods)
}

pub async fn seed_item(db: &DbPool, name: &str, category: ItemCategory) -> item::Model {
    seed_item_with_status(db, name, category, ItemStatus::Active).await
}

pub async fn seed_item_with_status(
    db: &DbPool,
    name: &str,
    category: ItemCategory,
    status: ItemStatus,
) -> item::Model {
    item::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        category: Set(category),
        status: Set(status),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("insert item")
}

/// Recipe for `product_id` consuming the given (ingredient id, quantity per
/// unit) lines in order.
pub async fn seed_recipe(
    db: &DbPool,
    product_id: Uuid,
    lines: &[(Uuid, Decimal)],
) -> recipe::Model {
    let header = recipe::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("insert recipe");

    for (position, (ingredient_id, quantity)) in lines.iter().enumerate() {
        recipe_line::ActiveModel {
            id: Set(Uuid::new_v4()),
            recipe_id: Set(header.id),
            ingredient_id: Set(*ingredient_id),
            quantity_per_unit: Set(*quantity),
            position: Set(position as i32),
        }
        .insert(db)
        .await
        .expect("insert recipe line");
    }

    header
}

/// Flips a warehouse to inactive directly, the way the admin surface would.
pub async fn deactivate_warehouse(db: &DbPool, warehouse: warehouse::Model) {
    let mut active: warehouse::ActiveModel = warehouse.into();
    active.status = Set(WarehouseStatus::Inactive);
    active.updated_at = Set(Utc::now());
    active.update(db).await.expect("deactivate warehouse");
}
