//! Tavola Stock Library
//!
//! Stock ledger and balance recomputation engine for the Tavola restaurant
//! platform: an append-only movement log, a derived per-(item, warehouse)
//! balance projection, the warehouse-resolution policy used when consuming
//! recipe ingredients, and full-replay verification/rebuild tooling.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::services::{
    balances::BalanceService,
    catalog::CatalogService,
    movements::MovementService,
    recompute::RecomputeService,
    stock::StockService,
    warehouses::{WarehouseRegistry, WarehouseService},
};

/// The wired service graph.
#[derive(Clone)]
pub struct StockServices {
    pub catalog: CatalogService,
    pub warehouses: WarehouseService,
    pub registry: Arc<WarehouseRegistry>,
    pub movements: MovementService,
    pub balances: BalanceService,
    pub stock: StockService,
    pub recompute: RecomputeService,
}

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: StockServices,
}

impl AppState {
    /// Connects to the database, optionally migrates, loads the warehouse
    /// registry and wires the services. Registry validation happens here so a
    /// misconfigured default warehouse fails the process at startup instead
    /// of failing a sale later.
    pub async fn new(
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Result<Self, ServiceError> {
        let db = db::establish_connection_from_app_config(&config).await?;
        if config.auto_migrate {
            db::run_migrations(&db).await?;
        }
        Self::with_connection(Arc::new(db), config, event_sender).await
    }

    /// Wires the services over an existing connection. Tests use this with
    /// in-memory SQLite after seeding warehouses.
    pub async fn with_connection(
        db: Arc<DbPool>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Result<Self, ServiceError> {
        let catalog = CatalogService::new(db.clone());
        let warehouses = WarehouseService::new(db.clone());
        let registry = Arc::new(warehouses.load_registry().await?);
        let movements = MovementService::new(db.clone());
        let balances = BalanceService::new(db.clone());
        let stock = StockService::new(
            catalog.clone(),
            movements.clone(),
            balances.clone(),
            registry.clone(),
            event_sender.clone(),
        );
        let recompute = RecomputeService::new(
            movements.clone(),
            balances.clone(),
            event_sender.clone(),
            config.recompute_chunk_size,
        );

        Ok(Self {
            db,
            config,
            event_sender,
            services: StockServices {
                catalog,
                warehouses,
                registry,
                movements,
                balances,
                stock,
                recompute,
            },
        })
    }
}
