// Catalog and warehouse lookups
pub mod catalog;
pub mod warehouses;

// Ledger: append-only movement log and derived balance projection
pub mod balances;
pub mod movements;

// Resolution and recomputation engine
pub mod recompute;
pub mod stock;
