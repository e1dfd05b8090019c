use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Materialized quantity for one (item, warehouse) pair.
///
/// Pure projection of the movement log: it may be dropped and rebuilt at any
/// time. Invariant: `quantity` equals the sum of all movement deltas for the
/// pair. Pairs with zero net movement are kept absent rather than stored as
/// explicit zeros.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub warehouse_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    /// Last movement folded into this row; the idempotence guard for
    /// re-applied movements.
    pub last_movement_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
