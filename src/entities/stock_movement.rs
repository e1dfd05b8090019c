use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[derive(strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MovementType {
    #[sea_orm(string_value = "sale")]
    Sale,
    #[sea_orm(string_value = "inventory_adjustment")]
    InventoryAdjustment,
    #[sea_orm(string_value = "receipt")]
    Receipt,
    #[sea_orm(string_value = "transfer")]
    Transfer,
}

/// One signed stock movement. The log is append-only: rows are never edited
/// or deleted, corrections are new movements with inverted deltas and
/// `reverses` pointing at the original. `seq` is assigned by the store and
/// is the total order recomputation replays in.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub seq: i64,
    #[sea_orm(unique)]
    pub id: Uuid,
    pub movement_type: MovementType,
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub delta: Decimal,
    pub reference_id: Option<Uuid>,
    /// Movement this one compensates, when it is a correction.
    pub reverses: Option<Uuid>,
    pub description: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this movement takes stock out of the warehouse.
    pub fn is_consumption(&self) -> bool {
        self.delta < Decimal::ZERO
    }
}
