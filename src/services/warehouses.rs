use crate::{
    db::DbPool,
    entities::{
        item::ItemCategory,
        warehouse::{self, Entity as Warehouse},
    },
    errors::ServiceError,
};
use sea_orm::EntityTrait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Read-side access to the warehouse table.
#[derive(Clone)]
pub struct WarehouseService {
    db: Arc<DbPool>,
}

impl WarehouseService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn get(&self, warehouse_id: Uuid) -> Result<warehouse::Model, ServiceError> {
        Warehouse::find_by_id(warehouse_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Warehouse {} not found", warehouse_id))
            })
    }

    /// Loads the registry snapshot used by resolution.
    ///
    /// A missing or duplicated category default is a deployment mistake, so
    /// it fails here, at startup, rather than inside some later sale.
    #[instrument(skip(self))]
    pub async fn load_registry(&self) -> Result<WarehouseRegistry, ServiceError> {
        let all = Warehouse::find().all(self.db.as_ref()).await?;
        WarehouseRegistry::from_warehouses(all)
    }
}

/// In-memory snapshot of the active warehouses and their category defaults.
///
/// Resolution and balance queries only ever see active warehouses through
/// this; inactive warehouses keep their historical movements and still
/// replay during recomputation.
#[derive(Debug, Clone)]
pub struct WarehouseRegistry {
    active: Vec<warehouse::Model>,
    defaults: HashMap<ItemCategory, Uuid>,
}

impl WarehouseRegistry {
    pub fn from_warehouses(all: Vec<warehouse::Model>) -> Result<Self, ServiceError> {
        let active: Vec<warehouse::Model> =
            all.into_iter().filter(|w| w.is_active()).collect();

        let mut defaults = HashMap::new();
        for warehouse in &active {
            if let Some(category) = warehouse.default_for_category {
                if defaults.insert(category, warehouse.id).is_some() {
                    return Err(ServiceError::Configuration(format!(
                        "More than one active default warehouse configured for category '{}'",
                        category
                    )));
                }
            }
        }

        for category in [ItemCategory::Ingredient, ItemCategory::Product] {
            if !defaults.contains_key(&category) {
                return Err(ServiceError::Configuration(format!(
                    "No active default warehouse configured for category '{}'",
                    category
                )));
            }
        }

        Ok(Self { active, defaults })
    }

    /// The deduction target of last resort for an item of this category.
    /// Always present: the constructor rejects registries without a full
    /// default mapping.
    pub fn default_warehouse_for(&self, category: ItemCategory) -> Uuid {
        self.defaults[&category]
    }

    pub fn list_active(&self) -> &[warehouse::Model] {
        &self.active
    }

    pub fn is_active(&self, warehouse_id: Uuid) -> bool {
        self.active.iter().any(|w| w.id == warehouse_id)
    }

    pub fn get_active(&self, warehouse_id: Uuid) -> Option<&warehouse::Model> {
        self.active.iter().find(|w| w.id == warehouse_id)
    }
}
