use crate::{
    entities::{item, stock_movement::MovementType},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        balances::BalanceService,
        catalog::CatalogService,
        movements::{MovementService, NewMovement},
        warehouses::WarehouseRegistry,
    },
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Balance query result for the stock-level display surface.
#[derive(Debug, Clone)]
pub enum BalanceView {
    Single(Decimal),
    PerWarehouse(HashMap<Uuid, Decimal>),
}

/// The resolution engine: expands sales into ingredient consumptions,
/// decides which warehouse each consumption hits, and writes movements and
/// balances in one pass.
#[derive(Clone)]
pub struct StockService {
    catalog: CatalogService,
    movements: MovementService,
    balances: BalanceService,
    registry: Arc<WarehouseRegistry>,
    event_sender: EventSender,
}

impl StockService {
    pub fn new(
        catalog: CatalogService,
        movements: MovementService,
        balances: BalanceService,
        registry: Arc<WarehouseRegistry>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            catalog,
            movements,
            balances,
            registry,
            event_sender,
        }
    }

    /// Picks the warehouse a consumption of this item deducts from.
    ///
    /// Recipes do not pin a warehouse per ingredient, yet stock may
    /// legitimately sit in several locations, so deduction follows where
    /// stock actually is:
    /// 1. active warehouses holding a positive balance; a single candidate
    ///    wins outright,
    /// 2. among several, the item's category default, then the largest
    ///    quantity, then the smallest warehouse id,
    /// 3. with no positive balance anywhere, the category default.
    ///
    /// The tie-break is a total order: identical balance snapshots always
    /// resolve to the same warehouse.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn resolve_warehouse_for_consumption(
        &self,
        item: &item::Model,
    ) -> Result<Uuid, ServiceError> {
        let balances = self.balances.balances_for_item(item.id).await?;
        let mut candidates: Vec<(Uuid, Decimal)> = balances
            .into_iter()
            .filter(|(warehouse_id, quantity)| {
                *quantity > Decimal::ZERO && self.registry.is_active(*warehouse_id)
            })
            .collect();

        let fallback = self.registry.default_warehouse_for(item.category);

        match candidates.len() {
            0 => Ok(fallback),
            1 => Ok(candidates[0].0),
            _ => {
                if candidates.iter().any(|(id, _)| *id == fallback) {
                    return Ok(fallback);
                }
                candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
                Ok(candidates[0].0)
            }
        }
    }

    /// Processes one sold line item: expand, resolve, append, apply.
    ///
    /// All movements are collected before anything is appended, and the batch
    /// append is transactional, so an expansion failure (`NotFound`,
    /// `IncompleteRecipe`) or storage failure leaves zero movements for this
    /// sale's reference. Negative resulting balances are allowed through and
    /// surfaced as `NegativeBalance` events: blocking a real sale on
    /// stock-accounting lag is worse than a temporarily negative number.
    #[instrument(skip(self), fields(%sale_item_id, %quantity_sold, %reference_id))]
    pub async fn process_sale(
        &self,
        sale_item_id: Uuid,
        quantity_sold: Decimal,
        reference_id: Uuid,
    ) -> Result<Vec<Uuid>, ServiceError> {
        if quantity_sold <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Sale quantity must be positive, got {}",
                quantity_sold
            )));
        }

        let components = self.catalog.resolve_sale_item(sale_item_id).await?;

        let mut new_movements = Vec::with_capacity(components.len());
        for component in &components {
            // Each ingredient resolves independently; two ingredients of the
            // same sale may land in different warehouses.
            let warehouse_id = self
                .resolve_warehouse_for_consumption(&component.ingredient)
                .await?;
            new_movements.push(NewMovement {
                movement_type: MovementType::Sale,
                item_id: component.ingredient.id,
                warehouse_id,
                delta: -(component.quantity_per_unit * quantity_sold),
                reference_id: Some(reference_id),
                reverses: None,
                description: None,
            });
        }

        let appended = self.movements.append_batch(new_movements).await?;

        let mut movement_ids = Vec::with_capacity(appended.len());
        for movement in &appended {
            let quantity = self.balances.apply_delta(movement).await?;
            if quantity < Decimal::ZERO {
                self.event_sender
                    .send(Event::NegativeBalance {
                        item_id: movement.item_id,
                        warehouse_id: movement.warehouse_id,
                        quantity,
                        movement_id: movement.id,
                    })
                    .await
                    .map_err(ServiceError::EventError)?;
            }
            movement_ids.push(movement.id);
        }

        self.event_sender
            .send(Event::SaleRecorded {
                reference_id,
                sale_item_id,
                movement_ids: movement_ids.clone(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(
            movements = movement_ids.len(),
            "sale expanded and recorded"
        );
        Ok(movement_ids)
    }

    /// Books received stock (e.g. a supplier delivery) into a warehouse.
    #[instrument(skip(self, description))]
    pub async fn record_receipt(
        &self,
        item_id: Uuid,
        warehouse_id: Uuid,
        quantity: Decimal,
        reference_id: Option<Uuid>,
        description: Option<String>,
    ) -> Result<Uuid, ServiceError> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Receipt quantity must be positive, got {}",
                quantity
            )));
        }
        let item = self.catalog.get_item(item_id).await?;
        self.require_active_warehouse(warehouse_id)?;

        let movement = self
            .movements
            .append(NewMovement {
                movement_type: MovementType::Receipt,
                item_id: item.id,
                warehouse_id,
                delta: quantity,
                reference_id,
                reverses: None,
                description,
            })
            .await?;
        self.balances.apply_delta(&movement).await?;

        self.event_sender
            .send(Event::StockReceived {
                item_id,
                warehouse_id,
                quantity,
                movement_id: movement.id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(movement.id)
    }

    /// Books a manual stocktake. The counted quantity replaces the stored
    /// one indirectly: the difference is appended as an adjustment movement,
    /// keeping the log the only source of truth. Counts matching the current
    /// balance append nothing.
    #[instrument(skip(self, description))]
    pub async fn record_inventory_count(
        &self,
        item_id: Uuid,
        warehouse_id: Uuid,
        counted_quantity: Decimal,
        description: Option<String>,
    ) -> Result<Option<Uuid>, ServiceError> {
        let item = self.catalog.get_item(item_id).await?;
        self.require_active_warehouse(warehouse_id)?;

        let current = self.balances.get(item.id, warehouse_id).await?;
        let delta = counted_quantity - current;
        if delta == Decimal::ZERO {
            return Ok(None);
        }

        let movement = self
            .movements
            .append(NewMovement {
                movement_type: MovementType::InventoryAdjustment,
                item_id: item.id,
                warehouse_id,
                delta,
                reference_id: None,
                reverses: None,
                description,
            })
            .await?;
        self.balances.apply_delta(&movement).await?;

        self.event_sender
            .send(Event::StockCounted {
                item_id,
                warehouse_id,
                counted_quantity,
                delta,
                movement_id: movement.id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(Some(movement.id))
    }

    /// Moves stock between two active warehouses as a pair of transfer
    /// movements appended atomically.
    #[instrument(skip(self, description))]
    pub async fn record_transfer(
        &self,
        item_id: Uuid,
        from_warehouse_id: Uuid,
        to_warehouse_id: Uuid,
        quantity: Decimal,
        description: Option<String>,
    ) -> Result<Vec<Uuid>, ServiceError> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Transfer quantity must be positive, got {}",
                quantity
            )));
        }
        if from_warehouse_id == to_warehouse_id {
            return Err(ServiceError::InvalidOperation(
                "Transfer source and destination warehouses are the same".to_string(),
            ));
        }
        let item = self.catalog.get_item(item_id).await?;
        self.require_active_warehouse(from_warehouse_id)?;
        self.require_active_warehouse(to_warehouse_id)?;

        let reference_id = Uuid::new_v4();
        let appended = self
            .movements
            .append_batch(vec![
                NewMovement {
                    movement_type: MovementType::Transfer,
                    item_id: item.id,
                    warehouse_id: from_warehouse_id,
                    delta: -quantity,
                    reference_id: Some(reference_id),
                    reverses: None,
                    description: description.clone(),
                },
                NewMovement {
                    movement_type: MovementType::Transfer,
                    item_id: item.id,
                    warehouse_id: to_warehouse_id,
                    delta: quantity,
                    reference_id: Some(reference_id),
                    reverses: None,
                    description,
                },
            ])
            .await?;

        let mut movement_ids = Vec::with_capacity(appended.len());
        for movement in &appended {
            let quantity_after = self.balances.apply_delta(movement).await?;
            if quantity_after < Decimal::ZERO {
                self.event_sender
                    .send(Event::NegativeBalance {
                        item_id: movement.item_id,
                        warehouse_id: movement.warehouse_id,
                        quantity: quantity_after,
                        movement_id: movement.id,
                    })
                    .await
                    .map_err(ServiceError::EventError)?;
            }
            movement_ids.push(movement.id);
        }

        self.event_sender
            .send(Event::StockTransferred {
                item_id,
                from_warehouse_id,
                to_warehouse_id,
                quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(movement_ids)
    }

    /// Compensates an existing movement and folds the correction in.
    #[instrument(skip(self, description))]
    pub async fn reverse_movement(
        &self,
        movement_id: Uuid,
        description: Option<String>,
    ) -> Result<Uuid, ServiceError> {
        let reversal = self.movements.reverse(movement_id, description).await?;
        self.balances.apply_delta(&reversal).await?;

        self.event_sender
            .send(Event::MovementReversed {
                original_movement_id: movement_id,
                reversal_movement_id: reversal.id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(reversal.id)
    }

    /// Stock-level display query: one warehouse's quantity, or the item's
    /// whole per-warehouse map restricted to active warehouses.
    pub async fn get_balance(
        &self,
        item_id: Uuid,
        warehouse_id: Option<Uuid>,
    ) -> Result<BalanceView, ServiceError> {
        match warehouse_id {
            Some(warehouse_id) => {
                let quantity = self.balances.get(item_id, warehouse_id).await?;
                Ok(BalanceView::Single(quantity))
            }
            None => {
                let per_warehouse = self
                    .balances
                    .balances_for_item(item_id)
                    .await?
                    .into_iter()
                    .filter(|(warehouse_id, _)| self.registry.is_active(*warehouse_id))
                    .collect();
                Ok(BalanceView::PerWarehouse(per_warehouse))
            }
        }
    }

    fn require_active_warehouse(&self, warehouse_id: Uuid) -> Result<(), ServiceError> {
        if self.registry.get_active(warehouse_id).is_none() {
            return Err(ServiceError::InvalidOperation(format!(
                "Warehouse {} is not active",
                warehouse_id
            )));
        }
        Ok(())
    }
}
