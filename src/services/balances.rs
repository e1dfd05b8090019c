use crate::{
    db::DbPool,
    entities::{
        stock_balance::{self, Entity as StockBalance},
        stock_movement,
    },
    errors::ServiceError,
};
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionError,
    TransactionTrait,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Result of folding a movement sequence for one (item, warehouse) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldedBalance {
    pub quantity: Decimal,
    pub last_movement_id: Uuid,
}

/// The derived balance projection.
///
/// Never hand-edited in steady state: it only changes through
/// [`BalanceService::apply_delta`] (incremental) or
/// [`BalanceService::rebuild_from`] (wholesale replacement after a replay).
#[derive(Clone)]
pub struct BalanceService {
    db: Arc<DbPool>,
    // Serializes read-modify-write per (item, warehouse) pair; updates to
    // different pairs stay concurrent.
    pair_locks: Arc<DashMap<(Uuid, Uuid), Arc<Mutex<()>>>>,
}

impl BalanceService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            db,
            pair_locks: Arc::new(DashMap::new()),
        }
    }

    fn pair_lock(&self, key: (Uuid, Uuid)) -> Arc<Mutex<()>> {
        self.pair_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Current quantity for the pair; absent pairs read as zero.
    pub async fn get(&self, item_id: Uuid, warehouse_id: Uuid) -> Result<Decimal, ServiceError> {
        let balance = StockBalance::find_by_id((item_id, warehouse_id))
            .one(self.db.as_ref())
            .await?;
        Ok(balance.map(|b| b.quantity).unwrap_or(Decimal::ZERO))
    }

    /// Every stored balance for an item, keyed by warehouse.
    pub async fn balances_for_item(
        &self,
        item_id: Uuid,
    ) -> Result<HashMap<Uuid, Decimal>, ServiceError> {
        let rows = StockBalance::find()
            .filter(stock_balance::Column::ItemId.eq(item_id))
            .all(self.db.as_ref())
            .await?;
        Ok(rows.into_iter().map(|b| (b.warehouse_id, b.quantity)).collect())
    }

    pub async fn all(&self) -> Result<Vec<stock_balance::Model>, ServiceError> {
        Ok(StockBalance::find().all(self.db.as_ref()).await?)
    }

    /// Folds one appended movement into its pair's balance.
    ///
    /// Idempotent per movement id: re-applying the movement recorded as the
    /// pair's `last_movement_id` is a no-op. The read-modify-write runs under
    /// the pair lock and a transaction, so concurrent sales hitting the same
    /// pair serialize here instead of losing updates.
    #[instrument(skip(self, movement), fields(movement_id = %movement.id))]
    pub async fn apply_delta(
        &self,
        movement: &stock_movement::Model,
    ) -> Result<Decimal, ServiceError> {
        let lock = self.pair_lock((movement.item_id, movement.warehouse_id));
        let _guard = lock.lock().await;

        let movement = movement.clone();
        self.db
            .transaction::<_, Decimal, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing =
                        StockBalance::find_by_id((movement.item_id, movement.warehouse_id))
                            .one(txn)
                            .await?;

                    match existing {
                        Some(balance) if balance.last_movement_id == movement.id => {
                            debug!(movement_id = %movement.id, "movement already applied");
                            Ok(balance.quantity)
                        }
                        Some(balance) => {
                            let new_quantity = balance.quantity + movement.delta;
                            let mut active: stock_balance::ActiveModel = balance.into();
                            active.quantity = Set(new_quantity);
                            active.last_movement_id = Set(movement.id);
                            active.updated_at = Set(Utc::now());
                            let updated = active.update(txn).await?;
                            Ok(updated.quantity)
                        }
                        None => {
                            let created = stock_balance::ActiveModel {
                                item_id: Set(movement.item_id),
                                warehouse_id: Set(movement.warehouse_id),
                                quantity: Set(movement.delta),
                                last_movement_id: Set(movement.id),
                                updated_at: Set(Utc::now()),
                            }
                            .insert(txn)
                            .await?;
                            Ok(created.quantity)
                        }
                    }
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })
    }

    /// Replaces the entire store with a folded replay.
    ///
    /// Pairs folding to exactly zero are dropped, keeping the store sparse;
    /// `get` reads them back as zero either way. Runs in one transaction so
    /// readers never observe a half-replaced store.
    #[instrument(skip(self, folded), fields(pairs = folded.len()))]
    pub async fn rebuild_from(
        &self,
        folded: &BTreeMap<(Uuid, Uuid), FoldedBalance>,
    ) -> Result<u64, ServiceError> {
        let now = Utc::now();
        let entries: Vec<stock_balance::ActiveModel> = folded
            .iter()
            .filter(|(_, fold)| fold.quantity != Decimal::ZERO)
            .map(|((item_id, warehouse_id), fold)| stock_balance::ActiveModel {
                item_id: Set(*item_id),
                warehouse_id: Set(*warehouse_id),
                quantity: Set(fold.quantity),
                last_movement_id: Set(fold.last_movement_id),
                updated_at: Set(now),
            })
            .collect();
        let count = entries.len() as u64;

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    StockBalance::delete_many().exec(txn).await?;
                    if !entries.is_empty() {
                        StockBalance::insert_many(entries).exec(txn).await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        Ok(count)
    }
}
