use crate::{
    db::DbPool,
    entities::stock_movement::{self, Entity as StockMovement, MovementType},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set, TransactionError, TransactionTrait,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// A movement waiting to be appended. The store assigns `seq`, `id` and the
/// timestamp at append time.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub delta: Decimal,
    pub reference_id: Option<Uuid>,
    pub reverses: Option<Uuid>,
    pub description: Option<String>,
}

/// Inclusive timestamp bounds; `None` on either side leaves it open.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn all() -> Self {
        Self::default()
    }
}

/// Append-only access to the movement log.
///
/// There is deliberately no update or delete surface: corrections are
/// compensating movements appended through [`MovementService::reverse`].
#[derive(Clone)]
pub struct MovementService {
    db: Arc<DbPool>,
}

impl MovementService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    fn active_model(movement: NewMovement, now: DateTime<Utc>) -> stock_movement::ActiveModel {
        stock_movement::ActiveModel {
            seq: NotSet,
            id: Set(Uuid::new_v4()),
            movement_type: Set(movement.movement_type),
            item_id: Set(movement.item_id),
            warehouse_id: Set(movement.warehouse_id),
            delta: Set(movement.delta),
            reference_id: Set(movement.reference_id),
            reverses: Set(movement.reverses),
            description: Set(movement.description),
            recorded_at: Set(now),
        }
    }

    fn bounded(mut query: Select<StockMovement>, range: &TimeRange) -> Select<StockMovement> {
        if let Some(from) = range.from {
            query = query.filter(stock_movement::Column::RecordedAt.gte(from));
        }
        if let Some(to) = range.to {
            query = query.filter(stock_movement::Column::RecordedAt.lte(to));
        }
        query
    }

    #[instrument(skip(self, movement), fields(item_id = %movement.item_id, delta = %movement.delta))]
    pub async fn append(
        &self,
        movement: NewMovement,
    ) -> Result<stock_movement::Model, ServiceError> {
        let appended = Self::active_model(movement, Utc::now())
            .insert(self.db.as_ref())
            .await?;
        Ok(appended)
    }

    /// Appends a batch inside one transaction: either every movement lands or
    /// none does. A multi-ingredient sale goes through here so storage
    /// failures never leave some ingredients deducted and others not.
    #[instrument(skip(self, movements), fields(count = movements.len()))]
    pub async fn append_batch(
        &self,
        movements: Vec<NewMovement>,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        if movements.is_empty() {
            return Ok(Vec::new());
        }

        self.db
            .transaction::<_, Vec<stock_movement::Model>, ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let mut appended = Vec::with_capacity(movements.len());
                    for movement in movements {
                        let model = Self::active_model(movement, now).insert(txn).await?;
                        appended.push(model);
                    }
                    Ok(appended)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })
    }

    pub async fn get(&self, movement_id: Uuid) -> Result<stock_movement::Model, ServiceError> {
        StockMovement::find()
            .filter(stock_movement::Column::Id.eq(movement_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Movement {} not found", movement_id)))
    }

    /// Appends a compensating movement with the inverted delta, pointing back
    /// at the original. The original row is never touched.
    #[instrument(skip(self, description))]
    pub async fn reverse(
        &self,
        movement_id: Uuid,
        description: Option<String>,
    ) -> Result<stock_movement::Model, ServiceError> {
        let original = self.get(movement_id).await?;
        self.append(NewMovement {
            movement_type: original.movement_type,
            item_id: original.item_id,
            warehouse_id: original.warehouse_id,
            delta: -original.delta,
            reference_id: original.reference_id,
            reverses: Some(original.id),
            description,
        })
        .await
    }

    pub async fn list_by_warehouse(
        &self,
        warehouse_id: Uuid,
        range: &TimeRange,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        let query = StockMovement::find()
            .filter(stock_movement::Column::WarehouseId.eq(warehouse_id));
        let movements = Self::bounded(query, range)
            .order_by_asc(stock_movement::Column::Seq)
            .all(self.db.as_ref())
            .await?;
        Ok(movements)
    }

    pub async fn list_by_reference(
        &self,
        reference_id: Uuid,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        let movements = StockMovement::find()
            .filter(stock_movement::Column::ReferenceId.eq(reference_id))
            .order_by_asc(stock_movement::Column::Seq)
            .all(self.db.as_ref())
            .await?;
        Ok(movements)
    }

    /// One replay page: movements with `seq` in `(after_seq, ceiling_seq]`,
    /// oldest first. Restartable from any cursor, which is what makes long
    /// recomputation runs resumable.
    pub async fn list_page(
        &self,
        range: &TimeRange,
        after_seq: i64,
        ceiling_seq: i64,
        limit: u64,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        let query = StockMovement::find()
            .filter(stock_movement::Column::Seq.gt(after_seq))
            .filter(stock_movement::Column::Seq.lte(ceiling_seq));
        let movements = Self::bounded(query, range)
            .order_by_asc(stock_movement::Column::Seq)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;
        Ok(movements)
    }

    /// Highest assigned sequence, or 0 for an empty log. Recomputation fixes
    /// this before streaming so concurrent appends cannot leak into the run.
    pub async fn max_seq(&self) -> Result<i64, ServiceError> {
        let newest = StockMovement::find()
            .order_by_desc(stock_movement::Column::Seq)
            .one(self.db.as_ref())
            .await?;
        Ok(newest.map(|m| m.seq).unwrap_or(0))
    }
}
