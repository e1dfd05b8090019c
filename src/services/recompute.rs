use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        balances::{BalanceService, FoldedBalance},
        movements::{MovementService, TimeRange},
    },
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument};
use uuid::Uuid;

/// One divergent (item, warehouse) pair found by a verification run.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceMismatch {
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub live_quantity: Decimal,
    pub recomputed_quantity: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecomputeReport {
    pub matched: u64,
    pub mismatched: Vec<BalanceMismatch>,
    pub movements_replayed: u64,
    /// Sequence ceiling the run was bounded by; rerunning against the same
    /// ceiling reproduces the report exactly.
    pub ceiling_seq: i64,
}

impl RecomputeReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty()
    }
}

/// Full-replay verification and rebuild of the balance projection.
///
/// Verification never writes: live balances may legitimately lag the log
/// under concurrent writers, and silently overwriting them would mask real
/// bugs. Correction is the separate, operator-confirmed [`rebuild`].
///
/// [`rebuild`]: RecomputeService::rebuild
#[derive(Clone)]
pub struct RecomputeService {
    movements: MovementService,
    balances: BalanceService,
    event_sender: EventSender,
    chunk_size: u64,
}

impl RecomputeService {
    pub fn new(
        movements: MovementService,
        balances: BalanceService,
        event_sender: EventSender,
        chunk_size: u64,
    ) -> Self {
        Self {
            movements,
            balances,
            event_sender,
            chunk_size,
        }
    }

    /// Streams the log in seq order up to `ceiling_seq`, folding deltas into
    /// a fresh per-pair map. Page-at-a-time so a full-history replay holds at
    /// most `chunk_size` movements in memory besides the fold itself.
    async fn fold_range(
        &self,
        range: &TimeRange,
        ceiling_seq: i64,
    ) -> Result<(BTreeMap<(Uuid, Uuid), FoldedBalance>, u64), ServiceError> {
        let mut folded: BTreeMap<(Uuid, Uuid), FoldedBalance> = BTreeMap::new();
        let mut cursor = 0i64;
        let mut replayed = 0u64;

        loop {
            let page = self
                .movements
                .list_page(range, cursor, ceiling_seq, self.chunk_size)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = last.seq;
            replayed += page.len() as u64;

            for movement in page {
                let entry = folded
                    .entry((movement.item_id, movement.warehouse_id))
                    .or_insert(FoldedBalance {
                        quantity: Decimal::ZERO,
                        last_movement_id: movement.id,
                    });
                entry.quantity += movement.delta;
                entry.last_movement_id = movement.id;
            }
        }

        Ok((folded, replayed))
    }

    /// Replays the movement log and diffs the result against live balances.
    ///
    /// The sequence ceiling is fixed before streaming starts; movements
    /// appended while the run is in flight are not observed, keeping the
    /// report reproducible. A bounded `range` folds only those movements and
    /// is meant for chunked sweeps; the unbounded run is the authoritative
    /// audit.
    #[instrument(skip(self))]
    pub async fn recompute(
        &self,
        range: Option<TimeRange>,
    ) -> Result<RecomputeReport, ServiceError> {
        let range = range.unwrap_or_default();
        let ceiling_seq = self.movements.max_seq().await?;
        let (folded, movements_replayed) = self.fold_range(&range, ceiling_seq).await?;

        let live = self.balances.all().await?;
        let mut matched = 0u64;
        let mut mismatched = Vec::new();
        let mut covered: BTreeSet<(Uuid, Uuid)> = BTreeSet::new();

        for balance in live {
            let key = (balance.item_id, balance.warehouse_id);
            covered.insert(key);
            let recomputed = folded
                .get(&key)
                .map(|fold| fold.quantity)
                .unwrap_or(Decimal::ZERO);
            if recomputed == balance.quantity {
                matched += 1;
            } else {
                mismatched.push(BalanceMismatch {
                    item_id: balance.item_id,
                    warehouse_id: balance.warehouse_id,
                    live_quantity: balance.quantity,
                    recomputed_quantity: recomputed,
                });
            }
        }

        // Pairs the replay produced but the live store never materialized.
        for (key, fold) in &folded {
            if fold.quantity != Decimal::ZERO && !covered.contains(key) {
                mismatched.push(BalanceMismatch {
                    item_id: key.0,
                    warehouse_id: key.1,
                    live_quantity: Decimal::ZERO,
                    recomputed_quantity: fold.quantity,
                });
            }
        }

        mismatched.sort_by_key(|m| (m.item_id, m.warehouse_id));

        let report = RecomputeReport {
            matched,
            mismatched,
            movements_replayed,
            ceiling_seq,
        };

        self.event_sender
            .send(Event::RecomputeCompleted {
                matched: report.matched,
                mismatched: report.mismatched.len() as u64,
                ceiling_seq,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(
            matched = report.matched,
            mismatched = report.mismatched.len(),
            replayed = report.movements_replayed,
            "recompute finished"
        );
        Ok(report)
    }

    /// Rebuilds the balance store from a full-history replay.
    ///
    /// Explicit operator action, gated behind confirmation in the audit CLI;
    /// verification runs never call this.
    #[instrument(skip(self))]
    pub async fn rebuild(&self) -> Result<u64, ServiceError> {
        let ceiling_seq = self.movements.max_seq().await?;
        let (folded, replayed) = self.fold_range(&TimeRange::all(), ceiling_seq).await?;
        let entries = self.balances.rebuild_from(&folded).await?;

        self.event_sender
            .send(Event::BalancesRebuilt {
                entries,
                ceiling_seq,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(entries, replayed, "balance store rebuilt from movement log");
        Ok(entries)
    }
}
