use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A sale was expanded and every resulting movement landed.
    SaleRecorded {
        reference_id: Uuid,
        sale_item_id: Uuid,
        movement_ids: Vec<Uuid>,
    },
    StockReceived {
        item_id: Uuid,
        warehouse_id: Uuid,
        quantity: Decimal,
        movement_id: Uuid,
    },
    /// A manual count produced a correcting adjustment movement.
    StockCounted {
        item_id: Uuid,
        warehouse_id: Uuid,
        counted_quantity: Decimal,
        delta: Decimal,
        movement_id: Uuid,
    },
    StockTransferred {
        item_id: Uuid,
        from_warehouse_id: Uuid,
        to_warehouse_id: Uuid,
        quantity: Decimal,
    },
    MovementReversed {
        original_movement_id: Uuid,
        reversal_movement_id: Uuid,
    },
    /// A balance went below zero. Permitted by policy; surfaced here so
    /// reconciliation can pick it up instead of blocking the sale.
    NegativeBalance {
        item_id: Uuid,
        warehouse_id: Uuid,
        quantity: Decimal,
        movement_id: Uuid,
    },
    RecomputeCompleted {
        matched: u64,
        mismatched: u64,
        ceiling_seq: i64,
    },
    BalancesRebuilt {
        entries: u64,
        ceiling_seq: i64,
    },
}

/// Builds the event channel used to wire services to the consumer task.
pub fn event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event. Anomalies (negative
/// balances, recompute mismatches) log at WARN so audit tooling can grep them.
pub fn spawn_event_logger(mut rx: mpsc::Receiver<Event>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match &event {
                Event::NegativeBalance {
                    item_id,
                    warehouse_id,
                    quantity,
                    ..
                } => {
                    warn!(%item_id, %warehouse_id, %quantity, "balance went negative");
                }
                Event::RecomputeCompleted { mismatched, .. } if *mismatched > 0 => {
                    warn!(mismatched, "recompute found divergent balances");
                }
                _ => info!(?event, "stock event"),
            }
        }
    })
}
