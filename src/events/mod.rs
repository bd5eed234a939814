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

    /// Sends an event after a committed write; a closed channel is logged, not raised.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

// Domain events published after the owning transaction commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Customer & loyalty events
    CustomerCreated(Uuid),
    PointsUpdated {
        customer_id: Uuid,
        change: i32,
        balance: i32,
    },
    LoyaltyTierChanged {
        customer_id: Uuid,
        from: String,
        to: String,
    },

    // Inventory events
    ProductCreated(Uuid),
    StockAdjusted {
        product_id: Uuid,
        variant_id: Uuid,
        movement_type: String,
        previous_quantity: i32,
        new_quantity: i32,
        min_quantity: i32,
        reference: Option<String>,
    },

    // Sales events
    SaleCompleted {
        sale_id: Uuid,
        sale_number: String,
        customer_id: Uuid,
        total_amount: Decimal,
    },

    // Procurement events
    PurchaseOrderCreated(Uuid),
    PurchaseOrderStatusChanged {
        purchase_order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PurchaseOrderReceived {
        purchase_order_id: Uuid,
        units_received: i32,
        fully_received: bool,
    },

    // Repair events
    DeviceRegistered {
        device_id: Uuid,
        customer_id: Uuid,
    },
    DeviceStatusChanged {
        device_id: Uuid,
        from: String,
        to: String,
        performed_by: String,
    },
    RepairPartUsed {
        device_id: Uuid,
        spare_part_id: Uuid,
        quantity: i32,
    },

    // Diagnostic events
    DiagnosticRequestCreated {
        request_id: Uuid,
        device_count: usize,
    },
    DiagnosticDeviceReviewed {
        device_id: Uuid,
        request_id: Uuid,
        result_status: String,
    },

    // Payment events
    PaymentRecorded(Uuid),
    PaymentStatusChanged {
        payment_id: Uuid,
        old_status: String,
        new_status: String,
    },
    MobileMoneyStatusChanged {
        order_id: String,
        old_status: String,
        new_status: String,
    },
    SecurityAlertRaised {
        alert_id: Uuid,
        alert_type: String,
        severity: String,
    },

    // Finance events
    ExpenseRecorded {
        expense_id: Uuid,
        account_id: Uuid,
        amount: Decimal,
    },
    FundsTransferred {
        transfer_id: Uuid,
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount: Decimal,
    },

    // Notification events
    SmsSent {
        phone: String,
        success: bool,
    },
}

/// Drains the event channel, logging each event until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockAdjusted {
                variant_id,
                new_quantity,
                min_quantity,
                ..
            } if new_quantity <= min_quantity => {
                warn!(
                    %variant_id,
                    new_quantity,
                    min_quantity,
                    "Low stock after adjustment"
                );
            }
            Event::SecurityAlertRaised {
                alert_id,
                alert_type,
                severity,
            } => {
                warn!(%alert_id, %alert_type, %severity, "Payment security alert raised");
            }
            Event::SmsSent {
                phone,
                success: false,
            } => {
                warn!(%phone, "SMS delivery failed");
            }
            _ => {
                info!(event = ?event, "Received event");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_fails_once_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        let sender = EventSender::new(tx);
        drop(rx);

        let result = sender.send(Event::CustomerCreated(Uuid::new_v4())).await;
        assert!(result.unwrap_err().starts_with("Failed to send event"));

        // must not panic
        sender
            .send_or_log(Event::PaymentRecorded(Uuid::new_v4()))
            .await;
    }

    #[tokio::test]
    async fn process_events_ends_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let handle = tokio::spawn(process_events(rx));

        sender
            .send(Event::SmsSent {
                phone: "255700000001".into(),
                success: true,
            })
            .await
            .unwrap();
        drop(sender);

        handle.await.unwrap();
    }
}
