//! Fan-out of domain events to websocket clients.
//!
//! Holds one unbounded channel per connected client. A send failing
//! means the client's receive loop is gone, so the sender is pruned on
//! the spot; slow consumers buffer in their own channel and never block
//! the sync pipeline.

use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, error};

use bondboard_core::events::{DomainEvent, DomainEventSink};

#[derive(Default)]
pub struct Broadcaster {
    clients: Mutex<Vec<mpsc::UnboundedSender<String>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client; the returned receiver gets every payload
    /// broadcast from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.push(tx);
        debug!("websocket client subscribed, {} connected", clients.len());
        rx
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn broadcast(&self, payload: String) {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.retain(|client| client.send(payload.clone()).is_ok());
    }
}

impl DomainEventSink for Broadcaster {
    fn emit(&self, event: DomainEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => self.broadcast(payload),
            Err(e) => error!("failed to serialize domain event: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bondboard_core::bonds::Transaction;
    use chrono::NaiveDate;

    fn transaction() -> Transaction {
        Transaction {
            id: "txn-1".to_string(),
            bond_id: "bond-1".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2026, 8, 28)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            price: 101.5,
            quantity: 50,
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_tagged_payloads() {
        let broadcaster = Broadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.emit(DomainEvent::NewTransaction(transaction()));

        let payload = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["type"], "new_transaction");
        assert_eq!(value["data"]["bondId"], "bond-1");
    }

    #[tokio::test]
    async fn test_dead_clients_are_pruned_on_send() {
        let broadcaster = Broadcaster::new();
        let rx_alive = broadcaster.subscribe();
        let rx_dead = broadcaster.subscribe();
        assert_eq!(broadcaster.client_count(), 2);

        drop(rx_dead);
        broadcaster.emit(DomainEvent::NewTransaction(transaction()));

        assert_eq!(broadcaster.client_count(), 1);
        drop(rx_alive);
    }
}
