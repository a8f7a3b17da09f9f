//! Domain event types.

use serde::{Deserialize, Serialize};

use crate::bonds::{Bond, Transaction};

/// Events emitted after successful mutations.
///
/// Delivery is fire-and-forget: the live fan-out consumes these, but
/// ingestion correctness never depends on them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A transaction was newly inserted (not a dedup no-op).
    NewTransaction(Transaction),

    /// A bond's summary fields changed (creation, snapshot, or recompute).
    BondUpdate(Bond),

    /// A sync run finished; carries counts for dashboard status lines.
    SyncCompleted {
        bonds_touched: usize,
        transactions_inserted: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonds::Exchange;
    use chrono::Utc;

    #[test]
    fn test_event_wire_shape() {
        let txn = Transaction {
            id: "t1".to_string(),
            bond_id: "b1".to_string(),
            timestamp: Utc::now().naive_utc(),
            price: 99.5,
            quantity: 100,
        };
        let json = serde_json::to_value(DomainEvent::NewTransaction(txn)).unwrap();
        assert_eq!(json["type"], "new_transaction");
        assert_eq!(json["data"]["bondId"], "b1");

        let now = Utc::now().naive_utc();
        let bond = Bond {
            id: "b1".to_string(),
            isin: "INE001A07BM4".to_string(),
            name: "Test".to_string(),
            issuer: "Issuer".to_string(),
            exchange: Exchange::Nse,
            face_value: 100.0,
            coupon_rate: 0.0,
            maturity_date: now,
            yield_to_maturity: 0.0,
            last_price: 99.5,
            volume: 100,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(DomainEvent::BondUpdate(bond)).unwrap();
        assert_eq!(json["type"], "bond_update");
        assert_eq!(json["data"]["exchange"], "NSE");
    }
}
