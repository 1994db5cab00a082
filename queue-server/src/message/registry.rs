//! Subscription Registry
//!
//! Tracks which live connections are interested in which queue. Interest is
//! explicit (`join-queue` / `leave-queue`); removal of a connection entry is
//! the implicit leave-all on disconnect. The forward task consults the
//! registry per message, so a processed leave stops delivery immediately.

use std::collections::HashSet;

use dashmap::DashMap;
use serde::Serialize;

/// Subscriber trust tier.
///
/// Tiering controls which mutation operations a caller may invoke (over
/// HTTP), never which events a subscriber receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Public,
    Staff,
}

#[derive(Debug)]
struct Subscriber {
    tier: Tier,
    addr: String,
    joined: HashSet<i64>,
}

/// Connection-id → interest-set map
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    conns: DashMap<String, Subscriber>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            conns: DashMap::new(),
        }
    }

    /// Register a fresh connection (public tier until it handshakes)
    pub fn register(&self, conn_id: &str, addr: &str) {
        self.conns.insert(
            conn_id.to_string(),
            Subscriber {
                tier: Tier::Public,
                addr: addr.to_string(),
                joined: HashSet::new(),
            },
        );
    }

    pub fn set_tier(&self, conn_id: &str, tier: Tier) {
        if let Some(mut entry) = self.conns.get_mut(conn_id) {
            entry.tier = tier;
        }
    }

    /// Express interest in a queue; returns false for unknown connections
    pub fn join(&self, conn_id: &str, queue_id: i64) -> bool {
        match self.conns.get_mut(conn_id) {
            Some(mut entry) => {
                entry.joined.insert(queue_id);
                true
            }
            None => false,
        }
    }

    /// Withdraw interest in a queue
    pub fn leave(&self, conn_id: &str, queue_id: i64) -> bool {
        match self.conns.get_mut(conn_id) {
            Some(mut entry) => entry.joined.remove(&queue_id),
            None => false,
        }
    }

    pub fn is_joined(&self, conn_id: &str, queue_id: i64) -> bool {
        self.conns
            .get(conn_id)
            .map(|entry| entry.joined.contains(&queue_id))
            .unwrap_or(false)
    }

    /// Implicit leave-all on disconnect
    pub fn remove(&self, conn_id: &str) {
        self.conns.remove(conn_id);
    }

    pub fn connection_count(&self) -> usize {
        self.conns.len()
    }

    /// Number of connections currently interested in a queue
    pub fn subscriber_count(&self, queue_id: i64) -> usize {
        self.conns
            .iter()
            .filter(|entry| entry.joined.contains(&queue_id))
            .count()
    }

    pub fn tier_of(&self, conn_id: &str) -> Option<Tier> {
        self.conns.get(conn_id).map(|entry| entry.tier)
    }

    pub fn addr_of(&self, conn_id: &str) -> Option<String> {
        self.conns.get(conn_id).map(|entry| entry.addr.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_leave_lifecycle() {
        let registry = SubscriptionRegistry::new();
        registry.register("c1", "127.0.0.1:5000");

        assert!(registry.join("c1", 7));
        assert!(registry.is_joined("c1", 7));
        assert!(!registry.is_joined("c1", 8));
        assert_eq!(registry.subscriber_count(7), 1);

        assert!(registry.leave("c1", 7));
        assert!(!registry.is_joined("c1", 7));
        assert!(!registry.leave("c1", 7));
    }

    #[test]
    fn unknown_connections_never_join() {
        let registry = SubscriptionRegistry::new();
        assert!(!registry.join("ghost", 1));
        assert!(!registry.is_joined("ghost", 1));
    }

    #[test]
    fn disconnect_is_implicit_leave_all() {
        let registry = SubscriptionRegistry::new();
        registry.register("c1", "127.0.0.1:5000");
        registry.join("c1", 1);
        registry.join("c1", 2);

        registry.remove("c1");
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.subscriber_count(1), 0);
        assert_eq!(registry.subscriber_count(2), 0);
    }

    #[test]
    fn tier_upgrade() {
        let registry = SubscriptionRegistry::new();
        registry.register("c1", "127.0.0.1:5000");
        assert_eq!(registry.tier_of("c1"), Some(Tier::Public));
        registry.set_tier("c1", Tier::Staff);
        assert_eq!(registry.tier_of("c1"), Some(Tier::Staff));
    }
}
