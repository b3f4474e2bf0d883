// ── Refresh snapshot ──
//
// One consistent, fully-merged result of a refresh cycle. Traffic
// counters are merged first and status values second, so status keys
// win on collision while keeping the position of the first insert.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Ordered key/value result of a single device query.
pub type Mapping = IndexMap<String, Value>;

/// Well-known keys returned by the traffic and status queries.
pub mod keys {
    pub const BYTES_RECEIVED: &str = "bytes_received";
    pub const BYTES_SENT: &str = "bytes_sent";
    pub const PACKETS_RECEIVED: &str = "packets_received";
    pub const PACKETS_SENT: &str = "packets_sent";
    pub const TIMESTAMP: &str = "timestamp";
    pub const WAN_STATUS: &str = "wan_status";
    pub const ROUTER_IP: &str = "ip";
    pub const ROUTER_UPTIME: &str = "uptime";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshSnapshot {
    values: Mapping,
    taken_at: DateTime<Utc>,
}

impl RefreshSnapshot {
    /// Merge the traffic and status results of one cycle.
    pub fn merge(traffic: Mapping, status: Mapping) -> Self {
        let mut values = traffic;
        values.extend(status);
        Self {
            values,
            taken_at: Utc::now(),
        }
    }

    pub fn values(&self) -> &Mapping {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn bytes_received(&self) -> Option<u64> {
        self.counter(keys::BYTES_RECEIVED)
    }

    pub fn bytes_sent(&self) -> Option<u64> {
        self.counter(keys::BYTES_SENT)
    }

    pub fn packets_received(&self) -> Option<u64> {
        self.counter(keys::PACKETS_RECEIVED)
    }

    pub fn packets_sent(&self) -> Option<u64> {
        self.counter(keys::PACKETS_SENT)
    }

    pub fn wan_status(&self) -> Option<&str> {
        self.get(keys::WAN_STATUS).and_then(Value::as_str)
    }

    /// External IP address reported by the router.
    pub fn router_ip(&self) -> Option<&str> {
        self.get(keys::ROUTER_IP).and_then(Value::as_str)
    }

    /// Router uptime in seconds.
    pub fn uptime(&self) -> Option<u64> {
        self.counter(keys::ROUTER_UPTIME)
    }

    // Some gateways report counters as strings.
    fn counter(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
