//! Domain primitives: TimeMs, EventTopic.

use serde::{Deserialize, Serialize};

/// Milliseconds in one day.
pub const DAY_MS: i64 = 86_400_000;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// This time plus a whole number of days.
    pub fn plus_days(&self, days: i64) -> Self {
        TimeMs(self.0.saturating_add(days.saturating_mul(DAY_MS)))
    }
}

/// Webhook event topic from the commerce platform.
///
/// Topics outside this set are acknowledged and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTopic {
    /// Order has been paid.
    OrdersPaid,
    /// Order has been fulfilled/shipped.
    OrdersFulfilled,
}

impl EventTopic {
    /// Parse a topic header value. Unknown topics return None.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "orders/paid" => Some(EventTopic::OrdersPaid),
            "orders/fulfilled" => Some(EventTopic::OrdersFulfilled),
            _ => None,
        }
    }

    /// The wire representation of this topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventTopic::OrdersPaid => "orders/paid",
            EventTopic::OrdersFulfilled => "orders/fulfilled",
        }
    }
}

impl std::fmt::Display for EventTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
