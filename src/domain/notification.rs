use crate::domain::SensorEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counter-style notification: one unit of production for a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterNotification {
    pub category: String,
    #[serde(rename = "incrementCount")]
    pub increment_count: u32,
}

/// Detailed notification carrying the full event for filtered observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNotification {
    pub category: String,
    pub occurred_at: DateTime<Utc>,
    pub value: f64,
}

/// One outbound frame on the real-time channel.
///
/// Serializes as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum PushMessage {
    /// Unfiltered broadcast used for live aggregate counters.
    ByBagType(CounterNotification),
    /// Detailed event, sent only to observers whose filter matches.
    NewData(EventNotification),
    /// Per-observer running-total increment, sent alongside `NewData`.
    Increment(CounterNotification),
}

impl PushMessage {
    pub fn by_bag_type(event: &SensorEvent) -> Self {
        PushMessage::ByBagType(CounterNotification {
            category: event.category.clone(),
            increment_count: 1,
        })
    }

    pub fn new_data(event: &SensorEvent) -> Self {
        PushMessage::NewData(EventNotification {
            category: event.category.clone(),
            occurred_at: event.occurred_at,
            value: event.value,
        })
    }

    pub fn increment(event: &SensorEvent) -> Self {
        PushMessage::Increment(CounterNotification {
            category: event.category.clone(),
            increment_count: 1,
        })
    }
}
