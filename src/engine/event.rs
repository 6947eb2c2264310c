use serde::{Deserialize, Serialize};

/// Kind of event emitted by the rule engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Make,
}

/// A confirmed made basket, as consumed by clip extraction
///
/// Serializes as `{ "time": <seconds>, "type": "make" }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MakeEvent {
    pub time: f64,
    #[serde(rename = "type")]
    pub kind: EventKind,
}

impl MakeEvent {
    pub fn make(time: f64) -> Self {
        Self {
            time,
            kind: EventKind::Make,
        }
    }
}
