use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A monotonic, totally ordered logical timestamp.
///
/// Ties between events from different sources are broken by the Feed's
/// deterministic tie-break (source id, lexicographically); ties within one
/// source are broken by emission order, which this type does not need to
/// encode since a single source's queue is already FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl From<u64> for Timestamp {
    fn from(v: u64) -> Self {
        Timestamp(v)
    }
}

/// A time-stamped record emitted by a DataSource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub source_id: String,
    pub dt: Timestamp,
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(source_id: impl Into<String>, dt: impl Into<Timestamp>, payload: serde_json::Value) -> Self {
        Event {
            source_id: source_id.into(),
            dt: dt.into(),
            payload,
        }
    }
}

impl Eq for Event {}

/// Orders events by `dt` first, tie-broken lexicographically on `source_id`.
/// `payload` never enters the comparison, since two events with the same
/// `dt`/`source_id` are interchangeable for merge ordering purposes.
impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.dt.cmp(&other.dt).then_with(|| self.source_id.cmp(&other.source_id))
    }
}

/// One transform's output for a single tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformResult {
    pub name: String,
    pub value: serde_json::Value,
}

impl TransformResult {
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        TransformResult {
            name: name.into(),
            value,
        }
    }
}

/// The per-tick combination of the passthrough event and every transform's result.
///
/// Built from the passthrough result (the base record) and folded with every
/// other transform's result via [`MergedRecord::merge`]. Field insertion order
/// is irrelevant: transform names are pairwise disjoint by registration-time
/// precondition, so there is exactly one writer per key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub dt: Timestamp,
    pub payload: serde_json::Value,
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl MergedRecord {
    /// Starts a merged record from the passthrough tick's base event.
    pub fn from_passthrough(dt: Timestamp, payload: serde_json::Value) -> Self {
        MergedRecord {
            dt,
            payload,
            fields: BTreeMap::new(),
        }
    }

    /// Folds another transform's result into this record.
    pub fn merge(&mut self, result: TransformResult) {
        self.fields.insert(result.name, result.value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_accumulates_disjoint_fields() {
        let mut record = MergedRecord::from_passthrough(Timestamp(1), json!({"raw": true}));
        record.merge(TransformResult::new("DOUBLE", json!(2)));
        record.merge(TransformResult::new("SQUARE", json!(1)));
        assert_eq!(record.fields.get("DOUBLE"), Some(&json!(2)));
        assert_eq!(record.fields.get("SQUARE"), Some(&json!(1)));
        assert_eq!(record.payload, json!({"raw": true}));
    }

    #[test]
    fn timestamps_order_numerically() {
        assert!(Timestamp(1) < Timestamp(2));
        assert!(Timestamp(2) <= Timestamp(2));
    }

    #[test]
    fn events_tie_break_on_source_id() {
        let a = Event::new("alpha", Timestamp(5), json!(null));
        let b = Event::new("beta", Timestamp(5), json!(null));
        assert!(a < b);
        assert!(Event::new("a", Timestamp(1), json!(1)) < Event::new("a", Timestamp(2), json!(0)));
    }

    #[quickcheck_macros::quickcheck]
    fn sorting_events_yields_non_decreasing_dt(pairs: Vec<(String, u64)>) -> bool {
        let mut events: Vec<Event> = pairs
            .into_iter()
            .map(|(source_id, dt)| Event::new(source_id, Timestamp(dt), json!(null)))
            .collect();
        events.sort();
        events.windows(2).all(|w| w[0].dt <= w[1].dt)
    }
}
