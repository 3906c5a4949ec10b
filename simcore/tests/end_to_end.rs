use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use simcore::{
    ComponentHost, ComponentId, Event, HostConfig, MergedRecord, RegistrationError, Timestamp, Transform,
    TransformResult,
};

struct Fixed {
    id: ComponentId,
    remaining: VecDeque<u64>,
}

#[async_trait]
impl simcore::DataSource for Fixed {
    fn source_id(&self) -> ComponentId {
        self.id.clone()
    }

    fn get_type(&self) -> &'static str {
        "fixed"
    }

    async fn next_event(&mut self) -> Option<Event> {
        let dt = self.remaining.pop_front()?;
        Some(Event::new(self.id.as_str(), Timestamp(dt), json!(dt)))
    }
}

fn fixed(id: &str, dts: impl IntoIterator<Item = u64>) -> Fixed {
    Fixed {
        id: ComponentId::new(id),
        remaining: dts.into_iter().collect(),
    }
}

/// A source whose `next_event` never returns — used to drive the liveness
/// timeout scenario. `run_component` cancels the step every `heartbeat_timeout`
/// without crediting a heartbeat, so this source (and everything downstream of
/// it) never pings and is eventually declared lost.
struct Silent {
    id: ComponentId,
}

#[async_trait]
impl simcore::DataSource for Silent {
    fn source_id(&self) -> ComponentId {
        self.id.clone()
    }

    fn get_type(&self) -> &'static str {
        "silent"
    }

    async fn next_event(&mut self) -> Option<Event> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        None
    }
}

struct Double;

impl Transform for Double {
    fn name(&self) -> String {
        "DOUBLE".to_owned()
    }

    fn compute(&mut self, event: &Event) -> TransformResult {
        TransformResult::new("DOUBLE", json!(event.dt.0 * 2))
    }
}

fn dts(records: &[MergedRecord]) -> Vec<u64> {
    records.iter().map(|r| r.dt.0).collect()
}

#[tokio::test]
async fn two_sources_lock_step() {
    let mut host = ComponentHost::new(HostConfig::default());
    host.register_source(fixed("A", [1, 3, 5])).unwrap();
    host.register_source(fixed("B", [2, 4, 6])).unwrap();

    let records = host.run().await.unwrap();
    assert_eq!(dts(&records), vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn slow_source_drains_once_the_other_dones_empty() {
    let mut host = ComponentHost::new(HostConfig::default());
    host.register_source(fixed("A", [1, 2, 3])).unwrap();
    host.register_source(fixed("B", [])).unwrap();

    let records = host.run().await.unwrap();
    assert_eq!(dts(&records), vec![1, 2, 3]);
}

#[tokio::test]
async fn single_transform_produces_doubled_field() {
    let mut host = ComponentHost::new(HostConfig::default());
    host.register_source(fixed("A", [1, 2])).unwrap();
    host.register_transform(Double).unwrap();

    let records = host.run().await.unwrap();
    assert_eq!(dts(&records), vec![1, 2]);
    assert_eq!(records[0].fields.get("DOUBLE"), Some(&json!(2)));
    assert_eq!(records[1].fields.get("DOUBLE"), Some(&json!(4)));
}

#[test]
fn duplicate_transform_name_is_rejected_at_registration() {
    let mut host = ComponentHost::new(HostConfig::default());
    host.register_transform(Double).unwrap();
    assert_eq!(
        host.register_transform(Double).unwrap_err(),
        RegistrationError::DuplicateTransformName("DOUBLE".to_owned())
    );
}

#[tokio::test]
async fn heartbeat_timeout_reports_a_stuck_component() {
    // The silent source never emits or pings, which in turn stalls Feed,
    // Passthrough and Merge behind it — any of the four may be the one the
    // host observes crossing `timeout` first, but one of them must.
    let config = HostConfig::default()
        .with_heartbeat_timeout(Duration::from_millis(20))
        .with_timeout(Duration::from_millis(80));
    let mut host = ComponentHost::new(config);
    host.register_source(Silent {
        id: ComponentId::new("A"),
    })
    .unwrap();

    let err = host.run().await.unwrap_err();
    let stuck = match err {
        simcore::HostError::LivenessLost { id } => id,
        other => panic!("expected LivenessLost, got {other:?}"),
    };
    let known = ["A", "FEED", "MERGE", "PASSTHROUGH"].map(ComponentId::new);
    assert!(known.contains(&stuck), "unexpected stuck component: {stuck}");
}

#[tokio::test]
async fn empty_registry_drains_immediately() {
    let host = ComponentHost::new(HostConfig::default());
    let records = host.run().await.unwrap();
    assert!(records.is_empty());
}
