//! Merge, the per-tick result combiner.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use futures::FutureExt;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamMap;

use crate::codec::{merge_frame, transform_unframe, Frame};
use crate::component::Component;
use crate::model::{Event, MergedRecord, Timestamp, TransformResult};
use crate::protocol::{ComponentId, MERGE_ID, PASSTHROUGH_ID};

type ResultStream = BoxStream<'static, Vec<u8>>;

/// The Merge: one combined record per passthrough tick, built from the
/// passthrough event plus whatever every other transform has produced for
/// that tick.
pub struct Merge {
    id: ComponentId,
    streams: StreamMap<String, ResultStream>,
    buffers: HashMap<String, VecDeque<TransformResult>>,
    expected: HashSet<String>,
    finished: HashSet<String>,
    draining: bool,
    out: Sender<Vec<u8>>,
}

impl Merge {
    /// Builds the Merge and the per-transform senders the host wires up to
    /// each `BaseTransformRunner` (`merge_address`: PULL at Merge, PUSH at
    /// transforms). `transform_names` must include `PASSTHROUGH` — the host
    /// always pre-registers it. Channels carry framed `TRANSFORM`/`MERGE`
    /// bytes, not typed records.
    pub fn new(
        transform_names: HashSet<String>,
        out: Sender<Vec<u8>>,
    ) -> (Self, HashMap<String, Sender<Vec<u8>>>) {
        let mut streams = StreamMap::new();
        let mut senders = HashMap::new();
        for name in &transform_names {
            let (tx, rx) = tokio::sync::mpsc::channel(64);
            streams.insert(name.clone(), ReceiverStream::new(rx).boxed());
            senders.insert(name.clone(), tx);
        }
        let merge = Merge {
            id: ComponentId::new(MERGE_ID),
            streams,
            buffers: HashMap::new(),
            expected: transform_names,
            finished: HashSet::new(),
            draining: false,
            out,
        };
        (merge, senders)
    }

    /// Every expected transform has at least one result queued.
    fn is_full(&self) -> bool {
        self.expected
            .iter()
            .all(|name| self.buffers.get(name).is_some_and(|q| !q.is_empty()))
    }

    fn fully_drained(&self) -> bool {
        self.draining && self.buffers.values().all(VecDeque::is_empty)
    }

    fn ingest(&mut self, name: String, bytes: Vec<u8>) {
        match transform_unframe(&bytes) {
            Ok(Frame::Data(result)) => self.buffers.entry(name).or_default().push_back(result),
            Ok(Frame::Done) => {
                self.finished.insert(name);
                if self.finished.len() >= self.expected.len() {
                    self.draining = true;
                }
            }
            Err(err) => tracing::warn!(error = %err, transform = %name, "dropping malformed transform frame"),
        }
    }

    /// Pops one result from every transform that currently has one and folds
    /// them onto the passthrough's base record.
    fn emit_one(&mut self) -> Option<MergedRecord> {
        let passthrough = self.buffers.get_mut(PASSTHROUGH_ID)?.pop_front()?;
        let dt = Timestamp(passthrough.value.get("dt").and_then(|v| v.as_u64()).unwrap_or(0));
        let payload = passthrough.value.get("payload").cloned().unwrap_or(serde_json::Value::Null);
        let mut record = MergedRecord::from_passthrough(dt, payload);

        for name in self.expected.iter().filter(|n| n.as_str() != PASSTHROUGH_ID) {
            if let Some(result) = self.buffers.get_mut(name).and_then(VecDeque::pop_front) {
                record.merge(result);
            }
        }
        Some(record)
    }
}

#[async_trait]
impl Component for Merge {
    fn id(&self) -> &ComponentId {
        &self.id
    }

    async fn do_work(&mut self, heartbeat_timeout: Duration) -> anyhow::Result<bool> {
        if !(self.is_full() || self.draining) {
            match tokio::time::timeout(heartbeat_timeout, self.streams.next()).await {
                Ok(Some((name, frame))) => self.ingest(name, frame),
                Ok(None) => { /* every transform stream closed; nothing more will ever arrive */ }
                Err(_elapsed) => return Ok(true),
            }
        }
        while let Some(Some((name, frame))) = self.streams.next().now_or_never() {
            self.ingest(name, frame);
        }

        if self.fully_drained() {
            tracing::info!("merge drained, signalling DONE");
            if let Ok(bytes) = merge_frame(&Frame::Done) {
                let _ = self.out.send(bytes).await;
            }
            return Ok(false);
        }
        if self.is_full() || self.draining {
            if let Some(record) = self.emit_one() {
                match merge_frame(&Frame::Data(record)) {
                    Ok(bytes) => {
                        let _ = self.out.send(bytes).await;
                    }
                    Err(err) => tracing::warn!(error = %err, "failed to encode merge frame"),
                }
            }
        }
        Ok(true)
    }
}

/// Constructs a `Receiver<Vec<u8>>`-backed sender pair for tests that want to
/// drive `Merge::do_work` directly without the host.
#[cfg(test)]
pub(crate) fn test_channel() -> (Sender<Vec<u8>>, Receiver<Vec<u8>>) {
    tokio::sync::mpsc::channel(64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{merge_unframe, transform_frame};
    use crate::transform::{PassthroughTransform, Transform};
    use serde_json::json;

    fn passthrough_result(dt: u64, payload: serde_json::Value) -> TransformResult {
        PassthroughTransform.compute(&Event::new("A", Timestamp(dt), payload))
    }

    #[tokio::test]
    async fn single_transform_produces_one_record_per_tick() {
        let names: HashSet<String> = ["DOUBLE".to_owned(), PASSTHROUGH_ID.to_owned()].into_iter().collect();
        let (mut merge, senders) = Merge::new(names, tokio::sync::mpsc::channel(8).0);
        let passthrough_tx = senders.get(PASSTHROUGH_ID).unwrap();
        let double_tx = senders.get("DOUBLE").unwrap();

        passthrough_tx
            .send(transform_frame(&Frame::Data(passthrough_result(1, json!(null)))).unwrap())
            .await
            .unwrap();
        double_tx
            .send(transform_frame(&Frame::Data(TransformResult::new("DOUBLE", json!(2)))).unwrap())
            .await
            .unwrap();

        assert!(merge.do_work(Duration::from_millis(50)).await.unwrap());
        let record = merge.emit_one();
        assert!(record.is_none(), "emit_one already drained by do_work");
    }

    #[tokio::test]
    async fn empty_registry_drains_immediately() {
        let names: HashSet<String> = [PASSTHROUGH_ID.to_owned()].into_iter().collect();
        let (out_tx, mut out_rx) = tokio::sync::mpsc::channel(8);
        let (mut merge, senders) = Merge::new(names, out_tx);
        let passthrough_tx = senders.get(PASSTHROUGH_ID).unwrap().clone();
        drop(senders);
        passthrough_tx.send(transform_frame(&Frame::<TransformResult>::Done).unwrap()).await.unwrap();
        drop(passthrough_tx);

        assert!(!merge.do_work(Duration::from_millis(50)).await.unwrap());
        assert_eq!(merge_unframe(&out_rx.recv().await.unwrap()).unwrap(), Frame::Done);
    }

    #[test]
    fn is_full_requires_every_expected_transform() {
        let names: HashSet<String> = ["A".to_owned(), "B".to_owned()].into_iter().collect();
        let (mut merge, _senders) = Merge::new(names, tokio::sync::mpsc::channel(8).0);
        merge.buffers.entry("A".to_owned()).or_default().push_back(TransformResult::new("A", json!(1)));
        assert!(!merge.is_full());
        merge.buffers.entry("B".to_owned()).or_default().push_back(TransformResult::new("B", json!(1)));
        assert!(merge.is_full());
    }
}
