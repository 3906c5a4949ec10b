//! ParallelBuffer, the chronological feed merge.
//!
//! The "wait for the slowest source" policy and the drain-on-all-DONE
//! behaviour are not hand-rolled here: both fall out directly from
//! `stream_util::stream::MergeOrdered`, the min-heap ordered-merge combinator
//! bundled alongside this crate. `MergeOrdered::poll_next` only yields once
//! every live substream has produced a value or terminated, and a substream
//! that ends (our per-source DONE) is permanently dropped from that
//! requirement, so a source that finishes without ever emitting anything
//! still lets the merge proceed. This crate contributes the per-source
//! DONE-terminated stream adapter and the one-to-many fan-out to transforms;
//! `MergeOrdered` contributes the merge itself.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::ready;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::mpsc::Receiver;
use tokio_stream::wrappers::ReceiverStream;

use stream_util::stream::StreamDispatcher;
use stream_util::stream::MergeOrdered;

use crate::codec::{datasource_unframe, feed_frame, Frame};
use crate::component::Component;
use crate::model::Event;
use crate::protocol::{ComponentId, FEED_ID};

type EventStream = BoxStream<'static, Event>;

/// Adapts one source's channel of framed `DATASOURCE` bytes into a plain
/// `Event` stream that ends the instant a `DONE` frame (or channel closure)
/// is observed. A frame that fails to decode is logged and dropped without
/// ending the stream, matching the Feed's "malformed frame is logged and
/// dropped; the loop continues" failure semantics. Once ended by `DONE`, the
/// adapter never polls its receiver again, which is what makes a duplicate
/// `DONE` from a misbehaving source harmless: there is no counter to
/// double-increment, because the underlying stream simply never offers the
/// duplicate frame to `MergeOrdered`.
fn source_stream(rx: Receiver<Vec<u8>>) -> EventStream {
    ReceiverStream::new(rx)
        .filter_map(|bytes| {
            ready(match datasource_unframe(&bytes) {
                Ok(frame) => Some(frame),
                Err(err) => {
                    tracing::warn!(error = %err, "dropping malformed datasource frame");
                    None
                }
            })
        })
        .map(|frame| match frame {
            Frame::Data(event) => Some(event),
            Frame::Done => None,
        })
        .take_while(|item| ready(item.is_some()))
        .filter_map(ready)
        .boxed()
}

/// The Feed: merges every registered source's stream into one
/// chronologically ordered stream and fans it out to every subscribed
/// transform.
pub struct Feed {
    id: ComponentId,
    merge: MergeOrdered<Event, EventStream, futures::stream::Empty<EventStream>>,
    dispatcher: StreamDispatcher<(), Vec<u8>>,
    sent_count: u64,
}

impl Feed {
    /// Builds the Feed from the fixed set of source receivers known at
    /// registration time; the set of sources is never mutated after startup.
    /// Each receiver carries framed `DATASOURCE` bytes (`data_address`: PULL
    /// at Feed, PUSH at sources).
    pub fn new(sources: Vec<Receiver<Vec<u8>>>) -> Self {
        let streams: Vec<EventStream> = sources.into_iter().map(source_stream).collect();
        Feed {
            id: ComponentId::new(FEED_ID),
            merge: MergeOrdered::new_fixed(streams),
            dispatcher: StreamDispatcher::new(),
            sent_count: 0,
        }
    }

    /// Subscribes a new consumer (a transform or the passthrough) to the
    /// feed's broadcast of framed `FEED` bytes (`feed_address`: PUB at Feed,
    /// SUB at transforms).
    pub fn subscribe(&mut self) -> futures::channel::mpsc::UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = futures::channel::mpsc::unbounded();
        self.dispatcher.register((), tx);
        rx
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count
    }
}

#[async_trait]
impl Component for Feed {
    fn id(&self) -> &ComponentId {
        &self.id
    }

    async fn do_work(&mut self, heartbeat_timeout: Duration) -> anyhow::Result<bool> {
        match tokio::time::timeout(heartbeat_timeout, self.merge.next()).await {
            Ok(Some(event)) => {
                self.sent_count += 1;
                match feed_frame(&Frame::Data(event)) {
                    Ok(bytes) => self.dispatcher.notify((), bytes),
                    Err(err) => tracing::warn!(error = %err, "failed to encode feed frame"),
                }
                Ok(true)
            }
            Ok(None) => {
                tracing::info!(sent = self.sent_count, "feed drained, signalling DONE");
                if let Ok(bytes) = feed_frame(&Frame::Done) {
                    self.dispatcher.notify((), bytes);
                }
                Ok(false)
            }
            Err(_elapsed) => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamp;
    use serde_json::json;
    use stream_util::stream::Drainer;

    fn ev(source: &str, dt: u64) -> Event {
        Event::new(source, Timestamp(dt), json!(dt))
    }

    /// Builds the bare merge (no dispatcher/actor plumbing) from fixed,
    /// synchronous streams, for testing the ordering algorithm in isolation.
    fn merge_of(streams: Vec<Vec<Event>>) -> MergeOrdered<Event, EventStream, futures::stream::Empty<EventStream>> {
        let boxed: Vec<EventStream> = streams
            .into_iter()
            .map(|events| futures::stream::iter(events).boxed())
            .collect();
        MergeOrdered::new_fixed(boxed)
    }

    fn drain_all<T: Clone>(mut drainer: Drainer<T>) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(batch) = drainer.next() {
            items.extend(batch);
        }
        items
    }

    #[test]
    fn two_sources_lock_step() {
        let a = vec![ev("A", 1), ev("A", 3), ev("A", 5)];
        let b = vec![ev("B", 2), ev("B", 4), ev("B", 6)];
        let merge = merge_of(vec![a, b]);
        let dts: Vec<u64> = drain_all(Drainer::new(merge)).into_iter().map(|e| e.dt.0).collect();
        assert_eq!(dts, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn slow_source_blocks_emission_until_it_finishes() {
        // A is fully present; B never emits and simply ends (DONE with zero events).
        let a = vec![ev("A", 1), ev("A", 2), ev("A", 3)];
        let b: Vec<Event> = vec![];
        let merge = merge_of(vec![a, b]);
        let dts: Vec<u64> = drain_all(Drainer::new(merge)).into_iter().map(|e| e.dt.0).collect();
        assert_eq!(dts, vec![1, 2, 3]);
    }

    #[test]
    fn ties_break_lexicographically_on_source_id() {
        let a = vec![ev("alpha", 1)];
        let b = vec![ev("beta", 1)];
        let merge = merge_of(vec![b, a]); // registered out of lexicographic order
        let sources: Vec<String> = drain_all(Drainer::new(merge)).into_iter().map(|e| e.source_id).collect();
        assert_eq!(sources, vec!["alpha", "beta"]);
    }
}
