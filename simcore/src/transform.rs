//! BaseTransform and PassthroughTransform.

use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use futures::StreamExt;
use serde_json::json;
use tokio::sync::mpsc::Sender;

use crate::codec::{feed_unframe, transform_frame, Frame};
use crate::component::Component;
use crate::model::{Event, TransformResult};
use crate::protocol::{ComponentId, PASSTHROUGH_ID};

/// The user-supplied transform contract: a stable `name` and a pure step
/// from one feed event to one named result.
///
/// The precondition that names are pairwise disjoint across all concurrently
/// registered transforms is enforced eagerly by `ComponentHost::register_transform`,
/// not here.
pub trait Transform: Send + 'static {
    fn name(&self) -> String;
    fn compute(&mut self, event: &Event) -> TransformResult;
}

/// Forwards to a boxed transform, so `Box<dyn Transform>` itself satisfies
/// `Transform` and can be wrapped by `BaseTransformRunner` without the host
/// needing to know the concrete type it registered.
impl Transform for Box<dyn Transform> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn compute(&mut self, event: &Event) -> TransformResult {
        (**self).compute(event)
    }
}

/// The distinguished transform that carries the raw event into the Merge
/// stage. It does not recompute anything: its "value" is the event's `dt`
/// and `payload`, tagged so `Merge::emit_one` can recover them without a
/// fallible deserialize round-trip.
pub struct PassthroughTransform;

impl Transform for PassthroughTransform {
    fn name(&self) -> String {
        PASSTHROUGH_ID.to_owned()
    }

    fn compute(&mut self, event: &Event) -> TransformResult {
        TransformResult::new(
            PASSTHROUGH_ID,
            json!({ "dt": event.dt.0, "payload": event.payload.clone() }),
        )
    }
}

/// Drives one `Transform` over its feed subscription and into the Merge
/// stage.
pub struct BaseTransformRunner<T> {
    id: ComponentId,
    transform: T,
    feed: UnboundedReceiver<Vec<u8>>,
    results: Sender<Vec<u8>>,
}

impl<T: Transform> BaseTransformRunner<T> {
    /// `feed` carries framed `FEED` bytes (`feed_address`: SUB at the
    /// transform); `results` carries framed `TRANSFORM` bytes
    /// (`merge_address`: PUSH at the transform, PULL at Merge).
    pub fn new(
        transform: T,
        feed: UnboundedReceiver<Vec<u8>>,
        results: Sender<Vec<u8>>,
    ) -> Self {
        let id = ComponentId::new(transform.name());
        Self {
            id,
            transform,
            feed,
            results,
        }
    }
}

#[async_trait]
impl<T: Transform + Send> Component for BaseTransformRunner<T> {
    fn id(&self) -> &ComponentId {
        &self.id
    }

    async fn do_work(&mut self, heartbeat_timeout: Duration) -> anyhow::Result<bool> {
        match tokio::time::timeout(heartbeat_timeout, self.feed.next()).await {
            Ok(Some(bytes)) => match feed_unframe(&bytes) {
                Ok(Frame::Data(event)) => {
                    let result = self.transform.compute(&event);
                    match transform_frame(&Frame::Data(result)) {
                        Ok(out) => {
                            let _ = self.results.send(out).await;
                        }
                        Err(err) => tracing::warn!(error = %err, "failed to encode transform frame"),
                    }
                    Ok(true)
                }
                Ok(Frame::Done) => {
                    tracing::info!(transform = %self.id, "feed exhausted, signalling DONE");
                    if let Ok(out) = transform_frame(&Frame::Done) {
                        let _ = self.results.send(out).await;
                    }
                    Ok(false)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "dropping malformed feed frame");
                    Ok(true)
                }
            },
            Ok(None) => {
                tracing::info!(transform = %self.id, "feed exhausted, signalling DONE");
                if let Ok(out) = transform_frame(&Frame::Done) {
                    let _ = self.results.send(out).await;
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

    struct Double;

    impl Transform for Double {
        fn name(&self) -> String {
            "DOUBLE".to_owned()
        }

        fn compute(&mut self, event: &Event) -> TransformResult {
            let doubled = event.dt.0 * 2;
            TransformResult::new("DOUBLE", json!(doubled))
        }
    }

    #[test]
    fn passthrough_carries_dt_and_payload() {
        let mut passthrough = PassthroughTransform;
        let event = Event::new("A", Timestamp(7), json!({"v": 1}));
        let result = passthrough.compute(&event);
        assert_eq!(result.name, PASSTHROUGH_ID);
        assert_eq!(result.value["dt"], json!(7));
        assert_eq!(result.value["payload"], json!({"v": 1}));
    }

    #[test]
    fn double_computes_named_result() {
        let mut double = Double;
        let event = Event::new("A", Timestamp(3), json!(null));
        let result = double.compute(&event);
        assert_eq!(result, TransformResult::new("DOUBLE", json!(6)));
    }
}
