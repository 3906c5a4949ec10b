//! DataSource: the producer contract at the edge of the Feed.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::codec::{datasource_frame, datasource_unframe, Frame};
use crate::component::Component;
use crate::model::Event;
use crate::protocol::ComponentId;

/// The user-supplied source contract.
///
/// `next_event` is the source's `do_work` step: it returns `Some(event)` for
/// as long as the source has more to emit, and `None` exactly once to signal
/// that it is finished (translated to the `DONE` sentinel by
/// `DataSourceRunner`). Implementations are responsible for their own
/// `get_type()` category and for keeping `dt` non-decreasing within
/// themselves — the Feed does not itself check this.
#[async_trait]
pub trait DataSource: Send + 'static {
    fn source_id(&self) -> ComponentId;
    fn get_type(&self) -> &'static str;
    async fn next_event(&mut self) -> Option<Event>;
}

/// Forwards to a boxed source, mirroring `Transform`'s blanket impl so the
/// host can store heterogeneous sources as `Box<dyn DataSource>` and still
/// hand one off to `DataSourceRunner` directly.
#[async_trait]
impl DataSource for Box<dyn DataSource> {
    fn source_id(&self) -> ComponentId {
        (**self).source_id()
    }

    fn get_type(&self) -> &'static str {
        (**self).get_type()
    }

    async fn next_event(&mut self) -> Option<Event> {
        (**self).next_event().await
    }
}

/// Drives one `DataSource` onto its private lane into the Feed's per-source
/// queue.
pub struct DataSourceRunner<D> {
    id: ComponentId,
    source: D,
    feed: Sender<Vec<u8>>,
}

impl<D: DataSource> DataSourceRunner<D> {
    /// `feed` carries framed `DATASOURCE` bytes (`data_address`: PUSH at the
    /// source, PULL at the Feed).
    pub fn new(source: D, feed: Sender<Vec<u8>>) -> Self {
        let id = source.source_id();
        Self { id, source, feed }
    }
}

#[async_trait]
impl<D: DataSource + Send> Component for DataSourceRunner<D> {
    fn id(&self) -> &ComponentId {
        &self.id
    }

    async fn do_work(&mut self, heartbeat_timeout: Duration) -> anyhow::Result<bool> {
        match tokio::time::timeout(heartbeat_timeout, self.source.next_event()).await {
            Ok(Some(event)) => {
                match datasource_frame(&Frame::Data(event)) {
                    Ok(bytes) => {
                        let _ = self.feed.send(bytes).await;
                    }
                    Err(err) => tracing::warn!(error = %err, "failed to encode datasource frame"),
                }
                Ok(true)
            }
            Ok(None) => {
                tracing::info!(source = %self.id, "source exhausted, signalling DONE");
                if let Ok(bytes) = datasource_frame(&Frame::Done) {
                    let _ = self.feed.send(bytes).await;
                }
                Ok(false)
            }
            Err(_elapsed) => Ok(true),
        }
    }
}
