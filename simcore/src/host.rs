//! ComponentHost: address book, registration, launch, and the sync/heartbeat loop.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use acto::{AcTokio, ActoRef};
use tokio::sync::mpsc;

use crate::addresses::HostConfig;
use crate::codec::{merge_unframe, Frame};
use crate::component::{run_component, Component, ComponentControl};
use crate::datasource::{DataSource, DataSourceRunner};
use crate::error::{HostError, RegistrationError};
use crate::feed::Feed;
use crate::merge::Merge;
use crate::model::MergedRecord;
use crate::protocol::{ComponentId, Status, SyncClient, SyncFrame, SyncRequest, FEED_ID, MERGE_ID, PASSTHROUGH_ID};
use crate::transform::{BaseTransformRunner, PassthroughTransform, Transform};

const CHANNEL_CAPACITY: usize = 256;

/// Owns the address book, the registered components, and the sync/heartbeat
/// loop that supervises them.
pub struct ComponentHost {
    config: HostConfig,
    sources: Vec<Box<dyn DataSource>>,
    transforms: Vec<Box<dyn Transform>>,
    ids: HashSet<ComponentId>,
    transform_names: HashSet<String>,
}

impl ComponentHost {
    pub fn new(config: HostConfig) -> Self {
        let ids = [FEED_ID, MERGE_ID, PASSTHROUGH_ID]
            .into_iter()
            .map(ComponentId::new)
            .collect();
        ComponentHost {
            config,
            sources: Vec::new(),
            transforms: Vec::new(),
            ids,
            transform_names: HashSet::new(),
        }
    }

    /// Registers a DataSource, binding its id into the Feed's eventual buffer
    /// keyset. Rejects a source whose id collides with one already
    /// registered or with a reserved component id.
    pub fn register_source<D: DataSource>(&mut self, source: D) -> Result<(), RegistrationError> {
        let id = source.source_id();
        if self.ids.contains(&id) {
            return Err(RegistrationError::DuplicateId(id));
        }
        self.ids.insert(id);
        self.sources.push(Box::new(source));
        Ok(())
    }

    /// Registers a Transform, binding its name into the Merge's eventual
    /// buffer keyset. Rejects a name collision with an already-registered
    /// transform or with a reserved id, at registration time rather than
    /// letting two transforms race at runtime.
    pub fn register_transform<T: Transform>(&mut self, transform: T) -> Result<(), RegistrationError> {
        let name = transform.name();
        if name == FEED_ID || name == MERGE_ID || name == PASSTHROUGH_ID {
            return Err(RegistrationError::ReservedTransformName(name));
        }
        if self.transform_names.contains(&name) {
            return Err(RegistrationError::DuplicateTransformName(name));
        }
        self.transform_names.insert(name.clone());
        self.ids.insert(ComponentId::new(name));
        self.transforms.push(Box::new(transform));
        Ok(())
    }

    /// Launches every registered component plus Feed/Merge/Passthrough, runs
    /// the sync/heartbeat loop to completion, and returns the merged record
    /// trace observed on `result_address`.
    ///
    /// Terminates when the registry empties out (normal completion) or when
    /// any component's `last_seen` exceeds `config.timeout`, in which case
    /// the remaining actors are sent a shutdown signal and the error names
    /// the component that was lost.
    pub async fn run(self) -> Result<Vec<MergedRecord>, HostError> {
        let ComponentHost {
            config,
            sources,
            transforms,
            ids,
            transform_names,
        } = self;

        let worker_threads = (sources.len() + transforms.len() + 3).clamp(2, 8);
        let rt = AcTokio::new("ComponentHost", worker_threads).map_err(HostError::Runtime)?;

        tracing::debug!(address = %config.addresses.sync_address, "sync endpoint bound");
        let (sync_tx, mut sync_rx) = mpsc::channel::<SyncRequest>(CHANNEL_CAPACITY);

        tracing::debug!(address = %config.addresses.result_address, "result endpoint bound");
        let (result_tx, mut result_rx) = mpsc::channel::<Vec<u8>>(CHANNEL_CAPACITY);

        let mut all_transform_names: HashSet<String> = transform_names;
        all_transform_names.insert(PASSTHROUGH_ID.to_owned());
        tracing::debug!(address = %config.addresses.merge_address, transforms = all_transform_names.len(), "merge endpoint bound");
        let (merge, mut result_senders) = Merge::new(all_transform_names, result_tx);

        tracing::debug!(address = %config.addresses.data_address, sources = sources.len(), "data endpoint bound");
        let (source_txs, source_rxs): (Vec<_>, Vec<_>) = sources
            .iter()
            .map(|_| mpsc::channel::<Vec<u8>>(CHANNEL_CAPACITY))
            .unzip();
        tracing::debug!(address = %config.addresses.feed_address, "feed endpoint bound");
        let mut feed = Feed::new(source_rxs);

        let mut actors: HashMap<ComponentId, ActoRef<ComponentControl>> = HashMap::new();
        let mut last_seen: HashMap<ComponentId, Instant> = HashMap::new();
        let mut registry: HashSet<ComponentId> = ids;
        let now = Instant::now();
        for id in &registry {
            last_seen.insert(id.clone(), now);
        }

        macro_rules! spawn_component {
            ($id:expr, $component:expr) => {{
                let id: ComponentId = $id;
                let sync = SyncClient::new(id.clone(), sync_tx.clone());
                let boxed: Box<dyn Component> = Box::new($component);
                let heartbeat_timeout = config.heartbeat_timeout;
                let name = id.as_str().to_owned();
                let actor_ref = rt
                    .spawn_actor(name, move |cell| run_component(cell, boxed, sync, heartbeat_timeout))
                    .me;
                actors.insert(id, actor_ref);
            }};
        }

        // Every subscriber registers on `feed` before the Feed itself starts
        // running: `Feed::subscribe` mutates the dispatcher's subscriber
        // list, which must be settled before the first `do_work` fan-out.
        let passthrough_feed = feed.subscribe();
        let passthrough_results = result_senders.remove(PASSTHROUGH_ID).expect("passthrough always registered");
        spawn_component!(
            ComponentId::new(PASSTHROUGH_ID),
            BaseTransformRunner::new(PassthroughTransform, passthrough_feed, passthrough_results)
        );

        for transform in transforms {
            let name = transform.name();
            let feed_rx = feed.subscribe();
            let results = result_senders.remove(&name).expect("registered transform has a Merge channel");
            spawn_component!(ComponentId::new(name), BaseTransformRunner::new(transform, feed_rx, results));
        }

        spawn_component!(ComponentId::new(MERGE_ID), merge);
        spawn_component!(ComponentId::new(FEED_ID), feed);

        for (source, tx) in sources.into_iter().zip(source_txs) {
            let id = source.source_id();
            spawn_component!(id, DataSourceRunner::new(source, tx));
        }

        let sync_loop = async {
            loop {
                if registry.is_empty() {
                    break Ok(());
                }
                match tokio::time::timeout(config.heartbeat_timeout, sync_rx.recv()).await {
                    Ok(Some(request)) => {
                        handle_sync_request(&request, &mut registry, &mut last_seen);
                        let _ = request.reply.send(());
                    }
                    Ok(None) => break Ok(()),
                    Err(_elapsed) => {}
                }
                let now = Instant::now();
                if let Some(id) = last_seen
                    .iter()
                    .find(|(_, &seen)| now.duration_since(seen) > config.timeout)
                    .map(|(id, _)| id.clone())
                {
                    tracing::error!(component = %id, "component exceeded the liveness timeout");
                    for actor in actors.values() {
                        actor.send(ComponentControl::Shutdown);
                    }
                    break Err(HostError::LivenessLost { id });
                }
            }
        };

        let collect = async {
            let mut records = Vec::new();
            while let Some(bytes) = result_rx.recv().await {
                match merge_unframe(&bytes) {
                    Ok(Frame::Data(record)) => records.push(record),
                    Ok(Frame::Done) => break,
                    Err(err) => tracing::warn!(error = %err, "dropping malformed merge frame"),
                }
            }
            records
        };

        let (sync_result, records) = tokio::join!(sync_loop, collect);
        for actor in actors.values() {
            actor.send(ComponentControl::Shutdown);
        }
        sync_result?;
        Ok(records)
    }
}

fn handle_sync_request(
    request: &SyncRequest,
    registry: &mut HashSet<ComponentId>,
    last_seen: &mut HashMap<ComponentId, Instant>,
) {
    match SyncFrame::parse_wire(&request.raw) {
        Ok(frame) if registry.contains(&frame.component_id) => match frame.status {
            Status::Heartbeat => {
                tracing::trace!(component = %frame.component_id, "heartbeat");
                last_seen.insert(frame.component_id, Instant::now());
            }
            Status::Done => {
                tracing::info!(component = %frame.component_id, "component signalled DONE");
                registry.remove(&frame.component_id);
                last_seen.remove(&frame.component_id);
            }
        },
        Ok(frame) => {
            tracing::warn!(component = %frame.component_id, "sync message from an unregistered component");
        }
        Err(err) => {
            tracing::warn!(error = %err, "malformed sync frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::DataSource;
    use crate::model::{Event, Timestamp};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;

    struct Fixed {
        id: ComponentId,
        remaining: VecDeque<u64>,
    }

    #[async_trait]
    impl DataSource for Fixed {
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

    #[test]
    fn rejects_duplicate_source_ids() {
        let mut host = ComponentHost::new(HostConfig::default());
        host.register_source(fixed("A", [1])).unwrap();
        assert_eq!(
            host.register_source(fixed("A", [2])).unwrap_err(),
            RegistrationError::DuplicateId(ComponentId::new("A"))
        );
    }

    #[test]
    fn rejects_reserved_transform_names() {
        struct Named(&'static str);
        impl Transform for Named {
            fn name(&self) -> String {
                self.0.to_owned()
            }
            fn compute(&mut self, event: &Event) -> crate::model::TransformResult {
                crate::model::TransformResult::new(self.0, event.payload.clone())
            }
        }
        let mut host = ComponentHost::new(HostConfig::default());
        assert_eq!(
            host.register_transform(Named("FEED")).unwrap_err(),
            RegistrationError::ReservedTransformName("FEED".to_owned())
        );
    }

    #[test]
    fn rejects_duplicate_transform_names() {
        struct Named(&'static str);
        impl Transform for Named {
            fn name(&self) -> String {
                self.0.to_owned()
            }
            fn compute(&mut self, event: &Event) -> crate::model::TransformResult {
                crate::model::TransformResult::new(self.0, event.payload.clone())
            }
        }
        let mut host = ComponentHost::new(HostConfig::default());
        host.register_transform(Named("X")).unwrap();
        assert_eq!(
            host.register_transform(Named("X")).unwrap_err(),
            RegistrationError::DuplicateTransformName("X".to_owned())
        );
    }
}
