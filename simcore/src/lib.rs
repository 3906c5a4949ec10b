//! Concurrency and messaging core for a parallel event-processing simulator.
//!
//! Data flow: [`DataSource`](datasource::DataSource)s feed the
//! [`Feed`](feed::Feed), which chronologically merges them and fans the
//! result out to every [`Transform`](transform::Transform) (plus the
//! distinguished [`PassthroughTransform`](transform::PassthroughTransform)).
//! The [`Merge`](merge::Merge) stage combines each tick's transform results
//! into one [`MergedRecord`](model::MergedRecord). A
//! [`ComponentHost`](host::ComponentHost) owns the address book, launches
//! every component as its own actor, and drives a heartbeat/DONE control
//! protocol that detects completion and liveness loss without relying on
//! the actor runtime's own supervision.

pub mod addresses;
pub mod codec;
pub mod component;
pub mod datasource;
pub mod error;
pub mod feed;
pub mod host;
pub mod logging;
pub mod merge;
pub mod model;
pub mod protocol;
pub mod simulator;
pub mod transform;

pub use addresses::{Addresses, HostConfig};
pub use codec::{Codec, Frame, JsonCodec};
pub use component::{Component, ComponentControl};
pub use datasource::DataSource;
pub use error::{CodecError, HostError, ProtocolError, RegistrationError};
pub use feed::Feed;
pub use host::ComponentHost;
pub use merge::Merge;
pub use model::{Event, MergedRecord, Timestamp, TransformResult};
pub use protocol::{ComponentId, Status, SyncClient, SyncFrame};
pub use simulator::SimulatorBase;
pub use transform::{PassthroughTransform, Transform};
