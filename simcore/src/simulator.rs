//! SimulatorBase: a thin specialization of ComponentHost with a fixed id.

use crate::addresses::HostConfig;
use crate::datasource::DataSource;
use crate::error::{HostError, RegistrationError};
use crate::host::ComponentHost;
use crate::model::MergedRecord;
use crate::transform::Transform;

/// Fixed informational id reported by a `Simulator`'s top-level component.
pub const SIMULATOR_ID: &str = "Simulator";

/// A `ComponentHost` under a fixed name, exposing `simulate()` as the public
/// entry point instead of `run()`. Registration and configuration are
/// otherwise identical to the host it wraps.
pub struct SimulatorBase {
    host: ComponentHost,
}

impl SimulatorBase {
    pub fn new(config: HostConfig) -> Self {
        SimulatorBase {
            host: ComponentHost::new(config),
        }
    }

    pub fn register_source<D: DataSource>(&mut self, source: D) -> Result<(), RegistrationError> {
        self.host.register_source(source)
    }

    pub fn register_transform<T: Transform>(&mut self, transform: T) -> Result<(), RegistrationError> {
        self.host.register_transform(transform)
    }

    /// Alias for `ComponentHost::run`.
    pub async fn simulate(self) -> Result<Vec<MergedRecord>, HostError> {
        self.host.run().await
    }
}
