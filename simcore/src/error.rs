use thiserror::Error;

use crate::protocol::ComponentId;

/// A sync-channel frame that did not parse as `<component_id>:<status>`.
///
/// Carries the raw text purely for logging; callers must still reply `ack`
/// and must never let this error suppress that reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed sync frame: {raw:?}")]
pub struct ProtocolError {
    pub raw: String,
}

/// A data-plane frame that failed to decode.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("frame decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("frame was empty")]
    Empty,
}

/// Failure to register a component with the host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("component id {0:?} is already registered")]
    DuplicateId(ComponentId),
    #[error("transform name {0:?} collides with an already-registered transform")]
    DuplicateTransformName(String),
    #[error("transform name {0:?} collides with a reserved component id")]
    ReservedTransformName(String),
}

/// Top-level error returned by `ComponentHost` setup and run methods.
#[derive(Error, Debug)]
pub enum HostError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("component {id:?} exceeded the liveness timeout")]
    LivenessLost { id: ComponentId },
    #[error("failed to start the actor runtime: {0}")]
    Runtime(anyhow::Error),
}
