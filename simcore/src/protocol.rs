use std::borrow::Borrow;
use std::fmt;

use tokio::sync::{mpsc, oneshot};

use crate::error::ProtocolError;

/// A stable identifier for a component, unique within a host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ComponentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Reserved component ids pre-registered by the host.
pub const FEED_ID: &str = "FEED";
pub const MERGE_ID: &str = "MERGE";
pub const PASSTHROUGH_ID: &str = "PASSTHROUGH";

/// Literal reply sent by the host for every well-formed or malformed sync request.
pub const ACK: &str = "ack";

/// Liveness status carried on the sync channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Heartbeat,
    Done,
}

impl Status {
    fn as_wire(&self) -> &'static str {
        match self {
            Status::Heartbeat => "HEARTBEAT",
            Status::Done => "DONE",
        }
    }

    fn from_wire(s: &str) -> Option<Self> {
        match s {
            "HEARTBEAT" => Some(Status::Heartbeat),
            "DONE" => Some(Status::Done),
            _ => None,
        }
    }
}

/// A parsed `<component_id>:<status>` sync request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFrame {
    pub component_id: ComponentId,
    pub status: Status,
}

impl SyncFrame {
    pub fn new(component_id: impl Into<ComponentId>, status: Status) -> Self {
        Self {
            component_id: component_id.into(),
            status,
        }
    }

    pub fn to_wire(&self) -> String {
        format!("{}:{}", self.component_id, self.status.as_wire())
    }

    /// Parses a raw sync-channel request.
    ///
    /// Returns `Err` on anything other than exactly one colon separating a
    /// non-empty id from a recognised status. Callers must reply `ack`
    /// regardless of the outcome: this function never tells its caller to
    /// skip the reply.
    pub fn parse_wire(raw: &str) -> Result<Self, ProtocolError> {
        let mut parts = raw.splitn(2, ':');
        let (id, status) = match (parts.next(), parts.next()) {
            (Some(id), Some(status)) if !id.is_empty() => (id, status),
            _ => {
                return Err(ProtocolError {
                    raw: raw.to_owned(),
                })
            }
        };
        let status = Status::from_wire(status).ok_or_else(|| ProtocolError {
            raw: raw.to_owned(),
        })?;
        Ok(SyncFrame {
            component_id: ComponentId::new(id),
            status,
        })
    }
}

/// One request on the sync channel: the raw wire text plus a one-shot reply
/// slot the host uses to send `ack`, which is always sent, win or lose.
///
/// The text travels un-parsed so the host's loop exercises
/// [`SyncFrame::parse_wire`] exactly as a real socket boundary would,
/// including its malformed-frame path.
pub struct SyncRequest {
    pub raw: String,
    pub reply: oneshot::Sender<()>,
}

/// The component-side handle to the sync channel.
///
/// Every component holds one of these; it is the entire "ping the host"
/// surface, independent of whatever socket/channel technology backs
/// `sync_address`.
#[derive(Clone)]
pub struct SyncClient {
    id: ComponentId,
    sender: mpsc::Sender<SyncRequest>,
}

impl SyncClient {
    pub fn new(id: ComponentId, sender: mpsc::Sender<SyncRequest>) -> Self {
        Self { id, sender }
    }

    pub async fn heartbeat(&self) {
        self.ping(Status::Heartbeat).await
    }

    pub async fn done(&self) {
        self.ping(Status::Done).await
    }

    async fn ping(&self, status: Status) {
        let (reply, wait) = oneshot::channel();
        let raw = SyncFrame::new(self.id.clone(), status).to_wire();
        if self.sender.send(SyncRequest { raw, reply }).await.is_ok() {
            // The host always replies; if it doesn't (torn down), dropping
            // the sender end completes this await with an error we ignore —
            // the component is shutting down anyway.
            let _ = wait.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_heartbeat() {
        let frame = SyncFrame::new("source-a", Status::Heartbeat);
        let wire = frame.to_wire();
        assert_eq!(wire, "source-a:HEARTBEAT");
        assert_eq!(SyncFrame::parse_wire(&wire).unwrap(), frame);
    }

    #[test]
    fn round_trips_done() {
        let frame = SyncFrame::new("FEED", Status::Done);
        assert_eq!(SyncFrame::parse_wire(&frame.to_wire()).unwrap(), frame);
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(SyncFrame::parse_wire("no-colon-here").is_err());
        assert!(SyncFrame::parse_wire(":DONE").is_err());
        assert!(SyncFrame::parse_wire("source-a:BOGUS").is_err());
        assert!(SyncFrame::parse_wire("a:b:DONE").is_err());
    }
}
