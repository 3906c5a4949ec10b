use std::time::Duration;

/// The address book of a host's five logical sockets.
///
/// These are realized in-process as channels rather than literal network
/// sockets; the names exist so components and logs can refer to an endpoint
/// by its role instead of by channel internals.
#[derive(Debug, Clone)]
pub struct Addresses {
    pub sync_address: String,
    pub data_address: String,
    pub feed_address: String,
    pub merge_address: String,
    pub result_address: String,
}

impl Default for Addresses {
    fn default() -> Self {
        Addresses {
            sync_address: "inproc://sync".to_owned(),
            data_address: "inproc://data".to_owned(),
            feed_address: "inproc://feed".to_owned(),
            merge_address: "inproc://merge".to_owned(),
            result_address: "inproc://result".to_owned(),
        }
    }
}

/// Host-wide configuration: the address book plus the two liveness timeouts.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub addresses: Addresses,
    /// Cadence at which components must ping and the host polls (default 2000ms).
    pub heartbeat_timeout: Duration,
    /// Host-side liveness threshold (default 5s).
    pub timeout: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            addresses: Addresses::default(),
            heartbeat_timeout: Duration::from_millis(2000),
            timeout: Duration::from_secs(5),
        }
    }
}

impl HostConfig {
    pub fn with_addresses(mut self, addresses: Addresses) -> Self {
        self.addresses = addresses;
        self
    }

    pub fn with_heartbeat_timeout(mut self, d: Duration) -> Self {
        self.heartbeat_timeout = d;
        self
    }

    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }
}
