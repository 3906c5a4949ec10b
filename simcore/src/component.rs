//! The abstract worker contract and the generic actor loop that drives it.
//!
//! Every concrete worker in this crate — `Feed`, `Merge`, `BaseTransformRunner`,
//! `DataSourceRunner` — implements [`Component`] and is driven by
//! [`run_component`], which owns the scheduling contract: block on the
//! component's own step for at most `heartbeat_timeout`, ping the host every
//! step (or every timeout), and stop on `DONE` or an out-of-band shutdown
//! signal.

use std::time::Duration;

use acto::{ActoCell, ActoInput, ActoRuntime};
use async_trait::async_trait;

use crate::protocol::ComponentId;
use crate::protocol::SyncClient;

/// Out-of-band command delivered through a component's actor mailbox.
///
/// This is the component's controller back-reference: rather than a
/// component holding a pointer back to its host, the host holds an
/// `ActoRef<ComponentControl>` per component and pushes `Shutdown` into its
/// mailbox at teardown. The component never needs to know who is asking.
pub enum ComponentControl {
    Shutdown,
}

/// One cooperative worker, driven by `do_work` until it reports completion.
#[async_trait]
pub trait Component: Send {
    fn id(&self) -> &ComponentId;

    /// One cooperative step. Returns `Ok(true)` to keep running, `Ok(false)`
    /// once this component has produced its own terminal output and should
    /// signal `DONE` to the host.
    ///
    /// `heartbeat_timeout` is the bound the implementation must place around
    /// its own wait for input (mirroring the Python original's
    /// `self.poll.poll(heartbeat_timeout)`): the step must always return
    /// within that bound, crediting `Ok(true)` with no output produced if
    /// nothing arrived in time. The bound lives *inside* the step, not around
    /// the caller's await of it, so every iteration of the driving loop
    /// completes on schedule and can ping the host regardless of how slowly
    /// (but still healthily) this component's input actually arrives.
    async fn do_work(&mut self, heartbeat_timeout: Duration) -> anyhow::Result<bool>;
}

/// Drives one component's work loop inside an actor mailbox.
///
/// Each iteration races the component's mailbox (for a `Shutdown` command)
/// against one `do_work` step. Since `do_work` bounds its own wait for input
/// by `heartbeat_timeout`, the step always completes and the host always
/// hears a heartbeat on schedule — a component that is merely waiting on a
/// legitimately slow (but still live) upstream is indistinguishable here from
/// one that has nothing to do; only a component whose `do_work` itself never
/// returns (a genuine hang inside a single step, not between steps) goes
/// unheard, and that is caught by the host's own liveness `timeout`.
pub async fn run_component(
    mut cell: ActoCell<ComponentControl, impl ActoRuntime>,
    mut component: Box<dyn Component>,
    sync: SyncClient,
    heartbeat_timeout: Duration,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            input = cell.recv() => {
                match input {
                    ActoInput::Message(ComponentControl::Shutdown) => {
                        tracing::info!(component = %component.id(), "shutdown signal received");
                        return Ok(());
                    }
                    ActoInput::NoMoreSenders => {
                        tracing::debug!(component = %component.id(), "controller mailbox closed");
                        return Ok(());
                    }
                }
            }
            stepped = component.do_work(heartbeat_timeout) => {
                match stepped? {
                    true => sync.heartbeat().await,
                    false => {
                        sync.done().await;
                        return Ok(());
                    }
                }
            }
        }
    }
}
