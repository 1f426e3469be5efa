//! Port interfaces for train status polling
//!
//! These traits define the boundaries between the polling core and the
//! infrastructure that fetches schedules and talks to the device framework.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use trainpulse_domain::{AttributeUpdate, DeviceInfo, Result, ServiceRecord, StatusChangeEvent};

/// Source of the single service the device reports on
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    /// Fetch the best candidate service, `None` when nothing is running
    async fn fetch_best_service(&self) -> Result<Option<ServiceRecord>>;
}

/// Receiver of mode transitions
///
/// Called synchronously, in transition order, exactly once per transition.
/// Implementations must not block.
pub trait StatusListener: Send + Sync {
    fn on_status_change(&self, event: &StatusChangeEvent);
}

/// Connection to the external smart-home device framework
#[async_trait]
pub trait DeviceEndpoint: Send + Sync {
    /// Announce the device identity
    async fn register(&self, info: &DeviceInfo) -> Result<()>;

    /// Write the attribute values for the current mode
    fn publish(&self, update: &AttributeUpdate) -> Result<()>;

    /// Close the framework connection
    async fn close(&self) -> Result<()>;
}

/// Forwards events into an unbounded channel
///
/// Lets async consumers await transitions without blocking the device.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: UnboundedSender<StatusChangeEvent>,
}

impl ChannelListener {
    pub fn new(sender: UnboundedSender<StatusChangeEvent>) -> Self {
        Self { sender }
    }
}

impl StatusListener for ChannelListener {
    fn on_status_change(&self, event: &StatusChangeEvent) {
        if self.sender.send(event.clone()).is_err() {
            debug!("status channel receiver dropped; event discarded");
        }
    }
}
