//! Bridge from device mode transitions to framework attributes
//!
//! [`ModeBridge`] listens to a [`StatusDevice`] and writes every new mode to
//! a [`DeviceEndpoint`]. [`TracingEndpoint`] stands in for the external
//! framework in production. Like a real attribute store it holds only the
//! latest value, plus a count of writes.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use trainpulse_core::{DeviceEndpoint, StatusDevice, StatusListener};
use trainpulse_domain::{
    AttributeUpdate, DeviceInfo, Mode, Result, StatusChangeEvent, TrainPulseError,
};
use tracing::{info, warn};

/// Publishes the device's mode to the framework on every transition
pub struct ModeBridge {
    endpoint: Arc<dyn DeviceEndpoint>,
}

impl ModeBridge {
    /// Publish the device's current mode, then follow its transitions
    ///
    /// # Errors
    /// Returns the endpoint's error if the initial publish fails; the bridge
    /// is not subscribed in that case.
    pub fn attach(device: &StatusDevice, endpoint: Arc<dyn DeviceEndpoint>) -> Result<Arc<Self>> {
        let bridge = Arc::new(Self { endpoint });
        bridge.publish_mode(device.get_current_mode())?;
        device.subscribe(bridge.clone());
        Ok(bridge)
    }

    fn publish_mode(&self, mode: Mode) -> Result<()> {
        self.endpoint.publish(&AttributeUpdate::from(mode))
    }
}

impl StatusListener for ModeBridge {
    fn on_status_change(&self, event: &StatusChangeEvent) {
        if let Err(err) = self.publish_mode(event.current_mode) {
            warn!(error = %err, mode = %event.current_mode, "failed to publish mode change");
        }
    }
}

#[derive(Debug, Default)]
struct EndpointState {
    registered: Option<DeviceInfo>,
    last: Option<AttributeUpdate>,
    publish_count: u64,
    closed: bool,
}

/// Endpoint that logs attribute writes instead of speaking a device protocol
#[derive(Debug, Default)]
pub struct TracingEndpoint {
    state: Mutex<EndpointState>,
}

impl TracingEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently published attributes
    pub fn last_update(&self) -> Option<AttributeUpdate> {
        self.state.lock().last
    }

    /// Number of accepted publishes since creation
    pub fn publish_count(&self) -> u64 {
        self.state.lock().publish_count
    }

    pub fn registered(&self) -> Option<DeviceInfo> {
        self.state.lock().registered.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

#[async_trait]
impl DeviceEndpoint for TracingEndpoint {
    async fn register(&self, info: &DeviceInfo) -> Result<()> {
        info!(
            name = %info.name,
            vendor = %info.vendor_name,
            product = %info.product_name,
            serial = %info.serial_number,
            "device registered"
        );
        self.state.lock().registered = Some(info.clone());
        Ok(())
    }

    fn publish(&self, update: &AttributeUpdate) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TrainPulseError::Bridge("endpoint is closed".to_string()));
        }
        info!(
            mode = update.mode_code,
            status = %update.status,
            air_quality = update.air_quality,
            "device attributes updated"
        );
        state.last = Some(*update);
        state.publish_count += 1;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            info!(published = state.publish_count, "device endpoint closed");
        }
        Ok(())
    }
}
