//! Application context - owns and wires every long-lived component

use std::sync::Arc;

use tokio::sync::Mutex;
use trainpulse_core::{DeviceEndpoint, StatusDevice};
use trainpulse_domain::{AppConfig, Result};
use trainpulse_infra::{
    HttpTransport, ModeBridge, RailApiClient, RailApiClientConfig, RailServiceProvider,
    TracingEndpoint, Transport,
};
use tracing::{info, warn};

use crate::utils::health::HealthStatus;

/// Dependency container for one running TrainPulse device
pub struct AppContext {
    pub config: AppConfig,
    pub client: Arc<RailApiClient>,
    pub device: StatusDevice,
    pub endpoint: Arc<TracingEndpoint>,
    bridge: Mutex<Option<Arc<ModeBridge>>>,
}

impl AppContext {
    /// Validate `config` and build the production component graph
    ///
    /// # Errors
    /// Returns `TrainPulseError::Config` for invalid settings, or
    /// `TrainPulseError::Network` if the HTTP stack cannot be initialised.
    pub fn new(config: AppConfig) -> Result<Self> {
        let transport = HttpTransport::builder()
            .connect_timeout(config.api.timeout())
            .user_agent(format!(
                "trainpulse/{} ({})",
                env!("CARGO_PKG_VERSION"),
                config.device.serial_number
            ))
            .build()?;
        Self::new_with_transport(config, Arc::new(transport))
    }

    /// Build the component graph over a caller-supplied transport
    ///
    /// # Errors
    /// Returns `TrainPulseError::Config` for invalid settings.
    pub fn new_with_transport(config: AppConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let client_config = RailApiClientConfig::from_settings(&config.api, &config.breaker);
        let client = Arc::new(RailApiClient::new(client_config, transport)?);
        let provider = RailServiceProvider::new(client.clone(), config.route.clone());
        let device = StatusDevice::new(&config.device, Arc::new(provider));

        info!(
            device = %config.device.name,
            origin = %config.route.origin,
            destination = %config.route.destination,
            interval_secs = config.device.update_interval_secs,
            "application context created"
        );

        Ok(Self {
            config,
            client,
            device,
            endpoint: Arc::new(TracingEndpoint::new()),
            bridge: Mutex::new(None),
        })
    }

    /// Register the device, attach the bridge and start polling
    ///
    /// Calling this again once started only restarts polling if it was
    /// stopped; the device is registered and bridged once.
    ///
    /// # Errors
    /// Returns the endpoint's error if registration or the initial attribute
    /// publish fails.
    pub async fn start(&self) -> Result<()> {
        {
            let mut bridge = self.bridge.lock().await;
            if bridge.is_none() {
                self.endpoint.register(self.device.get_device_info()).await?;
                *bridge = Some(ModeBridge::attach(&self.device, self.endpoint.clone())?);
            }
        }

        self.device.start_periodic_updates().await;
        info!(mode = %self.device.get_current_mode(), "TrainPulse started");
        Ok(())
    }

    /// Current health of the rail API and the device
    pub fn health(&self) -> HealthStatus {
        HealthStatus::collect(&self.client.get_health(), self.device.get_current_mode())
    }

    /// Stop polling, close the endpoint and log final health
    ///
    /// # Errors
    /// Returns the endpoint's error if it fails to close.
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutdown called on AppContext");

        self.device.stop_periodic_updates();
        self.endpoint.close().await?;

        let api = self.client.get_health();
        let health = HealthStatus::collect(&api, self.device.get_current_mode());
        let stats = &api.stats;
        if health.is_healthy {
            info!(
                score = health.score,
                circuit = ?stats.state,
                failures = stats.failure_count,
                "final health"
            );
        } else {
            warn!(
                score = health.score,
                circuit = ?stats.state,
                failures = stats.failure_count,
                last_error = stats.last_error.as_ref().map(|e| e.message.as_str()),
                "final health"
            );
        }
        Ok(())
    }
}
