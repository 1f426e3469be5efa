//! Status polling device
//!
//! Owns the device's externally visible [`Mode`], refreshes it from a
//! [`ServiceProvider`] and announces each transition exactly once.
//!
//! ## Concurrency
//! - Updates are serialized by an async mutex, whether they come from the
//!   periodic task or a direct caller.
//! - The mode itself sits behind a `parking_lot` mutex that is never held
//!   across an await.
//! - The periodic task is a single tokio task owned through a
//!   [`CancellationToken`] and [`JoinHandle`], so its ticks never overlap.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use trainpulse_domain::{
    DeviceConfig, DeviceInfo, Mode, ModeDescriptor, Result, StatusChangeEvent, TrainStatus,
};

use super::derivation::{calculate_delay_minutes, derive_mode_from_delay};
use super::ports::{ServiceProvider, StatusListener};

/// Handle to a polling device; clones share the same state
#[derive(Clone)]
pub struct StatusDevice {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    info: DeviceInfo,
    update_interval: Duration,
    provider: Arc<dyn ServiceProvider>,
    state: Mutex<ModeState>,
    update_lock: tokio::sync::Mutex<()>,
    listeners: Mutex<Vec<Arc<dyn StatusListener>>>,
    task: Mutex<Option<PeriodicTask>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ModeState {
    current: Mode,
    previous: Option<Mode>,
}

struct PeriodicTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl StatusDevice {
    /// Create a device in the `UNKNOWN` mode with periodic updates stopped
    pub fn new(config: &DeviceConfig, provider: Arc<dyn ServiceProvider>) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                info: DeviceInfo::from_config(config),
                update_interval: config.update_interval(),
                provider,
                state: Mutex::new(ModeState::default()),
                update_lock: tokio::sync::Mutex::new(()),
                listeners: Mutex::new(Vec::new()),
                task: Mutex::new(None),
            }),
        }
    }

    /// Register a listener for mode transitions
    pub fn subscribe(&self, listener: Arc<dyn StatusListener>) {
        self.inner.listeners.lock().push(listener);
    }

    /// Poll once and apply the result
    ///
    /// On success the derived mode replaces the current one. On failure the
    /// device reports `UNKNOWN` and the error is returned. Either way a
    /// [`StatusChangeEvent`] goes out only if the mode actually changed.
    ///
    /// # Errors
    /// Whatever the [`ServiceProvider`] failed with.
    #[instrument(skip(self), fields(device = %self.inner.info.name))]
    pub async fn update_train_status(&self) -> Result<Mode> {
        self.inner.update_train_status().await
    }

    /// Poll now, then every `update_interval` until stopped
    ///
    /// No-op if already running. A failed poll, including the first one, is
    /// logged and the schedule carries on.
    pub async fn start_periodic_updates(&self) {
        {
            let mut task = self.inner.task.lock();
            if task.is_some() {
                debug!("periodic updates already running");
                return;
            }

            // First scheduled tick is one interval out; the immediate poll
            // happens below on the caller's task.
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(periodic_loop(
                Arc::downgrade(&self.inner),
                self.inner.update_interval,
                cancel.clone(),
            ));
            *task = Some(PeriodicTask { cancel, handle });
        }

        info!(
            device = %self.inner.info.name,
            interval_secs = self.inner.update_interval.as_secs(),
            "periodic train status updates started"
        );

        if let Err(err) = self.update_train_status().await {
            warn!(error = %err, "initial train status update failed");
        }
    }

    /// Stop the periodic task; no-op if it is not running
    ///
    /// An update already in flight may finish and still announce its
    /// transition, but no new tick starts once this returns.
    pub fn stop_periodic_updates(&self) {
        if let Some(task) = self.inner.task.lock().take() {
            task.cancel.cancel();
            drop(task.handle);
            info!(device = %self.inner.info.name, "periodic train status updates stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.task.lock().is_some()
    }

    pub fn get_current_mode(&self) -> Mode {
        self.inner.state.lock().current
    }

    /// Mode held before the latest transition, `None` before the first one
    pub fn previous_mode(&self) -> Option<Mode> {
        self.inner.state.lock().previous
    }

    pub fn get_supported_modes(&self) -> Vec<ModeDescriptor> {
        Mode::ALL.iter().map(|mode| mode.descriptor()).collect()
    }

    pub fn get_device_info(&self) -> &DeviceInfo {
        &self.inner.info
    }
}

impl DeviceInner {
    async fn update_train_status(&self) -> Result<Mode> {
        let _serialized = self.update_lock.lock().await;

        match self.provider.fetch_best_service().await {
            Ok(service) => {
                let delay_minutes = calculate_delay_minutes(service.as_ref());
                let mode = derive_mode_from_delay(delay_minutes);
                debug!(?delay_minutes, %mode, "derived train status");

                if let Some(previous) = self.transition_to(mode) {
                    let status = TrainStatus::new(delay_minutes, mode, Utc::now());
                    self.notify(&StatusChangeEvent::from_poll(previous, mode, status, service));
                }
                Ok(mode)
            }
            Err(err) => {
                warn!(error = %err, "train status update failed; reporting unknown");
                if let Some(previous) = self.transition_to(Mode::Unknown) {
                    self.notify(&StatusChangeEvent::from_failure(previous, err.to_string()));
                }
                Err(err)
            }
        }
    }

    /// Switch to `mode`, returning the mode it replaced if it changed
    fn transition_to(&self, mode: Mode) -> Option<Mode> {
        let mut state = self.state.lock();
        if state.current == mode {
            return None;
        }
        let previous = state.current;
        *state = ModeState { current: mode, previous: Some(previous) };
        info!(from = %previous, to = %mode, "device mode changed");
        Some(previous)
    }

    fn notify(&self, event: &StatusChangeEvent) {
        let listeners = self.listeners.lock().clone();
        for listener in &listeners {
            listener.on_status_change(event);
        }
    }
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            warn!("status device dropped while polling; cancelling");
            task.cancel.cancel();
        }
    }
}

/// Background polling loop
///
/// Holds only a weak reference so dropping the last [`StatusDevice`] handle
/// ends the loop.
async fn periodic_loop(device: Weak<DeviceInner>, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("periodic update loop cancelled");
                break;
            }
            _ = ticker.tick() => {
                let Some(device) = device.upgrade() else {
                    break;
                };
                if let Err(err) = device.update_train_status().await {
                    warn!(error = %err, "scheduled train status update failed");
                }
            }
        }
    }
}
