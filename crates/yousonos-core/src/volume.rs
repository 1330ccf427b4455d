//! Local mirror of device volumes.
//!
//! Slider moves are clamped and shown immediately. Sending the resulting
//! `set_volume` is left to the session's debouncer, one timer per device.

use tracing::{debug, info, warn};

use crate::model::Device;
use crate::store::OptimisticStore;

/// Default increment of the volume step buttons.
pub const DEFAULT_VOLUME_STEP: u32 = 5;

/// Device volume mirror.
#[derive(Debug, Clone, Default)]
pub struct VolumeStore {
    devices: OptimisticStore<Device>,
}

impl VolumeStore {
    /// Create an empty mirror.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the initial device list.
    pub fn setup(&mut self, devices: Vec<Device>) {
        info!("Device setup received: {} device(s)", devices.len());
        self.devices.reconcile(within_range(devices));
    }

    /// Replace local volumes with a pushed snapshot. Returns whether the view changed.
    ///
    /// A pushed volume above the device maximum is clamped to it.
    pub fn reconcile(&mut self, devices: Vec<Device>) -> bool {
        let changed = self.devices.reconcile(within_range(devices));
        debug!("Volumes reconciled (changed: {})", changed);
        changed
    }

    /// Visible devices, in setup order.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        self.devices.items()
    }

    /// Visible state of one device.
    #[must_use]
    pub fn device(&self, device_name: &str) -> Option<&Device> {
        self.devices.get(device_name)
    }

    /// Visible volume of one device.
    #[must_use]
    pub fn volume(&self, device_name: &str) -> Option<u32> {
        self.device(device_name).map(|device| device.current_volume)
    }

    /// Whether unconfirmed volume changes are shown.
    #[must_use]
    pub const fn has_local_intent(&self) -> bool {
        self.devices.has_local_intent()
    }

    /// Set a device volume locally, clamped to `[0, max_volume]`.
    ///
    /// Returns the stored volume, or `None` for an unknown device.
    pub fn apply_local_volume(&mut self, device_name: &str, requested: i64) -> Option<u32> {
        let Some(volume) = self
            .device(device_name)
            .map(|device| device.clamp_volume(requested))
        else {
            debug!("Ignoring volume change for unknown device {}", device_name);
            return None;
        };
        self.devices
            .update(device_name, |device| device.current_volume = volume);
        debug!("Local volume of {} set to {}", device_name, volume);
        Some(volume)
    }

    /// Move a device volume by `delta` from its visible value, clamped.
    pub fn step_volume(&mut self, device_name: &str, delta: i64) -> Option<u32> {
        let current = self.volume(device_name)?;
        self.apply_local_volume(device_name, i64::from(current) + delta)
    }
}

fn within_range(mut devices: Vec<Device>) -> Vec<Device> {
    for device in &mut devices {
        if device.current_volume > device.max_volume {
            warn!(
                "Pushed volume {} of {} exceeds its maximum {}, clamping",
                device.current_volume, device.device_name, device.max_volume
            );
            device.current_volume = device.max_volume;
        }
    }
    devices
}
