//! Serial Transport Lifecycle
//!
//! Owns the process-wide descriptor of the controller device: bounded-retry
//! open, release-then-close teardown.

use crate::domain::settings::VendorSettings;
use crate::error::VendorError;
use crate::infrastructure::device::{CharDevice, DeviceHandle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Configuration for open/close behavior
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Device node to open
    pub device_path: PathBuf,
    /// Maximum open attempts
    pub max_open_attempts: u32,
    /// Delay between failed open attempts
    pub open_retry_delay: Duration,
    /// Wait between releasing the reader and closing the descriptor
    pub release_grace: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::from(&VendorSettings::default())
    }
}

impl From<&VendorSettings> for TransportConfig {
    fn from(s: &VendorSettings) -> Self {
        Self {
            device_path: PathBuf::from(&s.device_path),
            max_open_attempts: s.open_max_attempts,
            open_retry_delay: Duration::from_millis(s.open_retry_delay_ms),
            release_grace: Duration::from_millis(s.release_grace_ms),
        }
    }
}

/// Lifecycle manager for the controller device
pub struct SerialTransport<D: CharDevice> {
    device: D,
    config: TransportConfig,
    handle: Mutex<Option<DeviceHandle>>,
}

impl<D: CharDevice> SerialTransport<D> {
    pub fn new(device: D, config: TransportConfig) -> Self {
        Self {
            device,
            config,
            handle: Mutex::new(None),
        }
    }

    /// Currently open descriptor, if any
    pub async fn handle(&self) -> Option<DeviceHandle> {
        *self.handle.lock().await
    }

    pub async fn is_open(&self) -> bool {
        self.handle().await.is_some()
    }

    /// Open the device, retrying up to `max_open_attempts` times
    pub async fn open(&self) -> Result<DeviceHandle, VendorError> {
        let mut slot = self.handle.lock().await;
        let path = &self.config.device_path;

        if let Some(handle) = *slot {
            warn!("Port {} already open (fd {})", path.display(), handle.raw());
            return Ok(handle);
        }

        let attempts = self.config.max_open_attempts.max(1);
        for attempt in 1..=attempts {
            match self.device.open(path) {
                Ok(handle) => {
                    info!("open port {} success (attempt {})", path.display(), attempt);
                    *slot = Some(handle);
                    return Ok(handle);
                }
                Err(e) => {
                    debug!(
                        "Open attempt {}/{} for {} failed: {}",
                        attempt,
                        attempts,
                        path.display(),
                        e
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.config.open_retry_delay).await;
                    }
                }
            }
        }

        error!("Fail to open port {}", path.display());
        Err(VendorError::OpenExhausted {
            path: path.clone(),
            attempts,
        })
    }

    /// Release any blocked reader, then close the device.
    ///
    /// The descriptor is forgotten even when `close` fails.
    pub async fn close(&self) -> Result<(), VendorError> {
        let mut slot = self.handle.lock().await;
        let handle = slot.take().ok_or(VendorError::NotOpen)?;
        let path = &self.config.device_path;

        // The reader is parked in read(); wake it before the fd goes away
        if let Err(e) = self.device.release(handle) {
            warn!("Failed to release reader on {}: {}", path.display(), e);
        }
        tokio::time::sleep(self.config.release_grace).await;

        info!("close port {}", path.display());
        self.device.close(handle).map_err(|source| {
            error!("Fail to close port {}: {}", path.display(), source);
            VendorError::Close {
                path: path.clone(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDevice;

    fn config(attempts: u32) -> TransportConfig {
        TransportConfig {
            device_path: PathBuf::from("/dev/mbtchar0"),
            max_open_attempts: attempts,
            open_retry_delay: Duration::from_millis(1),
            release_grace: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_open_succeeds_within_budget() {
        for failures in [0, 1, 5, 19] {
            let device = FakeDevice::failing_opens(failures);
            let transport = SerialTransport::new(device.clone(), config(20));

            let handle = transport.open().await.unwrap();
            assert!(handle.is_valid());
            assert_eq!(device.opens(), failures + 1);
            assert_eq!(transport.handle().await, Some(handle));
        }
    }

    #[tokio::test]
    async fn test_open_exhausts_budget() {
        for failures in [20, 21, 100] {
            let device = FakeDevice::failing_opens(failures);
            let transport = SerialTransport::new(device.clone(), config(20));

            let err = transport.open().await.unwrap_err();
            assert!(matches!(err, VendorError::OpenExhausted { attempts: 20, .. }));
            assert_eq!(err.code(), -1);
            assert_eq!(device.opens(), 20);
            assert!(!transport.is_open().await);
        }
    }

    #[tokio::test]
    async fn test_close_unopened_device() {
        let device = FakeDevice::failing_opens(0);
        let transport = SerialTransport::new(device.clone(), config(20));

        let err = transport.close().await.unwrap_err();
        assert!(matches!(err, VendorError::NotOpen));
        assert_eq!(device.releases(), 0);
        assert_eq!(device.closes(), 0);
    }

    #[tokio::test]
    async fn test_close_releases_before_closing() {
        let device = FakeDevice::failing_opens(0);
        let transport = SerialTransport::new(device.clone(), config(20));

        transport.open().await.unwrap();
        transport.close().await.unwrap();

        assert_eq!(device.calls(), vec!["open", "release", "close"]);
        assert!(!transport.is_open().await);
        assert!(matches!(transport.close().await, Err(VendorError::NotOpen)));
    }

    #[tokio::test]
    async fn test_close_failure_still_forgets_handle() {
        let device = FakeDevice::failing_opens(0);
        device.fail_close(true);
        let transport = SerialTransport::new(device.clone(), config(20));

        transport.open().await.unwrap();
        let err = transport.close().await.unwrap_err();

        assert!(matches!(err, VendorError::Close { .. }));
        assert!(!transport.is_open().await);
    }

    #[tokio::test]
    async fn test_second_open_reuses_handle() {
        let device = FakeDevice::failing_opens(0);
        let transport = SerialTransport::new(device.clone(), config(20));

        let first = transport.open().await.unwrap();
        let second = transport.open().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(device.opens(), 1);
    }
}
