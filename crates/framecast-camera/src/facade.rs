//! Thread-safe camera facade.
//!
//! [`Camera`] is the handle the rest of the system holds: cheap to
//! clone, safe to share, serializing every device access through one
//! internal async mutex. The mutex stays held for the whole of a
//! capture, so parameter writes observe frame boundaries and the
//! device never sees interleaved commands.

use crate::device::{AnyFrameDevice, CapturedFrame, DeviceInfo, FrameDevice, VirtualCamera};
use crate::error::Result;
use crate::features::FeatureValue;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Shared, cloneable facade over the single frame device.
///
/// # Examples
///
/// ```no_run
/// use framecast_camera::Camera;
/// use std::time::Duration;
///
/// # async fn example() -> framecast_camera::Result<()> {
/// let camera = Camera::virtual_camera();
/// camera.set_exposure(Duration::from_micros(5000)).await?;
/// let frame = camera.capture(None).await?;
/// println!("captured frame {}", frame.frame_id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Camera {
    device: Arc<Mutex<AnyFrameDevice>>,
    /// Mirror of the device's `ExposureTime`, readable without taking
    /// the device mutex. Used as the default capture deadline.
    cached_exposure: Arc<StdMutex<Duration>>,
}

impl Camera {
    /// Wrap a device in a facade.
    pub fn new(device: impl Into<AnyFrameDevice>) -> Self {
        let device = device.into();
        let exposure_us = device
            .features()
            .get("ExposureTime")
            .and_then(|v| v.to_float())
            .unwrap_or(0.0);
        Camera {
            device: Arc::new(Mutex::new(device)),
            cached_exposure: Arc::new(StdMutex::new(Duration::from_micros(exposure_us as u64))),
        }
    }

    /// Facade over a fresh [`VirtualCamera`].
    pub fn virtual_camera() -> Self {
        Self::new(VirtualCamera::new())
    }

    /// Read one feature.
    ///
    /// # Errors
    /// Returns `CameraError::UnknownFeature` for missing names.
    pub async fn get_param(&self, name: &str) -> Result<FeatureValue> {
        let device = self.device.lock().await;
        device.features().get(name)
    }

    /// Write one feature and return the value the device applied,
    /// after range clamping and increment snapping.
    ///
    /// # Errors
    /// Returns `CameraError::UnknownFeature` or `CameraError::ReadOnly`.
    #[instrument(skip(self, value), fields(feature = name))]
    pub async fn set_param(
        &self,
        name: &str,
        value: impl Into<FeatureValue>,
    ) -> Result<FeatureValue> {
        let mut device = self.device.lock().await;
        let applied = device.features_mut().set(name, value)?;
        debug!(%applied, "camera feature written");
        if name == "ExposureTime" {
            if let Ok(us) = applied.to_float() {
                *self.cached_exposure.lock().unwrap() = Duration::from_micros(us as u64);
            }
        }
        Ok(applied)
    }

    /// Apply a batch of features in order, under one lock acquisition.
    /// Returns the applied value for each entry.
    ///
    /// # Errors
    /// Fails on the first feature that rejects its value; earlier
    /// entries in the batch stay applied.
    pub async fn set_multi_param(
        &self,
        params: Vec<(String, FeatureValue)>,
    ) -> Result<Vec<FeatureValue>> {
        let mut device = self.device.lock().await;
        let mut applied = Vec::with_capacity(params.len());
        for (name, value) in params {
            let result = device.features_mut().set(&name, value)?;
            if name == "ExposureTime" {
                if let Ok(us) = result.to_float() {
                    *self.cached_exposure.lock().unwrap() = Duration::from_micros(us as u64);
                }
            }
            applied.push(result);
        }
        Ok(applied)
    }

    /// The cached exposure time.
    pub fn exposure(&self) -> Duration {
        *self.cached_exposure.lock().unwrap()
    }

    /// Set the exposure time. Returns the exposure the device applied.
    ///
    /// # Errors
    /// Propagates feature write failures.
    pub async fn set_exposure(&self, exposure: Duration) -> Result<Duration> {
        let applied = self
            .set_param("ExposureTime", exposure.as_micros() as f64)
            .await?;
        Ok(Duration::from_micros(applied.to_float()? as u64))
    }

    /// Acquire one frame, waiting at most `timeout` (the cached
    /// exposure when `None`). Holds the device mutex for the duration
    /// of the acquisition.
    ///
    /// # Errors
    /// Returns `CameraError::CaptureTimeout` when the deadline passes
    /// without a frame.
    pub async fn capture(&self, timeout: Option<Duration>) -> Result<CapturedFrame> {
        let timeout = timeout.unwrap_or_else(|| self.exposure());
        let mut device = self.device.lock().await;
        device.capture(timeout).await
    }

    /// Restore the full sensor readout: zero offsets, width and height
    /// at the sensor limits.
    ///
    /// # Errors
    /// Propagates feature write failures.
    pub async fn reset_roi(&self) -> Result<()> {
        let mut device = self.device.lock().await;
        let sensor_width = device.features().get("SensorWidth")?.to_int()?;
        let sensor_height = device.features().get("SensorHeight")?.to_int()?;
        let features = device.features_mut();
        features.set("OffsetX", 0)?;
        features.set("OffsetY", 0)?;
        features.set("Width", sensor_width)?;
        features.set("Height", sensor_height)?;
        Ok(())
    }

    /// Device metadata.
    pub async fn info(&self) -> DeviceInfo {
        self.device.lock().await.info()
    }

    /// One-line status summary for periodic logging.
    pub async fn status_summary(&self) -> String {
        let device = self.device.lock().await;
        let features = device.features();
        let get = |name: &str| {
            features
                .get(name)
                .map(|v| v.to_string())
                .unwrap_or_else(|_| "?".to_string())
        };
        format!(
            "{}: roi={}x{}+{}+{} exposure={}us rate={}fps",
            device.info().name,
            get("Width"),
            get("Height"),
            get("OffsetX"),
            get("OffsetY"),
            get("ExposureTime"),
            get("AcquisitionFrameRate"),
        )
    }
}
