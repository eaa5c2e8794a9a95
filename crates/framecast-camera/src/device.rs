//! Frame device abstraction and the virtual sensor.
//!
//! [`FrameDevice`] is the contract between the camera facade and an
//! actual frame producer. The only in-tree implementation is
//! [`VirtualCamera`], a deterministic stand-in used for development
//! and testing without hardware: it honours the feature table, takes
//! one exposure-time's worth of wall clock per capture, and produces a
//! rolling 12-bit gradient rescaled to full 16-bit range.
//!
//! The traits use native `async fn` (RPITIT), so they are not
//! object-safe; dynamic dispatch goes through the [`AnyFrameDevice`]
//! enum wrapper instead of trait objects.

#![allow(async_fn_in_trait)]

use crate::error::{CameraError, Result};
use crate::features::{Feature, FeatureSet};
use crate::pixel::{self, PixelFormat};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Static metadata describing a frame device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub model: String,
    pub serial: String,
}

/// One frame as it leaves the device: 16-bit little-endian pixels plus
/// acquisition metadata.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Rolling frame counter from the device. Not unique across
    /// restarts.
    pub frame_id: u64,
    /// Acquisition completion time.
    pub timestamp: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    /// Packed little-endian 16-bit pixels, row-major.
    pub pixels: Vec<u8>,
}

impl CapturedFrame {
    /// Number of pixels in the frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Decode one pixel value, for diagnostics and tests.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 2;
        Some(u16::from_le_bytes([self.pixels[offset], self.pixels[offset + 1]]))
    }
}

/// A device that produces frames on demand.
pub trait FrameDevice: Send {
    /// Acquire one frame, waiting at most `timeout`.
    ///
    /// # Errors
    /// Returns `CameraError::CaptureTimeout` when no frame became
    /// available within the deadline, `CameraError::Disconnected` when
    /// the device is gone.
    async fn capture(&mut self, timeout: Duration) -> Result<CapturedFrame>;

    /// Read access to the feature table.
    fn features(&self) -> &FeatureSet;

    /// Write access to the feature table.
    fn features_mut(&mut self) -> &mut FeatureSet;

    /// Device metadata.
    fn info(&self) -> DeviceInfo;
}

/// Virtual sensor dimensions.
const SENSOR_WIDTH: i64 = 1280;
const SENSOR_HEIGHT: i64 = 1024;

/// Default exposure in microseconds (2 ms).
const DEFAULT_EXPOSURE_US: f64 = 2_000.0;

/// Simulated frame device.
///
/// Captures sleep for the configured `ExposureTime` and synthesize a
/// diagonal gradient that advances with the frame counter, so
/// consecutive frames are distinguishable and pixel values are
/// reproducible in tests.
///
/// # Examples
///
/// ```no_run
/// use framecast_camera::{FrameDevice, VirtualCamera};
/// use std::time::Duration;
///
/// # async fn example() -> framecast_camera::Result<()> {
/// let mut camera = VirtualCamera::new();
/// let frame = camera.capture(Duration::from_millis(50)).await?;
/// assert_eq!(frame.pixels.len(), frame.pixel_count() * 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct VirtualCamera {
    features: FeatureSet,
    frame_counter: u64,
}

impl VirtualCamera {
    /// Create a virtual camera with the default feature table: full
    /// sensor ROI, 2 ms exposure, Mono12 readout.
    pub fn new() -> Self {
        let mut features = FeatureSet::new();
        features.insert("Width", Feature::int(SENSOR_WIDTH, 8, SENSOR_WIDTH, 8));
        features.insert("Height", Feature::int(SENSOR_HEIGHT, 8, SENSOR_HEIGHT, 8));
        features.insert("OffsetX", Feature::int(0, 0, SENSOR_WIDTH - 8, 2));
        features.insert("OffsetY", Feature::int(0, 0, SENSOR_HEIGHT - 8, 2));
        features.insert(
            "ExposureTime",
            Feature::float(DEFAULT_EXPOSURE_US, 10.0, 1_000_000.0),
        );
        features.insert("AcquisitionFrameRate", Feature::float(30.0, 0.1, 300.0));
        features.insert("AcquisitionMode", Feature::string("Continuous"));
        features.insert("PixelFormat", Feature::string("Mono12").read_only());
        features.insert(
            "SensorWidth",
            Feature::int(SENSOR_WIDTH, SENSOR_WIDTH, SENSOR_WIDTH, 1).read_only(),
        );
        features.insert(
            "SensorHeight",
            Feature::int(SENSOR_HEIGHT, SENSOR_HEIGHT, SENSOR_HEIGHT, 1).read_only(),
        );
        VirtualCamera {
            features,
            frame_counter: 0,
        }
    }

    fn feature_as_u32(&self, name: &str) -> u32 {
        self.features
            .get(name)
            .and_then(|v| v.to_int())
            .unwrap_or(0) as u32
    }

    fn synthesize(&mut self) -> CapturedFrame {
        let width = self.feature_as_u32("Width");
        let height = self.feature_as_u32("Height");
        let offset_x = self.feature_as_u32("OffsetX") as u64;
        let offset_y = self.feature_as_u32("OffsetY") as u64;
        let frame_id = self.frame_counter;
        self.frame_counter += 1;

        let native = PixelFormat::Mono12;
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 2);
        for y in 0..height as u64 {
            for x in 0..width as u64 {
                let ramp =
                    ((x + offset_x + y + offset_y + 8 * frame_id) % (native.max_value() as u64 + 1))
                        as u16;
                let value = pixel::rescale(ramp, native, PixelFormat::Mono16);
                pixels.extend_from_slice(&value.to_le_bytes());
            }
        }

        CapturedFrame {
            frame_id,
            timestamp: Utc::now(),
            width,
            height,
            pixels,
        }
    }
}

impl Default for VirtualCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDevice for VirtualCamera {
    async fn capture(&mut self, timeout: Duration) -> Result<CapturedFrame> {
        let exposure_us = self
            .features
            .get("ExposureTime")
            .and_then(|v| v.to_float())
            .unwrap_or(DEFAULT_EXPOSURE_US);
        let exposure = Duration::from_micros(exposure_us as u64);

        if exposure > timeout {
            // The sensor cannot finish integrating before the
            // deadline; behave like a real driver and give up at the
            // deadline, not at the end of the exposure.
            tokio::time::sleep(timeout).await;
            return Err(CameraError::capture_timeout(timeout));
        }

        tokio::time::sleep(exposure).await;
        Ok(self.synthesize())
    }

    fn features(&self) -> &FeatureSet {
        &self.features
    }

    fn features_mut(&mut self) -> &mut FeatureSet {
        &mut self.features
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Virtual Camera".to_string(),
            model: "framecast-sim".to_string(),
            serial: "SIM0000001".to_string(),
        }
    }
}

/// Enum wrapper for dynamic dispatch over frame devices.
///
/// `async fn` trait methods are not object-safe, so heterogeneous
/// device handling goes through this enum instead of `dyn FrameDevice`.
#[derive(Debug)]
pub enum AnyFrameDevice {
    Virtual(VirtualCamera),
}

impl FrameDevice for AnyFrameDevice {
    async fn capture(&mut self, timeout: Duration) -> Result<CapturedFrame> {
        match self {
            AnyFrameDevice::Virtual(device) => device.capture(timeout).await,
        }
    }

    fn features(&self) -> &FeatureSet {
        match self {
            AnyFrameDevice::Virtual(device) => device.features(),
        }
    }

    fn features_mut(&mut self) -> &mut FeatureSet {
        match self {
            AnyFrameDevice::Virtual(device) => device.features_mut(),
        }
    }

    fn info(&self) -> DeviceInfo {
        match self {
            AnyFrameDevice::Virtual(device) => device.info(),
        }
    }
}

impl From<VirtualCamera> for AnyFrameDevice {
    fn from(device: VirtualCamera) -> Self {
        AnyFrameDevice::Virtual(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureValue;

    #[tokio::test]
    async fn test_capture_produces_full_frame() {
        let mut camera = VirtualCamera::new();
        camera.features_mut().set("Width", 64).unwrap();
        camera.features_mut().set("Height", 32).unwrap();
        camera.features_mut().set("ExposureTime", 100.0).unwrap();

        let frame = camera.capture(Duration::from_millis(50)).await.unwrap();
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 32);
        assert_eq!(frame.pixels.len(), 64 * 32 * 2);
    }

    #[tokio::test]
    async fn test_frame_ids_advance() {
        let mut camera = VirtualCamera::new();
        camera.features_mut().set("Width", 8).unwrap();
        camera.features_mut().set("Height", 8).unwrap();
        camera.features_mut().set("ExposureTime", 50.0).unwrap();

        let first = camera.capture(Duration::from_millis(50)).await.unwrap();
        let second = camera.capture(Duration::from_millis(50)).await.unwrap();
        assert_eq!(second.frame_id, first.frame_id + 1);
        // The pattern rolls with the frame id, so the first pixel moves.
        assert_ne!(first.pixel(0, 0), second.pixel(0, 0));
    }

    #[tokio::test]
    async fn test_capture_timeout() {
        let mut camera = VirtualCamera::new();
        camera.features_mut().set("ExposureTime", 50_000.0).unwrap();

        let result = camera.capture(Duration::from_millis(5)).await;
        assert!(matches!(result, Err(CameraError::CaptureTimeout { .. })));
    }

    #[tokio::test]
    async fn test_pattern_uses_full_16bit_scale() {
        let mut camera = VirtualCamera::new();
        camera.features_mut().set("Width", 8).unwrap();
        camera.features_mut().set("Height", 8).unwrap();
        camera.features_mut().set("ExposureTime", 50.0).unwrap();

        let frame = camera.capture(Duration::from_millis(50)).await.unwrap();
        // Mono12 ramp values are left-shifted into Mono16, so every
        // pixel is a multiple of 16.
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(frame.pixel(x, y).unwrap() % 16, 0);
            }
        }
    }

    #[test]
    fn test_roi_features_clamped_to_sensor() {
        let mut camera = VirtualCamera::new();
        let applied = camera.features_mut().set("Width", 100_000).unwrap();
        assert_eq!(applied, FeatureValue::Int(SENSOR_WIDTH));
    }
}
