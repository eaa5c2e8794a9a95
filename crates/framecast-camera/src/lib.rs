//! Camera access for the frame server.
//!
//! The crate fronts a single frame-producing device with a shared,
//! thread-safe [`Camera`] facade: string-keyed typed feature access
//! with device-side coercion, exposure convenience accessors, and
//! single-frame capture with a deadline. The in-tree device is the
//! deterministic [`VirtualCamera`], which makes the whole server
//! runnable and testable without hardware.

pub mod device;
pub mod error;
pub mod facade;
pub mod features;
pub mod monitor;
pub mod pixel;

pub use device::{AnyFrameDevice, CapturedFrame, DeviceInfo, FrameDevice, VirtualCamera};
pub use error::{CameraError, Result};
pub use facade::Camera;
pub use features::{Feature, FeatureSet, FeatureValue};
pub use monitor::CameraMonitor;
pub use pixel::PixelFormat;
