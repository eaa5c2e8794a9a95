//! Error types for camera operations.

/// Result type alias for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;

/// Errors that can occur while driving the camera.
///
/// All of these are recoverable at the server level: a failed feature
/// write becomes an error reply, a failed capture is logged and the
/// capture round is retried.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// The named feature does not exist on this device.
    #[error("Unknown camera feature: {feature}")]
    UnknownFeature { feature: String },

    /// The feature exists but rejected the written value.
    #[error("Feature {feature} rejected value: {reason}")]
    FeatureRejected { feature: String, reason: String },

    /// The feature is read-only.
    #[error("Feature {feature} is read-only")]
    ReadOnly { feature: String },

    /// No frame became available within the capture deadline.
    #[error("Capture timeout after {duration_us}us")]
    CaptureTimeout { duration_us: u64 },

    /// The device dropped off the bus.
    #[error("Camera disconnected: {message}")]
    Disconnected { message: String },

    /// A pixel format name the device does not know.
    #[error("Unsupported pixel format: {name}")]
    UnsupportedPixelFormat { name: String },
}

impl CameraError {
    /// Create a new unknown-feature error.
    pub fn unknown_feature(feature: impl Into<String>) -> Self {
        Self::UnknownFeature {
            feature: feature.into(),
        }
    }

    /// Create a new feature-rejected error.
    pub fn rejected(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FeatureRejected {
            feature: feature.into(),
            reason: reason.into(),
        }
    }

    /// Create a new capture-timeout error.
    pub fn capture_timeout(duration: std::time::Duration) -> Self {
        Self::CaptureTimeout {
            duration_us: duration.as_micros() as u64,
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::Disconnected {
            message: message.into(),
        }
    }
}
