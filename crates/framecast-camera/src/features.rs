//! String-keyed camera feature table.
//!
//! Models the GenICam-style feature surface the facade exposes: each
//! feature has a typed value, and numeric features carry a range and
//! an increment. Writes are coerced rather than rejected — clamped to
//! range and snapped to the increment — and the applied value is
//! returned so callers can echo what actually took effect.

use crate::error::{CameraError, Result};
use std::collections::BTreeMap;
use std::fmt;

/// A typed feature value.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl FeatureValue {
    /// Coerce to integer.
    ///
    /// # Errors
    /// Returns `CameraError::FeatureRejected` for bool/string values.
    pub fn to_int(&self) -> Result<i64> {
        match self {
            FeatureValue::Int(v) => Ok(*v),
            FeatureValue::Float(v) => Ok(*v as i64),
            other => Err(CameraError::rejected(
                "<value>",
                format!("expected numeric, got {other}"),
            )),
        }
    }

    /// Coerce to float.
    ///
    /// # Errors
    /// Returns `CameraError::FeatureRejected` for bool/string values.
    pub fn to_float(&self) -> Result<f64> {
        match self {
            FeatureValue::Int(v) => Ok(*v as f64),
            FeatureValue::Float(v) => Ok(*v),
            other => Err(CameraError::rejected(
                "<value>",
                format!("expected numeric, got {other}"),
            )),
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        FeatureValue::Bool(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Int(v)
    }
}

impl From<i32> for FeatureValue {
    fn from(v: i32) -> Self {
        FeatureValue::Int(v as i64)
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Float(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Str(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Str(v)
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Bool(v) => write!(f, "{v}"),
            FeatureValue::Int(v) => write!(f, "{v}"),
            FeatureValue::Float(v) => write!(f, "{v}"),
            FeatureValue::Str(v) => write!(f, "{v}"),
        }
    }
}

/// One entry in the feature table.
#[derive(Debug, Clone)]
pub struct Feature {
    value: FeatureValue,
    /// Inclusive numeric range; `None` for non-numeric features.
    range: Option<(f64, f64)>,
    /// Step size for integer features; values snap to `min + k*inc`.
    increment: i64,
    writable: bool,
}

impl Feature {
    /// An integer feature with range and increment.
    pub fn int(value: i64, min: i64, max: i64, increment: i64) -> Self {
        Feature {
            value: FeatureValue::Int(value),
            range: Some((min as f64, max as f64)),
            increment: increment.max(1),
            writable: true,
        }
    }

    /// A float feature with range.
    pub fn float(value: f64, min: f64, max: f64) -> Self {
        Feature {
            value: FeatureValue::Float(value),
            range: Some((min, max)),
            increment: 1,
            writable: true,
        }
    }

    /// A writable string feature.
    pub fn string(value: impl Into<String>) -> Self {
        Feature {
            value: FeatureValue::Str(value.into()),
            range: None,
            increment: 1,
            writable: true,
        }
    }

    /// Mark the feature read-only.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Current value.
    pub fn value(&self) -> &FeatureValue {
        &self.value
    }

    fn coerce(&self, requested: FeatureValue) -> FeatureValue {
        match (&self.value, requested) {
            (FeatureValue::Int(_), requested) => {
                let (min, max) = self.range.unwrap_or((i64::MIN as f64, i64::MAX as f64));
                let clamped = requested
                    .to_float()
                    .unwrap_or(min)
                    .clamp(min, max);
                let steps = ((clamped - min) / self.increment as f64).round() as i64;
                let snapped = (min as i64 + steps * self.increment).min(max as i64);
                FeatureValue::Int(snapped)
            }
            (FeatureValue::Float(_), requested) => {
                let (min, max) = self.range.unwrap_or((f64::MIN, f64::MAX));
                FeatureValue::Float(requested.to_float().unwrap_or(min).clamp(min, max))
            }
            (FeatureValue::Bool(_), FeatureValue::Bool(v)) => FeatureValue::Bool(v),
            (FeatureValue::Bool(current), _) => FeatureValue::Bool(*current),
            (FeatureValue::Str(_), FeatureValue::Str(v)) => FeatureValue::Str(v),
            (FeatureValue::Str(_), requested) => FeatureValue::Str(requested.to_string()),
        }
    }
}

/// The device's feature table, keyed by feature name.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    features: BTreeMap<String, Feature>,
}

impl FeatureSet {
    /// Empty table.
    pub fn new() -> Self {
        FeatureSet {
            features: BTreeMap::new(),
        }
    }

    /// Insert or replace a feature.
    pub fn insert(&mut self, name: impl Into<String>, feature: Feature) {
        self.features.insert(name.into(), feature);
    }

    /// Read a feature value.
    ///
    /// # Errors
    /// Returns `CameraError::UnknownFeature` for missing names.
    pub fn get(&self, name: &str) -> Result<FeatureValue> {
        self.features
            .get(name)
            .map(|f| f.value.clone())
            .ok_or_else(|| CameraError::unknown_feature(name))
    }

    /// Write a feature, coercing the value to the feature's type,
    /// range, and increment. Returns the value that was applied.
    ///
    /// # Errors
    /// Returns `CameraError::UnknownFeature` for missing names and
    /// `CameraError::ReadOnly` for non-writable features.
    pub fn set(&mut self, name: &str, value: impl Into<FeatureValue>) -> Result<FeatureValue> {
        let feature = self
            .features
            .get_mut(name)
            .ok_or_else(|| CameraError::unknown_feature(name))?;
        if !feature.writable {
            return Err(CameraError::ReadOnly {
                feature: name.to_string(),
            });
        }
        let applied = feature.coerce(value.into());
        feature.value = applied.clone();
        Ok(applied)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.features.iter().map(|(k, v)| (k.as_str(), v.value()))
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn table() -> FeatureSet {
        let mut features = FeatureSet::new();
        features.insert("Width", Feature::int(1280, 8, 1280, 8));
        features.insert("ExposureTime", Feature::float(2000.0, 10.0, 1_000_000.0));
        features.insert("AcquisitionMode", Feature::string("Continuous"));
        features.insert("SensorWidth", Feature::int(1280, 1280, 1280, 1).read_only());
        features
    }

    #[rstest]
    #[case(640, 640)] // in range, on increment
    #[case(642, 640)] // snapped down
    #[case(646, 648)] // snapped up
    #[case(100_000, 1280)] // clamped to max
    #[case(-5, 8)] // clamped to min
    fn test_int_coercion(#[case] requested: i64, #[case] applied: i64) {
        let mut features = table();
        let result = features.set("Width", requested).unwrap();
        assert_eq!(result, FeatureValue::Int(applied));
        assert_eq!(features.get("Width").unwrap(), FeatureValue::Int(applied));
    }

    #[test]
    fn test_float_coercion() {
        let mut features = table();
        assert_eq!(
            features.set("ExposureTime", 0.5).unwrap(),
            FeatureValue::Float(10.0)
        );
        assert_eq!(
            features.set("ExposureTime", 5000).unwrap(),
            FeatureValue::Float(5000.0)
        );
    }

    #[test]
    fn test_unknown_feature() {
        let mut features = table();
        assert!(matches!(
            features.get("Gain"),
            Err(CameraError::UnknownFeature { .. })
        ));
        assert!(features.set("Gain", 1).is_err());
    }

    #[test]
    fn test_read_only_rejected() {
        let mut features = table();
        assert!(matches!(
            features.set("SensorWidth", 640),
            Err(CameraError::ReadOnly { .. })
        ));
    }

    #[test]
    fn test_string_feature() {
        let mut features = table();
        features.set("AcquisitionMode", "SingleFrame").unwrap();
        assert_eq!(
            features.get("AcquisitionMode").unwrap(),
            FeatureValue::Str("SingleFrame".into())
        );
    }
}
