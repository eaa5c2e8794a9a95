//! Binary payload carriers.
//!
//! These types own a contiguous block of 16-bit little-endian elements
//! plus their shape and optional key/value attributes. They are
//! move-only: a payload travels from producer to socket without
//! copying, and the one place that needs per-consumer copies (the
//! frame fan-out) constructs a fresh buffer per consumer instead of
//! cloning these types.

use crate::value::Value;
use framecast_core::constants::BYTES_PER_PIXEL;
use framecast_core::{Error, Result};
use std::fmt;

/// A key/value attribute attached to a binary payload, serialized into
/// the header between the shape block and the STX byte.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttribute {
    pub identifier: String,
    pub value: Value,
}

impl ImageAttribute {
    pub fn new(identifier: impl Into<String>, value: impl Into<Value>) -> Self {
        ImageAttribute {
            identifier: identifier.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ImageAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.identifier, self.value)
    }
}

fn check_payload(data: &[u8], num_elements: u64) -> Result<()> {
    let expected = num_elements as usize * BYTES_PER_PIXEL;
    if data.len() != expected {
        return Err(Error::PayloadSizeMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// A 2-dimensional 16-bit image payload (grayscale frames).
///
/// Invariant, checked at construction: `data.len() == 2 * H * W`.
#[derive(Debug, PartialEq)]
pub struct ImageBinaryData {
    data: Vec<u8>,
    shape: [u64; 2],
    attributes: Vec<ImageAttribute>,
}

impl ImageBinaryData {
    /// Construct an image payload from raw little-endian pixel bytes
    /// and a `[height, width]` shape.
    ///
    /// # Errors
    /// Returns `Error::PayloadSizeMismatch` if the byte count does not
    /// equal `2 * height * width`.
    pub fn new(data: Vec<u8>, shape: [u64; 2], attributes: Vec<ImageAttribute>) -> Result<Self> {
        check_payload(&data, shape[0] * shape[1])?;
        Ok(ImageBinaryData {
            data,
            shape,
            attributes,
        })
    }

    /// Image height in pixels.
    pub fn height(&self) -> u64 {
        self.shape[0]
    }

    /// Image width in pixels.
    pub fn width(&self) -> u64 {
        self.shape[1]
    }

    /// `[height, width]` shape.
    pub fn shape(&self) -> [u64; 2] {
        self.shape
    }

    /// Raw pixel bytes, little-endian 16-bit.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Total payload size in bytes.
    pub fn num_bytes(&self) -> usize {
        self.data.len()
    }

    /// Attributes serialized into the binary header.
    pub fn attributes(&self) -> &[ImageAttribute] {
        &self.attributes
    }

    /// Consume the payload, handing ownership of the pixel bytes to
    /// the caller.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Display for ImageBinaryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ImageBinaryData[shape=({}x{}), {} bytes, {} attributes]",
            self.shape[0],
            self.shape[1],
            self.data.len(),
            self.attributes.len()
        )
    }
}

/// A 1-dimensional 16-bit payload. Reserved on the wire; the
/// serializer currently rejects it.
#[derive(Debug, PartialEq)]
pub struct BinaryDataBuffer {
    data: Vec<u8>,
    shape: [u64; 1],
}

impl BinaryDataBuffer {
    /// # Errors
    /// Returns `Error::PayloadSizeMismatch` if the byte count does not
    /// equal `2 * len`.
    pub fn new(data: Vec<u8>, shape: [u64; 1]) -> Result<Self> {
        check_payload(&data, shape[0])?;
        Ok(BinaryDataBuffer { data, shape })
    }

    pub fn len(&self) -> u64 {
        self.shape[0]
    }

    pub fn is_empty(&self) -> bool {
        self.shape[0] == 0
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for BinaryDataBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BinaryDataBuffer[len={}, {} bytes]",
            self.shape[0],
            self.data.len()
        )
    }
}

/// A 3-dimensional 16-bit payload (multi-channel frames). Reserved on
/// the wire; the serializer currently rejects it.
#[derive(Debug, PartialEq)]
pub struct ColorImageBinaryData {
    data: Vec<u8>,
    shape: [u64; 3],
}

impl ColorImageBinaryData {
    /// # Errors
    /// Returns `Error::PayloadSizeMismatch` if the byte count does not
    /// equal `2 * H * W * C`.
    pub fn new(data: Vec<u8>, shape: [u64; 3]) -> Result<Self> {
        check_payload(&data, shape[0] * shape[1] * shape[2])?;
        Ok(ColorImageBinaryData { data, shape })
    }

    pub fn shape(&self) -> [u64; 3] {
        self.shape
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for ColorImageBinaryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ColorImageBinaryData[shape=({}x{}x{}), {} bytes]",
            self.shape[0],
            self.shape[1],
            self.shape[2],
            self.data.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_payload_invariant() {
        let image = ImageBinaryData::new(vec![0u8; 2 * 4 * 6], [4, 6], vec![]).unwrap();
        assert_eq!(image.height(), 4);
        assert_eq!(image.width(), 6);
        assert_eq!(image.num_bytes(), 48);
    }

    #[test]
    fn test_image_payload_size_mismatch() {
        let result = ImageBinaryData::new(vec![0u8; 47], [4, 6], vec![]);
        assert!(matches!(
            result,
            Err(Error::PayloadSizeMismatch {
                expected: 48,
                actual: 47
            })
        ));
    }

    #[test]
    fn test_zero_sized_image() {
        let image = ImageBinaryData::new(vec![], [0, 128], vec![]).unwrap();
        assert_eq!(image.num_bytes(), 0);
    }

    #[test]
    fn test_buffer_invariant() {
        assert!(BinaryDataBuffer::new(vec![0u8; 10], [5]).is_ok());
        assert!(BinaryDataBuffer::new(vec![0u8; 10], [6]).is_err());
    }

    #[test]
    fn test_color_image_invariant() {
        assert!(ColorImageBinaryData::new(vec![0u8; 2 * 2 * 3 * 4], [2, 3, 4]).is_ok());
        assert!(ColorImageBinaryData::new(vec![0u8; 7], [2, 3, 4]).is_err());
    }

    #[test]
    fn test_into_data_hands_over_bytes() {
        let bytes: Vec<u8> = (0..8).collect();
        let image = ImageBinaryData::new(bytes.clone(), [2, 2], vec![]).unwrap();
        assert_eq!(image.into_data(), bytes);
    }
}
