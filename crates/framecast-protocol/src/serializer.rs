//! Outbound message serialization.
//!
//! Every [`OutMessage`] serializes to a [`SerializedMessage`]: a text
//! header plus an optional binary payload. Textual replies carry the
//! whole message in the header and an empty payload; image messages
//! put the framing in the header and the pixel bytes (plus the ETX
//! terminator) in the payload.
//!
//! Wire forms:
//!
//! ```text
//! success (assignment)        IDENT=VALUE\n
//! success (inquiry, body)     IDENT=VALUE\n
//! success (inquiry, no body)  IDENT\n
//! success (command)           IDENT;\n
//! error                       IDENT: Error: <description>\n
//! image                       img=<SOH>[H,W]<attrs><STX> | <pixels><ETX>
//! ```
//!
//! The writer must emit the header fully before any payload byte;
//! binary payloads carry no further framing because the receiver knows
//! the byte count from the shape block.

use crate::binary::ImageAttribute;
use crate::message::{ErrorMessage, InMessageKind, OutMessage, Success};
use crate::value::Value;
use framecast_core::constants::{ETX, SOH, STX};
use framecast_core::{Error, Result};
use tracing::trace;

/// A serialized outbound message: header text plus binary payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedMessage {
    /// Header text. Contains the full message for textual replies.
    pub header: String,
    /// Binary payload, empty for textual replies. For images this is
    /// the raw pixel bytes followed by the ETX terminator.
    pub payload: Vec<u8>,
}

impl SerializedMessage {
    pub fn header_len(&self) -> usize {
        self.header.len()
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if a binary payload is present.
    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }
}

/// Serializes outgoing protocol messages and primitive values.
pub struct Serializer;

impl Serializer {
    /// Serialize an [`OutMessage`], consuming it.
    ///
    /// # Errors
    /// Returns `Error::UnsupportedMessage` for the reserved payload
    /// kinds ([`crate::BinaryDataBuffer`], [`crate::ColorImageBinaryData`])
    /// which have no wire form yet.
    pub fn serialize(message: OutMessage) -> Result<SerializedMessage> {
        trace!(%message, "serializing outbound message");
        match message {
            OutMessage::Success(msg) => Ok(Self::serialize_success(msg)),
            OutMessage::Error(msg) => Ok(Self::serialize_error(msg)),
            OutMessage::Image(msg) => {
                let shape = msg.shape();
                let attributes = msg.attributes().to_vec();
                Ok(Self::serialize_image(msg.into_data(), shape, &attributes))
            }
            OutMessage::Buffer(msg) => Err(Error::UnsupportedMessage(msg.to_string())),
            OutMessage::ColorImage(msg) => Err(Error::UnsupportedMessage(msg.to_string())),
        }
    }

    /// Serialize a primitive value to its wire form.
    pub fn serialize_value(value: &Value) -> String {
        value.to_string()
    }

    fn serialize_success(msg: Success) -> SerializedMessage {
        let mut header = msg.identifier;
        match msg.source {
            InMessageKind::Assignment => {
                // Enforced by the Success constructors: an assignment
                // success always echoes the applied value.
                let body = msg
                    .body
                    .expect("assignment success must carry the applied value");
                header.push('=');
                header.push_str(&Self::serialize_value(&body));
            }
            InMessageKind::Inquiry => {
                if let Some(body) = msg.body {
                    header.push('=');
                    header.push_str(&Self::serialize_value(&body));
                }
            }
            InMessageKind::Command => header.push(';'),
        }
        header.push('\n');
        SerializedMessage {
            header,
            payload: Vec::new(),
        }
    }

    fn serialize_error(msg: ErrorMessage) -> SerializedMessage {
        SerializedMessage {
            header: format!("{}: Error: {}\n", msg.identifier, msg.description),
            payload: Vec::new(),
        }
    }

    fn serialize_image(
        mut pixels: Vec<u8>,
        shape: [u64; 2],
        attributes: &[ImageAttribute],
    ) -> SerializedMessage {
        let mut header = String::from("img=");
        header.push(SOH as char);
        header.push_str(&format!("[{},{}]", shape[0], shape[1]));
        for attribute in attributes {
            header.push(' ');
            header.push_str(&attribute.identifier);
            header.push('=');
            header.push_str(&Self::serialize_value(&attribute.value));
        }
        header.push(STX as char);
        pixels.push(ETX);
        SerializedMessage {
            header,
            payload: pixels,
        }
    }
}
