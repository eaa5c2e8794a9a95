//! Wire protocol for the frame server.
//!
//! The protocol is line-oriented ASCII for control traffic, with a
//! framed binary payload for image delivery:
//!
//! ```text
//! client -> server   IDENT=VALUE\n   assignment
//!                    IDENT?\n        inquiry
//!                    IDENT\n         command
//!
//! server -> client   IDENT=VALUE\n            success (assignment/inquiry)
//!                    IDENT\n                  success (inquiry, no body)
//!                    IDENT;\n                 success (command)
//!                    IDENT: Error: <desc>\n   error
//!                    img=<SOH>[H,W]<attrs><STX><pixels><ETX>   image
//! ```
//!
//! Pixel payloads are 16-bit little-endian, two bytes per element.
//!
//! The crate is transport-agnostic: [`Parser`] turns one line into an
//! [`InMessage`], [`Serializer`] turns an [`OutMessage`] into a
//! [`SerializedMessage`] (header text plus optional binary payload),
//! and [`LineDecoder`] extracts complete lines from a TCP byte stream.

pub mod binary;
pub mod decoder;
pub mod message;
pub mod parser;
pub mod serializer;
pub mod value;

pub use binary::{BinaryDataBuffer, ColorImageBinaryData, ImageAttribute, ImageBinaryData};
pub use decoder::LineDecoder;
pub use message::{
    Assignment, Command, ErrorMessage, InMessage, InMessageKind, Inquiry, OutMessage, Success,
};
pub use parser::Parser;
pub use serializer::{SerializedMessage, Serializer};
pub use value::Value;
