//! Property-based tests for the line codec.
//!
//! These tests use proptest to generate random valid inputs and verify
//! that parse/serialize invariants hold across the whole input space,
//! not just the hand-picked unit cases.

use proptest::prelude::*;
use framecast_protocol::{
    Assignment, ImageBinaryData, InMessage, Inquiry, Parser, Serializer, Success, Value,
};

/// Strategy for valid identifiers: leading letter, then word chars,
/// then up to two index groups.
fn valid_identifier() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9_]{0,15}(\\[[0-9]{1,3}\\]){0,2}")
        .expect("Failed to create identifier regex strategy")
}

/// Strategy for values that survive a wire round trip exactly.
///
/// Strings are restricted to text that does not itself look numeric or
/// quoted, since the value grammar is dynamic: `{42}` re-parses as the
/// string `42` wrapped once, but a bare `42` re-parses as an integer.
fn roundtrippable_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        (i32::MIN..=i32::MAX).prop_map(|v| Value::Int(v as i64)),
        // Finite doubles; the wire form always keeps a '.' or exponent.
        prop::num::f64::NORMAL.prop_map(Value::Double),
        prop::string::string_regex("[A-Za-z _-]{0,24}")
            .expect("Failed to create string value strategy")
            .prop_map(Value::Str),
    ]
}

proptest! {
    /// Property: a serialized assignment success re-parses to an
    /// assignment with the same identifier and value.
    #[test]
    fn prop_assignment_roundtrip(
        identifier in valid_identifier(),
        value in roundtrippable_value(),
    ) {
        let assignment = Assignment::new(identifier.clone(), value.clone()).unwrap();
        let serialized = Serializer::serialize(
            Success::from_assignment(assignment).into(),
        ).unwrap();

        prop_assert!(serialized.header.ends_with('\n'));
        let line = serialized.header.trim_end_matches('\n');
        let Some(InMessage::Assignment(reparsed)) = Parser::parse(line) else {
            return Err(TestCaseError::fail(format!("'{line}' did not re-parse")));
        };
        prop_assert_eq!(reparsed.identifier, identifier);
        prop_assert_eq!(reparsed.value, value);
    }

    /// Property: every valid identifier parses as an inquiry with a
    /// trailing '?', and as a bare command.
    #[test]
    fn prop_identifier_parses_as_inquiry_and_command(identifier in valid_identifier()) {
        let inquiry_line = format!("{identifier}?");
        prop_assert!(matches!(
            Parser::parse(&inquiry_line),
            Some(InMessage::Inquiry(Inquiry { identifier: parsed })) if parsed == identifier
        ), "did not parse as inquiry");
        prop_assert!(matches!(
            Parser::parse(&identifier),
            Some(InMessage::Command(command)) if command.identifier == identifier
        ), "did not parse as command");
    }

    /// Property: serialized headers always terminate with a newline.
    #[test]
    fn prop_success_header_terminated(
        identifier in valid_identifier(),
        value in roundtrippable_value(),
    ) {
        let inquiry = Inquiry::new(identifier).unwrap();
        let serialized = Serializer::serialize(
            Success::from_inquiry(inquiry, value).into(),
        ).unwrap();
        prop_assert!(serialized.header.ends_with('\n'));
        prop_assert_eq!(serialized.payload_len(), 0);
    }

    /// Property: the image payload invariant `bytes == 2*H*W` is both
    /// enforced at construction and preserved through serialization.
    #[test]
    fn prop_image_payload_size(height in 0u64..64, width in 0u64..64) {
        let num_bytes = (height * width * 2) as usize;
        let pixels: Vec<u8> = (0..num_bytes).map(|i| (i % 251) as u8).collect();
        let image = ImageBinaryData::new(pixels.clone(), [height, width], vec![]).unwrap();
        prop_assert_eq!(image.num_bytes(), num_bytes);

        let serialized = Serializer::serialize(image.into()).unwrap();
        let expected_dims = format!("[{height},{width}]");
        prop_assert!(serialized.header.contains(&expected_dims));
        // Payload carries the pixels plus the single ETX terminator.
        prop_assert_eq!(serialized.payload_len(), num_bytes + 1);
        prop_assert_eq!(&serialized.payload[..num_bytes], &pixels[..]);

        // A short buffer must be rejected, not silently reshaped.
        if num_bytes > 0 {
            let truncated = vec![0u8; num_bytes - 1];
            prop_assert!(ImageBinaryData::new(truncated, [height, width], vec![]).is_err());
        }
    }
}
