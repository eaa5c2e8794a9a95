//! Control-line parser.
//!
//! Converts one protocol line (without its trailing newline) into an
//! [`InMessage`]. The three shapes are attempted in a fixed order —
//! assignment, inquiry, command — and the first match wins:
//!
//! ```text
//! exposure=5000          assignment, integer value
//! gain=2.5               assignment, double value
//! mode={freerun}         assignment, string value (braces stripped)
//! tap[0][1]=3            assignment, indexed identifier
//! fr?                    inquiry
//! gi                     command
//! ```
//!
//! Values are interpreted dynamically: text that parses as a number
//! and contains `.`, `e` or `E` stays a double; other numbers collapse
//! to an integer when they fit 32 bits; everything else is a string,
//! with one matching pair of `'…'`, `"…"` or `{…}` wrappers stripped.
//!
//! A literal `bypass ` prefix is stripped before parsing, kept for
//! compatibility with older control software that tunnelled lines
//! through an intermediate daemon.
//!
//! # Examples
//!
//! ```
//! use framecast_protocol::{InMessage, Parser, Value};
//!
//! let msg = Parser::parse("it=5000").unwrap();
//! let InMessage::Assignment(assignment) = msg else { panic!() };
//! assert_eq!(assignment.identifier, "it");
//! assert_eq!(assignment.value, Value::Int(5000));
//!
//! assert!(Parser::parse("42=foo").is_none());
//! ```

use crate::message::{Assignment, Command, InMessage, Inquiry};
use crate::value::Value;
use framecast_core::{Error, Result};
use tracing::{trace, warn};

/// Prefix stripped from incoming lines before parsing.
const BYPASS_PREFIX: &str = "bypass ";

/// Scan an identifier at the start of `s` and return the byte offset
/// one past its end, or `None` if `s` does not start with one.
///
/// The grammar is a leading ASCII letter, then letters, digits or
/// underscores, then zero or more `[N]` index groups with at least one
/// decimal digit each.
pub(crate) fn identifier_end(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if !bytes.first()?.is_ascii_alphabetic() {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    // Optional [N] index groups.
    while i < bytes.len() && bytes[i] == b'[' {
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j == i + 1 || bytes.get(j) != Some(&b']') {
            break;
        }
        i = j + 1;
    }
    Some(i)
}

/// Parser for incoming control lines.
pub struct Parser;

impl Parser {
    /// Parse one line into an [`InMessage`].
    ///
    /// Whitespace is trimmed on both sides and a leading `bypass `
    /// prefix is stripped before matching. Returns `None` when the
    /// line matches none of the three message shapes; the rejection
    /// reasons are logged at warn level.
    pub fn parse(line: &str) -> Option<InMessage> {
        trace!(line, "parsing control line");
        let mut s = line.trim();
        if let Some(stripped) = s.strip_prefix(BYPASS_PREFIX) {
            s = stripped.trim_start();
        }

        let mut reasons = Vec::with_capacity(3);
        match Self::parse_assignment(s) {
            Ok(msg) => return Some(InMessage::Assignment(msg)),
            Err(e) => reasons.push(e.to_string()),
        }
        match Self::parse_inquiry(s) {
            Ok(msg) => return Some(InMessage::Inquiry(msg)),
            Err(e) => reasons.push(e.to_string()),
        }
        match Self::parse_command(s) {
            Ok(msg) => return Some(InMessage::Command(msg)),
            Err(e) => reasons.push(e.to_string()),
        }

        warn!(
            line,
            reasons = reasons.join("; "),
            "line matched no message shape"
        );
        None
    }

    /// Parse an assignment line: `IDENT=VALUE`.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` when the line is not an
    /// assignment.
    pub fn parse_assignment(line: &str) -> Result<Assignment> {
        let end = identifier_end(line).ok_or_else(|| {
            Error::InvalidMessageFormat("assignment: no identifier at line start".to_string())
        })?;
        let rest = &line[end..];
        let value = rest.strip_prefix('=').ok_or_else(|| {
            Error::InvalidMessageFormat("assignment: missing '=' after identifier".to_string())
        })?;
        if value.is_empty() {
            return Err(Error::InvalidMessageFormat(
                "assignment: empty value".to_string(),
            ));
        }
        Ok(Assignment {
            identifier: line[..end].to_string(),
            value: Self::parse_value(value.trim()),
        })
    }

    /// Parse an inquiry line: `IDENT?`.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` when the line is not an
    /// inquiry.
    pub fn parse_inquiry(line: &str) -> Result<Inquiry> {
        let end = identifier_end(line).ok_or_else(|| {
            Error::InvalidMessageFormat("inquiry: no identifier at line start".to_string())
        })?;
        if &line[end..] != "?" {
            return Err(Error::InvalidMessageFormat(
                "inquiry: expected a single trailing '?'".to_string(),
            ));
        }
        Ok(Inquiry {
            identifier: line[..end].to_string(),
        })
    }

    /// Parse a command line: a bare `IDENT`.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` when the line is not a
    /// command.
    pub fn parse_command(line: &str) -> Result<Command> {
        let end = identifier_end(line).ok_or_else(|| {
            Error::InvalidMessageFormat("command: no identifier at line start".to_string())
        })?;
        if end != line.len() {
            return Err(Error::InvalidMessageFormat(
                "command: trailing characters after identifier".to_string(),
            ));
        }
        Ok(Command {
            identifier: line.to_string(),
        })
    }

    /// Interpret the right-hand side of an assignment.
    ///
    /// Numeric text containing `.`, `e` or `E` stays a double; other
    /// numbers become an integer when they fit in 32 bits, a double
    /// otherwise. Non-numeric text is a string with one matching pair
    /// of quote or brace wrappers stripped.
    pub fn parse_value(text: &str) -> Value {
        if let Ok(number) = text.parse::<f64>() {
            if text.contains(['.', 'e', 'E']) {
                return Value::Double(number);
            }
            if number >= i32::MIN as f64 && number <= i32::MAX as f64 {
                return Value::Int(number as i64);
            }
            return Value::Double(number);
        }

        let bytes = text.as_bytes();
        if bytes.len() >= 2 {
            let wrapped = matches!(
                (bytes[0], bytes[bytes.len() - 1]),
                (b'\'', b'\'') | (b'"', b'"') | (b'{', b'}')
            );
            if wrapped {
                return Value::Str(text[1..text.len() - 1].to_string());
            }
        }
        Value::Str(text.to_string())
    }

    /// Best-effort identifier extraction from an unparseable line,
    /// used to address the error reply. Returns the trimmed text
    /// before the first `=` or `?`, or `None` when that is empty.
    pub fn extract_identifier(line: &str) -> Option<&str> {
        let mut s = line.trim();
        if let Some(stripped) = s.strip_prefix(BYPASS_PREFIX) {
            s = stripped.trim_start();
        }
        let prefix = s.split(['=', '?']).next().unwrap_or("").trim();
        if prefix.is_empty() { None } else { Some(prefix) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("foo=32", "foo", Value::Int(32))]
    #[case("bar=53.6", "bar", Value::Double(53.6))]
    #[case("qux_123=0.432", "qux_123", Value::Double(0.432))]
    #[case("array_like[1]=hello", "array_like[1]", Value::Str("hello".into()))]
    #[case("nested[1][2]=0", "nested[1][2]", Value::Int(0))]
    #[case("single='single quote'", "single", Value::Str("single quote".into()))]
    #[case("double=\"double quote\"", "double", Value::Str("double quote".into()))]
    #[case("braces={string value}", "braces", Value::Str("string value".into()))]
    #[case("  padded= 7 ", "padded", Value::Int(7))]
    fn test_parse_assignment(
        #[case] line: &str,
        #[case] identifier: &str,
        #[case] value: Value,
    ) {
        let Some(InMessage::Assignment(msg)) = Parser::parse(line) else {
            panic!("expected assignment for '{line}'");
        };
        assert_eq!(msg.identifier, identifier);
        assert_eq!(msg.value, value);
    }

    #[rstest]
    #[case("fr?", "fr")]
    #[case("qux_123?", "qux_123")]
    #[case("array_like[1]?", "array_like[1]")]
    #[case(" it? ", "it")]
    fn test_parse_inquiry(#[case] line: &str, #[case] identifier: &str) {
        let Some(InMessage::Inquiry(msg)) = Parser::parse(line) else {
            panic!("expected inquiry for '{line}'");
        };
        assert_eq!(msg.identifier, identifier);
    }

    #[rstest]
    #[case("gi")]
    #[case("gis")]
    #[case("abort")]
    #[case("qux_123")]
    fn test_parse_command(#[case] line: &str) {
        let Some(InMessage::Command(msg)) = Parser::parse(line) else {
            panic!("expected command for '{line}'");
        };
        assert_eq!(msg.identifier, line);
    }

    #[rstest]
    #[case("42=foo")]
    #[case("=5")]
    #[case("?")]
    #[case("")]
    #[case("   ")]
    #[case("_under=1")]
    #[case("a b")]
    #[case("x=")]
    fn test_parse_rejects(#[case] line: &str) {
        assert!(Parser::parse(line).is_none(), "'{line}' should not parse");
    }

    #[test]
    fn test_bypass_prefix_stripped() {
        let Some(InMessage::Assignment(msg)) = Parser::parse("bypass it=2000") else {
            panic!("expected assignment");
        };
        assert_eq!(msg.identifier, "it");
        assert_eq!(msg.value, Value::Int(2000));
    }

    #[rstest]
    #[case("5.0", Value::Double(5.0))]
    #[case("5.", Value::Double(5.0))]
    #[case("1e3", Value::Double(1000.0))]
    #[case("1E3", Value::Double(1000.0))]
    #[case("42", Value::Int(42))]
    #[case("-42", Value::Int(-42))]
    #[case("2147483647", Value::Int(2147483647))]
    // One past i32::MAX no longer fits 32 bits and stays floating.
    #[case("2147483648", Value::Double(2147483648.0))]
    #[case("4000000000", Value::Double(4000000000.0))]
    #[case("freerun", Value::Str("freerun".into()))]
    #[case("'x'", Value::Str("x".into()))]
    #[case("{}", Value::Str("".into()))]
    #[case("{5}", Value::Str("5".into()))]
    #[case("'mismatched\"", Value::Str("'mismatched\"".into()))]
    fn test_parse_value(#[case] text: &str, #[case] expected: Value) {
        assert_eq!(Parser::parse_value(text), expected);
    }

    #[test]
    fn test_extract_identifier() {
        assert_eq!(Parser::extract_identifier("42=foo"), Some("42"));
        assert_eq!(Parser::extract_identifier("  weird? "), Some("weird"));
        assert_eq!(Parser::extract_identifier("=5"), None);
        assert_eq!(Parser::extract_identifier("   "), None);
    }

    #[test]
    fn test_value_survives_assignment_command_ambiguity() {
        // A bare identifier is a command, never an empty assignment.
        assert!(matches!(Parser::parse("fr"), Some(InMessage::Command(_))));
    }
}
