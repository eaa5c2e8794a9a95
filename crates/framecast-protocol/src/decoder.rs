//! Line extraction from the inbound byte stream.
//!
//! Control traffic is newline-terminated; a partial line at the end of
//! a read stays buffered until more bytes arrive. The decoder yields
//! raw line text (without the terminator) rather than parsed messages
//! so the session can still address an error reply when parsing fails.

use bytes::{Buf, BytesMut};
use framecast_core::constants::MAX_LINE_LENGTH;
use framecast_core::Error;
use tokio_util::codec::Decoder;

/// Tokio codec decoder splitting the inbound stream on `\n`.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use framecast_protocol::LineDecoder;
/// use tokio_util::codec::Decoder;
///
/// let mut decoder = LineDecoder::new();
/// let mut buffer = BytesMut::from(&b"fr=4.0\ngis"[..]);
///
/// assert_eq!(decoder.decode(&mut buffer).unwrap(), Some("fr=4.0".to_string()));
/// // "gis" has no terminator yet and stays buffered.
/// assert_eq!(decoder.decode(&mut buffer).unwrap(), None);
/// ```
#[derive(Debug)]
pub struct LineDecoder {
    max_length: usize,
}

impl LineDecoder {
    /// Create a decoder with the default line length limit.
    pub fn new() -> Self {
        Self {
            max_length: MAX_LINE_LENGTH,
        }
    }

    /// Create a decoder with a custom line length limit.
    pub fn with_max_length(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineDecoder {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Error> {
        let Some(newline) = src.iter().position(|&b| b == b'\n') else {
            // No complete line. Reject a buffer that already exceeds
            // the limit instead of growing it without bound.
            if src.len() > self.max_length {
                let size = src.len();
                src.clear();
                return Err(Error::LineTooLong {
                    size,
                    max_size: self.max_length,
                });
            }
            return Ok(None);
        };

        if newline > self.max_length {
            src.advance(newline + 1);
            return Err(Error::LineTooLong {
                size: newline,
                max_size: self.max_length,
            });
        }

        let mut line = src.split_to(newline + 1);
        line.truncate(newline);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_line() {
        let mut decoder = LineDecoder::new();
        let mut buffer = BytesMut::from(&b"it=5000\n"[..]);
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some("it=5000".into()));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_decode_multiple_lines_in_one_read() {
        let mut decoder = LineDecoder::new();
        let mut buffer = BytesMut::from(&b"fr=10.0\nisl=4\ngis\n"[..]);
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some("fr=10.0".into()));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some("isl=4".into()));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some("gis".into()));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_partial_line_held_until_terminator() {
        let mut decoder = LineDecoder::new();
        let mut buffer = BytesMut::from(&b"ab"[..]);
        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);
        buffer.extend_from_slice(b"ort\n");
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some("abort".into()));
    }

    #[test]
    fn test_crlf_stripped() {
        let mut decoder = LineDecoder::new();
        let mut buffer = BytesMut::from(&b"gi\r\n"[..]);
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some("gi".into()));
    }

    #[test]
    fn test_oversized_line_rejected() {
        let mut decoder = LineDecoder::with_max_length(8);
        let mut buffer = BytesMut::from(&b"0123456789abcdef\nok\n"[..]);
        assert!(matches!(
            decoder.decode(&mut buffer),
            Err(Error::LineTooLong { .. })
        ));
        // The stream recovers at the next line boundary.
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some("ok".into()));
    }

    #[test]
    fn test_oversized_fragment_rejected_before_terminator() {
        let mut decoder = LineDecoder::with_max_length(8);
        let mut buffer = BytesMut::from(&b"0123456789abcdef"[..]);
        assert!(matches!(
            decoder.decode(&mut buffer),
            Err(Error::LineTooLong { .. })
        ));
    }
}
