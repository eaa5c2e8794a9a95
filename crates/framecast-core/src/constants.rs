//! Protocol and scheduling constants shared across the workspace.

/// Default TCP port the server binds when none is configured.
pub const DEFAULT_PORT: u16 = 15099;

/// Start of Header byte prefixing the shape block of a binary message.
pub const SOH: u8 = 0x01;

/// Start of Text byte separating the binary header from the pixel payload.
pub const STX: u8 = 0x02;

/// End of Text byte terminating a binary payload.
pub const ETX: u8 = 0x03;

/// Bytes per pixel on the wire (16-bit little-endian).
pub const BYTES_PER_PIXEL: usize = 2;

/// Default per-session stream frame rate in frames per second.
pub const DEFAULT_FRAME_RATE: f64 = 4.0;

/// Default per-session stream sequence length in frames.
pub const DEFAULT_SEQUENCE_LENGTH: u64 = 16;

/// Capacity of each client's frame queue. A consumer that falls this
/// many frames behind stalls its own delivery, not other clients'.
pub const FRAME_QUEUE_CAPACITY: usize = 10;

/// Upper bound on a single protocol line. Longer lines are rejected
/// before parsing to bound memory held per connection.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;
