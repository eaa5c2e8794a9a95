//! Incoming and outgoing protocol messages.
//!
//! Incoming traffic is one of three tagged shapes — [`Assignment`],
//! [`Inquiry`], [`Command`] — wrapped in [`InMessage`]. Outgoing
//! traffic is [`OutMessage`]: textual [`Success`]/[`ErrorMessage`]
//! replies or one of the binary payload carriers from [`crate::binary`].

use crate::binary::{BinaryDataBuffer, ColorImageBinaryData, ImageBinaryData};
use crate::value::Value;
use framecast_core::{Error, Result};
use std::fmt;

/// Validate an identifier against the protocol grammar.
///
/// Identifiers start with an ASCII letter, continue with letters,
/// digits or underscores, and may carry one or more `[N]` index
/// suffixes with decimal `N` (e.g. `roi`, `gain_raw`, `tap[0][1]`).
///
/// # Errors
/// Returns `Error::InvalidIdentifier` if the string does not match.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    match crate::parser::identifier_end(identifier) {
        Some(end) if end == identifier.len() => Ok(()),
        _ => Err(Error::InvalidIdentifier(format!(
            "'{identifier}' does not match the identifier grammar"
        ))),
    }
}

/// Kind tag of an incoming message, recorded on replies so the
/// serializer can pick the right response form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InMessageKind {
    Assignment,
    Inquiry,
    Command,
}

impl fmt::Display for InMessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InMessageKind::Assignment => write!(f, "assignment"),
            InMessageKind::Inquiry => write!(f, "inquiry"),
            InMessageKind::Command => write!(f, "command"),
        }
    }
}

/// `IDENT=VALUE` — set a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub identifier: String,
    pub value: Value,
}

impl Assignment {
    /// Create an assignment, validating the identifier.
    ///
    /// # Errors
    /// Returns `Error::InvalidIdentifier` for a malformed identifier.
    pub fn new(identifier: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        let identifier = identifier.into();
        validate_identifier(&identifier)?;
        Ok(Assignment {
            identifier,
            value: value.into(),
        })
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Assignment[{}={}]", self.identifier, self.value)
    }
}

/// `IDENT?` — query a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inquiry {
    pub identifier: String,
}

impl Inquiry {
    /// Create an inquiry, validating the identifier.
    ///
    /// # Errors
    /// Returns `Error::InvalidIdentifier` for a malformed identifier.
    pub fn new(identifier: impl Into<String>) -> Result<Self> {
        let identifier = identifier.into();
        validate_identifier(&identifier)?;
        Ok(Inquiry { identifier })
    }
}

impl fmt::Display for Inquiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Inquiry[{}?]", self.identifier)
    }
}

/// `IDENT` — trigger an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub identifier: String,
}

impl Command {
    /// Create a command, validating the identifier.
    ///
    /// # Errors
    /// Returns `Error::InvalidIdentifier` for a malformed identifier.
    pub fn new(identifier: impl Into<String>) -> Result<Self> {
        let identifier = identifier.into();
        validate_identifier(&identifier)?;
        Ok(Command { identifier })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command[{}]", self.identifier)
    }
}

/// A parsed incoming message.
#[derive(Debug, Clone, PartialEq)]
pub enum InMessage {
    Assignment(Assignment),
    Inquiry(Inquiry),
    Command(Command),
}

impl InMessage {
    /// Identifier of the wrapped message.
    pub fn identifier(&self) -> &str {
        match self {
            InMessage::Assignment(m) => &m.identifier,
            InMessage::Inquiry(m) => &m.identifier,
            InMessage::Command(m) => &m.identifier,
        }
    }

    /// Kind tag of the wrapped message.
    pub fn kind(&self) -> InMessageKind {
        match self {
            InMessage::Assignment(_) => InMessageKind::Assignment,
            InMessage::Inquiry(_) => InMessageKind::Inquiry,
            InMessage::Command(_) => InMessageKind::Command,
        }
    }
}

impl fmt::Display for InMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InMessage::Assignment(m) => m.fmt(f),
            InMessage::Inquiry(m) => m.fmt(f),
            InMessage::Command(m) => m.fmt(f),
        }
    }
}

/// Positive reply to an incoming message.
///
/// The constructors enforce the body rules: a success derived from an
/// assignment always carries the applied value, a success derived from
/// a command never carries one, and an inquiry success usually does.
#[derive(Debug, Clone, PartialEq)]
pub struct Success {
    pub identifier: String,
    pub source: InMessageKind,
    pub body: Option<Value>,
}

impl Success {
    /// Success for an assignment, echoing the value that was applied.
    ///
    /// The echoed value may differ from the requested one when the
    /// handler coerced it (e.g. a camera feature clamped to range).
    pub fn from_assignment(assignment: Assignment) -> Self {
        Success {
            identifier: assignment.identifier,
            source: InMessageKind::Assignment,
            body: Some(assignment.value),
        }
    }

    /// Success for an assignment with an explicitly coerced value.
    pub fn from_assignment_with(assignment: Assignment, applied: impl Into<Value>) -> Self {
        Success {
            identifier: assignment.identifier,
            source: InMessageKind::Assignment,
            body: Some(applied.into()),
        }
    }

    /// Success for an inquiry, with the queried value.
    pub fn from_inquiry(inquiry: Inquiry, body: impl Into<Value>) -> Self {
        Success {
            identifier: inquiry.identifier,
            source: InMessageKind::Inquiry,
            body: Some(body.into()),
        }
    }

    /// Success for an inquiry that yields no value.
    pub fn from_inquiry_empty(inquiry: Inquiry) -> Self {
        Success {
            identifier: inquiry.identifier,
            source: InMessageKind::Inquiry,
            body: None,
        }
    }

    /// Success for a completed command.
    pub fn from_command(command: Command) -> Self {
        Success {
            identifier: command.identifier,
            source: InMessageKind::Command,
            body: None,
        }
    }

    /// Unsolicited status line, e.g. the `isn=<n>` counter emitted
    /// after each streamed frame. Wire form matches an inquiry reply.
    pub fn status(identifier: impl Into<String>, value: impl Into<Value>) -> Self {
        Success {
            identifier: identifier.into(),
            source: InMessageKind::Inquiry,
            body: Some(value.into()),
        }
    }

    /// Returns `true` if a body value is present.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

impl fmt::Display for Success {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Some(body) => write!(f, "Success[{}={} from {}]", self.identifier, body, self.source),
            None => write!(f, "Success[{} from {}]", self.identifier, self.source),
        }
    }
}

/// Negative reply to an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub identifier: String,
    pub source: InMessageKind,
    pub description: String,
}

impl ErrorMessage {
    pub fn new(
        identifier: impl Into<String>,
        source: InMessageKind,
        description: impl Into<String>,
    ) -> Self {
        ErrorMessage {
            identifier: identifier.into(),
            source,
            description: description.into(),
        }
    }

    /// Error reply for any incoming message, reusing its identifier
    /// and kind tag.
    pub fn from_message(message: &InMessage, description: impl Into<String>) -> Self {
        ErrorMessage {
            identifier: message.identifier().to_string(),
            source: message.kind(),
            description: description.into(),
        }
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error[{}: {} ({})]",
            self.identifier, self.description, self.source
        )
    }
}

/// A message travelling from server to client.
#[derive(Debug)]
pub enum OutMessage {
    Success(Success),
    Error(ErrorMessage),
    Image(ImageBinaryData),
    Buffer(BinaryDataBuffer),
    ColorImage(ColorImageBinaryData),
}

impl From<Success> for OutMessage {
    fn from(msg: Success) -> Self {
        OutMessage::Success(msg)
    }
}

impl From<ErrorMessage> for OutMessage {
    fn from(msg: ErrorMessage) -> Self {
        OutMessage::Error(msg)
    }
}

impl From<ImageBinaryData> for OutMessage {
    fn from(msg: ImageBinaryData) -> Self {
        OutMessage::Image(msg)
    }
}

impl fmt::Display for OutMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutMessage::Success(m) => m.fmt(f),
            OutMessage::Error(m) => m.fmt(f),
            OutMessage::Image(m) => m.fmt(f),
            OutMessage::Buffer(m) => m.fmt(f),
            OutMessage::ColorImage(m) => m.fmt(f),
        }
    }
}
