//! Message handler registry and dispatch.
//!
//! Three per-kind tables map identifiers to actions: assignments,
//! inquiries, and commands each get their own namespace, so `fr` the
//! assignment and `fr` the inquiry are distinct registrations.
//! Actions are a closed enum per kind and dispatch is an exhaustive
//! match; `async fn` handlers stay free of trait objects this way.
//!
//! [`MessageRouter::with_standard_handlers`] installs the protocol's
//! built-in surface:
//!
//! | identifier | kinds | effect |
//! |---|---|---|
//! | `fr` | A/I | session frame rate |
//! | `isl` | A/I | session sequence length |
//! | `it` | A/I | camera integration time, broadcast on change |
//! | `img_left`/`img_top`/`img_width`/`img_height` | A/I | camera ROI, broadcast on change |
//! | `gi` | C | capture one frame now |
//! | `gis` | C | stream `isl` frames at `fr` fps |
//! | `abort` | C | stop the active stream |

mod assignment;
mod command;
mod inquiry;

use crate::app::AppShared;
use crate::error::{Result, ServerError};
use framecast_core::ClientId;
use framecast_protocol::{ErrorMessage, InMessage, InMessageKind, OutMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Camera ROI parameter targeted by the `img_*` identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiParam {
    Left,
    Top,
    Width,
    Height,
}

impl RoiParam {
    /// Name of the camera feature this parameter maps to.
    pub fn feature_name(&self) -> &'static str {
        match self {
            RoiParam::Left => "OffsetX",
            RoiParam::Top => "OffsetY",
            RoiParam::Width => "Width",
            RoiParam::Height => "Height",
        }
    }
}

/// Registered assignment behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentAction {
    FrameRate,
    SequenceLength,
    IntegrationTime,
    Roi(RoiParam),
}

/// Registered inquiry behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InquiryAction {
    FrameRate,
    SequenceLength,
    IntegrationTime,
    Roi(RoiParam),
}

/// Registered command behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    CaptureSingle,
    CaptureStream,
    AbortStream,
}

/// Maps `(message kind, identifier)` to the action that handles it.
#[derive(Debug, Default)]
pub struct MessageRouter {
    assignments: HashMap<String, AssignmentAction>,
    inquiries: HashMap<String, InquiryAction>,
    commands: HashMap<String, CommandAction>,
}

impl MessageRouter {
    /// An empty router with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A router with the full built-in handler surface installed.
    pub fn with_standard_handlers() -> Result<Self> {
        let mut router = Self::new();

        router.register_assignment("fr", AssignmentAction::FrameRate)?;
        router.register_inquiry("fr", InquiryAction::FrameRate)?;
        router.register_assignment("isl", AssignmentAction::SequenceLength)?;
        router.register_inquiry("isl", InquiryAction::SequenceLength)?;
        router.register_assignment("it", AssignmentAction::IntegrationTime)?;
        router.register_inquiry("it", InquiryAction::IntegrationTime)?;

        for (identifier, param) in [
            ("img_left", RoiParam::Left),
            ("img_top", RoiParam::Top),
            ("img_width", RoiParam::Width),
            ("img_height", RoiParam::Height),
        ] {
            router.register_assignment(identifier, AssignmentAction::Roi(param))?;
            router.register_inquiry(identifier, InquiryAction::Roi(param))?;
        }

        router.register_command("gi", CommandAction::CaptureSingle)?;
        router.register_command("gis", CommandAction::CaptureStream)?;
        router.register_command("abort", CommandAction::AbortStream)?;

        Ok(router)
    }

    /// Register an assignment handler.
    ///
    /// # Errors
    /// Returns `ServerError::DuplicateHandler` if the identifier is
    /// already taken in the assignment table.
    pub fn register_assignment(
        &mut self,
        identifier: impl Into<String>,
        action: AssignmentAction,
    ) -> Result<()> {
        let identifier = identifier.into();
        if self.assignments.contains_key(&identifier) {
            return Err(ServerError::DuplicateHandler {
                kind: InMessageKind::Assignment,
                identifier,
            });
        }
        self.assignments.insert(identifier, action);
        Ok(())
    }

    /// Register an inquiry handler.
    ///
    /// # Errors
    /// Returns `ServerError::DuplicateHandler` on duplicates.
    pub fn register_inquiry(
        &mut self,
        identifier: impl Into<String>,
        action: InquiryAction,
    ) -> Result<()> {
        let identifier = identifier.into();
        if self.inquiries.contains_key(&identifier) {
            return Err(ServerError::DuplicateHandler {
                kind: InMessageKind::Inquiry,
                identifier,
            });
        }
        self.inquiries.insert(identifier, action);
        Ok(())
    }

    /// Register a command handler.
    ///
    /// # Errors
    /// Returns `ServerError::DuplicateHandler` on duplicates.
    pub fn register_command(
        &mut self,
        identifier: impl Into<String>,
        action: CommandAction,
    ) -> Result<()> {
        let identifier = identifier.into();
        if self.commands.contains_key(&identifier) {
            return Err(ServerError::DuplicateHandler {
                kind: InMessageKind::Command,
                identifier,
            });
        }
        self.commands.insert(identifier, action);
        Ok(())
    }

    /// Dispatch a parsed message for `client_id` and collect the
    /// outbound replies. Unknown identifiers produce a single generic
    /// error reply.
    pub async fn handle(
        &self,
        app: &Arc<AppShared>,
        client_id: ClientId,
        message: InMessage,
    ) -> Vec<OutMessage> {
        match message {
            InMessage::Assignment(msg) => match self.assignments.get(&msg.identifier) {
                Some(action) => assignment::dispatch(*action, app, client_id, msg).await,
                None => no_handler(InMessage::Assignment(msg)),
            },
            InMessage::Inquiry(msg) => match self.inquiries.get(&msg.identifier) {
                Some(action) => inquiry::dispatch(*action, app, client_id, msg).await,
                None => no_handler(InMessage::Inquiry(msg)),
            },
            InMessage::Command(msg) => match self.commands.get(&msg.identifier) {
                Some(action) => command::dispatch(*action, app, client_id, msg).await,
                None => no_handler(InMessage::Command(msg)),
            },
        }
    }
}

fn no_handler(message: InMessage) -> Vec<OutMessage> {
    warn!(%message, "no handler registered");
    vec![ErrorMessage::from_message(&message, "No handler registered for this message.").into()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_surface_complete() {
        let router = MessageRouter::with_standard_handlers().unwrap();
        for identifier in ["fr", "isl", "it", "img_left", "img_top", "img_width", "img_height"] {
            assert!(router.assignments.contains_key(identifier), "{identifier}");
            assert!(router.inquiries.contains_key(identifier), "{identifier}");
        }
        for identifier in ["gi", "gis", "abort"] {
            assert!(router.commands.contains_key(identifier), "{identifier}");
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut router = MessageRouter::with_standard_handlers().unwrap();
        let result = router.register_assignment("fr", AssignmentAction::FrameRate);
        assert!(matches!(
            result,
            Err(ServerError::DuplicateHandler {
                kind: InMessageKind::Assignment,
                ..
            })
        ));
    }

    #[test]
    fn test_kind_tables_are_independent() {
        let mut router = MessageRouter::new();
        router
            .register_assignment("fr", AssignmentAction::FrameRate)
            .unwrap();
        // The same identifier is free in the other tables.
        router.register_inquiry("fr", InquiryAction::FrameRate).unwrap();
        router.register_command("fr", CommandAction::AbortStream).unwrap();
    }

    #[test]
    fn test_roi_param_feature_names() {
        assert_eq!(RoiParam::Left.feature_name(), "OffsetX");
        assert_eq!(RoiParam::Top.feature_name(), "OffsetY");
        assert_eq!(RoiParam::Width.feature_name(), "Width");
        assert_eq!(RoiParam::Height.feature_name(), "Height");
    }
}
