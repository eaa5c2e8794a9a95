//! Assignment handlers: session stream parameters and camera features.

use super::{AssignmentAction, RoiParam};
use crate::app::AppShared;
use framecast_core::ClientId;
use framecast_protocol::{Assignment, ErrorMessage, InMessage, OutMessage, Success};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub(super) async fn dispatch(
    action: AssignmentAction,
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Assignment,
) -> Vec<OutMessage> {
    match action {
        AssignmentAction::FrameRate => frame_rate(app, client_id, message).await,
        AssignmentAction::SequenceLength => sequence_length(app, client_id, message).await,
        AssignmentAction::IntegrationTime => integration_time(app, client_id, message).await,
        AssignmentAction::Roi(param) => roi(app, client_id, message, param).await,
    }
}

fn reject(message: Assignment, description: impl Into<String>) -> Vec<OutMessage> {
    vec![ErrorMessage::from_message(&InMessage::Assignment(message), description).into()]
}

/// `fr=<fps>` — session frame rate. Refused while a stream runs.
async fn frame_rate(
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Assignment,
) -> Vec<OutMessage> {
    let Some(session) = app.get_session(client_id) else {
        warn!(client = %client_id.short(), "no session for frame rate assignment");
        return Vec::new();
    };

    if session.is_listening() {
        warn!(client = %client_id.short(), "frame rate change refused while streaming");
        return reject(
            message,
            "Session is already listening to frames. Cannot set a frame rate.",
        );
    }

    let Ok(frame_rate) = message.value.to_double() else {
        return reject(message, "frame rate must be numeric.");
    };
    if frame_rate <= 0.0 {
        return reject(message, "frame rate must be positive.");
    }

    info!(client = %client_id.short(), frame_rate, "frame rate set");
    session.update_stream_params(|params| params.frame_rate = frame_rate);
    vec![Success::from_assignment(message).into()]
}

/// `isl=<n>` — stream sequence length. Refused while a stream runs.
async fn sequence_length(
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Assignment,
) -> Vec<OutMessage> {
    let Some(session) = app.get_session(client_id) else {
        warn!(client = %client_id.short(), "no session for sequence length assignment");
        return Vec::new();
    };

    if session.is_listening() {
        warn!(client = %client_id.short(), "sequence length change refused while streaming");
        return reject(
            message,
            "Session is already listening to frames. Cannot set a sequence length.",
        );
    }

    let Some(length) = message.value.as_int() else {
        return reject(message, "sequence length must be an integer.");
    };
    if length <= 0 {
        return reject(message, "sequence length must be positive.");
    }

    info!(client = %client_id.short(), length, "sequence length set");
    session.update_stream_params(|params| params.sequence_length = length as u64);
    vec![Success::from_assignment(message).into()]
}

/// `it=<us>` — camera integration time in microseconds. The applied
/// value is broadcast to every client so all of them observe the new
/// exposure; the requester receives no direct reply.
async fn integration_time(
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Assignment,
) -> Vec<OutMessage> {
    if !message.value.is_numeric() {
        return reject(message, "integration time must be numeric.");
    }
    let requested_us = message.value.to_int().unwrap_or(0);
    if requested_us <= 0 {
        return reject(message, "integration time must be positive.");
    }

    match app
        .camera()
        .set_exposure(Duration::from_micros(requested_us as u64))
        .await
    {
        Ok(applied) => {
            let applied_us = applied.as_micros() as i64;
            info!(client = %client_id.short(), applied_us, "integration time set");
            let echo = Success::from_assignment_with(message, applied_us);
            app.broadcast(echo.into(), None).await;
            Vec::new()
        }
        Err(error) => {
            warn!(client = %client_id.short(), %error, "integration time rejected");
            reject(message, error.to_string())
        }
    }
}

/// `img_*=<px>` — camera ROI geometry. The coerced value is broadcast
/// to every client; the requester receives no direct reply.
async fn roi(
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Assignment,
    param: RoiParam,
) -> Vec<OutMessage> {
    let Ok(requested) = message.value.to_int() else {
        return reject(message, "image geometry must be an integer.");
    };

    match app.camera().set_param(param.feature_name(), requested).await {
        Ok(applied) => {
            let applied = applied.to_int().unwrap_or(requested);
            info!(
                client = %client_id.short(),
                feature = param.feature_name(),
                applied,
                "camera geometry set"
            );
            let echo = Success::from_assignment_with(message, applied);
            app.broadcast(echo.into(), None).await;
            Vec::new()
        }
        Err(error) => {
            warn!(client = %client_id.short(), %error, "camera geometry rejected");
            reject(message, error.to_string())
        }
    }
}
