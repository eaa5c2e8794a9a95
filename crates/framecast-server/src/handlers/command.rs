//! Command handlers: single capture, streaming, and abort.

use super::CommandAction;
use crate::app::AppShared;
use framecast_core::ClientId;
use framecast_protocol::{Command, ErrorMessage, InMessage, OutMessage, Success};
use std::sync::Arc;
use tracing::{info, warn};

pub(super) async fn dispatch(
    action: CommandAction,
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Command,
) -> Vec<OutMessage> {
    match action {
        CommandAction::CaptureSingle => capture_single(app, client_id, message).await,
        CommandAction::CaptureStream => capture_stream(app, client_id, message).await,
        CommandAction::AbortStream => abort_stream(app, client_id, message).await,
    }
}

fn reject(message: Command, description: impl Into<String>) -> Vec<OutMessage> {
    vec![ErrorMessage::from_message(&InMessage::Command(message), description).into()]
}

/// `gi` — one frame, captured as soon as the scheduler wakes. The
/// negative rate marks the registration as immediate.
async fn capture_single(
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Command,
) -> Vec<OutMessage> {
    start_stream(app, client_id, message, -1.0, 1).await
}

/// `gis` — a stream of `isl` frames at `fr` fps, both taken from the
/// session's current parameters.
async fn capture_stream(
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Command,
) -> Vec<OutMessage> {
    let Some(session) = app.get_session(client_id) else {
        warn!(client = %client_id.short(), "no session for stream command");
        return Vec::new();
    };

    let params = session.stream_params();
    if params.sequence_length == 0 {
        return reject(message, "sequence length is 0, nothing to stream.");
    }
    if params.frame_rate <= 0.0 {
        return reject(message, "frame rate is non-positive, cannot stream.");
    }

    start_stream(
        app,
        client_id,
        message,
        params.frame_rate,
        params.sequence_length as i64,
    )
    .await
}

/// Common path for `gi` and `gis`: claim the session's listener slot,
/// then register with the frame scheduler. The command completion is
/// emitted by the listener when the stream drains, so nothing is
/// returned here on success.
async fn start_stream(
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Command,
    fps: f64,
    frame_count: i64,
) -> Vec<OutMessage> {
    let Some(session) = app.get_session(client_id) else {
        warn!(client = %client_id.short(), "no session for capture command");
        return Vec::new();
    };

    let queue = app.collector().make_queue();
    if session.start_listener(Arc::clone(&queue), message.clone()).is_err() {
        warn!(client = %client_id.short(), "capture refused, listener already active");
        return reject(message, "Session is already listening to frames.");
    }

    app.collector()
        .register_client(client_id, fps, queue, frame_count);
    info!(
        client = %client_id.short(),
        command = %message.identifier,
        fps,
        frame_count,
        "client registered for frames"
    );
    Vec::new()
}

/// `abort` — stop the active stream. The listener exits without a
/// completion message; only the abort itself is acknowledged. Ignored
/// when no stream is running.
async fn abort_stream(
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Command,
) -> Vec<OutMessage> {
    let Some(session) = app.get_session(client_id) else {
        warn!(client = %client_id.short(), "no session for abort command");
        return Vec::new();
    };

    if !session.request_listener_stop() {
        info!(client = %client_id.short(), "abort ignored, no active stream");
        return Vec::new();
    }

    // Deregistration closes the frame queue, which wakes a listener
    // parked in pop so it can observe the stop flag.
    app.collector().deregister_client(client_id);
    info!(client = %client_id.short(), "stream aborted");
    vec![Success::from_command(message).into()]
}
