//! Inquiry handlers: read back session parameters and camera state.

use super::{InquiryAction, RoiParam};
use crate::app::AppShared;
use framecast_core::ClientId;
use framecast_protocol::{ErrorMessage, InMessage, Inquiry, OutMessage, Success};
use std::sync::Arc;
use tracing::warn;

pub(super) async fn dispatch(
    action: InquiryAction,
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Inquiry,
) -> Vec<OutMessage> {
    match action {
        InquiryAction::FrameRate => frame_rate(app, client_id, message).await,
        InquiryAction::SequenceLength => sequence_length(app, client_id, message).await,
        InquiryAction::IntegrationTime => integration_time(app, message).await,
        InquiryAction::Roi(param) => roi(app, message, param).await,
    }
}

/// `fr?`
async fn frame_rate(
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Inquiry,
) -> Vec<OutMessage> {
    let Some(session) = app.get_session(client_id) else {
        warn!(client = %client_id.short(), "no session for frame rate inquiry");
        return Vec::new();
    };
    let frame_rate = session.stream_params().frame_rate;
    vec![Success::from_inquiry(message, frame_rate).into()]
}

/// `isl?`
async fn sequence_length(
    app: &Arc<AppShared>,
    client_id: ClientId,
    message: Inquiry,
) -> Vec<OutMessage> {
    let Some(session) = app.get_session(client_id) else {
        warn!(client = %client_id.short(), "no session for sequence length inquiry");
        return Vec::new();
    };
    let length = session.stream_params().sequence_length;
    vec![Success::from_inquiry(message, length as i64).into()]
}

/// `it?` — cached camera exposure in microseconds.
async fn integration_time(app: &Arc<AppShared>, message: Inquiry) -> Vec<OutMessage> {
    let exposure_us = app.camera().exposure().as_micros() as i64;
    vec![Success::from_inquiry(message, exposure_us).into()]
}

/// `img_*?` — camera ROI geometry.
async fn roi(app: &Arc<AppShared>, message: Inquiry, param: RoiParam) -> Vec<OutMessage> {
    match app.camera().get_param(param.feature_name()).await {
        Ok(value) => match value.to_int() {
            Ok(value) => vec![Success::from_inquiry(message, value).into()],
            Err(error) => {
                vec![ErrorMessage::from_message(&InMessage::Inquiry(message), error.to_string())
                    .into()]
            }
        },
        Err(error) => {
            warn!(feature = param.feature_name(), %error, "camera geometry inquiry failed");
            vec![ErrorMessage::from_message(&InMessage::Inquiry(message), error.to_string()).into()]
        }
    }
}
