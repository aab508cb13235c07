use axum::{extract::State, Json};
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, PayloadMode, SecurePayload};
use crate::services::mailer::{self, OutboundMail, PASSWORD_RESET_SUBJECT};

/// POST /api/email/send
///
/// Sealed `{receiver, subject, body}`; `body` is HTML.
pub async fn send(State(state): State<AppState>, payload: SecurePayload) -> ApiResult<Value> {
    let requested = payload.require_str("receiver")?;
    let subject = payload.require_str("subject")?;
    let html = payload.str("body").unwrap_or_default();

    let receiver = mailer::resolve_receiver(&state.config, &requested)?;
    state
        .mailer
        .send(OutboundMail { to: receiver.clone(), subject, html })
        .await?;

    Ok(ApiResponse::ok().with("message", format!("Email sent to {} successfully", receiver)))
}

/// POST /api/email/reset
///
/// `{email, link}`, sealed or plain. The email must belong to a trainer.
pub async fn reset(State(state): State<AppState>, mode: PayloadMode, Json(body): Json<Value>) -> ApiResult<Value> {
    let payload = SecurePayload { mode, data: mode.open_either(&state.codec, &body)? };
    let email = payload.require_str("email")?;
    let link = payload.require_str("link")?;

    if state.trainers().find_by_email(&email).await?.is_none() {
        return Ok(ApiResponse::failure(
            "User not found",
            format!("User with email {} not found", email),
        ));
    }

    let receiver = mailer::resolve_receiver(&state.config, &email)?;
    state
        .mailer
        .send(OutboundMail {
            to: receiver.clone(),
            subject: PASSWORD_RESET_SUBJECT.to_string(),
            html: mailer::password_reset_body(&link),
        })
        .await?;

    Ok(ApiResponse::ok().with("message", format!("Email sent to {}", receiver)))
}
