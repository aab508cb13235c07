use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
};
use serde_json::Value;

use crate::app::AppState;
use crate::auth::otp;
use crate::auth::password::{hash_password, verify_password};
use crate::database::models::{TrainerAccount, TwoFactorRecord};
use crate::error::ApiError;
use crate::handlers::{client_ip, now};
use crate::middleware::{ApiResponse, ApiResult, SecurePayload};
use crate::services::mailer::{self, OutboundMail};

/// POST /api/auth/2fa/status
///
/// Sealed `{userID, UUID, USER_AGENT}`. A known device passes; anything else gets a fresh OTP by mail.
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    payload: SecurePayload,
) -> ApiResult<Value> {
    let user_id = payload.require_i64("userID")?;
    let uuid = payload.str("UUID").unwrap_or_default();
    let user_agent = payload.str("USER_AGENT").unwrap_or_default();

    let account = state
        .trainers()
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Trainer not found"))?;
    if !account.with_2fa {
        return Ok(ApiResponse::ok());
    }

    let store = state.two_factor();
    match store.find_by_user(user_id).await? {
        Some(record) if record.matches_device(&uuid, &user_agent) => {
            store.touch_ip(record.id, client_ip(&headers, peer).as_deref()).await?;
            Ok(ApiResponse::success(payload.seal(&state, &record.public_record())?))
        }
        Some(record) => {
            send_otp(&state, &account, &record).await?;
            Ok(ApiResponse::success(payload.seal(&state, &record.public_record())?).flag(false))
        }
        None => {
            store.create(user_id, now()).await?;
            let record = store
                .find_by_user(user_id)
                .await?
                .ok_or_else(|| ApiError::internal_server_error("Two factor record was not created"))?;
            send_otp(&state, &account, &record).await?;
            Ok(ApiResponse::ok().flag(false).with("message", "Two factor initiated"))
        }
    }
}

/// Store a new OTP hash on the record and mail the code to the trainer
async fn send_otp(state: &AppState, account: &TrainerAccount, record: &TwoFactorRecord) -> Result<(), ApiError> {
    let code = otp::generate();
    let secret = hash_password(&code.to_string()).await?;
    state.two_factor().store_secret(record.id, &secret, now()).await?;

    let receiver = mailer::resolve_receiver(&state.config, &account.email)?;
    state
        .mailer
        .send(OutboundMail {
            to: receiver,
            subject: otp::OTP_SUBJECT.to_string(),
            html: otp::mail_body(code),
        })
        .await?;

    tracing::info!("OTP issued for trainer {}", account.id);
    Ok(())
}

/// POST /api/auth/2fa/verify
///
/// Sealed `{userID, otp, UUID, USER_AGENT}`. A valid, unexpired code binds the device.
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    payload: SecurePayload,
) -> ApiResult<Value> {
    let user_id = payload.require_i64("userID")?;
    let code = payload.require_str("otp")?;
    let uuid = payload.str("UUID").unwrap_or_default();
    let user_agent = payload.str("USER_AGENT").unwrap_or_default();

    let store = state.two_factor();
    let record = match store.find_by_user(user_id).await? {
        Some(record) => record,
        None => return Ok(invalid_otp()),
    };

    let matches = match &record.secret_hash {
        Some(hash) => verify_password(&code, hash).await,
        None => false,
    };
    if !matches {
        tracing::info!("Invalid OTP for trainer {}", user_id);
        return Ok(invalid_otp());
    }

    let now = now();
    if otp::is_expired(record.token_timestamp, now) {
        return Ok(ApiResponse::failure("OTP expired", "OTP has expired. Please request for a new one."));
    }

    store
        .bind_device(record.id, &uuid, &user_agent, client_ip(&headers, peer).as_deref(), now)
        .await?;

    let bound = match store.find_by_user(user_id).await? {
        Some(record) => Value::Object(record.public_record()),
        None => Value::Null,
    };
    Ok(ApiResponse::success(payload.seal(&state, &bound)?))
}

fn invalid_otp() -> ApiResponse<Value> {
    ApiResponse::failure("Invalid OTP", "Invalid OTP code. Please try again.")
}
