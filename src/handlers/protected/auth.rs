use axum::{extract::State, Extension};
use serde_json::Value;

use crate::app::AppState;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::Role;
use crate::error::ApiError;
use crate::handlers::{now, INVALID_CREDENTIALS};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, PayloadMode, SecurePayload};

/// GET /api/me
pub async fn me(State(state): State<AppState>, mode: PayloadMode, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let account = state
        .trainers()
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Trainer not found"))?;

    Ok(ApiResponse::success(mode.seal(&state.codec, &account.public_record())?))
}

/// POST /api/auth/logout
///
/// Revokes the presented token until its natural expiry.
pub async fn logout(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    state.denylist.revoke(&user.claims.jti, user.claims.exp).await;
    tracing::info!("Trainer {} logged out", user.id);
    Ok(ApiResponse::ok().with("message", "Successfully logged out"))
}

/// PATCH /api/auth/change-pass
///
/// Sealed `{trainerID, current, password}`. Only admins may change another trainer's password.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: SecurePayload,
) -> ApiResult<Value> {
    let trainer_id = payload.require_i64("trainerID")?;
    let current = payload.require_str("current")?;
    let password = payload.require_str("password")?;

    if trainer_id != user.id && user.role != Role::Admin.as_str() {
        tracing::warn!("Trainer {} tried to change the password of {}", user.id, trainer_id);
        return Err(ApiError::forbidden("Cannot change another trainer's password"));
    }

    let store = state.trainers();
    let Some(account) = store.find_by_id(trainer_id).await? else {
        return Ok(ApiResponse::ok().flag(false).with("error", "Trainer not found"));
    };

    if !verify_password(&current, &account.password_hash).await {
        return Ok(ApiResponse::failure(INVALID_CREDENTIALS, "Incorrect current password"));
    }

    store
        .update_password(trainer_id, &hash_password(&password).await?, Some((user.id, now())))
        .await?;
    tracing::info!("Password changed for trainer {}", trainer_id);

    let record = match store.find_by_id(trainer_id).await? {
        Some(account) => Value::Object(account.public_record()),
        None => Value::Null,
    };
    Ok(ApiResponse::success(payload.seal(&state, &record)?))
}
