use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, RawQuery, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::lockout::{self, LockState};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AuthError, Role};
use crate::database::models::trainer::{TrainerAccount, TRAINERS_TABLE};
use crate::database::models::AppSettings;
use crate::database::{Repository, UpsertPlan};
use crate::error::ApiError;
use crate::filter::RequestParams;
use crate::handlers::{client_ip, now, INVALID_CREDENTIALS};
use crate::middleware::auth::extract_jwt_from_headers;
use crate::middleware::{ApiResponse, ApiResult, PayloadMode, SecurePayload};

/// POST /api/auth/login
///
/// Body `{email, password}`, sealed or plain. Refusals are HTTP 200 with `status: false`.
/// Success: `{status: true, data: <trainer, sealed>, auth_token}`.
pub async fn login(
    State(state): State<AppState>,
    mode: PayloadMode,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Json(body): Json<Value>,
) -> ApiResult<Value> {
    let credentials = SecurePayload { mode, data: mode.open_either(&state.codec, &body)? };
    let email = credentials.require_str("email")?;
    let password = credentials.require_str("password")?;

    let settings = AppSettings::load(state.pool()).await?;
    let store = state.trainers();

    let Some(mut account) = store.find_by_email(&email).await? else {
        tracing::info!("Login for unknown email");
        return Ok(ApiResponse::failure(INVALID_CREDENTIALS, "User not found."));
    };

    let now = now();
    match lockout::lock_state(account.is_locked, account.locked_time, now, &settings) {
        LockState::Locked { remaining_minutes } => {
            return Ok(ApiResponse::failure(INVALID_CREDENTIALS, lockout::locked_message(remaining_minutes)));
        }
        LockState::Expired => {
            store.clear_lock(account.id).await?;
            account.is_locked = false;
            account.invalid_count = 0;
            account.locked_time = None;
        }
        LockState::Open => {}
    }

    if !password_accepted(&state, &settings, &password, &account).await {
        let attempt = lockout::register_failure(account.invalid_count, &settings);
        store
            .record_failed_attempt(account.id, attempt.invalid_count, attempt.locks.then_some(now))
            .await?;

        let message = if attempt.locks {
            tracing::warn!("Trainer {} locked after {} failed attempts", account.id, attempt.invalid_count);
            lockout::lockout_message(&settings)
        } else {
            lockout::remaining_attempts_message(attempt.remaining)
        };
        return Ok(ApiResponse::failure(INVALID_CREDENTIALS, message));
    }

    if !account.status {
        return Ok(ApiResponse::failure(
            INVALID_CREDENTIALS,
            "Account is deactivated. Please contact your manager.",
        ));
    }

    let ip = client_ip(&headers, peer);
    store.record_login(account.id, now, ip.as_deref()).await?;

    let role = Role::from_flags(&account.roles);
    let token = state.jwt.issue(account.id, &account.email, role)?;
    tracing::info!("Trainer {} logged in as {}", account.id, role.as_str());

    let data = mode.seal(&state.codec, &account.session_record(role.as_str()))?;
    Ok(ApiResponse::success(data).with("auth_token", token))
}

/// The trainer's own password, or the master password when the bypass is enabled
async fn password_accepted(state: &AppState, settings: &AppSettings, password: &str, account: &TrainerAccount) -> bool {
    if verify_password(password, &account.password_hash).await {
        return true;
    }
    match (&settings.hash_master, state.config.security.auth_bypass) {
        (Some(master), true) => {
            let accepted = verify_password(password, master).await;
            if accepted {
                tracing::warn!("Master password used for trainer {}", account.id);
            }
            accepted
        }
        _ => false,
    }
}

/// POST /api/auth/register
///
/// Sealed trainer record. `confirmPassword` and `ID` are dropped, the password hashed,
/// columns the table does not have are ignored.
pub async fn register(State(state): State<AppState>, payload: SecurePayload) -> ApiResult<Value> {
    let password = payload.require_str("password")?;

    let mut record = payload.data.clone();
    record.remove("confirmPassword");
    record.remove("ID");
    record.remove("unique_by");
    record.insert("password".to_string(), Value::String(hash_password(&password).await?));

    let columns = state.schema.column_listing(TRAINERS_TABLE).await?;
    let primary_key = state.schema.primary_key(TRAINERS_TABLE).await?;
    let plan = UpsertPlan::prepare(TRAINERS_TABLE, record, &columns, primary_key)?;
    let outcome = Repository::new(TRAINERS_TABLE, state.pool().clone()).upsert(&plan).await?;

    let record = match outcome.record {
        Some(row) => Value::Object(TrainerAccount::from_record(row)?.public_record()),
        None => Value::Null,
    };
    Ok(ApiResponse::success(payload.seal(&state, &record)?))
}

/// POST /api/auth/refresh
///
/// Exchanges a valid bearer token for a new one; the old token is revoked.
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Value> {
    let token = extract_jwt_from_headers(&headers)?;
    let claims = state.jwt.verify(token)?;
    if state.denylist.is_revoked(&claims.jti).await {
        return Err(AuthError::Revoked.into());
    }

    let renewed = claims.renewed(state.jwt.expiry_hours);
    let token = state.jwt.sign(&renewed)?;
    state.denylist.revoke(&claims.jti, claims.exp).await;

    Ok(ApiResponse::ok()
        .with("auth_token", token)
        .with("token_type", "bearer")
        .with("expires_in", json!(state.jwt.expiry_hours * 3600)))
}

/// POST /api/auth/reset
///
/// Sealed `{trainerID, email, password}`; both id and email must match.
pub async fn reset(State(state): State<AppState>, payload: SecurePayload) -> ApiResult<Value> {
    let trainer_id = payload.require_i64("trainerID")?;
    let email = payload.require_str("email")?;
    let password = payload.require_str("password")?;

    let store = state.trainers();
    if store.find_by_id_and_email(trainer_id, &email).await?.is_none() {
        return Ok(ApiResponse::ok().flag(false).with("error", "Trainer not found"));
    }

    store.update_password(trainer_id, &hash_password(&password).await?, None).await?;
    tracing::info!("Password reset for trainer {}", trainer_id);

    let record = match store.find_by_id(trainer_id).await? {
        Some(account) => Value::Object(account.public_record()),
        None => Value::Null,
    };
    Ok(ApiResponse::success(payload.seal(&state, &record)?))
}

/// GET /api/auth/staging?employeeNo=
///
/// Pre-registration lookup in `trainers_staging`; refuses employees already registered.
pub async fn staging(State(state): State<AppState>, mode: PayloadMode, RawQuery(query): RawQuery) -> ApiResult<Value> {
    let params = RequestParams::from_query(query.as_deref().unwrap_or_default());
    let employee_no = params
        .str("employeeNo")
        .ok_or_else(|| ApiError::bad_request("The employeeNo field is required."))?;

    let store = state.trainers();
    let Some(staged) = store.staging_by_employee_no(&employee_no).await? else {
        return Ok(ApiResponse::failure("Invalid Info", "Employee ID not found"));
    };

    let staged_no = staged.get("employeeNo").cloned().unwrap_or(Value::Null);
    let staged_email = staged.get("email").cloned().unwrap_or(Value::Null);
    if store.is_registered(&staged_no, &staged_email).await? {
        return Ok(ApiResponse::failure("Invalid Info", "User already exists"));
    }

    Ok(ApiResponse::success(mode.seal(&state.codec, &staged)?))
}
