use chrono::NaiveDateTime;

use crate::database::models::AppSettings;

/// Where a locked account stands at login time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Open,
    /// Still inside the lock window
    Locked { remaining_minutes: i64 },
    /// Lock window elapsed; counters must be reset before continuing
    Expired,
}

pub fn lock_state(
    is_locked: bool,
    locked_time: Option<NaiveDateTime>,
    now: NaiveDateTime,
    settings: &AppSettings,
) -> LockState {
    if !is_locked {
        return LockState::Open;
    }
    let Some(locked_time) = locked_time else {
        return LockState::Expired;
    };

    let elapsed = (now - locked_time).num_seconds() as f64 / 60.0;
    let window = settings.max_lock_duration as f64;
    if elapsed < window {
        LockState::Locked { remaining_minutes: (window - elapsed).ceil() as i64 }
    } else {
        LockState::Expired
    }
}

/// Outcome of one more wrong password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttempt {
    pub invalid_count: i64,
    pub locks: bool,
    pub remaining: i64,
}

pub fn register_failure(previous_count: i64, settings: &AppSettings) -> FailedAttempt {
    let invalid_count = previous_count + 1;
    FailedAttempt {
        invalid_count,
        locks: invalid_count >= settings.max_login_attempts,
        remaining: (settings.max_login_attempts - invalid_count).max(0),
    }
}

pub fn locked_message(remaining_minutes: i64) -> String {
    format!("Account is locked. Please try again after {} minutes.", remaining_minutes)
}

pub fn lockout_message(settings: &AppSettings) -> String {
    format!(
        "Your account has been temporarily locked due to multiple failed login attempts. \
         Please try again after {} minutes or reset your password",
        settings.max_lock_duration
    )
}

pub fn remaining_attempts_message(remaining: i64) -> String {
    format!("Incorrect password. You have {} attempt(s) remaining.", remaining)
}
