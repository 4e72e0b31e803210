//! Password hashing and strength rules.
//!
//! bcrypt is CPU-bound, so hashing and verification run on tokio's blocking
//! pool instead of stalling a runtime worker.

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Rejects passwords shorter than eight characters or made only of digits or
/// only of letters.
pub fn check_password_strength(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    let all_digits = password.chars().all(|c| c.is_numeric());
    let all_letters = password.chars().all(|c| c.is_alphabetic());
    if all_digits || all_letters {
        return Err(AppError::bad_request(
            "Password must contain both letters and digits",
        ));
    }
    Ok(())
}

pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
        .map_err(AppError::from)
}

/// Returns `Ok(false)` for a wrong password. A malformed stored hash is an error.
pub async fn verify_password(password: &str, hashed: &str) -> AppResult<bool> {
    let password = password.to_owned();
    let hashed = hashed.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
        .map_err(AppError::from)
}
