use crate::error::{AppError, AppResult};

const DEFAULT_PROFILE: &str = "default";

/// Normalizes a profile name; it becomes a file name, so path separators are rejected.
pub fn resolve_profile(requested: &str) -> AppResult<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_PROFILE.to_string());
    }

    let valid = trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        && !trimmed.starts_with('.');
    if !valid {
        return Err(AppError::InvalidInput(format!(
            "invalid profile name {trimmed:?}; use letters, digits, '-', '_' or '.'"
        )));
    }

    Ok(trimmed.to_string())
}
