//! Validation for the backend and chat sections.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::PocketConfig;

use super::helpers::{validate_range, validate_range_f64};

static BASE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/:]+(:\d+)?(/\S*)?$").unwrap());

/// Validate backend address and timeouts.
pub(crate) fn validate_backend(errors: &mut Vec<String>, config: &PocketConfig) {
    let url = &config.backend.base_url;
    if !BASE_URL_RE.is_match(url) {
        errors.push(format!(
            "backend.base_url = {url:?} must be an http:// or https:// URL"
        ));
    }
    validate_range(
        errors,
        "backend.connect_timeout_secs",
        config.backend.connect_timeout_secs,
        1,
        120,
    );
    validate_range(
        errors,
        "backend.request_timeout_secs",
        config.backend.request_timeout_secs,
        1,
        600,
    );
}

/// Validate chat defaults.
pub(crate) fn validate_chat(errors: &mut Vec<String>, config: &PocketConfig) {
    validate_range_f64(
        errors,
        "chat.temperature",
        config.chat.temperature,
        0.0,
        2.0,
    );
    validate_range(
        errors,
        "chat.title_prefix_chars",
        config.chat.title_prefix_chars,
        1,
        200,
    );
}
