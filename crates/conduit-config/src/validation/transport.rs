//! Socket and batch transport validation.

use super::helpers::{validate_range, validate_scheme};
use crate::schema::ConduitConfig;

pub(super) fn validate_socket(errors: &mut Vec<String>, config: &ConduitConfig) {
    validate_scheme(errors, "socket.url", &config.socket.url, &["ws", "wss"]);
    validate_range(
        errors,
        "socket.connect_timeout_secs",
        config.socket.connect_timeout_secs,
        1,
        300,
    );
}

pub(super) fn validate_batch(errors: &mut Vec<String>, config: &ConduitConfig) {
    let batch = &config.batch;
    validate_scheme(errors, "batch.url", &batch.url, &["http", "https"]);
    validate_range(errors, "batch.debounce_ms", batch.debounce_ms, 0, 10_000);
    if batch.poll_interval_ms != 0 {
        validate_range(
            errors,
            "batch.poll_interval_ms",
            batch.poll_interval_ms,
            50,
            600_000,
        );
    }
    validate_range(
        errors,
        "batch.request_timeout_secs",
        batch.request_timeout_secs,
        1,
        300,
    );
    if batch.session_param.trim().is_empty() {
        errors.push("batch.session_param must not be empty".into());
    }
}
