//! Test fixtures for stable error codes and envelopes.

use scanspec_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Error codes the dispatch path can report.
pub fn dispatch_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::new("spec", "blacklisted_unit"),
        ErrorCode::new("spec", "blacklisted_system_unit"),
        ErrorCode::new("resolve", "failed"),
        ErrorCode::new("dispatch", "target_kind_mismatch"),
        ErrorCode::new("dispatch", "callback_failed"),
        ErrorCode::new("dispatch", "callback_panicked"),
        ErrorCode::new("files", "content_too_large"),
        ErrorCode::new("files", "short_read"),
        ErrorCode::new("registry", "poisoned"),
    ]
}

/// A callback failure fixture.
pub fn callback_error(message: &str) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::invalid_input(), message)
}

/// A retriable I/O failure fixture.
pub fn io_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::io(), "disk went away", ErrorClass::Retriable)
}
