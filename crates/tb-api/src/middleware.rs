//! Middleware for security headers, logging and path normalization.

use actix_web::middleware::{DefaultHeaders, Logger, NormalizePath};

/// Access log in the default format:
/// remote-ip "request-line" status-code response-size "referrer" "user-agent"
pub fn standard_middleware() -> Logger {
    Logger::default()
}

/// No framing by other sites, no DNS prefetching, referrer only to ourselves.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Frame-Options", "SAMEORIGIN"))
        .add(("X-DNS-Prefetch-Control", "off"))
        .add(("Referrer-Policy", "same-origin"))
        .add(("X-Content-Type-Options", "nosniff"))
}

/// `/api/threads/b/` and `/api/threads/b` reach the same handler.
pub fn normalize_path() -> NormalizePath {
    NormalizePath::trim()
}
