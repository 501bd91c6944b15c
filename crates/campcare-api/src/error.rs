use thiserror::Error;

/// Errors raised while *building* a client or a request.
///
/// Remote failures (bad status, transport, malformed bodies) are never
/// reported through this type: every API call resolves to an
/// [`Outcome`](crate::Outcome) instead. `campcare-core` maps these into
/// setup diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The URL parsed, but cannot serve as an API root.
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// API key is empty or not representable as a header value.
    #[error("Invalid API key: {message}")]
    InvalidCredential { message: String },

    /// A lookup query failed local validation.
    #[error("Invalid {field}: {reason}")]
    InvalidQuery { field: &'static str, reason: String },

    // ── Transport setup ─────────────────────────────────────────────
    /// TLS configuration error (unreadable or invalid CA certificate).
    #[error("TLS error: {0}")]
    Tls(String),

    /// `reqwest` refused the client configuration.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

