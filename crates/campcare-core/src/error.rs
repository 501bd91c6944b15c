// ── Core error types ──
//
// Errors surfaced by the lifecycle manager, registry, and dispatcher.
// Remote lookup failures arrive here only as `Lookup(ErrorDescriptor)`;
// everything else is a local condition detected before any request.

use campcare_api::ErrorDescriptor;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("'{name}' is already configured")]
    AlreadyConfigured { name: String },

    #[error("Instance {id} is already registered")]
    AlreadyRegistered { id: String },

    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Client configuration error: {0}")]
    Client(campcare_api::Error),

    // ── Setup ────────────────────────────────────────────────────────
    #[error("Authentication failed for '{name}': {message}")]
    AuthenticationFailed { name: String, message: String },

    #[error("Cannot set up '{name}': {reason}")]
    SetupFailed {
        name: String,
        #[source]
        reason: ErrorDescriptor,
    },

    // ── Instance resolution ──────────────────────────────────────────
    #[error("Unknown instance: {id}")]
    UnknownInstance { id: String },

    #[error("No instance is registered")]
    NoInstance,

    #[error("{count} instances are registered; an explicit instance_id is required")]
    AmbiguousInstance { count: usize },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    // ── Remote lookups ───────────────────────────────────────────────
    #[error("{0}")]
    Lookup(#[from] ErrorDescriptor),
}

impl CoreError {
    /// Stable machine-readable code used in command replies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyConfigured { .. } => "already_configured",
            Self::AlreadyRegistered { .. } => "already_registered",
            Self::Validation { .. } | Self::Client(_) => "invalid_format",
            Self::AuthenticationFailed { .. } => "unauthorized",
            Self::SetupFailed { .. } => "setup_failed",
            Self::UnknownInstance { .. } | Self::NoInstance => "unknown_instance",
            Self::AmbiguousInstance { .. } => "ambiguous_instance",
            Self::MissingField { .. } => "missing_field",
            Self::UnknownCommand { .. } => "unknown_command",
            Self::Lookup(err) => err.kind.code(),
        }
    }

    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── Conversion from client-construction errors ──────────────────────

impl From<campcare_api::Error> for CoreError {
    fn from(err: campcare_api::Error) -> Self {
        match err {
            campcare_api::Error::InvalidQuery { field, reason } => Self::Validation {
                field: field.into(),
                reason,
            },
            campcare_api::Error::InvalidUrl(e) => Self::validation("base_url", e.to_string()),
            campcare_api::Error::InvalidBaseUrl { reason, .. } => {
                Self::validation("base_url", reason)
            }
            campcare_api::Error::InvalidCredential { message } => {
                Self::validation("credential", message)
            }
            other @ (campcare_api::Error::Tls(_) | campcare_api::Error::ClientBuild(_)) => {
                Self::Client(other)
            }
        }
    }
}
