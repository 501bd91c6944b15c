//! CLI error types with miette diagnostics.
//!
//! Maps core, config and reply errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use campcare_config::ConfigError;
use campcare_core::{CoreError, ErrorDescriptor, ErrorKind, ReplyError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Camping.care API: {message}")]
    #[diagnostic(
        code(campcare::connection_failed),
        help(
            "Check network access and the instance's base URL.\n\
             Try: campcare instances probe"
        )
    )]
    ConnectionFailed { message: String },

    #[error("Request timed out: {message}")]
    #[diagnostic(
        code(campcare::timeout),
        help("Increase timeout with --timeout or check API responsiveness.")
    )]
    Timeout { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed for '{name}'")]
    #[diagnostic(
        code(campcare::auth_failed),
        help(
            "The API key was rejected: {message}\n\
             Update it with: campcare instances update {name} --api-key <KEY>"
        )
    )]
    AuthFailed { name: String, message: String },

    #[error("No API key configured for instance '{entry}'")]
    #[diagnostic(
        code(campcare::no_credentials),
        help(
            "Set api_key_env or api_key for the entry, or store the key with\n\
             campcare instances update {entry} --api-key <KEY> --keyring"
        )
    )]
    NoCredentials { entry: String },

    // ── Instances ────────────────────────────────────────────────────
    #[error("No instance is configured")]
    #[diagnostic(
        code(campcare::no_instance),
        help("Add one with: campcare instances add --name <NAME> --api-key <KEY>")
    )]
    NoInstance,

    #[error("Instance '{identifier}' not found")]
    #[diagnostic(
        code(campcare::unknown_instance),
        help("Run: campcare instances list")
    )]
    UnknownInstance { identifier: String },

    #[error("{count} instances are configured; pick one with --instance")]
    #[diagnostic(
        code(campcare::ambiguous_instance),
        help("Run: campcare instances list")
    )]
    AmbiguousInstance { count: usize },

    #[error("'{name}' is already configured")]
    #[diagnostic(
        code(campcare::conflict),
        help("Display names must be unique. Choose another --name.")
    )]
    Conflict { name: String },

    // ── Lookups ──────────────────────────────────────────────────────
    #[error("Not found: {message}")]
    #[diagnostic(code(campcare::not_found))]
    NotFound { message: String },

    #[error("API error ({code}): {message}")]
    #[diagnostic(code(campcare::api_error))]
    ApiError { code: String, message: String },

    #[error("Lookup failed; no event was emitted for {operation}")]
    #[diagnostic(
        code(campcare::no_event),
        help("The failure reason is logged above. Rerun without --notify for the error reply.")
    )]
    NoEvent { operation: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(campcare::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(campcare::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(campcare::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NoInstance | Self::UnknownInstance { .. } | Self::NotFound { .. } => {
                exit_code::NOT_FOUND
            }
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::AmbiguousInstance { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Classify a remote failure by kind.
    fn from_descriptor(name: Option<&str>, err: ErrorDescriptor) -> Self {
        match err.kind {
            ErrorKind::Unauthorized => Self::AuthFailed {
                name: name.unwrap_or("current").to_owned(),
                message: err.message,
            },
            ErrorKind::NotFound => Self::NotFound {
                message: err.message,
            },
            ErrorKind::Transport if err.message.contains("timed out") => Self::Timeout {
                message: err.message,
            },
            ErrorKind::Transport => Self::ConnectionFailed {
                message: err.message,
            },
            kind @ (ErrorKind::RemoteError { .. } | ErrorKind::MalformedResponse) => {
                Self::ApiError {
                    code: kind.code().to_owned(),
                    message: err.message,
                }
            }
        }
    }

    /// Map a failed dispatcher reply by its code.
    pub fn from_reply(err: ReplyError) -> Self {
        let ReplyError { code, message } = err;
        match code.as_str() {
            "unauthorized" => Self::AuthFailed {
                name: "current".into(),
                message,
            },
            "not_found" | "unknown_instance" => Self::NotFound { message },
            "transport" if message.contains("timed out") => Self::Timeout { message },
            "transport" => Self::ConnectionFailed { message },
            "missing_field" | "invalid_format" | "unknown_command" | "ambiguous_instance" => {
                Self::Validation {
                    field: code,
                    reason: message,
                }
            }
            _ => Self::ApiError { code, message },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AlreadyConfigured { name } => Self::Conflict { name },
            CoreError::AlreadyRegistered { id } => Self::Conflict { name: id },
            CoreError::Validation { field, reason } => Self::Validation { field, reason },
            CoreError::MissingField { field } => Self::Validation {
                field,
                reason: "is required".into(),
            },
            CoreError::UnknownCommand { name } => Self::Validation {
                field: "command".into(),
                reason: format!("unknown command '{name}'"),
            },
            CoreError::Client(e) => Self::ApiError {
                code: "client".into(),
                message: e.to_string(),
            },
            CoreError::AuthenticationFailed { name, message } => Self::AuthFailed { name, message },
            CoreError::SetupFailed { name, reason } => Self::from_descriptor(Some(&name), reason),
            CoreError::UnknownInstance { id } => Self::UnknownInstance { identifier: id },
            CoreError::NoInstance => Self::NoInstance,
            CoreError::AmbiguousInstance { count } => Self::AmbiguousInstance { count },
            CoreError::Lookup(desc) => Self::from_descriptor(None, desc),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { entry } => Self::NoCredentials { entry },
            ConfigError::UnknownEntry { id } => Self::UnknownInstance { identifier: id },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}
