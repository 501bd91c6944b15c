// ── Uniform call outcome ──
//
// Every remote operation resolves to an `Outcome<T>`. Expected remote
// conditions (auth rejected, 404, bad status, transport failure, body
// shape mismatch) are values, not errors that unwind through callers.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::IntoStaticStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Credential rejected by the API (HTTP 401).
    Unauthorized,
    /// No matching resource. Covers both HTTP 404 and "empty result" bodies.
    NotFound,
    /// Any other non-success status; the code is kept for diagnostics.
    RemoteError { status: u16 },
    /// DNS, connect, TLS, timeout, or body read failure.
    Transport,
    /// HTTP 200, but the body violates the operation's contract.
    MalformedResponse,
}

impl ErrorKind {
    /// Stable snake_case code (`"not_found"`, `"remote_error"`, ...).
    pub fn code(self) -> &'static str {
        self.into()
    }

    /// HTTP status carried by [`RemoteError`](Self::RemoteError).
    pub fn status(self) -> Option<u16> {
        match self {
            Self::RemoteError { status } => Some(status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }
}

/// A failed remote call: what went wrong and a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorDescriptor {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteError { status }, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, message)
    }

    /// Map a `reqwest` failure (send or body read) to [`ErrorKind::Transport`].
    pub fn transport(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            format!("request failed: {err}")
        };
        Self::new(ErrorKind::Transport, message)
    }
}

/// Result envelope returned by every [`CampingCareClient`](crate::CampingCareClient) call.
///
/// Serializes as `{"success": true, "data": ...}` or
/// `{"success": false, "error": {...}}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure(ErrorDescriptor),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorDescriptor> {
        match self {
            Self::Success(_) => None,
            Self::Failure(err) => Some(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(data) => Outcome::Success(f(data)),
            Self::Failure(err) => Outcome::Failure(err),
        }
    }

    pub fn into_result(self) -> Result<T, ErrorDescriptor> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure(err) => Err(err),
        }
    }
}

impl<T> From<Result<T, ErrorDescriptor>> for Outcome<T> {
    fn from(result: Result<T, ErrorDescriptor>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(err) => Self::Failure(err),
        }
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Outcome", 2)?;
        match self {
            Self::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            Self::Failure(err) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", err)?;
            }
        }
        state.end()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn success_serializes_with_data_only() {
        let outcome = Outcome::Success(json!({ "valid": true }));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "success": true, "data": { "valid": true } })
        );
    }

    #[test]
    fn failure_serializes_with_error_only() {
        let outcome: Outcome<()> = Outcome::Failure(ErrorDescriptor::remote(503, "busy"));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "success": false,
                "error": {
                    "kind": { "type": "remote_error", "status": 503 },
                    "message": "busy"
                }
            })
        );
    }

    #[test]
    fn kind_codes_are_snake_case() {
        assert_eq!(ErrorKind::NotFound.code(), "not_found");
        assert_eq!(ErrorKind::RemoteError { status: 500 }.code(), "remote_error");
        assert_eq!(ErrorKind::MalformedResponse.code(), "malformed_response");
    }

    #[test]
    fn result_conversion_keeps_exactly_one_side() {
        let ok: Outcome<u8> = Ok(7).into();
        assert_eq!(ok.data(), Some(&7));
        assert!(ok.error().is_none());

        let err: Outcome<u8> = Err(ErrorDescriptor::not_found("gone")).into();
        assert!(err.data().is_none());
        assert_eq!(err.error().unwrap().kind, ErrorKind::NotFound);
    }
}
