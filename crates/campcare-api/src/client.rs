// Async HTTP client for the Camping.care REST API.
//
// Base path: https://api.camping.care/v21
// Auth: `Authorization: Bearer <api key>`
//
// Every public call performs exactly one GET and resolves to an
// `Outcome`. Nothing is retried.

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::outcome::{ErrorDescriptor, ErrorKind, Outcome};
use crate::transport::TransportConfig;
use crate::types::{LicensePlateQuery, PlateCheck, Place, Reservation, ReservationMatch};

/// Production API root used when a configuration does not name one.
pub const DEFAULT_API_URL: &str = "https://api.camping.care/v21";

const NO_RESERVATION_FOUND: &str = "no reservation found";
const BODY_PREVIEW_CHARS: usize = 200;

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Status + body of a completed exchange. The body is always read in full
/// so the connection is released before any interpretation happens.
struct RawResponse {
    status: StatusCode,
    body: String,
}

impl RawResponse {
    /// Require HTTP 200; map 401 to `Unauthorized` and everything else to
    /// `RemoteError(status)`.
    fn ensure_ok(&self) -> Result<(), ErrorDescriptor> {
        match self.status {
            StatusCode::OK => Ok(()),
            StatusCode::UNAUTHORIZED => Err(ErrorDescriptor::unauthorized(format!(
                "API key rejected: {}",
                self.remote_detail()
            ))),
            status => Err(ErrorDescriptor::remote(
                status.as_u16(),
                format!("API error (HTTP {}): {}", status.as_u16(), self.remote_detail()),
            )),
        }
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T, ErrorDescriptor> {
        serde_json::from_str(&self.body).map_err(|e| {
            let preview: String = self.body.chars().take(BODY_PREVIEW_CHARS).collect();
            ErrorDescriptor::malformed(format!("{e} (body preview: {preview:?})"))
        })
    }

    /// Best-effort reason text from an error body.
    fn remote_detail(&self) -> String {
        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&self.body) {
            if let Some(text) = err.message.or(err.error) {
                return text;
            }
        }
        let trimmed = self.body.trim();
        if trimmed.is_empty() {
            self.status.to_string()
        } else {
            trimmed.chars().take(BODY_PREVIEW_CHARS).collect()
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for one Camping.care account.
///
/// Holds the API root and a `reqwest::Client` preconfigured with the
/// bearer credential. Cheap to call concurrently; never pools idle
/// connections.
#[derive(Debug, Clone)]
pub struct CampingCareClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CampingCareClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `Authorization: Bearer <key>` as a sensitive default header
    /// on every request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let key = api_key.expose_secret().trim();
        if key.is_empty() {
            return Err(Error::InvalidCredential {
                message: "API key is empty".into(),
            });
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
            Error::InvalidCredential {
                message: format!("invalid API key header value: {e}"),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = transport.build_client(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Parse the API root and make sure endpoint segments can be appended.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let url = Url::parse(raw.trim())?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidBaseUrl {
                url: raw.into(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if url.cannot_be_a_base() {
            return Err(Error::InvalidBaseUrl {
                url: raw.into(),
                reason: "URL cannot carry a path".into(),
            });
        }

        Ok(url)
    }

    /// The API root this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append path segments to the API root. Each segment is
    /// percent-encoded, so caller-supplied ids stay a single segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Non-base URLs are rejected in `normalize_base_url`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    // ── HTTP ─────────────────────────────────────────────────────────

    async fn get(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> Result<RawResponse, ErrorDescriptor> {
        let url = self.endpoint(segments);
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| ErrorDescriptor::transport(&e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ErrorDescriptor::transport(&e))?;
        debug!(status = status.as_u16(), bytes = body.len(), "response received");

        Ok(RawResponse { status, body })
    }

    /// Log a failed call once, at a level matching its kind.
    fn report<T>(operation: &str, result: Result<T, ErrorDescriptor>) -> Outcome<T> {
        if let Err(ref err) = result {
            match err.kind {
                ErrorKind::NotFound => debug!(operation, "{err}"),
                _ => warn!(operation, kind = err.kind.code(), "{err}"),
            }
        }
        result.into()
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Version ──────────────────────────────────────────────────────

    /// `GET /version`. Used as the connectivity probe.
    pub async fn probe_version(&self) -> Outcome<String> {
        Self::report("probe_version", self.fetch_version().await)
    }

    async fn fetch_version(&self) -> Result<String, ErrorDescriptor> {
        let raw = self.get(&["version"], &[]).await?;
        raw.ensure_ok()?;

        // The endpoint answers with either a bare string or a JSON value.
        let version = match serde_json::from_str::<Value>(&raw.body) {
            Ok(Value::String(s)) => s,
            Ok(other) if !other.is_null() => other.to_string(),
            _ => raw.body.trim().to_owned(),
        };
        debug!(%version, "API version");
        Ok(version)
    }

    // ── License plates ───────────────────────────────────────────────

    /// `GET /license_plates/check_plate?plate=...`
    pub async fn check_plate(&self, plate: &str) -> Outcome<PlateCheck> {
        let result = async {
            let raw = self
                .get(
                    &["license_plates", "check_plate"],
                    &[("plate", plate.trim().to_owned())],
                )
                .await?;
            raw.ensure_ok()?;
            raw.decode::<PlateCheck>()
        }
        .await;
        Self::report("check_plate", result)
    }

    /// `GET /license_plates?license_plate=...&get_reservation=true`
    ///
    /// An empty list and HTTP 404 both resolve to `NotFound`; a body that
    /// is not a list resolves to `MalformedResponse`.
    pub async fn query_plate(&self, query: &LicensePlateQuery) -> Outcome<Vec<ReservationMatch>> {
        Self::report("query_plate", self.find_reservations(query).await)
    }

    async fn find_reservations(
        &self,
        query: &LicensePlateQuery,
    ) -> Result<Vec<ReservationMatch>, ErrorDescriptor> {
        let raw = self.get(&["license_plates"], &query.to_params()).await?;

        if raw.status == StatusCode::NOT_FOUND {
            return Err(ErrorDescriptor::not_found(NO_RESERVATION_FOUND));
        }
        raw.ensure_ok()?;

        let Value::Array(items) = raw.decode::<Value>()? else {
            return Err(ErrorDescriptor::malformed(
                "expected a list of reservation matches",
            ));
        };
        if items.is_empty() {
            return Err(ErrorDescriptor::not_found(NO_RESERVATION_FOUND));
        }

        let matches = items
            .into_iter()
            .map(serde_json::from_value::<ReservationMatch>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ErrorDescriptor::malformed(format!("invalid reservation match: {e}")))?;

        for m in &matches {
            info!(
                plate = query.plate(),
                accommodation = m.accommodation_name().unwrap_or("unknown"),
                place = m.place_name().unwrap_or("unknown"),
                "reservation found"
            );
        }
        Ok(matches)
    }

    // ── Reservations ─────────────────────────────────────────────────

    /// `GET /reservations/{id}`
    pub async fn get_reservation(&self, reservation_id: &str) -> Outcome<Reservation> {
        let result = async {
            let raw = self.get(&["reservations", reservation_id], &[]).await?;
            if raw.status == StatusCode::NOT_FOUND {
                return Err(ErrorDescriptor::not_found(format!(
                    "reservation {reservation_id} not found"
                )));
            }
            raw.ensure_ok()?;
            raw.decode::<Reservation>()
        }
        .await;
        Self::report("get_reservation", result)
    }

    // ── Places ───────────────────────────────────────────────────────

    /// `GET /places`
    pub async fn list_places(&self) -> Outcome<Vec<Place>> {
        let result = async {
            let raw = self.get(&["places"], &[]).await?;
            raw.ensure_ok()?;
            raw.decode::<Vec<Place>>()
        }
        .await;
        Self::report("list_places", result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> CampingCareClient {
        CampingCareClient::from_reqwest(base, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn endpoint_appends_segments_after_base_path() {
        let c = client("https://api.camping.care/v21");
        assert_eq!(
            c.endpoint(&["license_plates", "check_plate"]).as_str(),
            "https://api.camping.care/v21/license_plates/check_plate"
        );

        let c = client("https://api.camping.care/v21/");
        assert_eq!(
            c.endpoint(&["places"]).as_str(),
            "https://api.camping.care/v21/places"
        );
    }

    #[test]
    fn endpoint_keeps_ids_in_one_segment() {
        let c = client("https://api.camping.care/v21");
        assert_eq!(
            c.endpoint(&["reservations", "R/42 x"]).as_str(),
            "https://api.camping.care/v21/reservations/R%2F42%20x"
        );
    }

    #[test]
    fn rejects_non_http_roots() {
        let err = CampingCareClient::from_reqwest("mailto:ops@example.com", reqwest::Client::new());
        assert!(matches!(err, Err(Error::InvalidBaseUrl { .. })));

        let err = CampingCareClient::from_reqwest("not a url", reqwest::Client::new());
        assert!(matches!(err, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn rejects_blank_api_key() {
        let key = SecretString::from("  ".to_owned());
        let err = CampingCareClient::from_api_key(
            DEFAULT_API_URL,
            &key,
            &TransportConfig::default(),
        );
        assert!(matches!(err, Err(Error::InvalidCredential { .. })));
    }
}
