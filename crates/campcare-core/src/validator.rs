// ── Connection validation ──
//
// Setup-time gate: an instance becomes usable only if its version probe
// succeeds. Never run per request.

use campcare_api::{CampingCareClient, ErrorDescriptor};
use tracing::{debug, warn};

/// Probe the API and return the reported version, or the failure that
/// blocks activation.
pub async fn verify(client: &CampingCareClient) -> Result<String, ErrorDescriptor> {
    match client.probe_version().await.into_result() {
        Ok(version) => {
            debug!(%version, base_url = %client.base_url(), "connection test successful");
            Ok(version)
        }
        Err(err) => {
            warn!(
                base_url = %client.base_url(),
                kind = err.kind.code(),
                "connection test failed: {err}"
            );
            Err(err)
        }
    }
}

/// `true` only when the version probe succeeds. Any failure, including
/// transport errors, yields `false`.
pub async fn validate(client: &CampingCareClient) -> bool {
    verify(client).await.is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use campcare_api::{ErrorKind, TransportConfig};
    use secrecy::SecretString;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_answering(status: u16) -> (MockServer, CampingCareClient) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/version"))
            .respond_with(ResponseTemplate::new(status).set_body_string("21"))
            .expect(1)
            .mount(&server)
            .await;
        let key = SecretString::from("k".to_owned());
        let client =
            CampingCareClient::from_api_key(&server.uri(), &key, &TransportConfig::default())
                .unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn probe_200_validates() {
        let (_server, client) = client_answering(200).await;
        assert!(validate(&client).await);
    }

    #[tokio::test]
    async fn every_other_probe_outcome_fails() {
        for status in [201, 204, 301, 400, 401, 403, 404, 429, 500, 503] {
            let (_server, client) = client_answering(status).await;
            assert!(!validate(&client).await, "status {status} must not validate");
        }
    }

    fn client_for(base_url: &str, timeout: Duration) -> CampingCareClient {
        let key = SecretString::from("k".to_owned());
        let transport = TransportConfig {
            timeout,
            ..TransportConfig::default()
        };
        CampingCareClient::from_api_key(base_url, &key, &transport).unwrap()
    }

    #[tokio::test]
    async fn refused_connection_fails() {
        // Bind then release a port so nothing listens on it.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = client_for(&format!("http://127.0.0.1:{port}"), Duration::from_secs(2));

        assert!(!validate(&client).await);
        assert_eq!(verify(&client).await.unwrap_err().kind, ErrorKind::Transport);
    }

    #[tokio::test]
    async fn probe_slower_than_timeout_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/version"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("21")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;
        let client = client_for(&server.uri(), Duration::from_millis(200));

        assert!(!validate(&client).await);
    }

    #[tokio::test]
    async fn verify_reports_the_failure_kind() {
        let (_server, client) = client_answering(401).await;
        let err = verify(&client).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }
}
