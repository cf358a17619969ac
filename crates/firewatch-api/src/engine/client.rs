// Engine control HTTP client
//
// Wraps `reqwest::Client` with engine URL construction and error-body
// decoding. Endpoint groups (rules, stats, status, logs) are implemented
// as inherent methods in separate files to keep this module focused on
// transport mechanics.

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for the firewall engine's control interface.
///
/// Every call is a single request with the transport's bounded wait.
/// Nothing is retried here; a failed call surfaces immediately and the
/// caller decides what to do with it.
#[derive(Debug, Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    base_url: Url,
    transport: TransportConfig,
}

impl EngineClient {
    /// Create a new engine client from a `TransportConfig`.
    ///
    /// `base_url` is the engine root, e.g. `http://127.0.0.1:50051`. The
    /// same transport governs the log-stream handshake.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            transport: transport.clone(),
        })
    }

    /// Parse `base_url` and wrap a pre-built client (handy in tests).
    ///
    /// The log stream uses the default transport.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            transport: TransportConfig::default(),
        })
    }

    pub(crate) fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for a versioned engine path: `{base}/v1/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/v1/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&full)?)
    }

    /// Build the WebSocket URL for a versioned path, swapping the scheme
    /// (`http` → `ws`, `https` → `wss`).
    pub(crate) fn stream_url(&self, path: &str) -> Result<Url, Error> {
        let mut url = self.api_url(path)?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|()| Error::StreamConnect(format!("cannot derive stream URL from {url}")))?;
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// Send a GET request with query parameters and decode the JSON body.
    pub(crate) async fn get_with_query<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        debug!(?query, "GET {}", url);
        let resp = self.http.get(url).query(query).send().await?;
        parse_response(resp).await
    }

    /// Send a POST request with JSON body and decode the JSON body.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).json(body).send().await?;
        parse_response(resp).await
    }

    /// Send a PUT request with JSON body and decode the JSON body.
    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        debug!("PUT {}", url);
        let resp = self.http.put(url).json(body).send().await?;
        parse_response(resp).await
    }

    /// Send a DELETE request and decode the JSON body.
    pub(crate) async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("DELETE {}", url);
        let resp = self.http.delete(url).send().await?;
        parse_response(resp).await
    }
}

// ── Response decoding ────────────────────────────────────────────────

/// Error body shapes the engine is known to send.
///
/// `{ "error": { "code": "...", "message": "..." } }` or `{ "message": "..." }`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Decode a success body, or translate a non-success status into the
/// matching [`Error`] variant.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let path = resp.url().path().to_owned();
    let body = resp.text().await?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        });
    }

    let (code, message) = decode_error_body(&body);
    let message = message.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown engine error")
            .to_owned()
    });

    Err(match status.as_u16() {
        404 => Error::NotFound { path, message },
        status @ (400 | 409 | 422) => Error::Rejected { status, message },
        status => Error::Engine {
            status,
            message,
            code,
        },
    })
}

fn decode_error_body(body: &str) -> (Option<String>, Option<String>) {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(detail),
            ..
        }) => (detail.code, Some(detail.message)),
        Ok(ErrorBody { message, .. }) => (None, message),
        Err(_) => {
            let trimmed = body.trim();
            (None, (!trimmed.is_empty()).then(|| trimmed.to_owned()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> EngineClient {
        EngineClient::from_reqwest(base, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn api_url_joins_without_double_slash() {
        let c = client("http://127.0.0.1:50051/");
        assert_eq!(
            c.api_url("rules").unwrap().as_str(),
            "http://127.0.0.1:50051/v1/rules"
        );

        let c = client("http://engine.local/firewall");
        assert_eq!(
            c.api_url("/status").unwrap().as_str(),
            "http://engine.local/firewall/v1/status"
        );
    }

    #[test]
    fn stream_url_swaps_scheme() {
        assert_eq!(
            client("http://127.0.0.1:50051")
                .stream_url("logs/stream")
                .unwrap()
                .as_str(),
            "ws://127.0.0.1:50051/v1/logs/stream"
        );
        assert_eq!(
            client("https://engine.local")
                .stream_url("logs/stream")
                .unwrap()
                .scheme(),
            "wss"
        );
    }

    #[test]
    fn error_body_shapes() {
        assert_eq!(
            decode_error_body(r#"{"error":{"code":"rule.invalid","message":"name is empty"}}"#),
            (Some("rule.invalid".into()), Some("name is empty".into()))
        );
        assert_eq!(
            decode_error_body(r#"{"message":"rule 7 not found"}"#),
            (None, Some("rule 7 not found".into()))
        );
        assert_eq!(
            decode_error_body("plain text failure\n"),
            (None, Some("plain text failure".into()))
        );
        assert_eq!(decode_error_body(""), (None, None));
    }
}
