//! Minimal upstream HTTP client with safe logging, retries, and bearer auth.
//!
//! - Request options: headers, `Auth`, query params, timeout, retries
//! - Redacts sensitive query params and never logs secret values
//! - Retries network failures, 429 and 5xx with exponential backoff and `Retry-After` support
//! - Optional *raw* request/response logging via `ROYALE_HTTP_RAW=1`
//!
//! Two ways to consume a response:
//!
//! - [`HttpClient::get_json`] decodes a success body and turns any other
//!   status into [`HttpError::Api`].
//! - [`HttpClient::get_raw`] hands back status and bytes untouched so a proxy
//!   can relay them.
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), royale_http::HttpError> {
//! let client = royale_http::HttpClient::new("https://api.example.com/v1/")?;
//! let got: serde_json::Value = client
//!     .get_json("cards", royale_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: `Auth::Bearer` values are sanitized before use, and logs only
//! ever include the auth kind, not the secret.

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

pub use reqwest::StatusCode;

const RAW_ENV: &str = "ROYALE_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Copy-pasteable curl line for the request, secrets replaced.
fn curl_repro(method: &Method, url: &Url, headers: &HeaderMap, auth_kind: &str) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in headers.iter() {
        let v = val.to_str().unwrap_or("");
        parts.push(format!(
            "-H '{}: {}'",
            name.as_str(),
            v.replace('\'', r"'\''")
        ));
    }
    if auth_kind == "bearer" {
        parts.push("-H 'Authorization: Bearer <redacted>'".to_string());
    }
    let (host_path, query) = redact_query(url);
    let mut target = format!("{}://{}", url.scheme(), host_path);
    if !query.is_empty() {
        let q: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        target.push('?');
        target.push_str(&q.join("&"));
    }
    parts.push(format!("'{}'", target));
    parts.join(" ")
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("authorization") {
                val = "Bearer <redacted>".into();
            }
            (key, val)
        })
        .collect()
}

fn is_secret_param(k: &str) -> bool {
    matches!(
        k.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "token"
            | "secret"
            | "client_secret"
            | "bearer"
    )
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// Upstream status for [`HttpError::Api`], `None` for transport-level failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use royale_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// match bearer {
///     Auth::Bearer(value) => assert_eq!(value, "token"),
///     Auth::None => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    None,
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use royale_http::{Auth, RequestOpts};
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     retries: Some(1),
///     auth: Some(Auth::Bearer("demo")),
///     query: Some(vec![("limit", Cow::Borrowed("50"))]),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.headers.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

/// Upstream response kept byte-for-byte.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub request_id: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Best-effort human message for a failed response.
    pub fn error_message(&self) -> String {
        error_message_from_body(&self.body)
    }
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// Relative paths are joined onto the base, so keep a trailing slash on
    /// bases that carry a path prefix (`.../v1/`).
    ///
    /// ```no_run
    /// use royale_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/v1/")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 2);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Override the default retry budget returned by [`HttpClient::new`].
    ///
    /// ```no_run
    /// use royale_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new("https://api.example.com")?.with_retries(5);
    /// assert_eq!(client.max_retries, 5);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET JSON with per-request options; non-2xx becomes [`HttpError::Api`].
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let raw = self.execute(Method::GET, path, opts).await?;
        decode_json(raw)
    }

    /// GET and return the final upstream response whatever its status.
    ///
    /// Only transport failures (after retries) become errors.
    pub async fn get_raw(&self, path: &str, opts: RequestOpts<'_>) -> Result<RawResponse, HttpError> {
        self.execute(Method::GET, path, opts).await
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        opts: &RequestOpts<'_>,
        bearer: Option<&str>,
        timeout: Duration,
    ) -> Result<(StatusCode, HeaderMap, Bytes), reqwest::Error> {
        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .timeout(timeout);
        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }
        if let Some(tok) = bearer {
            rb = rb.bearer_auth(tok);
        }
        let resp = rb.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;
        Ok((status, headers, body))
    }

    /// Send with retries; any final status is returned, only transport
    /// failures become errors.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<RawResponse, HttpError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;
        if let Some(q) = opts.query.as_ref().filter(|q| !q.is_empty()) {
            url.query_pairs_mut()
                .extend_pairs(q.iter().map(|(k, v)| (*k, v.as_ref())));
        }
        let bearer = match &opts.auth {
            Some(Auth::Bearer(tok)) => Some(sanitize_api_key(tok)?),
            _ => None,
        };
        let auth_kind = if bearer.is_some() { "bearer" } else { "none" };
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let req_id = format!("r{:06}", REQUEST_SEQ.fetch_add(1, Ordering::Relaxed));
        let (host_path, redacted_q) = redact_query(&url);

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let can_retry = attempt <= max_retries;
            tracing::debug!(
                %req_id,
                attempt,
                max_retries,
                %method,
                %host_path,
                query = ?redacted_q,
                timeout_ms = timeout.as_millis() as u64,
                auth_kind,
                "http.request.start"
            );
            if raw_enabled() {
                let caller_headers = opts.headers.clone().unwrap_or_default();
                let curl = curl_repro(&method, &url, &caller_headers, auth_kind);
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            let started = std::time::Instant::now();
            let sent = self
                .send_once(&method, &url, &opts, bearer.as_deref(), timeout)
                .await;
            let (status, headers, body) = match sent {
                Ok(parts) => parts,
                Err(err) if can_retry => {
                    let delay = backoff(attempt);
                    tracing::warn!(
                        %req_id,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "http.retrying.network"
                    );
                    sleep(delay).await;
                    continue;
                }
                Err(err) => {
                    tracing::warn!(%req_id, attempt, error = %err, "http.network_error");
                    return Err(HttpError::Network(err.to_string()));
                }
            };
            let duration_ms = started.elapsed().as_millis() as u64;
            let upstream_id = headers
                .get("x-request-id")
                .or_else(|| headers.get("x-correlation-id"))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();

            tracing::debug!(
                %req_id,
                %status,
                duration_ms,
                body_len = body.len(),
                x_request_id = %upstream_id,
                "http.response"
            );
            if raw_enabled() {
                let truncated = body.len() > RAW_MAX_BODY;
                let shown = if truncated { body.slice(..RAW_MAX_BODY) } else { body.clone() };
                tracing::info!(
                    target: "http.raw",
                    %req_id,
                    %status,
                    duration_ms,
                    headers = ?redact_headers(&headers),
                    body = %String::from_utf8_lossy(&shown),
                    truncated
                );
            }

            if can_retry {
                if let Some(delay) = retry_delay(status, &headers, attempt) {
                    tracing::warn!(
                        %req_id,
                        %status,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        body_snippet = %snip_body(&body),
                        "http.retrying"
                    );
                    sleep(delay).await;
                    continue;
                }
            }

            if !status.is_success() {
                tracing::warn!(
                    %req_id,
                    %status,
                    message = %error_message_from_body(&body),
                    x_request_id = %upstream_id,
                    "http.error"
                );
            }

            let content_type = headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Ok(RawResponse {
                status,
                content_type,
                body,
                request_id: upstream_id,
            });
        }
    }
}

fn backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(16) as u32;
    Duration::from_millis(200u64.saturating_mul(1u64 << shift))
}

fn decode_json<T: DeserializeOwned>(raw: RawResponse) -> Result<T, HttpError> {
    if !raw.status.is_success() {
        return Err(HttpError::Api {
            status: raw.status,
            message: raw.error_message(),
            request_id: raw.request_id,
        });
    }
    serde_json::from_slice::<T>(&raw.body).map_err(|e| {
        let snippet = snip_body(&raw.body);
        tracing::warn!(
            serde_line=%e.line(),
            serde_col=%e.column(),
            serde_err=%e.to_string(),
            body_snippet=%snippet,
            "http.response.decode_error"
        );
        HttpError::Decode(e.to_string(), snippet)
    })
}

fn error_message_from_body(body: &[u8]) -> String {
    // Game API style: {"reason":"notFound","message":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        reason: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        for candidate in [m.message, m.reason, m.detail, m.error] {
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }
    snip_body(body)
}

/// Delay before retrying a throttled or failing upstream, `None` when the
/// status is final. `Retry-After` seconds win over the computed backoff.
fn retry_delay(status: StatusCode, headers: &HeaderMap, attempt: usize) -> Option<Duration> {
    let throttled = status == StatusCode::TOO_MANY_REQUESTS;
    if !throttled && !status.is_server_error() {
        return None;
    }
    Some(match retry_after_delay_secs(headers) {
        Some(secs) => Duration::from_secs(secs),
        None if throttled => backoff(attempt).max(Duration::from_millis(1100)),
        None => backoff(attempt),
    })
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .trim()
        .parse()
        .ok()
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_MAX {
        let mut cut = SNIPPET_MAX;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

/// Normalise a pasted token: outer quotes and every ASCII whitespace byte
/// are dropped, and the result must be a valid header value.
fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let token: String = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();

    if !token.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if token.bytes().any(|b| b.is_ascii_control()) {
        return Err(HttpError::Build("API key contains control characters".into()));
    }
    HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(token)
}

fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_quotes_and_whitespace() {
        assert_eq!(sanitize_api_key("  \"ab c\n\"  ").unwrap(), "abc");
        assert!(sanitize_api_key("tök").is_err());
    }

    #[test]
    fn error_message_prefers_message_then_reason() {
        let body = br#"{"reason":"notFound","message":"Player not found"}"#;
        assert_eq!(error_message_from_body(body), "Player not found");
        let body = br#"{"reason":"accessDenied"}"#;
        assert_eq!(error_message_from_body(body), "accessDenied");
        assert_eq!(error_message_from_body(b"plain text"), "plain text");
    }

    #[test]
    fn backoff_doubles_from_200ms() {
        assert_eq!(backoff(1), Duration::from_millis(200));
        assert_eq!(backoff(2), Duration::from_millis(400));
        assert_eq!(backoff(3), Duration::from_millis(800));
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let long = "é".repeat(400);
        let s = snip_body(long.as_bytes());
        assert!(s.ends_with("..."));
        assert!(s.len() <= SNIPPET_MAX + 3);
    }

    #[test]
    fn curl_redacts_secrets() {
        let url = Url::parse("https://api.example.com/v1/cards?token=s3cret&limit=50").unwrap();
        let curl = curl_repro(&Method::GET, &url, &HeaderMap::new(), "bearer");
        assert!(curl.contains("Bearer <redacted>"));
        assert!(curl.contains("token=<redacted>"));
        assert!(curl.contains("limit=50"));
        assert!(!curl.contains("s3cret"));
    }

    #[test]
    fn only_throttling_and_server_errors_retry() {
        let h = HeaderMap::new();
        assert_eq!(retry_delay(StatusCode::NOT_FOUND, &h, 1), None);
        assert_eq!(
            retry_delay(StatusCode::BAD_GATEWAY, &h, 2),
            Some(Duration::from_millis(400))
        );
        assert_eq!(
            retry_delay(StatusCode::TOO_MANY_REQUESTS, &h, 1),
            Some(Duration::from_millis(1100))
        );
        let mut h = HeaderMap::new();
        h.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(
            retry_delay(StatusCode::SERVICE_UNAVAILABLE, &h, 1),
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn retry_after_parses_seconds() {
        let mut h = HeaderMap::new();
        h.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(retry_after_delay_secs(&h), Some(3));
        h.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after_delay_secs(&h), None);
    }
}
