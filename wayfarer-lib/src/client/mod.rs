//! AMap provider client.
//!
//! This module defines [`ProviderClient`] and [`ClientBuilder`].
//! `ProviderClient` issues single logical requests against the AMap REST
//! API: it resolves the credential, paces the network call through the
//! shared [`RateLimiter`], classifies the payload, and retries
//! rate-limited responses with exponential backoff. `ClientBuilder`
//! exposes the configuration surface.

pub(crate) mod response;

use std::time::Duration;

use log::debug;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use typed_builder::TypedBuilder;
use url::Url;

use crate::ratelimit::{RateLimitConfig, RateLimiter};
use crate::{ErrorKind, Result};

/// Base URL of the v3 API generation
pub const API_BASE_V3: &str = "https://restapi.amap.com/v3/";
/// Base URL of the v4 API generation (bicycling lives here)
pub const API_BASE_V4: &str = "https://restapi.amap.com/v4/";
/// Default number of retries for rate-limited responses, 3
pub const DEFAULT_MAX_RETRIES: u64 = 3;
/// Default timeout per request in seconds, 8
pub const DEFAULT_TIMEOUT_SECS: u64 = 8;
/// Default initial backoff between retries in milliseconds, 350
pub const DEFAULT_RETRY_WAIT_TIME_MS: u64 = 350;

// Constants currently not configurable by the user.
/// Upper bound on the configurable retry count
const MAX_RETRIES_CAP: u64 = 8;
/// Random extra backoff per retry, milliseconds
const RETRY_JITTER_MS: u64 = 120;
/// A timeout for only the connect phase of a client
const CONNECT_TIMEOUT: u64 = 10;

/// Which API generation an endpoint lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiBase {
    /// `restapi.amap.com/v3`
    V3,
    /// `restapi.amap.com/v4`
    V4,
}

/// Human message plus machine code extracted from an error payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderErrorInfo {
    /// Human-readable provider message
    pub info: String,
    /// Machine error code
    pub code: String,
}

/// How to read success and failure out of one endpoint's payload.
///
/// The v3 and v4 API generations use different envelopes, so each call
/// site passes the classifier matching its endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ResponseClassifier {
    /// Whether the 2xx payload represents success
    pub is_ok: fn(&Value) -> bool,
    /// Extract message and code from a failed payload
    pub error_info: fn(&Value) -> ProviderErrorInfo,
    /// Whether the extracted error is a rate limit (and thus retryable)
    pub is_rate_limited: fn(&ProviderErrorInfo) -> bool,
}

impl ResponseClassifier {
    /// Classifier for the v3 envelope: `status`/`info`/`infocode`
    #[must_use]
    pub fn v3() -> Self {
        Self {
            is_ok: |value| value.get("status").and_then(Value::as_str) == Some("1"),
            error_info: |value| ProviderErrorInfo {
                info: string_field(value, "info").unwrap_or_else(|| "UNKNOWN".to_string()),
                code: string_field(value, "infocode").unwrap_or_else(|| "N/A".to_string()),
            },
            is_rate_limited,
        }
    }

    /// Classifier for the v4 envelope: `errcode`/`errmsg`, with the v3
    /// fields accepted as fallbacks
    #[must_use]
    pub fn v4() -> Self {
        Self {
            is_ok: |value| {
                value.get("status").and_then(Value::as_str) == Some("1")
                    || value.get("errcode").map_or(true, |code| {
                        code.as_i64() == Some(0) || code.as_str() == Some("0")
                    })
            },
            error_info: |value| ProviderErrorInfo {
                info: string_field(value, "errmsg")
                    .or_else(|| string_field(value, "info"))
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
                code: string_field(value, "errcode")
                    .or_else(|| string_field(value, "infocode"))
                    .unwrap_or_else(|| "N/A".to_string()),
            },
            is_rate_limited,
        }
    }
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::v3()
    }
}

/// QPS overrun is the only transient provider error worth retrying
fn is_rate_limited(info: &ProviderErrorInfo) -> bool {
    info.code == "10021" || info.info == "CUQPS_HAS_EXCEEDED_THE_LIMIT"
}

/// Read a payload field as text, whether it arrived as string or number
fn string_field(value: &Value, name: &str) -> Option<String> {
    match value.get(name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Builder for [`ProviderClient`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug, Clone)]
pub struct ClientBuilder {
    /// Explicit AMap key.
    ///
    /// When unset, the key is read from `AMAP_WEB_KEY` or `AMAP_KEY` at
    /// build time; a per-call override still wins over both.
    #[builder(default, setter(strip_option, into))]
    credential: Option<SecretString>,

    /// Maximum number of retries for rate-limited responses.
    ///
    /// Clamped to 8; only rate-limit responses are retried, everything
    /// else fails on the first attempt.
    #[builder(default = DEFAULT_MAX_RETRIES)]
    max_retries: u64,

    /// Response timeout per request
    #[builder(default, setter(strip_option))]
    timeout: Option<Duration>,

    /// Initial time between retries of rate-limited requests.
    ///
    /// The wait time doubles on every retry, plus a little jitter so
    /// concurrent callers don't stampede the quota window together.
    #[builder(default, setter(strip_option))]
    retry_wait_time: Option<Duration>,

    /// Pacing for the shared provider-facing rate limiter
    #[builder(default, setter(strip_option))]
    rate_limit: Option<RateLimitConfig>,

    /// Override for the v3 base URL (tests point this at a mock server)
    #[builder(default, setter(strip_option, into))]
    base_v3: Option<String>,

    /// Override for the v4 base URL
    #[builder(default, setter(strip_option, into))]
    base_v4: Option<String>,
}

impl Default for ClientBuilder {
    #[must_use]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientBuilder {
    /// Instantiates a [`ProviderClient`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if the request client cannot be created or a
    /// base URL override does not parse.
    pub fn client(self) -> Result<ProviderClient> {
        let Self {
            credential,
            max_retries,
            timeout,
            retry_wait_time,
            rate_limit,
            base_v3,
            base_v4,
        } = self;

        let timeout = timeout.unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let reqwest_client = reqwest::ClientBuilder::new()
            .gzip(true)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
            .timeout(timeout)
            .build()
            .map_err(ErrorKind::NetworkRequest)?;

        Ok(ProviderClient {
            reqwest_client,
            limiter: RateLimiter::new(rate_limit.unwrap_or_default()),
            credential: credential.or_else(credential_from_env),
            max_retries: max_retries.min(MAX_RETRIES_CAP),
            retry_wait_time: retry_wait_time
                .unwrap_or_else(|| Duration::from_millis(DEFAULT_RETRY_WAIT_TIME_MS)),
            timeout,
            base_v3: parse_base(base_v3.as_deref().unwrap_or(API_BASE_V3))?,
            base_v4: parse_base(base_v4.as_deref().unwrap_or(API_BASE_V4))?,
        })
    }
}

fn credential_from_env() -> Option<SecretString> {
    ["AMAP_WEB_KEY", "AMAP_KEY"].iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(SecretString::new)
    })
}

/// The joins in [`ProviderClient::build_url`] rely on a trailing slash
fn parse_base(raw: &str) -> Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|_| ErrorKind::InvalidUrl(raw.to_string()))
}

/// Issues logical requests against the AMap REST API.
///
/// All requests of a process should go through one instance (clones
/// share the rate limiter), so the aggregate request rate stays within
/// the provider's quota.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    /// HTTP request client
    reqwest_client: reqwest::Client,

    /// Process-wide pacing gate shared by every request of this client
    limiter: RateLimiter,

    /// Key from the builder or the environment; per-call overrides win
    credential: Option<SecretString>,

    /// Maximum number of retries for rate-limited responses
    max_retries: u64,

    /// Initial time between retries of rate-limited requests
    retry_wait_time: Duration,

    /// Response timeout per request, reported in timeout errors
    timeout: Duration,

    base_v3: Url,
    base_v4: Url,
}

impl ProviderClient {
    /// Perform one logical GET against an endpoint and return its payload.
    ///
    /// `params` entries with a `None` value are omitted from the query
    /// string. The resolved key is appended last.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::MissingCredential`] before any network call when no
    ///   key is available.
    /// - [`ErrorKind::Overloaded`] when the rate limiter queue is full.
    /// - [`ErrorKind::Timeout`] / [`ErrorKind::NetworkRequest`] /
    ///   [`ErrorKind::RejectedStatusCode`] for transport-level failures,
    ///   none of which are retried.
    /// - [`ErrorKind::Provider`] for non-rate-limit error payloads.
    /// - [`ErrorKind::RetriesExhausted`] when every attempt was
    ///   rate-limited.
    pub async fn get_json(
        &self,
        base: ApiBase,
        endpoint: &str,
        params: &[(&str, Option<String>)],
        credential: Option<&str>,
        classifier: &ResponseClassifier,
    ) -> Result<Value> {
        let url = self.build_url(base, endpoint, params, credential)?;

        let mut attempt: u64 = 0;
        let mut wait = self.retry_wait_time;
        loop {
            let json = self.limiter.run(self.fetch_json(url.clone())).await?;
            if (classifier.is_ok)(&json) {
                return Ok(json);
            }

            let info = (classifier.error_info)(&json);
            if !(classifier.is_rate_limited)(&info) {
                return Err(ErrorKind::Provider {
                    info: info.info,
                    code: info.code,
                });
            }
            if attempt >= self.max_retries {
                return Err(ErrorKind::RetriesExhausted(self.max_retries + 1));
            }

            let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..RETRY_JITTER_MS));
            let backoff = wait + jitter;
            debug!(
                "AMap rate limited at {endpoint} (code {}), backing off {backoff:?}",
                info.code
            );
            tokio::time::sleep(backoff).await;
            wait = wait.saturating_mul(2);
            attempt += 1;
        }
    }

    /// One network attempt: the only part that holds a rate limiter slot
    async fn fetch_json(&self, url: Url) -> Result<Value> {
        let response = self.reqwest_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ErrorKind::Timeout(self.timeout)
            } else {
                ErrorKind::NetworkRequest(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ErrorKind::RejectedStatusCode(status));
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                ErrorKind::Timeout(self.timeout)
            } else {
                ErrorKind::ReadResponseBody(e)
            }
        })
    }

    fn build_url(
        &self,
        base: ApiBase,
        endpoint: &str,
        params: &[(&str, Option<String>)],
        credential: Option<&str>,
    ) -> Result<Url> {
        let key = self.resolve_credential(credential)?;
        let base_url = match base {
            ApiBase::V3 => &self.base_v3,
            ApiBase::V4 => &self.base_v4,
        };
        let mut url = base_url
            .join(endpoint)
            .map_err(|_| ErrorKind::InvalidUrl(endpoint.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                if let Some(value) = value {
                    pairs.append_pair(name, value);
                }
            }
            pairs.append_pair("key", key.expose_secret());
        }
        Ok(url)
    }

    fn resolve_credential(&self, override_key: Option<&str>) -> Result<SecretString> {
        if let Some(key) = override_key.map(str::trim).filter(|key| !key.is_empty()) {
            return Ok(SecretString::new(key.to_string()));
        }
        self.credential.clone().ok_or(ErrorKind::MissingCredential)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{ApiBase, ClientBuilder, ProviderClient, ResponseClassifier};
    use crate::ratelimit::RateLimitConfig;
    use crate::ErrorKind;

    fn rate_limited_body() -> serde_json::Value {
        serde_json::json!({
            "status": "0",
            "info": "CUQPS_HAS_EXCEEDED_THE_LIMIT",
            "infocode": "10021"
        })
    }

    async fn test_client(server: &MockServer) -> ProviderClient {
        ClientBuilder::builder()
            .credential("test-key".to_string())
            .base_v3(server.uri())
            .base_v4(server.uri())
            .retry_wait_time(Duration::from_millis(1))
            .rate_limit(RateLimitConfig::new(2, Duration::ZERO, None))
            .build()
            .client()
            .unwrap()
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode/geo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rate_limited_body()))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/geocode/geo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "1", "info": "OK"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let json = client
            .get_json(
                ApiBase::V3,
                "geocode/geo",
                &[("address", Some("somewhere".to_string()))],
                None,
                &ResponseClassifier::v3(),
            )
            .await
            .unwrap();

        assert_eq!(json["status"], "1");
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rate_limited_body()))
            .mount(&server)
            .await;

        let client = ClientBuilder::builder()
            .credential("test-key".to_string())
            .base_v3(server.uri())
            .max_retries(2u64)
            .retry_wait_time(Duration::from_millis(1))
            .rate_limit(RateLimitConfig::new(2, Duration::ZERO, None))
            .build()
            .client()
            .unwrap();

        let result = client
            .get_json(ApiBase::V3, "place/text", &[], None, &ResponseClassifier::v3())
            .await;

        assert!(matches!(result, Err(ErrorKind::RetriesExhausted(3))));
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_hard_provider_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "0",
                "info": "INVALID_USER_KEY",
                "infocode": "10001"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let result = client
            .get_json(ApiBase::V3, "place/text", &[], None, &ResponseClassifier::v3())
            .await;

        match result {
            Err(ErrorKind::Provider { info, code }) => {
                assert_eq!(info, "INVALID_USER_KEY");
                assert_eq!(code, "10001");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_2xx_is_a_hard_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let result = client
            .get_json(ApiBase::V3, "geocode/regeo", &[], None, &ResponseClassifier::v3())
            .await;

        assert!(matches!(result, Err(ErrorKind::RejectedStatusCode(code)) if code.as_u16() == 502));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_distinct() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "1"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = ClientBuilder::builder()
            .credential("test-key".to_string())
            .base_v3(server.uri())
            .timeout(Duration::from_millis(50))
            .rate_limit(RateLimitConfig::new(2, Duration::ZERO, None))
            .build()
            .client()
            .unwrap();

        let result = client
            .get_json(ApiBase::V3, "geocode/geo", &[], None, &ResponseClassifier::v3())
            .await;
        assert!(matches!(result, Err(ErrorKind::Timeout(_))));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_request() {
        let server = MockServer::start().await;
        std::env::remove_var("AMAP_WEB_KEY");
        std::env::remove_var("AMAP_KEY");

        let client = ClientBuilder::builder()
            .base_v3(server.uri())
            .build()
            .client()
            .unwrap();

        let result = client
            .get_json(ApiBase::V3, "geocode/geo", &[], None, &ResponseClassifier::v3())
            .await;
        assert!(matches!(result, Err(ErrorKind::MissingCredential)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_null_params_are_omitted_and_key_appended() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "1"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        client
            .get_json(
                ApiBase::V3,
                "place/text",
                &[
                    ("keywords", Some("hotel".to_string())),
                    ("city", None),
                    ("citylimit", Some("true".to_string())),
                ],
                Some("override-key"),
                &ResponseClassifier::v3(),
            )
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let query = requests[0].url.query().unwrap();
        assert!(query.contains("keywords=hotel"));
        assert!(query.contains("citylimit=true"));
        assert!(query.contains("key=override-key"));
        assert!(!query.contains("city="));
    }

    #[tokio::test]
    async fn test_v4_classifier_accepts_errcode_zero() {
        let classifier = ResponseClassifier::v4();
        let ok = serde_json::json!({"errcode": 0, "data": {"paths": []}});
        assert!((classifier.is_ok)(&ok));

        let err = serde_json::json!({"errcode": 20003, "errmsg": "SERVICE_ERROR"});
        assert!(!(classifier.is_ok)(&err));
        let info = (classifier.error_info)(&err);
        assert_eq!(info.code, "20003");
        assert_eq!(info.info, "SERVICE_ERROR");
    }
}
