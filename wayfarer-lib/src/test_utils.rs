use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::{ClientBuilder, ProviderClient};
use crate::ratelimit::RateLimitConfig;

/// A provider client pointed at a mock server, with fast retry timing
pub(crate) fn mock_client(server: &MockServer) -> ProviderClient {
    ClientBuilder::builder()
        .credential("test-key".to_string())
        .base_v3(server.uri())
        .base_v4(server.uri())
        .retry_wait_time(Duration::from_millis(1))
        .rate_limit(RateLimitConfig::new(8, Duration::ZERO, None))
        .build()
        .client()
        .expect("mock client")
}

/// Respond to GET `endpoint` with the given JSON body
pub(crate) async fn mount_json(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Respond to GET `endpoint` with the given HTTP status and no body
pub(crate) async fn mount_status(server: &MockServer, endpoint: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
