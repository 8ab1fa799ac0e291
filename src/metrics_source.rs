//! Metrics Source Adapter — queries a Prometheus-compatible instant-query
//! endpoint for the aggregate latency metric driving scaling decisions.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const QUERY_TIMEOUT: Duration = Duration::from_secs(5);
const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Envelope returned by `/api/v1/query`.
#[derive(Debug, Deserialize)]
struct PrometheusResponse {
    status: String,
    data: Option<PrometheusData>,
}

#[derive(Debug, Deserialize)]
struct PrometheusData {
    result: Vec<PrometheusResult>,
}

#[derive(Debug, Deserialize)]
struct PrometheusResult {
    /// `[timestamp, "value_as_string"]`
    value: (f64, String),
}

/// Adapter over a Prometheus-compatible instant-query HTTP API.
pub struct MetricsSource {
    client: reqwest::Client,
    base_url: String,
    query: String,
}

impl MetricsSource {
    /// Build a new adapter. `base_url` has no trailing slash requirement.
    ///
    /// # Panics
    /// Panics if the underlying `reqwest::Client` cannot be constructed,
    /// which only happens if the TLS backend fails to initialize.
    #[must_use]
    pub fn new(base_url: String, query: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()
            .expect("failed to build HTTP client for metrics source");
        Self {
            client,
            base_url,
            query,
        }
    }

    /// Issue the configured instant query. Returns `None` on any of: network
    /// failure, timeout, non-success response envelope, empty result set, or
    /// an unparseable numeric value. Absence is a first-class signal, never
    /// confused with "metric = 0".
    pub async fn query(&self) -> Option<f64> {
        let url = format!("{}/api/v1/query", self.base_url);

        let response = match self
            .client
            .get(&url)
            .query(&[("query", self.query.as_str())])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("metrics query transport error: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("metrics query returned status {}", response.status());
            return None;
        }

        let body: PrometheusResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("metrics query response did not parse: {e}");
                return None;
            }
        };

        if body.status != "success" {
            warn!("metrics query envelope status was {:?}", body.status);
            return None;
        }

        let Some(data) = body.data else {
            warn!("metrics query envelope had no data field");
            return None;
        };

        let Some(first) = data.result.first() else {
            debug!("metrics query returned an empty result set");
            return None;
        };

        match first.value.1.parse::<f64>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("metrics query value {:?} did not parse: {e}", first.value.1);
                None
            }
        }
    }

    /// Readiness probe against `/-/healthy`. Used only during startup.
    pub async fn is_ready(&self) -> bool {
        let url = format!("{}/-/healthy", self.base_url);
        match tokio::time::timeout(READY_TIMEOUT, self.client.get(&url).send()).await {
            Ok(Ok(resp)) => resp.status().is_success(),
            Ok(Err(e)) => {
                debug!("readiness probe transport error: {e}");
                false
            }
            Err(_) => {
                debug!("readiness probe timed out");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn adapter_against(server: &MockServer) -> MetricsSource {
        MetricsSource::new(server.uri(), "avg(http_request_duration_seconds)".to_string())
    }

    #[tokio::test]
    async fn parses_successful_single_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": {"result": [{"metric": {}, "value": [1_700_000_000.0, "0.73"]}]}
            })))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server).await;
        assert_eq!(adapter.query().await, Some(0.73));
    }

    #[tokio::test]
    async fn empty_result_set_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": {"result": []}
            })))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server).await;
        assert_eq!(adapter.query().await, None);
    }

    #[tokio::test]
    async fn error_envelope_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "errorType": "bad_data",
                "error": "invalid query"
            })))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server).await;
        assert_eq!(adapter.query().await, None);
    }

    #[tokio::test]
    async fn non_success_http_status_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server).await;
        assert_eq!(adapter.query().await, None);
    }

    #[tokio::test]
    async fn unparseable_value_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": {"result": [{"metric": {}, "value": [1_700_000_000.0, "not-a-number"]}]}
            })))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server).await;
        assert_eq!(adapter.query().await, None);
    }

    #[tokio::test]
    async fn readiness_true_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/-/healthy"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server).await;
        assert!(adapter.is_ready().await);
    }

    #[tokio::test]
    async fn readiness_false_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/-/healthy"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server).await;
        assert!(!adapter.is_ready().await);
    }
}
