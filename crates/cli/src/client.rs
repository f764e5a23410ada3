//! API client for the opsloop agent

use anyhow::{Context, Result};
use opsloop_lib::decision::DecisionSummary;
use opsloop_lib::executor::ExecutionSummary;
use opsloop_lib::learning::LearningSummary;
use opsloop_lib::monitoring::MetricsSummary;
use opsloop_lib::{HealthReport, StatusReport};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

/// API client for the agent's status endpoints
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn status(&self) -> Result<StatusReport> {
        self.get("api/v1/status").await
    }

    pub async fn decisions(&self) -> Result<Vec<DecisionSummary>> {
        self.get("api/v1/decisions").await
    }

    pub async fn executions(&self) -> Result<Vec<ExecutionSummary>> {
        self.get("api/v1/executions").await
    }

    pub async fn learning(&self) -> Result<LearningSummary> {
        self.get("api/v1/learning").await
    }

    pub async fn services(&self) -> Result<HealthReport> {
        self.get("api/v1/services").await
    }

    pub async fn metrics_summary(&self, hours: u32) -> Result<MetricsSummary> {
        self.get(&format!("api/v1/metrics/summary?hours={}", hours))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsloop_lib::decision::{ActionType, Priority};
    use opsloop_lib::ServiceStatus;

    #[tokio::test]
    async fn test_decisions_are_parsed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/decisions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"action":"scale_up","priority":"HIGH","target":"compute",
                     "reasoning":"CPU usage (85.0%) exceeds threshold (80%)",
                     "timestamp":"2024-06-01T12:00:00Z"}]"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let decisions = client.decisions().await.unwrap();

        mock.assert_async().await;
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].action, ActionType::ScaleUp);
        assert_eq!(decisions[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn test_services_report() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/services")
            .with_status(503)
            .with_body("service unavailable")
            .create_async()
            .await;
        server
            .mock("GET", "/healthz")
            .with_status(200)
            .with_body(r#"{"status":"degraded","services":{}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();

        let err = client.services().await.unwrap_err();
        assert!(err.to_string().contains("503"));

        let report: HealthReport = client.get("healthz").await.unwrap();
        assert_eq!(report.status, ServiceStatus::Degraded);
    }

    #[tokio::test]
    async fn test_metrics_summary_passes_hours() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/metrics/summary")
            .match_query(mockito::Matcher::UrlEncoded("hours".into(), "6".into()))
            .with_status(200)
            .with_body(r#"{"period_hours":6,"metrics":{},"total_datapoints":0}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let summary = client.metrics_summary(6).await.unwrap();

        mock.assert_async().await;
        assert_eq!(summary.period_hours, 6);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
