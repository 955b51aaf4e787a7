// HTTP implementation of the repository service manager. Searches go through
// the AQL endpoint so item properties come back in the same round trip;
// property writes use the storage API. Request parallelism is capped by a
// semaphore sized from the builder's thread count.

use crate::config::AuthConfig;
use crate::error::{PublisherError, Result};
use crate::repository::{Property, RepositoryApi, ResolvedLayer};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_THREADS: usize = 3;

#[derive(Debug, Deserialize)]
struct AqlResponse {
    #[serde(default)]
    results: Vec<ResolvedLayer>,
}

pub struct RepositoryClientBuilder {
    base_url: String,
    auth: AuthConfig,
    skip_tls: bool,
    timeout: Duration,
    threads: usize,
}

impl RepositoryClientBuilder {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            auth: AuthConfig::default(),
            skip_tls: false,
            timeout: DEFAULT_TIMEOUT,
            threads: DEFAULT_THREADS,
        }
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_skip_tls(mut self, skip_tls: bool) -> Self {
        self.skip_tls = skip_tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cap on concurrent repository requests
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn build(self) -> Result<RepositoryClient> {
        let mut builder = Client::builder().timeout(self.timeout);
        if self.skip_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| PublisherError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(RepositoryClient {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            auth: self.auth,
            permits: Arc::new(Semaphore::new(self.threads)),
        })
    }
}

pub struct RepositoryClient {
    client: Client,
    base_url: String,
    auth: AuthConfig,
    permits: Arc<Semaphore>,
}

impl RepositoryClient {
    pub fn builder(base_url: String) -> RepositoryClientBuilder {
        RepositoryClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.auth.access_token {
            request.bearer_auth(token)
        } else if let (Some(user), Some(pass)) = (&self.auth.username, &self.auth.password) {
            let encoded = BASE64.encode(format!("{}:{}", user, pass));
            request.header("Authorization", format!("Basic {}", encoded))
        } else {
            request
        }
    }

    async fn run_aql(&self, query: String) -> Result<Vec<ResolvedLayer>> {
        let _permit = self.permits.acquire().await.map_err(|e| {
            PublisherError::Repository(format!("Request limiter closed: {}", e))
        })?;

        let url = format!("{}/api/search/aql", self.base_url);
        let request = self
            .authenticate(self.client.post(&url))
            .header("Content-Type", "text/plain")
            .body(query);

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.status_error("AQL search", status, response).await);
        }

        let parsed: AqlResponse = response.json().await.map_err(|e| {
            PublisherError::Parse(format!("Invalid AQL search response: {}", e))
        })?;
        Ok(parsed.results)
    }

    async fn status_error(
        &self,
        operation: &str,
        status: StatusCode,
        response: reqwest::Response,
    ) -> PublisherError {
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PublisherError::Auth(format!(
                "{} rejected with {}: {}",
                operation, status, snippet
            )),
            _ => PublisherError::Repository(format!(
                "{} failed with {}: {}",
                operation, status, snippet
            )),
        }
    }
}

#[async_trait]
impl RepositoryApi for RepositoryClient {
    async fn search_by_property(
        &self,
        repo: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<ResolvedLayer>> {
        let query = format!(
            "items.find({{\"repo\":\"{}\",\"@{}\":\"{}\"}}).include(\"repo\",\"path\",\"name\",\"property\")",
            repo, key, value
        );
        self.run_aql(query).await
    }

    async fn search_under_path(&self, repo: &str, path: &str) -> Result<Vec<ResolvedLayer>> {
        let query = format!(
            "items.find({{\"repo\":\"{}\",\"path\":\"{}\"}}).include(\"repo\",\"path\",\"name\",\"property\")",
            repo, path
        );
        self.run_aql(query).await
    }

    async fn set_properties(&self, layer: &ResolvedLayer, properties: &[Property]) -> Result<()> {
        let _permit = self.permits.acquire().await.map_err(|e| {
            PublisherError::Repository(format!("Request limiter closed: {}", e))
        })?;

        let joined = properties
            .iter()
            .map(|p| format!("{}={}", p.key, p.value))
            .collect::<Vec<_>>()
            .join(";");
        let url = format!(
            "{}/api/storage/{}/{}",
            self.base_url,
            layer.repo,
            layer.path_in_repo()
        );
        let request = self
            .authenticate(self.client.put(&url))
            .query(&[("properties", joined.as_str()), ("recursive", "0")]);

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.status_error("Property update", status, response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_normalizes_base_url() {
        let client = RepositoryClient::builder("https://repo.example.com/artifactory/".to_string())
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "https://repo.example.com/artifactory");
    }

    #[test]
    fn test_builder_thread_floor() {
        let client = RepositoryClient::builder("https://repo.example.com".to_string())
            .with_threads(0)
            .build()
            .unwrap();
        assert_eq!(client.permits.available_permits(), 1);
    }

    #[test]
    fn test_aql_response_parsing() {
        let raw = r#"{"results":[{"repo":"docker-local","path":"app/1.0","name":"manifest.json","properties":[{"key":"sha256","value":"abc"}]}],"range":{"total":1}}"#;
        let parsed: AqlResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].property("sha256"), Some("abc"));
    }

    #[test]
    fn test_aql_response_without_properties() {
        let raw = r#"{"results":[{"repo":"r","path":"p","name":"n"}]}"#;
        let parsed: AqlResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.results[0].properties.is_empty());
    }
}
