//! Configuration types for repository access and authentication

use crate::error::{PublisherError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub access_token: Option<String>,
}

impl AuthConfig {
    pub fn has_credentials(&self) -> bool {
        self.access_token.is_some() || (self.username.is_some() && self.password.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Base URL of the artifact repository, without a trailing slash
    pub url: String,
    pub skip_tls: bool,
}

impl RepositoryConfig {
    pub fn parse_url(raw: &str, skip_tls: bool) -> Result<Self> {
        let parsed = url::Url::parse(raw)?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(PublisherError::Config(format!(
                    "Unsupported repository URL scheme '{}', expected http or https",
                    other
                )));
            }
        }
        if parsed.host_str().is_none() {
            return Err(PublisherError::Config(format!(
                "Repository URL has no host: {}",
                raw
            )));
        }

        Ok(RepositoryConfig {
            url: raw.trim_end_matches('/').to_string(),
            skip_tls,
        })
    }
}
