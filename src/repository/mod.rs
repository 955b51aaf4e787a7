//! Artifact repository service manager
//!
//! Layer resolution runs against an Artifactory-style repository API. The
//! [`RepositoryApi`] trait is the seam the resolvers depend on; the HTTP
//! implementation lives in [`client`].

pub mod client;

pub use client::{RepositoryClient, RepositoryClientBuilder};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One key/value property attached to a repository item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

impl Property {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A repository item matched by a layer query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLayer {
    pub repo: String,
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ResolvedLayer {
    /// Look up a property value by key
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Full repository path of this item, skipping empty segments
    pub fn full_path(&self) -> String {
        [self.repo.as_str(), self.path.as_str(), self.name.as_str()]
            .into_iter()
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Path of this item inside its repository (without the repo key)
    pub fn path_in_repo(&self) -> String {
        if self.path.is_empty() || self.path == "." {
            self.name.clone()
        } else {
            format!("{}/{}", self.path, self.name)
        }
    }
}

/// Query surface of the artifact repository used by the layer resolvers
#[async_trait]
pub trait RepositoryApi: Send + Sync {
    /// Find items in `repo` carrying property `key` = `value`
    async fn search_by_property(
        &self,
        repo: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<ResolvedLayer>>;

    /// Find items stored directly under `path` in `repo`
    async fn search_under_path(&self, repo: &str, path: &str) -> Result<Vec<ResolvedLayer>>;

    /// Attach properties to a single repository item
    async fn set_properties(&self, layer: &ResolvedLayer, properties: &[Property]) -> Result<()>;
}
