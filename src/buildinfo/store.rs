//! Partial build-info persistence
//!
//! Build-info accumulates across commands before it is published, so the
//! general details and each module are written as JSON files under a
//! directory keyed by the build coordinates.

use crate::buildinfo::{BuildConfiguration, BuildInfoModule};
use crate::digest::DigestUtils;
use crate::error::{PublisherError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

#[async_trait]
pub trait BuildInfoStore: Send + Sync {
    /// Record the build coordinates and start time before any module lands
    async fn save_general_details(&self, build: &BuildConfiguration) -> Result<()>;

    /// Persist one assembled module as a partial
    async fn save_module(&self, build: &BuildConfiguration, module: &BuildInfoModule)
    -> Result<()>;
}

pub struct FileBuildInfoStore {
    base_dir: PathBuf,
}

impl FileBuildInfoStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Default location, overridable through PUBLISHER_BUILDS_DIR
    pub fn default_dir() -> PathBuf {
        std::env::var_os("PUBLISHER_BUILDS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::temp_dir()
                    .join("docker-image-publisher")
                    .join("builds")
            })
    }

    /// Per-build directory keyed by a hash of the coordinates, so build names
    /// never have to be filesystem-safe
    fn build_dir(&self, build: &BuildConfiguration) -> Result<PathBuf> {
        let (name, number) = build.name_and_number().ok_or_else(|| {
            PublisherError::Persistence(
                "Build name and number are required to persist build info".to_string(),
            )
        })?;
        let project = build.project.as_deref().unwrap_or("");
        let key = DigestUtils::compute_sha256(format!("{}_{}_{}", name, number, project).as_bytes());
        Ok(self.base_dir.join(key))
    }

    async fn write_json(&self, path: &Path, content: String) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PublisherError::Persistence(format!(
                    "Failed to create build info directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        tokio::fs::write(path, content).await.map_err(|e| {
            PublisherError::Persistence(format!("Failed to write {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl BuildInfoStore for FileBuildInfoStore {
    async fn save_general_details(&self, build: &BuildConfiguration) -> Result<()> {
        let dir = self.build_dir(build)?;
        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let details = json!({
            "name": build.build_name,
            "number": build.build_number,
            "project": build.project,
            "started": started,
        });
        self.write_json(&dir.join("details.json"), serde_json::to_string_pretty(&details)?)
            .await
    }

    async fn save_module(
        &self,
        build: &BuildConfiguration,
        module: &BuildInfoModule,
    ) -> Result<()> {
        let dir = self.build_dir(build)?.join("partials");
        let file = dir.join(format!("module-{}.json", Uuid::new_v4()));
        self.write_json(&file, serde_json::to_string_pretty(module)?)
            .await
    }
}
