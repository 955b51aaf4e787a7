//! Layer resolution strategies and module assembly
//!
//! Two interchangeable strategies find the repository artifacts behind a
//! pushed image: [`DigestResolver`] matches on the content digest property
//! and is correct in a single query, while [`TagResolver`] looks under the
//! image's tag path and has to tolerate the repository indexing the push a
//! moment late. The orchestrator picks one strategy per invocation and keeps
//! it behind [`ModuleAssembler`] for the life of the call.

use crate::buildinfo::{Artifact, BuildConfiguration, BuildInfoModule};
use crate::digest::DigestUtils;
use crate::error::{PublisherError, Result};
use crate::image::ImageReference;
use crate::repository::{Property, RepositoryApi, ResolvedLayer};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;

pub const BUILD_NAME_PROPERTY: &str = "build.name";
pub const BUILD_NUMBER_PROPERTY: &str = "build.number";

/// Attempts made against a tag path before concluding the push is not there
const TAG_QUERY_ATTEMPTS: usize = 3;
/// Pause between attempts while the repository catches up with the registry
const TAG_QUERY_DELAY: Duration = Duration::from_secs(2);

#[async_trait]
pub trait LayerResolver: Send + Sync {
    /// Find the repository layers for the pushed image
    async fn resolve(&mut self) -> Result<Vec<ResolvedLayer>>;

    /// Suppress side-effecting tagging during resolution. Only the tag
    /// strategy has such a side effect; the default is a no-op.
    fn set_skip_tagging(&mut self, _skip: bool) {}

    fn strategy(&self) -> &'static str;
}

/// Resolves layers by content digest property. A digest uniquely identifies
/// content, so one query is authoritative and retries are pointless.
pub struct DigestResolver {
    repository: Arc<dyn RepositoryApi>,
    repo: String,
    digest_hex: String,
}

impl DigestResolver {
    pub fn new(repository: Arc<dyn RepositoryApi>, repo: String, digest: &str) -> Result<Self> {
        let digest_hex = DigestUtils::extract_hex_part(digest)?.to_string();
        Ok(Self {
            repository,
            repo,
            digest_hex,
        })
    }
}

#[async_trait]
impl LayerResolver for DigestResolver {
    async fn resolve(&mut self) -> Result<Vec<ResolvedLayer>> {
        let layers = self
            .repository
            .search_by_property(&self.repo, "sha256", &self.digest_hex)
            .await?;
        if layers.is_empty() {
            return Err(PublisherError::Resolution(format!(
                "No artifacts with digest {} found in repository {}",
                DigestUtils::format_digest_short(&self.digest_hex),
                self.repo
            )));
        }
        Ok(layers)
    }

    fn strategy(&self) -> &'static str {
        "digest"
    }
}

/// Resolves layers by the tag path the engine pushed to. Tag metadata can
/// reach the registry before the repository indexes it, so empty query
/// results are retried a bounded number of times before failing.
pub struct TagResolver {
    repository: Arc<dyn RepositoryApi>,
    repo: String,
    image: ImageReference,
    build: BuildConfiguration,
    skip_tagging: bool,
    attempts: usize,
    delay: Duration,
}

impl TagResolver {
    pub fn new(
        repository: Arc<dyn RepositoryApi>,
        repo: String,
        image: ImageReference,
        build: BuildConfiguration,
    ) -> Self {
        Self {
            repository,
            repo,
            image,
            build,
            skip_tagging: false,
            attempts: TAG_QUERY_ATTEMPTS,
            delay: TAG_QUERY_DELAY,
        }
    }

    /// Override the lag-tolerance window
    pub fn with_retry(mut self, attempts: usize, delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.delay = delay;
        self
    }

    async fn query_with_lag_tolerance(&self) -> Result<Vec<ResolvedLayer>> {
        let path = self.image.path_in_repo();
        for attempt in 1..=self.attempts {
            let layers = self
                .repository
                .search_under_path(&self.repo, &path)
                .await?;
            if !layers.is_empty() {
                return Ok(layers);
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.delay).await;
            }
        }
        Err(PublisherError::Resolution(format!(
            "No artifacts found under {}/{} after {} attempts",
            self.repo, path, self.attempts
        )))
    }

    /// Write the build coordinates onto every resolved layer
    async fn tag_layers(&self, layers: &[ResolvedLayer]) -> Result<()> {
        let Some((name, number)) = self.build.name_and_number() else {
            return Ok(());
        };
        let properties = vec![
            Property::new(BUILD_NAME_PROPERTY, name),
            Property::new(BUILD_NUMBER_PROPERTY, number),
        ];
        try_join_all(
            layers
                .iter()
                .map(|layer| self.repository.set_properties(layer, &properties)),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl LayerResolver for TagResolver {
    async fn resolve(&mut self) -> Result<Vec<ResolvedLayer>> {
        let layers = self.query_with_lag_tolerance().await?;
        if !self.skip_tagging {
            self.tag_layers(&layers).await?;
        }
        Ok(layers)
    }

    fn set_skip_tagging(&mut self, skip: bool) {
        self.skip_tagging = skip;
    }

    fn strategy(&self) -> &'static str {
        "tag"
    }
}

/// Seam between the orchestrator and module assembly
#[async_trait]
pub trait ModuleAssembler: Send {
    /// Assemble the build-info module, resolving layers on first use
    async fn build(&mut self, module_name: &str) -> Result<Option<BuildInfoModule>>;

    fn set_skip_tagging(&mut self, skip: bool);

    /// Layers cached by the last successful resolution
    fn layers(&self) -> &[ResolvedLayer];

    fn strategy(&self) -> &'static str;
}

/// Wraps one resolver and caches its layers so a second gate in the same
/// push never triggers a second repository resolution pass.
pub struct BuildInfoAssembler {
    resolver: Box<dyn LayerResolver>,
    image: ImageReference,
    layers: Vec<ResolvedLayer>,
    resolved: bool,
}

impl BuildInfoAssembler {
    pub fn new(resolver: Box<dyn LayerResolver>, image: ImageReference) -> Self {
        Self {
            resolver,
            image,
            layers: Vec::new(),
            resolved: false,
        }
    }
}

#[async_trait]
impl ModuleAssembler for BuildInfoAssembler {
    async fn build(&mut self, module_name: &str) -> Result<Option<BuildInfoModule>> {
        if !self.resolved {
            self.layers = self.resolver.resolve().await?;
            self.resolved = true;
        }
        let id = if module_name.is_empty() {
            self.image.name_with_tag()
        } else {
            module_name.to_string()
        };
        let artifacts = self.layers.iter().map(Artifact::from_layer).collect();
        Ok(Some(BuildInfoModule::new(id, artifacts)))
    }

    fn set_skip_tagging(&mut self, skip: bool) {
        self.resolver.set_skip_tagging(skip);
    }

    fn layers(&self) -> &[ResolvedLayer] {
        &self.layers
    }

    fn strategy(&self) -> &'static str {
        self.resolver.strategy()
    }
}
