//! Push orchestration
//!
//! Drives the post-push correlation workflow: push the image through the
//! engine, then, depending on what the request asked for, collect build-info
//! and/or produce a transfer manifest. Build-info collection and the detailed
//! summary are independent gates that share a single layer resolution pass.

use crate::buildinfo::{
    BuildConfiguration, BuildInfoAssembler, BuildInfoStore, DigestResolver, LayerResolver,
    ModuleAssembler, TagResolver,
};
use crate::engine::ContainerEngine;
use crate::error::{PublisherError, Result};
use crate::image::ImageReference;
use crate::output::OutputManager;
use crate::repository::RepositoryApi;
use crate::transfer::{self, PushResult};
use std::sync::Arc;

/// Everything one push invocation needs; immutable once constructed
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub image: ImageReference,
    /// Repository key the engine pushes into
    pub repo: String,
    /// Base URL of the artifact repository, used in transfer records
    pub repository_url: String,
    pub build: BuildConfiguration,
    pub collect_build_info: bool,
    pub detailed_summary: bool,
    pub validate_by_digest: bool,
}

pub struct PushCommand {
    request: PushRequest,
    engine: Arc<dyn ContainerEngine>,
    repository: Arc<dyn RepositoryApi>,
    store: Arc<dyn BuildInfoStore>,
    output: OutputManager,
    assembler: Option<Box<dyn ModuleAssembler>>,
}

impl PushCommand {
    pub fn new(
        request: PushRequest,
        engine: Arc<dyn ContainerEngine>,
        repository: Arc<dyn RepositoryApi>,
        store: Arc<dyn BuildInfoStore>,
        output: OutputManager,
    ) -> Self {
        Self {
            request,
            engine,
            repository,
            store,
            output,
            assembler: None,
        }
    }

    /// Supply a custom assembler instead of the strategy selected from the
    /// request flags
    pub fn with_assembler(mut self, assembler: Box<dyn ModuleAssembler>) -> Self {
        self.assembler = Some(assembler);
        self
    }

    pub async fn run(mut self) -> Result<PushResult> {
        self.engine.push(&self.request.image).await?;
        self.output.success(&format!("Pushed {}", self.request.image));

        let to_collect = self.request.collect_build_info;
        let detailed_summary = self.request.detailed_summary;
        if !to_collect && !detailed_summary {
            return Ok(PushResult::empty());
        }

        // Strategy is chosen once; the same assembler serves both gates
        let mut assembler = match self.assembler.take() {
            Some(assembler) => assembler,
            None => self.select_assembler().await?,
        };
        self.output.verbose(&format!(
            "Correlating pushed layers via {} resolution",
            assembler.strategy()
        ));

        let mut resolved = false;
        if to_collect {
            self.store.save_general_details(&self.request.build).await?;
            let module = assembler
                .build(self.request.build.module_name())
                .await?
                .ok_or(PublisherError::ModuleNil)?;
            self.store.save_module(&self.request.build, &module).await?;
            resolved = true;
            self.output.info(&format!(
                "Collected build info module '{}' with {} artifacts",
                module.id,
                module.artifacts.len()
            ));
        }

        if detailed_summary {
            if !resolved {
                // Resolution runs purely for the summary here, so suppress
                // the tag strategy's property writes; layers that were
                // already tagged by a previous push must not be re-tagged
                assembler.set_skip_tagging(true);
                assembler.build("").await?;
            }
            let result = transfer::save_transfer_details(
                assembler.layers(),
                &self.request.repository_url,
            )?;
            self.output.verbose(&format!(
                "Transfer manifest written with {} records",
                result.success_count()
            ));
            return Ok(result);
        }

        Ok(PushResult::empty())
    }

    async fn select_assembler(&self) -> Result<Box<dyn ModuleAssembler>> {
        let resolver: Box<dyn LayerResolver> = if self.request.validate_by_digest {
            let digest = self.engine.image_digest(&self.request.image).await?;
            Box::new(DigestResolver::new(
                self.repository.clone(),
                self.request.repo.clone(),
                &digest,
            )?)
        } else {
            Box::new(TagResolver::new(
                self.repository.clone(),
                self.request.repo.clone(),
                self.request.image.clone(),
                self.request.build.clone(),
            ))
        };
        Ok(Box::new(BuildInfoAssembler::new(
            resolver,
            self.request.image.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildinfo::BuildInfoModule;
    use crate::repository::{Property, ResolvedLayer};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DIGEST: &str = "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    struct FakeEngine {
        fail_push: bool,
        push_calls: AtomicUsize,
        digest_calls: AtomicUsize,
    }

    impl FakeEngine {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fail_push: false,
                push_calls: AtomicUsize::new(0),
                digest_calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail_push: true,
                push_calls: AtomicUsize::new(0),
                digest_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ContainerEngine for FakeEngine {
        async fn push(&self, _image: &ImageReference) -> Result<()> {
            self.push_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_push {
                Err(PublisherError::Engine("push rejected".to_string()))
            } else {
                Ok(())
            }
        }

        async fn image_digest(&self, _image: &ImageReference) -> Result<String> {
            self.digest_calls.fetch_add(1, Ordering::SeqCst);
            Ok(DIGEST.to_string())
        }

        async fn login(&self, _registry: &str, _auth: &crate::config::AuthConfig) -> Result<()> {
            Ok(())
        }

        async fn validate_api_version(&self) -> Result<()> {
            Ok(())
        }
    }

    struct FakeRepo {
        layers: Vec<ResolvedLayer>,
        queries: AtomicUsize,
        property_writes: AtomicUsize,
    }

    impl FakeRepo {
        fn with_layers(layers: Vec<ResolvedLayer>) -> Arc<Self> {
            Arc::new(Self {
                layers,
                queries: AtomicUsize::new(0),
                property_writes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RepositoryApi for FakeRepo {
        async fn search_by_property(
            &self,
            _repo: &str,
            _key: &str,
            _value: &str,
        ) -> Result<Vec<ResolvedLayer>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.layers.clone())
        }

        async fn search_under_path(&self, _repo: &str, _path: &str) -> Result<Vec<ResolvedLayer>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.layers.clone())
        }

        async fn set_properties(
            &self,
            _layer: &ResolvedLayer,
            _properties: &[Property],
        ) -> Result<()> {
            self.property_writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeStore {
        saves: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl BuildInfoStore for FakeStore {
        async fn save_general_details(&self, _build: &BuildConfiguration) -> Result<()> {
            self.saves.lock().unwrap().push("details");
            Ok(())
        }

        async fn save_module(
            &self,
            _build: &BuildConfiguration,
            _module: &BuildInfoModule,
        ) -> Result<()> {
            self.saves.lock().unwrap().push("module");
            Ok(())
        }
    }

    /// Assembler that reports success but yields no module
    struct NilAssembler;

    #[async_trait]
    impl ModuleAssembler for NilAssembler {
        async fn build(&mut self, _module_name: &str) -> Result<Option<BuildInfoModule>> {
            Ok(None)
        }

        fn set_skip_tagging(&mut self, _skip: bool) {}

        fn layers(&self) -> &[ResolvedLayer] {
            &[]
        }

        fn strategy(&self) -> &'static str {
            "nil"
        }
    }

    fn sample_layers() -> Vec<ResolvedLayer> {
        vec![
            ResolvedLayer {
                repo: "docker-local".to_string(),
                path: "team/app/1.0".to_string(),
                name: "manifest.json".to_string(),
                properties: vec![Property::new("sha256", "abc")],
            },
            ResolvedLayer {
                repo: "docker-local".to_string(),
                path: "team/app/1.0".to_string(),
                name: "layer0.tar.gz".to_string(),
                properties: vec![],
            },
        ]
    }

    fn request(
        collect: bool,
        detailed: bool,
        by_digest: bool,
    ) -> PushRequest {
        let build = if collect {
            BuildConfiguration::new(Some("app".to_string()), Some("7".to_string()), None, None)
        } else {
            BuildConfiguration::default()
        };
        PushRequest {
            image: ImageReference::parse("my.registry.io/team/app:1.0").unwrap(),
            repo: "docker-local".to_string(),
            repository_url: "https://repo.example.com/artifactory".to_string(),
            build,
            collect_build_info: collect,
            detailed_summary: detailed,
            validate_by_digest: by_digest,
        }
    }

    fn command(
        req: PushRequest,
        engine: Arc<FakeEngine>,
        repo: Arc<FakeRepo>,
        store: Arc<FakeStore>,
    ) -> PushCommand {
        PushCommand::new(req, engine, repo, store, OutputManager::new_quiet())
    }

    #[tokio::test]
    async fn test_no_gates_is_trivial_success() {
        let engine = FakeEngine::new();
        let repo = FakeRepo::with_layers(sample_layers());
        let store = Arc::new(FakeStore::default());

        let result = command(request(false, false, false), engine.clone(), repo.clone(), store)
            .run()
            .await
            .unwrap();

        assert_eq!(result.success_count(), 0);
        assert!(result.reader().is_none());
        assert_eq!(engine.push_calls.load(Ordering::SeqCst), 1);
        // No repository work beyond the push itself
        assert_eq!(repo.queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_push_failure_aborts_immediately() {
        let engine = FakeEngine::failing();
        let repo = FakeRepo::with_layers(sample_layers());
        let store = Arc::new(FakeStore::default());

        let err = command(request(true, true, false), engine, repo.clone(), store.clone())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, PublisherError::Engine(_)));
        assert_eq!(repo.queries.load(Ordering::SeqCst), 0);
        assert!(store.saves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_both_gates_share_one_resolution_pass() {
        let engine = FakeEngine::new();
        let repo = FakeRepo::with_layers(sample_layers());
        let store = Arc::new(FakeStore::default());

        let result = command(request(true, true, false), engine, repo.clone(), store.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(repo.queries.load(Ordering::SeqCst), 1);
        assert_eq!(result.success_count(), 2);
        assert_eq!(*store.saves.lock().unwrap(), vec!["details", "module"]);
    }

    #[tokio::test]
    async fn test_collect_only_returns_empty_result() {
        let engine = FakeEngine::new();
        let repo = FakeRepo::with_layers(sample_layers());
        let store = Arc::new(FakeStore::default());

        let result = command(request(true, false, false), engine, repo.clone(), store.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(result.success_count(), 0);
        assert!(result.reader().is_none());
        assert_eq!(*store.saves.lock().unwrap(), vec!["details", "module"]);
        // Collection tags the layers with the build coordinates
        assert_eq!(repo.property_writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_summary_only_skips_tagging() {
        let engine = FakeEngine::new();
        let repo = FakeRepo::with_layers(sample_layers());
        let store = Arc::new(FakeStore::default());

        // Build coordinates are present, but collection is off; only the
        // skip-tagging instruction keeps the resolver from re-tagging
        let mut req = request(false, true, false);
        req.build =
            BuildConfiguration::new(Some("app".to_string()), Some("7".to_string()), None, None);

        let result = command(req, engine, repo.clone(), store.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(result.success_count(), 2);
        assert_eq!(repo.property_writes.load(Ordering::SeqCst), 0);
        assert!(store.saves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_digest_strategy_queries_engine_for_digest() {
        let engine = FakeEngine::new();
        let repo = FakeRepo::with_layers(sample_layers());
        let store = Arc::new(FakeStore::default());

        let result = command(request(false, true, true), engine.clone(), repo.clone(), store)
            .run()
            .await
            .unwrap();

        assert_eq!(engine.digest_calls.load(Ordering::SeqCst), 1);
        assert_eq!(repo.queries.load(Ordering::SeqCst), 1);
        assert_eq!(result.success_count(), 2);
        // Digest resolution has no tagging side effect in any gate combination
        assert_eq!(repo.property_writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tag_strategy_never_queries_engine_for_digest() {
        let engine = FakeEngine::new();
        let repo = FakeRepo::with_layers(sample_layers());
        let store = Arc::new(FakeStore::default());

        command(request(true, false, false), engine.clone(), repo, store)
            .run()
            .await
            .unwrap();

        assert_eq!(engine.digest_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_nil_module_is_a_distinct_failure() {
        let engine = FakeEngine::new();
        let repo = FakeRepo::with_layers(sample_layers());
        let store = Arc::new(FakeStore::default());

        let err = command(request(true, false, false), engine, repo, store.clone())
            .with_assembler(Box::new(NilAssembler))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, PublisherError::ModuleNil));
        // General details land before assembly; the module save never runs
        assert_eq!(*store.saves.lock().unwrap(), vec!["details"]);
    }

    #[tokio::test]
    async fn test_transfer_details_content() {
        let engine = FakeEngine::new();
        let repo = FakeRepo::with_layers(sample_layers());
        let store = Arc::new(FakeStore::default());

        let result = command(request(false, true, false), engine, repo, store)
            .run()
            .await
            .unwrap();

        let details: Vec<_> = result
            .reader()
            .unwrap()
            .iter()
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(
            details[0].target_path,
            "docker-local/team/app/1.0/manifest.json"
        );
        assert_eq!(
            details[0].repository_url,
            "https://repo.example.com/artifactory"
        );
        assert_eq!(details[0].sha256, "abc");
        assert_eq!(details[1].sha256, "");
    }
}
