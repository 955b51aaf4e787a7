//! Runner wiring arguments to the push command

use crate::buildinfo::{BuildConfiguration, FileBuildInfoStore};
use crate::cli::args::Args;
use crate::commands::{PushCommand, PushRequest};
use crate::config::{AuthConfig, RepositoryConfig};
use crate::engine::{ContainerEngine, EngineType, NativeEngine};
use crate::error::{PublisherError, Result};
use crate::image::ImageReference;
use crate::output::OutputManager;
use crate::repository::RepositoryClient;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct Runner {
    args: Args,
    output: OutputManager,
}

impl Runner {
    pub fn new(args: Args) -> Result<Self> {
        let output = if args.quiet {
            OutputManager::new_quiet()
        } else {
            OutputManager::new(args.verbose)
        };

        Ok(Self { args, output })
    }

    pub async fn run(&self) -> Result<()> {
        let start_time = Instant::now();

        self.output.section("Docker Image Publisher");
        self.args.validate().map_err(PublisherError::Validation)?;

        let image = ImageReference::parse(&self.args.image)?;
        let repository_config =
            RepositoryConfig::parse_url(&self.args.repository_url, self.args.skip_tls)?;
        let auth = AuthConfig {
            username: self.args.username.clone(),
            password: self.args.password.clone(),
            access_token: self.args.access_token.clone(),
        };

        self.output.info(&format!("Image: {}", image));
        self.output.info(&format!(
            "Target repository: {} at {}",
            self.args.repo, repository_config.url
        ));

        // Engine plumbing: client check and registry login happen before the
        // correlation workflow starts
        let engine_type: EngineType = self.args.engine.parse()?;
        let engine = Arc::new(NativeEngine::new(engine_type, self.output.clone()));
        engine.validate_api_version().await?;
        if !self.args.skip_login {
            if let Some(registry) = image.registry() {
                engine.login(registry, &auth).await?;
            } else {
                self.output.debug("Image reference has no registry host, skipping login");
            }
        }

        let repository = RepositoryClient::builder(repository_config.url.clone())
            .with_auth(auth)
            .with_skip_tls(repository_config.skip_tls)
            .with_timeout(Duration::from_secs(self.args.timeout))
            .with_threads(self.args.threads)
            .build()?;
        let store = FileBuildInfoStore::new(FileBuildInfoStore::default_dir());

        let build = BuildConfiguration::new(
            self.args.build_name.clone(),
            self.args.build_number.clone(),
            self.args.project.clone(),
            self.args.module.clone(),
        );
        let request = PushRequest {
            collect_build_info: build.is_collect_build_info(),
            detailed_summary: self.args.detailed_summary,
            validate_by_digest: self.args.validate_by_digest,
            repo: self.args.repo.clone(),
            repository_url: repository_config.url,
            image,
            build,
        };

        let command = PushCommand::new(
            request,
            engine,
            Arc::new(repository),
            Arc::new(store),
            self.output.clone(),
        );
        let mut result = command.run().await?;

        if let Some(reader) = result.take_reader() {
            self.output.subsection("Transfer manifest");
            for record in reader.iter()? {
                println!("{}", serde_json::to_string(&record?)?);
            }
            self.output.info(&format!(
                "{} transfer records written",
                result.success_count()
            ));
        }

        self.output.success(&format!(
            "Operation completed successfully in {}",
            self.output.format_duration(start_time.elapsed())
        ));
        Ok(())
    }
}
