//! Container engine collaborator
//!
//! The push itself is delegated to the native engine binary (docker or
//! podman). This module wraps those invocations behind the [`ContainerEngine`]
//! trait so the correlation workflow can run against a fake engine in tests.

use crate::config::AuthConfig;
use crate::digest::DigestUtils;
use crate::error::{PublisherError, Result};
use crate::image::ImageReference;
use crate::output::OutputManager;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Oldest docker client API version the push workflow supports
const MIN_CLIENT_API_VERSION: (u32, u32) = (1, 31);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineType {
    Docker,
    Podman,
}

impl EngineType {
    pub fn binary(&self) -> &'static str {
        match self {
            EngineType::Docker => "docker",
            EngineType::Podman => "podman",
        }
    }
}

impl std::str::FromStr for EngineType {
    type Err = PublisherError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "docker" => Ok(EngineType::Docker),
            "podman" => Ok(EngineType::Podman),
            other => Err(PublisherError::Config(format!(
                "Unknown container engine '{}', expected docker or podman",
                other
            ))),
        }
    }
}

#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Push the image through the native engine
    async fn push(&self, image: &ImageReference) -> Result<()>;

    /// Return the image's content digest in prefixed form (sha256:...)
    async fn image_digest(&self, image: &ImageReference) -> Result<String>;

    /// Log in to the registry the image will be pushed to
    async fn login(&self, registry: &str, auth: &AuthConfig) -> Result<()>;

    /// Verify the engine client is recent enough for the push workflow
    async fn validate_api_version(&self) -> Result<()>;
}

pub struct NativeEngine {
    engine_type: EngineType,
    output: OutputManager,
}

impl NativeEngine {
    pub fn new(engine_type: EngineType, output: OutputManager) -> Self {
        Self { engine_type, output }
    }

    async fn run_command(&self, args: &[&str], stdin: Option<&str>) -> Result<String> {
        let binary = self.engine_type.binary();
        self.output.detail(&format!("Running: {} {}", binary, args.join(" ")));

        let mut command = Command::new(binary);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if stdin.is_some() {
            command.stdin(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|e| {
            PublisherError::Engine(format!("Failed to start {}: {}", binary, e))
        })?;

        if let Some(input) = stdin {
            let mut handle = child.stdin.take().ok_or_else(|| {
                PublisherError::Engine(format!("Failed to open stdin for {}", binary))
            })?;
            handle
                .write_all(input.as_bytes())
                .await
                .map_err(|e| PublisherError::Engine(format!("Failed to write stdin: {}", e)))?;
            drop(handle);
        }

        let result = child.wait_with_output().await.map_err(|e| {
            PublisherError::Engine(format!("Failed to run {}: {}", binary, e))
        })?;

        let stdout = String::from_utf8_lossy(&result.stdout).trim().to_string();
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            let detail = if stderr.is_empty() { stdout } else { stderr };
            return Err(PublisherError::Engine(format!(
                "{} {} failed: {}",
                binary,
                args.first().unwrap_or(&""),
                detail
            )));
        }
        Ok(stdout)
    }
}

#[async_trait]
impl ContainerEngine for NativeEngine {
    async fn push(&self, image: &ImageReference) -> Result<()> {
        self.output.info(&format!("Pushing {} via {}", image, self.engine_type.binary()));
        let stdout = self.run_command(&["push", image.raw()], None).await?;
        for line in stdout.lines() {
            self.output.detail(line);
        }
        Ok(())
    }

    async fn image_digest(&self, image: &ImageReference) -> Result<String> {
        let digest = self
            .run_command(&["image", "inspect", "--format", "{{.Id}}", image.raw()], None)
            .await?;
        if !DigestUtils::is_valid_prefixed_digest(&digest) {
            return Err(PublisherError::Engine(format!(
                "Engine returned an unexpected image digest: {}",
                digest
            )));
        }
        self.output.debug(&format!(
            "Resolved image digest {}",
            DigestUtils::format_digest_short(&digest)
        ));
        Ok(digest)
    }

    async fn login(&self, registry: &str, auth: &AuthConfig) -> Result<()> {
        if !auth.has_credentials() {
            self.output.debug("No registry credentials provided, skipping engine login");
            return Ok(());
        }

        // An access token acts as the password for the engine login
        let (username, secret) = match (&auth.access_token, &auth.username, &auth.password) {
            (Some(token), Some(user), _) => (user.as_str(), token.as_str()),
            (Some(token), None, _) => ("token", token.as_str()),
            (None, Some(user), Some(pass)) => (user.as_str(), pass.as_str()),
            _ => {
                return Err(PublisherError::Auth(
                    "Registry login requires a username/password pair or an access token"
                        .to_string(),
                ));
            }
        };

        self.output.verbose(&format!("Logging in to {} as {}", registry, username));
        self.run_command(
            &["login", registry, "--username", username, "--password-stdin"],
            Some(secret),
        )
        .await?;
        Ok(())
    }

    async fn validate_api_version(&self) -> Result<()> {
        // Podman has no client API version negotiation to check
        if self.engine_type != EngineType::Docker {
            return Ok(());
        }

        let version = self
            .run_command(&["version", "--format", "{{.Client.APIVersion}}"], None)
            .await?;
        let parsed = parse_api_version(&version).ok_or_else(|| {
            PublisherError::Engine(format!(
                "Could not parse docker client API version '{}'",
                version
            ))
        })?;

        if parsed < MIN_CLIENT_API_VERSION {
            return Err(PublisherError::Engine(format!(
                "Docker client API version {} is too old, {}.{} or newer is required",
                version, MIN_CLIENT_API_VERSION.0, MIN_CLIENT_API_VERSION.1
            )));
        }
        self.output.debug(&format!("Docker client API version {}", version));
        Ok(())
    }
}

fn parse_api_version(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.trim().split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}
