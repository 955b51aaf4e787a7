//! Command-line argument parsing

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "docker-image-publisher")]
#[command(about = "Push a container image and correlate the pushed layers with an artifact repository")]
#[command(version, author)]
pub struct Args {
    /// Image reference to push
    #[arg(
        long = "image",
        short = 'i',
        help = "Image reference to push (registry/name:tag)"
    )]
    pub image: String,

    /// Target repository key
    #[arg(
        long = "repo",
        short = 'r',
        help = "Key of the repository the image is pushed into"
    )]
    pub repo: String,

    /// Artifact repository base URL
    #[arg(
        long = "url",
        help = "Base URL of the artifact repository API"
    )]
    pub repository_url: String,

    /// Repository username
    #[arg(
        long = "username",
        short = 'u',
        help = "Username for repository and registry authentication"
    )]
    pub username: Option<String>,

    /// Repository password
    #[arg(
        long = "password",
        short = 'p',
        help = "Password for repository and registry authentication"
    )]
    pub password: Option<String>,

    /// Access token, used instead of a password when provided
    #[arg(
        long = "access-token",
        help = "Access token for repository and registry authentication"
    )]
    pub access_token: Option<String>,

    /// Build name for build-info collection
    #[arg(
        long = "build-name",
        help = "Build name to collect build info under"
    )]
    pub build_name: Option<String>,

    /// Build number for build-info collection
    #[arg(
        long = "build-number",
        help = "Build number to collect build info under"
    )]
    pub build_number: Option<String>,

    /// Project key the build belongs to
    #[arg(
        long = "project",
        help = "Project key the build belongs to"
    )]
    pub project: Option<String>,

    /// Module name inside the build info
    #[arg(
        long = "module",
        help = "Module name inside the build info (defaults to name:tag)"
    )]
    pub module: Option<String>,

    /// Produce a transfer manifest for the pushed layers
    #[arg(
        long = "detailed-summary",
        help = "Print a machine-readable manifest of the pushed layers"
    )]
    pub detailed_summary: bool,

    /// Correlate layers by content digest instead of tag
    #[arg(
        long = "validate-by-digest",
        help = "Resolve pushed layers by the image content digest instead of the tag path"
    )]
    pub validate_by_digest: bool,

    /// Container engine to push with
    #[arg(
        long = "engine",
        default_value = "docker",
        help = "Container engine binary: docker or podman"
    )]
    pub engine: String,

    /// Number of concurrent repository requests
    #[arg(
        long = "threads",
        short = 'j',
        default_value = "3",
        help = "Number of concurrent repository requests"
    )]
    pub threads: usize,

    /// Skip the engine registry login step
    #[arg(
        long = "skip-login",
        help = "Assume the engine is already logged in to the registry"
    )]
    pub skip_login: bool,

    /// Skip TLS verification
    #[arg(
        long = "skip-tls",
        short = 'k',
        help = "Skip TLS certificate verification for the repository API"
    )]
    pub skip_tls: bool,

    /// Timeout in seconds for repository requests
    #[arg(
        long = "timeout",
        short = 't',
        default_value = "300",
        help = "Timeout for repository requests in seconds"
    )]
    pub timeout: u64,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(long = "quiet", short = 'q', help = "Suppress non-error output")]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        if !self.repository_url.starts_with("http://")
            && !self.repository_url.starts_with("https://")
        {
            return Err("Repository URL must start with http:// or https://".to_string());
        }

        // Build coordinates come as a pair
        match (&self.build_name, &self.build_number) {
            (Some(_), None) => {
                return Err("--build-number is required when --build-name is set".to_string());
            }
            (None, Some(_)) => {
                return Err("--build-name is required when --build-number is set".to_string());
            }
            _ => {}
        }

        if self.module.is_some() && self.build_name.is_none() {
            return Err("--module cannot be used without --build-name".to_string());
        }

        if self.project.is_some() && self.build_name.is_none() {
            return Err("--project cannot be used without --build-name".to_string());
        }

        match self.engine.as_str() {
            "docker" | "podman" => {}
            _ => return Err("Engine must be one of: docker, podman".to_string()),
        }

        if self.threads == 0 {
            return Err("Threads must be greater than 0".to_string());
        }

        if self.timeout == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.verbose && self.quiet {
            return Err("--verbose and --quiet are mutually exclusive".to_string());
        }

        Ok(())
    }

    /// Load credentials and overrides from environment variables
    pub fn from_env(mut self) -> Self {
        if self.username.is_none() {
            self.username = std::env::var("PUBLISHER_USERNAME").ok();
        }

        if self.password.is_none() {
            self.password = std::env::var("PUBLISHER_PASSWORD").ok();
        }

        if self.access_token.is_none() {
            self.access_token = std::env::var("PUBLISHER_ACCESS_TOKEN").ok();
        }

        if let Ok(timeout) = std::env::var("PUBLISHER_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.timeout = t;
            }
        }

        if std::env::var("PUBLISHER_VERBOSE").is_ok() {
            self.verbose = true;
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from([
            "docker-image-publisher",
            "--image",
            "my.registry.io/team/app:1.0",
            "--repo",
            "docker-local",
            "--url",
            "https://repo.example.com/artifactory",
        ])
    }

    #[test]
    fn test_minimal_args_validate() {
        assert!(base_args().validate().is_ok());
    }

    #[test]
    fn test_build_name_requires_build_number() {
        let mut args = base_args();
        args.build_name = Some("app".to_string());
        assert!(args.validate().is_err());
        args.build_number = Some("7".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_module_requires_build_name() {
        let mut args = base_args();
        args.module = Some("web".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_engine() {
        let mut args = base_args();
        args.engine = "containerd".to_string();
        assert!(args.validate().is_err());
    }
}
