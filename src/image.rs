//! Container image reference parsing
//!
//! A pushed image is identified by `[registry/]name[:tag]`. The name (without
//! the registry host) doubles as the artifact path inside the target
//! repository, so tag-based correlation looks under `<name>/<tag>/`.

use crate::error::{PublisherError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    raw: String,
    registry: Option<String>,
    name: String,
    tag: String,
}

impl ImageReference {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PublisherError::Validation(
                "Image reference cannot be empty".to_string(),
            ));
        }
        if raw.contains('@') {
            return Err(PublisherError::Validation(format!(
                "Image reference for push must use a tag, not a digest: {}",
                raw
            )));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(PublisherError::Validation(format!(
                "Image reference contains whitespace: {}",
                raw
            )));
        }

        // The first path segment is a registry host if it looks like one
        let (registry, remainder) = match raw.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (Some(first.to_string()), rest)
            }
            _ => (None, raw),
        };

        let (name, tag) = match remainder.rsplit_once(':') {
            // A colon before the last '/' belongs to a registry port, not a tag
            Some((name, tag)) if !tag.contains('/') => (name, tag),
            _ => (remainder, "latest"),
        };

        if name.is_empty() {
            return Err(PublisherError::Validation(format!(
                "Image reference has no name: {}",
                raw
            )));
        }

        Ok(ImageReference {
            raw: raw.to_string(),
            registry,
            name: name.to_string(),
            tag: tag.to_string(),
        })
    }

    /// The full reference as given on the command line
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    /// Image name without the registry host and tag
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Default build-info module id for this image
    pub fn name_with_tag(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }

    /// Path under the target repository where the engine stores this image
    pub fn path_in_repo(&self) -> String {
        format!("{}/{}", self.name, self.tag)
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
