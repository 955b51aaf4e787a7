//! Build-info types
//!
//! A build-info module is a named collection of artifact references
//! correlated with one build execution. Modules are assembled from resolved
//! repository layers and persisted as partial build-info on disk until the
//! build is published.

pub mod resolver;
pub mod store;

pub use resolver::{BuildInfoAssembler, DigestResolver, LayerResolver, ModuleAssembler, TagResolver};
pub use store::{BuildInfoStore, FileBuildInfoStore};

use crate::repository::ResolvedLayer;
use serde::{Deserialize, Serialize};

/// Build coordinates attached to a push
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfiguration {
    pub build_name: Option<String>,
    pub build_number: Option<String>,
    pub project: Option<String>,
    pub module: Option<String>,
}

impl BuildConfiguration {
    pub fn new(
        build_name: Option<String>,
        build_number: Option<String>,
        project: Option<String>,
        module: Option<String>,
    ) -> Self {
        Self {
            build_name,
            build_number,
            project,
            module,
        }
    }

    /// Build-info collection is requested when both coordinates are present
    pub fn is_collect_build_info(&self) -> bool {
        self.build_name.is_some() && self.build_number.is_some()
    }

    pub fn name_and_number(&self) -> Option<(&str, &str)> {
        match (&self.build_name, &self.build_number) {
            (Some(name), Some(number)) => Some((name.as_str(), number.as_str())),
            _ => None,
        }
    }

    /// Module name to assemble under, empty when left to the default
    pub fn module_name(&self) -> &str {
        self.module.as_deref().unwrap_or("")
    }
}

/// One artifact entry inside a build-info module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub sha256: String,
    pub path: String,
}

impl Artifact {
    pub fn from_layer(layer: &ResolvedLayer) -> Self {
        Self {
            name: layer.name.clone(),
            artifact_type: "docker".to_string(),
            sha256: layer.property("sha256").unwrap_or_default().to_string(),
            path: layer.full_path(),
        }
    }
}

/// A named, ordered collection of artifacts for one build execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfoModule {
    pub id: String,
    #[serde(rename = "type")]
    pub module_type: String,
    pub artifacts: Vec<Artifact>,
}

impl BuildInfoModule {
    pub fn new(id: String, artifacts: Vec<Artifact>) -> Self {
        Self {
            id,
            module_type: "docker".to_string(),
            artifacts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Property;

    #[test]
    fn test_collect_flag_requires_both_coordinates() {
        let partial = BuildConfiguration::new(Some("app".to_string()), None, None, None);
        assert!(!partial.is_collect_build_info());

        let full = BuildConfiguration::new(
            Some("app".to_string()),
            Some("42".to_string()),
            None,
            None,
        );
        assert!(full.is_collect_build_info());
        assert_eq!(full.name_and_number(), Some(("app", "42")));
    }

    #[test]
    fn test_artifact_from_layer() {
        let layer = ResolvedLayer {
            repo: "docker-local".to_string(),
            path: "app/1.0".to_string(),
            name: "layer.tar.gz".to_string(),
            properties: vec![Property::new("sha256", "abc123")],
        };
        let artifact = Artifact::from_layer(&layer);
        assert_eq!(artifact.name, "layer.tar.gz");
        assert_eq!(artifact.sha256, "abc123");
        assert_eq!(artifact.path, "docker-local/app/1.0/layer.tar.gz");
        assert_eq!(artifact.artifact_type, "docker");
    }

    #[test]
    fn test_artifact_without_digest_property() {
        let layer = ResolvedLayer {
            repo: "r".to_string(),
            path: "p".to_string(),
            name: "n".to_string(),
            properties: vec![],
        };
        assert_eq!(Artifact::from_layer(&layer).sha256, "");
    }
}
