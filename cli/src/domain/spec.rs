//! Deployment spec reader
//!
//! Reads only the fields of a deployment spec that reference container
//! images; everything else in the file is ignored.

use std::path::Path;

use serde::Deserialize;

use crate::error::SpecError;

/// Image-related view of a deployment spec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentSpec {
    /// Registry the service image is pushed to (may be empty)
    pub registry: String,
    /// Build-stack image reference (may be empty)
    pub stack_image: String,
    /// Sidecar/agent image references, `name[:tag]`
    pub agent_images: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpec {
    #[serde(default)]
    image: Option<RawImage>,
    #[serde(default)]
    agents: Option<Vec<RawAgent>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawImage {
    #[serde(default)]
    registry: Option<String>,
    #[serde(default)]
    build_spec: Option<RawBuildSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBuildSpec {
    #[serde(default)]
    stack_image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAgent {
    #[serde(default)]
    image: Option<String>,
}

impl From<RawSpec> for DeploymentSpec {
    fn from(raw: RawSpec) -> Self {
        let (registry, stack_image) = match raw.image {
            Some(image) => (
                image.registry.unwrap_or_default(),
                image
                    .build_spec
                    .and_then(|b| b.stack_image)
                    .unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };

        let agent_images = raw
            .agents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| a.image)
            .collect();

        Self {
            registry: registry.trim().to_string(),
            stack_image: stack_image.trim().to_string(),
            agent_images,
        }
    }
}

impl DeploymentSpec {
    /// Parse a spec from YAML text
    pub fn parse(content: &str, path: &Path) -> Result<Self, SpecError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        // A document holding only `~` is null, treated as an empty spec
        let raw: Option<RawSpec> =
            serde_yaml::from_str(content).map_err(|e| SpecError::Malformed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(raw.unwrap_or_default().into())
    }

    /// Load a spec from disk
    pub fn load(path: &Path) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path).map_err(|source| SpecError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }
}

/// Load every spec in order, failing on the first unreadable or malformed file
pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<DeploymentSpec>, SpecError> {
    paths.iter().map(|p| DeploymentSpec::load(p.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL_SPEC: &str = r#"
name: cart
image:
  name: cart
  registry: registry.example.com
  tag: 1.0.0
  buildSpec:
    stackImage: ghcr.io/acme/java-stack:11
    artifacts:
      - name: cart
        source: target/cart.war
agents:
  - name: log-shipper
    image: quay.io/acme/fluentd:1.2
  - name: metrics
    image: prom/statsd-exporter
ports:
  - port: 8080/tcp
"#;

    #[test]
    fn test_parse_full_spec() {
        let spec = DeploymentSpec::parse(FULL_SPEC, Path::new("cart.hspec")).unwrap();
        assert_eq!(spec.registry, "registry.example.com");
        assert_eq!(spec.stack_image, "ghcr.io/acme/java-stack:11");
        assert_eq!(
            spec.agent_images,
            vec!["quay.io/acme/fluentd:1.2", "prom/statsd-exporter"]
        );
    }

    #[test]
    fn test_parse_spec_without_image_fields() {
        let spec = DeploymentSpec::parse("name: web\n", Path::new("web.hspec")).unwrap();
        assert_eq!(spec, DeploymentSpec::default());
    }

    #[test]
    fn test_parse_empty_document() {
        let spec = DeploymentSpec::parse("", Path::new("empty.hspec")).unwrap();
        assert_eq!(spec, DeploymentSpec::default());
    }

    #[test]
    fn test_parse_malformed() {
        let err = DeploymentSpec::parse("image: [unclosed", Path::new("bad.hspec")).unwrap_err();
        assert!(matches!(err, SpecError::Malformed { .. }));
        assert!(err.to_string().contains("bad.hspec"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = DeploymentSpec::load(Path::new("/nonexistent/deckhand/missing.hspec")).unwrap_err();
        assert!(matches!(err, SpecError::Unreadable { .. }));
    }

    #[test]
    fn test_load_all_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.hspec");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(FULL_SPEC.as_bytes()).unwrap();

        let specs = load_all(&[path]).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].registry, "registry.example.com");
    }
}
