//! Registry extraction
//!
//! Collects the distinct registry hostnames a set of deployment specs pull
//! from. Spellings of the default public registry collapse to a single
//! canonical member.

use std::collections::BTreeSet;

use super::spec::DeploymentSpec;

/// Hostname spellings of the default public registry, in lookup order
pub const DEFAULT_PUBLIC_ALIASES: &[&str] = &[
    "index.docker.io",
    "registry-1.docker.io",
    "docker.io",
    "registry.hub.docker.com",
    "index.docker.io/v1/",
];

/// Ordered alias group for the default public registry
///
/// The first entry is the canonical member used in a [`RegistrySet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryAliases {
    aliases: Vec<String>,
}

impl Default for RegistryAliases {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_ALIASES.iter().map(|s| s.to_string()))
    }
}

impl RegistryAliases {
    /// Build an alias group, dropping empty and repeated entries
    pub fn new(aliases: impl IntoIterator<Item = String>) -> Self {
        let mut seen = BTreeSet::new();
        let aliases = aliases
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty() && seen.insert(a.clone()))
            .collect();
        Self { aliases }
    }

    /// Canonical member of the group, if the group is non-empty
    pub fn canonical(&self) -> Option<&str> {
        self.aliases.first().map(String::as_str)
    }

    /// Whether `registry` is one of the group's spellings
    pub fn contains(&self, registry: &str) -> bool {
        self.aliases.iter().any(|a| a == registry)
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// All spellings in lookup order
    pub fn as_slice(&self) -> &[String] {
        &self.aliases
    }

    /// Map an alias spelling to the canonical member, leaving other hosts unchanged
    pub fn canonicalize<'a>(&'a self, registry: &'a str) -> &'a str {
        match self.canonical() {
            Some(canonical) if self.contains(registry) => canonical,
            _ => registry,
        }
    }
}

/// Distinct, non-empty registry hostnames referenced by one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySet {
    registries: BTreeSet<String>,
}

impl RegistrySet {
    /// Insert a registry, canonicalizing public aliases; empty strings are ignored
    pub fn insert(&mut self, registry: &str, aliases: &RegistryAliases) -> bool {
        let registry = registry.trim();
        if registry.is_empty() {
            return false;
        }
        self.registries
            .insert(aliases.canonicalize(registry).to_string())
    }

    #[cfg(test)]
    pub fn contains(&self, registry: &str) -> bool {
        self.registries.contains(registry)
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.registries.iter().map(String::as_str)
    }
}

/// Host segment of an image reference
///
/// Takes the reference up to the first `:` and then the first `/`-separated
/// segment, e.g. `"ghcr.io/acme/stack:11"` -> `"ghcr.io"`.
pub fn image_registry(image: &str) -> &str {
    let without_tag = image.split(':').next().unwrap_or_default();
    without_tag.split('/').next().unwrap_or_default().trim()
}

/// Collect the registries referenced by `specs`
///
/// The public registry is always present (under its canonical alias) so the
/// default registry is looked up even when no spec names it.
pub fn extract_registries(specs: &[DeploymentSpec], aliases: &RegistryAliases) -> RegistrySet {
    let mut set = RegistrySet::default();

    if let Some(canonical) = aliases.canonical() {
        set.insert(canonical, aliases);
    }

    for spec in specs {
        set.insert(&spec.registry, aliases);

        if !spec.stack_image.is_empty() {
            set.insert(image_registry(&spec.stack_image), aliases);
        }

        for agent in &spec.agent_images {
            set.insert(image_registry(agent), aliases);
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(registry: &str, stack: &str, agents: &[&str]) -> DeploymentSpec {
        DeploymentSpec {
            registry: registry.to_string(),
            stack_image: stack.to_string(),
            agent_images: agents.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_image_registry() {
        assert_eq!(image_registry("ghcr.io/acme/java-stack:11"), "ghcr.io");
        assert_eq!(image_registry("quay.io/acme/fluentd"), "quay.io");
        assert_eq!(image_registry("nginx:1.19"), "nginx");
        assert_eq!(image_registry(""), "");
    }

    #[test]
    fn test_public_registry_always_present() {
        let aliases = RegistryAliases::default();
        let set = extract_registries(&[], &aliases);
        assert_eq!(set.len(), 1);
        assert!(set.contains("index.docker.io"));
    }

    #[test]
    fn test_alias_spellings_collapse_to_one_member() {
        let aliases = RegistryAliases::default();
        let specs = vec![
            spec("docker.io", "registry-1.docker.io/library/java:11", &[]),
            spec("index.docker.io", "", &["registry.hub.docker.com/acme/agent:1"]),
        ];
        let set = extract_registries(&specs, &aliases);
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["index.docker.io"]);
    }

    #[test]
    fn test_empty_fields_never_enter_set() {
        let aliases = RegistryAliases::default();
        let specs = vec![spec("", "", &["", ":latest", "/path"]), spec("  ", "", &[])];
        let set = extract_registries(&specs, &aliases);
        assert!(set.iter().all(|r| !r.is_empty()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_collects_all_sources() {
        let aliases = RegistryAliases::default();
        let specs = vec![
            spec(
                "registry.example.com",
                "ghcr.io/acme/java-stack:11",
                &["quay.io/acme/fluentd:1.2"],
            ),
            spec("registry.example.com", "", &[]),
        ];
        let set = extract_registries(&specs, &aliases);
        let registries: Vec<_> = set.iter().collect();
        assert_eq!(
            registries,
            vec![
                "ghcr.io",
                "index.docker.io",
                "quay.io",
                "registry.example.com"
            ]
        );
    }

    #[test]
    fn test_custom_alias_group() {
        let aliases = RegistryAliases::new(vec![
            "mirror.internal".to_string(),
            "".to_string(),
            "hub.internal".to_string(),
            "mirror.internal".to_string(),
        ]);
        assert_eq!(aliases.as_slice().len(), 2);

        let set = extract_registries(&[spec("hub.internal", "", &[])], &aliases);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["mirror.internal"]);
    }

    #[test]
    fn test_empty_alias_group_seeds_nothing() {
        let aliases = RegistryAliases::new(Vec::new());
        let set = extract_registries(&[], &aliases);
        assert!(set.is_empty());
    }
}
