//! Credential resolution
//!
//! Looks a registry up in the credential store under several address
//! spellings and returns the first usable match.

use tracing::debug;

use crate::domain::{Credential, RegistryAliases, RegistrySet};
use crate::error::StoreError;
use crate::infrastructure::credstore::CredentialStore;

/// Address spellings tried for one candidate hostname, in order
pub fn registry_search_patterns(registry: &str) -> [String; 4] {
    [
        registry.to_string(),
        format!("https://{}", registry),
        format!("{}/", registry),
        format!("https://{}/", registry),
    ]
}

/// Resolves registries against a credential store
pub struct CredentialResolver<'a, S: CredentialStore + ?Sized> {
    store: &'a S,
    aliases: &'a RegistryAliases,
}

impl<'a, S: CredentialStore + ?Sized> CredentialResolver<'a, S> {
    pub fn new(store: &'a S, aliases: &'a RegistryAliases) -> Self {
        Self { store, aliases }
    }

    /// Hostnames to search for `registry`
    ///
    /// An empty registry, or the public registry's canonical member, searches
    /// every public alias; any other registry searches only itself.
    pub fn candidates(&self, registry: &str) -> Vec<String> {
        let is_public_group = self.aliases.canonical() == Some(registry);
        if registry.is_empty() || is_public_group {
            self.aliases.as_slice().to_vec()
        } else {
            vec![registry.to_string()]
        }
    }

    /// Every address spelling for `registry`, in lookup order
    pub fn search_patterns(&self, registry: &str) -> Vec<String> {
        self.candidates(registry)
            .iter()
            .flat_map(|candidate| registry_search_patterns(candidate))
            .collect()
    }

    /// Resolve one registry
    ///
    /// Returns `Ok(None)` when nothing usable is stored. Stops at the first
    /// spelling whose stored credential has both a username and an address.
    pub fn resolve(&self, registry: &str) -> Result<Option<Credential>, StoreError> {
        for pattern in self.search_patterns(registry) {
            debug!("Fetching credentials for {} as {}", registry, pattern);

            let Some(stored) = self.store.get(&pattern)? else {
                continue;
            };

            let credential = Credential::new(
                registry,
                stored.username,
                stored.password,
                stored.server_address,
            );
            if credential.is_authoritative() {
                debug!(
                    "Resolved {} from stored address {}",
                    registry, credential.server_address
                );
                return Ok(Some(credential));
            }
        }

        debug!("No stored credential for {}", registry);
        Ok(None)
    }

    /// Resolve every registry in the set, skipping those with no stored credential
    ///
    /// A store failure aborts the whole resolution.
    pub fn resolve_all(&self, registries: &RegistrySet) -> Result<Vec<Credential>, StoreError> {
        let mut credentials = Vec::new();
        for registry in registries.iter() {
            if let Some(credential) = self.resolve(registry)? {
                credentials.push(credential);
            }
        }
        Ok(credentials)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::infrastructure::credstore::StoredAuth;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// In-memory store that records every address it is asked for
    #[derive(Default)]
    pub struct FakeStore {
        entries: HashMap<String, StoredAuth>,
        fail: bool,
        pub queries: RefCell<Vec<String>>,
    }

    impl FakeStore {
        pub fn with(mut self, address: &str, username: &str, password: &str) -> Self {
            self.entries.insert(
                address.to_string(),
                StoredAuth {
                    username: username.to_string(),
                    password: password.to_string(),
                    server_address: address.to_string(),
                },
            );
            self
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    impl CredentialStore for FakeStore {
        fn get(&self, server_address: &str) -> Result<Option<StoredAuth>, StoreError> {
            self.queries.borrow_mut().push(server_address.to_string());
            if self.fail {
                return Err(StoreError::Malformed {
                    path: PathBuf::from("config.json"),
                    message: "unexpected end of input".to_string(),
                });
            }
            Ok(self.entries.get(server_address).cloned())
        }
    }

    #[test]
    fn test_registry_search_patterns_order() {
        assert_eq!(
            registry_search_patterns("registry.example.com"),
            [
                "registry.example.com",
                "https://registry.example.com",
                "registry.example.com/",
                "https://registry.example.com/",
            ]
        );
    }

    #[test]
    fn test_resolves_plain_spelling() {
        let aliases = RegistryAliases::default();
        let store = FakeStore::default().with("registry.example.com", "u", "p");
        let resolver = CredentialResolver::new(&store, &aliases);

        let credential = resolver.resolve("registry.example.com").unwrap().unwrap();
        assert_eq!(credential.registry, "registry.example.com");
        assert_eq!(credential.server_address, "registry.example.com");
        assert_eq!(store.queries.borrow().len(), 1);
    }

    #[test]
    fn test_resolves_https_spelling() {
        let aliases = RegistryAliases::default();
        let store = FakeStore::default().with("https://registry.example.com", "u", "p");
        let resolver = CredentialResolver::new(&store, &aliases);

        let credential = resolver.resolve("registry.example.com").unwrap().unwrap();
        assert_eq!(credential.server_address, "https://registry.example.com");
        assert_eq!(
            *store.queries.borrow(),
            vec!["registry.example.com", "https://registry.example.com"]
        );
    }

    #[test]
    fn test_stops_at_first_match() {
        let aliases = RegistryAliases::default();
        let store = FakeStore::default()
            .with("registry.example.com/", "slash", "1")
            .with("https://registry.example.com/", "both", "2");
        let resolver = CredentialResolver::new(&store, &aliases);

        let credential = resolver.resolve("registry.example.com").unwrap().unwrap();
        assert_eq!(credential.username, "slash");
        assert_eq!(store.queries.borrow().len(), 3);
    }

    #[test]
    fn test_entry_without_username_is_skipped() {
        let aliases = RegistryAliases::default();
        let store = FakeStore::default()
            .with("registry.example.com", "", "orphan-password")
            .with("https://registry.example.com/", "u", "p");
        let resolver = CredentialResolver::new(&store, &aliases);

        let credential = resolver.resolve("registry.example.com").unwrap().unwrap();
        assert_eq!(credential.server_address, "https://registry.example.com/");
    }

    #[test]
    fn test_not_found_is_none() {
        let aliases = RegistryAliases::default();
        let store = FakeStore::default();
        let resolver = CredentialResolver::new(&store, &aliases);

        assert!(resolver.resolve("registry.example.com").unwrap().is_none());
        assert_eq!(store.queries.borrow().len(), 4);
    }

    #[test]
    fn test_empty_registry_searches_all_aliases() {
        let aliases = RegistryAliases::default();
        let store = FakeStore::default().with("https://docker.io/", "hub", "pw");
        let resolver = CredentialResolver::new(&store, &aliases);

        let credential = resolver.resolve("").unwrap().unwrap();
        assert_eq!(credential.username, "hub");
        // index.docker.io and registry-1.docker.io are tried in full first
        assert_eq!(store.queries.borrow().len(), 12);
    }

    #[test]
    fn test_canonical_public_member_searches_all_aliases() {
        let aliases = RegistryAliases::default();
        let store = FakeStore::default();
        let resolver = CredentialResolver::new(&store, &aliases);

        assert!(resolver.resolve("index.docker.io").unwrap().is_none());
        assert_eq!(
            store.queries.borrow().len(),
            aliases.as_slice().len() * 4
        );
    }

    #[test]
    fn test_store_failure_aborts() {
        let aliases = RegistryAliases::default();
        let store = FakeStore::failing();
        let resolver = CredentialResolver::new(&store, &aliases);

        assert!(resolver.resolve("registry.example.com").is_err());
        assert_eq!(store.queries.borrow().len(), 1);
    }

    #[test]
    fn test_resolve_all_skips_missing() {
        let aliases = RegistryAliases::default();
        let mut registries = RegistrySet::default();
        registries.insert("reg1.example.com", &aliases);
        registries.insert("reg2.example.com", &aliases);

        let store = FakeStore::default().with("reg1.example.com", "u", "p");
        let resolver = CredentialResolver::new(&store, &aliases);

        let credentials = resolver.resolve_all(&registries).unwrap();
        assert_eq!(credentials.len(), 1);
        assert_eq!(credentials[0].registry, "reg1.example.com");
    }
}
