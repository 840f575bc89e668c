//! Credential domain types
//!
//! A [`Credential`] holds plaintext secrets as read from the local store.
//! Assembling a [`CredentialBundle`] consumes credentials and keeps only the
//! encoded `auth` field, so plaintext never reaches the serialized payload.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use tracing::warn;

use crate::error::BundleError;

/// A resolved registry credential
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Registry hostname the credential was resolved for
    pub registry: String,
    pub username: String,
    pub password: String,
    /// Address the credential is stored under
    pub server_address: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("registry", &self.registry)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server_address", &self.server_address)
            .finish()
    }
}

impl Credential {
    pub fn new(
        registry: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        server_address: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            username: username.into(),
            password: password.into(),
            server_address: server_address.into(),
        }
    }

    /// Whether this credential is usable (has a user and an address)
    pub fn is_authoritative(&self) -> bool {
        !self.username.is_empty() && !self.server_address.is_empty()
    }

    /// Replace plaintext secrets with `base64(username:password)`
    ///
    /// Returns `None` when there is nothing to encode.
    pub fn redact(self) -> Option<RedactedCredential> {
        if self.username.is_empty() && self.password.is_empty() {
            return None;
        }
        let auth = STANDARD.encode(format!("{}:{}", self.username, self.password));
        Some(RedactedCredential {
            server_address: self.server_address,
            auth,
        })
    }
}

/// A credential safe to serialize
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedactedCredential {
    /// Map key in the bundle
    #[serde(skip)]
    pub server_address: String,
    /// `base64(username:password)`
    pub auth: String,
}

/// Payload delivered to the delegate, shaped like a docker `config.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CredentialBundle {
    auths: BTreeMap<String, RedactedCredential>,
}

impl CredentialBundle {
    pub fn is_empty(&self) -> bool {
        self.auths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.auths.len()
    }

    /// Server addresses in the bundle, in serialization order
    #[cfg(test)]
    pub fn server_addresses(&self) -> impl Iterator<Item = &str> {
        self.auths.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub fn get(&self, server_address: &str) -> Option<&RedactedCredential> {
        self.auths.get(server_address)
    }

    /// Serialize to `{"auths": {"<server>": {"auth": "<base64>"}}}`
    ///
    /// Keys are ordered by server address, so equal bundles encode to equal bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, BundleError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Build a bundle from resolved credentials
///
/// Later credentials overwrite earlier ones with the same server address.
pub fn assemble(credentials: Vec<Credential>) -> CredentialBundle {
    let mut bundle = CredentialBundle::default();

    for credential in credentials {
        let registry = credential.registry.clone();
        let Some(redacted) = credential.redact() else {
            continue;
        };
        if let Some(previous) = bundle
            .auths
            .insert(redacted.server_address.clone(), redacted)
        {
            warn!(
                "Duplicate credential for {} (registry {}), keeping the last one",
                previous.server_address, registry
            );
        }
    }

    bundle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(auth: &str) -> String {
        String::from_utf8(STANDARD.decode(auth).unwrap()).unwrap()
    }

    #[test]
    fn test_auth_decodes_to_username_password() {
        let bundle = assemble(vec![Credential::new(
            "reg1.example.com",
            "deployer",
            "s3cr:et",
            "reg1.example.com",
        )]);
        let entry = bundle.get("reg1.example.com").unwrap();
        assert_eq!(decode(&entry.auth), "deployer:s3cr:et");
    }

    #[test]
    fn test_json_shape_has_no_plaintext() {
        let bundle = assemble(vec![Credential::new(
            "reg1.example.com",
            "deployer",
            "hunter2",
            "https://reg1.example.com",
        )]);
        let json = String::from_utf8(bundle.to_json().unwrap()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entry = &value["auths"]["https://reg1.example.com"];
        assert!(entry["auth"].is_string());
        assert_eq!(entry.as_object().unwrap().len(), 1);
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("deployer"));
        assert!(!json.contains("username"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let credentials = vec![
            Credential::new("zeta.example.com", "z", "1", "zeta.example.com"),
            Credential::new("alpha.example.com", "a", "2", "alpha.example.com"),
            Credential::new("index.docker.io", "d", "3", "https://index.docker.io/v1/"),
        ];
        let first = assemble(credentials.clone()).to_json().unwrap();
        let second = assemble(credentials.into_iter().rev().collect())
            .to_json()
            .unwrap();
        assert_eq!(first, second);

        let bundle = assemble(vec![
            Credential::new("zeta.example.com", "z", "1", "zeta.example.com"),
            Credential::new("alpha.example.com", "a", "2", "alpha.example.com"),
        ]);
        assert_eq!(
            bundle.server_addresses().collect::<Vec<_>>(),
            vec!["alpha.example.com", "zeta.example.com"]
        );
    }

    #[test]
    fn test_duplicate_server_address_last_write_wins() {
        let bundle = assemble(vec![
            Credential::new("reg.example.com", "first", "1", "reg.example.com"),
            Credential::new("reg.example.com", "second", "2", "reg.example.com"),
        ]);
        assert_eq!(bundle.len(), 1);
        assert_eq!(
            decode(&bundle.get("reg.example.com").unwrap().auth),
            "second:2"
        );
    }

    #[test]
    fn test_empty_credential_is_omitted() {
        let bundle = assemble(vec![Credential::new("reg.example.com", "", "", "reg.example.com")]);
        assert!(bundle.is_empty());
        assert_eq!(bundle.to_json().unwrap(), br#"{"auths":{}}"#.to_vec());
    }

    #[test]
    fn test_debug_hides_password() {
        let credential = Credential::new("reg.example.com", "deployer", "hunter2", "reg.example.com");
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("deployer"));
    }
}
