//! Blog identity credentials
//!
//! Identities live in indexed environment slots:
//!
//! ```text
//! TISTORY_ALIAS_1=ECON
//! TISTORY_ID_1=someone@example.com
//! TISTORY_PW_1=...
//! TISTORY_BLOG_NAME_1=econ-notes
//! ```
//!
//! The slots are read once into a [`CredentialRegistry`] at process start and
//! the registry is passed explicitly to whoever needs a login.

use std::collections::HashMap;

use crate::{Result, TpubError};

/// Number of indexed identity slots scanned
pub const CREDENTIAL_SLOTS: usize = 5;

/// Login credentials for one blog identity
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub alias: String,
    pub login_id: String,
    pub password: String,
    /// Blog subdomain (`{blog_name}.tistory.com`)
    pub blog_name: String,
}

impl Credential {
    /// Editor URL for a new post on this blog
    pub fn write_url(&self) -> String {
        format!("https://{}.tistory.com/manage/post", self.blog_name)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("alias", &self.alias)
            .field("login_id", &self.login_id)
            .field("password", &"<redacted>")
            .field("blog_name", &self.blog_name)
            .finish()
    }
}

/// A slot whose alias is set but whose triple is incomplete
#[derive(Debug, Clone, PartialEq, Eq)]
struct IncompleteSlot {
    index: usize,
    alias: String,
    missing: Vec<&'static str>,
}

/// In-memory alias -> credential mapping
#[derive(Debug, Clone, Default)]
pub struct CredentialRegistry {
    /// Keyed by upper-cased alias
    entries: HashMap<String, Credential>,
    incomplete: Vec<IncompleteSlot>,
}

impl CredentialRegistry {
    /// Build the registry from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the registry from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut registry = Self::default();
        let read = |key: String| lookup(&key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        for index in 1..=CREDENTIAL_SLOTS {
            let Some(alias) = read(format!("TISTORY_ALIAS_{}", index)) else {
                continue;
            };
            let key = alias.to_uppercase();
            if registry.entries.contains_key(&key) {
                // First slot wins, later duplicates are ignored.
                continue;
            }

            let login_id = read(format!("TISTORY_ID_{}", index));
            let password = read(format!("TISTORY_PW_{}", index));
            let blog_name = read(format!("TISTORY_BLOG_NAME_{}", index));

            match (login_id, password, blog_name) {
                (Some(login_id), Some(password), Some(blog_name)) => {
                    registry.entries.insert(
                        key,
                        Credential {
                            alias,
                            login_id,
                            password,
                            blog_name,
                        },
                    );
                }
                (login_id, password, blog_name) => {
                    let mut missing = Vec::new();
                    if login_id.is_none() {
                        missing.push("TISTORY_ID");
                    }
                    if password.is_none() {
                        missing.push("TISTORY_PW");
                    }
                    if blog_name.is_none() {
                        missing.push("TISTORY_BLOG_NAME");
                    }
                    registry.incomplete.push(IncompleteSlot {
                        index,
                        alias,
                        missing,
                    });
                }
            }
        }

        registry
    }

    /// Look up an identity by alias (case-insensitive)
    pub fn get(&self, alias: &str) -> Result<&Credential> {
        let key = alias.trim().to_uppercase();
        if let Some(credential) = self.entries.get(&key) {
            return Ok(credential);
        }

        if let Some(slot) = self
            .incomplete
            .iter()
            .find(|slot| slot.alias.to_uppercase() == key)
        {
            return Err(TpubError::Configuration(format!(
                "Incomplete credentials for alias '{}' in slot {}: missing {}",
                alias,
                slot.index,
                slot.missing
                    .iter()
                    .map(|m| format!("{}_{}", m, slot.index))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let mut known = self.aliases();
        known.sort_unstable();
        let known = if known.is_empty() {
            "none".to_string()
        } else {
            known.join(", ")
        };
        Err(TpubError::Configuration(format!(
            "No credentials found for alias '{}' (checked TISTORY_ALIAS_1..{}, configured: {})",
            alias, CREDENTIAL_SLOTS, known
        )))
    }

    /// Known aliases, in no particular order
    pub fn aliases(&self) -> Vec<&str> {
        self.entries.values().map(|c| c.alias.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(vars: &[(&str, &str)]) -> CredentialRegistry {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CredentialRegistry::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let registry = registry(&[
            ("TISTORY_ALIAS_2", "Econ"),
            ("TISTORY_ID_2", "me@example.com"),
            ("TISTORY_PW_2", "secret"),
            ("TISTORY_BLOG_NAME_2", "econ-notes"),
        ]);

        let credential = registry.get("ECON").unwrap();
        assert_eq!(credential.login_id, "me@example.com");
        assert_eq!(credential.blog_name, "econ-notes");
        assert_eq!(registry.get("econ").unwrap(), credential);
        assert_eq!(
            credential.write_url(),
            "https://econ-notes.tistory.com/manage/post"
        );
    }

    #[test]
    fn test_unknown_alias_is_configuration_error() {
        let registry = registry(&[]);
        let err = registry.get("ghost").unwrap_err();
        assert!(matches!(err, TpubError::Configuration(_)));
        assert!(err.is_fatal());
        assert!(err.to_string().ends_with("configured: none)"));
    }

    #[test]
    fn test_unknown_alias_lists_configured_aliases() {
        let registry = registry(&[
            ("TISTORY_ALIAS_1", "travel"),
            ("TISTORY_ID_1", "a"),
            ("TISTORY_PW_1", "b"),
            ("TISTORY_BLOG_NAME_1", "c"),
            ("TISTORY_ALIAS_2", "econ"),
            ("TISTORY_ID_2", "a"),
            ("TISTORY_PW_2", "b"),
            ("TISTORY_BLOG_NAME_2", "d"),
        ]);

        let err = registry.get("food").unwrap_err().to_string();
        assert!(err.contains("'food'"));
        assert!(err.ends_with("configured: econ, travel)"));
    }

    #[test]
    fn test_incomplete_triple_reports_missing_keys() {
        let registry = registry(&[
            ("TISTORY_ALIAS_3", "travel"),
            ("TISTORY_ID_3", "me@example.com"),
        ]);

        let err = registry.get("TRAVEL").unwrap_err().to_string();
        assert!(err.contains("TISTORY_PW_3"));
        assert!(err.contains("TISTORY_BLOG_NAME_3"));
        assert!(!err.contains("TISTORY_ID_3"));
    }

    #[test]
    fn test_slots_beyond_five_are_ignored() {
        let registry = registry(&[
            ("TISTORY_ALIAS_6", "late"),
            ("TISTORY_ID_6", "id"),
            ("TISTORY_PW_6", "pw"),
            ("TISTORY_BLOG_NAME_6", "late-blog"),
        ]);
        assert!(registry.is_empty());
        assert!(registry.get("late").is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let credential = Credential {
            alias: "a".into(),
            login_id: "id".into(),
            password: "hunter2".into(),
            blog_name: "b".into(),
        };
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
