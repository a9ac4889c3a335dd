//! Credential discovery from the environment
//!
//! Secrets never live in the config file. The file names an environment
//! variable prefix; `<prefix>` becomes slot `PRIMARY` and `<prefix>_1` ..
//! `<prefix>_<max_backups>` become `BACKUP_1` .. `BACKUP_N`, in that priority
//! order. Unset or empty variables are skipped.

use common::Secret;
use serde::Deserialize;
use tracing::debug;

/// Slot id of the unsuffixed variable.
pub const PRIMARY_SLOT_ID: &str = "PRIMARY";

/// One configured credential, before pool construction validates it.
#[derive(Debug, Clone)]
pub struct SlotConfig {
    pub id: String,
    pub secret: Secret<String>,
}

impl SlotConfig {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: Secret::new(secret.into()),
        }
    }
}

/// `[credentials]` config section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialSource {
    pub env_prefix: String,
    pub max_backups: u32,
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self {
            env_prefix: "GEMINI_API_KEY".to_string(),
            max_backups: 3,
        }
    }
}

/// Collect slot configs using `lookup` to resolve variable names.
pub fn slots_from_lookup(
    source: &CredentialSource,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<SlotConfig> {
    let mut slots = Vec::new();

    let mut push = |var: String, id: String| {
        let Some(value) = lookup(&var) else {
            return;
        };
        let value = value.trim();
        if value.is_empty() {
            debug!(var = %var, "credential variable empty, skipping");
            return;
        }
        debug!(var = %var, slot_id = %id, "found credential");
        slots.push(SlotConfig::new(id, value));
    };

    push(source.env_prefix.clone(), PRIMARY_SLOT_ID.to_string());
    for i in 1..=source.max_backups {
        push(format!("{}_{i}", source.env_prefix), format!("BACKUP_{i}"));
    }

    slots
}

/// Collect slot configs from the process environment.
pub fn slots_from_env(source: &CredentialSource) -> Vec<SlotConfig> {
    slots_from_lookup(source, |name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn primary_then_backups_in_order() {
        let lookup = lookup_from(&[
            ("GEMINI_API_KEY_2", "k2"),
            ("GEMINI_API_KEY", "k0"),
            ("GEMINI_API_KEY_1", "k1"),
        ]);
        let slots = slots_from_lookup(&CredentialSource::default(), lookup);
        let ids: Vec<&str> = slots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["PRIMARY", "BACKUP_1", "BACKUP_2"]);
        assert_eq!(slots[0].secret.expose(), "k0");
    }

    #[test]
    fn gaps_and_empty_values_are_skipped() {
        let lookup = lookup_from(&[
            ("GEMINI_API_KEY", "  "),
            ("GEMINI_API_KEY_3", "k3"),
        ]);
        let slots = slots_from_lookup(&CredentialSource::default(), lookup);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].id, "BACKUP_3");
    }

    #[test]
    fn backups_beyond_max_are_ignored() {
        let source = CredentialSource {
            env_prefix: "SVC_KEY".into(),
            max_backups: 1,
        };
        let lookup = lookup_from(&[("SVC_KEY_1", "a"), ("SVC_KEY_2", "b")]);
        let slots = slots_from_lookup(&source, lookup);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].id, "BACKUP_1");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let lookup = lookup_from(&[("GEMINI_API_KEY", "key-with-newline\n")]);
        let slots = slots_from_lookup(&CredentialSource::default(), lookup);
        assert_eq!(slots[0].secret.expose(), "key-with-newline");
    }

    #[test]
    fn nothing_configured_yields_empty() {
        let slots = slots_from_lookup(&CredentialSource::default(), |_| None);
        assert!(slots.is_empty());
    }

    #[test]
    fn section_defaults_apply() {
        let source: CredentialSource = toml::from_str("max_backups = 5").unwrap();
        assert_eq!(source.env_prefix, "GEMINI_API_KEY");
        assert_eq!(source.max_backups, 5);
    }
}
