//! Localized message catalog
//!
//! Messages live in one TOML file per language (`i18n/pt.toml`), addressed
//! by dotted path (`alerts.emergency`) with `{name}` substitution.

use crate::{Error, Result};
use std::path::Path;

/// Read-only catalog of localized message templates
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    root: toml::Value,
}

impl MessageCatalog {
    /// Load a catalog from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Parse a catalog from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let root: toml::Value = content
            .parse()
            .map_err(|e: toml::de::Error| Error::Config(e.to_string()))?;
        Ok(Self { root })
    }

    /// Whether a dotted key resolves to a string template
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Get the raw template for a dotted key
    pub fn get(&self, key: &str) -> Result<&str> {
        self.lookup(key)
            .ok_or_else(|| Error::NotFound(format!("message key '{}'", key)))
    }

    /// Get a message with `{name}` placeholders substituted
    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> Result<String> {
        let template = self.get(key)?;
        let mut message = template.to_string();
        for (name, value) in args {
            message = message.replace(&format!("{{{}}}", name), value);
        }
        Ok(message)
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        let mut node = &self.root;
        for part in key.split('.') {
            node = node.get(part)?;
        }
        node.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MessageCatalog {
        MessageCatalog::from_toml_str(
            r#"
            [alerts]
            emergency = "EMERGENCY: person detected {pose} for too long!"
            moderate = "Attention: prolonged sitting detected"
            acknowledged = "Alert acknowledged. Stopping notifications."
            "#,
        )
        .unwrap()
    }

    #[test]
    fn dotted_lookup() {
        let catalog = catalog();
        assert_eq!(
            catalog.get("alerts.moderate").unwrap(),
            "Attention: prolonged sitting detected"
        );
        assert!(catalog.contains("alerts.acknowledged"));
    }

    #[test]
    fn named_substitution() {
        let catalog = catalog();
        let message = catalog
            .format("alerts.emergency", &[("pose", "lying")])
            .unwrap();
        assert_eq!(message, "EMERGENCY: person detected lying for too long!");
    }

    #[test]
    fn missing_key_is_not_found() {
        let catalog = catalog();
        let err = catalog.get("alerts.nope").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        // a table node is not a message either
        assert!(catalog.get("alerts").is_err());
    }
}
