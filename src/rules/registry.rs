#![forbid(unsafe_code)]

//! Rule registry mapping rule identifiers to factories
//!
//! The RuleRegistry is responsible for:
//! - Registering the built-in rule catalogue
//! - Rejecting duplicate registrations
//! - Filtering rules based on configuration
//! - Looking up a factory by rule identifier

use crate::config::fieldguard_toml::{RuleValue, RulesConfig};
use crate::error::RuleError;
use crate::rules::builtin::BUILTIN_RULES;
use crate::rules::RuleFactory;
use crate::types::RuleId;
use std::collections::HashMap;

/// A registered rule: identifier, description and factory
#[derive(Debug, Clone)]
pub struct RegisteredRule {
    pub id: RuleId,
    pub description: String,
    pub factory: RuleFactory,
}

/// Registry for storing and looking up rule factories
#[derive(Debug)]
pub struct RuleRegistry {
    rules: HashMap<RuleId, RegisteredRule>,
}

impl RuleRegistry {
    /// Create a new empty RuleRegistry
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in rule
    ///
    /// # Errors
    ///
    /// Returns `RuleError` if the built-in table contains a duplicate or an
    /// invalid identifier.
    pub fn with_builtins() -> Result<Self, RuleError> {
        let mut registry = Self::new();
        for (id, description, factory) in BUILTIN_RULES {
            registry.register(id, description, *factory)?;
        }
        Ok(registry)
    }

    /// Register a factory under `id`
    ///
    /// # Errors
    ///
    /// Returns `RuleError::InvalidDefinition` for a malformed identifier and
    /// `RuleError::DuplicateRule` if `id` is already registered.
    pub fn register(
        &mut self,
        id: &str,
        description: &str,
        factory: RuleFactory,
    ) -> Result<(), RuleError> {
        let rule_id = RuleId::new(id)
            .ok_or_else(|| RuleError::InvalidDefinition(format!("invalid rule identifier '{id}'")))?;
        if self.rules.contains_key(&rule_id) {
            return Err(RuleError::DuplicateRule(id.to_string()));
        }
        self.rules.insert(
            rule_id.clone(),
            RegisteredRule {
                id: rule_id,
                description: description.to_string(),
                factory,
            },
        );
        Ok(())
    }

    /// Look up the factory for `id`
    ///
    /// # Errors
    ///
    /// Returns `RuleError::NotFound` if no rule is registered under `id`.
    pub fn lookup(&self, id: &str) -> Result<RuleFactory, RuleError> {
        self.get(id)
            .map(|rule| rule.factory)
            .ok_or_else(|| RuleError::NotFound(id.to_string()))
    }

    /// Get a rule by its identifier
    pub fn get(&self, id: &str) -> Option<&RegisteredRule> {
        let rule_id = RuleId::new(id)?;
        self.rules.get(&rule_id)
    }

    /// Filter rules based on configuration
    ///
    /// Rules are enabled by default unless explicitly disabled.
    pub fn filter_by_config(&mut self, config: &RulesConfig) {
        self.rules.retain(|id, _| match config.get(id) {
            Some(value) => is_rule_enabled(value),
            None => true,
        });
    }

    /// All rules ordered by identifier
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredRule> {
        let mut rules: Vec<&RegisteredRule> = self.rules.values().collect();
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        rules.into_iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper function to determine if a rule is enabled
fn is_rule_enabled(rule_value: &RuleValue) -> bool {
    match rule_value {
        RuleValue::Enabled(enabled) => *enabled,
        RuleValue::Settings(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fieldguard_toml::RuleSettings;
    use crate::engine::GenerationContext;
    use crate::rules::{RuleInput, ValidationRule};

    fn never(_: &RuleInput<'_>, _: &mut GenerationContext) -> Option<Box<dyn ValidationRule>> {
        None
    }

    #[test]
    fn test_new_registry() {
        let registry = RuleRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_default_registry() {
        let registry = RuleRegistry::default();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_builtins_registered() {
        let registry = RuleRegistry::with_builtins().unwrap();
        assert_eq!(registry.len(), BUILTIN_RULES.len());
        for id in ["required", "maxlength", "gte", "enum", "pattern", "required_if", "cel"] {
            assert!(registry.get(id).is_some(), "missing {id}");
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = RuleRegistry::new();
        registry.register("custom", "first", never).unwrap();
        let err = registry.register("custom", "second", never).unwrap_err();
        assert!(matches!(err, RuleError::DuplicateRule(id) if id == "custom"));
        assert_eq!(registry.get("custom").unwrap().description, "first");
    }

    #[test]
    fn test_invalid_identifier_rejected() {
        let mut registry = RuleRegistry::new();
        assert!(matches!(
            registry.register("Bad-Id", "", never),
            Err(RuleError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_lookup_not_found() {
        let registry = RuleRegistry::with_builtins().unwrap();
        assert!(registry.lookup("required").is_ok());
        assert!(matches!(
            registry.lookup("frobnicate"),
            Err(RuleError::NotFound(id)) if id == "frobnicate"
        ));
    }

    #[test]
    fn test_filter_by_config() {
        let mut registry = RuleRegistry::with_builtins().unwrap();
        let before = registry.len();

        let mut config = RulesConfig::new();
        config.insert(RuleId::new("email").unwrap(), RuleValue::Enabled(false));
        config.insert(RuleId::new("url").unwrap(), RuleValue::Enabled(true));
        config.insert(
            RuleId::new("required").unwrap(),
            RuleValue::Settings(RuleSettings {
                message: Some("{field} is mandatory".to_string()),
            }),
        );
        registry.filter_by_config(&config);

        assert_eq!(registry.len(), before - 1);
        assert!(registry.get("email").is_none());
        assert!(registry.get("url").is_some());
        assert!(registry.get("required").is_some());
    }

    #[test]
    fn test_iter_sorted() {
        let registry = RuleRegistry::with_builtins().unwrap();
        let ids: Vec<&str> = registry.iter().map(|r| r.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }
}
