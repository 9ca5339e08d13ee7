//! Compiler configuration.

use std::collections::BTreeMap;

use graph::{CompileError, PropertyList};
use serde::{Deserialize, Serialize};

/// Settings applied to every compile run by one compiler.
///
/// Loaded from JSON; every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Properties applied on top of the configured ones, keyed by the
    /// qualified name of the node they belong to (e.g. `OfficeA.SectionA`).
    pub property_overrides: BTreeMap<String, PropertyList>,
    /// Auto-wire objects at every scope regardless of what the sources enable.
    pub auto_wire_objects: bool,
    /// Auto-wire teams at every scope regardless of what the sources enable.
    pub auto_wire_teams: bool,
    /// Run registered execution explorers after auto-wiring.
    pub explore_executions: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            property_overrides: BTreeMap::new(),
            auto_wire_objects: false,
            auto_wire_teams: false,
            explore_executions: true,
        }
    }
}

impl CompilerConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// [`CompileError::Configuration`] when the document is not valid JSON or
    /// does not match the configuration shape.
    pub fn from_json(json: &str) -> Result<Self, CompileError> {
        serde_json::from_str(json).map_err(|err| CompileError::Configuration {
            message: err.to_string(),
        })
    }

    /// Properties overriding those of the node named `qualified_name`.
    pub fn overrides_for(&self, qualified_name: &str) -> Option<&PropertyList> {
        self.property_overrides.get(qualified_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_gives_defaults() {
        let config = CompilerConfig::from_json("{}").unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert!(config.explore_executions);
    }

    #[test]
    fn overrides_are_keyed_by_qualified_name() {
        let config = CompilerConfig::from_json(
            r#"{
                "property_overrides": {
                    "OfficeA.SectionA": [{ "name": "timeout", "value": "30" }]
                },
                "auto_wire_objects": true
            }"#,
        )
        .unwrap();

        assert!(config.auto_wire_objects);
        assert_eq!(
            config.overrides_for("OfficeA.SectionA").and_then(|p| p.value("timeout")),
            Some("30")
        );
        assert!(config.overrides_for("OfficeA").is_none());
    }

    #[test]
    fn malformed_document_is_a_configuration_error() {
        let err = CompilerConfig::from_json(r#"{ "auto_wire_teams": "yes" }"#).unwrap_err();
        assert!(matches!(err, CompileError::Configuration { .. }));

        let err = CompilerConfig::from_json(r#"{ "unknown": 1 }"#).unwrap_err();
        assert!(err.to_string().starts_with("Configuration error:"));
    }
}
