//! Query targets.

use serde::{Deserialize, Serialize};

pub const DEFAULT_COMMAND: &str = "info";
pub const DEFAULT_SECTION: &str = "commandstats";
pub const DEFAULT_KIND: &str = "command";

/// What a snapshot source should be asked for.
///
/// Only `datasource` is required. The remaining fields fall back to an
/// `INFO commandstats` query when left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Opaque reference to the store, e.g. `127.0.0.1:6379` or a file path.
    pub datasource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A [`Target`] with every optional field filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTarget<'a> {
    pub datasource: &'a str,
    pub command: &'a str,
    pub section: &'a str,
    pub kind: &'a str,
}

impl Target {
    pub fn new(datasource: impl Into<String>) -> Self {
        Self {
            datasource: datasource.into(),
            ..Self::default()
        }
    }

    /// Apply defaults for the fields that were not given.
    pub fn resolved(&self) -> ResolvedTarget<'_> {
        ResolvedTarget {
            datasource: &self.datasource,
            command: self.command.as_deref().unwrap_or(DEFAULT_COMMAND),
            section: self.section.as_deref().unwrap_or(DEFAULT_SECTION),
            kind: self.kind.as_deref().unwrap_or(DEFAULT_KIND),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_when_absent() {
        let target = Target::new("localhost:6379");
        let resolved = target.resolved();
        assert_eq!(resolved.datasource, "localhost:6379");
        assert_eq!(resolved.command, "info");
        assert_eq!(resolved.section, "commandstats");
        assert_eq!(resolved.kind, "command");
    }

    #[test]
    fn test_explicit_fields_win() {
        let target = Target {
            datasource: "db".to_string(),
            command: Some("info".to_string()),
            section: Some("latencystats".to_string()),
            kind: None,
        };
        assert_eq!(target.resolved().section, "latencystats");
        assert_eq!(target.resolved().kind, "command");
    }

    #[test]
    fn test_deserialize_type_field() {
        let target: Target =
            serde_json::from_str(r#"{"datasource":"db","type":"command"}"#).unwrap();
        assert_eq!(target.kind.as_deref(), Some("command"));
        assert!(target.section.is_none());
    }
}
