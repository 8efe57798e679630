//! Snapshot model for per-command cumulative counters.
//!
//! A snapshot is what one query of the store returns: a table with one row
//! per command, carrying the total number of calls and the total time spent
//! in that command since the server started (or since stats were reset).
//!
//! Two wire shapes are understood:
//!
//! - The `INFO commandstats` text reply:
//!   `cmdstat_get:calls=10,usec=2000,usec_per_call=200.00,...`
//! - JSON: `{"rows":[{"command":"get","calls":10,"duration":2000}]}`

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Prefix of every row in the `INFO commandstats` section.
const CMDSTAT_PREFIX: &str = "cmdstat_";

/// Cumulative counters for one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRow {
    /// Command name, e.g. `get` or `client|list`.
    pub command: String,
    /// Total number of calls. Monotonically non-decreasing until a reset.
    pub calls: u64,
    /// Total time spent in the command (microseconds for INFO replies).
    pub duration: u64,
}

impl CommandRow {
    pub fn new(command: impl Into<String>, calls: u64, duration: u64) -> Self {
        Self {
            command: command.into(),
            calls,
            duration,
        }
    }
}

/// One poll's full table of per-command counters.
///
/// Command names are unique within a snapshot; row order is the order the
/// source reported them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub rows: Vec<CommandRow>,
}

impl Snapshot {
    /// Build a snapshot, collapsing duplicate command names.
    ///
    /// A repeated command keeps the position of its first occurrence and the
    /// counters of its last one.
    pub fn new(rows: Vec<CommandRow>) -> Self {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(rows.len());
        let mut unique: Vec<CommandRow> = Vec::with_capacity(rows.len());

        for row in rows {
            match index.get(&row.command) {
                Some(&i) => unique[i] = row,
                None => {
                    index.insert(row.command.clone(), unique.len());
                    unique.push(row);
                }
            }
        }

        Self { rows: unique }
    }

    /// Parse the text of an `INFO commandstats` reply.
    ///
    /// Section headers, blank lines and rows missing `calls` or `usec` are
    /// skipped.
    pub fn from_info(text: &str) -> Self {
        let rows = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(parse_cmdstat_line)
            .collect();
        Self::new(rows)
    }

    /// Parse the JSON representation.
    pub fn from_json(text: &str) -> Result<Self, SourceError> {
        let raw: Snapshot = serde_json::from_str(text)?;
        Ok(Self::new(raw.rows))
    }

    /// Parse either representation, picking JSON when the payload looks like it.
    pub fn parse(content: &str) -> Result<Self, SourceError> {
        if content.trim_start().starts_with('{') {
            Self::from_json(content)
        } else {
            Ok(Self::from_info(content))
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a row by command name.
    pub fn get(&self, command: &str) -> Option<&CommandRow> {
        self.rows.iter().find(|r| r.command == command)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandRow> {
        self.rows.iter()
    }
}

fn parse_cmdstat_line(line: &str) -> Option<CommandRow> {
    let (name, fields) = line.strip_prefix(CMDSTAT_PREFIX)?.split_once(':')?;

    let mut calls = None;
    let mut usec = None;
    for field in fields.split(',') {
        match field.split_once('=') {
            Some(("calls", v)) => calls = v.trim().parse::<u64>().ok(),
            Some(("usec", v)) => usec = v.trim().parse::<u64>().ok(),
            _ => {}
        }
    }

    Some(CommandRow::new(name, calls?, usec?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO_REPLY: &str = "# Commandstats\r\n\
        cmdstat_get:calls=10,usec=2000,usec_per_call=200.00,rejected_calls=0,failed_calls=0\r\n\
        cmdstat_set:calls=4,usec=100,usec_per_call=25.00,rejected_calls=0,failed_calls=0\r\n\
        cmdstat_client|list:calls=1,usec=30,usec_per_call=30.00\r\n\
        \r\n";

    #[test]
    fn test_parse_info_reply() {
        let snapshot = Snapshot::from_info(INFO_REPLY);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.rows[0], CommandRow::new("get", 10, 2000));
        assert_eq!(snapshot.rows[1], CommandRow::new("set", 4, 100));
        assert_eq!(snapshot.get("client|list").unwrap().calls, 1);
    }

    #[test]
    fn test_parse_info_skips_malformed_rows() {
        let text = "cmdstat_get:calls=abc,usec=1\nnot_a_row\ncmdstat_del:usec=5\ncmdstat_ping:calls=2,usec=4";
        let snapshot = Snapshot::from_info(text);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.rows[0].command, "ping");
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"rows":[{"command":"get","calls":10,"duration":2000}]}"#;
        let snapshot = Snapshot::parse(json).unwrap();
        assert_eq!(snapshot.rows, vec![CommandRow::new("get", 10, 2000)]);
    }

    #[test]
    fn test_parse_invalid_json_is_error() {
        let result = Snapshot::parse("{\"rows\": [");
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_duplicate_commands_keep_last_counters() {
        let snapshot = Snapshot::new(vec![
            CommandRow::new("get", 1, 10),
            CommandRow::new("set", 2, 20),
            CommandRow::new("get", 3, 30),
        ]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.rows[0], CommandRow::new("get", 3, 30));
        assert_eq!(snapshot.rows[1].command, "set");
    }

    #[test]
    fn test_empty_reply() {
        assert!(Snapshot::from_info("# Commandstats\r\n").is_empty());
    }
}
