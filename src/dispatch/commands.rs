// Symbol to command table
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::state::Partition;

/// A program with its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Commands shipped with the hardcoded symbol sets
fn builtin_commands() -> BTreeMap<String, CommandSpec> {
    BTreeMap::from([
        ("0".to_string(), CommandSpec::new("echo", &["test"])),
        ("1".to_string(), CommandSpec::new("x-www-browser", &[])),
    ])
}

/// Resolves a recognized symbol to the command it triggers. Hardcoded
/// partitions use the builtin commands, the user partition its own.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    builtin: BTreeMap<String, CommandSpec>,
    user: BTreeMap<String, CommandSpec>,
}

impl CommandTable {
    pub fn new(partition: Partition, user: BTreeMap<String, CommandSpec>) -> Self {
        let builtin = if partition.is_hardcoded() {
            builtin_commands()
        } else {
            BTreeMap::new()
        };
        for symbol in user.keys().filter(|symbol| builtin.contains_key(*symbol)) {
            log::warn!(
                "Command configured for '{}' is shadowed by the builtin one",
                symbol
            );
        }
        Self { builtin, user }
    }

    /// Builtin commands win over user commands of the same name
    pub fn resolve(&self, symbol: &str) -> Option<&CommandSpec> {
        self.builtin.get(symbol).or_else(|| self.user.get(symbol))
    }

    pub fn len(&self) -> usize {
        self.builtin.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builtin.is_empty() && self.user.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_commands() -> BTreeMap<String, CommandSpec> {
        BTreeMap::from([
            ("circle".to_string(), CommandSpec::new("gedit", &[])),
            ("1".to_string(), CommandSpec::new("firefox", &["--new-window"])),
        ])
    }

    #[test]
    fn test_user_partition_has_no_builtins() {
        let table = CommandTable::new(Partition::UserDefined, user_commands());
        assert!(table.resolve("0").is_none());
        assert_eq!(table.resolve("circle").unwrap().program, "gedit");
        assert_eq!(table.resolve("1").unwrap().program, "firefox");
        assert!(table.resolve("square").is_none());
    }

    #[test]
    fn test_builtins_take_precedence() {
        let table = CommandTable::new(Partition::Hardcoded64, user_commands());
        assert_eq!(table.resolve("1").unwrap().program, "x-www-browser");
        assert_eq!(table.resolve("0").unwrap().to_string(), "echo test");
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_command_spec_args_default() {
        let spec: CommandSpec = serde_json::from_str(r#"{"program": "xterm"}"#).unwrap();
        assert!(spec.args.is_empty());
    }
}
