//! The command dictionary model
//!
//! A dictionary maps command stems to ordered argument definitions. It is
//! produced by mission tooling outside this workspace and consumed here as a
//! read-only input: the compiler borrows it for the duration of one call and
//! never mutates it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Errors raised while loading a dictionary from JSON
#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("Invalid dictionary JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for dictionary operations
pub type DictionaryResult<T> = Result<T, DictionaryError>;

// ── Dictionary root ──────────────────────────────────────────────────

/// A command dictionary: flight-software commands, hardware commands, and
/// the enumerations their arguments refer to
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDictionary {
    #[serde(default)]
    pub fsw_command_map: HashMap<String, FswCommand>,
    #[serde(default)]
    pub hw_command_map: HashMap<String, HwCommand>,
    #[serde(default)]
    pub enum_map: HashMap<String, DictEnum>,
}

impl CommandDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a dictionary from its JSON representation
    pub fn from_json(text: &str) -> DictionaryResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn fsw_command(&self, stem: &str) -> Option<&FswCommand> {
        self.fsw_command_map.get(stem)
    }

    pub fn hw_command(&self, stem: &str) -> Option<&HwCommand> {
        self.hw_command_map.get(stem)
    }

    pub fn enumeration(&self, name: &str) -> Option<&DictEnum> {
        self.enum_map.get(name)
    }

    /// Register a flight-software command, keyed by its stem
    pub fn add_fsw_command(&mut self, command: FswCommand) {
        self.fsw_command_map.insert(command.stem.clone(), command);
    }

    pub fn add_enum(&mut self, enumeration: DictEnum) {
        self.enum_map.insert(enumeration.name.clone(), enumeration);
    }
}

// ── Commands ─────────────────────────────────────────────────────────

/// A flight-software command definition with positional arguments
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FswCommand {
    pub stem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<FswCommandArgument>,
}

impl FswCommand {
    pub fn new(stem: impl Into<String>, arguments: Vec<FswCommandArgument>) -> Self {
        Self { stem: stem.into(), description: None, arguments }
    }
}

/// A hardware command definition. Hardware commands take no arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HwCommand {
    pub stem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ── Argument definitions ─────────────────────────────────────────────

/// Inclusive numeric bounds for a dictionary argument
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

/// The repeat-group shape of a `repeat` argument: how many tuples are
/// allowed and what one tuple looks like
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepeatSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    pub arguments: Vec<FswCommandArgument>,
}

impl RepeatSpec {
    /// Number of arguments in one tuple
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }
}

/// One positional argument definition, a closed set of kinds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "arg_type", rename_all = "snake_case")]
pub enum FswCommandArgument {
    Boolean {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<String>,
    },
    Enum {
        name: String,
        enum_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<String>,
    },
    Float {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<NumericRange>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<f64>,
    },
    Integer {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<NumericRange>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<i64>,
    },
    Numeric {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<NumericRange>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<f64>,
    },
    Repeat {
        name: String,
        repeat: RepeatSpec,
    },
    Time {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<String>,
    },
    Unsigned {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<NumericRange>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<u64>,
    },
    VarString {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<String>,
    },
    FixedString {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<String>,
    },
    Fill {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_value: Option<String>,
    },
}

impl FswCommandArgument {
    pub fn name(&self) -> &str {
        match self {
            FswCommandArgument::Boolean { name, .. }
            | FswCommandArgument::Enum { name, .. }
            | FswCommandArgument::Float { name, .. }
            | FswCommandArgument::Integer { name, .. }
            | FswCommandArgument::Numeric { name, .. }
            | FswCommandArgument::Repeat { name, .. }
            | FswCommandArgument::Time { name, .. }
            | FswCommandArgument::Unsigned { name, .. }
            | FswCommandArgument::VarString { name, .. }
            | FswCommandArgument::FixedString { name, .. }
            | FswCommandArgument::Fill { name, .. } => name,
        }
    }
}

// ── Enumerations ─────────────────────────────────────────────────────

/// A named enumeration of symbols an `enum` argument may take
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DictEnum {
    pub name: String,
    pub values: Vec<EnumValue>,
}

impl DictEnum {
    pub fn new(name: impl Into<String>, symbols: &[&str]) -> Self {
        Self {
            name: name.into(),
            values: symbols
                .iter()
                .map(|s| EnumValue { symbol: (*s).to_string(), numeric: None })
                .collect(),
        }
    }

    pub fn contains_symbol(&self, symbol: &str) -> bool {
        self.values.iter().any(|v| v.symbol == symbol)
    }
}

/// One enumeration entry: the symbol and its optional numeric encoding
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_parses_typed_arguments() {
        let text = r#"{
            "fswCommandMap": {
                "DL_PACKET": {
                    "stem": "DL_PACKET",
                    "arguments": [
                        {"arg_type": "unsigned", "name": "apid", "range": {"min": 0, "max": 2047}},
                        {"arg_type": "enum", "name": "mode", "enum_name": "DL_MODE"},
                        {"arg_type": "repeat", "name": "bundles", "repeat": {
                            "min": 1, "max": 4,
                            "arguments": [
                                {"arg_type": "var_string", "name": "label"},
                                {"arg_type": "integer", "name": "count"}
                            ]
                        }}
                    ]
                }
            },
            "hwCommandMap": {"HDW_PYRO_FIRE": {"stem": "HDW_PYRO_FIRE"}},
            "enumMap": {"DL_MODE": {"name": "DL_MODE", "values": [{"symbol": "NOMINAL"}]}}
        }"#;

        let dict = CommandDictionary::from_json(text).unwrap();
        let cmd = dict.fsw_command("DL_PACKET").unwrap();
        assert_eq!(cmd.arguments.len(), 3);
        assert!(matches!(cmd.arguments[0], FswCommandArgument::Unsigned { .. }));
        match &cmd.arguments[2] {
            FswCommandArgument::Repeat { repeat, .. } => assert_eq!(repeat.arity(), 2),
            other => panic!("expected repeat argument, got {other:?}"),
        }
        assert!(dict.hw_command("HDW_PYRO_FIRE").is_some());
        assert!(dict.enumeration("DL_MODE").unwrap().contains_symbol("NOMINAL"));
    }

    #[test]
    fn test_from_json_rejects_malformed_text() {
        assert!(CommandDictionary::from_json("{not json").is_err());
    }

    #[test]
    fn test_argument_kind_tag_is_snake_case() {
        let arg = FswCommandArgument::FixedString { name: "label".into(), default_value: None };
        let value = serde_json::to_value(&arg).unwrap();
        assert_eq!(value["arg_type"], "fixed_string");
    }

    #[test]
    fn test_missing_maps_default_to_empty() {
        let dict = CommandDictionary::from_json("{}").unwrap();
        assert!(dict.fsw_command_map.is_empty());
        assert!(dict.enum_map.is_empty());
    }
}
