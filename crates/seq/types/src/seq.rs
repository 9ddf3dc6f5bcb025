//! The canonical sequence document model
//!
//! A `SeqDocument` is what a textual sequence compiles to and what the
//! generator renders back into text. Its JSON serialization is consumed by
//! downstream ground tools, so the field names, the type tags, and the
//! omit-when-empty rules here are load-bearing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Document root ────────────────────────────────────────────────────

/// Ordered metadata map attached to documents, steps, and requests.
///
/// `serde_json::Map` preserves insertion order (the `preserve_order`
/// feature), which keeps metadata entries in source order across a
/// compile/generate round trip.
pub type MetadataMap = serde_json::Map<String, Value>;

/// A canonical sequence document.
///
/// Top-level section arrays are `None` when the source had no such section;
/// they are never serialized as empty arrays. `metadata` is always present,
/// even when empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeqDocument {
    /// Sequence identifier, from `@ID` or the caller-supplied name
    pub id: String,
    /// Top-level metadata in source order
    #[serde(default)]
    pub metadata: MetadataMap,
    /// Variables declared with `@LOCALS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locals: Option<Vec<VariableDeclaration>>,
    /// Variables declared with `@INPUT_PARAMS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<VariableDeclaration>>,
    /// Time-tagged body steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
    /// Commands in the `@IMMEDIATE` section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immediate_commands: Option<Vec<ImmediateCommand>>,
    /// Commands in the `@HARDWARE` section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_commands: Option<Vec<HardwareCommand>>,
    /// `@REQUEST_BEGIN`/`@REQUEST_END` blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<Vec<Request>>,
}

impl SeqDocument {
    /// Create an empty document with the given identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: MetadataMap::new(),
            locals: None,
            parameters: None,
            steps: None,
            immediate_commands: None,
            hardware_commands: None,
            requests: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Append a body step, creating the array on first use
    pub fn add_step(&mut self, step: Step) {
        self.steps.get_or_insert_with(Vec::new).push(step);
    }
}

// ── Variables ────────────────────────────────────────────────────────

/// Declared variable type, inferred from the trailing kind code in the
/// variable name (`..NNINT`, `..NNUINT`, `..NNFLT`, `..NNENUM`, `..NNSTR`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariableType {
    Int,
    Uint,
    Float,
    String,
    Enum,
    Unknown,
}

impl std::fmt::Display for VariableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VariableType::Int => "INT",
            VariableType::Uint => "UINT",
            VariableType::Float => "FLOAT",
            VariableType::String => "STRING",
            VariableType::Enum => "ENUM",
            VariableType::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// A local or input-parameter declaration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
}

impl VariableDeclaration {
    pub fn new(name: impl Into<String>, var_type: VariableType) -> Self {
        Self { name: name.into(), var_type }
    }
}

// ── Time tags ────────────────────────────────────────────────────────

/// The time tag attached to a body or request step.
///
/// `tag` literals are dialect strings validated by the time engine. A step
/// whose literal failed validation keeps its dialect with the fallback tag
/// `"UNKNOWN"` so the document still round-trips.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeTag {
    Absolute { tag: String },
    CommandComplete,
    CommandRelative { tag: String },
    EpochRelative { tag: String },
}

impl TimeTag {
    /// The dialect literal, when this tag carries one
    pub fn tag(&self) -> Option<&str> {
        match self {
            TimeTag::Absolute { tag }
            | TimeTag::CommandRelative { tag }
            | TimeTag::EpochRelative { tag } => Some(tag),
            TimeTag::CommandComplete => None,
        }
    }
}

/// A named mission epoch reference, used only on requests
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundEpoch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
}

// ── Steps ────────────────────────────────────────────────────────────

/// One time-tagged entry in a sequence body or request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    Command {
        stem: String,
        args: Vec<Argument>,
        time: TimeTag,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<MetadataMap>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        models: Option<Vec<Model>>,
    },
    Activate {
        sequence: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        engine: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        epoch: Option<String>,
        args: Vec<Argument>,
        time: TimeTag,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<MetadataMap>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        models: Option<Vec<Model>>,
    },
    Load {
        sequence: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        engine: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        epoch: Option<String>,
        args: Vec<Argument>,
        time: TimeTag,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<MetadataMap>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        models: Option<Vec<Model>>,
    },
    GroundBlock {
        name: String,
        args: Vec<Argument>,
        time: TimeTag,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<MetadataMap>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        models: Option<Vec<Model>>,
    },
    GroundEvent {
        name: String,
        args: Vec<Argument>,
        time: TimeTag,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<MetadataMap>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        models: Option<Vec<Model>>,
    },
}

impl Step {
    /// Shorthand for a bare command step with no attachments
    pub fn command(stem: impl Into<String>, args: Vec<Argument>, time: TimeTag) -> Self {
        Step::Command {
            stem: stem.into(),
            args,
            time,
            description: None,
            metadata: None,
            models: None,
        }
    }

    pub fn time(&self) -> &TimeTag {
        match self {
            Step::Command { time, .. }
            | Step::Activate { time, .. }
            | Step::Load { time, .. }
            | Step::GroundBlock { time, .. }
            | Step::GroundEvent { time, .. } => time,
        }
    }

    pub fn args(&self) -> &[Argument] {
        match self {
            Step::Command { args, .. }
            | Step::Activate { args, .. }
            | Step::Load { args, .. }
            | Step::GroundBlock { args, .. }
            | Step::GroundEvent { args, .. } => args,
        }
    }
}

/// A command executed outside the timed body, from the `@IMMEDIATE` section
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImmediateCommand {
    pub stem: String,
    pub args: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataMap>,
}

/// A hardware command from the `@HARDWARE` section. Hardware commands carry
/// no arguments and no time tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HardwareCommand {
    pub stem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataMap>,
}

/// A named request block grouping steps under one time or ground epoch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_epoch: Option<GroundEpoch>,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ── Arguments ────────────────────────────────────────────────────────

/// One resolved command argument.
///
/// `name` is the dictionary-provided hint and is absent when no dictionary
/// entry matched the argument's position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Argument {
    Boolean {
        value: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Number {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Hex {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    String {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Symbol {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Repeat {
        value: Vec<Vec<Argument>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl Argument {
    pub fn number(value: f64) -> Self {
        Argument::Number { value, name: None }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Argument::String { value: value.into(), name: None }
    }

    pub fn symbol(value: impl Into<String>) -> Self {
        Argument::Symbol { value: value.into(), name: None }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Argument::Boolean { name, .. }
            | Argument::Number { name, .. }
            | Argument::Hex { name, .. }
            | Argument::String { name, .. }
            | Argument::Symbol { name, .. }
            | Argument::Repeat { name, .. } => name.as_deref(),
        }
    }

    /// Attach a dictionary name hint, replacing any previous one
    pub fn with_name(mut self, hint: impl Into<String>) -> Self {
        let slot = match &mut self {
            Argument::Boolean { name, .. }
            | Argument::Number { name, .. }
            | Argument::Hex { name, .. }
            | Argument::String { name, .. }
            | Argument::Symbol { name, .. }
            | Argument::Repeat { name, .. } => name,
        };
        *slot = Some(hint.into());
        self
    }
}

// ── Models ───────────────────────────────────────────────────────────

/// A telemetry-model hint attached to a step via `@MODEL`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub variable: String,
    pub value: ModelValue,
    pub offset: String,
}

/// Model values are plain JSON scalars
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_document_shape() {
        let doc = SeqDocument::new("test");
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value, json!({"id": "test", "metadata": {}}));
    }

    #[test]
    fn test_step_type_tags_are_snake_case() {
        let step = Step::command(
            "FSW_CMD",
            vec![Argument::number(1.0)],
            TimeTag::CommandComplete,
        );
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["type"], "command");
        assert_eq!(value["stem"], "FSW_CMD");
        assert_eq!(value["time"], json!({"type": "COMMAND_COMPLETE"}));
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_time_tag_types_are_uppercase() {
        let time = TimeTag::EpochRelative { tag: "-00:00:01".into() };
        let value = serde_json::to_value(&time).unwrap();
        assert_eq!(value, json!({"type": "EPOCH_RELATIVE", "tag": "-00:00:01"}));

        let back: TimeTag = serde_json::from_value(value).unwrap();
        assert_eq!(back, time);
    }

    #[test]
    fn test_argument_type_tags_are_lowercase() {
        let arg = Argument::Repeat {
            value: vec![vec![
                Argument::string("bundle1"),
                Argument::number(5.0),
            ]],
            name: Some("packets".into()),
        };
        let value = serde_json::to_value(&arg).unwrap();
        assert_eq!(value["type"], "repeat");
        assert_eq!(value["name"], "packets");
        assert_eq!(value["value"][0][0]["type"], "string");
        assert_eq!(value["value"][0][1]["type"], "number");
    }

    #[test]
    fn test_variable_type_serializes_uppercase() {
        let var = VariableDeclaration::new("L01INT", VariableType::Int);
        let value = serde_json::to_value(&var).unwrap();
        assert_eq!(value, json!({"name": "L01INT", "type": "INT"}));
    }

    #[test]
    fn test_request_with_ground_epoch() {
        let request = Request {
            name: "warmup".into(),
            time: None,
            ground_epoch: Some(GroundEpoch {
                name: "MARS_LANDING".into(),
                delta: Some("00:30:00".into()),
            }),
            steps: vec![],
            metadata: None,
            description: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["ground_epoch"]["name"], "MARS_LANDING");
        assert_eq!(value["ground_epoch"]["delta"], "00:30:00");
        assert!(value.get("time").is_none());
    }

    #[test]
    fn test_model_value_is_untagged() {
        let model = Model {
            variable: "BATTERY".into(),
            value: ModelValue::Number(97.5),
            offset: "00:00:00".into(),
        };
        let value = serde_json::to_value(&model).unwrap();
        assert_eq!(value["value"], 97.5);

        let text: Model =
            serde_json::from_value(json!({"variable": "V", "value": "ok", "offset": "00:00:01"}))
                .unwrap();
        assert_eq!(text.value, ModelValue::String("ok".into()));
    }

    #[test]
    fn test_metadata_preserves_insertion_order() {
        let doc = SeqDocument::new("order")
            .with_metadata("zulu", json!(1))
            .with_metadata("alpha", json!(2));
        let text = serde_json::to_string(&doc).unwrap();
        let zulu = text.find("zulu").unwrap();
        let alpha = text.find("alpha").unwrap();
        assert!(zulu < alpha);
    }
}
