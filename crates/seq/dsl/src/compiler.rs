//! Compiler: syntax tree to canonical sequence document
//!
//! Two passes over the tree. Pass 1 collects the symbol table: parameters,
//! locals, and any caller-provided globals. Pass 2 walks the sections in
//! document order and emits steps, immediate commands, hardware commands,
//! and requests, resolving arguments positionally against the command
//! dictionary when one is supplied.
//!
//! The compiler never aborts: every problem becomes a diagnostic next to a
//! best-effort document.

use crate::tree::{
    ArgNode, ErrorNodeKind, MetadataEntry, ModelNode, StepKindNode, StepNode, SyntaxTree,
    TimeTagNode,
};
use crate::validator;
use seq_time::TimeDialect;
use seq_types::{
    codes, Argument, CommandDictionary, Diagnostic, FswCommand, FswCommandArgument,
    HardwareCommand, ImmediateCommand, MetadataMap, Model, ModelValue, Request, SeqDocument, Span,
    Step, TimeTag, VariableDeclaration, VariableType,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// A per-mission argument resolution hook.
///
/// Called before the built-in resolution for every argument token; returning
/// `Some` takes the argument as resolved. Passed at call time so compilation
/// stays re-entrant.
pub trait ArgDelegate {
    fn resolve(
        &self,
        stem: &str,
        index: usize,
        raw: &ArgNode,
        hint: Option<&FswCommandArgument>,
    ) -> Option<Argument>;
}

/// Caller-supplied knobs for one compile call
#[derive(Default)]
pub struct CompileOptions<'a> {
    /// Globally-declared variable names visible to every sequence
    pub globals: Vec<String>,
    /// Optional per-mission argument resolution hook
    pub arg_delegate: Option<&'a dyn ArgDelegate>,
}

/// What a compile call returns: the document plus everything worth reporting
#[derive(Debug)]
pub struct CompileResult {
    pub seq: SeqDocument,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Compile a parsed tree into a canonical document.
///
/// `name` supplies the fallback identity when the source has no `@ID`
/// directive; its extension, if any, is stripped.
pub fn compile(
    tree: &SyntaxTree,
    source: &str,
    dictionary: Option<&CommandDictionary>,
    name: &str,
    options: &CompileOptions,
) -> CompileResult {
    let mut ctx = Context {
        source,
        dictionary,
        options,
        symbols: SymbolTable::default(),
        diagnostics: Vec::new(),
    };

    // Pass 1: declarations
    ctx.collect_symbols(tree);

    // Pass 2: sections in document order
    let id = match &tree.id {
        Some(id) => id.name.clone(),
        None => strip_extension(name).to_string(),
    };
    debug!(sequence = %id, steps = tree.steps.len(), "compiling sequence");

    let mut doc = SeqDocument::new(id);
    doc.metadata = ctx.header_metadata(tree);

    if !tree.parameters.is_empty() {
        doc.parameters = Some(tree.parameters.iter().map(declare).collect());
    }
    if !tree.locals.is_empty() {
        doc.locals = Some(tree.locals.iter().map(declare).collect());
    }

    if !tree.steps.is_empty() {
        doc.steps = Some(tree.steps.iter().map(|s| ctx.compile_step(s)).collect());
    }
    if !tree.immediates.is_empty() {
        doc.immediate_commands =
            Some(tree.immediates.iter().map(|s| ctx.compile_immediate(s)).collect());
    }
    if !tree.hardware.is_empty() {
        doc.hardware_commands =
            Some(tree.hardware.iter().map(|s| ctx.compile_hardware(s)).collect());
    }
    if !tree.requests.is_empty() {
        doc.requests = Some(
            tree.requests
                .iter()
                .map(|r| ctx.compile_request(r))
                .collect(),
        );
    }

    ctx.report_error_nodes(tree);
    CompileResult { seq: doc, diagnostics: ctx.diagnostics }
}

// ── Symbol table ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SymbolKind {
    Local,
    Param,
    Global,
}

#[derive(Default)]
struct SymbolTable {
    names: HashMap<String, SymbolKind>,
}

impl SymbolTable {
    fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }
}

// ── Compile context ──────────────────────────────────────────────────

struct Context<'a> {
    source: &'a str,
    dictionary: Option<&'a CommandDictionary>,
    options: &'a CompileOptions<'a>,
    symbols: SymbolTable,
    diagnostics: Vec<Diagnostic>,
}

impl Context<'_> {
    fn collect_symbols(&mut self, tree: &SyntaxTree) {
        for global in &self.options.globals {
            self.symbols.names.insert(global.clone(), SymbolKind::Global);
        }
        for param in &tree.parameters {
            if self
                .symbols
                .names
                .insert(param.name.clone(), SymbolKind::Param)
                .is_some()
            {
                self.diagnostics.push(Diagnostic::warn(
                    codes::COMPILE_DUPLICATE,
                    format!("`{}` declared more than once", param.name),
                    Some(param.span),
                ));
            }
        }
        for local in &tree.locals {
            if self
                .symbols
                .names
                .insert(local.name.clone(), SymbolKind::Local)
                .is_some()
            {
                self.diagnostics.push(Diagnostic::warn(
                    codes::COMPILE_DUPLICATE,
                    format!("`{}` declared more than once", local.name),
                    Some(local.span),
                ));
            }
        }
    }

    /// Header metadata entries merged with the `@LOAD_AND_GO` marker at its
    /// document position
    fn header_metadata(&mut self, tree: &SyntaxTree) -> MetadataMap {
        let mut map = MetadataMap::new();
        let lgo_at = tree.load_and_go.map(|s| s.start);
        let mut lgo_written = false;
        for entry in &tree.metadata {
            if let Some(at) = lgo_at {
                if !lgo_written && at < entry.span.start {
                    map.insert("lgo".to_string(), Value::Bool(true));
                    lgo_written = true;
                }
            }
            map.insert(entry.key.clone(), entry.value.clone());
        }
        if lgo_at.is_some() && !lgo_written {
            map.insert("lgo".to_string(), Value::Bool(true));
        }
        map
    }

    // ── Steps ────────────────────────────────────────────────────────

    fn compile_step(&mut self, node: &StepNode) -> Step {
        let time = self.resolve_time(node);
        let metadata = compile_metadata(&node.metadata);
        let models = compile_models(&node.models);
        let description = node.comment.as_deref().map(unescape);

        match &node.kind {
            StepKindNode::Command { stem } => {
                let args = self.resolve_args(stem, &node.args);
                Step::Command { stem: stem.clone(), args, time, description, metadata, models }
            }
            StepKindNode::Activate { sequence } => Step::Activate {
                sequence: sequence.clone(),
                engine: node.engine,
                epoch: node.epoch.clone(),
                args: self.lexical_args(&node.args),
                time,
                description,
                metadata,
                models,
            },
            StepKindNode::Load { sequence } => Step::Load {
                sequence: sequence.clone(),
                engine: node.engine,
                epoch: node.epoch.clone(),
                args: self.lexical_args(&node.args),
                time,
                description,
                metadata,
                models,
            },
            StepKindNode::GroundBlock { name } => Step::GroundBlock {
                name: name.clone(),
                args: self.lexical_args(&node.args),
                time,
                description,
                metadata,
                models,
            },
            StepKindNode::GroundEvent { name } => Step::GroundEvent {
                name: name.clone(),
                args: self.lexical_args(&node.args),
                time,
                description,
                metadata,
                models,
            },
        }
    }

    fn compile_immediate(&mut self, node: &StepNode) -> ImmediateCommand {
        let stem = match &node.kind {
            StepKindNode::Command { stem } => stem.clone(),
            other => {
                // Step directives have no meaning outside the body
                self.diagnostics.push(Diagnostic::warn(
                    codes::PARSER_STRAY_DIRECTIVE,
                    format!("{other:?} is not valid in the immediate section"),
                    Some(node.span),
                ));
                String::new()
            }
        };
        ImmediateCommand {
            args: self.resolve_args(&stem, &node.args),
            stem,
            description: node.comment.as_deref().map(unescape),
            metadata: compile_metadata(&node.metadata),
        }
    }

    fn compile_hardware(&mut self, node: &StepNode) -> HardwareCommand {
        let stem = match &node.kind {
            StepKindNode::Command { stem } => stem.clone(),
            _ => String::new(),
        };
        if !node.args.is_empty() {
            let span = node.args.iter().fold(node.args[0].span(), |s, a| s.join(a.span()));
            self.diagnostics.push(Diagnostic::warn(
                codes::COMPILE_HW_ARGS,
                format!("hardware command `{stem}` takes no arguments; {} dropped", node.args.len()),
                Some(span),
            ));
        }
        HardwareCommand {
            stem,
            description: node.comment.as_deref().map(unescape),
            metadata: compile_metadata(&node.metadata),
        }
    }

    fn compile_request(&mut self, node: &crate::tree::RequestNode) -> Request {
        let (time, ground_epoch) = match &node.time {
            Some(TimeTagNode::GroundEpoch { delta, name, span }) => {
                if name.is_none() {
                    self.diagnostics.push(Diagnostic::error(
                        codes::COMPILE_EPOCH_NAME,
                        format!("request `{}` ground epoch is missing its quoted name", node.name),
                        Some(*span),
                    ));
                }
                let epoch = seq_types::GroundEpoch {
                    name: name.clone().unwrap_or_default(),
                    delta: delta.clone(),
                };
                (None, Some(epoch))
            }
            Some(tag) => (Some(self.resolve_time_tag(tag)), None),
            None => (None, None),
        };

        Request {
            name: node.name.clone(),
            time,
            ground_epoch,
            steps: node.steps.iter().map(|s| self.compile_step(s)).collect(),
            metadata: non_empty_metadata(&node.metadata),
            description: node.comment.as_deref().map(unescape),
        }
    }

    // ── Time resolution ──────────────────────────────────────────────

    fn resolve_time(&mut self, node: &StepNode) -> TimeTag {
        match &node.time {
            Some(TimeTagNode::GroundEpoch { span, .. }) => {
                self.diagnostics.push(Diagnostic::error(
                    codes::COMPILE_REQUEST,
                    "ground-epoch time is only valid on a request header",
                    Some(*span),
                ));
                TimeTag::CommandComplete
            }
            Some(tag) => self.resolve_time_tag(tag),
            None => {
                self.diagnostics.push(Diagnostic::warn(
                    codes::TIME_MISSING,
                    "step has no time tag; treated as command-complete",
                    Some(node.span),
                ));
                TimeTag::CommandComplete
            }
        }
    }

    fn resolve_time_tag(&mut self, tag: &TimeTagNode) -> TimeTag {
        match tag {
            TimeTagNode::Complete { .. } => TimeTag::CommandComplete,
            TimeTagNode::Absolute { literal, span } => TimeTag::Absolute {
                tag: self.check_time(literal, TimeDialect::Absolute, *span),
            },
            TimeTagNode::Relative { literal, span } => TimeTag::CommandRelative {
                tag: self.check_time(literal, TimeDialect::Relative, *span),
            },
            TimeTagNode::Epoch { literal, span } => TimeTag::EpochRelative {
                tag: self.check_time(literal, TimeDialect::Epoch, *span),
            },
            TimeTagNode::GroundEpoch { span, .. } => {
                // Callers route ground epochs before coming here
                self.diagnostics.push(Diagnostic::error(
                    codes::COMPILE_REQUEST,
                    "ground-epoch time is only valid on a request header",
                    Some(*span),
                ));
                TimeTag::CommandComplete
            }
        }
    }

    /// Validate a time literal, keeping it verbatim when well formed. A
    /// malformed literal falls back to `UNKNOWN` so the step still emits.
    fn check_time(&mut self, literal: &str, dialect: TimeDialect, span: Span) -> String {
        if !seq_time::is_valid(literal, dialect) {
            self.diagnostics.push(Diagnostic::error(
                codes::TIME_FORMAT,
                format!("malformed {dialect} time `{literal}`"),
                Some(span),
            ));
            return "UNKNOWN".to_string();
        }
        if seq_time::is_max(literal, dialect) {
            self.diagnostics.push(Diagnostic::error(
                codes::TIME_MAX_RANGE,
                format!("{dialect} time `{literal}` exceeds the dialect maximum"),
                Some(span),
            ));
        } else if !seq_time::is_balanced(literal, dialect) {
            let result = seq_time::balance(literal, dialect);
            if let Some(message) = result.message {
                self.diagnostics.push(Diagnostic::warn(codes::TIME_UNBALANCED, message, Some(span)));
            }
        }
        literal.to_string()
    }

    // ── Argument resolution ──────────────────────────────────────────

    /// Resolve arguments against the dictionary entry for `stem`, falling
    /// back to lexical shape when no dictionary or no entry matches
    fn resolve_args(&mut self, stem: &str, raw: &[ArgNode]) -> Vec<Argument> {
        let command = self.dictionary.and_then(|d| d.fsw_command(stem));
        raw.iter()
            .enumerate()
            .map(|(index, node)| self.resolve_arg(stem, index, node, command))
            .collect()
    }

    fn resolve_arg(
        &mut self,
        stem: &str,
        index: usize,
        node: &ArgNode,
        command: Option<&FswCommand>,
    ) -> Argument {
        let hint = command.and_then(|c| c.arguments.get(index));

        if let Some(delegate) = self.options.arg_delegate {
            if let Some(resolved) = delegate.resolve(stem, index, node, hint) {
                return resolved;
            }
        }

        let arg = match hint {
            Some(def) => self.typed_arg(node, def),
            None => self.lexical_arg(node),
        };

        if let Some(def) = hint {
            let enums = self.dictionary.map(|d| &d.enum_map);
            self.diagnostics
                .extend(validator::validate_arg(&arg, def, enums, Some(node.span())));
            self.check_symbol_reference(&arg, def, node.span());
            arg.with_name(def.name())
        } else {
            arg
        }
    }

    /// Shape an argument using the dictionary definition for its position
    fn typed_arg(&mut self, node: &ArgNode, def: &FswCommandArgument) -> Argument {
        match (def, node) {
            (FswCommandArgument::Boolean { .. }, ArgNode::Atom { value, .. })
                if value == "TRUE" || value == "FALSE" =>
            {
                Argument::Boolean { value: value == "TRUE", name: None }
            }
            (FswCommandArgument::Repeat { repeat, .. }, ArgNode::Group { items, .. }) => {
                let tuples = self.group_tuples(items, repeat.arity());
                let value = tuples
                    .into_iter()
                    .map(|tuple| {
                        tuple
                            .iter()
                            .enumerate()
                            .map(|(j, item)| {
                                // Recursive validation happens on the whole
                                // repeat argument; only the name hint is
                                // attached here
                                let arg = self.lexical_arg(item);
                                match repeat.arguments.get(j % repeat.arity().max(1)) {
                                    Some(inner_def) => arg.with_name(inner_def.name()),
                                    None => arg,
                                }
                            })
                            .collect()
                    })
                    .collect();
                Argument::Repeat { value, name: None }
            }
            _ => self.lexical_arg(node),
        }
    }

    fn lexical_args(&mut self, raw: &[ArgNode]) -> Vec<Argument> {
        raw.iter().map(|node| self.lexical_arg(node)).collect()
    }

    /// Infer the argument variant purely from lexical shape
    fn lexical_arg(&mut self, node: &ArgNode) -> Argument {
        match node {
            ArgNode::Str { value, .. } => Argument::String { value: value.clone(), name: None },
            ArgNode::Atom { value, .. } => classify_atom(value),
            ArgNode::Group { items, .. } => {
                // Without an arity the flat tokens form one tuple; explicit
                // nested brackets win
                let tuples = self.group_tuples(items, 0);
                let value = tuples
                    .into_iter()
                    .map(|tuple| tuple.iter().map(|item| self.lexical_arg(item)).collect())
                    .collect();
                Argument::Repeat { value, name: None }
            }
        }
    }

    /// Split a group's items into tuples: explicit nested brackets win,
    /// then dictionary arity chunking, then one flat tuple
    fn group_tuples<'n>(&self, items: &'n [ArgNode], arity: usize) -> Vec<Vec<&'n ArgNode>> {
        if items.iter().any(|i| matches!(i, ArgNode::Group { .. })) {
            return items
                .iter()
                .map(|item| match item {
                    ArgNode::Group { items, .. } => items.iter().collect(),
                    other => vec![other],
                })
                .collect();
        }
        if arity > 0 {
            return items.chunks(arity).map(|chunk| chunk.iter().collect()).collect();
        }
        if items.is_empty() {
            Vec::new()
        } else {
            vec![items.iter().collect()]
        }
    }

    /// A symbol in a numeric position should name a declared variable
    fn check_symbol_reference(&mut self, arg: &Argument, def: &FswCommandArgument, span: Span) {
        let expects_value = matches!(
            def,
            FswCommandArgument::Integer { .. }
                | FswCommandArgument::Unsigned { .. }
                | FswCommandArgument::Float { .. }
                | FswCommandArgument::Numeric { .. }
        );
        if let Argument::Symbol { value, .. } = arg {
            if expects_value && !self.symbols.contains(value) {
                self.diagnostics.push(Diagnostic::warn(
                    codes::ARG_UNDECLARED,
                    format!("`{value}` does not name a declared variable"),
                    Some(span),
                ));
            }
        }
    }

    // ── Error nodes ──────────────────────────────────────────────────

    fn report_error_nodes(&mut self, tree: &SyntaxTree) {
        for error in tree.error_nodes() {
            let excerpt = self
                .source
                .get(error.span.start..error.span.end)
                .unwrap_or(&error.text);
            let (code, what) = match error.kind {
                ErrorNodeKind::Syntax => (codes::PARSER_SYNTAX, "unrecognized input"),
                ErrorNodeKind::BadStem => (codes::PARSER_BAD_STEM, "invalid stem character"),
                ErrorNodeKind::StrayDirective => {
                    (codes::PARSER_STRAY_DIRECTIVE, "directive cannot apply here")
                }
                ErrorNodeKind::Attach => {
                    (codes::COMPILE_ATTACH, "attachment directive with no step to attach to")
                }
                ErrorNodeKind::Request => (codes::COMPILE_REQUEST, "unmatched request boundary"),
            };
            self.diagnostics.push(Diagnostic::error(
                code,
                format!("{what}: `{}`", excerpt.trim()),
                Some(error.span),
            ));
        }
    }
}

// ── Free helpers ─────────────────────────────────────────────────────

fn declare(node: &crate::tree::VariableNode) -> VariableDeclaration {
    VariableDeclaration::new(&node.name, infer_variable_type(&node.name))
}

/// Infer a declared variable's type from the trailing kind code in its name
/// (letters, then digits, then the kind). Unknown shapes degrade to
/// `UNKNOWN` instead of erroring.
pub(crate) fn infer_variable_type(name: &str) -> VariableType {
    // Longest suffix first so UINT is not shadowed by INT
    const KINDS: [(&str, VariableType); 5] = [
        ("UINT", VariableType::Uint),
        ("ENUM", VariableType::Enum),
        ("INT", VariableType::Int),
        ("FLT", VariableType::Float),
        ("STR", VariableType::String),
    ];
    for (suffix, var_type) in KINDS {
        if let Some(head) = name.strip_suffix(suffix) {
            let digits = head.chars().rev().take_while(|c| c.is_ascii_digit()).count();
            let letters = &head[..head.len() - digits];
            if digits > 0 && letters.chars().all(|c| c.is_ascii_alphabetic()) {
                return var_type;
            }
        }
    }
    VariableType::Unknown
}

/// Classify a bare atom by shape. `TRUE`/`FALSE` stay symbols here; only a
/// dictionary boolean definition turns them into boolean arguments.
fn classify_atom(value: &str) -> Argument {
    if value.starts_with("0x") || value.starts_with("0X") {
        return Argument::Hex { value: value.to_string(), name: None };
    }
    if let Ok(number) = value.parse::<f64>() {
        if number.is_finite() {
            return Argument::Number { value: number, name: None };
        }
    }
    Argument::Symbol { value: value.to_string(), name: None }
}

fn compile_metadata(entries: &[MetadataEntry]) -> Option<MetadataMap> {
    non_empty_metadata(entries)
}

fn non_empty_metadata(entries: &[MetadataEntry]) -> Option<MetadataMap> {
    if entries.is_empty() {
        return None;
    }
    let mut map = MetadataMap::new();
    for entry in entries {
        map.insert(entry.key.clone(), entry.value.clone());
    }
    Some(map)
}

fn compile_models(models: &[ModelNode]) -> Option<Vec<Model>> {
    if models.is_empty() {
        return None;
    }
    Some(
        models
            .iter()
            .map(|m| Model {
                variable: m.variable.clone(),
                value: match &m.value {
                    Value::Bool(b) => ModelValue::Boolean(*b),
                    Value::Number(n) => ModelValue::Number(n.as_f64().unwrap_or(0.0)),
                    Value::String(s) => ModelValue::String(s.clone()),
                    other => ModelValue::String(other.to_string()),
                },
                offset: m.offset.clone(),
            })
            .collect(),
    )
}

/// Comment text carries descriptions with escaped quotes
fn unescape(comment: &str) -> String {
    comment.replace("\\\"", "\"")
}

fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((head, _)) if !head.is_empty() => head,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use seq_types::{DictEnum, NumericRange, RepeatSpec, Severity};
    use serde_json::json;

    fn compile_text(text: &str, dictionary: Option<&CommandDictionary>) -> CompileResult {
        let tree = parse(text);
        compile(&tree, text, dictionary, "test", &CompileOptions::default())
    }

    fn test_dictionary() -> CommandDictionary {
        let mut dict = CommandDictionary::new();
        dict.add_fsw_command(FswCommand::new(
            "DL_PACKET",
            vec![
                FswCommandArgument::Unsigned {
                    name: "apid".into(),
                    range: Some(NumericRange { min: 0.0, max: 2047.0 }),
                    default_value: None,
                },
                FswCommandArgument::Repeat {
                    name: "bundles".into(),
                    repeat: RepeatSpec {
                        min: Some(1),
                        max: Some(4),
                        arguments: vec![
                            FswCommandArgument::VarString { name: "label".into(), default_value: None },
                            FswCommandArgument::Integer {
                                name: "count".into(),
                                range: None,
                                default_value: None,
                            },
                        ],
                    },
                },
            ],
        ));
        dict.add_fsw_command(FswCommand::new(
            "SET_HEATER",
            vec![
                FswCommandArgument::Boolean { name: "enabled".into(), default_value: None },
                FswCommandArgument::Enum {
                    name: "zone".into(),
                    enum_name: "HEATER_ZONE".into(),
                    default_value: None,
                },
            ],
        ));
        dict.add_enum(DictEnum::new("HEATER_ZONE", &["PRIMARY", "BACKUP"]));
        dict
    }

    #[test]
    fn test_hardware_section_scenario() {
        let result = compile_text("@HARDWARE\nHDW_CMD\n", None);
        let value = serde_json::to_value(&result.seq).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "test",
                "metadata": {},
                "hardware_commands": [{"stem": "HDW_CMD"}]
            })
        );
    }

    #[test]
    fn test_id_falls_back_to_stripped_name() {
        let tree = parse("C CMD\n");
        let result = compile(&tree, "C CMD\n", None, "burn_12.txt", &CompileOptions::default());
        assert_eq!(result.seq.id, "burn_12");
    }

    #[test]
    fn test_explicit_id_wins() {
        let result = compile_text("@ID \"ignition\"\nC CMD\n", None);
        assert_eq!(result.seq.id, "ignition");
    }

    #[test]
    fn test_variable_type_inference() {
        assert_eq!(infer_variable_type("L01INT"), VariableType::Int);
        assert_eq!(infer_variable_type("VAR02UINT"), VariableType::Uint);
        assert_eq!(infer_variable_type("X00FLT"), VariableType::Float);
        assert_eq!(infer_variable_type("NAME03STR"), VariableType::String);
        assert_eq!(infer_variable_type("MODE00ENUM"), VariableType::Enum);
        // No digits, wrong shapes: degrade, never error
        assert_eq!(infer_variable_type("LINT"), VariableType::Unknown);
        assert_eq!(infer_variable_type("whatever"), VariableType::Unknown);
        assert_eq!(infer_variable_type("1X01INT"), VariableType::Unknown);
    }

    #[test]
    fn test_locals_and_parameters_emit_declarations() {
        let result = compile_text("@INPUT_PARAMS P01INT\n@LOCALS L01STR L02FLT\nC CMD\n", None);
        let params = result.seq.parameters.unwrap();
        assert_eq!(params, vec![VariableDeclaration::new("P01INT", VariableType::Int)]);
        let locals = result.seq.locals.unwrap();
        assert_eq!(locals.len(), 2);
        assert_eq!(locals[1].var_type, VariableType::Float);
    }

    #[test]
    fn test_lexical_argument_classification() {
        let result = compile_text("C CMD \"text\" 42 -1.5 0x1F TRUE BARE_WORD\n", None);
        let steps = result.seq.steps.unwrap();
        let args = steps[0].args();
        assert_eq!(args[0], Argument::string("text"));
        assert_eq!(args[1], Argument::number(42.0));
        assert_eq!(args[2], Argument::number(-1.5));
        assert_eq!(args[3], Argument::Hex { value: "0x1F".into(), name: None });
        // Bare TRUE stays a symbol without a dictionary boolean definition
        assert_eq!(args[4], Argument::symbol("TRUE"));
        assert_eq!(args[5], Argument::symbol("BARE_WORD"));
    }

    #[test]
    fn test_dictionary_boolean_coercion_and_names() {
        let dict = test_dictionary();
        let result = compile_text("C SET_HEATER TRUE PRIMARY\n", Some(&dict));
        assert!(!result.has_errors());
        let steps = result.seq.steps.unwrap();
        let args = steps[0].args();
        assert_eq!(
            args[0],
            Argument::Boolean { value: true, name: Some("enabled".into()) }
        );
        assert_eq!(
            args[1],
            Argument::Symbol { value: "PRIMARY".into(), name: Some("zone".into()) }
        );
    }

    #[test]
    fn test_enum_membership_is_checked() {
        let dict = test_dictionary();
        let result = compile_text("C SET_HEATER FALSE TERTIARY\n", Some(&dict));
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == codes::ARG_ENUM));
    }

    #[test]
    fn test_repeat_arity_chunking() {
        let dict = test_dictionary();
        let result = compile_text("C DL_PACKET 5 [\"bundle1\" 5 \"bundle2\" 10]\n", Some(&dict));
        let steps = result.seq.steps.unwrap();
        match &steps[0].args()[1] {
            Argument::Repeat { value, name } => {
                assert_eq!(name.as_deref(), Some("bundles"));
                assert_eq!(value.len(), 2);
                assert_eq!(
                    value[0],
                    vec![
                        Argument::String { value: "bundle1".into(), name: Some("label".into()) },
                        Argument::Number { value: 5.0, name: Some("count".into()) },
                    ]
                );
                assert_eq!(
                    value[1][0],
                    Argument::String { value: "bundle2".into(), name: Some("label".into()) }
                );
            }
            other => panic!("expected repeat, got {other:?}"),
        }
    }

    #[test]
    fn test_repeat_without_dictionary_is_one_tuple() {
        let result = compile_text("C CMD [\"a\" 1 \"b\" 2]\n", None);
        let steps = result.seq.steps.unwrap();
        match &steps[0].args()[0] {
            Argument::Repeat { value, .. } => {
                assert_eq!(value.len(), 1);
                assert_eq!(value[0].len(), 4);
            }
            other => panic!("expected repeat, got {other:?}"),
        }
    }

    #[test]
    fn test_range_violation_reported() {
        let dict = test_dictionary();
        let result = compile_text("C DL_PACKET 4096 [\"b\" 1]\n", Some(&dict));
        assert!(result.diagnostics.iter().any(|d| d.code == codes::ARG_RANGE));
    }

    #[test]
    fn test_malformed_time_keeps_step_with_unknown_tag() {
        let result = compile_text("A2024-99T00:00 FSW_CMD\n", None);
        let steps = result.seq.steps.unwrap();
        assert_eq!(
            *steps[0].time(),
            TimeTag::Absolute { tag: "UNKNOWN".into() }
        );
        assert!(result.diagnostics.iter().any(|d| d.code == codes::TIME_FORMAT));
    }

    #[test]
    fn test_unbalanced_time_warns_but_keeps_literal() {
        let result = compile_text("R00:90:00 FSW_CMD\n", None);
        assert!(!result.has_errors());
        let steps = result.seq.steps.unwrap();
        assert_eq!(
            *steps[0].time(),
            TimeTag::CommandRelative { tag: "00:90:00".into() }
        );
        let warning = result
            .diagnostics
            .iter()
            .find(|d| d.code == codes::TIME_UNBALANCED)
            .unwrap();
        assert!(warning.message.contains("01:30:00"));
    }

    #[test]
    fn test_max_range_time_is_an_error() {
        let result = compile_text("R366T00:00:00 FSW_CMD\n", None);
        assert!(result.diagnostics.iter().any(|d| d.code == codes::TIME_MAX_RANGE));
    }

    #[test]
    fn test_missing_time_tag_warns_command_complete() {
        let result = compile_text("FSW_CMD 1\n", None);
        let steps = result.seq.steps.unwrap();
        assert_eq!(*steps[0].time(), TimeTag::CommandComplete);
        assert!(result.diagnostics.iter().any(|d| d.code == codes::TIME_MISSING));
    }

    #[test]
    fn test_load_and_go_sets_lgo_metadata() {
        let result = compile_text("@LOAD_AND_GO\n@METADATA \"crew\" \"alpha\"\nC CMD\n", None);
        assert_eq!(result.seq.metadata["lgo"], json!(true));
        assert_eq!(result.seq.metadata["crew"], json!("alpha"));
        let keys: Vec<&String> = result.seq.metadata.keys().collect();
        assert_eq!(keys, ["lgo", "crew"]);
    }

    #[test]
    fn test_hardware_args_dropped_with_warning() {
        let result = compile_text("@HARDWARE\nHDW_CMD 1 2\n", None);
        let hardware = result.seq.hardware_commands.unwrap();
        assert_eq!(hardware[0].stem, "HDW_CMD");
        assert!(result.diagnostics.iter().any(|d| d.code == codes::COMPILE_HW_ARGS));
    }

    #[test]
    fn test_request_compilation() {
        let result = compile_text(
            concat!(
                "G \"MARS_LANDING\" @REQUEST_BEGIN(\"warmup\") # pre-pass\n",
                "C FSW_CMD 1\n",
                "@REQUEST_END\n",
            ),
            None,
        );
        let requests = result.seq.requests.unwrap();
        assert_eq!(requests[0].name, "warmup");
        assert_eq!(requests[0].ground_epoch.as_ref().unwrap().name, "MARS_LANDING");
        assert_eq!(requests[0].steps.len(), 1);
        assert_eq!(requests[0].description.as_deref(), Some("pre-pass"));
    }

    #[test]
    fn test_ground_epoch_missing_name_is_reported() {
        let result = compile_text("G00:30:00 @REQUEST_BEGIN(\"warm\")\n@REQUEST_END\n", None);
        assert!(result.diagnostics.iter().any(|d| d.code == codes::COMPILE_EPOCH_NAME));
    }

    #[test]
    fn test_description_from_comment_unescapes() {
        let result = compile_text("C CMD # say \\\"go\\\"\n", None);
        let steps = result.seq.steps.unwrap();
        assert_eq!(steps[0].args().len(), 0);
        match &steps[0] {
            Step::Command { description, .. } => {
                assert_eq!(description.as_deref(), Some("say \"go\""));
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_error_nodes_become_diagnostics() {
        let result = compile_text("FSW_CMD%BAR\n", None);
        let bad = result
            .diagnostics
            .iter()
            .find(|d| d.code == codes::PARSER_SYNTAX)
            .unwrap();
        assert_eq!(bad.span.unwrap().start, 7);
    }

    #[test]
    fn test_stray_attachment_reports_attach_code() {
        let result = compile_text("@ENGINE 3\nC FSW_CMD\n", None);
        let bad = result
            .diagnostics
            .iter()
            .find(|d| d.code == codes::COMPILE_ATTACH)
            .unwrap();
        assert_eq!(bad.severity, Severity::Error);
        assert!(bad.message.contains("@ENGINE"));
    }

    #[test]
    fn test_undeclared_symbol_in_numeric_position() {
        let dict = test_dictionary();
        let text = "@LOCALS L01UINT\nC DL_PACKET L01UINT [\"b\" 1]\nC DL_PACKET MYSTERY [\"b\" 1]\n";
        let result = compile_text(text, Some(&dict));
        let undeclared: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.code == codes::ARG_UNDECLARED)
            .collect();
        assert_eq!(undeclared.len(), 1);
        assert!(undeclared[0].message.contains("MYSTERY"));
    }

    #[test]
    fn test_arg_delegate_wins() {
        struct Always;
        impl ArgDelegate for Always {
            fn resolve(
                &self,
                _stem: &str,
                _index: usize,
                _raw: &ArgNode,
                _hint: Option<&FswCommandArgument>,
            ) -> Option<Argument> {
                Some(Argument::symbol("DELEGATED"))
            }
        }

        let tree = parse("C CMD 42\n");
        let options = CompileOptions { globals: Vec::new(), arg_delegate: Some(&Always) };
        let result = compile(&tree, "C CMD 42\n", None, "test", &options);
        let steps = result.seq.steps.unwrap();
        assert_eq!(steps[0].args()[0], Argument::symbol("DELEGATED"));
    }

    #[test]
    fn test_duplicate_declaration_warns() {
        let result = compile_text("@LOCALS L01INT L01INT\nC CMD\n", None);
        assert!(result.diagnostics.iter().any(|d| d.code == codes::COMPILE_DUPLICATE));
    }
}
