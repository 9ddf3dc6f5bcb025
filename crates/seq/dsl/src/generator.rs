//! Generator: canonical document back to sequence text
//!
//! Deterministic section order: `@ID`, `@INPUT_PARAMS`, `@LOCALS`, header
//! metadata (with an `lgo: true` entry rendered as `@LOAD_AND_GO` in place),
//! a blank line, body steps, the `@IMMEDIATE` and `@HARDWARE` sections, and
//! finally request blocks. Compiling the generated text reproduces the
//! document, modulo dictionary-dependent formatting quirks.

use crate::validator::format_number;
use seq_types::{
    Argument, Diagnostic, HardwareCommand, ImmediateCommand, MetadataMap, Model, ModelValue,
    Request, SeqDocument, Step, TimeTag, VariableDeclaration,
};
use serde_json::Value;

/// A caller-supplied lint over generated lines, injected at call time so
/// generation stays re-entrant
pub trait OutputLint {
    /// Inspect one finished output line (1-based numbering)
    fn check(&self, line: &str, number: usize) -> Vec<Diagnostic>;
}

/// Render a document as sequence text
pub fn generate(doc: &SeqDocument) -> String {
    Generator::default().render(doc)
}

/// Render a document and run a line lint over the output
pub fn generate_with_lint(doc: &SeqDocument, lint: &dyn OutputLint) -> (String, Vec<Diagnostic>) {
    let text = generate(doc);
    let diagnostics = text
        .lines()
        .enumerate()
        .flat_map(|(index, line)| lint.check(line, index + 1))
        .collect();
    (text, diagnostics)
}

#[derive(Default)]
struct Generator {
    out: String,
}

impl Generator {
    fn render(mut self, doc: &SeqDocument) -> String {
        self.line(format!("@ID {}", quoted(&doc.id)));
        if let Some(parameters) = &doc.parameters {
            self.variable_list("@INPUT_PARAMS", parameters);
        }
        if let Some(locals) = &doc.locals {
            self.variable_list("@LOCALS", locals);
        }
        self.header_metadata(&doc.metadata);
        self.out.push('\n');

        if let Some(steps) = &doc.steps {
            for step in steps {
                self.step(step);
            }
        }

        if let Some(immediates) = &doc.immediate_commands {
            self.line("@IMMEDIATE".to_string());
            for command in immediates {
                self.immediate(command);
            }
        }

        if let Some(hardware) = &doc.hardware_commands {
            self.line("@HARDWARE".to_string());
            for command in hardware {
                self.hardware(command);
            }
        }

        if let Some(requests) = &doc.requests {
            for request in requests {
                self.request(request);
            }
        }

        self.out
    }

    fn line(&mut self, text: String) {
        self.out.push_str(&text);
        self.out.push('\n');
    }

    fn variable_list(&mut self, directive: &str, vars: &[VariableDeclaration]) {
        let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
        self.line(format!("{directive} {}", names.join(" ")));
    }

    fn header_metadata(&mut self, metadata: &MetadataMap) {
        for (key, value) in metadata {
            if key == "lgo" && *value == Value::Bool(true) {
                self.line("@LOAD_AND_GO".to_string());
            } else {
                self.metadata_entry(key, value);
            }
        }
    }

    fn metadata_entry(&mut self, key: &str, value: &Value) {
        self.line(format!("@METADATA {} {}", quoted(key), render_value(value)));
    }

    // ── Steps ────────────────────────────────────────────────────────

    fn step(&mut self, step: &Step) {
        match step {
            Step::Command { stem, args, time, description, metadata, models } => {
                let mut line = format!("{} {stem}", time_prefix(time));
                line.push_str(&render_args(args));
                line.push_str(&render_comment(description));
                self.line(line);
                self.attachments(metadata, models);
            }
            Step::Activate { sequence, engine, epoch, args, time, description, metadata, models } => {
                self.sub_sequence("@ACTIVATE", sequence, *engine, epoch, args, time, description);
                self.attachments(metadata, models);
            }
            Step::Load { sequence, engine, epoch, args, time, description, metadata, models } => {
                self.sub_sequence("@LOAD", sequence, *engine, epoch, args, time, description);
                self.attachments(metadata, models);
            }
            Step::GroundBlock { name, args, time, description, metadata, models } => {
                self.ground("@GROUND_BLOCK", name, args, time, description);
                self.attachments(metadata, models);
            }
            Step::GroundEvent { name, args, time, description, metadata, models } => {
                self.ground("@GROUND_EVENT", name, args, time, description);
                self.attachments(metadata, models);
            }
        }
    }

    fn sub_sequence(
        &mut self,
        directive: &str,
        sequence: &str,
        engine: Option<i32>,
        epoch: &Option<String>,
        args: &[Argument],
        time: &TimeTag,
        description: &Option<String>,
    ) {
        let mut line = format!("{} {directive}({})", time_prefix(time), quoted(sequence));
        line.push_str(&render_args(args));
        line.push_str(&render_comment(description));
        self.line(line);
        if let Some(engine) = engine {
            self.line(format!("@ENGINE {engine}"));
        }
        if let Some(epoch) = epoch {
            self.line(format!("@EPOCH {}", quoted(epoch)));
        }
    }

    fn ground(
        &mut self,
        directive: &str,
        name: &str,
        args: &[Argument],
        time: &TimeTag,
        description: &Option<String>,
    ) {
        let mut line = format!("{} {directive}({})", time_prefix(time), quoted(name));
        line.push_str(&render_args(args));
        line.push_str(&render_comment(description));
        self.line(line);
    }

    fn attachments(&mut self, metadata: &Option<MetadataMap>, models: &Option<Vec<Model>>) {
        if let Some(metadata) = metadata {
            for (key, value) in metadata {
                self.metadata_entry(key, value);
            }
        }
        if let Some(models) = models {
            for model in models {
                let value = match &model.value {
                    ModelValue::String(s) => quoted(s),
                    ModelValue::Number(n) => format_number(*n),
                    ModelValue::Boolean(b) => b.to_string(),
                };
                self.line(format!(
                    "@MODEL {} {value} {}",
                    quoted(&model.variable),
                    quoted(&model.offset)
                ));
            }
        }
    }

    fn immediate(&mut self, command: &ImmediateCommand) {
        let mut line = command.stem.clone();
        line.push_str(&render_args(&command.args));
        line.push_str(&render_comment(&command.description));
        self.line(line);
        self.attachments(&command.metadata, &None);
    }

    fn hardware(&mut self, command: &HardwareCommand) {
        let mut line = command.stem.clone();
        line.push_str(&render_comment(&command.description));
        self.line(line);
        self.attachments(&command.metadata, &None);
    }

    fn request(&mut self, request: &Request) {
        let mut line = String::new();
        if let Some(epoch) = &request.ground_epoch {
            line.push('G');
            if let Some(delta) = &epoch.delta {
                line.push_str(delta);
            }
            line.push_str(&format!(" {} ", quoted(&epoch.name)));
        } else if let Some(time) = &request.time {
            line.push_str(&format!("{} ", time_prefix(time)));
        }
        line.push_str(&format!("@REQUEST_BEGIN({})", quoted(&request.name)));
        line.push_str(&render_comment(&request.description));
        self.line(line);

        if let Some(metadata) = &request.metadata {
            for (key, value) in metadata {
                self.metadata_entry(key, value);
            }
        }
        for step in &request.steps {
            self.step(step);
        }
        self.line("@REQUEST_END".to_string());
    }
}

// ── Rendering helpers ────────────────────────────────────────────────

fn time_prefix(time: &TimeTag) -> String {
    match time {
        TimeTag::Absolute { tag } => format!("A{tag}"),
        TimeTag::CommandComplete => "C".to_string(),
        TimeTag::CommandRelative { tag } => format!("R{tag}"),
        TimeTag::EpochRelative { tag } => format!("E{tag}"),
    }
}

fn render_args(args: &[Argument]) -> String {
    let mut out = String::new();
    for arg in args {
        out.push(' ');
        out.push_str(&render_arg(arg));
    }
    out
}

fn render_arg(arg: &Argument) -> String {
    match arg {
        Argument::Boolean { value, .. } => if *value { "TRUE" } else { "FALSE" }.to_string(),
        Argument::Number { value, .. } => format_number(*value),
        Argument::Hex { value, .. } => value.clone(),
        Argument::String { value, .. } => quoted(value),
        Argument::Symbol { value, .. } => value.clone(),
        Argument::Repeat { value, .. } => {
            // Flat rendering; re-grouping on the way back in is the
            // dictionary arity's job
            let items: Vec<String> = value
                .iter()
                .flat_map(|tuple| tuple.iter().map(render_arg))
                .collect();
            format!("[{}]", items.join(" "))
        }
    }
}

fn render_comment(description: &Option<String>) -> String {
    match description {
        Some(text) => format!(" # {}", text.replace('"', "\\\"")),
        None => String::new(),
    }
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Metadata values: scalars inline, structured values pretty-printed
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => quoted(s),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        structured => serde_json::to_string_pretty(structured).unwrap_or_else(|_| "null".into()),
    }
}
