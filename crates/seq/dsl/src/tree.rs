//! The syntax tree the parser produces
//!
//! The tree is a faithful, uninterpreted record of the source: time tags are
//! kept as raw literals, arguments as raw tokens, and malformed spans as
//! first-class [`ErrorNode`]s. Interpretation (time validation, dictionary
//! lookup, type classification) belongs to the compiler, which is why every
//! node here carries its byte span back into the source.

use seq_types::Span;
use serde_json::Value;

/// The parsed form of one sequence source file.
///
/// `parse` always produces a tree; for garbage input the tree is mostly
/// empty and `errors` holds the unrecognized spans.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyntaxTree {
    /// `@ID "name"`
    pub id: Option<IdNode>,
    /// `@INPUT_PARAMS` declarations in source order
    pub parameters: Vec<VariableNode>,
    /// `@LOCALS` declarations in source order
    pub locals: Vec<VariableNode>,
    /// Top-level `@METADATA` entries
    pub metadata: Vec<MetadataEntry>,
    /// Span of the `@LOAD_AND_GO` marker, when present
    pub load_and_go: Option<Span>,
    /// Time-tagged body steps
    pub steps: Vec<StepNode>,
    /// Steps in the `@IMMEDIATE` section (no time tags)
    pub immediates: Vec<StepNode>,
    /// Steps in the `@HARDWARE` section (no time tags)
    pub hardware: Vec<StepNode>,
    /// `@REQUEST_BEGIN`/`@REQUEST_END` blocks
    pub requests: Vec<RequestNode>,
    /// Malformed spans, in document order
    pub errors: Vec<ErrorNode>,
}

impl SyntaxTree {
    /// Error nodes in document order
    pub fn error_nodes(&self) -> &[ErrorNode] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// The `@ID` directive
#[derive(Clone, Debug, PartialEq)]
pub struct IdNode {
    pub name: String,
    pub span: Span,
}

/// One name in an `@INPUT_PARAMS` or `@LOCALS` list. The declared type is
/// inferred later from the name's trailing kind code.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableNode {
    pub name: String,
    pub span: Span,
}

/// One `@METADATA "key" value` entry
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataEntry {
    pub key: String,
    pub value: Value,
    pub span: Span,
}

/// One `@MODEL "variable" value "offset"` entry
#[derive(Clone, Debug, PartialEq)]
pub struct ModelNode {
    pub variable: String,
    pub value: Value,
    pub offset: String,
    pub span: Span,
}

/// A raw time tag: the single-character prefix plus its uninterpreted
/// literal. Validation happens at compile time.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeTagNode {
    /// `A<literal>`
    Absolute { literal: String, span: Span },
    /// `R<literal>`
    Relative { literal: String, span: Span },
    /// `C`
    Complete { span: Span },
    /// `E<literal>`
    Epoch { literal: String, span: Span },
    /// `G[<delta>] "name"`; the name may be missing in malformed source
    GroundEpoch { delta: Option<String>, name: Option<String>, span: Span },
}

impl TimeTagNode {
    pub fn span(&self) -> Span {
        match self {
            TimeTagNode::Absolute { span, .. }
            | TimeTagNode::Relative { span, .. }
            | TimeTagNode::Complete { span }
            | TimeTagNode::Epoch { span, .. }
            | TimeTagNode::GroundEpoch { span, .. } => *span,
        }
    }
}

/// What kind of step a line declares
#[derive(Clone, Debug, PartialEq)]
pub enum StepKindNode {
    /// A bare stem line
    Command { stem: String },
    /// `@ACTIVATE("sequence")`
    Activate { sequence: String },
    /// `@LOAD("sequence")`
    Load { sequence: String },
    /// `@GROUND_BLOCK("name")`
    GroundBlock { name: String },
    /// `@GROUND_EVENT("name")`
    GroundEvent { name: String },
}

/// One step line plus the attachment lines that followed it
#[derive(Clone, Debug, PartialEq)]
pub struct StepNode {
    pub kind: StepKindNode,
    /// Absent in the immediate and hardware sections
    pub time: Option<TimeTagNode>,
    pub args: Vec<ArgNode>,
    /// Trailing `#` comment, leading/trailing whitespace trimmed
    pub comment: Option<String>,
    pub metadata: Vec<MetadataEntry>,
    pub models: Vec<ModelNode>,
    /// `@ENGINE n`, activate/load only
    pub engine: Option<i32>,
    /// `@EPOCH "name"`, activate/load only
    pub epoch: Option<String>,
    pub span: Span,
}

impl StepNode {
    pub fn new(kind: StepKindNode, time: Option<TimeTagNode>, span: Span) -> Self {
        Self {
            kind,
            time,
            args: Vec::new(),
            comment: None,
            metadata: Vec::new(),
            models: Vec::new(),
            engine: None,
            epoch: None,
            span,
        }
    }
}

/// A raw argument token.
///
/// Classification into string/number/hex/symbol happens at compile time;
/// the parser only distinguishes quoted text, bare atoms, and bracket
/// groups. Group contents stay flat unless the source nested brackets
/// explicitly.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgNode {
    /// A quoted string, already unescaped
    Str { value: String, span: Span },
    /// A bare token: number, hex literal, symbol, or boolean word
    Atom { value: String, span: Span },
    /// A `[...]` repeat group
    Group { items: Vec<ArgNode>, span: Span },
}

impl ArgNode {
    pub fn span(&self) -> Span {
        match self {
            ArgNode::Str { span, .. } | ArgNode::Atom { span, .. } | ArgNode::Group { span, .. } => {
                *span
            }
        }
    }
}

/// A `@REQUEST_BEGIN("name") ... @REQUEST_END` block
#[derive(Clone, Debug, PartialEq)]
pub struct RequestNode {
    pub name: String,
    /// Time tag preceding `@REQUEST_BEGIN` on the same line
    pub time: Option<TimeTagNode>,
    pub steps: Vec<StepNode>,
    pub metadata: Vec<MetadataEntry>,
    pub comment: Option<String>,
    pub span: Span,
}

/// What went wrong inside an error node's span
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorNodeKind {
    /// Tokens no rule accepts
    Syntax,
    /// A stem truncated by a disallowed character
    BadStem,
    /// A directive where it cannot apply
    StrayDirective,
    /// An attachment directive (`@MODEL`, `@ENGINE`, `@EPOCH`) with no step
    /// to attach to
    Attach,
    /// Unmatched `@REQUEST_BEGIN` or `@REQUEST_END`
    Request,
}

/// An unparseable span, kept in the tree instead of aborting the parse
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorNode {
    pub kind: ErrorNodeKind,
    /// The offending source text
    pub text: String,
    pub span: Span,
    pub line: usize,
}
