//! Error-tolerant parser for sequence text
//!
//! The parser is total: every input, including the empty string and binary
//! garbage, produces a [`SyntaxTree`]. Malformed spans become [`ErrorNode`]s
//! and parsing resumes at the next recognizable boundary, usually the next
//! line. Nothing here raises or panics on user input.
//!
//! The grammar is line oriented. A line is one of: a directive line, a step
//! line (optional time-tag atom, then a stem or step directive, then
//! arguments), a comment, or blank. `@METADATA` values may span lines while
//! inside brackets or braces.

use crate::lexer::{Lexer, Token, TokenKind};
use crate::tree::{
    ArgNode, ErrorNode, ErrorNodeKind, IdNode, MetadataEntry, ModelNode, RequestNode,
    StepKindNode, StepNode, SyntaxTree, TimeTagNode, VariableNode,
};
use seq_types::Span;
use serde_json::Value;

/// Parse sequence text into a syntax tree. Always returns a tree.
pub fn parse(text: &str) -> SyntaxTree {
    let tokens = Lexer::new(text).tokenize();
    Parser::new(tokens).run()
}

/// Which top-level section step lines currently land in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Body,
    Immediate,
    Hardware,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    tree: SyntaxTree,
    section: Section,
    /// The open request block, if any
    request: Option<RequestNode>,
    /// The most recent step, still accepting attachment lines
    current: Option<StepNode>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            tree: SyntaxTree::default(),
            section: Section::Body,
            request: None,
            current: None,
        }
    }

    fn run(mut self) -> SyntaxTree {
        while !self.at_eof() {
            if self.check(TokenKind::Newline) {
                self.advance();
                continue;
            }
            if self.check(TokenKind::Comment) {
                // Standalone comment line
                self.advance();
                continue;
            }
            self.parse_line();
        }

        self.flush_step();
        if let Some(request) = self.request.take() {
            self.push_error(ErrorNodeKind::Request, "@REQUEST_BEGIN", request.span, 0);
            self.tree.requests.push(request);
        }
        self.tree.errors.sort_by_key(|e| e.span.start);
        self.tree
    }

    fn parse_line(&mut self) {
        match self.peek().kind {
            TokenKind::Directive => self.parse_directive_line(),
            TokenKind::Atom => self.parse_step_line(),
            _ => self.error_to_line_end(ErrorNodeKind::Syntax),
        }
    }

    // ── Directive lines ──────────────────────────────────────────────

    fn parse_directive_line(&mut self) {
        let directive = self.advance().clone();
        match directive.text.as_str() {
            "@ID" => {
                match self.take_string() {
                    Some(name) => {
                        let span = directive.span.join(name.span);
                        self.tree.id = Some(IdNode { name: name.text, span });
                    }
                    None => self.error_to_line_end(ErrorNodeKind::Syntax),
                }
                self.finish_line();
            }
            "@INPUT_PARAMS" => {
                let vars = self.take_variable_list();
                self.tree.parameters.extend(vars);
                self.finish_line();
            }
            "@LOCALS" => {
                let vars = self.take_variable_list();
                self.tree.locals.extend(vars);
                self.finish_line();
            }
            "@METADATA" => {
                match self.parse_metadata_entry(directive.span) {
                    Some(entry) => self.attach_metadata(entry),
                    None => self.error_to_line_end(ErrorNodeKind::Syntax),
                }
                self.finish_line();
            }
            "@MODEL" => {
                self.parse_model_line(&directive);
                self.finish_line();
            }
            "@LOAD_AND_GO" => {
                self.tree.load_and_go = Some(directive.span);
                self.finish_line();
            }
            "@IMMEDIATE" => {
                self.enter_section(Section::Immediate, &directive);
            }
            "@HARDWARE" => {
                self.enter_section(Section::Hardware, &directive);
            }
            "@REQUEST_BEGIN" => {
                self.begin_request(None, &directive);
            }
            "@REQUEST_END" => {
                self.end_request(&directive);
                self.finish_line();
            }
            "@ACTIVATE" | "@LOAD" | "@GROUND_BLOCK" | "@GROUND_EVENT" => {
                self.parse_step_directive(&directive, None);
            }
            "@ENGINE" => {
                self.parse_engine_line(&directive);
                self.finish_line();
            }
            "@EPOCH" => {
                self.parse_epoch_line(&directive);
                self.finish_line();
            }
            _ => {
                self.push_error(
                    ErrorNodeKind::StrayDirective,
                    &directive.text,
                    directive.span,
                    directive.line,
                );
                self.skip_to_line_end();
            }
        }
    }

    fn enter_section(&mut self, section: Section, directive: &Token) {
        self.flush_step();
        if let Some(request) = self.request.take() {
            self.push_error(
                ErrorNodeKind::Request,
                &directive.text,
                directive.span,
                directive.line,
            );
            self.tree.requests.push(request);
        }
        self.section = section;
        self.finish_line();
    }

    fn begin_request(&mut self, time: Option<TimeTagNode>, directive: &Token) {
        self.flush_step();
        if let Some(request) = self.request.take() {
            self.push_error(
                ErrorNodeKind::Request,
                &directive.text,
                directive.span,
                directive.line,
            );
            self.tree.requests.push(request);
        }

        let name = match self.take_parenthesized_name() {
            Some(name) => name,
            None => {
                self.push_error(
                    ErrorNodeKind::Request,
                    &directive.text,
                    directive.span,
                    directive.line,
                );
                self.skip_to_line_end();
                return;
            }
        };

        let mut request = RequestNode {
            name,
            time,
            steps: Vec::new(),
            metadata: Vec::new(),
            comment: None,
            span: directive.span,
        };
        if self.check(TokenKind::Comment) {
            request.comment = Some(self.advance().text.trim().to_string());
        }
        self.request = Some(request);
        self.finish_line();
    }

    fn end_request(&mut self, directive: &Token) {
        self.flush_step();
        match self.request.take() {
            Some(mut request) => {
                request.span = request.span.join(directive.span);
                self.tree.requests.push(request);
            }
            None => self.push_error(
                ErrorNodeKind::Request,
                &directive.text,
                directive.span,
                directive.line,
            ),
        }
    }

    fn parse_model_line(&mut self, directive: &Token) {
        let variable = match self.take_string() {
            Some(token) => token.text,
            None => {
                self.error_to_line_end(ErrorNodeKind::Syntax);
                return;
            }
        };
        let value = match self.parse_scalar_value() {
            Some(value) => value,
            None => {
                self.error_to_line_end(ErrorNodeKind::Syntax);
                return;
            }
        };
        let offset = match self.take_string() {
            Some(token) => token.text,
            None => {
                self.error_to_line_end(ErrorNodeKind::Syntax);
                return;
            }
        };

        let node = ModelNode { variable, value, offset, span: directive.span };
        match self.current.as_mut() {
            Some(step) => step.models.push(node),
            None => self.push_error(
                ErrorNodeKind::Attach,
                &directive.text,
                directive.span,
                directive.line,
            ),
        }
    }

    fn parse_engine_line(&mut self, directive: &Token) {
        let engine = self
            .check(TokenKind::Atom)
            .then(|| self.advance().text.parse::<i32>().ok())
            .flatten();
        let slot = self.current.as_mut().filter(|step| {
            matches!(step.kind, StepKindNode::Activate { .. } | StepKindNode::Load { .. })
        });
        match (engine, slot) {
            (Some(engine), Some(step)) => step.engine = Some(engine),
            _ => self.push_error(
                ErrorNodeKind::Attach,
                &directive.text,
                directive.span,
                directive.line,
            ),
        }
    }

    fn parse_epoch_line(&mut self, directive: &Token) {
        let epoch = self.take_string();
        let slot = self.current.as_mut().filter(|step| {
            matches!(step.kind, StepKindNode::Activate { .. } | StepKindNode::Load { .. })
        });
        match (epoch, slot) {
            (Some(token), Some(step)) => step.epoch = Some(token.text),
            _ => self.push_error(
                ErrorNodeKind::Attach,
                &directive.text,
                directive.span,
                directive.line,
            ),
        }
    }

    // ── Step lines ───────────────────────────────────────────────────

    fn parse_step_line(&mut self) {
        let first = self.peek().clone();

        // Steps are timed in the body and inside an open request (requests
        // may follow the immediate and hardware sections); a request header
        // line is timed wherever it appears
        let timed = self.section == Section::Body
            || self.request.is_some()
            || self.line_opens_request();
        if timed {
            if let Some(tag) = self.try_time_tag(&first) {
                self.advance();
                let tag = self.complete_ground_epoch(tag);

                if self.check(TokenKind::Directive) {
                    let directive = self.advance().clone();
                    match directive.text.as_str() {
                        "@REQUEST_BEGIN" => self.begin_request(Some(tag), &directive),
                        "@ACTIVATE" | "@LOAD" | "@GROUND_BLOCK" | "@GROUND_EVENT" => {
                            self.parse_step_directive(&directive, Some(tag));
                        }
                        _ => {
                            self.push_error(
                                ErrorNodeKind::StrayDirective,
                                &directive.text,
                                directive.span,
                                directive.line,
                            );
                            self.skip_to_line_end();
                        }
                    }
                    return;
                }

                if self.check(TokenKind::Atom) {
                    let stem = self.advance().clone();
                    self.start_stem_step(stem, Some(tag));
                    return;
                }

                // A time tag with nothing to execute
                self.push_error(ErrorNodeKind::Syntax, &first.text, first.span, first.line);
                self.skip_to_line_end();
                return;
            }
        }

        // No usable time tag: the atom is the stem itself
        let stem = self.advance().clone();
        self.start_stem_step(stem, None);
    }

    /// Recognize a step directive like `@ACTIVATE("seq")` and collect its
    /// arguments
    fn parse_step_directive(&mut self, directive: &Token, time: Option<TimeTagNode>) {
        let name = match self.take_parenthesized_name() {
            Some(name) => name,
            None => {
                self.push_error(
                    ErrorNodeKind::Syntax,
                    &directive.text,
                    directive.span,
                    directive.line,
                );
                self.skip_to_line_end();
                return;
            }
        };

        let kind = match directive.text.as_str() {
            "@ACTIVATE" => StepKindNode::Activate { sequence: name },
            "@LOAD" => StepKindNode::Load { sequence: name },
            "@GROUND_BLOCK" => StepKindNode::GroundBlock { name },
            _ => StepKindNode::GroundEvent { name },
        };

        self.flush_step();
        let mut step = StepNode::new(kind, time, directive.span);
        self.collect_args(&mut step);
        self.current = Some(step);
        self.finish_line();
    }

    fn start_stem_step(&mut self, stem_token: Token, time: Option<TimeTagNode>) {
        self.flush_step();

        let (stem, remainder) = split_stem(&stem_token.text);
        let mut step = StepNode::new(
            StepKindNode::Command { stem: stem.to_string() },
            time,
            stem_token.span,
        );
        if !remainder.is_empty() {
            let start = stem_token.span.start + stem.len();
            self.push_error(
                ErrorNodeKind::BadStem,
                remainder,
                Span::new(start, stem_token.span.end),
                stem_token.line,
            );
        }

        self.collect_args(&mut step);
        self.current = Some(step);
        self.finish_line();
    }

    /// Collect argument tokens up to end of line, recording the trailing
    /// comment and turning junk into error nodes
    fn collect_args(&mut self, step: &mut StepNode) {
        while !self.at_line_end() {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Atom => {
                    self.advance();
                    step.args.push(ArgNode::Atom { value: token.text, span: token.span });
                }
                TokenKind::StringLiteral => {
                    self.advance();
                    step.args.push(ArgNode::Str { value: token.text, span: token.span });
                }
                TokenKind::OpenBracket => {
                    let group = self.parse_group();
                    step.args.push(group);
                }
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::Comment => {
                    self.advance();
                    step.comment = Some(token.text.trim().to_string());
                }
                _ => {
                    self.advance();
                    self.push_error(ErrorNodeKind::Syntax, &token.text, token.span, token.line);
                }
            }
        }
    }

    /// `[...]` on one line; nested brackets form explicit sub-groups
    fn parse_group(&mut self) -> ArgNode {
        let open = self.advance().clone();
        let mut items = Vec::new();
        let mut end = open.span.end;

        loop {
            if self.at_line_end() {
                // Unterminated group: keep what was collected
                self.push_error(ErrorNodeKind::Syntax, &open.text, open.span, open.line);
                break;
            }
            let token = self.peek().clone();
            match token.kind {
                TokenKind::CloseBracket => {
                    self.advance();
                    end = token.span.end;
                    break;
                }
                TokenKind::OpenBracket => {
                    let inner = self.parse_group();
                    end = inner.span().end;
                    items.push(inner);
                }
                TokenKind::Atom => {
                    self.advance();
                    end = token.span.end;
                    items.push(ArgNode::Atom { value: token.text, span: token.span });
                }
                TokenKind::StringLiteral => {
                    self.advance();
                    end = token.span.end;
                    items.push(ArgNode::Str { value: token.text, span: token.span });
                }
                TokenKind::Comma => {
                    self.advance();
                }
                _ => {
                    self.advance();
                    self.push_error(ErrorNodeKind::Syntax, &token.text, token.span, token.line);
                }
            }
        }

        ArgNode::Group { items, span: Span::new(open.span.start, end) }
    }

    // ── Time tags ────────────────────────────────────────────────────

    /// Interpret an atom as a time tag when it plausibly is one
    fn try_time_tag(&self, token: &Token) -> Option<TimeTagNode> {
        let text = &token.text;
        let span = token.span;
        let mut chars = text.chars();
        let prefix = chars.next()?;
        let rest = &text[prefix.len_utf8()..];

        match prefix {
            'A' if looks_like_time(rest) => {
                Some(TimeTagNode::Absolute { literal: rest.to_string(), span })
            }
            'R' if looks_like_time(rest) => {
                Some(TimeTagNode::Relative { literal: rest.to_string(), span })
            }
            'E' if looks_like_time(rest) => {
                Some(TimeTagNode::Epoch { literal: rest.to_string(), span })
            }
            'C' if rest.is_empty() => Some(TimeTagNode::Complete { span }),
            'G' if rest.is_empty() || looks_like_time(rest) => {
                // A lone `G` is only a tag when a quoted epoch name or a
                // request header follows; otherwise it is a stem
                if rest.is_empty() && !self.next_is_epoch_header() {
                    return None;
                }
                let delta = (!rest.is_empty()).then(|| rest.to_string());
                Some(TimeTagNode::GroundEpoch { delta, name: None, span })
            }
            _ => None,
        }
    }

    /// Does this line read `<tag> @REQUEST_BEGIN` or
    /// `<tag> "epoch" @REQUEST_BEGIN`?
    fn line_opens_request(&self) -> bool {
        let is_begin =
            |t: &Token| t.kind == TokenKind::Directive && t.text == "@REQUEST_BEGIN";
        match self.tokens.get(self.pos + 1) {
            Some(t) if is_begin(t) => true,
            Some(t) if t.kind == TokenKind::StringLiteral => {
                self.tokens.get(self.pos + 2).is_some_and(is_begin)
            }
            _ => false,
        }
    }

    fn next_is_epoch_header(&self) -> bool {
        matches!(
            self.tokens.get(self.pos + 1).map(|t| t.kind),
            Some(TokenKind::StringLiteral)
        ) || self
            .tokens
            .get(self.pos + 1)
            .is_some_and(|t| t.kind == TokenKind::Directive && t.text == "@REQUEST_BEGIN")
    }

    /// Pick up the quoted epoch name following a `G` tag
    fn complete_ground_epoch(&mut self, tag: TimeTagNode) -> TimeTagNode {
        match tag {
            TimeTagNode::GroundEpoch { delta, span, .. } => {
                let name = self.take_string().map(|t| t.text);
                let span = match name {
                    Some(_) => span.join(self.tokens[self.pos - 1].span),
                    None => span,
                };
                TimeTagNode::GroundEpoch { delta, name, span }
            }
            other => other,
        }
    }

    // ── Metadata values ──────────────────────────────────────────────

    fn parse_metadata_entry(&mut self, span: Span) -> Option<MetadataEntry> {
        let key = self.take_string()?;
        let value = self.parse_json_value()?;
        Some(MetadataEntry { key: key.text, value, span: span.join(key.span) })
    }

    /// A JSON-like value: string, number, boolean, array, or object.
    /// Arrays and objects may span lines.
    fn parse_json_value(&mut self) -> Option<Value> {
        match self.peek().kind {
            TokenKind::StringLiteral => Some(Value::String(self.advance().text.clone())),
            TokenKind::Atom => {
                let text = self.advance().text.clone();
                Some(atom_to_value(&text))
            }
            TokenKind::OpenBracket => self.parse_json_array(),
            TokenKind::OpenBrace => self.parse_json_object(),
            _ => None,
        }
    }

    fn parse_json_array(&mut self) -> Option<Value> {
        self.advance(); // [
        let mut items = Vec::new();
        loop {
            self.skip_soft();
            match self.peek().kind {
                TokenKind::CloseBracket => {
                    self.advance();
                    return Some(Value::Array(items));
                }
                TokenKind::Eof => return None,
                _ => items.push(self.parse_json_value()?),
            }
        }
    }

    fn parse_json_object(&mut self) -> Option<Value> {
        self.advance(); // {
        let mut map = serde_json::Map::new();
        loop {
            self.skip_soft();
            match self.peek().kind {
                TokenKind::CloseBrace => {
                    self.advance();
                    return Some(Value::Object(map));
                }
                TokenKind::StringLiteral => {
                    let key = self.advance().text.clone();
                    self.skip_soft();
                    let value = self.parse_object_value()?;
                    map.insert(key, value);
                }
                _ => return None,
            }
        }
    }

    /// The value after an object key. The lexer glues `:` into atoms, so
    /// `:1` arrives as one atom and `: 1` as a lone `:` atom followed by
    /// the value.
    fn parse_object_value(&mut self) -> Option<Value> {
        if self.check(TokenKind::Atom) {
            let text = self.peek().text.clone();
            if let Some(rest) = text.strip_prefix(':') {
                self.advance();
                if !rest.is_empty() {
                    return Some(atom_to_value(rest));
                }
                self.skip_soft();
                return self.parse_json_value();
            }
        }
        None
    }

    /// Newlines and commas between structured-value elements
    fn skip_soft(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline | TokenKind::Comma) {
            self.advance();
        }
    }

    fn parse_scalar_value(&mut self) -> Option<Value> {
        match self.peek().kind {
            TokenKind::StringLiteral => Some(Value::String(self.advance().text.clone())),
            TokenKind::Atom => {
                let text = self.advance().text.clone();
                Some(atom_to_value(&text))
            }
            _ => None,
        }
    }

    // ── Attachment and flushing ──────────────────────────────────────

    fn attach_metadata(&mut self, entry: MetadataEntry) {
        if let Some(step) = self.current.as_mut() {
            step.metadata.push(entry);
        } else if let Some(request) = self.request.as_mut() {
            request.metadata.push(entry);
        } else {
            self.tree.metadata.push(entry);
        }
    }

    fn flush_step(&mut self) {
        let Some(step) = self.current.take() else { return };
        if let Some(request) = self.request.as_mut() {
            request.steps.push(step);
            return;
        }
        match self.section {
            Section::Body => self.tree.steps.push(step),
            Section::Immediate => self.tree.immediates.push(step),
            Section::Hardware => self.tree.hardware.push(step),
        }
    }

    // ── Token plumbing ───────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        } else {
            self.pos = self.tokens.len();
        }
        &self.tokens[index]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len() || self.check(TokenKind::Eof)
    }

    fn at_line_end(&self) -> bool {
        self.at_eof() || self.check(TokenKind::Newline)
    }

    fn take_string(&mut self) -> Option<Token> {
        self.check(TokenKind::StringLiteral).then(|| self.advance().clone())
    }

    /// `("name")` after a directive
    fn take_parenthesized_name(&mut self) -> Option<String> {
        if !self.check(TokenKind::OpenParen) {
            return None;
        }
        self.advance();
        let name = self.take_string()?;
        if !self.check(TokenKind::CloseParen) {
            return None;
        }
        self.advance();
        Some(name.text)
    }

    fn take_variable_list(&mut self) -> Vec<VariableNode> {
        let mut vars = Vec::new();
        while !self.at_line_end() {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Atom => {
                    self.advance();
                    vars.push(VariableNode { name: token.text, span: token.span });
                }
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::Comment => {
                    self.advance();
                }
                _ => {
                    self.advance();
                    self.push_error(ErrorNodeKind::Syntax, &token.text, token.span, token.line);
                }
            }
        }
        vars
    }

    /// Whatever is left on the line becomes one error node
    fn error_to_line_end(&mut self, kind: ErrorNodeKind) {
        if self.at_line_end() {
            return;
        }
        let first = self.peek().clone();
        let mut span = first.span;
        let mut text = first.text.clone();
        self.advance();
        while !self.at_line_end() {
            let token = self.advance();
            span = span.join(token.span);
            text.push_str(&token.text);
        }
        self.push_error(kind, &text, span, first.line);
    }

    fn skip_to_line_end(&mut self) {
        while !self.at_line_end() {
            self.advance();
        }
    }

    /// Consume leftover tokens (usually nothing) and the newline
    fn finish_line(&mut self) {
        while !self.at_line_end() {
            let token = self.advance().clone();
            if token.kind != TokenKind::Comment {
                self.push_error(ErrorNodeKind::Syntax, &token.text, token.span, token.line);
            }
        }
        if self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    fn push_error(&mut self, kind: ErrorNodeKind, text: &str, span: Span, line: usize) {
        self.tree.errors.push(ErrorNode { kind, text: text.to_string(), span, line });
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Split a stem atom at the first character a stem cannot contain.
/// Returns the valid prefix and the rejected remainder.
fn split_stem(text: &str) -> (&str, &str) {
    for (index, c) in text.char_indices() {
        let ok = if index == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };
        if !ok {
            return text.split_at(index);
        }
    }
    (text, "")
}

/// Does this atom remainder look like time-tag material? `UNKNOWN` is the
/// compiler's fallback tag for a literal that failed validation, so it must
/// re-parse as a tag for the document to round-trip.
fn looks_like_time(rest: &str) -> bool {
    if rest == "UNKNOWN" {
        return true;
    }
    rest.chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ':'))
}

/// A bare metadata atom: boolean word, number, or plain text
fn atom_to_value(text: &str) -> Value {
    match text {
        "true" | "TRUE" => return Value::Bool(true),
        "false" | "FALSE" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = text.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(text.to_string())
}
