//! Lexer: tokenizes sequence text
//!
//! The language is line oriented, so newlines are tokens rather than
//! whitespace. Time tags, stems, and numeric literals all surface as `Atom`
//! tokens and are told apart by the parser. Characters no token class
//! claims become `Unrecognized` runs instead of failures: the lexer accepts
//! every input, including binary garbage.

use seq_types::Span;

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// Token text. Quoted strings hold their unescaped content; comments
    /// hold the text after `#`.
    pub text: String,
    /// Byte range in the source
    pub span: Span,
    /// Line number (1-based)
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span, line: usize) -> Self {
        Self { kind, text: text.into(), span, line }
    }
}

/// Token types
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// `@NAME` directive leader
    Directive,
    /// Identifier, number, or time-tag material
    Atom,
    /// Double-quoted string literal
    StringLiteral,

    // Structural
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    Comma,

    /// `#` comment running to end of line
    Comment,
    Newline,
    /// A run of characters no token class accepts
    Unrecognized,

    // End of input
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directive => write!(f, "directive"),
            Self::Atom => write!(f, "atom"),
            Self::StringLiteral => write!(f, "string literal"),
            Self::OpenBracket => write!(f, "["),
            Self::CloseBracket => write!(f, "]"),
            Self::OpenBrace => write!(f, "{{"),
            Self::CloseBrace => write!(f, "}}"),
            Self::OpenParen => write!(f, "("),
            Self::CloseParen => write!(f, ")"),
            Self::Comma => write!(f, ","),
            Self::Comment => write!(f, "comment"),
            Self::Newline => write!(f, "end of line"),
            Self::Unrecognized => write!(f, "unrecognized text"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// Lexer for sequence text
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    byte: usize,
    line: usize,
}

impl Lexer {
    /// Create a new lexer from input text
    pub fn new(input: &str) -> Self {
        Self { input: input.chars().collect(), pos: 0, byte: 0, line: 1 }
    }

    /// Tokenize the entire input. Always succeeds; the final token is `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_blank();

            if self.pos >= self.input.len() {
                tokens.push(Token::new(TokenKind::Eof, "", Span::empty(self.byte), self.line));
                break;
            }

            tokens.push(self.next_token());
        }

        tokens
    }

    fn next_token(&mut self) -> Token {
        let ch = self.input[self.pos];
        let start = self.byte;
        let line = self.line;

        let structural = |kind| (kind, ch.to_string());
        match ch {
            '\n' => {
                self.advance();
                Token::new(TokenKind::Newline, "\n", Span::new(start, self.byte), line)
            }
            '[' => self.single(structural(TokenKind::OpenBracket)),
            ']' => self.single(structural(TokenKind::CloseBracket)),
            '{' => self.single(structural(TokenKind::OpenBrace)),
            '}' => self.single(structural(TokenKind::CloseBrace)),
            '(' => self.single(structural(TokenKind::OpenParen)),
            ')' => self.single(structural(TokenKind::CloseParen)),
            ',' => self.single(structural(TokenKind::Comma)),
            '#' => self.read_comment(),
            '"' => self.read_string_literal(),
            '@' if self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic() || c == '_') => {
                self.read_directive()
            }
            c if is_atom_char(c) => self.read_atom(),
            _ => self.read_unrecognized(),
        }
    }

    fn single(&mut self, (kind, text): (TokenKind, String)) -> Token {
        let start = self.byte;
        let line = self.line;
        self.advance();
        Token::new(kind, text, Span::new(start, self.byte), line)
    }

    fn read_comment(&mut self) -> Token {
        let start = self.byte;
        let line = self.line;
        self.advance(); // skip '#'

        let mut text = String::new();
        while self.pos < self.input.len() && self.input[self.pos] != '\n' {
            text.push(self.input[self.pos]);
            self.advance();
        }

        Token::new(TokenKind::Comment, text, Span::new(start, self.byte), line)
    }

    fn read_string_literal(&mut self) -> Token {
        let start = self.byte;
        let line = self.line;
        self.advance(); // skip opening quote

        let mut text = String::new();
        while self.pos < self.input.len() && !matches!(self.input[self.pos], '"' | '\n') {
            if self.input[self.pos] == '\\' && matches!(self.peek_at(1), Some('"' | '\\')) {
                self.advance();
            }
            text.push(self.input[self.pos]);
            self.advance();
        }

        if self.pos >= self.input.len() || self.input[self.pos] == '\n' {
            // Unterminated literal: surface the raw span for an error node
            return Token::new(TokenKind::Unrecognized, text, Span::new(start, self.byte), line);
        }

        self.advance(); // skip closing quote
        Token::new(TokenKind::StringLiteral, text, Span::new(start, self.byte), line)
    }

    fn read_directive(&mut self) -> Token {
        let start = self.byte;
        let line = self.line;
        let mut text = String::new();

        text.push('@');
        self.advance();
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_alphanumeric() || self.input[self.pos] == '_')
        {
            text.push(self.input[self.pos]);
            self.advance();
        }

        Token::new(TokenKind::Directive, text, Span::new(start, self.byte), line)
    }

    fn read_atom(&mut self) -> Token {
        let start = self.byte;
        let line = self.line;
        let mut text = String::new();

        while self.pos < self.input.len() && is_atom_char(self.input[self.pos]) {
            text.push(self.input[self.pos]);
            self.advance();
        }

        Token::new(TokenKind::Atom, text, Span::new(start, self.byte), line)
    }

    fn read_unrecognized(&mut self) -> Token {
        let start = self.byte;
        let line = self.line;
        let mut text = String::new();

        // Always take at least one character so the lexer cannot stall on
        // a stray leader like a lone `@`
        text.push(self.input[self.pos]);
        self.advance();
        while self.pos < self.input.len() && !starts_known_token(self.input[self.pos]) {
            text.push(self.input[self.pos]);
            self.advance();
        }

        Token::new(TokenKind::Unrecognized, text, Span::new(start, self.byte), line)
    }

    fn skip_blank(&mut self) {
        while self.pos < self.input.len() {
            let ch = self.input[self.pos];
            if ch == '\n' {
                break;
            } else if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            if self.input[self.pos] == '\n' {
                self.line += 1;
            }
            self.byte += self.input[self.pos].len_utf8();
            self.pos += 1;
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }
}

/// Characters that glue into one `Atom`. The set covers identifiers,
/// decimal and hex literals, and time-tag material such as `R001T12:30:45`.
fn is_atom_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-' | ':')
}

fn starts_known_token(c: char) -> bool {
    c.is_whitespace()
        || is_atom_char(c)
        || matches!(c, '#' | '"' | '@' | '[' | ']' | '{' | '}' | '(' | ')' | ',')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize()
    }

    #[test]
    fn test_atoms_and_strings() {
        let tokens = lex(r#"FSW_CMD 42 "two words""#);

        assert_eq!(tokens[0].kind, TokenKind::Atom);
        assert_eq!(tokens[0].text, "FSW_CMD");
        assert_eq!(tokens[1].kind, TokenKind::Atom);
        assert_eq!(tokens[1].text, "42");
        assert_eq!(tokens[2].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[2].text, "two words");
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_time_tags_lex_as_one_atom() {
        let tokens = lex("R001T12:30:45.123 CMD");
        assert_eq!(tokens[0].text, "R001T12:30:45.123");
        assert_eq!(tokens[1].text, "CMD");

        let epoch = lex("E-00:00:01 CMD");
        assert_eq!(epoch[0].text, "E-00:00:01");
    }

    #[test]
    fn test_directive_token_keeps_leader() {
        let tokens = lex("@REQUEST_BEGIN(\"wake\")");
        assert_eq!(tokens[0].kind, TokenKind::Directive);
        assert_eq!(tokens[0].text, "@REQUEST_BEGIN");
        assert_eq!(tokens[1].kind, TokenKind::OpenParen);
        assert_eq!(tokens[2].text, "wake");
        assert_eq!(tokens[3].kind, TokenKind::CloseParen);
    }

    #[test]
    fn test_unrecognized_run_has_exact_span() {
        let tokens = lex("FSW_CMD%BAR");
        assert_eq!(tokens[0].kind, TokenKind::Atom);
        assert_eq!(tokens[1].kind, TokenKind::Unrecognized);
        assert_eq!(tokens[1].text, "%");
        assert_eq!(tokens[1].span, Span::new(7, 8));
        assert_eq!(tokens[2].kind, TokenKind::Atom);
        assert_eq!(tokens[2].text, "BAR");
        assert_eq!(tokens[2].span, Span::new(8, 11));
    }

    #[test]
    fn test_junk_characters_coalesce() {
        let tokens = lex("%%$ CMD");
        assert_eq!(tokens[0].kind, TokenKind::Unrecognized);
        assert_eq!(tokens[0].text, "%%$");
        assert_eq!(tokens[1].text, "CMD");
    }

    #[test]
    fn test_comment_token_keeps_text() {
        let tokens = lex("CMD 1 # fire the thrusters");
        assert_eq!(tokens[2].kind, TokenKind::Comment);
        assert_eq!(tokens[2].text, " fire the thrusters");
    }

    #[test]
    fn test_newlines_are_tokens() {
        let tokens = lex("A\nB");
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[2].line, 2);
    }

    #[test]
    fn test_string_escapes_unescape() {
        let tokens = lex(r#""say \"hi\" \\ back""#);
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, r#"say "hi" \ back"#);
    }

    #[test]
    fn test_unterminated_string_becomes_unrecognized() {
        let tokens = lex("\"no close\nCMD");
        assert_eq!(tokens[0].kind, TokenKind::Unrecognized);
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[2].kind, TokenKind::Atom);
        assert_eq!(tokens[2].text, "CMD");
    }

    #[test]
    fn test_empty_input() {
        let tokens = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let tokens = lex("\"héllo\" X");
        // The accented character is two bytes, so X starts at byte 9
        assert_eq!(tokens[1].text, "X");
        assert_eq!(tokens[1].span, Span::new(9, 10));
    }

    #[test]
    fn test_brackets_and_commas() {
        let tokens = lex("[a, b]");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::OpenBracket,
                TokenKind::Atom,
                TokenKind::Comma,
                TokenKind::Atom,
                TokenKind::CloseBracket,
                TokenKind::Eof,
            ]
        );
    }
}
