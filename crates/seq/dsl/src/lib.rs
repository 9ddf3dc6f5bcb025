//! Sequence language front end
//!
//! The textual command-sequence DSL and its transforms:
//!
//! - [`parse`]: text to syntax tree, error tolerant and total
//! - [`compile`]: syntax tree to canonical [`SeqDocument`], resolving
//!   arguments against an optional command dictionary
//! - [`generate`]: canonical document back to text, deterministically
//! - [`validator`]: per-kind argument validation and defaulting
//!
//! All entry points are pure, synchronous functions over immutable inputs;
//! diagnostics travel as data and nothing aborts on malformed input.
//!
//! ```
//! use seq_dsl::{compile, parse, CompileOptions};
//!
//! let text = "@ID \"demo\"\nC FSW_CMD 42\n";
//! let tree = parse(text);
//! let result = compile(&tree, text, None, "demo", &CompileOptions::default());
//! assert_eq!(result.seq.id, "demo");
//! ```

#![deny(unsafe_code)]

pub mod compiler;
pub mod generator;
pub mod lexer;
pub mod parser;
pub mod tree;
pub mod validator;

pub use compiler::{compile, ArgDelegate, CompileOptions, CompileResult};
pub use generator::{generate, generate_with_lint, OutputLint};
pub use parser::parse;
pub use tree::{ErrorNode, ErrorNodeKind, SyntaxTree};

#[doc(inline)]
pub use seq_types::SeqDocument;
