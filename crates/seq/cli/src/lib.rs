//! seqc - command-line front end for the sequence toolchain
//!
//! Three subcommands over the pure core:
//! - `compile`: sequence text to canonical JSON, diagnostics on stderr
//! - `generate`: canonical JSON back to sequence text
//! - `check`: diagnostics only, as text or JSON

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use seq_dsl::CompileOptions;
use seq_types::{CommandDictionary, Diagnostic, SeqDocument, Severity};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod error;

pub use error::{CliError, CliResult};

/// seqc CLI application
#[derive(Parser)]
#[command(name = "seqc")]
#[command(about = "Spacecraft command sequence toolchain", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Compile sequence text into canonical JSON
    Compile {
        /// Sequence source file
        file: PathBuf,

        /// Command dictionary JSON for argument resolution
        #[arg(short, long)]
        dictionary: Option<PathBuf>,

        /// Sequence id when the source has no @ID directive
        #[arg(short, long)]
        name: Option<String>,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render canonical JSON back into sequence text
    Generate {
        /// Canonical sequence JSON file
        file: PathBuf,

        /// Write text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report diagnostics without emitting a document
    Check {
        /// Sequence source file
        file: PathBuf,

        /// Command dictionary JSON for argument resolution
        #[arg(short, long)]
        dictionary: Option<PathBuf>,

        /// Diagnostic output format
        #[arg(short, long, default_value = "text")]
        format: DiagnosticFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DiagnosticFormat {
    Text,
    Json,
}

/// Run using the current process arguments.
pub fn run() -> CliResult<()> {
    run_with_args(std::env::args_os())
}

/// Run using the provided argument iterator.
pub fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .try_init()
        .ok();

    match cli.command {
        Commands::Compile { file, dictionary, name, output } => {
            compile_file(&file, dictionary.as_deref(), name.as_deref(), output.as_deref())
        }
        Commands::Generate { file, output } => generate_file(&file, output.as_deref()),
        Commands::Check { file, dictionary, format } => {
            check_file(&file, dictionary.as_deref(), format)
        }
    }
}

fn compile_file(
    file: &Path,
    dictionary: Option<&Path>,
    name: Option<&str>,
    output: Option<&Path>,
) -> CliResult<()> {
    let result = run_compile(file, dictionary, name)?;

    for diagnostic in &result.diagnostics {
        eprintln!("{}", render_diagnostic(diagnostic));
    }

    let json = serde_json::to_string_pretty(&result.seq)?;
    emit(&json, output)?;

    let errors = result.diagnostics.iter().filter(|d| d.is_error()).count();
    if errors > 0 {
        return Err(CliError::Failed(errors));
    }
    Ok(())
}

fn generate_file(file: &Path, output: Option<&Path>) -> CliResult<()> {
    let json = fs::read_to_string(file)?;
    let doc: SeqDocument = serde_json::from_str(&json)?;
    emit(&seq_dsl::generate(&doc), output)
}

fn check_file(file: &Path, dictionary: Option<&Path>, format: DiagnosticFormat) -> CliResult<()> {
    let result = run_compile(file, dictionary, None)?;

    match format {
        DiagnosticFormat::Text => {
            for diagnostic in &result.diagnostics {
                println!("{}", render_diagnostic(diagnostic));
            }
            if result.diagnostics.is_empty() {
                println!("{}", "no diagnostics".green());
            }
        }
        DiagnosticFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result.diagnostics)?);
        }
    }

    let errors = result.diagnostics.iter().filter(|d| d.is_error()).count();
    if errors > 0 {
        return Err(CliError::Failed(errors));
    }
    Ok(())
}

fn run_compile(
    file: &Path,
    dictionary: Option<&Path>,
    name: Option<&str>,
) -> CliResult<seq_dsl::CompileResult> {
    let text = fs::read_to_string(file)?;
    let dictionary = match dictionary {
        Some(path) => {
            let dict = CommandDictionary::from_json(&fs::read_to_string(path)?)?;
            tracing::debug!(
                fsw_commands = dict.fsw_command_map.len(),
                hw_commands = dict.hw_command_map.len(),
                "loaded command dictionary"
            );
            Some(dict)
        }
        None => None,
    };

    let fallback = name
        .map(str::to_string)
        .unwrap_or_else(|| file_stem(file));
    let tree = seq_dsl::parse(&text);
    let result = seq_dsl::compile(
        &tree,
        &text,
        dictionary.as_ref(),
        &fallback,
        &CompileOptions::default(),
    );
    Ok(result)
}

fn file_stem(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sequence".to_string())
}

fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    let severity = match diagnostic.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Info => "info".cyan(),
    };
    match diagnostic.span {
        Some(span) => format!(
            "{severity} [{}] {} ({})",
            diagnostic.code.dimmed(),
            diagnostic.message,
            span
        ),
        None => format!("{severity} [{}] {}", diagnostic.code.dimmed(), diagnostic.message),
    }
}

fn emit(text: &str, output: Option<&Path>) -> CliResult<()> {
    match output {
        Some(path) => fs::write(path, text)?,
        None => println!("{text}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_keeps_extension_for_fallback_identity() {
        // The compiler strips the extension itself; the CLI passes the
        // full file name through
        assert_eq!(file_stem(Path::new("/tmp/burn_12.txt")), "burn_12.txt");
    }

    #[test]
    fn test_render_diagnostic_includes_code_and_span() {
        colored::control::set_override(false);
        let diagnostic = Diagnostic::error(
            seq_types::codes::TIME_FORMAT,
            "malformed absolute time",
            Some(seq_types::Span::new(0, 4)),
        );
        let rendered = render_diagnostic(&diagnostic);
        assert!(rendered.contains("T001"));
        assert!(rendered.contains("0..4"));
    }
}
