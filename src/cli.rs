use clap::builder::{OsStringValueParser, TypedValueParser};
use clap::Parser;
use std::path::PathBuf;

/// Send a prompt to Gemini and print the reply.
///
/// The prompt is taken from `--file` if given, otherwise from the
/// positional words, otherwise from piped standard input.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "gemini-relay", version, about, allow_negative_numbers = true)]
pub struct Cli {
    /// Path to the prompt file (an empty value counts as not given)
    #[arg(
        long,
        value_name = "PATH",
        value_parser = OsStringValueParser::new().map(PathBuf::from)
    )]
    pub file: Option<PathBuf>,

    /// Prompt text (if not using --file)
    #[arg(value_name = "PROMPT")]
    pub prompt: Vec<String>,
}
