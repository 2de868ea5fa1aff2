// Relay layer: turns one invocation (arguments, environment snapshot and
// stdin) into one model request and writes the outcome.
//
// Nothing here reads the process environment or the real stdin. The
// binary passes those in, which keeps the whole flow testable with a fake
// model and in-memory streams.

use crate::api::GeminiClient;
use crate::cli::Cli;
use crate::config::RelayConfig;
use crate::error::RelayError;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::io::{Read, Write};
use std::path::Path;

/// Something that can answer a single prompt.
pub trait ChatModel {
    fn complete(&self, prompt: &str) -> Result<String, RelayError>;
}

impl ChatModel for GeminiClient {
    /// Fresh session with empty history, one message, text of the reply.
    fn complete(&self, prompt: &str) -> Result<String, RelayError> {
        let mut chat = self.start_chat(Vec::new());
        chat.send_message(prompt)?.text()
    }
}

/// Standard input as seen by the relay.
pub struct StdinInput<R> {
    pub reader: R,
    /// True when stdin is a terminal; such input is never read.
    pub interactive: bool,
}

impl StdinInput<std::io::Stdin> {
    /// The process's real stdin.
    pub fn from_process() -> Self {
        use crossterm::tty::IsTty;

        let stdin = std::io::stdin();
        let interactive = stdin.is_tty();
        StdinInput {
            reader: stdin,
            interactive,
        }
    }
}

/// Where the prompt came from, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSource {
    File,
    Arguments,
    Stdin,
}

/// Pick the prompt text: file, then positional words, then piped stdin.
/// Sources are never combined and the text is not trimmed. An empty
/// file path counts as no file.
pub fn resolve_prompt<R: Read>(
    file: Option<&Path>,
    words: &[String],
    stdin: &mut StdinInput<R>,
) -> Result<(String, PromptSource), RelayError> {
    let file = file.filter(|p| !p.as_os_str().is_empty());
    let (text, source) = if let Some(path) = file {
        let text = std::fs::read_to_string(path).map_err(|source| RelayError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        (text, PromptSource::File)
    } else if !words.is_empty() {
        (words.join(" "), PromptSource::Arguments)
    } else if !stdin.interactive {
        let mut text = String::new();
        stdin
            .reader
            .read_to_string(&mut text)
            .map_err(RelayError::ReadStdin)?;
        (text, PromptSource::Stdin)
    } else {
        (String::new(), PromptSource::Stdin)
    };

    if text.is_empty() {
        return Err(RelayError::NoPrompt);
    }
    Ok((text, source))
}

/// Full relay flow up to, but not including, writing the outcome.
pub fn send_prompt<R, M, C>(
    cli: &Cli,
    config: &RelayConfig,
    stdin: &mut StdinInput<R>,
    connect: C,
) -> Result<String, RelayError>
where
    R: Read,
    M: ChatModel,
    C: FnOnce(&str, &RelayConfig) -> Result<M, RelayError>,
{
    let api_key = config.api_key.as_deref().ok_or(RelayError::MissingApiKey)?;

    let (prompt, source) = resolve_prompt(cli.file.as_deref(), &cli.prompt, stdin)?;
    debug!("prompt from {:?}, {} bytes", source, prompt.len());

    let model = connect(api_key, config)?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    // Drawn once; hidden when stderr is not a terminal.
    spinner.set_message("Waiting for Gemini...");
    spinner.tick();
    let result = model.complete(&prompt);
    spinner.finish_and_clear();

    result
}

/// Run one invocation and return the process exit status: 0 when the reply
/// was printed to `stdout`, 1 after a one-line diagnostic on `stderr`.
pub fn run<R, M, C, O, E>(
    cli: &Cli,
    config: &RelayConfig,
    mut stdin: StdinInput<R>,
    connect: C,
    stdout: &mut O,
    stderr: &mut E,
) -> u8
where
    R: Read,
    M: ChatModel,
    C: FnOnce(&str, &RelayConfig) -> Result<M, RelayError>,
    O: Write,
    E: Write,
{
    match send_prompt(cli, config, &mut stdin, connect) {
        Ok(text) => match writeln!(stdout, "{}", text).and_then(|_| stdout.flush()) {
            Ok(()) => 0,
            Err(e) => {
                let _ = writeln!(stderr, "Error writing response: {}", e);
                1
            }
        },
        Err(err) => {
            let _ = writeln!(stderr, "{}", err);
            err.exit_code()
        }
    }
}

/// Connector used by the binary: a real HTTP client.
pub fn connect_gemini(api_key: &str, config: &RelayConfig) -> Result<GeminiClient, RelayError> {
    GeminiClient::new(api_key, &config.api_base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    /// Records every prompt it receives and answers with a canned result.
    struct FakeModel {
        sent: Rc<RefCell<Vec<String>>>,
        reply: Result<String, String>,
    }

    impl ChatModel for FakeModel {
        fn complete(&self, prompt: &str) -> Result<String, RelayError> {
            self.sent.borrow_mut().push(prompt.to_string());
            self.reply.clone().map_err(RelayError::Transport)
        }
    }

    struct Outcome {
        code: u8,
        stdout: String,
        stderr: String,
        sent: Vec<String>,
        connected: bool,
    }

    fn config_with_key() -> RelayConfig {
        RelayConfig {
            api_key: Some("test-key".into()),
            api_base: "http://unused".into(),
        }
    }

    fn piped(text: &str) -> StdinInput<Cursor<Vec<u8>>> {
        StdinInput {
            reader: Cursor::new(text.as_bytes().to_vec()),
            interactive: false,
        }
    }

    fn terminal() -> StdinInput<Cursor<Vec<u8>>> {
        StdinInput {
            reader: Cursor::new(b"should not be read".to_vec()),
            interactive: true,
        }
    }

    fn invoke(
        cli: Cli,
        config: RelayConfig,
        stdin: StdinInput<Cursor<Vec<u8>>>,
        reply: Result<String, String>,
    ) -> Outcome {
        let sent = Rc::new(RefCell::new(Vec::new()));
        let connected = Rc::new(RefCell::new(false));
        let (sent_c, connected_c) = (sent.clone(), connected.clone());
        let connect = move |key: &str, _: &RelayConfig| {
            assert_eq!(key, "test-key");
            *connected_c.borrow_mut() = true;
            Ok::<_, RelayError>(FakeModel {
                sent: sent_c,
                reply,
            })
        };

        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run(&cli, &config, stdin, connect, &mut out, &mut err);
        let sent = sent.borrow().clone();
        let connected = *connected.borrow();
        Outcome {
            code,
            stdout: String::from_utf8(out).unwrap(),
            stderr: String::from_utf8(err).unwrap(),
            sent,
            connected,
        }
    }

    fn words(ws: &[&str]) -> Cli {
        Cli {
            file: None,
            prompt: ws.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn missing_key_fails_before_anything_else() {
        let config = RelayConfig {
            api_key: None,
            api_base: "http://unused".into(),
        };
        let out = invoke(words(&["hi"]), config, piped("x"), Ok("ok".into()));
        assert_eq!(out.code, 1);
        assert!(out.stderr.contains("GEMINI_API_KEY environment variable not set"));
        assert!(out.stdout.is_empty());
        assert!(!out.connected);
    }

    fn no_key() -> RelayConfig {
        RelayConfig {
            api_key: None,
            api_base: "http://unused".into(),
        }
    }

    #[test]
    fn missing_key_wins_over_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            file: Some(dir.path().join("nope.txt")),
            prompt: Vec::new(),
        };
        let out = invoke(cli, no_key(), piped(""), Ok("ok".into()));
        assert_eq!(out.code, 1);
        assert!(out.stderr.contains("GEMINI_API_KEY environment variable not set"));
        assert!(!out.stderr.contains("Error reading file"));
    }

    #[test]
    fn missing_key_wins_over_missing_prompt() {
        for stdin in [terminal(), piped("")] {
            let out = invoke(words(&[]), no_key(), stdin, Ok("ok".into()));
            assert_eq!(out.code, 1);
            assert!(out.stderr.contains("GEMINI_API_KEY environment variable not set"));
            assert!(!out.stderr.contains("No prompt provided"));
            assert!(!out.connected);
        }
    }

    #[test]
    fn empty_file_path_falls_through_to_words() {
        let mut stdin = terminal();
        let (text, source) =
            resolve_prompt(Some(Path::new("")), &["hello".to_string()], &mut stdin).unwrap();
        assert_eq!(text, "hello");
        assert_eq!(source, PromptSource::Arguments);

        let cli = Cli {
            file: Some(std::path::PathBuf::new()),
            prompt: vec!["a".into(), "b".into()],
        };
        let out = invoke(cli, config_with_key(), terminal(), Ok("ok".into()));
        assert_eq!(out.code, 0);
        assert_eq!(out.sent, vec!["a b".to_string()]);
    }

    #[test]
    fn empty_file_path_falls_through_to_stdin() {
        let mut stdin = piped("from stdin");
        let (text, source) = resolve_prompt(Some(Path::new("")), &[], &mut stdin).unwrap();
        assert_eq!(text, "from stdin");
        assert_eq!(source, PromptSource::Stdin);
    }

    #[test]
    fn file_contents_are_sent_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "  line one\nline two\n").unwrap();
        let cli = Cli {
            file: Some(file.path().to_path_buf()),
            prompt: vec!["ignored".into()],
        };
        let out = invoke(cli, config_with_key(), piped("also ignored"), Ok("ok".into()));
        assert_eq!(out.code, 0);
        assert_eq!(out.sent, vec!["  line one\nline two\n".to_string()]);
    }

    #[test]
    fn unreadable_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let mut stdin = piped("");
        let err = resolve_prompt(Some(missing.as_path()), &[], &mut stdin).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.to_string().starts_with("Error reading file"));

        let cli = Cli {
            file: Some(missing),
            prompt: Vec::new(),
        };
        let out = invoke(cli, config_with_key(), piped(""), Ok("ok".into()));
        assert_eq!(out.code, 1);
        assert!(!out.connected);
    }

    #[test]
    fn positional_words_are_joined_with_spaces() {
        let out = invoke(words(&["a", "b", "c"]), config_with_key(), piped("stdin"), Ok("ok".into()));
        assert_eq!(out.sent, vec!["a b c".to_string()]);
    }

    #[test]
    fn piped_stdin_is_used_last() {
        let out = invoke(words(&[]), config_with_key(), piped("hello"), Ok("ok".into()));
        assert_eq!(out.code, 0);
        assert_eq!(out.sent, vec!["hello".to_string()]);
    }

    #[test]
    fn interactive_stdin_without_args_is_a_usage_error() {
        let out = invoke(words(&[]), config_with_key(), terminal(), Ok("ok".into()));
        assert_eq!(out.code, 1);
        assert!(out.stderr.contains("No prompt provided"));
        assert!(!out.connected);
        assert!(out.sent.is_empty());
    }

    #[test]
    fn empty_sources_count_as_no_prompt() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut stdin = piped("");
        let err = resolve_prompt(Some(file.path()), &[], &mut stdin).unwrap_err();
        assert!(matches!(err, RelayError::NoPrompt));

        let err = resolve_prompt(None, &[], &mut piped("")).unwrap_err();
        assert!(matches!(err, RelayError::NoPrompt));
    }

    #[test]
    fn success_prints_reply_with_newline() {
        let out = invoke(words(&["q"]), config_with_key(), terminal(), Ok("ok".into()));
        assert_eq!(out.code, 0);
        assert_eq!(out.stdout, "ok\n");
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn api_failure_reports_and_exits_one() {
        let out = invoke(
            words(&["q"]),
            config_with_key(),
            terminal(),
            Err("quota exceeded".into()),
        );
        assert_eq!(out.code, 1);
        assert!(out.stdout.is_empty());
        assert!(out
            .stderr
            .contains("Error communicating with Gemini API: quota exceeded"));
    }

    #[test]
    fn connect_failure_is_reported() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let connect = |_: &str, _: &RelayConfig| -> Result<FakeModel, RelayError> {
            Err(RelayError::InvalidApiKey)
        };
        let code = run(&words(&["q"]), &config_with_key(), terminal(), connect, &mut out, &mut err);
        assert_eq!(code, 1);
        assert!(String::from_utf8(err).unwrap().contains("not allowed in an HTTP header"));
    }
}
