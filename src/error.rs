// Error types for the relay.
// Every failure ends the process with status 1; the Display text of each
// variant is the one-line diagnostic printed to stderr.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Broad class of a failure, used by callers that only care whether the
/// problem was the environment, the prompt or the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Input,
    Transport,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Error: GEMINI_API_KEY environment variable not set.")]
    MissingApiKey,

    #[error("Error: GEMINI_API_KEY contains characters not allowed in an HTTP header.")]
    InvalidApiKey,

    #[error("Error reading file: {}: {}", .path.display(), .source)]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error reading standard input: {0}")]
    ReadStdin(#[source] io::Error),

    #[error("Error: No prompt provided.")]
    NoPrompt,

    #[error("Error communicating with Gemini API: {0}")]
    Transport(String),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::MissingApiKey | RelayError::InvalidApiKey => ErrorKind::Configuration,
            RelayError::ReadFile { .. } | RelayError::ReadStdin(_) | RelayError::NoPrompt => {
                ErrorKind::Input
            }
            RelayError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Process exit status for this error. All failures are terminal and
    /// share the same status.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}
