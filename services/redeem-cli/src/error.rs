//! Command-line errors

use thiserror::Error;

/// Problems with interactive input.
///
/// Flag parsing errors are clap's; request failures from the API are mapped
/// to exit codes by `main`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("failed to read {0} from stdin")]
    Prompt(String),

    #[error("{prompt} must be a number, got: {answer}")]
    InvalidAnswer { prompt: String, answer: String },
}

/// Result alias using CLI Error
pub type Result<T> = std::result::Result<T, Error>;
