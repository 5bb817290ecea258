//! Graph and similarity file readers and writers

pub mod formats;
pub mod similarity;

use thiserror::Error;

pub use formats::GraphFormat;

/// Failure while reading or writing one of the line-oriented formats
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[{format}] line {line}: {message}")]
    WrongFormat {
        format: &'static str,
        line: usize,
        message: String,
    },

    #[error("no reader accepted the input ({})", .0.join("; "))]
    NoReaderAccepted(Vec<String>),

    #[error("unknown graph file extension '{0}'")]
    UnknownExtension(String),

    #[error("[{format}] cannot write node {node}: {message}")]
    Unwritable {
        format: &'static str,
        node: usize,
        message: String,
    },
}

impl FormatError {
    pub(crate) fn wrong(format: &'static str, line: usize, message: impl Into<String>) -> Self {
        FormatError::WrongFormat {
            format,
            line,
            message: message.into(),
        }
    }
}
