//! Error types shared by the core modules

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures writing the recent-books index
#[derive(Debug, Error)]
pub enum RecentsError {
    #[error("could not write recent books index {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not serialize recent books index: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures creating a new book
#[derive(Debug, Error)]
pub enum BookError {
    /// Bad user input, nothing was written
    #[error("{0}")]
    Validation(String),
    #[error("could not create {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Recents(#[from] RecentsError),
}

/// Failures of the editor session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not open {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not read {} as HTML: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: HtmlError,
    },
    #[error("could not save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("the document has no file to save to")]
    NoPath,
}

/// Malformed markup that the importer could not recover from
#[derive(Debug, Error)]
#[error("malformed HTML at byte {position}: {message}")]
pub struct HtmlError {
    pub position: u64,
    pub message: String,
}
