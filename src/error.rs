use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions that abort a merge run.
///
/// Identifier mismatches and streams running out early are not errors; they
/// only suppress output and are counted in the run summary.
#[derive(Error, Debug)]
pub enum UmiTransError {
    #[error("Badly formed record {position} in {stream}: {content}")]
    MalformedRecord {
        stream: String,
        position: u64,
        content: String,
    },

    #[error("Could not open {}", .path.display())]
    StreamOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read record {position} from {stream}")]
    Read {
        stream: String,
        position: u64,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write to {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl UmiTransError {
    /// Label of the stream responsible for the error, when there is one.
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::MalformedRecord { stream, .. } | Self::Read { stream, .. } => {
                Some(stream.as_str())
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, UmiTransError>;
