use std::io;

use thiserror::Error;

pub type MyResult<T> = Result<T, TailError>;

/// Everything that can go wrong while tailing or following a file.
#[derive(Error, Debug)]
pub enum TailError {
    #[error("{path}: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The stream is too short to hold a byte two positions before its end.
    #[error("stream of {len} byte(s) is too short to hold a line")]
    EmptyOrTooShortFile { len: u64 },

    /// The followed stream shrank under the cursor or stopped being readable.
    #[error("lost followed stream at byte {offset}: {reason}")]
    StreamLost { offset: u64, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TailError {
    pub(crate) fn lost(offset: u64, reason: impl ToString) -> Self {
        TailError::StreamLost {
            offset,
            reason: reason.to_string(),
        }
    }
}
