//! Why a pasted link was not queued.

use thiserror::Error;

/// Longest link accepted; anything longer is almost certainly pasted junk.
pub const MAX_URL_LENGTH: usize = 2000;

/// A link found in the input that cannot be handed to the downloader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("'{input}' is not a web link ({scheme}:); video links start with https://")]
    UnsupportedScheme { input: String, scheme: String },

    #[error("'{input}' is not a usable video link: {reason}")]
    Malformed { input: String, reason: String },

    #[error("'{input}' names no site; expected something like https://youtu.be/<id>")]
    MissingHost { input: String },

    /// Only the length is kept; echoing the text back would flood the terminal.
    #[error("skipped a {length}-character link; paste one video link per line")]
    TooLong { length: usize },
}
