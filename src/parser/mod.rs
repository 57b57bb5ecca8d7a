//! Parsing of downloader output and user-supplied URLs.
//!
//! - [`progress`] - stateless decoder for the downloader's progress lines
//! - [`url`] - URL extraction from text plus playlist / video-id helpers

mod error;
pub mod progress;
pub mod url;

pub use error::{MAX_URL_LENGTH, ParseError};
pub use progress::{DEFAULT_PHASE, ProgressLine, parse_line};
pub use url::{
    build_video_url, canonical_video_url, extract_urls, extract_video_id, is_playlist_url,
};
