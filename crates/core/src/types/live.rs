//! The id of the YouTube video currently streaming on the live page.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors parsing a [`LiveVideoId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiveVideoIdError {
    #[error("video id may only contain letters, digits, '-' and '_'")]
    InvalidCharacters,
    #[error("video id must be at most {max} characters")]
    TooLong { max: usize },
    #[error("could not find a video id in the URL")]
    UnrecognizedUrl,
}

/// A YouTube video id.
///
/// Admins paste either the bare id (`dQw4w9WgXcQ`) or a share URL; both
/// parse to the bare id. Blank input means "no live" and is handled by the
/// caller as `Option<LiveVideoId>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LiveVideoId(String);

impl LiveVideoId {
    /// Longest id accepted. YouTube ids are 11 characters today.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a bare id or a YouTube URL.
    ///
    /// Returns `Ok(None)` for blank input.
    ///
    /// # Errors
    ///
    /// Returns [`LiveVideoIdError`] when no valid id can be extracted.
    pub fn parse(input: &str) -> Result<Option<Self>, LiveVideoIdError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        let candidate = if input.contains('/') || input.contains('?') {
            extract_from_url(input).ok_or(LiveVideoIdError::UnrecognizedUrl)?
        } else {
            input
        };

        if candidate.len() > Self::MAX_LENGTH {
            return Err(LiveVideoIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(LiveVideoIdError::InvalidCharacters);
        }

        Ok(Some(Self(candidate.to_owned())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LiveVideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pull the id out of `watch?v=`, `youtu.be/`, `/live/` and `/embed/` URLs.
fn extract_from_url(url: &str) -> Option<&str> {
    if let Some((_, query)) = url.split_once('?') {
        let from_query = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("v="))
            .filter(|v| !v.is_empty());
        if from_query.is_some() {
            return from_query;
        }
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    for marker in ["youtu.be/", "/live/", "/embed/", "/shorts/"] {
        if let Some((_, rest)) = path.split_once(marker) {
            let id = rest.split('/').next().unwrap_or(rest);
            if !id.is_empty() {
                return Some(id);
            }
        }
    }
    None
}
