//! Content references: the provider-independent identity of a title.
//!
//! A [`ContentRef`] names a piece of media by its upstream catalog identifier
//! and, for episodic media, its season and episode. Every constructor
//! validates, so a `ContentRef` in hand always satisfies its invariants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors raised while building a content reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// Identifier, kind and season/episode do not form a valid reference.
    #[error("Invalid content reference: {reason}")]
    InvalidContentRef {
        /// Why the reference was rejected
        reason: String,
    },
}

impl ContentError {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidContentRef {
            reason: reason.into(),
        }
    }
}

/// Kind of media a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    /// Single-part title
    #[serde(rename = "movie")]
    Movie,
    /// Seasoned title addressed by season and episode
    #[serde(rename = "tv")]
    Episodic,
}

impl MediaKind {
    /// Wire name used by the HTTP interface.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Episodic => "tv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" => Ok(Self::Movie),
            "tv" | "episodic" => Ok(Self::Episodic),
            other => Err(ContentError::invalid(format!(
                "unknown media type '{other}', expected 'movie' or 'tv'"
            ))),
        }
    }
}

/// Validated reference to a title in the upstream catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentRef {
    content_id: String,
    kind: MediaKind,
    season: Option<u32>,
    episode: Option<u32>,
}

impl ContentRef {
    /// Builds a reference from loose parts, enforcing that season and episode
    /// are present exactly when `kind` is episodic.
    ///
    /// # Errors
    /// - `ContentError::InvalidContentRef` - Empty identifier, a season or
    ///   episode given for a movie, a missing or zero season/episode for
    ///   episodic media.
    pub fn new(
        content_id: impl Into<String>,
        kind: MediaKind,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Result<Self, ContentError> {
        let content_id = content_id.into().trim().to_string();
        validate_content_id(&content_id)?;

        match kind {
            MediaKind::Movie => {
                if season.is_some() || episode.is_some() {
                    return Err(ContentError::invalid(
                        "movies must not carry a season or episode",
                    ));
                }
            }
            MediaKind::Episodic => match (season, episode) {
                (Some(s), Some(e)) if s >= 1 && e >= 1 => {}
                (Some(_), Some(_)) => {
                    return Err(ContentError::invalid(
                        "season and episode must both be at least 1",
                    ));
                }
                _ => {
                    return Err(ContentError::invalid(
                        "episodic media requires both a season and an episode",
                    ));
                }
            },
        }

        Ok(Self {
            content_id,
            kind,
            season,
            episode,
        })
    }

    /// Reference to a movie.
    ///
    /// # Errors
    /// - `ContentError::InvalidContentRef` - Empty or malformed identifier
    pub fn movie(content_id: impl Into<String>) -> Result<Self, ContentError> {
        Self::new(content_id, MediaKind::Movie, None, None)
    }

    /// Reference to one episode of a seasoned title.
    ///
    /// # Errors
    /// - `ContentError::InvalidContentRef` - Malformed identifier or a zero
    ///   season/episode
    pub fn episodic(
        content_id: impl Into<String>,
        season: u32,
        episode: u32,
    ) -> Result<Self, ContentError> {
        Self::new(content_id, MediaKind::Episodic, Some(season), Some(episode))
    }

    /// Re-checks the invariants. Always succeeds for values built through the
    /// constructors; kept as the facade's entry guard.
    ///
    /// # Errors
    /// - `ContentError::InvalidContentRef` - Invariants no longer hold
    pub fn validate(&self) -> Result<(), ContentError> {
        Self::new(
            self.content_id.clone(),
            self.kind,
            self.season,
            self.episode,
        )
        .map(|_| ())
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn season(&self) -> Option<u32> {
        self.season
    }

    pub fn episode(&self) -> Option<u32> {
        self.episode
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.season, self.episode) {
            (Some(s), Some(e)) => write!(f, "{}:{} S{s:02}E{e:02}", self.kind, self.content_id),
            _ => write!(f, "{}:{}", self.kind, self.content_id),
        }
    }
}

fn validate_content_id(content_id: &str) -> Result<(), ContentError> {
    if content_id.is_empty() {
        return Err(ContentError::invalid("content id must not be empty"));
    }
    if content_id.chars().any(char::is_control) {
        return Err(ContentError::invalid(
            "content id must not contain control characters",
        ));
    }
    Ok(())
}
