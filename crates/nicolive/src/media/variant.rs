use std::fmt;

use serde::{Deserialize, Serialize};

use super::Quality;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    Audio,
    Video,
}

impl Track {
    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Audio => "audio",
            Track::Video => "video",
        }
    }

    /// The path fragment the manifest producer uses for this track.
    pub(crate) fn marker(&self) -> &'static str {
        match self {
            Track::Audio => "main-audio",
            Track::Video => "main-video",
        }
    }

    /// Classify a sub-playlist url. Audio wins if both markers appear.
    pub fn classify(url: &str) -> Option<Self> {
        if url.contains(Track::Audio.marker()) {
            Some(Track::Audio)
        } else if url.contains(Track::Video.marker()) {
            Some(Track::Video)
        } else {
            None
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rendition of a track, identified by its sub-playlist url.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub url: String,
    pub track: Track,
}

impl Variant {
    pub fn new<S: Into<String>>(url: S, track: Track) -> Self {
        Self {
            url: url.into(),
            track,
        }
    }

    /// Quality derived from the tag embedded in the url, if any.
    pub fn quality(&self) -> Option<Quality> {
        Quality::detect(&self.url)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quality() {
            Some(quality) => write!(f, "{} ({}) - {}", self.track, quality, self.url),
            None => write!(f, "{} - {}", self.track, self.url),
        }
    }
}
