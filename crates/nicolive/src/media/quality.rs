use std::fmt;

use serde::{Deserialize, Serialize};

/// Bitrate tags the manifest producer embeds in variant urls, lowest first.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quality {
    Kbps96,
    Kbps192,
    Kbps384,
    Mbps1,
    Mbps2,
    Mbps3,
}

impl Quality {
    pub const ALL: [Quality; 6] = [
        Quality::Kbps96,
        Quality::Kbps192,
        Quality::Kbps384,
        Quality::Mbps1,
        Quality::Mbps2,
        Quality::Mbps3,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Quality::Kbps96 => "96Kbps",
            Quality::Kbps192 => "192Kbps",
            Quality::Kbps384 => "384Kbps",
            Quality::Mbps1 => "1Mbps",
            Quality::Mbps2 => "2Mbps",
            Quality::Mbps3 => "3Mbps",
        }
    }

    /// Rank in `1..=6`; untagged urls rank 0.
    pub fn rank(&self) -> u8 {
        match self {
            Quality::Kbps96 => 1,
            Quality::Kbps192 => 2,
            Quality::Kbps384 => 3,
            Quality::Mbps1 => 4,
            Quality::Mbps2 => 5,
            Quality::Mbps3 => 6,
        }
    }

    /// The highest-ranked tag contained in `url`.
    pub fn detect(url: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|q| url.contains(q.tag()))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
