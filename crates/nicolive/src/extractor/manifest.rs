use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use tracing::{debug, warn};

use super::error::ExtractorError;
use crate::media::{Track, Variant};

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"https://[^"]*"#).unwrap());

/// Audio and video variants listed by a master playlist, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterPlaylist {
    pub audio: Vec<Variant>,
    pub video: Vec<Variant>,
}

impl MasterPlaylist {
    /// Classify every secure url in `body`.
    ///
    /// Only the first url of each line is considered. Urls that are neither
    /// audio nor video are logged and skipped. Fails unless both tracks have
    /// at least one variant.
    pub fn parse(body: &str) -> Result<Self, ExtractorError> {
        let mut playlist = MasterPlaylist::default();

        for line in body.lines() {
            let Some(found) = URL_REGEX.find(line) else {
                continue;
            };
            let url = found.as_str();

            match Track::classify(url) {
                Some(Track::Audio) => playlist.audio.push(Variant::new(url, Track::Audio)),
                Some(Track::Video) => playlist.video.push(Variant::new(url, Track::Video)),
                None => warn!(url, "Skipping unrecognized manifest url"),
            }
        }

        if playlist.audio.is_empty() || playlist.video.is_empty() {
            return Err(ExtractorError::NoVariants);
        }

        debug!(
            audio = playlist.audio.len(),
            video = playlist.video.len(),
            "Master playlist parsed"
        );
        Ok(playlist)
    }

    pub fn variants(&self, track: Track) -> &[Variant] {
        match track {
            Track::Audio => &self.audio,
            Track::Video => &self.video,
        }
    }

    pub fn into_variants(self, track: Track) -> Vec<Variant> {
        match track {
            Track::Audio => self.audio,
            Track::Video => self.video,
        }
    }
}

/// Fetch the master playlist at `manifest_url` and split it into variants.
pub async fn parse_master(
    client: &Client,
    manifest_url: &str,
) -> Result<MasterPlaylist, ExtractorError> {
    debug!(url = manifest_url, "Fetching master playlist");
    let body = client
        .get(manifest_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    MasterPlaylist::parse(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Route, serve};

    const MASTER: &str = r#"#EXTM3U
#EXT-X-VERSION:6
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio",NAME="main",URI="https://cdn.example/main-audio/192Kbps/playlist.m3u8?ht2=1"
#EXT-X-STREAM-INF:BANDWIDTH=3000000,AUDIO="audio"
https://cdn.example/main-video/3Mbps/playlist.m3u8?ht2=1
#EXT-X-SESSION-DATA:DATA-ID="thumbnail",URI="https://cdn.example/thumbnail.jpg"
"#;

    #[test]
    fn test_parse_classifies_variants() {
        let playlist = MasterPlaylist::parse(MASTER).unwrap();

        assert_eq!(
            playlist.audio,
            vec![Variant::new(
                "https://cdn.example/main-audio/192Kbps/playlist.m3u8?ht2=1",
                Track::Audio
            )]
        );
        assert_eq!(
            playlist.video,
            vec![Variant::new(
                "https://cdn.example/main-video/3Mbps/playlist.m3u8?ht2=1",
                Track::Video
            )]
        );
    }

    #[test]
    fn test_parse_keeps_document_order_and_duplicates() {
        let body = "\
https://cdn.example/main-audio/96Kbps/a.m3u8
https://cdn.example/main-video/1Mbps/v.m3u8
https://cdn.example/main-audio/384Kbps/a.m3u8
https://cdn.example/main-audio/96Kbps/a.m3u8
";
        let playlist = MasterPlaylist::parse(body).unwrap();
        let urls: Vec<_> = playlist.audio.iter().map(|v| v.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example/main-audio/96Kbps/a.m3u8",
                "https://cdn.example/main-audio/384Kbps/a.m3u8",
                "https://cdn.example/main-audio/96Kbps/a.m3u8",
            ]
        );
        assert_eq!(playlist.variants(Track::Video).len(), 1);
    }

    #[test]
    fn test_parse_requires_both_tracks() {
        let audio_only = "https://cdn.example/main-audio/192Kbps/a.m3u8\n";
        assert!(matches!(
            MasterPlaylist::parse(audio_only),
            Err(ExtractorError::NoVariants)
        ));
        assert!(matches!(
            MasterPlaylist::parse("#EXTM3U\n"),
            Err(ExtractorError::NoVariants)
        ));
    }

    #[tokio::test]
    async fn test_parse_master_over_http() {
        let body = format!("{MASTER}#EXT-X-SESSION-DATA:URI=\"https://cdn.example/poster.png\"\n");
        let base = serve(vec![Route::ok("/master.m3u8", body)]).await;

        let playlist = parse_master(&Client::new(), &format!("{base}/master.m3u8"))
            .await
            .unwrap();

        assert_eq!(playlist.audio.len(), 1);
        assert_eq!(playlist.video.len(), 1);
        assert_eq!(playlist.audio[0].track, Track::Audio);
        assert_eq!(playlist.video[0].track, Track::Video);
    }

    #[tokio::test]
    async fn test_parse_master_rejects_error_status() {
        let base = serve(vec![Route::status("/gone.m3u8", 403)]).await;

        let missing = parse_master(&Client::new(), &format!("{base}/absent.m3u8")).await;
        assert!(matches!(missing, Err(ExtractorError::Fetch(_))));

        let forbidden = parse_master(&Client::new(), &format!("{base}/gone.m3u8")).await;
        assert!(matches!(forbidden, Err(ExtractorError::Fetch(_))));
    }

    #[test]
    fn test_parse_ignores_plain_http() {
        let body = "http://cdn.example/main-audio/a.m3u8\nhttps://cdn.example/main-video/v.m3u8\n";
        assert!(matches!(
            MasterPlaylist::parse(body),
            Err(ExtractorError::NoVariants)
        ));
    }
}
