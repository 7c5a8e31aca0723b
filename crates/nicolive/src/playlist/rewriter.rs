use std::io;
use std::path::Path;

use futures::TryStreamExt;
use reqwest::Client;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use crate::extractor::error::ExtractorError;
use crate::process::SegmentDownloader;

/// Marker of the duplicated init-segment header some sub-playlists carry.
const INIT_MARKER: &[u8] = b"/init?q=";
/// 1-indexed line inspected for [`INIT_MARKER`].
const ANOMALY_LINE: usize = 6;
/// Last line (inclusive) of the suppressed block.
const ANOMALY_END: usize = 10;

/// Shape of a fetched sub-playlist, decided by its sixth line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaylistAnomaly {
    #[default]
    Clean,
    /// Lines 6 to 10 repeat the header and must be dropped.
    DuplicateInit,
}

impl PlaylistAnomaly {
    fn classify(sixth_line: &[u8]) -> Self {
        if sixth_line
            .windows(INIT_MARKER.len())
            .any(|window| window == INIT_MARKER)
        {
            PlaylistAnomaly::DuplicateInit
        } else {
            PlaylistAnomaly::Clean
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewriteSummary {
    pub anomaly: PlaylistAnomaly,
    pub lines_written: usize,
    pub lines_dropped: usize,
}

/// Strip one trailing `\n` or `\r\n`.
fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Copy a playlist line by line, dropping lines 6..=10 when line 6 carries
/// the duplicated init header. Every written line ends with `\n`.
///
/// Lines are handled as raw bytes, so text that is not UTF-8 passes through.
pub async fn rewrite_playlist<R, W>(mut reader: R, writer: &mut W) -> io::Result<RewriteSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = RewriteSummary::default();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = trim_line_end(&buf);
        line_no += 1;
        if line_no == ANOMALY_LINE {
            summary.anomaly = PlaylistAnomaly::classify(line);
        }

        if summary.anomaly == PlaylistAnomaly::DuplicateInit && line_no <= ANOMALY_END {
            summary.lines_dropped += 1;
            continue;
        }

        writer.write_all(line).await?;
        writer.write_all(b"\n").await?;
        summary.lines_written += 1;
    }

    writer.flush().await?;
    Ok(summary)
}

/// Repairs a variant's sub-playlist and downloads it through a
/// [`SegmentDownloader`].
pub struct PlaylistRewriter {
    client: Client,
    downloader: SegmentDownloader,
}

impl PlaylistRewriter {
    pub fn new(client: Client, downloader: SegmentDownloader) -> Self {
        Self { client, downloader }
    }

    /// Fetch `variant_url`, repair it into a private temporary playlist and
    /// download its segments into `destination`.
    ///
    /// The temporary playlist stays on disk until this call returns, i.e.
    /// for the whole run of the external downloader, and is removed on every
    /// exit path.
    pub async fn format_and_download(
        &self,
        variant_url: &str,
        jar_path: &Path,
        destination: &Path,
    ) -> Result<(), ExtractorError> {
        debug!(url = variant_url, "Fetching sub-playlist");
        let response = self
            .client
            .get(variant_url)
            .send()
            .await?
            .error_for_status()?;

        let body = StreamReader::new(Box::pin(response.bytes_stream().map_err(io::Error::other)));
        self.download_from_reader(body, jar_path, destination).await
    }

    /// Same as [`format_and_download`](Self::format_and_download) for an
    /// already opened playlist body.
    pub async fn download_from_reader<R>(
        &self,
        body: R,
        jar_path: &Path,
        destination: &Path,
    ) -> Result<(), ExtractorError>
    where
        R: AsyncBufRead + Unpin,
    {
        let temp = tempfile::Builder::new()
            .prefix("nicolive-")
            .suffix(".m3u8")
            .tempfile()?;

        let mut writer = BufWriter::new(tokio::fs::File::from_std(temp.as_file().try_clone()?));
        let summary = rewrite_playlist(body, &mut writer)
            .await
            .map_err(fetch_or_io)?;
        drop(writer);

        info!(
            anomaly = ?summary.anomaly,
            written = summary.lines_written,
            dropped = summary.lines_dropped,
            playlist = %temp.path().display(),
            "Sub-playlist prepared"
        );

        self.downloader
            .download(jar_path, temp.path(), destination)
            .await
    }
}

/// Body read errors surface as io errors; recover the transport error.
fn fetch_or_io(e: io::Error) -> ExtractorError {
    if !e.get_ref().is_some_and(|inner| inner.is::<reqwest::Error>()) {
        return ExtractorError::Io(e);
    }
    match e.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
        Some(Ok(fetch)) => ExtractorError::Fetch(*fetch),
        _ => ExtractorError::Io(io::Error::other("playlist body read failed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessRunner;
    use crate::test_support::{Route, serve};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::ffi::OsString;
    use std::path::PathBuf;
    use std::sync::Arc;
    use url::Url;

    const ANOMALOUS: &str = "\
#EXTM3U
#EXT-X-VERSION:6
#EXT-X-TARGETDURATION:5
#EXT-X-MEDIA-SEQUENCE:100
#EXT-X-MAP:URI=\"https://cdn.example/init?q=a\"
#EXT-X-MAP:URI=\"https://cdn.example/init?q=b\"
#EXT-X-VERSION:6
#EXT-X-TARGETDURATION:5
#EXT-X-MEDIA-SEQUENCE:100
#EXT-X-PROGRAM-DATE-TIME:2025-01-01T00:00:00Z
#EXTINF:5.0,
https://cdn.example/100.m4s
";

    const REPAIRED: &str = "\
#EXTM3U
#EXT-X-VERSION:6
#EXT-X-TARGETDURATION:5
#EXT-X-MEDIA-SEQUENCE:100
#EXT-X-MAP:URI=\"https://cdn.example/init?q=a\"
#EXTINF:5.0,
https://cdn.example/100.m4s
";

    const CLEAN: &str = "\
#EXTM3U
#EXT-X-VERSION:6
#EXT-X-TARGETDURATION:5
#EXT-X-MEDIA-SEQUENCE:100
#EXT-X-MAP:URI=\"https://cdn.example/init?q=a\"
#EXTINF:5.0,
https://cdn.example/100.m4s
#EXTINF:5.0,
https://cdn.example/101.m4s
";

    async fn rewrite(input: &str) -> (String, RewriteSummary) {
        let mut out = Vec::new();
        let summary = rewrite_playlist(input.as_bytes(), &mut out).await.unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    #[tokio::test]
    async fn test_drops_lines_six_to_ten_when_anomalous() {
        let (out, summary) = rewrite(ANOMALOUS).await;
        assert_eq!(out, REPAIRED);
        assert_eq!(summary.anomaly, PlaylistAnomaly::DuplicateInit);
        assert_eq!(summary.lines_dropped, 5);
        assert_eq!(summary.lines_written, 7);
    }

    #[tokio::test]
    async fn test_clean_playlist_passes_through() {
        let (out, summary) = rewrite(CLEAN).await;
        assert_eq!(out, CLEAN);
        assert_eq!(summary.anomaly, PlaylistAnomaly::Clean);
        assert_eq!(summary.lines_dropped, 0);
    }

    #[tokio::test]
    async fn test_marker_outside_line_six_is_ignored() {
        let input = "#EXTM3U\n#EXT-X-MAP:URI=\"/init?q=a\"\n3\n4\n5\n6\n7\n";
        let (out, summary) = rewrite(input).await;
        assert_eq!(out, input);
        assert_eq!(summary.anomaly, PlaylistAnomaly::Clean);
    }

    #[tokio::test]
    async fn test_short_anomalous_playlist() {
        let input = "1\n2\n3\n4\n5\n/init?q=x\n7\n";
        let (out, summary) = rewrite(input).await;
        assert_eq!(out, "1\n2\n3\n4\n5\n");
        assert_eq!(summary.lines_dropped, 2);
    }

    #[tokio::test]
    async fn test_non_utf8_lines_pass_through() {
        let input: &[u8] = b"#EXTM3U\n#EXT-X-TITLE:caf\xe9\n3\n4\n5\n#EXT-X-MAP:URI=\"/init?q=\xff\"\n7\n8\n9\n10\n11\xe9\n";
        let mut out = Vec::new();
        let summary = rewrite_playlist(input, &mut out).await.unwrap();

        assert_eq!(summary.anomaly, PlaylistAnomaly::DuplicateInit);
        assert_eq!(
            out,
            b"#EXTM3U\n#EXT-X-TITLE:caf\xe9\n3\n4\n5\n11\xe9\n".to_vec()
        );
    }

    #[tokio::test]
    async fn test_last_line_without_terminator() {
        let (out, summary) = rewrite("#EXTM3U\n#EXT-X-ENDLIST").await;
        assert_eq!(out, "#EXTM3U\n#EXT-X-ENDLIST\n");
        assert_eq!(summary.lines_written, 2);
    }

    #[tokio::test]
    async fn test_crlf_lines_are_normalized() {
        let (out, _) = rewrite("#EXTM3U\r\n#EXT-X-VERSION:6\r\n").await;
        assert_eq!(out, "#EXTM3U\n#EXT-X-VERSION:6\n");
    }

    /// Captures the playlist handed to the downloader while it still exists.
    #[derive(Default)]
    struct CapturingRunner {
        fail: bool,
        seen: Mutex<Option<(PathBuf, String)>>,
    }

    #[async_trait]
    impl ProcessRunner for CapturingRunner {
        async fn run(&self, _program: &str, args: &[OsString]) -> Result<(), ExtractorError> {
            let url = args.last().unwrap().to_string_lossy().into_owned();
            let path = Url::parse(&url).unwrap().to_file_path().unwrap();
            let content = std::fs::read_to_string(&path).unwrap();
            *self.seen.lock() = Some((path, content));

            if self.fail {
                return Err(ExtractorError::DownloadFailed {
                    program: "yt-dlp".to_string(),
                    status: "exit status: 1".to_string(),
                });
            }
            Ok(())
        }
    }

    fn rewriter(runner: Arc<CapturingRunner>) -> PlaylistRewriter {
        PlaylistRewriter::new(Client::new(), SegmentDownloader::new(runner, "yt-dlp"))
    }

    #[tokio::test]
    async fn test_temp_playlist_lives_for_the_download() {
        let runner = Arc::new(CapturingRunner::default());
        rewriter(runner.clone())
            .download_from_reader(ANOMALOUS.as_bytes(), Path::new("cookies.txt"), Path::new("out.mp4"))
            .await
            .unwrap();

        let (path, content) = runner.seen.lock().take().unwrap();
        assert_eq!(content, REPAIRED);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_temp_playlist_removed_on_failure() {
        let runner = Arc::new(CapturingRunner {
            fail: true,
            ..Default::default()
        });
        let result = rewriter(runner.clone())
            .download_from_reader(CLEAN.as_bytes(), Path::new("cookies.txt"), Path::new("out.mp4"))
            .await;

        assert!(matches!(result, Err(ExtractorError::DownloadFailed { .. })));
        let (path, _) = runner.seen.lock().take().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_format_and_download_fetches_and_repairs() {
        let base = serve(vec![Route::ok("/1Mbps/playlist.m3u8", ANOMALOUS)]).await;
        let runner = Arc::new(CapturingRunner::default());

        rewriter(runner.clone())
            .format_and_download(
                &format!("{base}/1Mbps/playlist.m3u8"),
                Path::new("cookies.txt"),
                Path::new("out.mp4"),
            )
            .await
            .unwrap();

        let (path, content) = runner.seen.lock().take().unwrap();
        assert_eq!(content, REPAIRED);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_format_and_download_error_status_is_fetch() {
        let base = serve(vec![]).await;
        let runner = Arc::new(CapturingRunner::default());

        let result = rewriter(runner.clone())
            .format_and_download(
                &format!("{base}/missing.m3u8"),
                Path::new("cookies.txt"),
                Path::new("out.mp4"),
            )
            .await;

        assert!(matches!(result, Err(ExtractorError::Fetch(_))));
        assert!(runner.seen.lock().is_none());
    }

    #[tokio::test]
    async fn test_format_and_download_truncated_body_is_fetch() {
        let base = serve(vec![Route::truncated("/cut.m3u8", CLEAN, CLEAN.len() + 512)]).await;
        let runner = Arc::new(CapturingRunner::default());

        let result = rewriter(runner.clone())
            .format_and_download(
                &format!("{base}/cut.m3u8"),
                Path::new("cookies.txt"),
                Path::new("out.mp4"),
            )
            .await;

        assert!(matches!(result, Err(ExtractorError::Fetch(_))));
        assert!(runner.seen.lock().is_none());
    }

    #[test]
    fn test_plain_io_errors_stay_io() {
        let err = fetch_or_io(io::Error::new(io::ErrorKind::InvalidData, "bad"));
        assert!(matches!(err, ExtractorError::Io(_)));
    }
}
