use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use url::Url;

use super::{ProcessRunner, arg};
use crate::extractor::error::ExtractorError;

/// `yt-dlp`-compatible segment downloader.
#[derive(Clone)]
pub struct SegmentDownloader {
    runner: Arc<dyn ProcessRunner>,
    program: String,
}

impl SegmentDownloader {
    pub const DEFAULT_PROGRAM: &'static str = "yt-dlp";

    pub fn new<S: Into<String>>(runner: Arc<dyn ProcessRunner>, program: S) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Download every segment of the local playlist at `playlist` into
    /// `destination`, authenticating with the cookie jar at `jar_path`.
    pub async fn download(
        &self,
        jar_path: &Path,
        playlist: &Path,
        destination: &Path,
    ) -> Result<(), ExtractorError> {
        let args = Self::args(jar_path, playlist, destination)?;
        self.runner.run(&self.program, &args).await
    }

    fn args(
        jar_path: &Path,
        playlist: &Path,
        destination: &Path,
    ) -> Result<Vec<OsString>, ExtractorError> {
        let playlist_url = Url::from_file_path(playlist).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("playlist path is not absolute: {}", playlist.display()),
            )
        })?;

        Ok(vec![
            arg("--cookies"),
            arg(jar_path),
            arg("-o"),
            arg(destination),
            arg("--enable-file-urls"),
            arg(playlist_url.as_str()),
        ])
    }
}

/// `ffmpeg`-compatible media tool for the final container step.
#[derive(Clone)]
pub struct MediaTool {
    runner: Arc<dyn ProcessRunner>,
    program: String,
}

impl MediaTool {
    pub const DEFAULT_PROGRAM: &'static str = "ffmpeg";

    pub fn new<S: Into<String>>(runner: Arc<dyn ProcessRunner>, program: S) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Drop any video and re-encode the audio track as MP3.
    pub async fn transcode_audio(&self, input: &Path, output: &Path) -> Result<(), ExtractorError> {
        let args = vec![
            arg("-i"),
            arg(input),
            arg("-vn"),
            arg("-c:a"),
            arg("mp3"),
            arg(output),
        ];
        self.runner.run(&self.program, &args).await
    }

    /// Stream-copy a video and an audio file into one container.
    pub async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), ExtractorError> {
        let args = vec![
            arg("-i"),
            arg(video),
            arg("-i"),
            arg(audio),
            arg("-c:v"),
            arg("copy"),
            arg("-c:a"),
            arg("copy"),
            arg(output),
        ];
        self.runner.run(&self.program, &args).await
    }
}
