use crate::{
    cli::{CookieRequest, DownloadRequest, OutputMode},
    config::AppConfig,
    error::Result,
};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use nicolive_extractor::{
    CookieJar, Track, Variant,
    cookies::{encode, read_jar, write_jar},
    extractor::{
        BrowserLauncher, ChromeLauncher, ManifestLocator, create_client, parse_master, select_best,
    },
    playlist::PlaylistRewriter,
    process::{MediaTool, ProcessRunner, SegmentDownloader, SystemRunner},
};
use reqwest::Client;
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info, warn};

pub struct CommandExecutor {
    config: AppConfig,
    client: Client,
    locator: ManifestLocator,
    rewriter: PlaylistRewriter,
    media: MediaTool,
}

impl CommandExecutor {
    pub fn new(config: AppConfig) -> Result<Self> {
        let launcher: Arc<dyn BrowserLauncher> = Arc::new(ChromeLauncher::new(config.chrome()));
        let runner: Arc<dyn ProcessRunner> = Arc::new(SystemRunner);
        Self::with_parts(config, launcher, runner)
    }

    pub fn with_parts(
        config: AppConfig,
        launcher: Arc<dyn BrowserLauncher>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self> {
        let client = create_client(config.user_agent.as_deref())?;
        let locator = ManifestLocator::new(launcher).with_selectors(config.selectors());
        let rewriter = PlaylistRewriter::new(
            client.clone(),
            SegmentDownloader::new(runner.clone(), config.downloader.clone()),
        );
        let media = MediaTool::new(runner, config.media_tool.clone());

        Ok(Self {
            config,
            client,
            locator,
            rewriter,
            media,
        })
    }

    /// Convert a raw Cookie header into a Netscape jar on disk.
    pub fn save_cookies(&self, request: &CookieRequest) -> Result<()> {
        let domain = request
            .domain
            .as_deref()
            .unwrap_or(&self.config.cookie_domain);
        let filter: Vec<&str> = request.filter.iter().map(String::as_str).collect();

        let jar = encode(&request.raw, domain, &filter)?;
        write_jar(&jar, &request.output)?;

        info!(
            count = jar.len(),
            domain,
            file = %request.output.display(),
            "Cookie jar saved"
        );
        Ok(())
    }

    /// Download the best stream(s) of a watch page into the requested file.
    pub async fn download(&self, request: &DownloadRequest, timeout: Duration) -> Result<()> {
        let jar = read_jar(&request.jar)?;
        debug!(cookies = jar.len(), "Cookie jar loaded");

        let audio = TempMedia::new(self.config.work_dir(), Track::Audio);
        let best_audio = self.best_variant(request, &jar, Track::Audio, timeout).await?;
        info!(variant = %best_audio, "Downloading audio");
        self.rewriter
            .format_and_download(&best_audio.url, &request.jar, audio.path())
            .await?;

        match request.mode {
            OutputMode::AudioOnly => {
                self.media
                    .transcode_audio(audio.path(), &request.output)
                    .await?;
            }
            OutputMode::Combined => {
                let video = TempMedia::new(self.config.work_dir(), Track::Video);
                let best_video = self.best_variant(request, &jar, Track::Video, timeout).await?;
                info!(variant = %best_video, "Downloading video");
                self.rewriter
                    .format_and_download(&best_video.url, &request.jar, video.path())
                    .await?;

                self.media
                    .mux(video.path(), audio.path(), &request.output)
                    .await?;
            }
        }

        info!(file = %request.output.display(), "Download complete");
        Ok(())
    }

    /// Locate the page's manifest and pick the best variant of `track`.
    async fn best_variant(
        &self,
        request: &DownloadRequest,
        jar: &CookieJar,
        track: Track,
        timeout: Duration,
    ) -> Result<Variant> {
        let pb = self.create_progress_bar(&format!("Locating {track} manifest..."));
        let located = self.locator.locate(&request.url, jar, timeout).await;
        pb.finish_and_clear();

        let master = parse_master(&self.client, &located?).await?;
        Ok(select_best(master.into_variants(track))?)
    }

    fn create_progress_bar(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(500));
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message(message.to_string());
        pb
    }
}

/// Intermediate media file named `<unix-nanos>_<track>.mp4`, removed on drop.
struct TempMedia {
    path: PathBuf,
}

impl TempMedia {
    fn new(dir: PathBuf, track: Track) -> Self {
        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        Self {
            path: dir.join(format!("{stamp}_{track}.mp4")),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempMedia {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(file = %self.path.display(), "Removed intermediate file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(file = %self.path.display(), error = %e, "Failed to remove intermediate file"),
        }
    }
}
