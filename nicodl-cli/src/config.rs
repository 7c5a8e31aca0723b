use anyhow::{Context, Result};
use nicolive_extractor::cookies::DEFAULT_COOKIE_DOMAIN;
use nicolive_extractor::extractor::{ChromeConfig, DEFAULT_UA, PageSelectors};
use nicolive_extractor::process::{MediaTool, SegmentDownloader};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "nicodl";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Domain written into cookie jars when `--domain` is not given
    pub cookie_domain: String,

    /// Seconds to wait for the page to publish its manifest
    pub manifest_timeout: u64,

    /// Element that appears once the player has rendered
    pub footer_selector: String,

    /// Play button clicked to start playback
    pub play_button_selector: String,

    /// Run the browser without a window
    pub headless: bool,

    /// Chrome/Chromium binary; auto-detected when unset
    pub browser_executable: Option<PathBuf>,

    /// Segment downloader program
    pub downloader: String,

    /// Media transcoder/muxer program
    pub media_tool: String,

    /// User agent string for requests
    pub user_agent: Option<String>,

    /// Directory for intermediate media files, the current directory when unset
    pub work_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let selectors = PageSelectors::default();
        Self {
            cookie_domain: DEFAULT_COOKIE_DOMAIN.to_string(),
            manifest_timeout: 30,
            footer_selector: selectors.footer,
            play_button_selector: selectors.play_button,
            headless: true,
            browser_executable: None,
            downloader: SegmentDownloader::DEFAULT_PROGRAM.to_string(),
            media_tool: MediaTool::DEFAULT_PROGRAM.to_string(),
            user_agent: Some(DEFAULT_UA.to_string()),
            work_dir: None,
        }
    }
}

impl AppConfig {
    /// Read `config_path` when given, where a missing file means defaults.
    /// Otherwise use confy's per-user `nicodl` file, created on first run.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Failed to parse {}", path.display()))
            }
            Some(_) => Ok(Self::default()),
            None => confy::load(APP_NAME, None).context("Failed to load nicodl configuration"),
        }
    }

    /// Location of the per-user `nicodl` file managed by confy.
    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    /// Write this configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, toml_string).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Overwrite the file used by [`load`](Self::load) with defaults and
    /// return its path.
    pub fn reset(config_path: Option<&Path>) -> Result<PathBuf> {
        let path = config_path
            .map(|p| p.to_path_buf())
            .or_else(Self::default_config_path)
            .context("No configuration path available")?;

        Self::default().save(&path)?;
        Ok(path)
    }

    /// TOML text printed by `nicodl config --show`.
    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration for display")
    }

    /// Manifest wait for this run; `--timeout` wins over the file.
    pub fn locate_timeout(&self, override_secs: Option<u64>) -> Duration {
        Duration::from_secs(override_secs.unwrap_or(self.manifest_timeout))
    }

    pub fn selectors(&self) -> PageSelectors {
        PageSelectors {
            footer: self.footer_selector.clone(),
            play_button: self.play_button_selector.clone(),
        }
    }

    pub fn chrome(&self) -> ChromeConfig {
        ChromeConfig {
            executable: self.browser_executable.clone(),
            headless: self.headless,
            user_agent: self.user_agent.clone(),
            ..ChromeConfig::default()
        }
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
