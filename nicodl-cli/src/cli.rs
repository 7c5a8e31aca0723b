use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{CliError, Result};

#[derive(Parser, Debug)]
#[command(
    name = "nicodl",
    about = "nicodl - download audio or video from cookie-gated live event pages",
    version,
    author,
    args_conflicts_with_subcommands = true,
    arg_required_else_help = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Watch page URL
    #[arg(short = 'u', value_name = "URL")]
    pub url: Option<String>,

    /// Netscape cookie jar created by `nicodl cookie`
    #[arg(short = 'i', value_name = "JAR")]
    pub cookies: Option<PathBuf>,

    /// Output file (.mp4, or .mp3 with -a)
    #[arg(short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Download the audio track only
    #[arg(short = 'a')]
    pub audio_only: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Seconds to wait for the page to publish its manifest
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a raw Cookie header into a Netscape cookie jar
    Cookie {
        /// Cookie header, e.g. "Cookie: a=1; b=2"
        #[arg(long, value_name = "HEADER")]
        raw: Option<String>,

        /// Cookie jar to write
        #[arg(short = 'o', value_name = "JAR")]
        output: Option<PathBuf>,

        /// Domain recorded for every cookie
        #[arg(long)]
        domain: Option<String>,

        /// Keep only the named cookie (repeatable)
        #[arg(long = "filter", value_name = "NAME")]
        filter: Vec<String>,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

/// Long options that are also accepted with a single leading dash.
const LONG_FLAGS: &[&str] = &[
    "raw", "domain", "filter", "config", "timeout", "verbose", "quiet", "show", "reset", "help",
    "version",
];

/// Rewrite single-dash long options (`-raw x`, `-raw=x`) to their `--` form.
///
/// Everything after a bare `--` is left untouched, as is the program name.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .enumerate()
        .map(|(index, arg)| {
            if index == 0 || passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            match text.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') => {
                    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
                    if LONG_FLAGS.contains(&name) {
                        OsString::from(format!("-{text}"))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}

/// How the downloaded media ends up in the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Audio track transcoded to MP3.
    AudioOnly,
    /// Best video and best audio muxed into MP4.
    Combined,
}

impl OutputMode {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputMode::AudioOnly => "mp3",
            OutputMode::Combined => "mp4",
        }
    }
}

/// A validated download invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub jar: PathBuf,
    pub output: PathBuf,
    pub mode: OutputMode,
}

impl DownloadRequest {
    pub fn from_args(args: &Args) -> Result<Self> {
        let url = required(args.url.as_deref().filter(|u| !u.is_empty()), "-u")?.to_string();
        let jar = required(non_empty_path(args.cookies.as_deref()), "-i")?.to_path_buf();
        let output = required(non_empty_path(args.output.as_deref()), "-o")?.to_path_buf();

        match Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(CliError::validation(format!("invalid watch page url: {url}"))),
        }

        let mode = if args.audio_only {
            OutputMode::AudioOnly
        } else {
            OutputMode::Combined
        };

        let extension = output.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if !extension.eq_ignore_ascii_case(mode.extension()) {
            return Err(CliError::validation(format!(
                "output file must end with .{} {}",
                mode.extension(),
                match mode {
                    OutputMode::AudioOnly => "when -a is set",
                    OutputMode::Combined => "unless -a is set",
                }
            )));
        }

        Ok(Self {
            url,
            jar,
            output,
            mode,
        })
    }
}

/// A validated `cookie` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieRequest {
    pub raw: String,
    pub output: PathBuf,
    pub domain: Option<String>,
    pub filter: Vec<String>,
}

impl CookieRequest {
    pub fn new(
        raw: Option<String>,
        output: Option<PathBuf>,
        domain: Option<String>,
        filter: Vec<String>,
    ) -> Result<Self> {
        let raw = required(raw.filter(|r| !r.trim().is_empty()), "--raw")?;
        let output = required(output.filter(|o| !o.as_os_str().is_empty()), "-o")?;
        Ok(Self {
            raw,
            output,
            domain: domain.filter(|d| !d.is_empty()),
            filter,
        })
    }
}

fn required<T>(value: Option<T>, flag: &str) -> Result<T> {
    value.ok_or_else(|| CliError::validation(format!("{flag} is required")))
}

fn non_empty_path(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}
