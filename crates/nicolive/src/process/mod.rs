//! External tools: the segment downloader and the media muxer/transcoder.

mod tools;

pub use tools::{MediaTool, SegmentDownloader};

use std::ffi::{OsStr, OsString};
use std::process::Stdio;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::extractor::error::ExtractorError;

/// Runs an external program to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Fails with [`ExtractorError::DownloadFailed`] on a non-zero exit and
    /// [`ExtractorError::Io`] if the program cannot be started.
    async fn run(&self, program: &str, args: &[OsString]) -> Result<(), ExtractorError>;
}

/// Spawns real processes, sharing this process' stdin, stdout and stderr.
///
/// Stdin stays attached so interactive prompts, such as ffmpeg asking before
/// it overwrites an existing output file, reach the user.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[OsString]) -> Result<(), ExtractorError> {
        info!(program, "Running external tool");
        debug!(program, args = ?args, "Command line");

        let status = tokio::process::Command::new(program)
            .args(args.iter().map(OsString::as_os_str))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await?;

        if !status.success() {
            return Err(ExtractorError::DownloadFailed {
                program: program.to_string(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

pub(crate) fn arg<S: AsRef<OsStr>>(value: S) -> OsString {
    value.as_ref().to_os_string()
}
