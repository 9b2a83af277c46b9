// crates/core/src/adapters/ytdlp.rs
//! yt-dlp downloader adapter - fetches the source and extracts its audio.

use std::ffi::OsString;
use std::path::Path;

use async_trait::async_trait;

use super::process::{run_with_progress, CommandSpec};
use super::progress::parse_download_progress;
use super::{ProcessAdapter, ProgressFn};
use crate::error::AdapterError;
use crate::source::is_supported_source;

#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    pub command: CommandSpec,
    /// Audio container passed to `--audio-format`; also the extension the
    /// adapter looks for afterwards.
    pub audio_format: String,
    /// Output file stem; the file lands at `<dir>/<stem>.<format>`.
    pub file_stem: String,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            command: CommandSpec::new("yt-dlp"),
            audio_format: "wav".to_string(),
            file_stem: "audio".to_string(),
        }
    }
}

pub struct YtDlpAdapter {
    config: YtDlpConfig,
}

impl YtDlpAdapter {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    fn args(&self, url: &str, output_dir: &Path) -> Vec<OsString> {
        let template = output_dir.join(format!("{}.%(ext)s", self.config.file_stem));
        vec![
            "--extract-audio".into(),
            "--audio-format".into(),
            self.config.audio_format.clone().into(),
            "--audio-quality".into(),
            "0".into(),
            "--newline".into(),
            "--no-playlist".into(),
            "--output".into(),
            template.into_os_string(),
            url.into(),
        ]
    }

    /// Find `<stem>.<format>` in `output_dir`.
    async fn find_output(&self, output_dir: &Path) -> Result<Option<String>, AdapterError> {
        let expected = format!("{}.{}", self.config.file_stem, self.config.audio_format);
        match tokio::fs::metadata(output_dir.join(&expected)).await {
            Ok(meta) if meta.is_file() => Ok(Some(expected)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AdapterError::filesystem(output_dir.join(expected), e)),
        }
    }
}

impl Default for YtDlpAdapter {
    fn default() -> Self {
        Self::new(YtDlpConfig::default())
    }
}

#[async_trait]
impl ProcessAdapter for YtDlpAdapter {
    async fn run(
        &self,
        input: &str,
        output_dir: &Path,
        on_progress: ProgressFn,
    ) -> Result<Vec<String>, AdapterError> {
        if !is_supported_source(input) {
            return Err(AdapterError::UnsupportedSource(input.to_string()));
        }

        let status = run_with_progress(
            "yt-dlp",
            &self.config.command,
            self.args(input, output_dir),
            parse_download_progress,
            &on_progress,
        )
        .await?;

        if !status.success() {
            return Err(AdapterError::DownloadFailed {
                code: status.code(),
            });
        }

        let file = self.find_output(output_dir).await?.ok_or(AdapterError::NoOutput)?;
        on_progress(1.0);
        Ok(vec![file])
    }

    fn name(&self) -> &str {
        "yt-dlp"
    }
}
