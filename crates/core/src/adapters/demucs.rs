// crates/core/src/adapters/demucs.rs
//! Demucs source-separation adapter.
//!
//! Demucs writes stems to `<out>/<model>/<track>/<stem>.wav`. The adapter
//! moves them up into the job directory and drops the tool's subtree before
//! resolving, so callers only ever see flat filenames.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::process::{run_with_progress, CommandSpec};
use super::progress::parse_separation_progress;
use super::{ProcessAdapter, ProgressFn};
use crate::error::AdapterError;
use crate::layout::{list_subdirs, remove_tree};

#[derive(Debug, Clone)]
pub struct DemucsConfig {
    pub command: CommandSpec,
    /// Pretrained model passed to `-n`; also the output subdirectory name.
    pub model: String,
    /// Extension of the stem files demucs produces.
    pub stem_extension: String,
}

impl Default for DemucsConfig {
    fn default() -> Self {
        Self {
            command: CommandSpec::new("python").with_args(["-m", "demucs"]),
            model: "htdemucs".to_string(),
            stem_extension: "wav".to_string(),
        }
    }
}

pub struct DemucsAdapter {
    config: DemucsConfig,
}

impl DemucsAdapter {
    pub fn new(config: DemucsConfig) -> Self {
        Self { config }
    }

    fn args(&self, audio_path: &str, output_dir: &Path) -> Vec<OsString> {
        vec![
            "--out".into(),
            output_dir.as_os_str().to_owned(),
            "-n".into(),
            self.config.model.clone().into(),
            audio_path.into(),
        ]
    }

    /// Move the produced stems from the model's track directory into
    /// `output_dir`, returning their names sorted.
    async fn relocate_stems(&self, output_dir: &Path) -> Result<Vec<String>, AdapterError> {
        let model_dir = output_dir.join(&self.config.model);
        let track_dirs = match list_subdirs(&model_dir).await {
            Ok(dirs) => dirs,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AdapterError::NoStems),
            Err(e) => return Err(AdapterError::filesystem(model_dir, e)),
        };
        let Some((_, track_dir)) = track_dirs.into_iter().next() else {
            return Err(AdapterError::NoStems);
        };

        let stems = self.stem_files(&track_dir).await?;
        if stems.is_empty() {
            return Err(AdapterError::NoStems);
        }

        for (name, src) in &stems {
            let dest = output_dir.join(name);
            tokio::fs::rename(src, &dest)
                .await
                .map_err(|e| AdapterError::filesystem(dest, e))?;
        }

        if let Err(e) = remove_tree(&model_dir).await {
            tracing::warn!(path = %model_dir.display(), error = %e, "failed to remove demucs output tree");
        }

        let mut names: Vec<String> = stems.into_iter().map(|(name, _)| name).collect();
        names.sort();
        Ok(names)
    }

    async fn stem_files(&self, track_dir: &Path) -> Result<Vec<(String, PathBuf)>, AdapterError> {
        let mut entries = tokio::fs::read_dir(track_dir)
            .await
            .map_err(|e| AdapterError::filesystem(track_dir, e))?;
        let mut stems = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AdapterError::filesystem(track_dir, e))?
        {
            let path = entry.path();
            let matches_ext = path
                .extension()
                .is_some_and(|ext| ext == self.config.stem_extension.as_str());
            if !matches_ext {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                stems.push((name.to_string(), path.clone()));
            }
        }
        Ok(stems)
    }
}

impl Default for DemucsAdapter {
    fn default() -> Self {
        Self::new(DemucsConfig::default())
    }
}

#[async_trait]
impl ProcessAdapter for DemucsAdapter {
    async fn run(
        &self,
        input: &str,
        output_dir: &Path,
        on_progress: ProgressFn,
    ) -> Result<Vec<String>, AdapterError> {
        let status = run_with_progress(
            "demucs",
            &self.config.command,
            self.args(input, output_dir),
            parse_separation_progress,
            &on_progress,
        )
        .await?;

        if !status.success() {
            return Err(AdapterError::SeparationFailed {
                code: status.code(),
            });
        }

        let stems = self.relocate_stems(output_dir).await?;
        on_progress(1.0);
        Ok(stems)
    }

    fn name(&self) -> &str {
        "demucs"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Stand-in for `python -m demucs`: prints tqdm bars on stderr and
    /// writes four stems under `<out>/<model>/<track>/`.
    const FAKE_DEMUCS: &str = r#"
out=""; model=""; audio=""
while [ $# -gt 0 ]; do
  case "$1" in
    --out) out="$2"; shift ;;
    -n) model="$2"; shift ;;
    *) audio="$1" ;;
  esac
  shift
done
echo "Separating track $audio"
printf ' 40%%|####      | 40/100\r' >&2
printf ' 90%%|######### | 90/100\n' >&2
case "$MODE" in
  fail) exit 2 ;;
  empty) exit 0 ;;
esac
track="$out/$model/audio"
mkdir -p "$track"
for stem in vocals drums bass other; do printf 'RIFF' > "$track/$stem.wav"; done
printf 'log' > "$track/notes.txt"
"#;

    fn adapter(mode: &str) -> DemucsAdapter {
        let script = format!("MODE={mode}\n{FAKE_DEMUCS}");
        DemucsAdapter::new(DemucsConfig {
            command: CommandSpec::new("sh").with_args(["-c", script.as_str(), "demucs"]),
            ..DemucsConfig::default()
        })
    }

    #[tokio::test]
    async fn test_separation_relocates_stems() {
        let tmp = tempfile::tempdir().unwrap();
        let audio = tmp.path().join("audio.wav");
        tokio::fs::write(&audio, b"RIFF").await.unwrap();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let on_progress: ProgressFn = std::sync::Arc::new(move |p| sink.lock().unwrap().push(p));

        let stems = adapter("ok")
            .run(audio.to_str().unwrap(), tmp.path(), on_progress)
            .await
            .unwrap();

        assert_eq!(stems, vec!["bass.wav", "drums.wav", "other.wav", "vocals.wav"]);
        for stem in &stems {
            assert!(tmp.path().join(stem).is_file(), "{stem} should be in the job dir");
        }
        assert!(!tmp.path().join("htdemucs").exists());
        assert!(!tmp.path().join("notes.txt").exists());
        assert_eq!(*seen.lock().unwrap(), vec![0.4, 0.9, 1.0]);
    }

    #[tokio::test]
    async fn test_separation_nonzero_exit() {
        let tmp = tempfile::tempdir().unwrap();
        let err = adapter("fail")
            .run("audio.wav", tmp.path(), crate::adapters::no_progress())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::SeparationFailed { code: Some(2) }));
        assert_eq!(err.to_string(), "Demucs exited with code 2");
    }

    #[tokio::test]
    async fn test_separation_without_output_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let err = adapter("empty")
            .run("audio.wav", tmp.path(), crate::adapters::no_progress())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::NoStems));
    }

    #[tokio::test]
    async fn test_separation_with_empty_track_dir() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(tmp.path().join("htdemucs").join("audio"))
            .await
            .unwrap();
        let err = DemucsAdapter::default()
            .relocate_stems(tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::NoStems));
    }
}
