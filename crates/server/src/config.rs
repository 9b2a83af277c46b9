// crates/server/src/config.rs
//! Command-line and environment configuration for the `stemtool` binary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use stemtool_core::adapters::process::CommandSpec;
use stemtool_core::{DemucsConfig, RunnerConfig, YtDlpConfig};
use stemtool_observability::{LogFormat, LogOptions};

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Parser, Debug, Clone)]
#[command(name = "stemtool")]
#[command(about = "Download audio and split it into stems")]
#[command(version)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "STEMTOOL_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Root directory for per-session job folders
    #[arg(long, env = "STEMTOOL_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Seconds a completed job is kept before deletion
    #[arg(long, env = "STEMTOOL_JOB_TTL_SECS", default_value_t = 600)]
    pub job_ttl_secs: u64,

    /// Seconds between cleanup sweeps
    #[arg(long, env = "STEMTOOL_SWEEP_INTERVAL_SECS", default_value_t = 300)]
    pub sweep_interval_secs: u64,

    /// Pipelines allowed to run at once (0 = unlimited; default: CPU count)
    #[arg(long, env = "STEMTOOL_MAX_CONCURRENT_JOBS")]
    pub max_concurrent_jobs: Option<usize>,

    /// yt-dlp executable
    #[arg(long, env = "STEMTOOL_YTDLP_BIN", default_value = "yt-dlp")]
    pub ytdlp_bin: String,

    /// Python interpreter that has demucs installed
    #[arg(long, env = "STEMTOOL_PYTHON_BIN", default_value = "python")]
    pub python_bin: String,

    /// Demucs model name
    #[arg(long, env = "STEMTOOL_DEMUCS_MODEL", default_value = "htdemucs")]
    pub demucs_model: String,

    /// Frontend build to serve for non-API paths
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Log output format: text or json
    #[arg(long, env = "STEMTOOL_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, env = "STEMTOOL_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn runner(&self) -> RunnerConfig {
        let defaults = RunnerConfig::default();
        RunnerConfig {
            data_dir: self.data_dir.clone(),
            job_ttl: Duration::from_secs(self.job_ttl_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs.max(1)),
            max_concurrent_jobs: self.max_concurrent_jobs.or(defaults.max_concurrent_jobs),
        }
    }

    pub fn ytdlp(&self) -> YtDlpConfig {
        YtDlpConfig {
            command: CommandSpec::new(&self.ytdlp_bin),
            ..YtDlpConfig::default()
        }
    }

    pub fn demucs(&self) -> DemucsConfig {
        DemucsConfig {
            command: CommandSpec::new(&self.python_bin).with_args(["-m", "demucs"]),
            model: self.demucs_model.clone(),
            ..DemucsConfig::default()
        }
    }

    pub fn logging(&self) -> LogOptions {
        LogOptions {
            format: self.log_format,
            dir: self.log_dir.clone(),
        }
    }

    /// Static directory, falling back to `./client/build` when it exists.
    pub fn static_dir(&self) -> Option<PathBuf> {
        self.static_dir.clone().or_else(|| {
            let build = PathBuf::from("client/build");
            build.is_dir().then_some(build)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::try_parse_from([
            "stemtool",
            "--port",
            "8080",
            "--host",
            "127.0.0.1",
            "--data-dir",
            "/srv/stems",
            "--job-ttl-secs",
            "30",
            "--max-concurrent-jobs",
            "0",
            "--python-bin",
            "/opt/venv/bin/python",
            "--demucs-model",
            "mdx_extra",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(config.addr(), "127.0.0.1:8080".parse().unwrap());
        let runner = config.runner();
        assert_eq!(runner.data_dir, PathBuf::from("/srv/stems"));
        assert_eq!(runner.job_ttl, Duration::from_secs(30));
        assert_eq!(runner.max_concurrent_jobs, Some(0));

        let demucs = config.demucs();
        assert_eq!(demucs.model, "mdx_extra");
        assert_eq!(demucs.command.program, "/opt/venv/bin/python");
        assert_eq!(demucs.command.args, vec!["-m", "demucs"]);
        assert_eq!(config.logging().format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        assert!(Config::try_parse_from(["stemtool", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn test_command_definition_is_consistent() {
        use clap::CommandFactory;
        Config::command().debug_assert();
    }
}
