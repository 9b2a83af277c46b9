//! Line-oriented progress parsing for child process output.
//!
//! Accepted formats are deliberately narrow. Anything else is "no update".
//!
//! - yt-dlp (`--newline`): `[download]  42.3% of 3.45MiB at ...`
//! - demucs (tqdm on stderr): ` 42%|████▏     | 49.1/117.0 [...]`

use std::sync::OnceLock;

use regex_lite::Regex;

static DOWNLOAD_PERCENT: OnceLock<Regex> = OnceLock::new();
static TQDM_PERCENT: OnceLock<Regex> = OnceLock::new();

/// Parse a yt-dlp progress line into a fraction.
pub fn parse_download_progress(line: &str) -> Option<f64> {
    let re = DOWNLOAD_PERCENT.get_or_init(|| {
        Regex::new(r"^\[download\]\s+(\d{1,3}(?:\.\d+)?)%").expect("download pattern compiles")
    });
    percent_to_fraction(re, line)
}

/// Parse a demucs/tqdm progress bar line into a fraction.
pub fn parse_separation_progress(line: &str) -> Option<f64> {
    let re = TQDM_PERCENT.get_or_init(|| {
        Regex::new(r"^\s*(\d{1,3})%\|").expect("tqdm pattern compiles")
    });
    percent_to_fraction(re, line)
}

fn percent_to_fraction(re: &Regex, line: &str) -> Option<f64> {
    let caps = re.captures(line.trim_end())?;
    let percent: f64 = caps.get(1)?.as_str().parse().ok()?;
    (0.0..=100.0)
        .contains(&percent)
        .then(|| percent / 100.0)
}

/// Longest partial line kept while waiting for a terminator.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Incremental splitter for raw child output.
///
/// Progress bars redraw with `\r` and may never print `\n` until the process
/// exits, so both bytes end a line and lines are emitted as soon as their
/// terminator arrives. A partial line longer than [`MAX_LINE_BYTES`] is
/// emitted as-is rather than buffered further.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning every line they complete. Blank lines are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                self.take_into(&mut lines);
            } else {
                self.pending.push(byte);
                if self.pending.len() >= MAX_LINE_BYTES {
                    self.take_into(&mut lines);
                }
            }
        }
        lines
    }

    /// Whatever is left once the stream has closed.
    pub fn finish(&mut self) -> Option<String> {
        let mut lines = Vec::new();
        self.take_into(&mut lines);
        lines.pop()
    }

    fn take_into(&mut self, lines: &mut Vec<String>) {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
}
