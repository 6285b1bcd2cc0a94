use anyhow::{Result, anyhow};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

const TRACE_SUBDIR: &str = "careline/traces";

/// What a trace line records. The label is padded to a fixed width in the
/// file so kinds line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    UserInput,
    AssistantText,
    Chart,
    ToolStep,
    Error,
    System,
    Http,
}

impl TraceKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::UserInput => "ui.in",
            Self::AssistantText => "ai.out",
            Self::Chart => "ai.chart",
            Self::ToolStep => "ai.tool",
            Self::Error => "ai.err",
            Self::System => "sys",
            Self::Http => "http",
        }
    }
}

/// Append-only per-session log of everything shown to or typed by the
/// operator. Write failures are reported once on stderr and otherwise
/// ignored so the chat keeps running.
#[derive(Clone)]
pub struct SessionTrace {
    shared: Arc<Shared>,
}

struct Shared {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    warned: AtomicBool,
}

impl SessionTrace {
    /// Opens a trace under the user's state directory.
    pub fn create(session_id: &str) -> Result<Self> {
        let dir = resolve_trace_dir(dirs::state_dir(), dirs::home_dir())?;
        Self::create_in_dir(session_id, &dir)
    }

    pub fn create_in_dir(session_id: &str, dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .map_err(|err| anyhow!("Failed to create trace directory {}: {err}", dir.display()))?;

        let opened_at = OffsetDateTime::now_utc().unix_timestamp();
        let path = dir.join(format!("session-{session_id}-{opened_at}.log"));
        let file = open_private(&path)
            .map_err(|err| anyhow!("Failed to create trace file {}: {err}", path.display()))?;

        Ok(Self {
            shared: Arc::new(Shared {
                path,
                writer: Mutex::new(BufWriter::new(file)),
                warned: AtomicBool::new(false),
            }),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.shared.path
    }

    /// Writes one line per line of `text`; empty text is recorded as
    /// `<empty>`.
    pub fn record(&self, kind: TraceKind, text: &str) {
        let stamp = timestamp();
        let label = kind.label();
        let mut block = String::new();
        if text.is_empty() {
            block.push_str(&format!("[{stamp}] [{label:<11}] <empty>\n"));
        }
        for line in text.lines() {
            block.push_str(&format!("[{stamp}] [{label:<11}] {line}\n"));
        }
        self.append(&block);
    }

    fn append(&self, block: &str) {
        let written = match self.shared.writer.lock() {
            Ok(mut writer) => writer
                .write_all(block.as_bytes())
                .and_then(|()| writer.flush())
                .is_ok(),
            Err(_) => false,
        };
        if !written && !self.shared.warned.swap(true, Ordering::Relaxed) {
            eprintln!(
                "CareLine trace warning: failed to write {}",
                self.shared.path.display()
            );
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.millisecond()
    )
}

/// `$XDG_STATE_HOME` (as reported by `dirs`) wins; otherwise
/// `~/.local/state` is used on every platform.
fn resolve_trace_dir(state_dir: Option<PathBuf>, home_dir: Option<PathBuf>) -> Result<PathBuf> {
    let base = match (state_dir, home_dir) {
        (Some(state), _) => state,
        (None, Some(home)) => home.join(".local/state"),
        (None, None) => {
            return Err(anyhow!(
                "Failed to resolve trace path: no state or home directory"
            ));
        }
    };
    Ok(base.join(TRACE_SUBDIR))
}
