//! Append-only chat log
//!
//! Every successful broadcast is recorded as
//! `[YYYY-MM-DD HH:MM:SS] <channel> @<name>: <text>`. Recording is
//! fire-and-forget: entries go through a bounded queue to a writer task,
//! and a full queue or a failing file never affects delivery.

use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Default log file name
pub const DEFAULT_LOG_PATH: &str = "server_chat.log";

/// Pending entries before new ones are dropped
const LOG_BUFFER_SIZE: usize = 1024;

/// One broadcast to be logged
#[derive(Debug, Clone)]
struct LogEntry {
    channel: String,
    name: String,
    text: String,
}

/// Cloneable handle to the chat log writer
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    sender: Option<mpsc::Sender<LogEntry>>,
}

impl ChatLog {
    /// Spawn a writer appending to `path`
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let (sender, receiver) = mpsc::channel(LOG_BUFFER_SIZE);
        tokio::spawn(ChatLogWriter::new(path.into(), receiver).run());
        Self {
            sender: Some(sender),
        }
    }

    /// A log that discards everything
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Record a broadcast without waiting
    pub fn record(&self, channel: &str, name: &str, text: &str) {
        let Some(sender) = &self.sender else {
            return;
        };
        let entry = LogEntry {
            channel: channel.to_string(),
            name: name.to_string(),
            text: text.to_string(),
        };
        if sender.try_send(entry).is_err() {
            debug!("Chat log queue unavailable, entry dropped");
        }
    }
}

/// Writer task draining the log queue into a file
struct ChatLogWriter {
    path: PathBuf,
    receiver: mpsc::Receiver<LogEntry>,
    file: Option<File>,
}

impl ChatLogWriter {
    fn new(path: PathBuf, receiver: mpsc::Receiver<LogEntry>) -> Self {
        Self {
            path,
            receiver,
            file: None,
        }
    }

    async fn run(mut self) {
        info!("Chat log writing to {}", self.path.display());

        while let Some(entry) = self.receiver.recv().await {
            if let Err(e) = self.write(&entry).await {
                warn!("Failed to write chat log {}: {}", self.path.display(), e);
                // Reopen on the next entry
                self.file = None;
            }
        }

        debug!("Chat log writer stopped");
    }

    async fn write(&mut self, entry: &LogEntry) -> std::io::Result<()> {
        let line = format_entry(entry, &Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
        let file = match self.file.take() {
            Some(file) => file,
            None => open_append(&self.path).await?,
        };
        let file = self.file.insert(file);
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

async fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path).await
}

fn format_entry(entry: &LogEntry, timestamp: &str) -> String {
    format!(
        "[{}] {} @{}: {}\n",
        timestamp, entry.channel, entry.name, entry.text
    )
}
