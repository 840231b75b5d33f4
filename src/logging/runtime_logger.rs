// src/logging/runtime_logger.rs

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task;
use tokio::time::{self, Duration};
use tracing_appender::rolling;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::MakeWriter;

/// Log levels that get their own rolling file.
const LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

/// How long rotated files stick around before the sweeper deletes them.
const RETENTION_HOURS: u64 = 72;

enum LogCommand {
    Write { level: String, content: String },
    Flush(oneshot::Sender<()>),
}

/// Asynchronous runtime logger for structured agent events (bid
/// outcomes, pacer results, server lifecycle).
///
/// Lines are JSON, split per level into hourly-rolling files named
/// `{prefix}_{level}.json`, buffered through an mpsc channel and
/// flushed in batches off the request path. An hourly sweeper removes
/// rotated files past retention.
pub struct RuntimeLogger {
    sender: Sender<LogCommand>,
}

impl RuntimeLogger {
    /// - `log_dir`: directory the level files live in
    /// - `file_prefix`: e.g. "agent" gives agent_info.json etc.
    /// - `buffer_size`: mpsc channel capacity
    /// - `batch_size`: lines per level buffered before a write
    /// - `flush_interval`: periodic flush interval (milliseconds)
    pub fn new(
        log_dir: &str,
        file_prefix: &str,
        buffer_size: usize,
        batch_size: usize,
        flush_interval: u64,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(buffer_size);

        let mut log_files = HashMap::new();
        for level in LEVELS {
            let file_name = format!("{}_{}.json", file_prefix, level.to_lowercase());
            log_files.insert(level.to_string(), Arc::new(rolling::hourly(log_dir, file_name)));
        }

        tokio::spawn(Self::background_writer(
            log_files,
            receiver,
            batch_size,
            flush_interval,
        ));

        {
            let log_dir = log_dir.to_string();
            tokio::spawn(async move {
                let sweep_interval = Duration::from_secs(3600);
                loop {
                    Self::sweep_old_logs(&log_dir, RETENTION_HOURS).await;
                    time::sleep(sweep_interval).await;
                }
            });
        }

        Arc::new(Self { sender })
    }

    /// Queues one structured line. Unknown levels land in the INFO
    /// file rather than being dropped.
    pub async fn log(&self, level: &str, message: &str) {
        let level = {
            let upper = level.to_uppercase();
            if LEVELS.contains(&upper.as_str()) {
                upper
            } else {
                "INFO".to_string()
            }
        };
        let content = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "message": message,
        })
        .to_string();

        if let Err(e) = self.sender.send(LogCommand::Write { level, content }).await {
            eprintln!("Failed to queue runtime log line: {}", e);
        }
    }

    /// Flushes everything buffered so far and waits for the writer to
    /// acknowledge. Called once on shutdown.
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(LogCommand::Flush(ack)).await.is_ok() {
            let _ = time::timeout(Duration::from_secs(2), done).await;
        }
    }

    async fn background_writer(
        log_files: HashMap<String, Arc<RollingFileAppender>>,
        mut receiver: Receiver<LogCommand>,
        batch_size: usize,
        flush_interval: u64,
    ) {
        let mut buffers: HashMap<String, Vec<String>> = HashMap::new();
        for level in log_files.keys() {
            buffers.insert(level.clone(), Vec::new());
        }
        let mut interval = time::interval(Duration::from_millis(flush_interval));

        loop {
            tokio::select! {
                command = receiver.recv() => match command {
                    Some(LogCommand::Write { level, content }) => {
                        let buffer = buffers.entry(level.clone()).or_default();
                        buffer.push(content);
                        if buffer.len() >= batch_size {
                            if let Some(appender) = log_files.get(&level) {
                                Self::write_to_disk(appender.clone(), buffer).await;
                            }
                        }
                    }
                    Some(LogCommand::Flush(ack)) => {
                        Self::flush_all(&log_files, &mut buffers).await;
                        let _ = ack.send(());
                    }
                    // all senders gone, final flush and stop
                    None => {
                        Self::flush_all(&log_files, &mut buffers).await;
                        break;
                    }
                },
                _ = interval.tick() => {
                    Self::flush_all(&log_files, &mut buffers).await;
                }
            }
        }
    }

    async fn flush_all(
        log_files: &HashMap<String, Arc<RollingFileAppender>>,
        buffers: &mut HashMap<String, Vec<String>>,
    ) {
        for (level, buffer) in buffers.iter_mut() {
            if !buffer.is_empty() {
                if let Some(appender) = log_files.get(level) {
                    Self::write_to_disk(appender.clone(), buffer).await;
                }
            }
        }
    }

    async fn write_to_disk(appender: Arc<RollingFileAppender>, buffer: &mut Vec<String>) {
        let content = buffer.join("\n") + "\n";
        buffer.clear();
        let result = task::spawn_blocking(move || {
            let mut writer = appender.make_writer();
            writer.write_all(content.as_bytes())
        })
        .await;
        match result {
            Ok(Err(e)) => eprintln!("Failed to write runtime logs: {}", e),
            Err(e) => eprintln!("Runtime log writer task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    async fn sweep_old_logs(log_dir: &str, retention_hours: u64) {
        use std::time::{Duration as StdDuration, SystemTime};
        let retention = StdDuration::from_secs(retention_hours * 3600);
        let now = SystemTime::now();
        match tokio::fs::read_dir(log_dir).await {
            Ok(mut dir) => {
                while let Ok(Some(entry)) = dir.next_entry().await {
                    let path = entry.path();
                    if let Ok(metadata) = entry.metadata().await {
                        if let Ok(modified) = metadata.modified() {
                            if now.duration_since(modified).unwrap_or_default() > retention {
                                if let Err(e) = tokio::fs::remove_file(&path).await {
                                    eprintln!("Failed to delete old log file {:?}: {}", path, e);
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => {
                eprintln!("Failed to read log directory {}: {}", log_dir, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_flushes_queued_lines_to_the_level_file() {
        let dir = std::env::temp_dir().join(format!("bidagent_logger_test_{}", std::process::id()));
        let marker = format!("flush-marker-{}", std::process::id());

        let logger = RuntimeLogger::new(dir.to_str().unwrap(), "agent", 64, 100, 60_000);
        logger.log("INFO", &marker).await;
        // batch size and flush interval are both far away; only the
        // shutdown flush can have written this line
        logger.shutdown().await;

        let mut found = false;
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            let content = std::fs::read_to_string(&path).unwrap_or_default();
            if content.contains(&marker) {
                assert!(name.starts_with("agent_info.json"));
                found = true;
            }
        }
        assert!(found, "flushed log line not found in {:?}", dir);
    }

    #[tokio::test]
    async fn unknown_levels_land_in_the_info_file() {
        let dir = std::env::temp_dir().join(format!("bidagent_logger_lvl_{}", std::process::id()));
        let marker = format!("level-marker-{}", std::process::id());

        let logger = RuntimeLogger::new(dir.to_str().unwrap(), "agent", 64, 100, 60_000);
        logger.log("NOTICE", &marker).await;
        logger.shutdown().await;

        let mut found = false;
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            let content = std::fs::read_to_string(&path).unwrap_or_default();
            if content.contains(&marker) {
                assert!(name.starts_with("agent_info.json"));
                found = true;
            }
        }
        assert!(found, "log line not found in {:?}", dir);
    }
}
