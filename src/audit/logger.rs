use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// Append-only record of every git invocation made on behalf of the panel
#[derive(Debug)]
pub struct CommandLog {
    log_path: PathBuf,
}

impl CommandLog {
    /// Create a CommandLog at the default path
    pub fn new() -> std::io::Result<Self> {
        Self::with_path(Self::default_log_path()?)
    }

    /// Create a CommandLog writing to a custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let log_path = path.as_ref().to_path_buf();

        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self { log_path })
    }

    /// Get the default log path: ~/.config/gitpanel/commands.log
    pub fn default_log_path() -> std::io::Result<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HOME environment variable not set",
            )
        })?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("gitpanel")
            .join("commands.log"))
    }

    /// Record a finished invocation
    pub fn log_command(&self, args: &[&str], repo_path: &Path, exit_code: i32) -> std::io::Result<()> {
        self.append(repo_path, &format!("[exit:{}] git {}", exit_code, args.join(" ")))
    }

    /// Record the stderr of an invocation that exited non-zero
    pub fn log_error(&self, args: &[&str], repo_path: &Path, stderr: &str) -> std::io::Result<()> {
        // Multi-line stderr is folded so one entry stays on one line
        let folded = stderr.lines().collect::<Vec<_>>().join(" | ");
        self.append(
            repo_path,
            &format!("[ERROR] git {}: {}", args.join(" "), folded),
        )
    }

    /// Record an invocation that was killed after exceeding its time bound
    pub fn log_timeout(&self, args: &[&str], repo_path: &Path, after: Duration) -> std::io::Result<()> {
        self.append(
            repo_path,
            &format!("[TIMEOUT:{}s] git {}", after.as_secs(), args.join(" ")),
        )
    }

    fn append(&self, repo_path: &Path, body: &str) -> std::io::Result<()> {
        self.rotate_if_needed()?;

        let timestamp = Utc::now().to_rfc3339();
        let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());

        let entry = format!(
            "[{}] [{}] [{}] {}\n",
            timestamp,
            user,
            repo_path.display(),
            body
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        file.write_all(entry.as_bytes())?;
        file.flush()
    }

    /// Rotate log file if it exceeds MAX_LOG_SIZE
    fn rotate_if_needed(&self) -> std::io::Result<()> {
        if !self.log_path.exists() {
            return Ok(());
        }

        if fs::metadata(&self.log_path)?.len() > MAX_LOG_SIZE {
            // commands.log -> commands.log.1
            let backup_path = self.log_path.with_extension("log.1");
            fs::rename(&self.log_path, backup_path)?;
        }

        Ok(())
    }

    /// Get the path to the log file
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}
