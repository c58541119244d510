use crate::audit::CommandLog;
use crate::config::GitConfig;
use crate::error::{GitError, GitResult};
use async_trait::async_trait;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default bound on a single git invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of executing a git command
///
/// `text` holds whatever the user should see: stderr when the command
/// failed and said something, otherwise stdout (falling back to stderr for
/// commands like `push` that report progress there).
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct RawOutput {
    pub text: String,
    pub exit_code: i32,
}

impl RawOutput {
    pub fn new(text: impl Into<String>, exit_code: i32) -> Self {
        Self {
            text: text.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// First line of the output, for one-line summaries
    pub fn headline(&self) -> &str {
        self.text.lines().next().unwrap_or("")
    }
}

/// Something that can run git with an argument vector
///
/// The repository facade is generic over this so tests can script git's
/// answers and observe call ordering.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run to completion, blocking the calling thread
    fn run(&self, args: &[&str]) -> GitResult<RawOutput>;

    /// Run to completion without blocking the runtime thread
    async fn run_async(&self, args: &[&str]) -> GitResult<RawOutput>;

    /// Working directory the commands run in
    fn repo_path(&self) -> &Path;
}

/// Executes git commands as subprocesses within a repository
#[derive(Debug, Clone)]
pub struct GitExecutor {
    repo_path: PathBuf,
    binary: String,
    timeout: Duration,
    log: Option<Arc<CommandLog>>,
}

impl GitExecutor {
    /// Create a new GitExecutor for the given repository path
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
            binary: "git".to_string(),
            timeout: DEFAULT_TIMEOUT,
            log: None,
        }
    }

    /// Create a GitExecutor using the binary and timeout from configuration
    pub fn from_config<P: AsRef<Path>>(repo_path: P, config: &GitConfig) -> Self {
        Self::new(repo_path)
            .with_binary(&config.binary)
            .with_timeout(config.timeout())
    }

    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_log(mut self, log: Arc<CommandLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command_line(&self, args: &[&str]) -> String {
        let mut line = self.binary.clone();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    fn launch_error(&self, args: &[&str], source: std::io::Error) -> GitError {
        GitError::LaunchFailed {
            command: self.command_line(args),
            source,
        }
    }

    fn timeout_error(&self, args: &[&str]) -> GitError {
        if let Some(log) = &self.log {
            let _ = log.log_timeout(args, &self.repo_path, self.timeout);
        }
        GitError::Timeout {
            command: self.command_line(args),
            after: self.timeout,
        }
    }

    /// Combine the captured streams and emit log entries
    fn finish(&self, args: &[&str], status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> RawOutput {
        // Killed by a signal leaves no exit code
        let exit_code = status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(stdout);
        let stderr = String::from_utf8_lossy(stderr);
        let stdout = trim_line_endings(&stdout);
        let stderr = trim_line_endings(&stderr);

        if let Some(log) = &self.log {
            let _ = log.log_command(args, &self.repo_path, exit_code);
            if exit_code != 0 && !stderr.is_empty() {
                let _ = log.log_error(args, &self.repo_path, stderr);
            }
        }

        let text = if exit_code != 0 && !stderr.is_empty() {
            stderr
        } else if !stdout.is_empty() {
            stdout
        } else {
            stderr
        };

        RawOutput::new(text, exit_code)
    }
}

#[async_trait]
impl GitRunner for GitExecutor {
    fn run(&self, args: &[&str]) -> GitResult<RawOutput> {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .current_dir(&self.repo_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so hooks and helpers git starts die with it
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|e| self.launch_error(args, e))?;

        // Each pipe drains on its own thread so a full stderr cannot stall stdout
        let stdout_reader = child.stdout.take().map(drain_on_thread);
        let stderr_reader = child.stderr.take().map(drain_on_thread);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            let failure = match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() < deadline => None,
                Ok(None) => Some(self.timeout_error(args)),
                Err(e) => Some(GitError::from(e)),
            };

            if let Some(error) = failure {
                kill_process_group(child.id());
                let _ = child.kill();
                let _ = child.wait();
                let _ = join_reader(stdout_reader);
                let _ = join_reader(stderr_reader);
                return Err(error);
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = join_reader(stdout_reader)?;
        let stderr = join_reader(stderr_reader)?;

        Ok(self.finish(args, status, &stdout, &stderr))
    }

    async fn run_async(&self, args: &[&str]) -> GitResult<RawOutput> {
        let mut command = tokio::process::Command::new(&self.binary);
        command
            .args(args)
            .current_dir(&self.repo_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| self.launch_error(args, e))?;
        let pid = child.id();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let collected = tokio::time::timeout(self.timeout, async {
            tokio::try_join!(child.wait(), read_stream(stdout), read_stream(stderr))
        })
        .await;

        match collected {
            Ok(result) => {
                let (status, stdout, stderr) = result?;
                Ok(self.finish(args, status, &stdout, &stderr))
            }
            Err(_) => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                let _ = child.kill().await;
                Err(self.timeout_error(args))
            }
        }
    }

    fn repo_path(&self) -> &Path {
        &self.repo_path
    }
}

/// SIGKILL every process in the group led by `pid`
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // The group was created by our own spawn with process_group(0)
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

fn trim_line_endings(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}

fn drain_on_thread<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_reader(reader: Option<thread::JoinHandle<std::io::Result<Vec<u8>>>>) -> std::io::Result<Vec<u8>> {
    match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| std::io::Error::other("output reader thread panicked"))?,
        None => Ok(Vec::new()),
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
