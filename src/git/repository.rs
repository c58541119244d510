use crate::audit::CommandLog;
use crate::config::Config;
use crate::error::{GitError, GitResult};
use crate::git::cache::{QueryKind, ResultCache};
use crate::git::executor::{GitExecutor, GitRunner, RawOutput};
use crate::git::parser::{self, CommitLogRecord};
use crate::git::status::{self, ClassifiedStatus, Condition};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::env;
use std::fmt::{self, Write as _};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Commit message used after taking one side of a conflict
pub const CONFLICT_COMMIT_MESSAGE: &str = "Fixed Conflict";

/// chrono rendering of `yyyy/M/d HH:mm`
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y/%-m/%-d %H:%M";

const METADATA_DIR: &str = ".git";
const FETCH_MARKER: &str = "FETCH_HEAD";
const DEFAULT_RECENT_LOG_COUNT: usize = 10;

const STATUS_ARGS: [&str; 3] = ["status", "--short", "--untracked-files=all"];

/// The remote/branch pair the working directory tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub remote: String,
    pub branch: String,
}

impl Upstream {
    pub fn new(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            branch: branch.into(),
        }
    }
}

impl Default for Upstream {
    fn default() -> Self {
        Self::new("origin", "main")
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.remote, self.branch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMode {
    /// Discard working-tree changes
    Worktree,
    /// Unstage, keeping working-tree changes
    Staged,
}

/// Which version of a conflicted file to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictSide {
    Theirs,
    Ours,
}

impl ConflictSide {
    fn flag(self) -> &'static str {
        match self {
            ConflictSide::Theirs => "--theirs",
            ConflictSide::Ours => "--ours",
        }
    }
}

/// A query result plus whether it differs from the previous one
///
/// When git exits non-zero the previous value is kept, `changed` is false
/// and `failure` carries git's output for display.
#[derive(Debug, Clone)]
pub struct Refresh<T> {
    pub value: T,
    pub changed: bool,
    pub failure: Option<RawOutput>,
}

impl<T> Refresh<T> {
    fn updated(value: T, changed: bool) -> Self {
        Self {
            value,
            changed,
            failure: None,
        }
    }

    fn failed(value: T, output: RawOutput) -> Self {
        Self {
            value,
            changed: false,
            failure: Some(output),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusLists {
    pub staged: Arc<[ClassifiedStatus]>,
    pub working: Arc<[ClassifiedStatus]>,
}

/// Everything the panel shows, replaced as a whole on every change
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepositorySnapshot {
    pub staged: Arc<[ClassifiedStatus]>,
    pub working: Arc<[ClassifiedStatus]>,
    pub recent_logs: Arc<[CommitLogRecord]>,
    pub commit_logs: Arc<[CommitLogRecord]>,
}

impl RepositorySnapshot {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.working.is_empty()
    }

    pub fn has_conflicts(&self) -> bool {
        self.working
            .iter()
            .any(|entry| entry.condition == Condition::Conflict)
    }
}

/// Outputs of the two halves of a conflict resolution
#[derive(Debug, Clone)]
pub struct ConflictResolution {
    pub checkout: RawOutput,
    pub commit: RawOutput,
}

impl ConflictResolution {
    pub fn success(&self) -> bool {
        self.checkout.success() && self.commit.success()
    }
}

/// Outputs of every step of `init_remote`, in order
#[derive(Debug, Clone)]
pub struct InitOutcome {
    pub steps: Vec<RawOutput>,
}

impl InitOutcome {
    pub fn failed(&self) -> bool {
        self.steps.iter().any(|step| !step.success())
    }

    /// Output of the fetch step, the most informative one for the user
    pub fn message(&self) -> &str {
        self.steps.get(3).map(|s| s.text.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub pull: RawOutput,
    pub push: RawOutput,
}

impl SyncOutcome {
    pub fn failed(&self) -> bool {
        !self.pull.success() || !self.push.success()
    }
}

/// Progress signals emitted by `sync_both_ways`
#[derive(Debug, Clone)]
pub enum SyncEvent {
    PullComplete(RawOutput),
    PushComplete(RawOutput),
    BothComplete(SyncOutcome),
}

/// A git working directory driven through a [`GitRunner`]
///
/// Every operation takes `&mut self`, so invocations against one repository
/// are serialized and never contend for git's index lock.
#[derive(Debug)]
pub struct Repository<R: GitRunner = GitExecutor> {
    path: PathBuf,
    runner: R,
    upstream: Upstream,
    recent_log_count: usize,
    cache: ResultCache,
    snapshot: Arc<RepositorySnapshot>,
}

impl Repository<GitExecutor> {
    /// Detect git repository from current working directory
    pub fn discover() -> GitResult<Self> {
        let current_dir = env::current_dir()?;
        Self::discover_from(&current_dir)
    }

    /// Detect git repository starting from a specific directory
    pub fn discover_from<P: AsRef<Path>>(start_path: P) -> GitResult<Self> {
        let mut current = start_path.as_ref().to_path_buf();

        loop {
            if current.join(METADATA_DIR).exists() {
                return Ok(Self::new(current));
            }

            if !current.pop() {
                return Err(GitError::NotARepository);
            }
        }
    }

    /// Create a Repository for a known directory, initialized or not
    ///
    /// The executor has no command log; use [`Repository::from_config`] or
    /// [`GitExecutor::with_log`] to record invocations and failures.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_runner(GitExecutor::new(path))
    }

    /// Create a Repository whose executor, upstream and log follow `config`
    pub fn from_config<P: AsRef<Path>>(path: P, config: &Config) -> GitResult<Self> {
        let mut executor = GitExecutor::from_config(&path, &config.git);

        if config.log.enabled {
            let log = match &config.log.path {
                Some(log_path) => CommandLog::with_path(log_path)?,
                None => CommandLog::new()?,
            };
            executor = executor.with_log(Arc::new(log));
        }

        Ok(Self::with_runner(executor)
            .with_upstream(Upstream::new(&config.remote.name, &config.remote.branch))
            .with_recent_log_count(config.display.recent_log_count))
    }
}

impl<R: GitRunner> Repository<R> {
    /// Wrap an existing runner; any logging is the runner's own
    pub fn with_runner(runner: R) -> Self {
        Self {
            path: runner.repo_path().to_path_buf(),
            runner,
            upstream: Upstream::default(),
            recent_log_count: DEFAULT_RECENT_LOG_COUNT,
            cache: ResultCache::new(),
            snapshot: Arc::default(),
        }
    }

    pub fn with_upstream(mut self, upstream: Upstream) -> Self {
        self.upstream = upstream;
        self
    }

    pub fn with_recent_log_count(mut self, count: usize) -> Self {
        self.recent_log_count = count;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Current snapshot; cheap to clone and never mutated after publication
    pub fn snapshot(&self) -> Arc<RepositorySnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Number of parses the cache has performed for `kind`
    pub fn parse_count(&self, kind: QueryKind) -> u64 {
        self.cache.parse_count(kind)
    }

    /// Short-format status split into staged and working lists
    ///
    /// When git's output is byte-identical to the previous call the same
    /// lists come back and `changed` is false. A failed query leaves the
    /// cache and snapshot alone.
    pub fn status(&mut self) -> GitResult<Refresh<StatusLists>> {
        let output = self.runner.run(&STATUS_ARGS)?;
        if !output.success() {
            return Ok(Refresh::failed(self.status_lists(), output));
        }

        let lookup =
            self.cache
                .status()
                .get_or_parse(&STATUS_ARGS, &output.text, parser::parse_status_lines);

        if lookup.changed {
            let (staged, working) = status::classify(&lookup.records);
            self.snapshot = Arc::new(RepositorySnapshot {
                staged: staged.into(),
                working: working.into(),
                ..(*self.snapshot).clone()
            });
        }

        Ok(Refresh::updated(self.status_lists(), lookup.changed))
    }

    fn status_lists(&self) -> StatusLists {
        StatusLists {
            staged: Arc::clone(&self.snapshot.staged),
            working: Arc::clone(&self.snapshot.working),
        }
    }

    /// Up to `max` commits reachable from `remote`
    pub fn recent_log(&mut self, remote: &str, max: usize) -> GitResult<Refresh<Arc<[CommitLogRecord]>>> {
        let max = max.to_string();
        let args = ["log", "--oneline", "--no-decorate", "--max-count", max.as_str(), remote];
        let output = self.runner.run(&args)?;
        if !output.success() {
            return Ok(Refresh::failed(Arc::clone(&self.snapshot.recent_logs), output));
        }

        let lookup =
            self.cache
                .recent_log()
                .get_or_parse(&args, &output.text, parser::parse_commit_lines);

        if lookup.changed {
            self.snapshot = Arc::new(RepositorySnapshot {
                recent_logs: Arc::clone(&lookup.records),
                ..(*self.snapshot).clone()
            });
        }

        Ok(Refresh::updated(lookup.records, lookup.changed))
    }

    /// Commits on HEAD that `remote` does not have yet
    pub fn outgoing_log(&mut self, remote: &str) -> GitResult<Refresh<Arc<[CommitLogRecord]>>> {
        let range = format!("{}..HEAD", remote);
        let args = ["log", "--oneline", "--no-decorate", range.as_str()];
        let output = self.runner.run(&args)?;
        if !output.success() {
            return Ok(Refresh::failed(Arc::clone(&self.snapshot.commit_logs), output));
        }

        let lookup =
            self.cache
                .outgoing_log()
                .get_or_parse(&args, &output.text, parser::parse_commit_lines);

        if lookup.changed {
            self.snapshot = Arc::new(RepositorySnapshot {
                commit_logs: Arc::clone(&lookup.records),
                ..(*self.snapshot).clone()
            });
        }

        Ok(Refresh::updated(lookup.records, lookup.changed))
    }

    /// Re-query logs and status against the configured upstream
    ///
    /// Every query runs; `failure` holds the first one that exited non-zero.
    pub fn refresh(&mut self) -> GitResult<Refresh<Arc<RepositorySnapshot>>> {
        let remote = self.upstream.to_string();
        let recent = self.recent_log(&remote, self.recent_log_count)?;
        let outgoing = self.outgoing_log(&remote)?;
        let status = self.status()?;

        Ok(Refresh {
            value: self.snapshot(),
            changed: recent.changed || outgoing.changed || status.changed,
            failure: recent.failure.or(outgoing.failure).or(status.failure),
        })
    }

    /// Drop cached results and publish an empty snapshot
    pub fn clear(&mut self) {
        self.cache.clear();
        self.snapshot = Arc::default();
    }

    /// Stage one path. Callers re-run `status()` afterwards.
    pub fn add(&mut self, path: &str) -> GitResult<RawOutput> {
        self.runner.run(&["add", "--", path])
    }

    pub fn add_all(&mut self) -> GitResult<RawOutput> {
        self.runner.run(&["add", "."])
    }

    pub fn restore(&mut self, path: &str, mode: RestoreMode) -> GitResult<RawOutput> {
        match mode {
            RestoreMode::Worktree => self.runner.run(&["restore", "--", path]),
            RestoreMode::Staged => self.runner.run(&["restore", "--staged", "--", path]),
        }
    }

    pub fn commit(&mut self, message: &str) -> GitResult<RawOutput> {
        self.runner.run(&["commit", "-m", message])
    }

    /// Take one side of a conflicted file and commit
    ///
    /// Not atomic: a failed commit leaves the checked-out side staged.
    pub fn resolve_conflict(&mut self, side: ConflictSide, path: &str) -> GitResult<ConflictResolution> {
        let checkout = self.runner.run(&["checkout", side.flag(), "--", path])?;
        let commit = self.runner.run(&["commit", "-am", CONFLICT_COMMIT_MESSAGE])?;

        Ok(ConflictResolution { checkout, commit })
    }

    /// Name of the checked-out branch, `None` when detached or not a repository
    pub fn current_branch(&mut self) -> GitResult<Option<String>> {
        let output = self.runner.run(&["symbolic-ref", "--short", "HEAD"])?;
        Ok(non_empty_success(output))
    }

    pub fn remote_url(&mut self) -> GitResult<Option<String>> {
        let key = format!("remote.{}.url", self.upstream.remote);
        let output = self.runner.run(&["config", "--local", "--get", key.as_str()])?;
        Ok(non_empty_success(output))
    }

    /// `<remote>/<branch>` for the branch the remote's HEAD points at
    pub async fn remote_head_branch(&mut self) -> GitResult<Option<String>> {
        let key = format!("branch.{}.remote", self.upstream.branch);
        let configured = self.runner.run(&["config", "--local", "--get", key.as_str()])?;
        let remote = non_empty_success(configured).unwrap_or_else(|| self.upstream.remote.clone());

        let shown = self.runner.run_async(&["remote", "show", remote.as_str()]).await?;
        if !shown.success() {
            return Ok(None);
        }

        Ok(parser::parse_remote_head(&shown.text).map(|head| format!("{}/{}", remote, head)))
    }

    /// Turn the directory into a clone of `url` tracking the configured branch
    ///
    /// All five steps run even when one exits non-zero, so the outputs of
    /// later steps are still available to explain what went wrong.
    pub async fn init_remote(&mut self, url: &str) -> GitResult<InitOutcome> {
        let Upstream { remote, branch } = self.upstream.clone();
        let sequence: [&[&str]; 5] = [
            &["init"],
            &["branch", "-m", branch.as_str()],
            &["remote", "add", remote.as_str(), url],
            &["fetch", remote.as_str()],
            &["checkout", branch.as_str()],
        ];

        let mut steps = Vec::with_capacity(sequence.len());
        for args in sequence {
            steps.push(self.runner.run_async(args).await?);
        }

        self.clear();
        Ok(InitOutcome { steps })
    }

    pub async fn pull(&mut self) -> GitResult<RawOutput> {
        self.runner.run_async(&["pull", "--no-edit"]).await
    }

    pub async fn push(&mut self) -> GitResult<RawOutput> {
        self.runner.run_async(&["push"]).await
    }

    /// Pull then push; the push is attempted even when the pull exits non-zero
    pub async fn sync_both_ways(&mut self, events: Option<&UnboundedSender<SyncEvent>>) -> GitResult<SyncOutcome> {
        let notify = |event: SyncEvent| {
            if let Some(tx) = events {
                // A dropped receiver only means nobody is listening any more
                let _ = tx.send(event);
            }
        };

        let pull = self.pull().await?;
        notify(SyncEvent::PullComplete(pull.clone()));

        let push = self.push().await?;
        notify(SyncEvent::PushComplete(push.clone()));

        let outcome = SyncOutcome { pull, push };
        notify(SyncEvent::BothComplete(outcome.clone()));

        Ok(outcome)
    }

    fn metadata_dir(&self) -> PathBuf {
        self.path.join(METADATA_DIR)
    }

    /// Remove `.git` entirely, un-initializing the directory. Irreversible.
    pub fn delete_repository_metadata(&mut self) -> GitResult<()> {
        let git_dir = self.metadata_dir();
        if !git_dir.is_dir() {
            return Err(GitError::NotARepository);
        }

        // Pack files are written read-only, which blocks removal on Windows
        clear_readonly(&git_dir)?;
        fs::remove_dir_all(&git_dir)?;

        self.clear();
        Ok(())
    }

    /// Modification time of the last fetch, rendered with a chrono pattern
    pub fn last_sync_timestamp(&self, format: &str) -> GitResult<String> {
        let marker = self.metadata_dir().join(FETCH_MARKER);
        let modified = match fs::metadata(&marker) {
            Ok(metadata) => metadata.modified()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(GitError::MissingMetadataFile(marker));
            }
            Err(e) => return Err(e.into()),
        };

        let local: DateTime<Local> = modified.into();
        let mut rendered = String::new();
        write!(rendered, "{}", local.format(format))
            .map_err(|_| GitError::InvalidTimestampFormat(format.to_string()))?;

        Ok(rendered)
    }
}

fn non_empty_success(output: RawOutput) -> Option<String> {
    let text = output.text.trim();
    if output.success() && !text.is_empty() {
        Some(text.to_string())
    } else {
        None
    }
}

fn clear_readonly(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;

    if metadata.is_dir() {
        for entry in fs::read_dir(path)? {
            clear_readonly(&entry?.path())?;
        }
    }

    let mut permissions = metadata.permissions();
    if metadata.file_type().is_symlink() || !permissions.readonly() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
    }

    fs::set_permissions(path, permissions)
}
