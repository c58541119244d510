pub mod cache;
pub mod executor;
pub mod parser;
pub mod repository;
pub mod status;
pub mod version;

// Re-export commonly used types
pub use cache::{CacheSlot, Lookup, QueryKind, ResultCache};
pub use executor::{GitExecutor, GitRunner, RawOutput, DEFAULT_TIMEOUT};
pub use parser::{CommitLogRecord, FileStatusRecord, parse_commit_lines, parse_status_lines};
pub use repository::{
    CONFLICT_COMMIT_MESSAGE, ConflictResolution, ConflictSide, DEFAULT_TIMESTAMP_FORMAT,
    InitOutcome, Refresh, Repository, RepositorySnapshot, RestoreMode, StatusLists, SyncEvent,
    SyncOutcome, Upstream,
};
pub use status::{ClassifiedStatus, Condition, FileState, Stage, StatusCode, StatusLabel};
pub use version::GitVersion;
