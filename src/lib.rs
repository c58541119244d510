pub mod audit;
pub mod config;
pub mod error;
pub mod git;

// Re-export commonly used types for convenience
pub use error::{AppError, AppResult, GitError, GitResult};
pub use git::{GitExecutor, GitRunner, GitVersion, RawOutput, Repository, RepositorySnapshot};
