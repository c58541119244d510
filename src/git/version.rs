use crate::error::{GitError, GitResult};
use crate::git::executor::GitRunner;
use std::fmt;

/// `git restore`, used for unstaging and discarding, first shipped in 2.23
const MIN_GIT_VERSION: (u32, u32) = (2, 23);

/// Version of the git binary the executor talks to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    /// Ask the runner's binary for its version
    pub fn detect<R: GitRunner + ?Sized>(runner: &R) -> GitResult<Self> {
        let output = runner
            .run(&["--version"])
            .map_err(|e| GitError::GitVersionDetectionFailed(e.to_string()))?;

        if !output.success() {
            return Err(GitError::GitVersionDetectionFailed(output.text));
        }

        Self::parse(&output.text)
    }

    /// Parse `git version X.Y.Z`, tolerating vendor suffixes like `.windows.1`
    pub fn parse(version_str: &str) -> GitResult<Self> {
        let numbers = version_str
            .trim()
            .strip_prefix("git version ")
            .and_then(|rest| rest.split_whitespace().next())
            .ok_or_else(|| {
                GitError::ParseError(format!("Unexpected git version format: {}", version_str))
            })?;

        let mut parts = numbers.split('.');
        let mut component = |label: &str, required: bool| -> GitResult<u32> {
            match parts.next().map(str::parse::<u32>) {
                Some(Ok(n)) => Ok(n),
                _ if !required => Ok(0),
                _ => Err(GitError::ParseError(format!(
                    "Invalid {} version in: {}",
                    label, numbers
                ))),
            }
        };

        let major = component("major", true)?;
        let minor = component("minor", true)?;
        let patch = component("patch", false)?;

        Ok(GitVersion { major, minor, patch })
    }

    pub fn is_supported(&self) -> bool {
        (self.major, self.minor) >= MIN_GIT_VERSION
    }

    /// Detect and reject versions older than the minimum
    pub fn validate<R: GitRunner + ?Sized>(runner: &R) -> GitResult<Self> {
        let version = Self::detect(runner)?;

        if !version.is_supported() {
            return Err(GitError::GitVersionTooOld(version.to_string()));
        }

        Ok(version)
    }
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::executor::GitExecutor;

    #[test]
    fn test_parse_standard_version() {
        let version = GitVersion::parse("git version 2.39.2\n").unwrap();
        assert_eq!(version, GitVersion { major: 2, minor: 39, patch: 2 });
    }

    #[test]
    fn test_parse_vendor_suffixes() {
        let windows = GitVersion::parse("git version 2.39.2.windows.1").unwrap();
        assert_eq!(windows.patch, 2);

        let apple = GitVersion::parse("git version 2.37.1 (Apple Git-137.1)").unwrap();
        assert_eq!(apple, GitVersion { major: 2, minor: 37, patch: 1 });

        let rc = GitVersion::parse("git version 2.45.rc0").unwrap();
        assert_eq!(rc.patch, 0);
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(GitVersion::parse("version 2.39.2").is_err());
        assert!(GitVersion::parse("git 2.39.2").is_err());
        assert!(GitVersion::parse("git version x.y").is_err());
        assert!(GitVersion::parse("git version 2").is_err());
    }

    #[test]
    fn test_is_supported() {
        assert!(GitVersion { major: 2, minor: 23, patch: 0 }.is_supported());
        assert!(GitVersion { major: 3, minor: 0, patch: 0 }.is_supported());
        assert!(!GitVersion { major: 2, minor: 22, patch: 9 }.is_supported());
        assert!(!GitVersion { major: 1, minor: 99, patch: 0 }.is_supported());
    }

    #[test]
    fn test_detect_installed_git() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let version = GitVersion::detect(&GitExecutor::new(temp_dir.path())).unwrap();
        assert!(version.major >= 2);
    }

    #[test]
    fn test_display() {
        let version = GitVersion { major: 2, minor: 39, patch: 2 };
        assert_eq!(version.to_string(), "2.39.2");
    }
}
