#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Run git in `dir`, panicking if it cannot be launched
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

/// Helper to create a test git repository on branch `main`
pub fn create_test_repo() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let repo_path = temp_dir.path().to_path_buf();

    git(&repo_path, &["init"]);
    git(&repo_path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(&repo_path, &["config", "user.name", "Test User"]);
    git(&repo_path, &["config", "user.email", "test@example.com"]);

    (temp_dir, repo_path)
}

/// Helper to create a commit
pub fn create_commit(repo_path: &Path, file: &str, content: &str, message: &str) {
    fs::write(repo_path.join(file), content).expect("Failed to write file");
    git(repo_path, &["add", file]);
    git(repo_path, &["commit", "-m", message]);
}

/// Bare repository whose HEAD points at `main`, seeded with one commit
pub fn create_bare_remote() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let bare_path = temp_dir.path().join("remote.git");
    fs::create_dir(&bare_path).unwrap();

    git(&bare_path, &["init", "--bare"]);
    git(&bare_path, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    let (_seed_temp, seed_path) = create_test_repo();
    create_commit(&seed_path, "README.md", "# project", "Initial commit");
    git(&seed_path, &["push", bare_path.to_str().unwrap(), "main"]);

    (temp_dir, bare_path)
}

/// Working clone of `bare_path` with `main` tracking `origin/main`
pub fn create_clone(bare_path: &Path) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let clone_path = temp_dir.path().join("work");

    git(
        temp_dir.path(),
        &["clone", bare_path.to_str().unwrap(), "work"],
    );
    git(&clone_path, &["config", "user.name", "Test User"]);
    git(&clone_path, &["config", "user.email", "test@example.com"]);

    (temp_dir, clone_path)
}

/// Leave `file.txt` in a merge conflict on `main`
pub fn create_conflict(repo_path: &Path) {
    create_commit(repo_path, "file.txt", "base", "Base");
    git(repo_path, &["checkout", "-b", "feature"]);
    create_commit(repo_path, "file.txt", "theirs", "Feature change");
    git(repo_path, &["checkout", "main"]);
    create_commit(repo_path, "file.txt", "ours", "Main change");
    git(repo_path, &["merge", "feature"]);
}
