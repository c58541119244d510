mod helpers;

use gitpanel::git::{DEFAULT_TIMESTAMP_FORMAT, QueryKind, SyncEvent, Upstream};
use gitpanel::{GitError, Repository};
use helpers::{create_bare_remote, create_clone, create_commit, create_test_repo, git};
use tempfile::TempDir;

#[tokio::test]
async fn test_init_remote_checks_out_tracked_branch() {
    let (_remote_temp, bare_path) = create_bare_remote();
    let work = TempDir::new().unwrap();
    let mut repo = Repository::new(work.path());

    let outcome = repo
        .init_remote(bare_path.to_str().unwrap())
        .await
        .expect("init should not hard-fail");

    assert!(!outcome.failed(), "{:?}", outcome.steps);
    assert_eq!(outcome.steps.len(), 5);
    assert!(work.path().join("README.md").exists());
    assert_eq!(repo.current_branch().unwrap().as_deref(), Some("main"));
    assert!(repo.last_sync_timestamp(DEFAULT_TIMESTAMP_FORMAT).is_ok());
}

#[tokio::test]
async fn test_init_remote_reports_combined_failure() {
    let missing = TempDir::new().unwrap();
    let url = missing.path().join("nope.git");
    let work = TempDir::new().unwrap();
    let mut repo = Repository::new(work.path());

    let outcome = repo.init_remote(url.to_str().unwrap()).await.unwrap();

    assert!(outcome.failed());
    // init, branch rename and remote add still succeeded
    assert!(outcome.steps[..3].iter().all(|step| step.success()));
    assert!(!outcome.steps[3].success());
    assert!(!outcome.message().is_empty());
    assert!(work.path().join(".git").exists());
}

#[tokio::test]
async fn test_sync_both_ways_pushes_local_commits() {
    let (_remote_temp, bare_path) = create_bare_remote();
    let (_clone_temp, clone_path) = create_clone(&bare_path);
    create_commit(&clone_path, "feature.txt", "work", "Local work");

    let mut repo = Repository::new(&clone_path);
    let outgoing = repo.outgoing_log("origin/main").unwrap().value;
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].message, "Local work");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let outcome = repo.sync_both_ways(Some(&tx)).await.unwrap();

    assert!(!outcome.failed(), "{:?}", outcome);
    assert!(matches!(rx.recv().await, Some(SyncEvent::PullComplete(_))));
    assert!(matches!(rx.recv().await, Some(SyncEvent::PushComplete(_))));
    assert!(matches!(rx.recv().await, Some(SyncEvent::BothComplete(_))));

    let remote_subject = git(&bare_path, &["log", "-1", "--format=%s", "main"]);
    assert_eq!(remote_subject, "Local work");
    assert!(repo.outgoing_log("origin/main").unwrap().value.is_empty());
}

#[tokio::test]
async fn test_sync_both_ways_pulls_remote_commits() {
    let (_remote_temp, bare_path) = create_bare_remote();
    let (_a_temp, first_clone) = create_clone(&bare_path);
    let (_b_temp, second_clone) = create_clone(&bare_path);

    create_commit(&first_clone, "shared.txt", "from first", "Shared change");
    git(&first_clone, &["push"]);

    let mut repo = Repository::new(&second_clone);
    let outcome = repo.sync_both_ways(None).await.unwrap();

    assert!(outcome.pull.success(), "{}", outcome.pull.text);
    assert!(second_clone.join("shared.txt").exists());
}

#[tokio::test]
async fn test_sync_without_remote_still_attempts_push() {
    let (_temp, repo_path) = create_test_repo();
    create_commit(&repo_path, "file.txt", "content", "Initial commit");
    let mut repo = Repository::new(&repo_path);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let outcome = repo.sync_both_ways(Some(&tx)).await.unwrap();

    assert!(!outcome.pull.success());
    assert!(!outcome.push.success());
    assert!(outcome.failed());
    assert!(matches!(rx.recv().await, Some(SyncEvent::PullComplete(_))));
    assert!(matches!(rx.recv().await, Some(SyncEvent::PushComplete(p)) if !p.text.is_empty()));
}

#[tokio::test]
async fn test_remote_head_branch() {
    let (_remote_temp, bare_path) = create_bare_remote();
    let (_clone_temp, clone_path) = create_clone(&bare_path);
    let mut repo = Repository::new(&clone_path);

    let head = repo.remote_head_branch().await.unwrap();

    assert_eq!(head.as_deref(), Some("origin/main"));
    assert_eq!(
        repo.remote_url().unwrap().as_deref(),
        bare_path.to_str()
    );
}

#[test]
fn test_refresh_tracks_upstream_logs() {
    let (_remote_temp, bare_path) = create_bare_remote();
    let (_clone_temp, clone_path) = create_clone(&bare_path);
    create_commit(&clone_path, "one.txt", "1", "First local");
    create_commit(&clone_path, "two.txt", "2", "Second local");

    let mut repo = Repository::new(&clone_path)
        .with_upstream(Upstream::new("origin", "main"))
        .with_recent_log_count(5);

    let first = repo.refresh().unwrap();
    let second = repo.refresh().unwrap();

    assert!(first.changed);
    assert!(!second.changed);
    assert_eq!(first.value.recent_logs.len(), 1);
    assert_eq!(first.value.recent_logs[0].message, "Initial commit");
    assert_eq!(first.value.commit_logs.len(), 2);
    assert_eq!(first.value.commit_logs[0].message, "Second local");
    assert_eq!(repo.parse_count(QueryKind::RecentLog), 1);
    assert_eq!(repo.parse_count(QueryKind::OutgoingLog), 1);
}

#[test]
fn test_recent_log_for_unknown_remote_reports_failure() {
    let (_temp, repo_path) = create_test_repo();
    create_commit(&repo_path, "file.txt", "content", "Initial commit");
    let mut repo = Repository::new(&repo_path);

    let recent = repo.recent_log("origin/main", 10).unwrap();

    assert!(recent.value.is_empty());
    assert!(!recent.changed);
    let failure = recent.failure.expect("unknown revision should be reported");
    assert!(failure.text.contains("origin/main"), "{}", failure.text);
    assert_eq!(repo.parse_count(QueryKind::RecentLog), 0);
}

#[test]
fn test_last_sync_timestamp_before_any_fetch() {
    let (_temp, repo_path) = create_test_repo();
    let repo = Repository::new(&repo_path);

    assert!(matches!(
        repo.last_sync_timestamp(DEFAULT_TIMESTAMP_FORMAT),
        Err(GitError::MissingMetadataFile(_))
    ));
}
