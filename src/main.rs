mod cli;

use clap::Parser;
use cli::{Cli, Command};
use gitpanel::config::Config;
use gitpanel::git::{ClassifiedStatus, CommitLogRecord, RawOutput, RestoreMode, SyncEvent};
use gitpanel::{AppError, AppResult, GitVersion, Repository};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = Config::load_or_default()?;

    // init runs before a repository exists, so it skips discovery
    let root = match cli.command {
        Command::Init { .. } => env::current_dir()?,
        _ => Repository::discover()?.path().to_path_buf(),
    };
    let mut repo = Repository::from_config(&root, &config)?;
    GitVersion::validate(repo.runner())?;

    match cli.command {
        Command::Init { url } => {
            let outcome = repo.init_remote(&url).await?;
            if outcome.failed() {
                for step in outcome.steps.iter().filter(|s| !s.success()) {
                    eprintln!("{}", step.text);
                }
                process::exit(1);
            }
            println!("{}", outcome.message());
        }
        Command::Status { json } => {
            let refreshed = repo.refresh()?;
            if let Some(failure) = &refreshed.failure {
                eprintln!("warning: {}", failure.headline());
            }
            let snapshot = refreshed.value;

            if json {
                let json = serde_json::to_string_pretty(&*snapshot)
                    .map_err(|e| AppError::Io(e.into()))?;
                println!("{}", json);
            } else {
                let branch = repo.current_branch()?.unwrap_or_else(|| "(detached)".to_string());
                println!("{}", branch_line(&branch, &repo.upstream().to_string()));
                match repo.last_sync_timestamp(&config.display.timestamp_format) {
                    Ok(when) => println!("Last update: {}", when),
                    Err(_) => println!("Last update: never"),
                }
                print_commits("Recent", &snapshot.recent_logs);
                print_commits("Outgoing", &snapshot.commit_logs);
                print_entries("Staged", &snapshot.staged);
                print_entries("Working", &snapshot.working);
            }
        }
        Command::Log { count } => {
            let count = count.unwrap_or(config.display.recent_log_count);
            let remote = match repo.remote_head_branch().await? {
                Some(head) => head,
                None => repo.upstream().to_string(),
            };

            let recent = repo.recent_log(&remote, count)?;
            let outgoing = repo.outgoing_log(&remote)?;
            for failure in [&recent.failure, &outgoing.failure].into_iter().flatten() {
                eprintln!("warning: {}", failure.headline());
            }
            print_commits(&format!("Recent on {}", remote), &recent.value);
            print_commits("Outgoing", &outgoing.value);
        }
        Command::Add { path, all } => {
            let output = match path {
                Some(path) if !all => repo.add(&path)?,
                _ => repo.add_all()?,
            };
            report(&output);
        }
        Command::Restore { path, staged } => {
            let mode = if staged {
                RestoreMode::Staged
            } else {
                RestoreMode::Worktree
            };
            report(&repo.restore(&path, mode)?);
        }
        Command::Commit { message } => {
            report(&repo.commit(&message)?);
        }
        Command::Resolve { side, path } => {
            let resolution = repo.resolve_conflict(side.into(), &path)?;
            report(&resolution.checkout);
            report(&resolution.commit);
        }
        Command::Sync => {
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let printer = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    match event {
                        SyncEvent::PullComplete(pull) => println!("Pull: {}", pull.headline()),
                        SyncEvent::PushComplete(push) => println!("Push: {}", push.headline()),
                        SyncEvent::BothComplete(outcome) if !outcome.failed() => {
                            println!("Synchronized.")
                        }
                        SyncEvent::BothComplete(_) => {}
                    }
                }
            });

            let outcome = repo.sync_both_ways(Some(&tx)).await?;
            drop(tx);
            let _ = printer.await;

            if outcome.failed() {
                process::exit(1);
            }
        }
        Command::LastSync => {
            println!("{}", repo.last_sync_timestamp(&config.display.timestamp_format)?);
        }
        Command::Deinit { .. } => {
            repo.delete_repository_metadata()?;
            println!("Removed {}", root.join(".git").display());
        }
    }

    Ok(())
}

/// Local branch first, then the upstream it tracks
fn branch_line(branch: &str, upstream: &str) -> String {
    format!("Branch: {} -> {}", branch, upstream)
}

fn report(output: &RawOutput) {
    if output.success() {
        if !output.text.is_empty() {
            println!("{}", output.text);
        }
    } else {
        eprintln!("{}", output.text);
    }
}

fn print_commits(title: &str, commits: &[CommitLogRecord]) {
    println!("\n{} ({})", title, commits.len());
    for commit in commits {
        println!("  {} {}", commit.hash, commit.message);
    }
}

fn print_entries(title: &str, entries: &[ClassifiedStatus]) {
    println!("\n{} ({})", title, entries.len());
    for entry in entries {
        println!("  {:<9} {}", entry.label, entry.path);
    }
}
