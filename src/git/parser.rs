//! Parsers for git's line-oriented text output.
//!
//! Every assumption about the shape of git's output lives here. The parsers
//! are pure: no I/O, no caching, and a line that does not fit the expected
//! shape is skipped rather than failing the whole parse.

use crate::git::status::StatusCode;
use serde::Serialize;
use std::path::Path;

/// Marker git puts between the source and destination of a rename
const RENAME_ARROW: &str = "-> ";

/// Split output on any newline convention, dropping empty lines
pub fn split_lines(output: &str) -> impl Iterator<Item = &str> {
    output.split(['\r', '\n']).filter(|line| !line.is_empty())
}

/// Parse `git status --short` output
pub fn parse_status_lines(output: &str) -> Vec<FileStatusRecord> {
    split_lines(output).filter_map(parse_status_line).collect()
}

/// Parse one short-format status line: `XY <path>` or `XY <from> -> <to>`
pub fn parse_status_line(line: &str) -> Option<FileStatusRecord> {
    let code = line.get(..2)?;
    let remainder = line.get(2..)?.strip_prefix(' ')?;
    let status_code = StatusCode::parse(code)?;

    let path = if status_code.is_rename() {
        match remainder.find(RENAME_ARROW) {
            Some(idx) => &remainder[idx + RENAME_ARROW.len()..],
            None => remainder,
        }
    } else {
        remainder
    };
    let path = path.trim_matches('"');
    if path.is_empty() {
        return None;
    }

    let name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let extension = name
        .rfind('.')
        .map(|idx| name[idx..].to_string())
        .unwrap_or_default();

    Some(FileStatusRecord {
        status_code,
        path: path.to_string(),
        name,
        extension,
    })
}

/// Parse `git log --oneline` output
pub fn parse_commit_lines(output: &str) -> Vec<CommitLogRecord> {
    split_lines(output).filter_map(parse_commit_line).collect()
}

/// Split a one-line log entry at its first space into hash and subject
///
/// A line without the separating space, or with nothing before it, is
/// not a log entry.
pub fn parse_commit_line(line: &str) -> Option<CommitLogRecord> {
    let (hash, message) = line.split_once(' ')?;
    if hash.is_empty() {
        return None;
    }

    Some(CommitLogRecord {
        hash: hash.to_string(),
        message: message.to_string(),
    })
}

/// Extract `<name>` from the `HEAD branch: <name>` line of `git remote show`
pub fn parse_remote_head(output: &str) -> Option<String> {
    split_lines(output)
        .filter_map(|line| line.trim().strip_prefix("HEAD branch:"))
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
}

/// One line of short-format status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStatusRecord {
    pub status_code: StatusCode,
    /// Destination path for renames
    pub path: String,
    pub name: String,
    /// Suffix from the last `.` of `name`, dot included; empty if none
    pub extension: String,
}

/// One line of `git log --oneline`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitLogRecord {
    pub hash: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::status::FileState;

    #[test]
    fn test_parse_status_staged_modification() {
        let records = parse_status_lines("M  src/Foo.cs");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status_code.to_string(), "M ");
        assert_eq!(records[0].path, "src/Foo.cs");
        assert_eq!(records[0].name, "Foo.cs");
        assert_eq!(records[0].extension, ".cs");
    }

    #[test]
    fn test_parse_status_rename_uses_destination() {
        let records = parse_status_lines("R  old.txt -> new.txt");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "new.txt");
        assert_eq!(records[0].name, "new.txt");
        assert_eq!(records[0].status_code.index, FileState::Renamed);
    }

    #[test]
    fn test_parse_status_quoted_rename() {
        let records = parse_status_lines("RM \"old name.txt\" -> \"dir/new name.txt\"");

        assert_eq!(records[0].path, "dir/new name.txt");
        assert_eq!(records[0].name, "new name.txt");
        assert_eq!(records[0].extension, ".txt");
    }

    #[test]
    fn test_parse_status_quoted_path() {
        let records = parse_status_lines("?? \"with space.md\"");

        assert_eq!(records[0].path, "with space.md");
        assert_eq!(records[0].status_code.to_string(), "??");
    }

    #[test]
    fn test_parse_status_all_newline_variants() {
        let output = " M a.rs\r\nA  b.rs\rD  c.rs\n\n?? d.rs\n";
        let records = parse_status_lines(output);

        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs", "c.rs", "d.rs"]);
    }

    #[test]
    fn test_parse_status_extension_rules() {
        let records = parse_status_lines("?? Makefile\n?? .gitignore\n?? archive.tar.gz");

        assert_eq!(records[0].extension, "");
        assert_eq!(records[1].extension, ".gitignore");
        assert_eq!(records[2].extension, ".gz");
    }

    #[test]
    fn test_parse_status_skips_malformed_lines() {
        let output = "M\nwarning: something localized\nMM\nM  ok.txt";
        let records = parse_status_lines(output);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "ok.txt");
    }

    #[test]
    fn test_parse_commit_lines() {
        let records = parse_commit_lines("a1b2c3d Fix bug in parser");

        assert_eq!(
            records,
            vec![CommitLogRecord {
                hash: "a1b2c3d".to_string(),
                message: "Fix bug in parser".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_commit_skips_lines_without_subject_separator() {
        let records = parse_commit_lines("a1b2c3d\r\nb2c3d4e  leading space kept\n orphan subject\nc3d4e5f ");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hash, "b2c3d4e");
        assert_eq!(records[0].message, " leading space kept");
        assert_eq!(records[1].hash, "c3d4e5f");
        assert_eq!(records[1].message, "");
        assert_eq!(parse_commit_line("a1b2c3d"), None);
    }

    #[test]
    fn test_parse_remote_head() {
        let output = "* remote origin\n  Fetch URL: git@example.com:repo.git\n  HEAD branch: main\n  Remote branch:\n    main tracked";

        assert_eq!(parse_remote_head(output), Some("main".to_string()));
        assert_eq!(parse_remote_head("* remote origin"), None);
        assert_eq!(parse_remote_head("  HEAD branch: (unknown)"), Some("(unknown)".to_string()));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_status_lines("").is_empty());
        assert!(parse_commit_lines("").is_empty());
        assert!(parse_commit_lines("\r\n\n").is_empty());
    }
}
