//! Classification of short-format status codes.
//!
//! A status code is a pair of per-axis states (index, working tree). Each
//! axis that carries a change yields one [`ClassifiedStatus`] for that stage.

use crate::git::parser::FileStatusRecord;
use serde::{Serialize, Serializer};
use std::fmt;

/// State of a file on one axis of a short-format status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileState {
    Unmodified,
    Modified,
    TypeChanged,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
    Untracked,
    Ignored,
}

impl FileState {
    pub fn from_char(c: char) -> Option<Self> {
        let state = match c {
            ' ' => FileState::Unmodified,
            'M' => FileState::Modified,
            'T' => FileState::TypeChanged,
            'A' => FileState::Added,
            'D' => FileState::Deleted,
            'R' => FileState::Renamed,
            'C' => FileState::Copied,
            'U' => FileState::Unmerged,
            '?' => FileState::Untracked,
            '!' => FileState::Ignored,
            _ => return None,
        };
        Some(state)
    }

    pub fn as_char(self) -> char {
        match self {
            FileState::Unmodified => ' ',
            FileState::Modified => 'M',
            FileState::TypeChanged => 'T',
            FileState::Added => 'A',
            FileState::Deleted => 'D',
            FileState::Renamed => 'R',
            FileState::Copied => 'C',
            FileState::Unmerged => 'U',
            FileState::Untracked => '?',
            FileState::Ignored => '!',
        }
    }

    /// True when this axis carries a change
    pub fn is_changed(self) -> bool {
        self != FileState::Unmodified
    }
}

/// Two-character short-format status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode {
    pub index: FileState,
    pub worktree: FileState,
}

impl StatusCode {
    pub const UNTRACKED: StatusCode = StatusCode {
        index: FileState::Untracked,
        worktree: FileState::Untracked,
    };

    pub const CONFLICT: StatusCode = StatusCode {
        index: FileState::Unmerged,
        worktree: FileState::Unmerged,
    };

    /// Parse an exactly two-character code such as `"M "` or `"??"`
    pub fn parse(code: &str) -> Option<Self> {
        let mut chars = code.chars();
        let index = FileState::from_char(chars.next()?)?;
        let worktree = FileState::from_char(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(StatusCode { index, worktree })
    }

    pub fn is_rename(&self) -> bool {
        self.index == FileState::Renamed || self.worktree == FileState::Renamed
    }

    /// Whether the code contributes an entry to the staged list
    pub fn is_staged(&self) -> bool {
        if *self == Self::UNTRACKED || *self == Self::CONFLICT {
            return false;
        }
        self.index.is_changed()
    }

    /// Whether the code contributes an entry to the working list
    pub fn is_working(&self) -> bool {
        self.worktree.is_changed()
    }

    pub fn condition(&self) -> Condition {
        if *self == Self::CONFLICT {
            Condition::Conflict
        } else if *self == Self::UNTRACKED {
            Condition::Untracked
        } else {
            Condition::Detected
        }
    }

    /// State on the axis that belongs to `stage`
    pub fn state_for(&self, stage: Stage) -> FileState {
        match stage {
            Stage::Staged => self.index,
            Stage::Working => self.worktree,
        }
    }

    pub fn label_for(&self, stage: Stage) -> StatusLabel {
        match self.condition() {
            Condition::Conflict => StatusLabel::Conflict,
            Condition::Untracked => StatusLabel::Added,
            Condition::Detected => match self.state_for(stage) {
                FileState::Added => StatusLabel::Added,
                FileState::Deleted => StatusLabel::Deleted,
                _ => StatusLabel::Modified,
            },
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.index.as_char(), self.worktree.as_char())
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `is_staged` on a raw code; unparseable codes are never staged
pub fn is_staged(code: &str) -> bool {
    StatusCode::parse(code).is_some_and(|c| c.is_staged())
}

/// `is_working` on a raw code; unparseable codes are never working
pub fn is_working(code: &str) -> bool {
    StatusCode::parse(code).is_some_and(|c| c.is_working())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Staged,
    Working,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Detected,
    Untracked,
    Conflict,
}

/// Label key the presentation layer maps to text and icons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLabel {
    Added,
    Modified,
    Deleted,
    Conflict,
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::Added => "added",
            StatusLabel::Modified => "modified",
            StatusLabel::Deleted => "deleted",
            StatusLabel::Conflict => "conflict",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A status record placed on one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedStatus {
    pub status_code: StatusCode,
    pub path: String,
    pub name: String,
    pub extension: String,
    pub stage: Stage,
    pub condition: Condition,
    pub label: StatusLabel,
}

impl ClassifiedStatus {
    pub fn new(record: &FileStatusRecord, stage: Stage) -> Self {
        let code = record.status_code;
        Self {
            status_code: code,
            path: record.path.clone(),
            name: record.name.clone(),
            extension: record.extension.clone(),
            stage,
            condition: code.condition(),
            label: code.label_for(stage),
        }
    }
}

/// Split records into the staged and working lists, preserving order
pub fn classify(records: &[FileStatusRecord]) -> (Vec<ClassifiedStatus>, Vec<ClassifiedStatus>) {
    let mut staged = Vec::new();
    let mut working = Vec::new();

    for record in records {
        if record.status_code.is_staged() {
            staged.push(ClassifiedStatus::new(record, Stage::Staged));
        }
        if record.status_code.is_working() {
            working.push(ClassifiedStatus::new(record, Stage::Working));
        }
    }

    (staged, working)
}
