use crate::git::parser::{CommitLogRecord, FileStatusRecord};
use std::sync::Arc;

/// The queries whose output is memoized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Status,
    RecentLog,
    OutgoingLog,
}

/// Records returned by a cache lookup
#[derive(Debug, Clone)]
pub struct Lookup<T> {
    pub records: Arc<[T]>,
    /// False when the raw text matched and the stored records came back
    pub changed: bool,
}

/// Last raw text and parsed records for one query kind
#[derive(Debug)]
pub struct CacheSlot<T> {
    signature: Vec<String>,
    raw: Option<String>,
    records: Arc<[T]>,
    parses: u64,
}

impl<T> Default for CacheSlot<T> {
    fn default() -> Self {
        Self {
            signature: Vec::new(),
            raw: None,
            records: Arc::from(Vec::new()),
            parses: 0,
        }
    }
}

impl<T> CacheSlot<T> {
    /// Return the stored records when both the argument signature and the
    /// raw text match the last call; otherwise parse and store
    pub fn get_or_parse<F>(&mut self, signature: &[&str], raw: &str, parse: F) -> Lookup<T>
    where
        F: FnOnce(&str) -> Vec<T>,
    {
        let hit = self.raw.as_deref() == Some(raw)
            && self.signature.iter().map(String::as_str).eq(signature.iter().copied());

        if hit {
            return Lookup {
                records: Arc::clone(&self.records),
                changed: false,
            };
        }

        let records: Arc<[T]> = Arc::from(parse(raw));
        self.parses += 1;
        self.signature = signature.iter().map(|s| s.to_string()).collect();
        self.raw = Some(raw.to_string());
        self.records = Arc::clone(&records);

        Lookup {
            records,
            changed: true,
        }
    }

    pub fn records(&self) -> Arc<[T]> {
        Arc::clone(&self.records)
    }

    /// Number of times this slot has invoked its parser
    pub fn parse_count(&self) -> u64 {
        self.parses
    }
}

/// Per-repository memo of the last output of each query kind
#[derive(Debug, Default)]
pub struct ResultCache {
    status: CacheSlot<FileStatusRecord>,
    recent_log: CacheSlot<CommitLogRecord>,
    outgoing_log: CacheSlot<CommitLogRecord>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&mut self) -> &mut CacheSlot<FileStatusRecord> {
        &mut self.status
    }

    pub fn recent_log(&mut self) -> &mut CacheSlot<CommitLogRecord> {
        &mut self.recent_log
    }

    pub fn outgoing_log(&mut self) -> &mut CacheSlot<CommitLogRecord> {
        &mut self.outgoing_log
    }

    pub fn parse_count(&self, kind: QueryKind) -> u64 {
        match kind {
            QueryKind::Status => self.status.parse_count(),
            QueryKind::RecentLog => self.recent_log.parse_count(),
            QueryKind::OutgoingLog => self.outgoing_log.parse_count(),
        }
    }

    /// Forget everything, as if no query had run
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
