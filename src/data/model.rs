use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Field positions within a record
// ---------------------------------------------------------------------------

/// Opaque label (usually an observation timestamp).
pub const LABEL: usize = 0;
/// Dispersion measure.
pub const DISPERSION: usize = 1;
/// Signal-to-noise ratio.
pub const SIGNAL: usize = 2;
/// Period.
pub const PERIOD: usize = 7;
/// Records shorter than this are carried but never matched or plotted.
pub const MIN_TOKENS: usize = PERIOD + 1;

// ---------------------------------------------------------------------------
// Record – the numeric-looking tokens of one input line
// ---------------------------------------------------------------------------

/// One parsed line of a candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Tokens that contain at least one digit, in line order.
    pub tokens: Vec<String>,
    /// 1-based line number in the source file.
    pub line: usize,
}

impl Record {
    pub fn new(tokens: Vec<String>, line: usize) -> Self {
        Self { tokens, line }
    }

    /// Token at a fixed field position, if the record is long enough.
    pub fn field(&self, position: usize) -> Option<&str> {
        self.tokens.get(position).map(String::as_str)
    }

    /// Whether the record carries every field the matcher reads.
    pub fn is_complete(&self) -> bool {
        self.tokens.len() >= MIN_TOKENS
    }

    /// Tokens joined by single spaces, as written to group files.
    pub fn joined(&self) -> String {
        self.tokens.join(" ")
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.joined())
    }
}

// ---------------------------------------------------------------------------
// RecordKey – identity of a record independent of its contents
// ---------------------------------------------------------------------------

/// Position of a record: dataset index plus index within that dataset.
///
/// Two records with identical tokens still have distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub dataset: usize,
    pub index: usize,
}

impl RecordKey {
    pub fn new(dataset: usize, index: usize) -> Self {
        Self { dataset, index }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dataset, self.index)
    }
}

// ---------------------------------------------------------------------------
// Dataset – all records of one file
// ---------------------------------------------------------------------------

/// The records loaded from one candidate file.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// File the records came from.
    pub source: PathBuf,
    /// Records in file order.
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(source: impl Into<PathBuf>, records: Vec<Record>) -> Self {
        Self {
            source: source.into(),
            records,
        }
    }

    /// An empty dataset standing in for a file that could not be read.
    pub fn empty(source: &Path) -> Self {
        Self::new(source, Vec::new())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }
}

/// Resolve a key against the loaded datasets.
pub fn lookup(datasets: &[Dataset], key: RecordKey) -> Option<&Record> {
    datasets.get(key.dataset)?.get(key.index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tokens: &[&str]) -> Record {
        Record::new(tokens.iter().map(|t| t.to_string()).collect(), 1)
    }

    #[test]
    fn completeness_follows_period_position() {
        assert!(!record(&["1", "2", "3", "4", "5", "6", "7"]).is_complete());
        assert!(record(&["1", "2", "3", "4", "5", "6", "7", "8"]).is_complete());
    }

    #[test]
    fn lookup_resolves_keys_and_rejects_out_of_range() {
        let datasets = vec![
            Dataset::new("a.txt", vec![record(&["1"])]),
            Dataset::new("b.txt", vec![record(&["2"]), record(&["3"])]),
        ];
        assert_eq!(lookup(&datasets, RecordKey::new(1, 1)).unwrap().tokens, ["3"]);
        assert!(lookup(&datasets, RecordKey::new(0, 1)).is_none());
        assert!(lookup(&datasets, RecordKey::new(2, 0)).is_none());
    }

    #[test]
    fn duplicate_content_keeps_distinct_keys() {
        let a = RecordKey::new(0, 0);
        let b = RecordKey::new(1, 0);
        assert_ne!(a, b);
        assert_eq!(record(&["5", "6"]), record(&["5", "6"]));
    }
}
