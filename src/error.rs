use thiserror::Error;

use crate::data::model::RecordKey;

/// Failure to read the fields the matcher needs from a record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("line {line} has {len} tokens, at least {needed} are required")]
    TooShort { line: usize, len: usize, needed: usize },

    #[error("line {line}: field {position} ('{token}') is not a number")]
    Field {
        line: usize,
        position: usize,
        token: String,
    },

    #[error("record {key}")]
    Record {
        key: RecordKey,
        #[source]
        source: Box<MatchError>,
    },
}

impl MatchError {
    /// Attach the record's position to a field error.
    pub fn at(self, key: RecordKey) -> Self {
        MatchError::Record {
            key,
            source: Box::new(self),
        }
    }
}
