use crate::data::model::{Record, DISPERSION, MIN_TOKENS, PERIOD};
use crate::error::MatchError;

// ---------------------------------------------------------------------------
// Tolerances
// ---------------------------------------------------------------------------

/// Relative tolerances of the two equivalence tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub period: f64,
    pub dispersion: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            period: 0.01,
            dispersion: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// Pre-parsed matching fields
// ---------------------------------------------------------------------------

/// The numeric fields the equivalence tests read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchFields {
    pub dispersion: f64,
    pub period: f64,
}

impl MatchFields {
    /// Parse the dispersion and period fields of a record.
    pub fn from_record(record: &Record) -> Result<Self, MatchError> {
        if !record.is_complete() {
            return Err(MatchError::TooShort {
                line: record.line,
                len: record.tokens.len(),
                needed: MIN_TOKENS,
            });
        }
        Ok(Self {
            dispersion: parse_field(record, DISPERSION)?,
            period: parse_field(record, PERIOD)?,
        })
    }
}

fn parse_field(record: &Record, position: usize) -> Result<f64, MatchError> {
    let token = record.field(position).unwrap_or_default();
    token.parse::<f64>().map_err(|_| MatchError::Field {
        line: record.line,
        position,
        token: token.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Equivalence matcher
// ---------------------------------------------------------------------------

/// Decides whether two records from different datasets describe the same
/// source.
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    pub tolerances: Tolerances,
}

impl Matcher {
    pub fn new(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }

    /// Full predicate on two records. `a` is the reference side of the
    /// period test.
    pub fn matches(&self, a: &Record, b: &Record) -> Result<bool, MatchError> {
        let fa = MatchFields::from_record(a)?;
        let fb = MatchFields::from_record(b)?;
        Ok(self.matches_fields(&fa, &fb))
    }

    /// Predicate on pre-parsed fields.
    pub fn matches_fields(&self, a: &MatchFields, b: &MatchFields) -> bool {
        self.period_matches(a.period, b.period) && self.dispersion_matches(a.dispersion, b.dispersion)
    }

    /// Relative period difference measured against `reference` only.
    ///
    /// A zero reference period never matches.
    pub fn period_matches(&self, reference: f64, other: f64) -> bool {
        if reference == 0.0 {
            return false;
        }
        ((reference - other).abs() / reference) < self.tolerances.period
    }

    /// Relative dispersion difference measured against the larger value.
    ///
    /// A zero denominator counts as ratio 0.
    pub fn dispersion_matches(&self, v1: f64, v2: f64) -> bool {
        if v1 == v2 {
            return true;
        }
        let denominator = if v1 > v2 { v1 } else { v2 };
        let ratio = if denominator != 0.0 {
            (v1 - v2) / denominator
        } else {
            0.0
        };
        ratio.abs() < self.tolerances.dispersion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(dispersion: &str, period: &str) -> Record {
        let tokens = ["2024-01-01", dispersion, "9.5", "1", "2", "3", "4", period];
        Record::new(tokens.iter().map(|t| t.to_string()).collect(), 1)
    }

    #[test]
    fn close_period_and_dispersion_match() {
        let m = Matcher::default();
        assert!(m.matches(&candidate("5.0", "10.0"), &candidate("5.02", "10.05")).unwrap());
    }

    #[test]
    fn ten_percent_period_gap_does_not_match() {
        let m = Matcher::default();
        assert!(!m.matches(&candidate("5.0", "10.0"), &candidate("5.0", "11.0")).unwrap());
    }

    #[test]
    fn dispersion_gap_alone_breaks_match() {
        let m = Matcher::default();
        assert!(!m.matches(&candidate("5.0", "10.0"), &candidate("5.2", "10.0")).unwrap());
    }

    #[test]
    fn period_test_is_relative_to_first_record() {
        let m = Matcher::default();
        // |100 - 99.005| / 100 = 0.00995 but / 99.005 = 0.01005
        assert!(m.period_matches(100.0, 99.005));
        assert!(!m.period_matches(99.005, 100.0));
    }

    #[test]
    fn dispersion_test_uses_larger_value() {
        let m = Matcher::default();
        assert!(m.dispersion_matches(100.0, 99.005));
        assert!(m.dispersion_matches(99.005, 100.0));
        assert!(!m.dispersion_matches(100.0, 98.9));
        assert!(!m.dispersion_matches(98.9, 100.0));
    }

    #[test]
    fn zero_denominators_do_not_fault() {
        let m = Matcher::default();
        assert!(m.dispersion_matches(0.0, 0.0));
        // larger side is zero: ratio forced to 0
        assert!(m.dispersion_matches(0.0, -3.0));
        assert!(m.dispersion_matches(-3.0, 0.0));
        assert!(!m.period_matches(0.0, 0.0));
        assert!(!m.period_matches(0.0, 1.0));
    }

    #[test]
    fn tolerances_are_configurable() {
        let m = Matcher::new(Tolerances {
            period: 0.2,
            dispersion: 0.2,
        });
        assert!(m.matches(&candidate("5.0", "10.0"), &candidate("5.5", "11.0")).unwrap());
    }

    #[test]
    fn malformed_fields_are_reported() {
        let m = Matcher::default();
        let bad = candidate("5.0", "1.2.3");
        let err = m.matches(&candidate("5.0", "10.0"), &bad).unwrap_err();
        assert_eq!(
            err,
            MatchError::Field {
                line: 1,
                position: PERIOD,
                token: "1.2.3".into()
            }
        );

        let short = Record::new(vec!["1".into(), "2".into()], 9);
        assert!(matches!(
            MatchFields::from_record(&short),
            Err(MatchError::TooShort { line: 9, len: 2, .. })
        ));
    }
}
