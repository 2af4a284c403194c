use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::matcher::{MatchFields, Matcher};
use super::union_find::DisjointSet;
use crate::data::model::{lookup, Dataset, Record, RecordKey};
use crate::error::MatchError;

// ---------------------------------------------------------------------------
// Policy for records whose matching fields do not parse
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Log the record and leave it out of every comparison.
    #[default]
    Skip,
    /// Stop the run with the parse error. Fields are checked for every
    /// complete record before matching starts, so this fires even when the
    /// record has no partner to be compared with.
    Abort,
}

// ---------------------------------------------------------------------------
// Partition – the assembled groups
// ---------------------------------------------------------------------------

/// A set of records transitively linked by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Dense 1-based id, in order of group creation.
    pub id: usize,
    /// Members in the order they first joined a group.
    pub members: Vec<RecordKey>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The result of one assembly pass. Only matched records appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    groups: Vec<Group>,
    membership: HashMap<RecordKey, usize>,
}

impl Partition {
    fn from_groups(groups: Vec<Group>) -> Self {
        let membership = groups
            .iter()
            .flat_map(|g| g.members.iter().map(move |k| (*k, g.id)))
            .collect();
        Self { groups, membership }
    }

    /// Groups in id order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group by id.
    pub fn get(&self, id: usize) -> Option<&Group> {
        id.checked_sub(1).and_then(|i| self.groups.get(i))
    }

    /// Id of the group containing `key`, if it matched anything.
    pub fn group_of(&self, key: RecordKey) -> Option<usize> {
        self.membership.get(&key).copied()
    }

    /// Total number of grouped records.
    pub fn total_members(&self) -> usize {
        self.membership.len()
    }

    /// Resolve a group's members against the datasets it was built from.
    pub fn records<'a>(
        &'a self,
        group: &'a Group,
        datasets: &'a [Dataset],
    ) -> impl Iterator<Item = &'a Record> + 'a {
        group
            .members
            .iter()
            .filter_map(move |key| lookup(datasets, *key))
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Partition every record of every dataset into transitively linked groups.
///
/// Records are compared only across distinct datasets, always with the lower
/// dataset index on the reference side of the period test.
pub fn assemble(
    datasets: &[Dataset],
    matcher: &Matcher,
    policy: MalformedPolicy,
) -> Result<Partition, MatchError> {
    let mut offsets = Vec::with_capacity(datasets.len());
    let mut keys = Vec::new();
    for (d, ds) in datasets.iter().enumerate() {
        offsets.push(keys.len());
        keys.extend((0..ds.len()).map(|i| RecordKey::new(d, i)));
    }

    let fields = extract_fields(datasets, &keys, policy)?;

    let mut sets = DisjointSet::new(keys.len());
    let mut joined: Vec<Option<u64>> = vec![None; keys.len()];
    let mut next_group = 0u64;
    let mut next_join = 0u64;
    let mut comparisons = 0usize;
    let mut links = 0usize;

    for m in 0..datasets.len() {
        for n in (m + 1)..datasets.len() {
            for i in 0..datasets[m].len() {
                let a = offsets[m] + i;
                let Some(fa) = fields[a] else { continue };

                for j in 0..datasets[n].len() {
                    let b = offsets[n] + j;
                    let Some(fb) = fields[b] else { continue };

                    comparisons += 1;
                    if !matcher.matches_fields(&fa, &fb) {
                        continue;
                    }
                    links += 1;

                    match (joined[a].is_some(), joined[b].is_some()) {
                        (false, false) => {
                            sets.union(a, b);
                            sets.set_tag(a, next_group);
                            next_group += 1;
                            joined[a] = Some(next_join);
                            joined[b] = Some(next_join + 1);
                            next_join += 2;
                        }
                        (true, false) => {
                            sets.union(a, b);
                            joined[b] = Some(next_join);
                            next_join += 1;
                        }
                        (false, true) => {
                            sets.union(a, b);
                            joined[a] = Some(next_join);
                            next_join += 1;
                        }
                        (true, true) => {
                            if !sets.same_set(a, b) {
                                log::debug!("Merging groups of {} and {}", keys[a], keys[b]);
                                sets.union(a, b);
                            }
                        }
                    }
                }
            }
        }
    }

    // tag → [(join order, slot)]
    let mut by_tag: BTreeMap<u64, Vec<(u64, usize)>> = BTreeMap::new();
    for (slot, join) in joined.iter().enumerate() {
        if let Some(join) = join {
            by_tag.entry(sets.tag(slot)).or_default().push((*join, slot));
        }
    }

    let groups: Vec<Group> = by_tag
        .into_values()
        .enumerate()
        .map(|(i, mut members)| {
            members.sort_unstable();
            Group {
                id: i + 1,
                members: members.into_iter().map(|(_, slot)| keys[slot]).collect(),
            }
        })
        .collect();

    let partition = Partition::from_groups(groups);
    log::info!(
        "Compared {comparisons} record pairs across {} datasets: {links} matches, {} groups, {} grouped records",
        datasets.len(),
        partition.len(),
        partition.total_members()
    );
    Ok(partition)
}

/// Parse the matching fields of every arena slot once.
///
/// Incomplete records are inert; malformed ones follow `policy`.
fn extract_fields(
    datasets: &[Dataset],
    keys: &[RecordKey],
    policy: MalformedPolicy,
) -> Result<Vec<Option<MatchFields>>, MatchError> {
    let mut fields = Vec::with_capacity(keys.len());
    let mut skipped = 0usize;

    for key in keys {
        let Some(record) = lookup(datasets, *key) else {
            fields.push(None);
            continue;
        };
        if !record.is_complete() {
            log::debug!(
                "{} line {}: {} tokens, not matched",
                datasets[key.dataset].source.display(),
                record.line,
                record.tokens.len()
            );
            fields.push(None);
            continue;
        }
        match MatchFields::from_record(record) {
            Ok(f) => fields.push(Some(f)),
            Err(e) => match policy {
                MalformedPolicy::Abort => return Err(e.at(*key)),
                MalformedPolicy::Skip => {
                    log::warn!(
                        "{}: {e}, record skipped",
                        datasets[key.dataset].source.display()
                    );
                    skipped += 1;
                    fields.push(None);
                }
            },
        }
    }

    if skipped > 0 {
        log::warn!("{skipped} malformed records left out of matching");
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(line: usize, dispersion: f64, period: f64) -> Record {
        let tokens = vec![
            format!("2024-01-{line:02}"),
            dispersion.to_string(),
            "8.0".to_string(),
            "1".to_string(),
            "2".to_string(),
            "3".to_string(),
            "4".to_string(),
            period.to_string(),
        ];
        Record::new(tokens, line)
    }

    fn dataset(name: &str, values: &[(f64, f64)]) -> Dataset {
        let records = values
            .iter()
            .enumerate()
            .map(|(i, &(dm, p))| candidate(i + 1, dm, p))
            .collect();
        Dataset::new(name, records)
    }

    fn run(datasets: &[Dataset]) -> Partition {
        assemble(datasets, &Matcher::default(), MalformedPolicy::Skip).unwrap()
    }

    #[test]
    fn no_datasets_no_groups() {
        let p = run(&[]);
        assert!(p.is_empty());
        assert_eq!(p.total_members(), 0);
    }

    #[test]
    fn single_pair_forms_group() {
        let datasets = [
            dataset("a", &[(5.0, 10.0)]),
            dataset("b", &[(5.02, 10.05)]),
        ];
        let p = run(&datasets);
        assert_eq!(p.len(), 1);
        let g = p.get(1).unwrap();
        assert_eq!(g.members, [RecordKey::new(0, 0), RecordKey::new(1, 0)]);
        assert_eq!(p.group_of(RecordKey::new(1, 0)), Some(1));
    }

    #[test]
    fn unmatched_records_are_not_emitted() {
        let datasets = [
            dataset("a", &[(5.0, 10.0), (40.0, 3.0)]),
            dataset("b", &[(5.0, 10.0), (90.0, 7.0)]),
        ];
        let p = run(&datasets);
        assert_eq!(p.len(), 1);
        assert_eq!(p.group_of(RecordKey::new(0, 1)), None);
        assert_eq!(p.group_of(RecordKey::new(1, 1)), None);
    }

    #[test]
    fn same_dataset_records_are_never_linked_directly() {
        let datasets = [dataset("a", &[(5.0, 10.0), (5.0, 10.0)])];
        assert!(run(&datasets).is_empty());
    }

    #[test]
    fn duplicate_content_records_stay_distinct() {
        let datasets = [
            dataset("a", &[(5.0, 10.0)]),
            dataset("b", &[(5.0, 10.0)]),
            dataset("c", &[(5.0, 10.0)]),
        ];
        let p = run(&datasets);
        assert_eq!(p.len(), 1);
        assert_eq!(p.get(1).unwrap().len(), 3);
        let records: Vec<_> = p.records(p.get(1).unwrap(), &datasets).collect();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn chain_through_middle_dataset_is_one_group() {
        // x~y and y~z, but x and z are 1.8% apart
        let datasets = [
            dataset("x", &[(50.0, 100.0)]),
            dataset("y", &[(50.0, 100.9)]),
            dataset("z", &[(50.0, 101.8)]),
        ];
        let m = Matcher::default();
        assert!(!m.period_matches(100.0, 101.8));

        let p = run(&datasets);
        assert_eq!(p.len(), 1);
        assert_eq!(p.get(1).unwrap().len(), 3);
    }

    #[test]
    fn later_matches_join_existing_group() {
        let datasets = [
            dataset("a", &[(10.0, 1.0), (20.0, 2.0)]),
            dataset("b", &[(10.0, 1.0), (30.0, 3.0)]),
            dataset("c", &[(20.0, 2.0), (10.0, 1.0)]),
        ];
        let p = run(&datasets);
        assert_eq!(p.len(), 2);

        // a0, b0, c1 share (10, 1); a1, c0 share (20, 2).
        let first = p.group_of(RecordKey::new(0, 0)).unwrap();
        assert_eq!(p.group_of(RecordKey::new(1, 0)), Some(first));
        assert_eq!(p.group_of(RecordKey::new(2, 1)), Some(first));
        assert_eq!(p.group_of(RecordKey::new(0, 1)), p.group_of(RecordKey::new(2, 0)));
        assert_ne!(p.group_of(RecordKey::new(0, 1)), Some(first));
        assert_eq!(p.group_of(RecordKey::new(1, 1)), None);
    }

    #[test]
    fn bridge_arriving_last_merges_groups() {
        // Pair (0,1) groups a0 with b0. Pair (0,2) groups a1 with c0.
        // Pair (1,2) finds b0~c0, both already grouped differently → merge.
        let datasets = [
            dataset("a", &[(50.0, 100.0), (50.0, 102.7)]),
            dataset("b", &[(50.0, 100.9)]),
            dataset("c", &[(50.0, 101.8)]),
        ];
        let m = Matcher::default();
        assert!(!m.period_matches(100.0, 101.8));
        assert!(!m.period_matches(102.7, 100.9));
        assert!(m.period_matches(100.9, 101.8));

        let p = run(&datasets);
        assert_eq!(p.len(), 1);
        let g = p.get(1).unwrap();
        assert_eq!(
            g.members,
            [
                RecordKey::new(0, 0),
                RecordKey::new(1, 0),
                RecordKey::new(0, 1),
                RecordKey::new(2, 0),
            ]
        );
    }

    #[test]
    fn ids_follow_creation_order() {
        let datasets = [
            dataset("a", &[(90.0, 9.0), (10.0, 1.0)]),
            dataset("b", &[(10.0, 1.0), (90.0, 9.0)]),
        ];
        let p = run(&datasets);
        assert_eq!(p.len(), 2);
        assert_eq!(p.get(1).unwrap().members[0], RecordKey::new(0, 0));
        assert_eq!(p.get(2).unwrap().members[0], RecordKey::new(0, 1));
        assert!(p.get(0).is_none());
        assert!(p.get(3).is_none());
    }

    #[test]
    fn short_records_are_inert() {
        let short = Record::new(vec!["1".into(), "5.0".into()], 1);
        let datasets = [
            Dataset::new("a", vec![short.clone()]),
            Dataset::new("b", vec![short]),
        ];
        assert!(run(&datasets).is_empty());
    }

    #[test]
    fn malformed_policy_controls_failure() {
        let mut bad = candidate(1, 5.0, 10.0);
        bad.tokens[7] = "1.0.0".into();
        let datasets = [
            Dataset::new("a", vec![bad]),
            dataset("b", &[(5.0, 10.0)]),
            dataset("c", &[(5.0, 10.0)]),
        ];

        let err = assemble(&datasets, &Matcher::default(), MalformedPolicy::Abort).unwrap_err();
        assert!(matches!(
            err,
            MatchError::Record { key, .. } if key == RecordKey::new(0, 0)
        ));

        let p = assemble(&datasets, &Matcher::default(), MalformedPolicy::Skip).unwrap();
        assert_eq!(p.len(), 1);
        assert_eq!(p.group_of(RecordKey::new(0, 0)), None);
        assert_eq!(p.get(1).unwrap().len(), 2);
    }

    #[test]
    fn abort_checks_records_without_partners() {
        let mut bad = candidate(1, 5.0, 10.0);
        bad.tokens[7] = "1.0.0".into();
        let datasets = [Dataset::new("a", vec![bad]), Dataset::new("b", vec![])];

        let err = assemble(&datasets, &Matcher::default(), MalformedPolicy::Abort).unwrap_err();
        assert!(matches!(
            err,
            MatchError::Record { key, .. } if key == RecordKey::new(0, 0)
        ));
        assert!(assemble(&datasets, &Matcher::default(), MalformedPolicy::Skip)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn empty_datasets_do_not_shift_keys() {
        let datasets = [
            dataset("a", &[(5.0, 10.0)]),
            Dataset::empty(std::path::Path::new("missing")),
            dataset("c", &[(5.0, 10.0)]),
        ];
        let p = run(&datasets);
        assert_eq!(p.get(1).unwrap().members, [RecordKey::new(0, 0), RecordKey::new(2, 0)]);
    }
}
