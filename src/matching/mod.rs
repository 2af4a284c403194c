//! Cross-dataset matching: the pairwise equivalence test and the
//! disjoint-set assembly of matched records into groups.

pub mod assembler;
pub mod matcher;
pub mod union_find;

pub use assembler::{assemble, Group, MalformedPolicy, Partition};
pub use matcher::{MatchFields, Matcher, Tolerances};
