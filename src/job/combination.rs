//! Cartesian expansion of field value-sets into sub-job combinations.

use std::fmt;

use super::{FieldSpec, Value};

/// One element of the cartesian product: `(field, value)` pairs in the
/// field order of the expanded [`FieldSpec`].
///
/// Two combinations are equal iff their pair sequences are equal, which is
/// also the identity used against the skip list and the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobCombination(Vec<(String, Value)>);

impl JobCombination {
    pub fn new(pairs: Vec<(String, Value)>) -> Self {
        JobCombination(pairs)
    }

    pub fn pairs(&self) -> &[(String, Value)] {
        &self.0
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl fmt::Display for JobCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Expands every field of `spec` into the cartesian product of its values.
///
/// Scalars count as a single candidate, lists keep their given order.
/// Duplicate candidate values are not removed, so they produce duplicate
/// combinations. An empty spec yields one empty combination.
pub fn expand(spec: &FieldSpec) -> Vec<JobCombination> {
    let mut product: Vec<Vec<(String, Value)>> = vec![vec![]];

    for (name, value) in spec.iter() {
        let candidates = value.candidates();
        product = product
            .iter()
            .flat_map(|prefix| {
                candidates.iter().map(move |candidate| {
                    let mut pairs = prefix.clone();
                    pairs.push((name.to_string(), candidate.clone()));
                    pairs
                })
            })
            .collect();
    }

    product.into_iter().map(JobCombination).collect()
}

/// Puts combinations in the deterministic order job ids are assigned in.
///
/// Pairs are compared field by field; numbers order numerically.
pub fn order_combinations(mut combinations: Vec<JobCombination>) -> Vec<JobCombination> {
    combinations.sort();
    combinations
}

// -- Tests -------------------------------------------------------------------
