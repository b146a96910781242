//! Overlap graph between operations.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::error::{PlanError, Result};
use crate::model::{Operation, OperationId};

/// Symmetric, irreflexive "cannot share a room" relation.
///
/// Operations are addressed by their position in the input sequence; each
/// position holds the sorted set of positions it conflicts with.
#[derive(Debug, Clone, Default)]
pub struct IncompatibilityRelation {
    ids: Vec<OperationId>,
    index: HashMap<OperationId, usize>,
    adjacency: Vec<BTreeSet<usize>>,
}

impl IncompatibilityRelation {
    /// Compare every unordered pair of operations exactly once.
    pub fn build(operations: &[Operation]) -> Result<Self> {
        let mut index = HashMap::with_capacity(operations.len());
        for (i, op) in operations.iter().enumerate() {
            op.validate()?;
            if index.insert(op.id.clone(), i).is_some() {
                return Err(PlanError::malformed(
                    format!("operation {}", op.id),
                    "duplicate operation id",
                ));
            }
        }

        let mut adjacency = vec![BTreeSet::new(); operations.len()];
        for (i, a) in operations.iter().enumerate() {
            for (j, b) in operations.iter().enumerate().skip(i + 1) {
                if a.overlaps(b) {
                    adjacency[i].insert(j);
                    adjacency[j].insert(i);
                }
            }
        }

        let relation = Self {
            ids: operations.iter().map(|op| op.id.clone()).collect(),
            index,
            adjacency,
        };
        debug!(
            operations = relation.len(),
            conflicts = relation.edge_count(),
            "built incompatibility relation"
        );
        Ok(relation)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Operation ids in input order
    pub fn operation_ids(&self) -> &[OperationId] {
        &self.ids
    }

    pub fn index_of(&self, id: &OperationId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id(&self, index: usize) -> &OperationId {
        &self.ids[index]
    }

    pub fn neighbor_indices(&self, index: usize) -> &BTreeSet<usize> {
        &self.adjacency[index]
    }

    pub fn conflicts(&self, a: &OperationId, b: &OperationId) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(i), Some(j)) => self.adjacency[i].contains(&j),
            _ => false,
        }
    }

    /// Conflicting operations of `id`, in input order. Unknown ids have none.
    pub fn neighbors(&self, id: &OperationId) -> impl Iterator<Item = &OperationId> + '_ {
        self.index_of(id)
            .into_iter()
            .flat_map(move |i| self.adjacency[i].iter().map(move |&j| &self.ids[j]))
    }

    pub fn degree(&self, id: &OperationId) -> usize {
        self.index_of(id).map_or(0, |i| self.adjacency[i].len())
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Every conflicting pair once, as `(i, j)` positions with `i < j`.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(i, set)| set.range(i + 1..).map(move |&j| (i, j)))
    }

    /// Id-keyed view for presentation
    pub fn to_map(&self) -> BTreeMap<&OperationId, Vec<&OperationId>> {
        self.ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id, self.adjacency[i].iter().map(|&j| &self.ids[j]).collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, op, path_of_three};

    #[test]
    fn test_path_of_three() {
        let relation = IncompatibilityRelation::build(&path_of_three()).unwrap();
        let (a, b, c) = (&"A".into(), &"B".into(), &"C".into());

        assert!(relation.conflicts(a, b));
        assert!(relation.conflicts(b, c));
        assert!(!relation.conflicts(a, c));
        assert_eq!(relation.edge_count(), 2);
        assert_eq!(relation.degree(b), 2);
        assert_eq!(relation.neighbors(b).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(relation.pairs().collect::<Vec<_>>(), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_empty() {
        let relation = IncompatibilityRelation::build(&[]).unwrap();
        assert!(relation.is_empty());
        assert_eq!(relation.edge_count(), 0);
        assert_eq!(relation.pairs().count(), 0);
    }

    #[test]
    fn test_symmetric_irreflexive_and_exhaustive() {
        // Staggered windows of varying length with shared endpoints
        let operations: Vec<Operation> = (0..12u32)
            .map(|k| {
                let start = 8 * 60 + (k * 37) % 300;
                let end = start + 30 + (k * 53) % 120;
                op(
                    &format!("OP{:02}", k),
                    (start / 60, start % 60),
                    (end / 60, end % 60),
                )
            })
            .collect();
        let relation = IncompatibilityRelation::build(&operations).unwrap();

        for (i, a) in operations.iter().enumerate() {
            assert!(!relation.conflicts(&a.id, &a.id), "{} conflicts with itself", a.id);
            for (j, b) in operations.iter().enumerate() {
                if i == j {
                    continue;
                }
                let expected = (a.start <= b.start && b.start < a.end)
                    || (b.start <= a.start && a.start < b.end);
                assert_eq!(relation.conflicts(&a.id, &b.id), expected, "{} vs {}", a.id, b.id);
                assert_eq!(relation.conflicts(&a.id, &b.id), relation.conflicts(&b.id, &a.id));
            }
        }

        let pair_count = relation.pairs().count();
        assert_eq!(pair_count, relation.edge_count());
        assert!(relation.pairs().all(|(i, j)| i < j));
    }

    #[test]
    fn test_not_transitive() {
        let relation = IncompatibilityRelation::build(&path_of_three()).unwrap();
        // A-B and B-C do not imply A-C
        assert!(relation.conflicts(&"A".into(), &"B".into()));
        assert!(relation.conflicts(&"B".into(), &"C".into()));
        assert!(!relation.conflicts(&"A".into(), &"C".into()));
    }

    #[test]
    fn test_rejects_duplicates_and_bad_windows() {
        let mut operations = path_of_three();
        operations.push(op("A", (12, 0), (13, 0)));
        assert!(IncompatibilityRelation::build(&operations).is_err());

        let mut broken = op("D", (12, 0), (13, 0));
        broken.end = at(11, 0);
        assert!(matches!(
            IncompatibilityRelation::build(&[broken]),
            Err(PlanError::MalformedInput { .. })
        ));
    }
}
