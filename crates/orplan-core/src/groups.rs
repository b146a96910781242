//! Partition of operations into conflict-free groups.
//!
//! Groups are extracted greedily: scan the pending operations in ascending
//! id order and take every operation that conflicts with nothing taken so
//! far. What is taken forms a group; the rest stays pending for the next
//! round. Each round places at least one operation, so the loop ends after
//! at most `n` rounds and the groups partition the input exactly.

use serde::Serialize;
use tracing::debug;

use crate::conflict::IncompatibilityRelation;
use crate::error::{PlanError, Result};
use crate::model::OperationId;

/// Operations that can share one room: no two members conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Group {
    /// Sorted ascending
    members: Vec<OperationId>,
}

impl Group {
    /// Build a group from arbitrary ids. Does not check conflicts.
    pub fn new(mut members: Vec<OperationId>) -> Self {
        members.sort();
        members.dedup();
        Self { members }
    }

    pub fn members(&self) -> &[OperationId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &OperationId) -> bool {
        self.members.binary_search(id).is_ok()
    }

    pub fn is_conflict_free(&self, relation: &IncompatibilityRelation) -> bool {
        self.members.iter().enumerate().all(|(i, a)| {
            self.members[i + 1..]
                .iter()
                .all(|b| !relation.conflicts(a, b))
        })
    }
}

/// One greedy round over an immutable pending snapshot (positions sorted by id).
/// Returns the positions placed in the new group and those still pending.
fn extract_group(pending: &[usize], relation: &IncompatibilityRelation) -> (Vec<usize>, Vec<usize>) {
    let mut in_group = vec![false; relation.len()];
    let mut placed = Vec::new();
    let mut remaining = Vec::new();

    for &op in pending {
        if relation.neighbor_indices(op).iter().any(|&n| in_group[n]) {
            remaining.push(op);
        } else {
            in_group[op] = true;
            placed.push(op);
        }
    }

    (placed, remaining)
}

fn generate_from(mut pending: Vec<usize>, relation: &IncompatibilityRelation) -> Vec<Group> {
    pending.sort_by(|&a, &b| relation.id(a).cmp(relation.id(b)));

    let mut groups = Vec::new();
    while !pending.is_empty() {
        let (placed, remaining) = extract_group(&pending, relation);
        // placed keeps the id order of the snapshot
        groups.push(Group {
            members: placed.iter().map(|&i| relation.id(i).clone()).collect(),
        });
        pending = remaining;
    }

    debug!(
        operations = relation.len(),
        groups = groups.len(),
        "generated conflict-free groups"
    );
    groups
}

/// Partition every operation of `relation` into conflict-free groups.
pub fn generate(relation: &IncompatibilityRelation) -> Vec<Group> {
    generate_from((0..relation.len()).collect(), relation)
}

/// Partition the given subset of operations into conflict-free groups.
pub fn generate_for(operations: &[OperationId], relation: &IncompatibilityRelation) -> Result<Vec<Group>> {
    let mut pending = Vec::with_capacity(operations.len());
    for id in operations {
        let index = relation
            .index_of(id)
            .ok_or_else(|| PlanError::UnknownOperation(id.to_string()))?;
        pending.push(index);
    }
    pending.sort_unstable();
    pending.dedup();
    Ok(generate_from(pending, relation))
}
