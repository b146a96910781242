//! Greedy starting point for the direct assignment model.
//!
//! Operations are placed in start-time order, each into the cheapest room
//! none of whose occupants it conflicts with. Every occupant conflicting
//! with the operation being placed is running at its start instant, so a
//! free room exists whenever there are at least as many rooms as operations
//! running at any one time: the greedy fails only on infeasible instances.

use tracing::debug;

use crate::conflict::IncompatibilityRelation;
use crate::formulate::AssignmentModel;
use crate::model::Operation;

/// A feasible 0/1 point for `model`, or `None` when some operation finds no
/// free room. `operations` must be the slice the model was built from.
pub fn greedy_assignment(
    model: &AssignmentModel,
    operations: &[Operation],
    relation: &IncompatibilityRelation,
) -> Option<Vec<f64>> {
    let mut order: Vec<usize> = (0..operations.len()).collect();
    order.sort_by(|&a, &b| {
        operations[a]
            .start
            .cmp(&operations[b].start)
            .then_with(|| operations[a].id.cmp(&operations[b].id))
    });

    let mut occupants: Vec<Vec<usize>> = vec![Vec::new(); model.rooms.len()];
    let mut values = vec![0.0; model.problem.num_variables()];
    for i in order {
        let index = relation.index_of(&operations[i].id)?;
        let neighbors = relation.neighbor_indices(index);

        let room = (0..model.rooms.len())
            .filter(|&r| occupants[r].iter().all(|o| !neighbors.contains(o)))
            .min_by(|&a, &b| model.cost(i, a).total_cmp(&model.cost(i, b)));
        let Some(room) = room else {
            debug!(operation = %operations[i].id, "greedy start failed: no free room");
            return None;
        };

        occupants[room].push(index);
        values[model.variable(i, room)] = 1.0;
    }
    Some(values)
}
