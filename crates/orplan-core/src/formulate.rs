//! Binary programs over operations, rooms and conflict-free groups.
//!
//! Three models share the same coverage rows ("every operation is hosted"):
//!
//! - direct assignment: `x[op,room]`, minimize total room cost, with one
//!   exclusion row per conflicting pair and room;
//! - cost cover: `y[group]` weighted by the summed average cost of its members;
//! - room cover: `y[group]` with unit weight, i.e. the fewest room-days.
//!
//! Assignment coverage is `>= 1`. With strictly positive costs the optimum
//! uses exactly one room per operation; zero costs may yield extra rooms.

use std::collections::HashMap;

use orplan_solver::{ConstraintOp, Problem};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::conflict::IncompatibilityRelation;
use crate::costs::{AverageCosts, CostTable};
use crate::error::{PlanError, Result};
use crate::groups::Group;
use crate::model::{Operation, OperationId, Room, RoomId};

/// How covering models count an operation hosted by several selected groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    /// `>= 1`: redundant coverage is allowed
    #[default]
    AtLeastOnce,
    /// `= 1`: selected groups must partition the operations
    Exactly,
}

impl Coverage {
    fn op(self) -> ConstraintOp {
        match self {
            Coverage::AtLeastOnce => ConstraintOp::Ge,
            Coverage::Exactly => ConstraintOp::Eq,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverKind {
    /// Minimize summed average cost of the selected groups
    Cost,
    /// Minimize the number of selected groups
    Rooms,
}

/// Direct assignment model. Variable `op * rooms.len() + room` is `x[op,room]`.
#[derive(Debug, Clone)]
pub struct AssignmentModel {
    pub problem: Problem,
    pub operations: Vec<OperationId>,
    pub rooms: Vec<RoomId>,
}

impl AssignmentModel {
    pub fn variable(&self, operation: usize, room: usize) -> usize {
        operation * self.rooms.len() + room
    }

    pub fn cost(&self, operation: usize, room: usize) -> f64 {
        self.problem.objective.coefficients[self.variable(operation, room)]
    }
}

/// Covering model. Variable `k` is `y[k]` for `groups[k]`.
#[derive(Debug, Clone)]
pub struct CoverModel {
    pub problem: Problem,
    pub kind: CoverKind,
    pub coverage: Coverage,
    pub groups: Vec<Group>,
    /// Summed average cost per group, when known
    pub group_costs: Option<Vec<f64>>,
}

pub fn formulate_assignment(
    operations: &[Operation],
    rooms: &[Room],
    relation: &IncompatibilityRelation,
    costs: &CostTable,
) -> Result<AssignmentModel> {
    let n_rooms = rooms.len();

    let mut variables = Vec::with_capacity(operations.len() * n_rooms);
    let mut objective = Vec::with_capacity(operations.len() * n_rooms);
    for op in operations {
        for room in rooms {
            variables.push(format!("x[{},{}]", op.id, room.id));
            objective.push(costs.cost(&room.id, &op.id)?);
        }
    }

    let mut position = HashMap::with_capacity(operations.len());
    for (i, op) in operations.iter().enumerate() {
        if relation.index_of(&op.id).is_none() {
            return Err(PlanError::UnknownOperation(op.id.to_string()));
        }
        position.insert(&op.id, i);
    }

    let mut problem = Problem::new(variables);
    problem.set_objective(objective, true);

    for (i, op) in operations.iter().enumerate() {
        let terms = (0..n_rooms).map(|r| (i * n_rooms + r, 1.0)).collect();
        problem.add_constraint(format!("cover[{}]", op.id), terms, ConstraintOp::Ge, 1.0);
    }

    for (i, op) in operations.iter().enumerate() {
        for other in relation.neighbors(&op.id) {
            let Some(&j) = position.get(other) else {
                continue;
            };
            if j <= i {
                continue;
            }
            for (r, room) in rooms.iter().enumerate() {
                problem.add_constraint(
                    format!("exclusive[{},{},{}]", op.id, other, room.id),
                    vec![(i * n_rooms + r, 1.0), (j * n_rooms + r, 1.0)],
                    ConstraintOp::Le,
                    1.0,
                );
            }
        }
    }

    debug!(
        variables = problem.num_variables(),
        constraints = problem.num_constraints(),
        "formulated room assignment"
    );

    Ok(AssignmentModel {
        problem,
        operations: operations.iter().map(|op| op.id.clone()).collect(),
        rooms: rooms.iter().map(|room| room.id.clone()).collect(),
    })
}

pub fn formulate_cost_cover(
    operations: &[Operation],
    groups: &[Group],
    averages: &AverageCosts,
    coverage: Coverage,
) -> Result<CoverModel> {
    let group_costs = group_costs(groups, averages)?;
    build_cover(operations, groups, group_costs.clone(), CoverKind::Cost, coverage, Some(group_costs))
}

pub fn formulate_room_cover(
    operations: &[Operation],
    groups: &[Group],
    averages: Option<&AverageCosts>,
    coverage: Coverage,
) -> Result<CoverModel> {
    let group_costs = match averages.map(|averages| group_costs(groups, averages)) {
        Some(Ok(costs)) => Some(costs),
        Some(Err(e)) => {
            warn!(error = %e, "room cover reported without group costs");
            None
        }
        None => None,
    };
    build_cover(operations, groups, vec![1.0; groups.len()], CoverKind::Rooms, coverage, group_costs)
}

/// Summed average cost of each group's members
fn group_costs(groups: &[Group], averages: &AverageCosts) -> Result<Vec<f64>> {
    groups
        .iter()
        .map(|group| group.members().iter().map(|id| averages.cost(id)).sum::<Result<f64>>())
        .collect()
}

fn build_cover(
    operations: &[Operation],
    groups: &[Group],
    weights: Vec<f64>,
    kind: CoverKind,
    coverage: Coverage,
    group_costs: Option<Vec<f64>>,
) -> Result<CoverModel> {
    let mut covering: HashMap<&OperationId, Vec<(usize, f64)>> =
        operations.iter().map(|op| (&op.id, Vec::new())).collect();
    for (k, group) in groups.iter().enumerate() {
        for id in group.members() {
            covering
                .get_mut(id)
                .ok_or_else(|| PlanError::UnknownOperation(id.to_string()))?
                .push((k, 1.0));
        }
    }

    let variables = (0..groups.len()).map(|k| format!("y[{}]", k)).collect();
    let mut problem = Problem::new(variables);
    problem.set_objective(weights, true);

    for op in operations {
        let terms = covering.remove(&op.id).unwrap_or_default();
        problem.add_constraint(format!("cover[{}]", op.id), terms, coverage.op(), 1.0);
    }

    debug!(
        ?kind,
        ?coverage,
        variables = problem.num_variables(),
        constraints = problem.num_constraints(),
        "formulated group cover"
    );

    Ok(CoverModel {
        problem,
        kind,
        coverage,
        groups: groups.to_vec(),
        group_costs,
    })
}
