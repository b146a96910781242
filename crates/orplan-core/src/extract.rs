//! Turns solver output back into room assignments or selected groups.

use std::collections::BTreeSet;

use orplan_solver::{Solution, SolutionStatus};
use serde::Serialize;

use crate::error::{PlanError, Result};
use crate::formulate::{AssignmentModel, CoverKind, CoverModel};
use crate::groups::Group;
use crate::model::{OperationId, RoomId};

/// Terminal result of one resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "plan", rename_all = "snake_case")]
pub enum Outcome<T> {
    /// Proven optimal
    Optimal(T),
    /// Best solution found before the solver budget ran out
    Suboptimal(T),
    /// No assignment or covering exists
    Infeasible,
    /// The budget ran out without any feasible solution
    TimedOut,
}

impl<T> Outcome<T> {
    pub fn plan(&self) -> Option<&T> {
        match self {
            Outcome::Optimal(plan) | Outcome::Suboptimal(plan) => Some(plan),
            Outcome::Infeasible | Outcome::TimedOut => None,
        }
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self, Outcome::Optimal(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Optimal(_) => "OPTIMAL",
            Outcome::Suboptimal(_) => "FEASIBLE (time limit)",
            Outcome::Infeasible => "INFEASIBLE",
            Outcome::TimedOut => "TIME LIMIT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Distinct rooms (assignment) or room-days, i.e. selected groups (cover)
    pub rooms_used: usize,
    /// Selected groups; always 0 for the assignment model, which has none
    pub groups_selected: usize,
    /// Coverage incidences; an operation in two selected groups counts twice
    pub operations_covered: usize,
    pub distinct_operations: usize,
    /// Money cost of the plan, when cost data is known
    pub total_cost: Option<f64>,
    pub objective_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomAssignment {
    pub operation: OperationId,
    pub room: RoomId,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentPlan {
    pub assignments: Vec<RoomAssignment>,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedGroup {
    /// Position among the generated groups
    pub index: usize,
    pub group: Group,
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverPlan {
    pub kind: CoverKind,
    pub groups: Vec<SelectedGroup>,
    pub summary: Summary,
}

enum Decoded {
    Values { selected: Vec<bool>, optimal: bool },
    Infeasible,
    TimedOut,
}

/// Map the solver status and round values to 0/1, rejecting anything that
/// is not within `tolerance` of a binary value or that breaks a constraint.
fn decode(problem: &orplan_solver::Problem, solution: &Solution, tolerance: f64) -> Result<Decoded> {
    if !solution.status.has_values() {
        return match solution.status {
            SolutionStatus::Infeasible => Ok(Decoded::Infeasible),
            SolutionStatus::TimeLimit => Ok(Decoded::TimedOut),
            _ => Err(PlanError::Solver(format!(
                "solver failed after {} nodes",
                solution.nodes
            ))),
        };
    }
    let optimal = solution.status == SolutionStatus::Optimal;

    if solution.values.len() != problem.num_variables() {
        return Err(PlanError::inconsistent(
            "solution",
            format!(
                "expected {} values, got {}",
                problem.num_variables(),
                solution.values.len()
            ),
        ));
    }

    let mut selected = Vec::with_capacity(solution.values.len());
    for (name, &value) in problem.variables.iter().zip(&solution.values) {
        if value.abs() <= tolerance {
            selected.push(false);
        } else if (value - 1.0).abs() <= tolerance {
            selected.push(true);
        } else {
            return Err(PlanError::inconsistent(
                name.clone(),
                format!("value {} is not binary", value),
            ));
        }
    }

    let rounded: Vec<f64> = selected.iter().map(|&s| if s { 1.0 } else { 0.0 }).collect();
    if let Some(violation) = problem.violations(&rounded, tolerance).first() {
        return Err(PlanError::inconsistent(
            violation.constraint.clone(),
            violation.description.clone(),
        ));
    }

    Ok(Decoded::Values { selected, optimal })
}

fn wrap<T>(plan: T, optimal: bool) -> Outcome<T> {
    if optimal {
        Outcome::Optimal(plan)
    } else {
        Outcome::Suboptimal(plan)
    }
}

/// Each operation must sit in exactly one room.
pub fn extract_assignment(
    model: &AssignmentModel,
    solution: &Solution,
    tolerance: f64,
) -> Result<Outcome<AssignmentPlan>> {
    let (selected, optimal) = match decode(&model.problem, solution, tolerance)? {
        Decoded::Values { selected, optimal } => (selected, optimal),
        Decoded::Infeasible => return Ok(Outcome::Infeasible),
        Decoded::TimedOut => return Ok(Outcome::TimedOut),
    };

    let mut assignments = Vec::with_capacity(model.operations.len());
    let mut rooms_used = BTreeSet::new();
    for (i, operation) in model.operations.iter().enumerate() {
        let chosen: Vec<usize> = (0..model.rooms.len())
            .filter(|&r| selected[model.variable(i, r)])
            .collect();
        let &[room] = chosen.as_slice() else {
            return Err(PlanError::inconsistent(
                operation.to_string(),
                format!("assigned to {} rooms, expected exactly one", chosen.len()),
            ));
        };
        rooms_used.insert(room);
        assignments.push(RoomAssignment {
            operation: operation.clone(),
            room: model.rooms[room].clone(),
            cost: model.cost(i, room),
        });
    }

    let total_cost = assignments.iter().map(|a| a.cost).sum();
    let summary = Summary {
        rooms_used: rooms_used.len(),
        groups_selected: 0,
        operations_covered: assignments.len(),
        distinct_operations: assignments.len(),
        total_cost: Some(total_cost),
        objective_value: model.problem.evaluate(&solution.values),
    };

    Ok(wrap(AssignmentPlan { assignments, summary }, optimal))
}

pub fn extract_cover(model: &CoverModel, solution: &Solution, tolerance: f64) -> Result<Outcome<CoverPlan>> {
    let (selected, optimal) = match decode(&model.problem, solution, tolerance)? {
        Decoded::Values { selected, optimal } => (selected, optimal),
        Decoded::Infeasible => return Ok(Outcome::Infeasible),
        Decoded::TimedOut => return Ok(Outcome::TimedOut),
    };

    let groups: Vec<SelectedGroup> = model
        .groups
        .iter()
        .enumerate()
        .filter(|&(k, _)| selected[k])
        .map(|(k, group)| SelectedGroup {
            index: k,
            group: group.clone(),
            cost: model.group_costs.as_ref().map(|costs| costs[k]),
        })
        .collect();

    let distinct: BTreeSet<&OperationId> = groups
        .iter()
        .flat_map(|g| g.group.members().iter())
        .collect();
    let total_cost = model
        .group_costs
        .as_ref()
        .map(|_| groups.iter().filter_map(|g| g.cost).sum());

    let summary = Summary {
        rooms_used: groups.len(),
        groups_selected: groups.len(),
        operations_covered: groups.iter().map(|g| g.group.len()).sum(),
        distinct_operations: distinct.len(),
        total_cost,
        objective_value: model.problem.evaluate(&solution.values),
    };

    Ok(wrap(
        CoverPlan {
            kind: model.kind,
            groups,
            summary,
        },
        optimal,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::IncompatibilityRelation;
    use crate::fixtures::{flat_costs, path_of_three, rooms};
    use crate::formulate::{formulate_assignment, formulate_room_cover, Coverage};
    use crate::groups;

    fn assignment_model() -> AssignmentModel {
        let operations = path_of_three();
        let rooms = rooms(&["Q1", "Q2"]);
        let relation = IncompatibilityRelation::build(&operations).unwrap();
        let costs = flat_costs(&operations, &rooms, 10.0);
        formulate_assignment(&operations, &rooms, &relation, &costs).unwrap()
    }

    fn cover_model() -> CoverModel {
        let operations = path_of_three();
        let relation = IncompatibilityRelation::build(&operations).unwrap();
        let groups = groups::generate(&relation);
        formulate_room_cover(&operations, &groups, None, Coverage::AtLeastOnce).unwrap()
    }

    #[test]
    fn test_extract_assignment() {
        let model = assignment_model();
        // A->Q1, B->Q2, C->Q1
        let values = vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let solution = Solution::optimal(values.clone(), model.problem.evaluate(&values), 1);

        let outcome = extract_assignment(&model, &solution, 1e-6).unwrap();
        let plan = outcome.plan().unwrap();

        assert!(outcome.is_optimal());
        let rooms: Vec<&str> = plan.assignments.iter().map(|a| a.room.as_str()).collect();
        assert_eq!(rooms, vec!["Q1", "Q2", "Q1"]);
        assert_eq!(plan.summary.rooms_used, 2);
        assert_eq!(plan.summary.groups_selected, 0);
        assert_eq!(plan.summary.operations_covered, 3);
        assert_eq!(plan.summary.total_cost, Some(31.0));
        assert_eq!(plan.summary.objective_value, 31.0);
    }

    #[test]
    fn test_assignment_to_two_rooms_is_inconsistent() {
        let model = assignment_model();
        // A in both rooms, B in none
        let values = vec![1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let solution = Solution::optimal(values, 0.0, 1);

        let err = extract_assignment(&model, &solution, 1e-6).unwrap_err();
        assert!(matches!(err, PlanError::InconsistentSolution { .. }));
    }

    #[test]
    fn test_assignment_with_extra_room_is_inconsistent() {
        // A and C do not conflict; A sitting in both rooms satisfies every row
        let operations: Vec<_> = path_of_three().into_iter().filter(|op| op.id.as_str() != "B").collect();
        let rooms = rooms(&["Q1", "Q2"]);
        let relation = IncompatibilityRelation::build(&operations).unwrap();
        let costs = flat_costs(&operations, &rooms, 10.0);
        let model = formulate_assignment(&operations, &rooms, &relation, &costs).unwrap();

        let solution = Solution::optimal(vec![1.0, 1.0, 1.0, 0.0], 31.0, 1);

        let err = extract_assignment(&model, &solution, 1e-6).unwrap_err();
        assert_eq!(
            err,
            PlanError::InconsistentSolution {
                variable: "A".to_string(),
                detail: "assigned to 2 rooms, expected exactly one".to_string()
            }
        );
    }

    #[test]
    fn test_fractional_value_is_inconsistent() {
        let model = assignment_model();
        let values = vec![0.5, 0.5, 0.0, 1.0, 1.0, 0.0];
        let solution = Solution::optimal(values, 0.0, 1);

        let err = extract_assignment(&model, &solution, 1e-6).unwrap_err();
        assert_eq!(
            err,
            PlanError::InconsistentSolution {
                variable: "x[A,Q1]".to_string(),
                detail: "value 0.5 is not binary".to_string()
            }
        );
    }

    #[test]
    fn test_status_mapping() {
        let model = cover_model();

        let infeasible = extract_cover(&model, &Solution::infeasible(3), 1e-6).unwrap();
        assert_eq!(infeasible, Outcome::Infeasible);

        let timed_out = extract_cover(&model, &Solution::time_limit(3), 1e-6).unwrap();
        assert_eq!(timed_out, Outcome::TimedOut);

        let err = extract_cover(&model, &Solution::error(3), 1e-6).unwrap_err();
        assert!(matches!(err, PlanError::Solver(_)));

        let feasible = extract_cover(&model, &Solution::feasible(vec![1.0, 1.0], 2.0, 3), 1e-6).unwrap();
        assert!(matches!(feasible, Outcome::Suboptimal(_)));
        assert_eq!(feasible.label(), "FEASIBLE (time limit)");
    }

    #[test]
    fn test_extract_cover() {
        let model = cover_model();
        let solution = Solution::optimal(vec![1.0, 1.0], 2.0, 1);

        let outcome = extract_cover(&model, &solution, 1e-6).unwrap();
        let plan = outcome.plan().unwrap();

        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.summary.rooms_used, 2);
        assert_eq!(plan.summary.operations_covered, 3);
        assert_eq!(plan.summary.distinct_operations, 3);
        assert_eq!(plan.summary.total_cost, None);
        assert_eq!(plan.summary.objective_value, 2.0);
    }

    #[test]
    fn test_uncovered_operation_is_inconsistent() {
        let model = cover_model();
        let solution = Solution::optimal(vec![1.0, 0.0], 1.0, 1);

        let err = extract_cover(&model, &solution, 1e-6).unwrap_err();
        assert_eq!(
            err,
            PlanError::InconsistentSolution {
                variable: "cover[B]".to_string(),
                detail: "cover[B] is below minimum of 1.00 by 1.00".to_string()
            }
        );
    }
}
