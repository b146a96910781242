//! End-to-end resolution: conflicts, groups, model, solver, plan.

use std::sync::OnceLock;

use orplan_solver::MilpSolver;
use tracing::{debug, info, warn};

use crate::config::PlannerConfig;
use crate::conflict::IncompatibilityRelation;
use crate::error::Result;
use crate::extract::{extract_assignment, extract_cover, AssignmentPlan, CoverPlan, Outcome};
use crate::formulate::{formulate_assignment, formulate_cost_cover, formulate_room_cover};
use crate::groups::{self, Group};
use crate::heuristic::greedy_assignment;
use crate::input::Instance;

/// Holds an instance with its conflict relation, built once and shared
/// read-only by every model solved from it.
#[derive(Debug)]
pub struct Planner {
    instance: Instance,
    config: PlannerConfig,
    relation: IncompatibilityRelation,
    groups: OnceLock<Vec<Group>>,
}

/// Outcomes of the three models over the same instance.
#[derive(Debug)]
pub struct PlanReport {
    pub assignment: Result<Outcome<AssignmentPlan>>,
    pub cost_cover: Result<Outcome<CoverPlan>>,
    pub room_cover: Result<Outcome<CoverPlan>>,
}

fn log_outcome<T>(model: &str, outcome: &Result<Outcome<T>>) {
    match outcome {
        Ok(Outcome::Suboptimal(_)) => warn!(model, "budget exhausted, returning best known solution"),
        Ok(Outcome::TimedOut) => warn!(model, "budget exhausted without a feasible solution"),
        Ok(outcome) => info!(model, status = outcome.label(), "resolved"),
        Err(e) => warn!(model, error = %e, "resolution failed"),
    }
}

impl Planner {
    pub fn new(instance: Instance, config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        let relation = IncompatibilityRelation::build(&instance.operations)?;
        Ok(Self {
            instance,
            config,
            relation,
            groups: OnceLock::new(),
        })
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn relation(&self) -> &IncompatibilityRelation {
        &self.relation
    }

    /// Conflict-free groups, generated on first use
    pub fn groups(&self) -> &[Group] {
        self.groups.get_or_init(|| groups::generate(&self.relation))
    }

    /// Minimum-cost direct assignment of operations to rooms. The solver
    /// starts from a greedy placement when one exists, so a budget cut still
    /// yields a plan.
    pub fn assign<S: MilpSolver + ?Sized>(&self, solver: &S) -> Result<Outcome<AssignmentPlan>> {
        let operations = &self.instance.operations;
        let outcome = formulate_assignment(operations, &self.instance.rooms, &self.relation, &self.instance.costs)
            .and_then(|model| {
                let solution = match greedy_assignment(&model, operations, &self.relation) {
                    Some(start) => solver.solve_from(&model.problem, &start),
                    None => solver.solve(&model.problem),
                };
                extract_assignment(&model, &solution, self.config.tolerance)
            });
        log_outcome("assignment", &outcome);
        outcome
    }

    /// Cheapest selection of groups covering every operation, at average cost.
    pub fn cover_by_cost<S: MilpSolver + ?Sized>(&self, solver: &S) -> Result<Outcome<CoverPlan>> {
        let outcome = self.instance.average_costs().and_then(|averages| {
            let model = formulate_cost_cover(
                &self.instance.operations,
                self.groups(),
                &averages,
                self.config.coverage,
            )?;
            let solution = solver.solve(&model.problem);
            extract_cover(&model, &solution, self.config.tolerance)
        });
        log_outcome("cost_cover", &outcome);
        outcome
    }

    /// Fewest groups (room-days) covering every operation.
    pub fn cover_by_rooms<S: MilpSolver + ?Sized>(&self, solver: &S) -> Result<Outcome<CoverPlan>> {
        let averages = match self.instance.average_costs() {
            Ok(averages) => Some(averages),
            Err(e) => {
                debug!(error = %e, "room cover reported without costs");
                None
            }
        };
        let outcome = formulate_room_cover(
            &self.instance.operations,
            self.groups(),
            averages.as_ref(),
            self.config.coverage,
        )
        .and_then(|model| {
            let solution = solver.solve(&model.problem);
            extract_cover(&model, &solution, self.config.tolerance)
        });
        log_outcome("room_cover", &outcome);
        outcome
    }

    /// Solve the three models concurrently. Each builds its own model and
    /// only reads the shared relation and groups.
    pub fn solve_all<S: MilpSolver + Sync + ?Sized>(&self, solver: &S) -> PlanReport {
        // Generate before spawning so every thread sees the same groups
        self.groups();

        std::thread::scope(|scope| {
            let assignment = scope.spawn(|| self.assign(solver));
            let cost_cover = scope.spawn(|| self.cover_by_cost(solver));
            let room_cover = self.cover_by_rooms(solver);

            PlanReport {
                assignment: assignment
                    .join()
                    .unwrap_or_else(|_| Err(crate::PlanError::Solver("assignment thread panicked".into()))),
                cost_cover: cost_cover
                    .join()
                    .unwrap_or_else(|_| Err(crate::PlanError::Solver("cost cover thread panicked".into()))),
                room_cover,
            }
        })
    }
}
