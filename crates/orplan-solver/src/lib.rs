mod branch;
mod problem;
mod simplex;
mod solution;

pub use branch::BranchAndBound;
pub use problem::{Constraint, ConstraintOp, ConstraintViolation, Objective, Problem};
pub use simplex::{LpStatus, Relaxation, Simplex};
pub use solution::{Solution, SolutionStatus};

/// A solver for problems whose variables are all binary.
///
/// Implementations receive a fully built [`Problem`] and block until they
/// reach a terminal [`SolutionStatus`]. Budget handling (time or node limits)
/// is the implementation's responsibility.
pub trait MilpSolver {
    fn solve(&self, problem: &Problem) -> Solution;

    /// Solve with a known feasible point to start from. When the budget runs
    /// out, a solver that uses `start` returns at least that point as
    /// [`SolutionStatus::Feasible`]. The default ignores it.
    fn solve_from(&self, problem: &Problem, start: &[f64]) -> Solution {
        let _ = start;
        self.solve(problem)
    }
}

impl<S: MilpSolver + ?Sized> MilpSolver for &S {
    fn solve(&self, problem: &Problem) -> Solution {
        (**self).solve(problem)
    }

    fn solve_from(&self, problem: &Problem, start: &[f64]) -> Solution {
        (**self).solve_from(problem, start)
    }
}
