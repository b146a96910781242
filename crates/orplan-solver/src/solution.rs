/// The result of solving a binary program
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Value of each variable (empty unless a point was found)
    pub values: Vec<f64>,
    /// Objective value of `values`
    pub objective_value: f64,
    /// Branch-and-bound nodes explored
    pub nodes: usize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// A proven optimal solution was found
    Optimal,
    /// The budget ran out; `values` holds the best solution found so far
    Feasible,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The budget ran out before any feasible solution was found
    TimeLimit,
    /// Solver encountered an error
    Error,
}

impl SolutionStatus {
    /// Whether the solution carries a usable assignment
    pub fn has_values(self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }
}

impl Solution {
    pub fn optimal(values: Vec<f64>, objective_value: f64, nodes: usize) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            nodes,
        }
    }

    pub fn feasible(values: Vec<f64>, objective_value: f64, nodes: usize) -> Self {
        Self {
            status: SolutionStatus::Feasible,
            values,
            objective_value,
            nodes,
        }
    }

    pub fn infeasible(nodes: usize) -> Self {
        Self::without_values(SolutionStatus::Infeasible, nodes)
    }

    pub fn time_limit(nodes: usize) -> Self {
        Self::without_values(SolutionStatus::TimeLimit, nodes)
    }

    pub fn error(nodes: usize) -> Self {
        Self::without_values(SolutionStatus::Error, nodes)
    }

    fn without_values(status: SolutionStatus, nodes: usize) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value: f64::INFINITY,
            nodes,
        }
    }
}
