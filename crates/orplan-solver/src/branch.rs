use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::problem::Problem;
use crate::simplex::{LpStatus, Relaxation, Simplex};
use crate::solution::Solution;
use crate::MilpSolver;

/// Depth-first branch-and-bound over binary variables.
///
/// One [`Relaxation`] lives for the whole search. Each node only changes
/// variable bounds (fixing some variables to 0 or 1) and re-optimizes from
/// the basis the previous node left behind, so diving into a child starts
/// from its parent's optimum.
#[derive(Debug, Clone)]
pub struct BranchAndBound {
    simplex: Simplex,
    /// Maximum nodes to explore before returning the incumbent
    max_nodes: usize,
    /// Wall-clock budget, also enforced inside each relaxation
    time_limit: Option<Duration>,
    /// Tolerance for integrality and bound comparisons
    tolerance: f64,
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self {
            simplex: Simplex::new(),
            max_nodes: 100_000,
            time_limit: None,
            tolerance: 1e-6,
        }
    }
}

struct Node {
    fixed: Vec<Option<bool>>,
}

impl BranchAndBound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }

    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// A start point is usable when it is binary and satisfies every row.
    fn accept_start(&self, problem: &Problem, start: &[f64]) -> Option<Vec<f64>> {
        if start.len() != problem.num_variables() {
            debug!(expected = problem.num_variables(), got = start.len(), "start point ignored: wrong length");
            return None;
        }
        if start.iter().any(|&v| v.abs() > self.tolerance && (v - 1.0).abs() > self.tolerance) {
            debug!("start point ignored: not binary");
            return None;
        }
        let rounded: Vec<f64> = start.iter().map(|v| v.round()).collect();
        if let Some(violation) = problem.violations(&rounded, self.tolerance).first() {
            debug!(constraint = %violation.constraint, "start point ignored: infeasible");
            return None;
        }
        Some(rounded)
    }

    /// Most fractional unfixed variable, if any
    fn branching_variable(&self, node: &Node, values: &[f64]) -> Option<usize> {
        let mut best: Option<(f64, usize)> = None;
        for (j, &v) in values.iter().enumerate() {
            if node.fixed[j].is_some() {
                continue;
            }
            let frac = v.min(1.0 - v);
            if frac > self.tolerance && best.is_none_or(|(b, _)| frac > b) {
                best = Some((frac, j));
            }
        }
        best.map(|(_, j)| j)
    }

    fn search(&self, problem: &Problem, start: Option<&[f64]>) -> Solution {
        let started = Instant::now();
        let deadline = self.time_limit.and_then(|limit| started.checked_add(limit));
        let n = problem.num_variables();

        if n == 0 {
            return if problem.violations(&[], self.tolerance).is_empty() {
                Solution::optimal(Vec::new(), problem.evaluate(&[]), 0)
            } else {
                Solution::infeasible(0)
            };
        }

        // Work as minimization throughout
        let sense = if problem.objective.minimize { 1.0 } else { -1.0 };
        let mut incumbent: Option<(Vec<f64>, f64)> = start
            .and_then(|values| self.accept_start(problem, values))
            .map(|values| {
                let objective = sense * problem.evaluate(&values);
                (values, objective)
            });
        if let Some((_, objective)) = &incumbent {
            debug!(objective = sense * objective, "starting from a known solution");
        }

        let mut relaxation = Relaxation::new(problem);
        let mut stack = vec![Node {
            fixed: vec![None; n],
        }];
        let mut nodes = 0;
        let mut exhausted = false;
        let mut failed = false;

        while let Some(node) = stack.pop() {
            if nodes >= self.max_nodes || deadline.is_some_and(|d| Instant::now() >= d) {
                exhausted = true;
                break;
            }
            nodes += 1;

            for (j, fix) in node.fixed.iter().enumerate() {
                let (lower, upper) = match fix {
                    Some(true) => (1.0, 1.0),
                    Some(false) => (0.0, 0.0),
                    None => (0.0, 1.0),
                };
                relaxation.set_bounds(j, lower, upper);
            }

            match self.simplex.reoptimize(&mut relaxation, deadline) {
                LpStatus::Optimal => {}
                LpStatus::Infeasible => continue,
                LpStatus::IterationLimit => {
                    failed = true;
                    continue;
                }
                LpStatus::TimeLimit => {
                    exhausted = true;
                    break;
                }
            }

            let bound = relaxation.objective();
            if let Some((_, best)) = &incumbent {
                if bound >= best - self.tolerance {
                    continue;
                }
            }

            let values = relaxation.values();
            match self.branching_variable(&node, values) {
                None => {
                    let rounded: Vec<f64> = values.iter().map(|v| v.round()).collect();
                    if !problem.violations(&rounded, self.tolerance).is_empty() {
                        failed = true;
                        continue;
                    }
                    let objective = sense * problem.evaluate(&rounded);
                    trace!(nodes, objective, "new incumbent");
                    incumbent = Some((rounded, objective));
                }
                Some(j) => {
                    let prefer_one = values[j] >= 0.5;
                    for choice in [!prefer_one, prefer_one] {
                        let mut fixed = node.fixed.clone();
                        fixed[j] = Some(choice);
                        stack.push(Node { fixed });
                    }
                }
            }
        }

        debug!(
            nodes,
            exhausted,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "branch and bound finished"
        );

        match incumbent {
            Some((values, _)) => {
                let objective_value = problem.evaluate(&values);
                if exhausted || failed {
                    Solution::feasible(values, objective_value, nodes)
                } else {
                    Solution::optimal(values, objective_value, nodes)
                }
            }
            None if exhausted => Solution::time_limit(nodes),
            None if failed => Solution::error(nodes),
            None => Solution::infeasible(nodes),
        }
    }
}

impl MilpSolver for BranchAndBound {
    fn solve(&self, problem: &Problem) -> Solution {
        self.search(problem, None)
    }

    fn solve_from(&self, problem: &Problem, start: &[f64]) -> Solution {
        self.search(problem, Some(start))
    }
}
