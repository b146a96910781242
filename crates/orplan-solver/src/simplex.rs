//! Dual simplex for the continuous relaxation of a binary program.
//!
//! Every constraint row `a·x <op> b` gets one logical column `s` so that
//! `a·x + s = b`, with the bounds of `s` encoding the operator. Variable
//! bounds (`0 ≤ x ≤ 1`, or fixings) live in the ratio test rather than in
//! extra rows. The initial all-logical basis is dual feasible for any cost
//! vector because every structural column is boxed, so phase 1 is never
//! needed, and a basis that was optimal for one set of bounds stays dual
//! feasible after the bounds change. Branch-and-bound keeps a single
//! [`Relaxation`] and re-optimizes it from the last basis at every node.

use std::time::Instant;

use crate::problem::{ConstraintOp, Problem};

/// Dual simplex settings
#[derive(Debug, Clone)]
pub struct Simplex {
    /// Maximum pivots per re-optimization before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
    IterationLimit,
    /// The deadline passed between two pivots
    TimeLimit,
}

impl Default for Simplex {
    fn default() -> Self {
        Self {
            max_iterations: 50_000,
            tolerance: 1e-9,
        }
    }
}

/// Tableau row, sorted by column
#[derive(Debug, Clone, Default)]
struct SparseRow {
    entries: Vec<(usize, f64)>,
}

/// Entries smaller than this are treated as fill-in noise and dropped
const DROP: f64 = 1e-12;

impl SparseRow {
    fn get(&self, column: usize) -> f64 {
        match self.entries.binary_search_by_key(&column, |&(j, _)| j) {
            Ok(k) => self.entries[k].1,
            Err(_) => 0.0,
        }
    }

    fn scale(&mut self, factor: f64) {
        for (_, value) in &mut self.entries {
            *value *= factor;
        }
    }

    /// `self -= factor * pivot`
    fn subtract(&mut self, factor: f64, pivot: &SparseRow) {
        let mut merged = Vec::with_capacity(self.entries.len() + pivot.entries.len());
        let mut mine = self.entries.iter().copied().peekable();
        let mut theirs = pivot.entries.iter().copied().peekable();
        loop {
            let next = match (mine.peek(), theirs.peek()) {
                (Some(&(a, va)), Some(&(b, vb))) => {
                    if a < b {
                        mine.next();
                        (a, va)
                    } else if b < a {
                        theirs.next();
                        (b, -factor * vb)
                    } else {
                        mine.next();
                        theirs.next();
                        (a, va - factor * vb)
                    }
                }
                (Some(&(a, va)), None) => {
                    mine.next();
                    (a, va)
                }
                (None, Some(&(b, vb))) => {
                    theirs.next();
                    (b, -factor * vb)
                }
                (None, None) => break,
            };
            if next.1.abs() > DROP {
                merged.push(next);
            }
        }
        self.entries = merged;
    }
}

/// The relaxation of a [`Problem`] as a tableau over structural and logical
/// columns, minimizing in every case.
#[derive(Debug, Clone)]
pub struct Relaxation {
    /// `B⁻¹A`, one row per constraint
    rows: Vec<SparseRow>,
    /// Basic column of each row
    basis: Vec<usize>,
    /// Row of each basic column
    row_of: Vec<Option<usize>>,
    reduced: Vec<f64>,
    values: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    costs: Vec<f64>,
    n_structural: usize,
}

impl Relaxation {
    /// Relax `problem` to `0 ≤ x ≤ 1`. A maximization objective is negated.
    pub fn new(problem: &Problem) -> Self {
        let n = problem.num_variables();
        let m = problem.num_constraints();
        let sense = if problem.objective.minimize { 1.0 } else { -1.0 };
        let costs: Vec<f64> = (0..n)
            .map(|j| sense * problem.objective.coefficients.get(j).copied().unwrap_or(0.0))
            .collect();

        let mut lower = vec![0.0; n + m];
        let mut upper = vec![1.0; n + m];
        let mut values = vec![0.0; n + m];
        let mut reduced = vec![0.0; n + m];
        let mut row_of = vec![None; n + m];

        for j in 0..n {
            reduced[j] = costs[j];
            if costs[j] < 0.0 {
                values[j] = 1.0;
            }
        }

        let mut rows = Vec::with_capacity(m);
        for (i, constraint) in problem.constraints.iter().enumerate() {
            let mut entries: Vec<(usize, f64)> = constraint.terms.clone();
            entries.sort_by_key(|&(j, _)| j);
            entries.dedup_by(|later, kept| {
                if later.0 == kept.0 {
                    kept.1 += later.1;
                    true
                } else {
                    false
                }
            });
            entries.retain(|&(j, coef)| j < n && coef != 0.0);
            entries.push((n + i, 1.0));

            let logical = n + i;
            (lower[logical], upper[logical]) = match constraint.op {
                ConstraintOp::Le => (0.0, f64::INFINITY),
                ConstraintOp::Ge => (f64::NEG_INFINITY, 0.0),
                ConstraintOp::Eq => (0.0, 0.0),
            };
            let slack = constraint.rhs - constraint.lhs(&values[..n]);
            values[logical] = slack;
            row_of[logical] = Some(i);
            rows.push(SparseRow { entries });
        }

        Self {
            rows,
            basis: (n..n + m).collect(),
            row_of,
            reduced,
            values,
            lower,
            upper,
            costs,
            n_structural: n,
        }
    }

    /// Current value of every structural variable
    pub fn values(&self) -> &[f64] {
        &self.values[..self.n_structural]
    }

    /// Objective of the current point, in minimization sense
    pub fn objective(&self) -> f64 {
        self.costs.iter().zip(self.values()).map(|(c, v)| c * v).sum()
    }

    /// Change the bounds of structural variable `j`. A nonbasic variable
    /// moves to the bound its reduced cost favours, which keeps the basis
    /// dual feasible; basic values follow.
    pub fn set_bounds(&mut self, j: usize, lower: f64, upper: f64) {
        if self.lower[j] == lower && self.upper[j] == upper {
            return;
        }
        self.lower[j] = lower;
        self.upper[j] = upper;
        if self.row_of[j].is_none() {
            let target = if self.reduced[j] >= 0.0 { lower } else { upper };
            self.shift_nonbasic(j, target);
        }
    }

    fn shift_nonbasic(&mut self, j: usize, target: f64) {
        let delta = target - self.values[j];
        if delta == 0.0 {
            return;
        }
        for (i, row) in self.rows.iter().enumerate() {
            let alpha = row.get(j);
            if alpha != 0.0 {
                self.values[self.basis[i]] -= alpha * delta;
            }
        }
        self.values[j] = target;
    }

    /// Bring column `q` into the basis at row `r`, sending the leaving
    /// variable to `bound`.
    fn pivot(&mut self, r: usize, q: usize, bound: f64) {
        let leaving = self.basis[r];
        let alpha = self.rows[r].get(q);

        let step = (self.values[leaving] - bound) / alpha;
        for (i, row) in self.rows.iter().enumerate() {
            let a = row.get(q);
            if a != 0.0 {
                self.values[self.basis[i]] -= a * step;
            }
        }
        self.values[q] += step;
        self.values[leaving] = bound;

        let theta = self.reduced[q] / alpha;
        for &(j, a) in &self.rows[r].entries {
            self.reduced[j] -= theta * a;
        }
        self.reduced[q] = 0.0;

        self.rows[r].scale(1.0 / alpha);
        if let Ok(k) = self.rows[r].entries.binary_search_by_key(&q, |&(j, _)| j) {
            self.rows[r].entries[k].1 = 1.0;
        }
        let pivot_row = self.rows[r].clone();
        for (i, row) in self.rows.iter_mut().enumerate() {
            if i == r {
                continue;
            }
            let factor = row.get(q);
            if factor != 0.0 {
                row.subtract(factor, &pivot_row);
            }
        }

        self.basis[r] = q;
        self.row_of[q] = Some(r);
        self.row_of[leaving] = None;
    }
}

impl Simplex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-optimize `lp` from its current basis with the dual simplex method.
    pub fn reoptimize(&self, lp: &mut Relaxation, deadline: Option<Instant>) -> LpStatus {
        for _ in 0..self.max_iterations {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return LpStatus::TimeLimit;
            }
            let Some((r, bound, raise)) = self.leaving_row(lp) else {
                return LpStatus::Optimal;
            };
            let Some(q) = self.entering_column(lp, r, raise) else {
                return LpStatus::Infeasible;
            };
            lp.pivot(r, q, bound);
        }
        LpStatus::IterationLimit
    }

    /// Row whose basic variable violates its bounds the most, with the
    /// violated bound and whether the variable has to increase to reach it.
    fn leaving_row(&self, lp: &Relaxation) -> Option<(usize, f64, bool)> {
        let mut best: Option<(f64, usize, f64, bool)> = None;
        for (i, &b) in lp.basis.iter().enumerate() {
            let value = lp.values[b];
            let (violation, bound, raise) = if value < lp.lower[b] - self.tolerance {
                (lp.lower[b] - value, lp.lower[b], true)
            } else if value > lp.upper[b] + self.tolerance {
                (value - lp.upper[b], lp.upper[b], false)
            } else {
                continue;
            };
            if best.is_none_or(|(worst, ..)| violation > worst) {
                best = Some((violation, i, bound, raise));
            }
        }
        best.map(|(_, i, bound, raise)| (i, bound, raise))
    }

    /// Dual ratio test over the nonbasic columns of row `r`. Ties go to the
    /// larger pivot, then the lower column index.
    fn entering_column(&self, lp: &Relaxation, r: usize, raise: bool) -> Option<usize> {
        let mut best: Option<(f64, f64, usize)> = None;
        for &(j, alpha) in &lp.rows[r].entries {
            if lp.row_of[j].is_some() || alpha.abs() <= self.tolerance {
                continue;
            }
            let can_increase = lp.values[j] < lp.upper[j] - self.tolerance;
            let can_decrease = lp.values[j] > lp.lower[j] + self.tolerance;
            // The basic variable moves by -alpha per unit of x_j
            let usable = if raise == (alpha < 0.0) {
                can_increase
            } else {
                can_decrease
            };
            if !usable {
                continue;
            }
            let ratio = (lp.reduced[j] / alpha).abs();
            let better = match best {
                None => true,
                Some((best_ratio, best_alpha, _)) => {
                    ratio < best_ratio - self.tolerance
                        || (ratio <= best_ratio + self.tolerance && alpha.abs() > best_alpha)
                }
            };
            if better {
                best = Some((ratio, alpha.abs(), j));
            }
        }
        best.map(|(_, _, j)| j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(n: usize, objective: Vec<f64>, minimize: bool) -> Problem {
        let mut problem = Problem::new((0..n).map(|i| format!("x{}", i)).collect());
        problem.set_objective(objective, minimize);
        problem
    }

    fn solve(simplex: &Simplex, problem: &Problem) -> (LpStatus, Relaxation) {
        let mut lp = Relaxation::new(problem);
        let status = simplex.reoptimize(&mut lp, None);
        (status, lp)
    }

    fn optimal(simplex: &Simplex, problem: &Problem) -> (Vec<f64>, f64) {
        match solve(simplex, problem) {
            (LpStatus::Optimal, lp) => (lp.values().to_vec(), lp.objective()),
            (status, _) => panic!("expected optimal, got {:?}", status),
        }
    }

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 1.5
        //   0 <= x, y <= 1
        // Optimal: x=1, y=0.5, obj=4
        let mut p = problem(2, vec![3.0, 2.0], false);
        p.add_constraint("cap", vec![(0, 1.0), (1, 1.0)], ConstraintOp::Le, 1.5);

        let (values, objective) = optimal(&Simplex::new(), &p);

        assert!((values[0] - 1.0).abs() < 1e-6, "x = {} (expected 1)", values[0]);
        assert!((values[1] - 0.5).abs() < 1e-6, "y = {} (expected 0.5)", values[1]);
        // Minimization sense, so the maximum comes back negated
        assert!((objective + 4.0).abs() < 1e-6, "obj = {} (expected -4)", objective);
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 1.5
        // Optimal: x=1, y=0.5, obj=3.5
        let mut p = problem(2, vec![2.0, 3.0], true);
        p.add_constraint("demand", vec![(0, 1.0), (1, 1.0)], ConstraintOp::Ge, 1.5);

        let (values, objective) = optimal(&Simplex::new(), &p);

        assert!((values[0] - 1.0).abs() < 1e-6, "x = {} (expected 1)", values[0]);
        assert!((values[1] - 0.5).abs() < 1e-6, "y = {} (expected 0.5)", values[1]);
        assert!((objective - 3.5).abs() < 1e-6, "obj = {} (expected 3.5)", objective);
    }

    #[test]
    fn test_equality_and_negative_rhs() {
        // Minimize: x + y
        // Subject to:
        //   x - y = 0.5
        //   -x <= -0.75   (x >= 0.75)
        // Optimal: x=0.75, y=0.25
        let mut p = problem(2, vec![1.0, 1.0], true);
        p.add_constraint("diff", vec![(0, 1.0), (1, -1.0)], ConstraintOp::Eq, 0.5);
        p.add_constraint("floor", vec![(0, -1.0)], ConstraintOp::Le, -0.75);

        let (values, objective) = optimal(&Simplex::new(), &p);

        assert!((values[0] - 0.75).abs() < 1e-6);
        assert!((values[1] - 0.25).abs() < 1e-6);
        assert!((objective - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_redundant_equalities() {
        // The second row repeats the first
        let mut p = problem(2, vec![2.0, 1.0], true);
        p.add_constraint("sum", vec![(0, 1.0), (1, 1.0)], ConstraintOp::Eq, 1.0);
        p.add_constraint("sum_again", vec![(0, 1.0), (1, 1.0)], ConstraintOp::Eq, 1.0);

        let (values, objective) = optimal(&Simplex::new(), &p);

        assert!(values[0].abs() < 1e-6);
        assert!((values[1] - 1.0).abs() < 1e-6);
        assert!((objective - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_repeated_terms_are_summed() {
        // x + x >= 1 is 2x >= 1
        let mut p = problem(1, vec![1.0], true);
        p.add_constraint("twice", vec![(0, 1.0), (0, 1.0)], ConstraintOp::Ge, 1.0);

        let (values, _) = optimal(&Simplex::new(), &p);
        assert!((values[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible() {
        // x + y >= 3 cannot hold inside the unit box
        let mut p = problem(2, vec![1.0, 1.0], true);
        p.add_constraint("too_much", vec![(0, 1.0), (1, 1.0)], ConstraintOp::Ge, 3.0);

        let (status, _) = solve(&Simplex::new(), &p);
        assert_eq!(status, LpStatus::Infeasible);
    }

    #[test]
    fn test_reoptimize_after_fixing() {
        // Triangle cover: relaxation is all halves; fixing x0 = 0 forces
        // x1 = x2 = 1 and the basis is reused rather than rebuilt
        let mut p = problem(3, vec![1.0, 1.0, 1.0], true);
        for (a, b) in [(0, 1), (1, 2), (0, 2)] {
            p.add_constraint(format!("edge[{},{}]", a, b), vec![(a, 1.0), (b, 1.0)], ConstraintOp::Ge, 1.0);
        }
        let simplex = Simplex::new();
        let (status, mut lp) = solve(&simplex, &p);
        assert_eq!(status, LpStatus::Optimal);
        assert!((lp.objective() - 1.5).abs() < 1e-6);

        lp.set_bounds(0, 0.0, 0.0);
        assert_eq!(simplex.reoptimize(&mut lp, None), LpStatus::Optimal);
        assert!((lp.objective() - 2.0).abs() < 1e-6);
        assert!(lp.values()[0].abs() < 1e-6);
        assert!((lp.values()[1] - 1.0).abs() < 1e-6);
        assert!((lp.values()[2] - 1.0).abs() < 1e-6);

        // Releasing the fixing gets the fractional optimum back
        lp.set_bounds(0, 0.0, 1.0);
        assert_eq!(simplex.reoptimize(&mut lp, None), LpStatus::Optimal);
        assert!((lp.objective() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_fixing_can_make_relaxation_infeasible() {
        let mut p = problem(2, vec![1.0, 1.0], true);
        p.add_constraint("one", vec![(0, 1.0), (1, 1.0)], ConstraintOp::Ge, 1.0);
        let simplex = Simplex::new();
        let (_, mut lp) = solve(&simplex, &p);

        lp.set_bounds(0, 0.0, 0.0);
        lp.set_bounds(1, 0.0, 0.0);
        assert_eq!(simplex.reoptimize(&mut lp, None), LpStatus::Infeasible);
    }

    #[test]
    fn test_expired_deadline() {
        let mut p = problem(2, vec![1.0, 1.0], true);
        p.add_constraint("one", vec![(0, 1.0), (1, 1.0)], ConstraintOp::Ge, 1.0);
        let mut lp = Relaxation::new(&p);

        // The start point violates the row, so at least one pivot is needed
        assert_eq!(Simplex::new().reoptimize(&mut lp, Some(Instant::now())), LpStatus::TimeLimit);
    }
}
