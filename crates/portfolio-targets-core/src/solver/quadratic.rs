use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::error::SolverError;
use crate::math::{gershgorin_bound, mat_vec_multiply, portfolio_variance, sqrt_decimal, vec_dot};
use crate::solver::{GroupLimit, Objective, QuadraticProblem, QuadraticSolver};
use crate::types::{Rate, Weight};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Long-only mean-variance solver by projected gradient descent.
///
/// Every objective is reduced to points on the constrained frontier
/// `min w'Sw - lambda * mu'w`, searched over `lambda`. The feasible set is the
/// box `[lower, upper]` intersected with the budget `sum(w) = 1` and the group
/// slabs; projection onto it alternates the group slabs with the box+budget
/// set (Dykstra), finishing on the box+budget set.
#[derive(Debug, Clone)]
pub struct ProjectedGradientSolver {
    pub max_iterations: usize,
    /// Stop when no weight moves more than this in one iteration.
    pub tolerance: Decimal,
    /// Allowed bound / budget / group violation of an accepted solution.
    pub feasibility_tolerance: Decimal,
    pub projection_cycles: usize,
    /// Bisection steps of the search over lambda.
    pub search_steps: usize,
    /// Resulting weights below this are zeroed.
    pub weight_floor: Weight,
    pub round_dp: u32,
}

impl Default for ProjectedGradientSolver {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: dec!(0.0000000001),
            feasibility_tolerance: dec!(0.0001),
            projection_cycles: 60,
            search_steps: 24,
            weight_floor: dec!(0.0001),
            round_dp: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl QuadraticSolver for ProjectedGradientSolver {
    fn solve(
        &self,
        problem: &QuadraticProblem<'_>,
        objective: Objective,
    ) -> Result<Vec<Weight>, SolverError> {
        problem.validate()?;
        check_bounds(problem, self.feasibility_tolerance)?;

        let weights = match objective {
            Objective::TargetReturn(target) => self.target_return(problem, target)?,
            Objective::MinVolatility => self.frontier_point(problem, Decimal::ZERO, None),
            Objective::EfficientRisk(volatility) => self.efficient_risk(problem, volatility)?,
            Objective::MaxSharpe(risk_free) => self.max_sharpe(problem, risk_free)?,
        };

        self.verify(problem, &weights)?;
        let cleaned = self.clean(weights);
        debug!(
            objective = ?objective,
            expected_return = %vec_dot(&cleaned, problem.expected_returns),
            "Quadratic solve succeeded"
        );
        Ok(cleaned)
    }
}

impl ProjectedGradientSolver {
    /// Constrained minimizer of `w'Sw - lambda * mu'w`.
    pub fn frontier_point(
        &self,
        problem: &QuadraticProblem<'_>,
        lambda: Decimal,
        start: Option<&[Weight]>,
    ) -> Vec<Weight> {
        let n = problem.len();
        let lipschitz = Decimal::TWO * gershgorin_bound(problem.covariance);
        let step = if lipschitz > Decimal::ZERO {
            Decimal::ONE / lipschitz
        } else {
            Decimal::ONE
        };

        let initial = match start {
            Some(w) => w.to_vec(),
            None => vec![Decimal::ONE / Decimal::from(n as i64); n],
        };
        let mut w = self.project(problem, &initial);

        for _ in 0..self.max_iterations {
            let sigma_w = mat_vec_multiply(problem.covariance, &w);
            let moved: Vec<Decimal> = w
                .iter()
                .zip(sigma_w.iter())
                .zip(problem.expected_returns.iter())
                .map(|((wi, sw), mu)| *wi - step * (Decimal::TWO * *sw - lambda * *mu))
                .collect();
            let next = self.project(problem, &moved);
            let delta = max_abs_diff(&next, &w);
            w = next;
            if delta < self.tolerance {
                break;
            }
        }
        w
    }

    /// Euclidean projection onto box, budget and group limits.
    pub fn project(&self, problem: &QuadraticProblem<'_>, v: &[Decimal]) -> Vec<Weight> {
        if problem.groups.is_empty() {
            return project_box_budget(v, &problem.lower, &problem.upper);
        }

        let n = v.len();
        let sets = problem.groups.len();
        let mut x = v.to_vec();
        let mut increments = vec![vec![Decimal::ZERO; n]; sets + 1];
        let settle = self.feasibility_tolerance / Decimal::ONE_HUNDRED;

        for _ in 0..self.projection_cycles {
            for (k, group) in problem.groups.iter().enumerate() {
                let z = add(&x, &increments[k]);
                let y = project_slab(&z, group);
                increments[k] = sub(&z, &y);
                x = y;
            }
            let z = add(&x, &increments[sets]);
            let y = project_box_budget(&z, &problem.lower, &problem.upper);
            increments[sets] = sub(&z, &y);
            x = y;

            if max_group_violation(&x, &problem.groups) < settle {
                break;
            }
        }
        x
    }

    // -----------------------------------------------------------------------
    // Objectives
    // -----------------------------------------------------------------------

    fn target_return(
        &self,
        problem: &QuadraticProblem<'_>,
        target: Rate,
    ) -> Result<Vec<Weight>, SolverError> {
        let mu = problem.expected_returns;
        let ceiling = max_attainable_return(problem);
        if target > ceiling + self.feasibility_tolerance {
            return Err(SolverError::Infeasible(format!(
                "target return {} above maximum attainable {}",
                target,
                ceiling.round_dp(6)
            )));
        }

        let base = self.frontier_point(problem, Decimal::ZERO, None);
        if vec_dot(&base, mu) >= target {
            return Ok(base);
        }

        let mut hi = lambda_scale(problem);
        let mut w_hi = self.frontier_point(problem, hi, Some(&base));
        let mut expansions = 0;
        while vec_dot(&w_hi, mu) < target && expansions < 20 {
            hi *= dec!(4);
            w_hi = self.frontier_point(problem, hi, Some(&w_hi));
            expansions += 1;
        }
        if vec_dot(&w_hi, mu) < target - self.feasibility_tolerance {
            return Err(SolverError::Infeasible(format!(
                "target return {} not reachable within constraints",
                target
            )));
        }

        let mut lo = Decimal::ZERO;
        for _ in 0..self.search_steps {
            let mid = (lo + hi) / Decimal::TWO;
            let w = self.frontier_point(problem, mid, Some(&w_hi));
            if vec_dot(&w, mu) >= target {
                hi = mid;
                w_hi = w;
            } else {
                lo = mid;
            }
        }
        Ok(w_hi)
    }

    fn efficient_risk(
        &self,
        problem: &QuadraticProblem<'_>,
        target_volatility: Rate,
    ) -> Result<Vec<Weight>, SolverError> {
        let sigma = problem.covariance;
        let target_variance = target_volatility * target_volatility;

        let base = self.frontier_point(problem, Decimal::ZERO, None);
        let min_vol = sqrt_decimal(portfolio_variance(&base, sigma));
        if min_vol > target_volatility + self.feasibility_tolerance {
            return Err(SolverError::Infeasible(format!(
                "minimum volatility {} exceeds target {}",
                min_vol.round_dp(6),
                target_volatility
            )));
        }

        let mut hi = lambda_scale(problem);
        let mut w_hi = self.frontier_point(problem, hi, Some(&base));
        let mut expansions = 0;
        while portfolio_variance(&w_hi, sigma) <= target_variance && expansions < 20 {
            hi *= dec!(4);
            w_hi = self.frontier_point(problem, hi, Some(&w_hi));
            expansions += 1;
        }
        if portfolio_variance(&w_hi, sigma) <= target_variance {
            return Ok(w_hi);
        }

        let mut lo = Decimal::ZERO;
        let mut w_lo = base;
        for _ in 0..self.search_steps {
            let mid = (lo + hi) / Decimal::TWO;
            let w = self.frontier_point(problem, mid, Some(&w_lo));
            if portfolio_variance(&w, sigma) <= target_variance {
                lo = mid;
                w_lo = w;
            } else {
                hi = mid;
            }
        }
        Ok(w_lo)
    }

    fn max_sharpe(
        &self,
        problem: &QuadraticProblem<'_>,
        risk_free: Rate,
    ) -> Result<Vec<Weight>, SolverError> {
        if problem.expected_returns.iter().all(|r| *r <= risk_free) {
            return Err(SolverError::Infeasible(format!(
                "no asset has expected return above the risk-free rate {}",
                risk_free
            )));
        }

        let scale = lambda_scale(problem);
        let mut lambdas = vec![Decimal::ZERO];
        let mut l = scale / dec!(64);
        for _ in 0..19 {
            lambdas.push(l);
            l *= Decimal::TWO;
        }

        let mut points: Vec<(Decimal, Vec<Weight>, Decimal)> = Vec::with_capacity(lambdas.len());
        let mut warm: Option<Vec<Weight>> = None;
        for lambda in lambdas {
            let w = self.frontier_point(problem, lambda, warm.as_deref());
            let s = sharpe(problem, &w, risk_free);
            warm = Some(w.clone());
            points.push((lambda, w, s));
        }

        let best = points
            .iter()
            .enumerate()
            .max_by(|a, b| a.1 .2.cmp(&b.1 .2))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let (_, mut best_w, mut best_s) = points[best].clone();

        // Ternary refinement between the grid neighbours of the best point.
        let mut lo = points[best.saturating_sub(1)].0;
        let mut hi = points[(best + 1).min(points.len() - 1)].0;
        for _ in 0..self.search_steps / 2 {
            let third = (hi - lo) / dec!(3);
            if third <= Decimal::ZERO {
                break;
            }
            let m1 = lo + third;
            let m2 = hi - third;
            let w1 = self.frontier_point(problem, m1, Some(&best_w));
            let w2 = self.frontier_point(problem, m2, Some(&best_w));
            let s1 = sharpe(problem, &w1, risk_free);
            let s2 = sharpe(problem, &w2, risk_free);
            if s1 > best_s {
                best_s = s1;
                best_w = w1;
            }
            if s2 > best_s {
                best_s = s2;
                best_w = w2;
            }
            if s1 < s2 {
                lo = m1;
            } else {
                hi = m2;
            }
        }

        if best_s <= Decimal::ZERO {
            return Err(SolverError::Infeasible(
                "no feasible portfolio beats the risk-free rate".into(),
            ));
        }
        Ok(best_w)
    }

    // -----------------------------------------------------------------------
    // Acceptance
    // -----------------------------------------------------------------------

    fn verify(&self, problem: &QuadraticProblem<'_>, w: &[Weight]) -> Result<(), SolverError> {
        let tol = self.feasibility_tolerance;
        let mut worst = Decimal::ZERO;
        for ((wi, lo), hi) in w.iter().zip(problem.lower.iter()).zip(problem.upper.iter()) {
            worst = worst.max(*lo - *wi).max(*wi - *hi);
        }
        let total: Decimal = w.iter().copied().sum();
        worst = worst.max((total - Decimal::ONE).abs());
        worst = worst.max(max_group_violation(w, &problem.groups));

        if worst > tol {
            return Err(SolverError::Infeasible(format!(
                "constraints not satisfiable (max violation {})",
                worst.round_dp(6)
            )));
        }
        Ok(())
    }

    fn clean(&self, w: Vec<Weight>) -> Vec<Weight> {
        w.into_iter()
            .map(|x| {
                if x.abs() < self.weight_floor {
                    Decimal::ZERO
                } else {
                    x.round_dp(self.round_dp)
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject constraint sets that admit no fully invested portfolio.
fn check_bounds(problem: &QuadraticProblem<'_>, tol: Decimal) -> Result<(), SolverError> {
    let lower_sum: Decimal = problem.lower.iter().copied().sum();
    let upper_sum: Decimal = problem.upper.iter().copied().sum();
    if upper_sum < Decimal::ONE {
        return Err(SolverError::Infeasible(format!(
            "upper bounds sum to {} < 1",
            upper_sum
        )));
    }
    if lower_sum > Decimal::ONE {
        return Err(SolverError::Infeasible(format!(
            "lower bounds sum to {} > 1",
            lower_sum
        )));
    }
    for g in &problem.groups {
        let member_upper: Decimal = g.members.iter().map(|&i| problem.upper[i]).sum();
        let member_lower: Decimal = g.members.iter().map(|&i| problem.lower[i]).sum();
        if g.lower > member_upper + tol || g.upper < member_lower - tol {
            return Err(SolverError::Infeasible(format!(
                "group {} limits [{}, {}] incompatible with member bounds [{}, {}]",
                g.name, g.lower, g.upper, member_lower, member_upper
            )));
        }
    }
    Ok(())
}

/// Projection onto `{w : lower <= w <= upper, sum(w) = 1}`.
///
/// The solution is `clamp(v - tau, lower, upper)`; the sum is piecewise
/// linear and non-increasing in `tau` with kinks at `v - upper` and
/// `v - lower`, so `tau` is found exactly between two kinks. Requires
/// `sum(lower) <= 1 <= sum(upper)`.
pub fn project_box_budget(v: &[Decimal], lower: &[Weight], upper: &[Weight]) -> Vec<Weight> {
    let total = |tau: Decimal| -> Decimal {
        v.iter()
            .zip(lower.iter().zip(upper.iter()))
            .map(|(vi, (lo, hi))| (*vi - tau).max(*lo).min(*hi))
            .sum()
    };

    let mut kinks: Vec<Decimal> = v
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .flat_map(|(vi, (lo, hi))| [*vi - *hi, *vi - *lo])
        .collect();
    kinks.sort();
    kinks.dedup();

    let tau = match kinks.len() {
        0 => Decimal::ZERO,
        len => {
            let last = kinks[len - 1];
            if total(last) >= Decimal::ONE {
                last
            } else if total(kinks[0]) <= Decimal::ONE {
                kinks[0]
            } else {
                // total(kinks[lo]) > 1 > total(kinks[hi])
                let (mut lo, mut hi) = (0, len - 1);
                while hi - lo > 1 {
                    let mid = (lo + hi) / 2;
                    if total(kinks[mid]) >= Decimal::ONE {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                let (a, b) = (kinks[lo], kinks[hi]);
                let (ga, gb) = (total(a), total(b));
                if ga == gb {
                    a
                } else {
                    a + (ga - Decimal::ONE) * (b - a) / (ga - gb)
                }
            }
        }
    };

    v.iter()
        .zip(lower.iter().zip(upper.iter()))
        .map(|(vi, (lo, hi))| (*vi - tau).max(*lo).min(*hi))
        .collect()
}

/// Projection onto `{w : lower <= sum(w[members]) <= upper}`.
fn project_slab(z: &[Decimal], group: &GroupLimit) -> Vec<Decimal> {
    let mut y = z.to_vec();
    let sum: Decimal = group.members.iter().map(|&i| z[i]).sum();
    let shift = if sum > group.upper {
        group.upper - sum
    } else if sum < group.lower {
        group.lower - sum
    } else {
        return y;
    };
    let per_member = shift / Decimal::from(group.members.len() as i64);
    for &i in &group.members {
        y[i] += per_member;
    }
    y
}

fn max_group_violation(w: &[Decimal], groups: &[GroupLimit]) -> Decimal {
    groups
        .iter()
        .map(|g| {
            let sum: Decimal = g.members.iter().map(|&i| w[i]).sum();
            (sum - g.upper).max(g.lower - sum).max(Decimal::ZERO)
        })
        .fold(Decimal::ZERO, Decimal::max)
}

/// Best return any box+budget-feasible portfolio can reach, filling the
/// highest-return assets first.
fn max_attainable_return(problem: &QuadraticProblem<'_>) -> Rate {
    let mu = problem.expected_returns;
    let mut w = problem.lower.clone();
    let mut remaining = Decimal::ONE - w.iter().copied().sum::<Decimal>();
    let mut order: Vec<usize> = (0..mu.len()).collect();
    order.sort_by(|a, b| mu[*b].cmp(&mu[*a]));
    for i in order {
        if remaining <= Decimal::ZERO {
            break;
        }
        let add = (problem.upper[i] - problem.lower[i]).min(remaining);
        w[i] += add;
        remaining -= add;
    }
    vec_dot(&w, mu)
}

/// Lambda at which the return term is comparable to the risk term.
fn lambda_scale(problem: &QuadraticProblem<'_>) -> Decimal {
    let risk = Decimal::TWO * gershgorin_bound(problem.covariance);
    let reward = problem
        .expected_returns
        .iter()
        .map(|r| r.abs())
        .fold(Decimal::ZERO, Decimal::max);
    if risk > Decimal::ZERO && reward > Decimal::ZERO {
        risk / reward
    } else {
        Decimal::ONE
    }
}

fn sharpe(problem: &QuadraticProblem<'_>, w: &[Weight], risk_free: Rate) -> Decimal {
    let excess = vec_dot(w, problem.expected_returns) - risk_free;
    let vol = sqrt_decimal(portfolio_variance(w, problem.covariance)).max(dec!(0.000000000001));
    excess / vol
}

fn max_abs_diff(a: &[Decimal], b: &[Decimal]) -> Decimal {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x - *y).abs())
        .fold(Decimal::ZERO, Decimal::max)
}

fn add(a: &[Decimal], b: &[Decimal]) -> Vec<Decimal> {
    a.iter().zip(b.iter()).map(|(x, y)| *x + *y).collect()
}

fn sub(a: &[Decimal], b: &[Decimal]) -> Vec<Decimal> {
    a.iter().zip(b.iter()).map(|(x, y)| *x - *y).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("S{}", i)).collect()
    }

    fn diag(vars: &[Decimal]) -> Vec<Vec<Decimal>> {
        (0..vars.len())
            .map(|i| {
                (0..vars.len())
                    .map(|j| if i == j { vars[i] } else { Decimal::ZERO })
                    .collect()
            })
            .collect()
    }

    fn problem<'a>(
        syms: &'a [String],
        mu: &'a [Decimal],
        cov: &'a [Vec<Decimal>],
        upper: Decimal,
    ) -> QuadraticProblem<'a> {
        QuadraticProblem {
            symbols: syms,
            expected_returns: mu,
            covariance: cov,
            lower: vec![Decimal::ZERO; syms.len()],
            upper: vec![upper; syms.len()],
            groups: vec![],
        }
    }

    fn sum(w: &[Decimal]) -> Decimal {
        w.iter().copied().sum()
    }

    // ----- 1. Projection -----

    #[test]
    fn test_projection_onto_simplex() {
        let v = vec![dec!(0.5), dec!(0.5), dec!(0.5)];
        let w = project_box_budget(&v, &[Decimal::ZERO; 3], &[Decimal::ONE; 3]);
        for x in &w {
            assert!((*x - dec!(0.3333333333)).abs() < dec!(0.000001));
        }
    }

    #[test]
    fn test_projection_respects_box() {
        let v = vec![dec!(2), dec!(0), dec!(0)];
        let w = project_box_budget(&v, &[Decimal::ZERO; 3], &[dec!(0.5); 3]);
        assert_eq!(w[0], dec!(0.5));
        assert!((w[1] - dec!(0.25)).abs() < dec!(0.0000001));
        assert!((sum(&w) - Decimal::ONE).abs() < dec!(0.0000001));
    }

    // ----- 2. Minimum volatility -----

    #[test]
    fn test_min_volatility_inverse_variance() {
        let syms = symbols(3);
        let mu = vec![dec!(0.05), dec!(0.08), dec!(0.12)];
        let cov = diag(&[dec!(0.04), dec!(0.09), dec!(0.16)]);
        let p = problem(&syms, &mu, &cov, Decimal::ONE);
        let w = ProjectedGradientSolver::default()
            .solve(&p, Objective::MinVolatility)
            .unwrap();
        // 1/var weights: 25, 11.11, 6.25 over 42.36
        assert!((w[0] - dec!(0.5902)).abs() < dec!(0.001));
        assert!((w[1] - dec!(0.2623)).abs() < dec!(0.001));
        assert!((w[2] - dec!(0.1475)).abs() < dec!(0.001));
    }

    #[test]
    fn test_min_volatility_with_upper_bounds() {
        let syms = symbols(3);
        let mu = vec![dec!(0.05), dec!(0.08), dec!(0.12)];
        let cov = diag(&[dec!(0.04), dec!(0.09), dec!(0.16)]);
        let p = problem(&syms, &mu, &cov, dec!(0.5));
        let w = ProjectedGradientSolver::default()
            .solve(&p, Objective::MinVolatility)
            .unwrap();
        assert!((w[0] - dec!(0.5)).abs() < dec!(0.001));
        assert!((w[1] - dec!(0.32)).abs() < dec!(0.001));
        assert!((sum(&w) - Decimal::ONE).abs() < dec!(0.0001));
    }

    #[test]
    fn test_upper_bounds_below_one_infeasible() {
        let syms = symbols(3);
        let mu = vec![dec!(0.1); 3];
        let cov = diag(&[dec!(0.04); 3]);
        let p = problem(&syms, &mu, &cov, dec!(0.3));
        let err = ProjectedGradientSolver::default()
            .solve(&p, Objective::MinVolatility)
            .unwrap_err();
        assert!(matches!(err, SolverError::Infeasible(_)));
    }

    // ----- 3. Target return -----

    #[test]
    fn test_target_return_reached() {
        let syms = symbols(3);
        let mu = vec![dec!(0.05), dec!(0.10), dec!(0.15)];
        let cov = diag(&[dec!(0.04), dec!(0.09), dec!(0.16)]);
        let p = problem(&syms, &mu, &cov, Decimal::ONE);
        let w = ProjectedGradientSolver::default()
            .solve(&p, Objective::TargetReturn(dec!(0.12)))
            .unwrap();
        assert!(vec_dot(&w, &mu) >= dec!(0.1198));
        assert!((sum(&w) - Decimal::ONE).abs() < dec!(0.0001));
    }

    #[test]
    fn test_target_return_above_ceiling_infeasible() {
        let syms = symbols(3);
        let mu = vec![dec!(0.05), dec!(0.10), dec!(0.15)];
        let cov = diag(&[dec!(0.04), dec!(0.09), dec!(0.16)]);
        let p = problem(&syms, &mu, &cov, dec!(0.5));
        // best possible: 0.5 * 0.15 + 0.5 * 0.10 = 0.125
        let err = ProjectedGradientSolver::default()
            .solve(&p, Objective::TargetReturn(dec!(0.13)))
            .unwrap_err();
        assert!(matches!(err, SolverError::Infeasible(_)));
    }

    // ----- 4. Efficient risk -----

    #[test]
    fn test_efficient_risk_below_min_vol_infeasible() {
        let syms = symbols(3);
        let mu = vec![dec!(0.05), dec!(0.10), dec!(0.15)];
        let cov = diag(&[dec!(0.04), dec!(0.09), dec!(0.16)]);
        let p = problem(&syms, &mu, &cov, Decimal::ONE);
        let err = ProjectedGradientSolver::default()
            .solve(&p, Objective::EfficientRisk(dec!(0.05)))
            .unwrap_err();
        assert!(matches!(err, SolverError::Infeasible(_)));
    }

    #[test]
    fn test_efficient_risk_stays_within_target() {
        let syms = symbols(3);
        let mu = vec![dec!(0.05), dec!(0.10), dec!(0.15)];
        let cov = diag(&[dec!(0.04), dec!(0.09), dec!(0.16)]);
        let p = problem(&syms, &mu, &cov, Decimal::ONE);
        let solver = ProjectedGradientSolver::default();
        let w = solver.solve(&p, Objective::EfficientRisk(dec!(0.20))).unwrap();
        let vol = sqrt_decimal(portfolio_variance(&w, &cov));
        assert!(vol <= dec!(0.2002));
        let min_vol = solver.solve(&p, Objective::MinVolatility).unwrap();
        assert!(vec_dot(&w, &mu) > vec_dot(&min_vol, &mu));
    }

    // ----- 5. Max Sharpe -----

    #[test]
    fn test_max_sharpe_requires_excess_return() {
        let syms = symbols(2);
        let mu = vec![dec!(0.01), dec!(0.02)];
        let cov = diag(&[dec!(0.04), dec!(0.09)]);
        let p = problem(&syms, &mu, &cov, Decimal::ONE);
        let err = ProjectedGradientSolver::default()
            .solve(&p, Objective::MaxSharpe(dec!(0.03)))
            .unwrap_err();
        assert!(matches!(err, SolverError::Infeasible(_)));
    }

    #[test]
    fn test_max_sharpe_beats_equal_weight() {
        let syms = symbols(3);
        let mu = vec![dec!(0.05), dec!(0.10), dec!(0.15)];
        let cov = diag(&[dec!(0.04), dec!(0.09), dec!(0.16)]);
        let p = problem(&syms, &mu, &cov, Decimal::ONE);
        let w = ProjectedGradientSolver::default()
            .solve(&p, Objective::MaxSharpe(Decimal::ZERO))
            .unwrap();
        let equal = vec![Decimal::ONE / dec!(3); 3];
        assert!(sharpe(&p, &w, Decimal::ZERO) >= sharpe(&p, &equal, Decimal::ZERO) - dec!(0.001));
    }

    // ----- 6. Group limits -----

    #[test]
    fn test_group_upper_enforced() {
        let syms = symbols(3);
        let mu = vec![dec!(0.05), dec!(0.10), dec!(0.15)];
        let cov = diag(&[dec!(0.04), dec!(0.09), dec!(0.16)]);
        let mut p = problem(&syms, &mu, &cov, Decimal::ONE);
        p.groups.push(GroupLimit {
            name: "LOWVOL".into(),
            members: vec![0, 1],
            lower: Decimal::ZERO,
            upper: dec!(0.6),
        });
        let w = ProjectedGradientSolver::default()
            .solve(&p, Objective::MinVolatility)
            .unwrap();
        assert!(w[0] + w[1] <= dec!(0.6001));
        assert!((sum(&w) - Decimal::ONE).abs() < dec!(0.0001));
    }

    #[test]
    fn test_incompatible_group_infeasible() {
        let syms = symbols(3);
        let mu = vec![dec!(0.1); 3];
        let cov = diag(&[dec!(0.04); 3]);
        let mut p = problem(&syms, &mu, &cov, dec!(0.5));
        p.groups.push(GroupLimit {
            name: "ONE".into(),
            members: vec![0],
            lower: dec!(0.7),
            upper: dec!(0.8),
        });
        let err = ProjectedGradientSolver::default()
            .solve(&p, Objective::MinVolatility)
            .unwrap_err();
        assert!(matches!(err, SolverError::Infeasible(_)));
    }
}
