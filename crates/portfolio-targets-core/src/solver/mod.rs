//! Numerical primitives behind narrow traits, so orchestration never depends
//! on a particular solver.

pub mod hrp;
pub mod quadratic;

pub use hrp::HierarchicalRiskParity;
pub use quadratic::ProjectedGradientSolver;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constraints::{BoundsMap, SectorConstraints};
use crate::error::SolverError;
use crate::types::{Rate, Weight};

/// What the quadratic solver optimizes. All variants are long-only and
/// fully invested (weights sum to 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Objective {
    /// Minimum variance with expected return of at least the target.
    TargetReturn(Rate),
    MinVolatility,
    /// Maximum return with annualized volatility of at most the target.
    EfficientRisk(Rate),
    /// Maximum (return - rf) / volatility.
    MaxSharpe(Rate),
}

/// Aggregate limit on a subset of the problem's assets, by index.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupLimit {
    pub name: String,
    pub members: Vec<usize>,
    pub lower: Weight,
    pub upper: Weight,
}

/// A bounded mean-variance problem over `symbols`, in matrix order.
#[derive(Debug, Clone)]
pub struct QuadraticProblem<'a> {
    pub symbols: &'a [String],
    pub expected_returns: &'a [Rate],
    pub covariance: &'a [Vec<Decimal>],
    pub lower: Vec<Weight>,
    pub upper: Vec<Weight>,
    pub groups: Vec<GroupLimit>,
}

impl<'a> QuadraticProblem<'a> {
    /// Assemble from symbol-keyed bounds and sector sets. Symbols without
    /// bounds get `[0, 1]`; sector members outside `symbols` are ignored and
    /// groups left without members are dropped.
    pub fn new(
        symbols: &'a [String],
        expected_returns: &'a [Rate],
        covariance: &'a [Vec<Decimal>],
        bounds: &BoundsMap,
        sectors: &SectorConstraints,
    ) -> Self {
        let (lower, upper) = symbols
            .iter()
            .map(|s| {
                bounds
                    .get(s)
                    .map(|b| (b.lower, b.upper))
                    .unwrap_or((Decimal::ZERO, Decimal::ONE))
            })
            .unzip();

        let index: HashMap<&str, usize> = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let groups = sectors
            .iter()
            .filter_map(|c| {
                let members: Vec<usize> = c
                    .symbols
                    .iter()
                    .filter_map(|s| index.get(s.as_str()).copied())
                    .collect();
                (!members.is_empty()).then(|| GroupLimit {
                    name: c.name.clone(),
                    members,
                    lower: c.lower,
                    upper: c.upper,
                })
            })
            .collect();

        Self {
            symbols,
            expected_returns,
            covariance,
            lower,
            upper,
            groups,
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Structural checks shared by every solver.
    pub fn validate(&self) -> Result<(), SolverError> {
        let n = self.symbols.len();
        if n == 0 {
            return Err(SolverError::InsufficientData("no assets".into()));
        }
        if self.expected_returns.len() != n
            || self.lower.len() != n
            || self.upper.len() != n
            || self.covariance.len() != n
            || self.covariance.iter().any(|row| row.len() != n)
        {
            return Err(SolverError::DimensionMismatch(format!(
                "{} symbols, {} returns, {}x? covariance",
                n,
                self.expected_returns.len(),
                self.covariance.len()
            )));
        }
        Ok(())
    }
}

/// Constrained mean-variance solve.
pub trait QuadraticSolver {
    /// Weights aligned with `problem.symbols`, or `Infeasible`.
    fn solve(
        &self,
        problem: &QuadraticProblem<'_>,
        objective: Objective,
    ) -> Result<Vec<Weight>, SolverError>;
}

/// Allocation from covariance structure alone, with no bound support.
pub trait ClusteringSolver {
    /// Weights aligned with `symbols`, summing to 1.
    fn solve(
        &self,
        symbols: &[String],
        covariance: &[Vec<Decimal>],
    ) -> Result<Vec<Weight>, SolverError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{SectorConstraint, WeightBounds};
    use rust_decimal_macros::dec;

    #[test]
    fn test_problem_maps_bounds_and_groups() {
        let symbols: Vec<String> = vec!["A".into(), "B".into(), "C".into()];
        let mu = vec![dec!(0.1); 3];
        let cov = vec![vec![dec!(0.04), dec!(0), dec!(0)]; 3];
        let mut bounds = BoundsMap::new();
        bounds.insert(
            "B".into(),
            WeightBounds {
                symbol: "B".into(),
                lower: dec!(0.1),
                upper: dec!(0.4),
                current_weight: Decimal::ZERO,
                frozen: false,
                steps: vec![],
            },
        );
        let sectors = SectorConstraints {
            country: vec![
                SectorConstraint {
                    name: "EU".into(),
                    symbols: vec!["C".into(), "Z".into(), "A".into()],
                    target: dec!(0.5),
                    lower: dec!(0.45),
                    upper: dec!(0.55),
                },
                SectorConstraint {
                    name: "ASIA".into(),
                    symbols: vec!["Z".into()],
                    target: dec!(0.1),
                    lower: dec!(0.05),
                    upper: dec!(0.15),
                },
            ],
            industry: vec![],
        };
        let p = QuadraticProblem::new(&symbols, &mu, &cov, &bounds, &sectors);
        assert_eq!(p.lower, vec![dec!(0), dec!(0.1), dec!(0)]);
        assert_eq!(p.upper, vec![dec!(1), dec!(0.4), dec!(1)]);
        assert_eq!(p.groups.len(), 1);
        assert_eq!(p.groups[0].members, vec![2, 0]);
        assert!(p.validate().is_ok());
    }
}
