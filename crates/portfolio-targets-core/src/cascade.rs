//! Progressive relaxation over constraint levels and objectives.
//!
//! The cascade is an explicit table of `(ConstraintLevel, StrategyKind)`
//! pairs tried in order until one solves.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::OptimizerConfig;
use crate::constraints::{check_feasibility, BoundsMap, FeasibilityReport, SectorConstraints};
use crate::solver::{Objective, QuadraticProblem, QuadraticSolver};
use crate::types::{Rate, Weight};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How much of the sector constraint set is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintLevel {
    Full,
    /// Sector minimums scaled by the relaxation factor.
    RelaxedSectors,
    NoSectors,
}

/// Objective tried within a constraint level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    TargetReturn,
    MinVolatility,
    EfficientRisk,
    MaxSharpe,
}

/// Which path produced the weights when the primary one did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Target-return objective at a relaxed constraint level.
    EfficientReturn,
    MinVolatility,
    EfficientRisk,
    MaxSharpe,
    /// Clustering weights only; every quadratic attempt failed.
    Hrp,
}

impl FallbackStrategy {
    /// `None` only for the primary attempt.
    pub fn for_attempt(level: ConstraintLevel, strategy: StrategyKind) -> Option<Self> {
        match (level, strategy) {
            (ConstraintLevel::Full, StrategyKind::TargetReturn) => None,
            (_, StrategyKind::TargetReturn) => Some(Self::EfficientReturn),
            (_, StrategyKind::MinVolatility) => Some(Self::MinVolatility),
            (_, StrategyKind::EfficientRisk) => Some(Self::EfficientRisk),
            (_, StrategyKind::MaxSharpe) => Some(Self::MaxSharpe),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EfficientReturn => "efficient_return",
            Self::MinVolatility => "min_volatility",
            Self::EfficientRisk => "efficient_risk",
            Self::MaxSharpe => "max_sharpe",
            Self::Hrp => "hrp",
        }
    }
}

impl fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every attempt, in order.
pub const CASCADE: [(ConstraintLevel, StrategyKind); 12] = [
    (ConstraintLevel::Full, StrategyKind::TargetReturn),
    (ConstraintLevel::Full, StrategyKind::MinVolatility),
    (ConstraintLevel::Full, StrategyKind::EfficientRisk),
    (ConstraintLevel::Full, StrategyKind::MaxSharpe),
    (ConstraintLevel::RelaxedSectors, StrategyKind::TargetReturn),
    (ConstraintLevel::RelaxedSectors, StrategyKind::MinVolatility),
    (ConstraintLevel::RelaxedSectors, StrategyKind::EfficientRisk),
    (ConstraintLevel::RelaxedSectors, StrategyKind::MaxSharpe),
    (ConstraintLevel::NoSectors, StrategyKind::TargetReturn),
    (ConstraintLevel::NoSectors, StrategyKind::MinVolatility),
    (ConstraintLevel::NoSectors, StrategyKind::EfficientRisk),
    (ConstraintLevel::NoSectors, StrategyKind::MaxSharpe),
];

/// Record of one cascade attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeAttempt {
    pub level: ConstraintLevel,
    pub strategy: StrategyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of running the cascade. `weights` is `None` when every attempt failed.
#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    pub weights: Option<BTreeMap<String, Weight>>,
    pub fallback: Option<FallbackStrategy>,
    pub level: Option<ConstraintLevel>,
    pub attempts: Vec<CascadeAttempt>,
    pub feasibility: FeasibilityReport,
}

/// Runs the quadratic path with progressive relaxation.
pub struct StrategyCascade<'a> {
    config: &'a OptimizerConfig,
    solver: &'a dyn QuadraticSolver,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl<'a> StrategyCascade<'a> {
    pub fn new(config: &'a OptimizerConfig, solver: &'a dyn QuadraticSolver) -> Self {
        Self { config, solver }
    }

    /// Objective parameters for a strategy.
    pub fn objective(&self, strategy: StrategyKind, target_return: Rate) -> Objective {
        match strategy {
            StrategyKind::TargetReturn => Objective::TargetReturn(target_return),
            StrategyKind::MinVolatility => Objective::MinVolatility,
            StrategyKind::EfficientRisk => Objective::EfficientRisk(self.config.target_volatility),
            StrategyKind::MaxSharpe => Objective::MaxSharpe(self.config.risk_free_rate),
        }
    }

    /// Sector limits enforced at `level`, derived from the pre-checked set.
    pub fn sectors_for(
        &self,
        level: ConstraintLevel,
        checked: &SectorConstraints,
    ) -> SectorConstraints {
        match level {
            ConstraintLevel::Full => checked.clone(),
            ConstraintLevel::RelaxedSectors => {
                checked.with_scaled_lowers(self.config.relaxed_sector_factor)
            }
            ConstraintLevel::NoSectors => SectorConstraints::default(),
        }
    }

    /// Try every `(level, strategy)` pair until one solves. Never fails.
    ///
    /// `symbols`, `expected_returns` and `covariance` share one order.
    pub fn run(
        &self,
        symbols: &[String],
        expected_returns: &[Rate],
        covariance: &[Vec<Decimal>],
        bounds: &BoundsMap,
        sectors: &SectorConstraints,
        target_return: Rate,
    ) -> CascadeOutcome {
        let feasibility = check_feasibility(self.config, symbols, bounds, sectors);
        let checked = feasibility.sectors();

        let mut attempts = Vec::with_capacity(CASCADE.len());
        let mut tried: Vec<SectorConstraints> = Vec::new();
        let mut skipped: Option<ConstraintLevel> = None;

        for (level, strategy) in CASCADE {
            if skipped == Some(level) {
                continue;
            }
            let level_sectors = self.sectors_for(level, &checked);
            if strategy == StrategyKind::TargetReturn {
                // A level identical to an earlier one would repeat its failures.
                if tried.contains(&level_sectors) {
                    debug!(?level, "Constraint level identical to an earlier one; skipped");
                    skipped = Some(level);
                    continue;
                }
                tried.push(level_sectors.clone());
            }

            let problem = QuadraticProblem::new(
                symbols,
                expected_returns,
                covariance,
                &feasibility.adjusted_bounds,
                &level_sectors,
            );
            let objective = self.objective(strategy, target_return);

            match self.solver.solve(&problem, objective) {
                Ok(w) => {
                    info!(?level, ?strategy, "Quadratic optimization succeeded");
                    attempts.push(CascadeAttempt {
                        level,
                        strategy,
                        error: None,
                    });
                    let weights = symbols.iter().cloned().zip(w).collect();
                    return CascadeOutcome {
                        weights: Some(weights),
                        fallback: FallbackStrategy::for_attempt(level, strategy),
                        level: Some(level),
                        attempts,
                        feasibility,
                    };
                }
                Err(e) => {
                    debug!(?level, ?strategy, error = %e, "Quadratic attempt failed");
                    attempts.push(CascadeAttempt {
                        level,
                        strategy,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        warn!(
            attempts = attempts.len(),
            country_min = %checked.country_lower_sum(),
            industry_min = %checked.industry_lower_sum(),
            "All quadratic strategies failed at every constraint level"
        );
        CascadeOutcome {
            weights: None,
            fallback: None,
            level: None,
            attempts,
            feasibility,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
