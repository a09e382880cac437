//! Blended mean-variance / risk-parity optimizer.
//!
//! One run derives per-security and per-group limits, solves the quadratic
//! path through the relaxation cascade, computes clustering weights, blends
//! the two and post-processes the result into targets that respect the cash
//! reserve and move gradually away from the current allocation.

pub mod weights;

pub use weights::{WeightChange, WeightMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::cascade::{FallbackStrategy, StrategyCascade};
use crate::collaborators::{CorrelationPair, ExpectedReturnsProvider, GroupingLookup, RiskModel};
use crate::config::OptimizerConfig;
use crate::constraints::weight_bounds::pct;
use crate::constraints::{
    BoundsMap, ConstraintsSummary, SectorConstraintBuilder, WeightBoundsCalculator,
};
use crate::error::OptimizerError;
use crate::solver::{
    ClusteringSolver, HierarchicalRiskParity, ProjectedGradientSolver, QuadraticSolver,
};
use crate::types::{MarketRegime, Money, PortfolioSnapshot, Rate, SecurityRule, Weight};
use crate::OptimizerResult;

use weights::{
    adjust_for_transaction_costs, apply_cutoff, blend_weights, clamp_to_bounds, current_weights,
    gradual_adjustment, investable_fraction, normalize_weights, weight_changes,
};

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

fn default_blend() -> Decimal {
    dec!(0.5)
}

fn default_target_return() -> Rate {
    dec!(0.11)
}

fn default_min_cash_reserve() -> Money {
    dec!(500)
}

fn default_fixed_cost() -> Money {
    dec!(2.0)
}

fn default_percent_cost() -> Rate {
    dec!(0.002)
}

/// Per-run parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRequest {
    /// Share of the clustering weights in the blend (0 = pure MV, 1 = pure HRP).
    #[serde(default = "default_blend")]
    pub blend: Decimal,
    #[serde(default = "default_target_return")]
    pub target_return: Rate,
    /// Target weight per country group.
    #[serde(default)]
    pub country_targets: HashMap<String, Weight>,
    /// Target weight per industry group.
    #[serde(default)]
    pub industry_targets: HashMap<String, Weight>,
    #[serde(default = "default_min_cash_reserve")]
    pub min_cash_reserve: Money,
    #[serde(default)]
    pub dividend_bonuses: HashMap<String, Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regime: Option<MarketRegime>,
    #[serde(default = "default_fixed_cost")]
    pub transaction_cost_fixed: Money,
    #[serde(default = "default_percent_cost")]
    pub transaction_cost_percent: Rate,
}

impl Default for OptimizationRequest {
    fn default() -> Self {
        Self {
            blend: default_blend(),
            target_return: default_target_return(),
            country_targets: HashMap::new(),
            industry_targets: HashMap::new(),
            min_cash_reserve: default_min_cash_reserve(),
            dividend_bonuses: HashMap::new(),
            regime: None,
            transaction_cost_fixed: default_fixed_cost(),
            transaction_cost_percent: default_percent_cost(),
        }
    }
}

impl OptimizationRequest {
    pub fn validate(&self) -> OptimizerResult<()> {
        if self.blend < Decimal::ZERO || self.blend > Decimal::ONE {
            return Err(OptimizerError::InvalidInput {
                field: "blend".into(),
                reason: format!("must be within [0, 1], got {}", self.blend),
            });
        }
        if self.min_cash_reserve < Decimal::ZERO {
            return Err(OptimizerError::InvalidInput {
                field: "min_cash_reserve".into(),
                reason: "cannot be negative".into(),
            });
        }
        if self.transaction_cost_fixed < Decimal::ZERO
            || self.transaction_cost_percent < Decimal::ZERO
        {
            return Err(OptimizerError::InvalidInput {
                field: "transaction_cost".into(),
                reason: "costs cannot be negative".into(),
            });
        }
        let targets = self
            .country_targets
            .iter()
            .map(|(g, t)| ("country_targets", g, t))
            .chain(self.industry_targets.iter().map(|(g, t)| ("industry_targets", g, t)));
        for (field, group, target) in targets {
            if *target < Decimal::ZERO || *target > Decimal::ONE {
                return Err(OptimizerError::InvalidInput {
                    field: format!("{}.{}", field, group),
                    reason: format!("must be within [0, 1], got {}", target),
                });
            }
        }
        Ok(())
    }
}

/// Output of one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub timestamp: DateTime<Utc>,
    pub target_return: Rate,
    pub achieved_expected_return: Option<Rate>,
    pub blend_used: Decimal,
    /// `None` when the primary strategy solved at full constraints.
    pub fallback_used: Option<FallbackStrategy>,
    pub target_weights: BTreeMap<String, Weight>,
    pub weight_changes: Vec<WeightChange>,
    pub high_correlations: Vec<CorrelationPair>,
    pub constraints_summary: Option<ConstraintsSummary>,
    pub diagnostics: Vec<String>,
    pub success: bool,
    pub error: Option<String>,
}

impl OptimizationResult {
    fn failed(request: &OptimizationRequest, error: &OptimizerError) -> Self {
        Self {
            timestamp: Utc::now(),
            target_return: request.target_return,
            achieved_expected_return: None,
            blend_used: request.blend,
            fallback_used: None,
            target_weights: BTreeMap::new(),
            weight_changes: Vec::new(),
            high_correlations: Vec::new(),
            constraints_summary: None,
            diagnostics: Vec::new(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Optimizer
// ---------------------------------------------------------------------------

/// Orchestrates one optimization run over a portfolio snapshot.
///
/// Holds no state between runs; the collaborators are borrowed.
pub struct BlendedOptimizer<'a> {
    config: OptimizerConfig,
    expected_returns: &'a dyn ExpectedReturnsProvider,
    risk_model: &'a dyn RiskModel,
    grouping: &'a dyn GroupingLookup,
    quadratic: Box<dyn QuadraticSolver + 'a>,
    clustering: Box<dyn ClusteringSolver + 'a>,
}

impl<'a> BlendedOptimizer<'a> {
    /// Optimizer with the built-in solvers.
    pub fn new(
        config: OptimizerConfig,
        expected_returns: &'a dyn ExpectedReturnsProvider,
        risk_model: &'a dyn RiskModel,
        grouping: &'a dyn GroupingLookup,
    ) -> Self {
        Self {
            config,
            expected_returns,
            risk_model,
            grouping,
            quadratic: Box::new(ProjectedGradientSolver::default()),
            clustering: Box::new(HierarchicalRiskParity),
        }
    }

    pub fn with_quadratic_solver(mut self, solver: impl QuadraticSolver + 'a) -> Self {
        self.quadratic = Box::new(solver);
        self
    }

    pub fn with_clustering_solver(mut self, solver: impl ClusteringSolver + 'a) -> Self {
        self.clustering = Box::new(solver);
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Run one optimization. Never fails: errors come back as
    /// `success = false` with the message in `error`.
    pub fn optimize(
        &self,
        snapshot: &PortfolioSnapshot,
        request: &OptimizationRequest,
    ) -> OptimizationResult {
        match self.run(snapshot, request) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Optimization failed");
                OptimizationResult::failed(request, &e)
            }
        }
    }

    fn run(
        &self,
        snapshot: &PortfolioSnapshot,
        request: &OptimizationRequest,
    ) -> OptimizerResult<OptimizationResult> {
        self.config.validate()?;
        request.validate()?;

        let config = &self.config;
        let pv = snapshot.portfolio_value;
        let holdings = snapshot.holdings_by_symbol();
        let mut diagnostics = Vec::new();

        info!(
            portfolio_value = %pv,
            blend = %request.blend,
            target_return = %request.target_return,
            "Starting portfolio optimization"
        );
        debug!(cash_balance = %snapshot.cash_balance, "Cash balance");

        // 1. Active universe
        let active: Vec<&SecurityRule> = snapshot.securities.iter().filter(|s| s.active).collect();
        if active.is_empty() {
            return Err(OptimizerError::NoActiveSecurities);
        }
        let active_symbols: Vec<String> = active.iter().map(|s| s.symbol.clone()).collect();

        // 2. Expected returns, restricted to the active universe
        let active_set: HashSet<&str> = active_symbols.iter().map(String::as_str).collect();
        let raw_returns: BTreeMap<String, Rate> = self
            .expected_returns
            .calculate(
                &active_symbols,
                request.target_return,
                &request.dividend_bonuses,
                request.regime,
            )?
            .into_iter()
            .filter(|(s, _)| active_set.contains(s.as_str()))
            .collect();
        if raw_returns.is_empty() {
            return Err(OptimizerError::NoExpectedReturns);
        }

        // 3. Transaction cost drag
        let expected_returns = adjust_for_transaction_costs(
            &raw_returns,
            &holdings,
            pv,
            request.transaction_cost_fixed,
            request.transaction_cost_percent,
            config,
        );

        // 4. Covariance, re-intersected with the return set
        let candidates: Vec<String> = expected_returns.keys().cloned().collect();
        let model = match self.risk_model.build_covariance(&candidates)? {
            Some(m) if !m.is_empty() => m,
            _ => return Err(OptimizerError::InsufficientPriceHistory),
        };
        model
            .validate()
            .map_err(|e| OptimizerError::RiskModel(e.to_string()))?;
        let (symbols, covariance) = model.submatrix(&candidates)?;
        if symbols.is_empty() {
            return Err(OptimizerError::InsufficientPriceHistory);
        }
        if symbols.len() < candidates.len() {
            diagnostics.push(format!(
                "{} of {} symbols lack price history and were excluded",
                candidates.len() - symbols.len(),
                candidates.len()
            ));
        }
        let mu: Vec<Rate> = symbols
            .iter()
            .map(|s| expected_returns.get(s).copied().unwrap_or(Decimal::ZERO))
            .collect();

        // 5. Bounds and sector limits for the surviving symbols
        let surviving: HashSet<&str> = symbols.iter().map(String::as_str).collect();
        let securities: Vec<SecurityRule> = active
            .into_iter()
            .filter(|s| surviving.contains(s.symbol.as_str()))
            .cloned()
            .collect();

        let (bounds, bound_notes) = WeightBoundsCalculator::new(config).calculate(
            &securities,
            &holdings,
            pv,
            &snapshot.current_prices,
        );
        diagnostics.extend(bound_notes);

        let (sectors, sector_notes) = SectorConstraintBuilder::new(config, self.grouping).build(
            &securities,
            &request.country_targets,
            &request.industry_targets,
        );
        diagnostics.extend(sector_notes);

        // 6. Correlation diagnostics
        let histories: BTreeMap<String, Vec<Decimal>> = model
            .returns
            .iter()
            .filter(|(s, _)| surviving.contains(s.as_str()))
            .map(|(s, r)| (s.clone(), r.clone()))
            .collect();
        let mut high_correlations = self
            .risk_model
            .correlations(&histories, config.correlation_threshold);
        high_correlations.truncate(config.max_correlation_pairs);

        // 7. Quadratic path
        let outcome = StrategyCascade::new(config, self.quadratic.as_ref()).run(
            &symbols,
            &mu,
            &covariance,
            &bounds,
            &sectors,
            request.target_return,
        );
        diagnostics.extend(outcome.feasibility.warnings.iter().cloned());
        for attempt in &outcome.attempts {
            if let Some(err) = &attempt.error {
                diagnostics.push(format!(
                    "{:?}/{:?} failed: {}",
                    attempt.level, attempt.strategy, err
                ));
            }
        }

        // 8. Clustering path
        let hrp = self.clustering_weights(&symbols, &covariance, &bounds, &mut diagnostics);

        // 9. Combine
        let (combined, fallback_used) = match (outcome.weights, hrp) {
            (Some(mv), Some(hrp)) => (
                clamp_to_bounds(&blend_weights(&mv, &hrp, request.blend), &bounds),
                outcome.fallback,
            ),
            (Some(mv), None) => {
                diagnostics.push("HRP unavailable; using MV weights only".into());
                (mv, outcome.fallback)
            }
            (None, Some(hrp)) => {
                diagnostics.push("MV optimization failed; using HRP weights only".into());
                (hrp, Some(FallbackStrategy::Hrp))
            }
            (None, None) => return Err(OptimizerError::BothMethodsFailed),
        };
        if let Some(tag) = fallback_used {
            info!(fallback = %tag, "Optimization used a fallback strategy");
        }

        // 10-11. Cutoff, investable fraction, re-clamp
        let investable = investable_fraction(pv, request.min_cash_reserve, config);
        let kept = apply_cutoff(&combined, config.weight_cutoff);
        let targets = clamp_to_bounds(&normalize_weights(&kept, investable), &bounds);

        // 12. Damping against the current allocation
        let current_for_damping = current_weights(&holdings, pv, &snapshot.current_prices, true);
        let (damped_targets, damped) = gradual_adjustment(&targets, &current_for_damping, config);
        let targets = if damped {
            diagnostics.push(format!(
                "Gradual adjustment applied: moving {} of the way to target",
                pct(config.gradual_adjustment_step)
            ));
            // rescaling can lift a capped or frozen weight past its bound
            clamp_to_bounds(&damped_targets, &bounds)
        } else {
            damped_targets
        };

        // 13. Changes against market-value weights
        let current = current_weights(&holdings, pv, &snapshot.current_prices, false);
        let changes = weight_changes(&targets, &current, config.min_weight_change);

        // 14. Expected return of the final allocation
        let achieved: Rate = targets
            .iter()
            .map(|(s, w)| expected_returns.get(s).copied().unwrap_or(Decimal::ZERO) * *w)
            .sum();

        info!(
            positions = targets.len(),
            invested = %targets.values().copied().sum::<Decimal>(),
            achieved_return = %achieved,
            changes = changes.len(),
            "Optimization complete"
        );

        Ok(OptimizationResult {
            timestamp: Utc::now(),
            target_return: request.target_return,
            achieved_expected_return: Some(achieved),
            blend_used: request.blend,
            fallback_used,
            target_weights: targets,
            weight_changes: changes,
            high_correlations,
            constraints_summary: Some(ConstraintsSummary::build(
                &bounds,
                &sectors,
                config.max_concentration,
            )),
            diagnostics,
            success: true,
            error: None,
        })
    }

    /// Clustering weights clamped to `bounds`, or `None` when the solver
    /// cannot run on these inputs.
    fn clustering_weights(
        &self,
        symbols: &[String],
        covariance: &[Vec<Decimal>],
        bounds: &BoundsMap,
        diagnostics: &mut Vec<String>,
    ) -> Option<WeightMap> {
        match self.clustering.solve(symbols, covariance) {
            Ok(w) => {
                let raw: WeightMap = symbols.iter().cloned().zip(w).collect();
                Some(clamp_to_bounds(&raw, bounds))
            }
            Err(e) => {
                warn!(error = %e, "HRP optimization failed");
                diagnostics.push(format!("HRP failed: {}", e));
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CovarianceModel, GroupMap, StaticExpectedReturns, StaticRiskModel};
    use crate::OptimizerResult;
    use crate::error::SolverError;
    use crate::solver::QuadraticProblem;
    use crate::types::CurrentHolding;

    struct AlwaysInfeasible;

    impl QuadraticSolver for AlwaysInfeasible {
        fn solve(
            &self,
            _problem: &QuadraticProblem<'_>,
            _objective: crate::solver::Objective,
        ) -> Result<Vec<Weight>, SolverError> {
            Err(SolverError::Infeasible("test".into()))
        }
    }

    /// Declares two symbols but carries a 1x1 matrix.
    struct RaggedRiskModel;

    impl RiskModel for RaggedRiskModel {
        fn build_covariance(
            &self,
            symbols: &[String],
        ) -> OptimizerResult<Option<CovarianceModel>> {
            Ok(Some(CovarianceModel {
                symbols: symbols.to_vec(),
                covariance: vec![vec![dec!(0.04)]],
                returns: BTreeMap::new(),
            }))
        }
    }

    struct NoClustering;

    impl ClusteringSolver for NoClustering {
        fn solve(&self, _: &[String], _: &[Vec<Decimal>]) -> Result<Vec<Weight>, SolverError> {
            Err(SolverError::Numerical("test".into()))
        }
    }

    fn security(symbol: &str, max_pct: Decimal) -> SecurityRule {
        let mut s = SecurityRule::new(symbol);
        s.max_portfolio_target_pct = Some(max_pct);
        s
    }

    fn snapshot(securities: Vec<SecurityRule>, holdings: Vec<CurrentHolding>) -> PortfolioSnapshot {
        PortfolioSnapshot {
            securities,
            holdings,
            portfolio_value: dec!(10000),
            current_prices: HashMap::new(),
            cash_balance: dec!(1000),
        }
    }

    fn returns(pairs: &[(&str, Decimal)]) -> StaticExpectedReturns {
        StaticExpectedReturns::new(pairs.iter().map(|(s, r)| (s.to_string(), *r)).collect())
    }

    fn diagonal(symbols: &[&str], variances: &[Decimal]) -> StaticRiskModel {
        let n = symbols.len();
        let covariance = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if i == j { variances[i] } else { Decimal::ZERO })
                    .collect()
            })
            .collect();
        StaticRiskModel::new(CovarianceModel {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            covariance,
            returns: BTreeMap::new(),
        })
        .unwrap()
    }

    fn request() -> OptimizationRequest {
        OptimizationRequest {
            min_cash_reserve: dec!(1000),
            target_return: dec!(0.05),
            ..OptimizationRequest::default()
        }
    }

    // ----- 1. Request -----

    #[test]
    fn test_request_defaults() {
        let r: OptimizationRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(r.blend, dec!(0.5));
        assert_eq!(r.target_return, dec!(0.11));
        assert_eq!(r.min_cash_reserve, dec!(500));
        assert_eq!(r.transaction_cost_fixed, dec!(2.0));
        assert_eq!(r.transaction_cost_percent, dec!(0.002));
    }

    #[test]
    fn test_request_rejects_blend_out_of_range() {
        let r = OptimizationRequest {
            blend: dec!(1.5),
            ..OptimizationRequest::default()
        };
        assert!(r.validate().is_err());
    }

    // ----- 2. Fatal conditions -----

    #[test]
    fn test_no_active_securities() {
        let mut s = SecurityRule::new("AAA");
        s.active = false;
        let er = returns(&[("AAA", dec!(0.1))]);
        let rm = diagonal(&["AAA"], &[dec!(0.04)]);
        let groups = GroupMap::default();
        let opt = BlendedOptimizer::new(OptimizerConfig::default(), &er, &rm, &groups);
        let result = opt.optimize(&snapshot(vec![s], vec![]), &request());
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No active securities"));
        assert!(result.target_weights.is_empty());
    }

    #[test]
    fn test_missing_covariance_is_insufficient_history() {
        let er = returns(&[("AAA", dec!(0.1)), ("BBB", dec!(0.1))]);
        let rm = diagonal(&["ZZZ"], &[dec!(0.04)]);
        let groups = GroupMap::default();
        let opt = BlendedOptimizer::new(OptimizerConfig::default(), &er, &rm, &groups);
        let result = opt.optimize(
            &snapshot(vec![SecurityRule::new("AAA"), SecurityRule::new("BBB")], vec![]),
            &request(),
        );
        assert_eq!(result.error.as_deref(), Some("Insufficient price history"));
    }

    #[test]
    fn test_mismatched_covariance_fails_cleanly() {
        let er = returns(&[("AAA", dec!(0.1)), ("BBB", dec!(0.1))]);
        let groups = GroupMap::default();
        let opt = BlendedOptimizer::new(OptimizerConfig::default(), &er, &RaggedRiskModel, &groups);
        let result = opt.optimize(
            &snapshot(vec![SecurityRule::new("AAA"), SecurityRule::new("BBB")], vec![]),
            &request(),
        );
        assert!(!result.success);
        assert!(result.target_weights.is_empty());
        let msg = result.error.unwrap();
        assert!(msg.starts_with("Risk model error"), "{}", msg);
    }

    #[test]
    fn test_both_paths_failing() {
        let er = returns(&[("AAA", dec!(0.1)), ("BBB", dec!(0.1))]);
        let rm = diagonal(&["AAA", "BBB"], &[dec!(0.04), dec!(0.09)]);
        let groups = GroupMap::default();
        let opt = BlendedOptimizer::new(OptimizerConfig::default(), &er, &rm, &groups)
            .with_quadratic_solver(AlwaysInfeasible)
            .with_clustering_solver(NoClustering);
        let result = opt.optimize(
            &snapshot(vec![SecurityRule::new("AAA"), SecurityRule::new("BBB")], vec![]),
            &request(),
        );
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Both MV and HRP failed"));
    }

    // ----- 3. Path selection -----

    #[test]
    fn test_hrp_only_is_tagged() {
        let er = returns(&[("AAA", dec!(0.1)), ("BBB", dec!(0.1)), ("CCC", dec!(0.1))]);
        let rm = diagonal(&["AAA", "BBB", "CCC"], &[dec!(0.04), dec!(0.04), dec!(0.04)]);
        let groups = GroupMap::default();
        let opt = BlendedOptimizer::new(OptimizerConfig::default(), &er, &rm, &groups)
            .with_quadratic_solver(AlwaysInfeasible);
        let securities = ["AAA", "BBB", "CCC"]
            .iter()
            .map(|s| security(s, dec!(50)))
            .collect();
        let result = opt.optimize(&snapshot(securities, vec![]), &request());
        assert!(result.success);
        assert_eq!(result.fallback_used, Some(FallbackStrategy::Hrp));
        let total: Decimal = result.target_weights.values().copied().sum();
        assert!((total - dec!(0.9)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_mv_only_keeps_cascade_tag() {
        let er = returns(&[("AAA", dec!(0.08)), ("BBB", dec!(0.12))]);
        let rm = diagonal(&["AAA", "BBB"], &[dec!(0.04), dec!(0.09)]);
        let groups = GroupMap::default();
        let opt = BlendedOptimizer::new(OptimizerConfig::default(), &er, &rm, &groups)
            .with_clustering_solver(NoClustering);
        let securities = vec![security("AAA", dec!(80)), security("BBB", dec!(80))];
        let result = opt.optimize(&snapshot(securities, vec![]), &request());
        assert!(result.success);
        assert_eq!(result.fallback_used, None);
        assert!(result.diagnostics.iter().any(|d| d.starts_with("HRP failed")));
    }

    // ----- 4. Post-processing -----

    #[test]
    fn test_achieved_return_uses_cost_adjusted_returns() {
        let er = returns(&[("AAA", dec!(0.10)), ("BBB", dec!(0.10))]);
        let rm = diagonal(&["AAA", "BBB"], &[dec!(0.04), dec!(0.04)]);
        let groups = GroupMap::default();
        let opt = BlendedOptimizer::new(OptimizerConfig::default(), &er, &rm, &groups);
        let securities = vec![security("AAA", dec!(60)), security("BBB", dec!(60))];
        let result = opt.optimize(&snapshot(securities, vec![]), &request());
        assert!(result.success);
        // both new positions lose 1% to costs
        let invested: Decimal = result.target_weights.values().copied().sum();
        let achieved = result.achieved_expected_return.unwrap();
        assert!((achieved - dec!(0.09) * invested).abs() < dec!(0.0001));
    }

    #[test]
    fn test_summary_counts_locked_position() {
        let mut locked = security("AAA", dec!(50));
        locked.allow_sell = false;
        locked.allow_buy = false;
        let holdings = vec![CurrentHolding {
            symbol: "AAA".into(),
            quantity: dec!(10),
            market_value_base: Some(dec!(2000)),
        }];
        let er = returns(&[("AAA", dec!(0.1)), ("BBB", dec!(0.1)), ("CCC", dec!(0.1))]);
        let rm = diagonal(&["AAA", "BBB", "CCC"], &[dec!(0.04), dec!(0.04), dec!(0.04)]);
        let groups = GroupMap::default();
        let opt = BlendedOptimizer::new(OptimizerConfig::default(), &er, &rm, &groups);
        let securities = vec![locked, security("BBB", dec!(50)), security("CCC", dec!(50))];
        let result = opt.optimize(&snapshot(securities, holdings), &request());
        assert!(result.success);
        let summary = result.constraints_summary.unwrap();
        assert_eq!(summary.total_securities, 3);
        assert_eq!(summary.locked_positions, 1);
        assert!((result.target_weights["AAA"] - dec!(0.2)).abs() < dec!(0.0001));
    }
}
