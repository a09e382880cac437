//! Contracts for the estimation and lookup services the optimizer consumes,
//! plus in-memory implementations.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::OptimizerError;
use crate::math::{correlation_from_covariance, sample_covariance};
use crate::types::{MarketRegime, Rate};
use crate::OptimizerResult;

/// Group name for countries and industries without a mapping.
pub const OTHER_GROUP: &str = "OTHER";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Covariance matrix keyed by `symbols` on both axes, plus the per-symbol
/// return histories it was estimated from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CovarianceModel {
    pub symbols: Vec<String>,
    pub covariance: Vec<Vec<Decimal>>,
    #[serde(default)]
    pub returns: BTreeMap<String, Vec<Decimal>>,
}

impl CovarianceModel {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() || self.covariance.is_empty()
    }

    /// Square sub-matrix for `symbols`, in that order. Unknown symbols are skipped.
    ///
    /// Fails when the matrix is smaller than the symbol list implies.
    pub fn submatrix(
        &self,
        symbols: &[String],
    ) -> OptimizerResult<(Vec<String>, Vec<Vec<Decimal>>)> {
        let index: HashMap<&str, usize> = self
            .symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let picked: Vec<(String, usize)> = symbols
            .iter()
            .filter_map(|s| index.get(s.as_str()).map(|&i| (s.clone(), i)))
            .collect();
        let mut matrix = Vec::with_capacity(picked.len());
        for (_, i) in &picked {
            let row = picked
                .iter()
                .map(|(_, j)| self.entry(*i, *j))
                .collect::<OptimizerResult<Vec<Decimal>>>()?;
            matrix.push(row);
        }
        Ok((picked.into_iter().map(|(s, _)| s).collect(), matrix))
    }

    fn entry(&self, i: usize, j: usize) -> OptimizerResult<Decimal> {
        self.covariance
            .get(i)
            .and_then(|row| row.get(j))
            .copied()
            .ok_or_else(|| {
                OptimizerError::RiskModel(format!(
                    "covariance has no entry ({}, {}) for {} symbols",
                    i,
                    j,
                    self.symbols.len()
                ))
            })
    }

    /// Structural checks: square, matching the symbol list.
    pub fn validate(&self) -> OptimizerResult<()> {
        let n = self.symbols.len();
        if self.covariance.len() != n {
            return Err(OptimizerError::InvalidInput {
                field: "covariance".into(),
                reason: format!(
                    "Expected {}x{} matrix but got {} rows",
                    n,
                    n,
                    self.covariance.len()
                ),
            });
        }
        for (i, row) in self.covariance.iter().enumerate() {
            if row.len() != n {
                return Err(OptimizerError::InvalidInput {
                    field: "covariance".into(),
                    reason: format!("Row {} has {} columns, expected {}", i, row.len(), n),
                });
            }
        }
        Ok(())
    }
}

/// A pair of symbols whose returns move together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub symbol_a: String,
    pub symbol_b: String,
    pub correlation: Decimal,
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Annualized expected return estimates.
pub trait ExpectedReturnsProvider {
    /// Estimates for `symbols`. Symbols that cannot be estimated are omitted;
    /// an empty map means "no data".
    fn calculate(
        &self,
        symbols: &[String],
        target_return: Rate,
        dividend_bonuses: &HashMap<String, Rate>,
        regime: Option<MarketRegime>,
    ) -> OptimizerResult<BTreeMap<String, Rate>>;
}

/// Source of the covariance structure.
pub trait RiskModel {
    /// `Ok(None)` when there is not enough price history.
    fn build_covariance(&self, symbols: &[String]) -> OptimizerResult<Option<CovarianceModel>>;

    /// Pairs whose return correlation exceeds `threshold`, strongest first.
    fn correlations(
        &self,
        returns: &BTreeMap<String, Vec<Decimal>>,
        threshold: Decimal,
    ) -> Vec<CorrelationPair> {
        high_correlation_pairs(returns, threshold)
    }
}

/// Maps raw country and industry names to constraint groups.
pub trait GroupingLookup {
    fn country_group(&self, country: &str) -> String;
    fn industry_group(&self, industry: &str) -> String;
}

/// Pearson correlations above `threshold` between all pairs of histories.
pub fn high_correlation_pairs(
    returns: &BTreeMap<String, Vec<Decimal>>,
    threshold: Decimal,
) -> Vec<CorrelationPair> {
    let symbols: Vec<&String> = returns.keys().collect();
    let series: Vec<&[Decimal]> = returns.values().map(|v| v.as_slice()).collect();
    if series.len() < 2 {
        return Vec::new();
    }
    let corr = correlation_from_covariance(&sample_covariance(&series));

    let mut pairs = Vec::new();
    for i in 0..symbols.len() {
        for j in (i + 1)..symbols.len() {
            if corr[i][j] > threshold {
                debug!(
                    symbol_a = %symbols[i],
                    symbol_b = %symbols[j],
                    correlation = %corr[i][j],
                    "High correlation detected"
                );
                pairs.push(CorrelationPair {
                    symbol_a: symbols[i].clone(),
                    symbol_b: symbols[j].clone(),
                    correlation: corr[i][j],
                });
            }
        }
    }
    pairs.sort_by(|a, b| b.correlation.cmp(&a.correlation));
    pairs
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// Name-to-group lookup; anything unmapped lands in [`OTHER_GROUP`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupMap {
    #[serde(default)]
    pub countries: HashMap<String, String>,
    #[serde(default)]
    pub industries: HashMap<String, String>,
}

impl GroupMap {
    /// Build from `group -> member names` listings.
    pub fn from_groups(
        country_groups: &BTreeMap<String, Vec<String>>,
        industry_groups: &BTreeMap<String, Vec<String>>,
    ) -> Self {
        fn invert(groups: &BTreeMap<String, Vec<String>>) -> HashMap<String, String> {
            groups
                .iter()
                .flat_map(|(group, names)| names.iter().map(move |n| (n.clone(), group.clone())))
                .collect()
        }
        Self {
            countries: invert(country_groups),
            industries: invert(industry_groups),
        }
    }
}

impl GroupingLookup for GroupMap {
    fn country_group(&self, country: &str) -> String {
        self.countries
            .get(country)
            .cloned()
            .unwrap_or_else(|| OTHER_GROUP.to_string())
    }

    fn industry_group(&self, industry: &str) -> String {
        self.industries
            .get(industry)
            .cloned()
            .unwrap_or_else(|| OTHER_GROUP.to_string())
    }
}

/// Pre-computed expected returns.
///
/// Dividend bonuses are added on top; a regime multiplier, if configured for
/// the requested regime, scales the base estimate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticExpectedReturns {
    pub returns: BTreeMap<String, Rate>,
    #[serde(default)]
    pub regime_multipliers: HashMap<MarketRegime, Decimal>,
}

impl StaticExpectedReturns {
    pub fn new(returns: BTreeMap<String, Rate>) -> Self {
        Self {
            returns,
            regime_multipliers: HashMap::new(),
        }
    }
}

impl ExpectedReturnsProvider for StaticExpectedReturns {
    fn calculate(
        &self,
        symbols: &[String],
        _target_return: Rate,
        dividend_bonuses: &HashMap<String, Rate>,
        regime: Option<MarketRegime>,
    ) -> OptimizerResult<BTreeMap<String, Rate>> {
        let multiplier = regime
            .and_then(|r| self.regime_multipliers.get(&r).copied())
            .unwrap_or(Decimal::ONE);
        Ok(symbols
            .iter()
            .filter_map(|s| {
                self.returns.get(s).map(|r| {
                    let bonus = dividend_bonuses.get(s).copied().unwrap_or(Decimal::ZERO);
                    (s.clone(), *r * multiplier + bonus)
                })
            })
            .collect())
    }
}

/// Serves a pre-computed covariance model, restricted to the requested symbols.
#[derive(Debug, Clone, Default)]
pub struct StaticRiskModel {
    pub model: CovarianceModel,
}

impl StaticRiskModel {
    pub fn new(model: CovarianceModel) -> OptimizerResult<Self> {
        model.validate()?;
        Ok(Self { model })
    }
}

impl RiskModel for StaticRiskModel {
    fn build_covariance(&self, symbols: &[String]) -> OptimizerResult<Option<CovarianceModel>> {
        let (kept, covariance) = self.model.submatrix(symbols)?;
        if kept.is_empty() {
            return Ok(None);
        }
        let returns = kept
            .iter()
            .filter_map(|s| self.model.returns.get(s).map(|r| (s.clone(), r.clone())))
            .collect();
        Ok(Some(CovarianceModel {
            symbols: kept,
            covariance,
            returns,
        }))
    }
}

/// Estimates an annualized sample covariance from daily return histories.
#[derive(Debug, Clone)]
pub struct SampleRiskModel {
    pub histories: BTreeMap<String, Vec<Decimal>>,
    /// Symbols with fewer observations are left out.
    pub min_history: usize,
    pub periods_per_year: Decimal,
}

impl SampleRiskModel {
    pub fn new(histories: BTreeMap<String, Vec<Decimal>>) -> Self {
        Self {
            histories,
            min_history: 20,
            periods_per_year: dec!(252),
        }
    }
}

impl RiskModel for SampleRiskModel {
    fn build_covariance(&self, symbols: &[String]) -> OptimizerResult<Option<CovarianceModel>> {
        let kept: Vec<String> = symbols
            .iter()
            .filter(|s| {
                self.histories
                    .get(s.as_str())
                    .map(|h| h.len() >= self.min_history.max(2))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        if kept.is_empty() {
            debug!(requested = symbols.len(), "No symbol has enough return history");
            return Ok(None);
        }

        let series: Vec<&[Decimal]> = kept
            .iter()
            .filter_map(|s| self.histories.get(s).map(|h| h.as_slice()))
            .collect();
        let covariance = sample_covariance(&series)
            .into_iter()
            .map(|row| row.into_iter().map(|c| c * self.periods_per_year).collect())
            .collect();
        let returns = kept
            .iter()
            .filter_map(|s| self.histories.get(s).map(|h| (s.clone(), h.clone())))
            .collect();

        Ok(Some(CovarianceModel {
            symbols: kept,
            covariance,
            returns,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn syms(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_group_map_defaults_to_other() {
        let mut countries = BTreeMap::new();
        countries.insert("EU".to_string(), syms(&["Germany", "France"]));
        let map = GroupMap::from_groups(&countries, &BTreeMap::new());
        assert_eq!(map.country_group("France"), "EU");
        assert_eq!(map.country_group("Japan"), OTHER_GROUP);
        assert_eq!(map.industry_group("Software"), OTHER_GROUP);
    }

    #[test]
    fn test_static_returns_omit_unknown_and_add_bonus() {
        let mut r = BTreeMap::new();
        r.insert("AAA".to_string(), dec!(0.08));
        let provider = StaticExpectedReturns::new(r);
        let mut bonuses = HashMap::new();
        bonuses.insert("AAA".to_string(), dec!(0.01));
        let out = provider
            .calculate(&syms(&["AAA", "BBB"]), dec!(0.11), &bonuses, None)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out["AAA"], dec!(0.09));
    }

    #[test]
    fn test_static_returns_regime_multiplier() {
        let mut r = BTreeMap::new();
        r.insert("AAA".to_string(), dec!(0.10));
        let mut provider = StaticExpectedReturns::new(r);
        provider.regime_multipliers.insert(MarketRegime::Bear, dec!(0.5));
        let out = provider
            .calculate(&syms(&["AAA"]), dec!(0.11), &HashMap::new(), Some(MarketRegime::Bear))
            .unwrap();
        assert_eq!(out["AAA"], dec!(0.05));
    }

    #[test]
    fn test_static_risk_model_submatrix() {
        let model = CovarianceModel {
            symbols: syms(&["A", "B", "C"]),
            covariance: vec![
                vec![dec!(0.04), dec!(0.01), dec!(0.02)],
                vec![dec!(0.01), dec!(0.09), dec!(0.03)],
                vec![dec!(0.02), dec!(0.03), dec!(0.16)],
            ],
            returns: BTreeMap::new(),
        };
        let rm = StaticRiskModel::new(model).unwrap();
        let out = rm.build_covariance(&syms(&["C", "A", "Z"])).unwrap().unwrap();
        assert_eq!(out.symbols, syms(&["C", "A"]));
        assert_eq!(out.covariance[0][0], dec!(0.16));
        assert_eq!(out.covariance[0][1], dec!(0.02));
        assert_eq!(out.covariance[1][1], dec!(0.04));
    }

    #[test]
    fn test_static_risk_model_rejects_ragged_matrix() {
        let model = CovarianceModel {
            symbols: syms(&["A", "B"]),
            covariance: vec![vec![dec!(0.04), dec!(0.01)], vec![dec!(0.01)]],
            returns: BTreeMap::new(),
        };
        assert!(StaticRiskModel::new(model).is_err());
    }

    #[test]
    fn test_submatrix_reports_missing_entries() {
        let model = CovarianceModel {
            symbols: syms(&["A", "B"]),
            covariance: vec![vec![dec!(0.04)]],
            returns: BTreeMap::new(),
        };
        assert!(model.submatrix(&syms(&["A"])).is_ok());
        let err = model.submatrix(&syms(&["A", "B"])).unwrap_err();
        assert!(matches!(err, OptimizerError::RiskModel(_)));
    }

    #[test]
    fn test_sample_risk_model_requires_history() {
        let mut h = BTreeMap::new();
        h.insert("A".to_string(), vec![dec!(0.01); 5]);
        let rm = SampleRiskModel::new(h);
        assert!(rm.build_covariance(&syms(&["A"])).unwrap().is_none());
    }

    #[test]
    fn test_sample_risk_model_annualizes() {
        let series: Vec<Decimal> = (0..30)
            .map(|i| if i % 2 == 0 { dec!(0.01) } else { dec!(-0.01) })
            .collect();
        let mut h = BTreeMap::new();
        h.insert("A".to_string(), series);
        let rm = SampleRiskModel::new(h);
        let model = rm.build_covariance(&syms(&["A"])).unwrap().unwrap();
        // daily var = 30 * 0.0001 / 29, annualized * 252
        let expected = dec!(0.003) / dec!(29) * dec!(252);
        assert!((model.covariance[0][0] - expected).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_high_correlation_pairs_sorted_and_thresholded() {
        let base: Vec<Decimal> = (0..25).map(|i| Decimal::from(i % 7)).collect();
        let twin: Vec<Decimal> = base.iter().map(|v| *v * dec!(2) + dec!(1)).collect();
        let noisy: Vec<Decimal> = base
            .iter()
            .enumerate()
            .map(|(i, v)| if i % 3 == 0 { *v + dec!(3) } else { *v })
            .collect();
        let other: Vec<Decimal> = (0..25).map(|i| Decimal::from((i * 5) % 11)).collect();

        let mut returns = BTreeMap::new();
        returns.insert("A".to_string(), base);
        returns.insert("B".to_string(), twin);
        returns.insert("C".to_string(), noisy);
        returns.insert("D".to_string(), other);

        let pairs = high_correlation_pairs(&returns, dec!(0.80));
        assert!(!pairs.is_empty());
        assert_eq!(pairs[0].symbol_a, "A");
        assert_eq!(pairs[0].symbol_b, "B");
        assert!((pairs[0].correlation - Decimal::ONE).abs() < dec!(0.000001));
        for w in pairs.windows(2) {
            assert!(w[0].correlation >= w[1].correlation);
        }
        assert!(pairs.iter().all(|p| p.correlation > dec!(0.80)));
    }
}
