use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::config::OptimizerConfig;
use crate::constraints::sector::{SectorConstraint, SectorConstraints};
use crate::constraints::weight_bounds::{pct, BoundsMap};
use crate::types::Weight;

/// Outcome of the pre-solve constraint check.
///
/// The check never aborts a run. `adjusted_bounds` and the sector sets carry
/// any minimum-weight scaling and are meant for the quadratic solve only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeasibilityReport {
    pub feasible: bool,
    pub warnings: Vec<String>,
    pub adjusted_bounds: BoundsMap,
    pub country: Vec<SectorConstraint>,
    pub industry: Vec<SectorConstraint>,
}

impl FeasibilityReport {
    pub fn sectors(&self) -> SectorConstraints {
        SectorConstraints {
            country: self.country.clone(),
            industry: self.industry.clone(),
        }
    }
}

/// Inspect bounds and sector limits for `symbols`, then shrink minimums whose
/// combined total leaves the solver no room.
pub fn check_feasibility(
    config: &OptimizerConfig,
    symbols: &[String],
    bounds: &BoundsMap,
    sectors: &SectorConstraints,
) -> FeasibilityReport {
    let mut warnings = Vec::new();
    let mut feasible = true;

    let mut adjusted: BoundsMap = symbols
        .iter()
        .filter_map(|s| bounds.get(s).map(|b| (s.clone(), b.clone())))
        .collect();
    let mut country = sectors.country.clone();
    let mut industry = sectors.industry.clone();

    for b in adjusted.values() {
        if b.lower > b.upper {
            warnings.push(format!(
                "{}: invalid bounds (lower={} > upper={})",
                b.symbol,
                pct(b.lower),
                pct(b.upper)
            ));
            feasible = false;
        }
    }
    let locked = adjusted.values().filter(|b| b.is_locked()).count();
    if locked > 0 {
        debug!(locked, "Locked securities");
    }

    let half = Decimal::new(5, 1);
    for (kind, set) in [("Country", &country), ("Industry", &industry)] {
        if set.is_empty() {
            continue;
        }
        let min_sum: Weight = set.iter().map(|c| c.lower).sum();
        let max_sum: Weight = set.iter().map(|c| c.upper).sum();
        if min_sum > Decimal::ONE {
            warnings.push(format!("{} minimum sum ({}) > 100%", kind, pct(min_sum)));
            feasible = false;
        }
        if max_sum < half {
            warnings.push(format!("{} maximum sum ({}) < 50%", kind, pct(max_sum)));
        }
        debug!(kind, groups = set.len(), min_sum = %min_sum, max_sum = %max_sum, "Sector limits");
    }

    let country_min: Weight = country.iter().map(|c| c.lower).sum();
    let industry_min: Weight = industry.iter().map(|c| c.lower).sum();
    if country_min + industry_min > Decimal::ONE {
        warnings.push(format!(
            "Total sector minimum sum ({}) > 100% (country={}, industry={})",
            pct(country_min + industry_min),
            pct(country_min),
            pct(industry_min)
        ));
        feasible = false;
    }

    let country_symbols: BTreeSet<&String> = country.iter().flat_map(|c| &c.symbols).collect();
    let industry_symbols: BTreeSet<&String> = industry.iter().flat_map(|c| &c.symbols).collect();
    let overlap = country_symbols.intersection(&industry_symbols).count();
    if overlap > 0 {
        info!(overlap, "Symbols constrained by both country and industry groups");
    }
    if !sectors.is_empty() {
        let unconstrained = symbols
            .iter()
            .filter(|s| !country_symbols.contains(s) && !industry_symbols.contains(s))
            .count();
        if unconstrained > 0 {
            debug!(unconstrained, "Symbols outside every sector constraint");
        }
    }

    if !adjusted.is_empty() && !sectors.is_empty() {
        let budget = config.feasibility_total_min;
        let mut security_min: Weight = adjusted.values().map(|b| b.lower).sum();
        let sector_min = country_min + industry_min;

        if security_min + sector_min > budget {
            warn!(
                securities = %security_min,
                sectors = %sector_min,
                budget = %budget,
                "Combined minimum weights exceed budget; scaling"
            );

            if security_min > config.feasibility_security_min {
                let factor = (budget - sector_min) / security_min;
                if factor > Decimal::ZERO && factor < Decimal::ONE {
                    for b in adjusted.values_mut() {
                        b.lower *= factor;
                    }
                    security_min = adjusted.values().map(|b| b.lower).sum();
                    warnings.push(format!(
                        "Security minimums scaled by {} for the solver",
                        pct(factor)
                    ));
                }
            }

            if security_min + sector_min > budget {
                let sector_budget = (budget - security_min).max(Decimal::ZERO);
                if sector_min > Decimal::ZERO && sector_budget < sector_min {
                    let factor = sector_budget / sector_min;
                    for c in country.iter_mut().chain(industry.iter_mut()) {
                        c.lower = (c.lower * factor).min(c.upper);
                    }
                    warnings.push(format!(
                        "Sector minimums scaled by {} to {}",
                        pct(factor),
                        pct(sector_budget)
                    ));
                }
            }
        }
    }

    if !warnings.is_empty() {
        warn!(count = warnings.len(), "Constraint validation warnings");
    }

    FeasibilityReport {
        feasible,
        warnings,
        adjusted_bounds: adjusted,
        country,
        industry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::weight_bounds::WeightBounds;
    use rust_decimal_macros::dec;

    fn bound(symbol: &str, lower: Decimal, upper: Decimal) -> WeightBounds {
        WeightBounds {
            symbol: symbol.into(),
            lower,
            upper,
            current_weight: Decimal::ZERO,
            frozen: false,
            steps: vec![],
        }
    }

    fn group(name: &str, symbols: &[&str], lower: Decimal, upper: Decimal) -> SectorConstraint {
        SectorConstraint {
            name: name.into(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            target: lower,
            lower,
            upper,
        }
    }

    fn syms(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clean_constraints_pass() {
        let cfg = OptimizerConfig::default();
        let mut bounds = BoundsMap::new();
        bounds.insert("A".into(), bound("A", dec!(0), dec!(0.5)));
        bounds.insert("B".into(), bound("B", dec!(0), dec!(0.5)));
        let report = check_feasibility(
            &cfg,
            &syms(&["A", "B"]),
            &bounds,
            &SectorConstraints::default(),
        );
        assert!(report.feasible);
        assert!(report.warnings.is_empty());
        assert_eq!(report.adjusted_bounds, bounds);
    }

    #[test]
    fn test_oversubscribed_sectors_flagged() {
        let cfg = OptimizerConfig::default();
        let mut bounds = BoundsMap::new();
        bounds.insert("A".into(), bound("A", dec!(0), dec!(0.5)));
        let sectors = SectorConstraints {
            country: vec![
                group("NA", &["A"], dec!(0.6), dec!(0.7)),
                group("EU", &["B"], dec!(0.5), dec!(0.6)),
            ],
            industry: vec![],
        };
        let report = check_feasibility(&cfg, &syms(&["A"]), &bounds, &sectors);
        assert!(!report.feasible);
        assert!(report.warnings.iter().any(|w| w.starts_with("Country minimum sum")));
    }

    #[test]
    fn test_sector_minimums_scaled_into_budget() {
        let cfg = OptimizerConfig::default();
        let mut bounds = BoundsMap::new();
        bounds.insert("A".into(), bound("A", dec!(0.2), dec!(0.5)));
        bounds.insert("B".into(), bound("B", dec!(0.2), dec!(0.5)));
        let sectors = SectorConstraints {
            country: vec![group("NA", &["A"], dec!(0.3), dec!(0.6))],
            industry: vec![group("TECH", &["B"], dec!(0.3), dec!(0.6))],
        };
        // 0.4 + 0.6 = 1.0 > 0.8; securities below 0.7 so sectors shrink to 0.4
        let report = check_feasibility(&cfg, &syms(&["A", "B"]), &bounds, &sectors);
        let sector_min: Decimal = report
            .country
            .iter()
            .chain(report.industry.iter())
            .map(|c| c.lower)
            .sum();
        assert!((sector_min - dec!(0.4)).abs() < dec!(0.0000001));
        assert_eq!(report.adjusted_bounds["A"].lower, dec!(0.2));
        // input untouched
        assert_eq!(sectors.country[0].lower, dec!(0.3));
    }

    #[test]
    fn test_security_minimums_scaled_first_when_dominant() {
        let cfg = OptimizerConfig::default();
        let mut bounds = BoundsMap::new();
        for s in ["A", "B", "C", "D"] {
            bounds.insert(s.into(), bound(s, dec!(0.2), dec!(0.3)));
        }
        let sectors = SectorConstraints {
            country: vec![group("NA", &["A", "B"], dec!(0.2), dec!(0.6))],
            industry: vec![],
        };
        // securities 0.8 > 0.7: factor (0.8 - 0.2) / 0.8 = 0.75
        let report = check_feasibility(&cfg, &syms(&["A", "B", "C", "D"]), &bounds, &sectors);
        assert_eq!(report.adjusted_bounds["A"].lower, dec!(0.15));
        assert_eq!(report.country[0].lower, dec!(0.2));
        assert!(report.feasible);
    }

    #[test]
    fn test_no_scaling_without_sectors() {
        let cfg = OptimizerConfig::default();
        let mut bounds = BoundsMap::new();
        for s in ["A", "B", "C", "D", "E"] {
            bounds.insert(s.into(), bound(s, dec!(0.19), dec!(0.3)));
        }
        let report = check_feasibility(
            &cfg,
            &syms(&["A", "B", "C", "D", "E"]),
            &bounds,
            &SectorConstraints::default(),
        );
        assert_eq!(report.adjusted_bounds["A"].lower, dec!(0.19));
    }
}
