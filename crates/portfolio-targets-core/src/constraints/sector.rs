use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::collaborators::{GroupingLookup, OTHER_GROUP};
use crate::config::OptimizerConfig;
use crate::constraints::weight_bounds::pct;
use crate::types::{SecurityRule, Weight};

/// Scaled bounds are truncated to this many places so that sums never
/// creep above the limit they were scaled to.
const SCALE_DP: u32 = 12;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Allowed aggregate weight of a named group of securities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorConstraint {
    pub name: String,
    pub symbols: Vec<String>,
    pub target: Weight,
    pub lower: Weight,
    pub upper: Weight,
}

/// Country and industry constraint sets. The two are independent: a
/// security belongs to one group of each kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorConstraints {
    pub country: Vec<SectorConstraint>,
    pub industry: Vec<SectorConstraint>,
}

impl SectorConstraints {
    pub fn is_empty(&self) -> bool {
        self.country.is_empty() && self.industry.is_empty()
    }

    pub fn country_lower_sum(&self) -> Weight {
        self.country.iter().map(|c| c.lower).sum()
    }

    pub fn industry_lower_sum(&self) -> Weight {
        self.industry.iter().map(|c| c.lower).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectorConstraint> {
        self.country.iter().chain(self.industry.iter())
    }

    /// Same groups and ceilings, every lower bound multiplied by `factor`.
    pub fn with_scaled_lowers(&self, factor: Decimal) -> Self {
        let scale = |set: &[SectorConstraint]| -> Vec<SectorConstraint> {
            set.iter()
                .map(|c| SectorConstraint {
                    lower: scale_down(c.lower, factor).min(c.upper),
                    ..c.clone()
                })
                .collect()
        };
        Self {
            country: scale(&self.country),
            industry: scale(&self.industry),
        }
    }
}

/// Turns group-level target allocations into solver-ready ranges.
pub struct SectorConstraintBuilder<'a> {
    config: &'a OptimizerConfig,
    grouping: &'a dyn GroupingLookup,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl<'a> SectorConstraintBuilder<'a> {
    pub fn new(config: &'a OptimizerConfig, grouping: &'a dyn GroupingLookup) -> Self {
        Self { config, grouping }
    }

    /// Country group of a security; missing countries are [`OTHER_GROUP`].
    pub fn country_group_of(&self, security: &SecurityRule) -> String {
        security
            .country
            .as_deref()
            .map(|c| self.grouping.country_group(c))
            .unwrap_or_else(|| OTHER_GROUP.to_string())
    }

    /// Industry group of a security.
    ///
    /// The raw industry string is looked up first. When it is unmapped and
    /// lists several industries, the first listed industry with a mapping wins.
    pub fn industry_group_of(&self, security: &SecurityRule) -> String {
        let raw = match security.industry.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return OTHER_GROUP.to_string(),
        };
        let group = self.grouping.industry_group(raw.trim());
        if group != OTHER_GROUP {
            return group;
        }
        let parts = security.industries();
        if parts.len() > 1 {
            if let Some(g) = parts
                .iter()
                .map(|p| self.grouping.industry_group(p))
                .find(|g| g != OTHER_GROUP)
            {
                return g;
            }
        }
        group
    }

    /// Build both constraint sets for `securities`.
    ///
    /// Targets are keyed by group name. Groups without a positive target or
    /// without member securities produce no constraint.
    pub fn build(
        &self,
        securities: &[SecurityRule],
        country_targets: &HashMap<String, Weight>,
        industry_targets: &HashMap<String, Weight>,
    ) -> (SectorConstraints, Vec<String>) {
        let mut diagnostics = Vec::new();

        let mut country_members: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut industry_members: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for s in securities {
            country_members
                .entry(self.country_group_of(s))
                .or_default()
                .push(s.symbol.clone());
            industry_members
                .entry(self.industry_group_of(s))
                .or_default()
                .push(s.symbol.clone());
        }
        debug!(
            country_groups = country_members.len(),
            industry_groups = industry_members.len(),
            "Grouped securities"
        );

        let mut country = banded(
            &country_members,
            country_targets,
            self.config.country_tolerance,
            self.config.max_country_concentration,
        );

        let targeted_industries = industry_members
            .keys()
            .filter(|g| target_of(industry_targets, g) > Decimal::ZERO)
            .count();
        let industry_ceiling = self
            .config
            .industry_ceilings
            .for_group_count(targeted_industries);
        let mut industry = banded(
            &industry_members,
            industry_targets,
            self.config.industry_tolerance,
            industry_ceiling,
        );

        // Country minimums above 100% cannot be met by any allocation.
        let country_lower: Weight = country.iter().map(|c| c.lower).sum();
        if country_lower > Decimal::ONE {
            scale_lowers(&mut country, Decimal::ONE / country_lower);
            diagnostics.push(format!(
                "Country minimums sum to {}, scaled to 100%",
                pct(country_lower)
            ));
        }

        let country_upper: Weight = country.iter().map(|c| c.upper).sum();
        if country_upper > Decimal::ONE {
            warn!(sum = %country_upper, "Country upper bounds exceed 100%; scaling down");
            fit_uppers(&mut country);
            diagnostics.push(format!(
                "Country maximums sum to {}, scaled to 100%",
                pct(country_upper)
            ));
        }

        let industry_lower: Weight = industry.iter().map(|c| c.lower).sum();
        if industry_lower > Decimal::ONE {
            warn!(sum = %industry_lower, "Industry minimums exceed 100%; scaling down");
            scale_lowers(&mut industry, Decimal::ONE / industry_lower);
            diagnostics.push(format!(
                "Industry minimums sum to {}, scaled to 100%",
                pct(industry_lower)
            ));
        }

        let threshold = self.config.combined_sector_min_threshold;
        let combined: Weight =
            country.iter().chain(industry.iter()).map(|c| c.lower).sum();
        if combined > threshold {
            warn!(
                combined = %combined,
                threshold = %threshold,
                "Combined sector minimums exceed threshold; scaling both sets"
            );
            let factor = threshold / combined;
            scale_lowers(&mut country, factor);
            scale_lowers(&mut industry, factor);
            diagnostics.push(format!(
                "Combined sector minimums {} scaled to {}",
                pct(combined),
                pct(threshold)
            ));
        }

        info!(
            country = country.len(),
            industry = industry.len(),
            industry_ceiling = %industry_ceiling,
            "Built sector constraints"
        );

        (SectorConstraints { country, industry }, diagnostics)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn target_of(targets: &HashMap<String, Weight>, group: &str) -> Weight {
    targets.get(group).copied().unwrap_or(Decimal::ZERO)
}

/// Tolerance band around each positive target, capped at `ceiling`.
fn banded(
    members: &BTreeMap<String, Vec<String>>,
    targets: &HashMap<String, Weight>,
    tolerance: Weight,
    ceiling: Weight,
) -> Vec<SectorConstraint> {
    members
        .iter()
        .filter_map(|(group, symbols)| {
            let target = target_of(targets, group);
            if target <= Decimal::ZERO {
                return None;
            }
            let upper = (target + tolerance).min(Decimal::ONE).min(ceiling);
            let lower = (target - tolerance).max(Decimal::ZERO).min(upper);
            Some(SectorConstraint {
                name: group.clone(),
                symbols: symbols.clone(),
                target,
                lower,
                upper,
            })
        })
        .collect()
}

fn scale_down(value: Weight, factor: Decimal) -> Weight {
    (value * factor).round_dp_with_strategy(SCALE_DP, RoundingStrategy::ToZero)
}

fn scale_lowers(set: &mut [SectorConstraint], factor: Decimal) {
    for c in set.iter_mut() {
        c.lower = scale_down(c.lower, factor).min(c.upper);
    }
}

/// Shrink uppers proportionally until they sum to at most 1, never below
/// their own lower bound.
///
/// Finds the largest `s` in [0, 1] with `sum(max(lower, s * upper)) <= 1`.
/// Requires the lowers to sum to at most 1.
fn fit_uppers(set: &mut [SectorConstraint]) {
    let total = |s: Decimal| -> Decimal {
        set.iter()
            .map(|c| c.lower.max(scale_down(c.upper, s)))
            .sum()
    };
    let mut lo = Decimal::ZERO;
    let mut hi = Decimal::ONE;
    for _ in 0..60 {
        let mid = (lo + hi) / Decimal::TWO;
        if total(mid) <= Decimal::ONE {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    for c in set.iter_mut() {
        c.upper = c.lower.max(scale_down(c.upper, lo));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
