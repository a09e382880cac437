use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::config::OptimizerConfig;
use crate::types::{current_weight, CurrentHolding, Money, SecurityRule, Weight};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Allowed target-weight range for one symbol, with the rules that shaped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    pub symbol: String,
    pub lower: Weight,
    pub upper: Weight,
    pub current_weight: Weight,
    /// Set when conflicting rules collapsed the range to the current weight.
    pub frozen: bool,
    pub steps: Vec<String>,
}

impl WeightBounds {
    pub fn is_locked(&self) -> bool {
        self.lower == self.upper
    }

    pub fn clamp(&self, weight: Weight) -> Weight {
        weight.max(self.lower).min(self.upper)
    }
}

/// Bounds keyed by symbol, ordered for deterministic iteration.
pub type BoundsMap = BTreeMap<String, WeightBounds>;

/// Derives per-security weight ranges from global policy and per-security
/// overrides. Conflicts never fail: they freeze the position instead.
#[derive(Debug, Clone)]
pub struct WeightBoundsCalculator<'a> {
    config: &'a OptimizerConfig,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl<'a> WeightBoundsCalculator<'a> {
    pub fn new(config: &'a OptimizerConfig) -> Self {
        Self { config }
    }

    /// Bounds for every active security. Returns the map plus diagnostics for
    /// frozen positions and ignored min-lot rules.
    pub fn calculate(
        &self,
        securities: &[SecurityRule],
        holdings: &HashMap<String, CurrentHolding>,
        portfolio_value: Money,
        current_prices: &HashMap<String, Money>,
    ) -> (BoundsMap, Vec<String>) {
        let mut bounds = BoundsMap::new();
        let mut diagnostics = Vec::new();

        for security in securities.iter().filter(|s| s.active) {
            let b = self.bounds_for(
                security,
                holdings.get(&security.symbol),
                portfolio_value,
                current_prices.get(&security.symbol).copied(),
                &mut diagnostics,
            );
            bounds.insert(b.symbol.clone(), b);
        }

        debug!(
            securities = bounds.len(),
            frozen = bounds.values().filter(|b| b.frozen).count(),
            "Calculated weight bounds"
        );
        (bounds, diagnostics)
    }

    /// Apply the bound rules to one security, in their fixed order.
    pub fn bounds_for(
        &self,
        security: &SecurityRule,
        holding: Option<&CurrentHolding>,
        portfolio_value: Money,
        price: Option<Money>,
        diagnostics: &mut Vec<String>,
    ) -> WeightBounds {
        let symbol = security.symbol.as_str();
        let cw = current_weight(holding, portfolio_value);
        let mut steps = Vec::new();

        let mut lower = Decimal::ZERO;
        let mut upper = self.config.concentration_cap(security.product_type);
        steps.push(format!("initial: lower={}, upper={}", pct(lower), pct(upper)));

        if let Some(min_pct) = security.min_portfolio_target_pct {
            lower = min_pct / Decimal::ONE_HUNDRED;
            steps.push(format!("custom min {}% -> lower={}", min_pct, pct(lower)));
        }
        if let Some(max_pct) = security.max_portfolio_target_pct {
            upper = max_pct / Decimal::ONE_HUNDRED;
            steps.push(format!("custom max {}% -> upper={}", max_pct, pct(upper)));
        }

        if !security.allow_buy {
            let before = upper;
            upper = upper.min(cw);
            steps.push(format!(
                "buy locked -> upper=min({}, {})={}",
                pct(before),
                pct(cw),
                pct(upper)
            ));
        }

        if !security.allow_sell {
            let before = lower;
            lower = lower.max(cw);
            steps.push(format!(
                "sell locked -> lower=max({}, {})={}",
                pct(before),
                pct(cw),
                pct(lower)
            ));
        }

        let price = price.unwrap_or(Decimal::ZERO);
        if let Some(h) = holding {
            if security.min_lot > Decimal::ZERO && price > Decimal::ZERO {
                if h.quantity <= security.min_lot {
                    let before = lower;
                    lower = lower.max(cw);
                    steps.push(format!(
                        "at min lot (qty={} <= {}) -> lower=max({}, {})={}",
                        h.quantity,
                        security.min_lot,
                        pct(before),
                        pct(cw),
                        pct(lower)
                    ));
                } else {
                    let lot_value = security.min_lot * price;
                    let min_weight = if portfolio_value > Decimal::ZERO {
                        lot_value / portfolio_value
                    } else {
                        Decimal::ZERO
                    };
                    if min_weight > upper {
                        warn!(
                            symbol,
                            min_weight = %min_weight,
                            upper = %upper,
                            "Min lot would exceed upper bound; ignoring"
                        );
                        diagnostics.push(format!(
                            "{}: min lot constraint ignored (min weight {} > upper {})",
                            symbol,
                            pct(min_weight),
                            pct(upper)
                        ));
                        steps.push(format!(
                            "min lot ignored (min weight {} > upper {})",
                            pct(min_weight),
                            pct(upper)
                        ));
                    } else {
                        let before = lower;
                        lower = lower.max(min_weight);
                        steps.push(format!(
                            "min lot value {} -> lower=max({}, {})={}",
                            lot_value.round_dp(2),
                            pct(before),
                            pct(min_weight),
                            pct(lower)
                        ));
                    }
                }
            }
        }

        lower = clamp_unit(lower);
        upper = clamp_unit(upper);

        let mut frozen = false;
        if lower > upper {
            let frozen_at = clamp_unit(cw);
            warn!(
                symbol,
                lower = %lower,
                upper = %upper,
                current_weight = %cw,
                "Bound conflict; freezing position at current weight"
            );
            diagnostics.push(format!(
                "{}: bound conflict (lower {} > upper {}), frozen at current weight {}",
                symbol,
                pct(lower),
                pct(upper),
                pct(frozen_at)
            ));
            steps.push(format!("conflict -> frozen at {}", pct(frozen_at)));
            lower = frozen_at;
            upper = frozen_at;
            frozen = true;
        } else if lower == upper && lower > Decimal::ZERO {
            debug!(symbol, weight = %lower, "Locked position");
        }

        WeightBounds {
            symbol: symbol.to_string(),
            lower,
            upper,
            current_weight: cw,
            frozen,
            steps,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn clamp_unit(w: Weight) -> Weight {
    w.max(Decimal::ZERO).min(Decimal::ONE)
}

pub(crate) fn pct(w: Weight) -> String {
    format!("{:.2}%", w * Decimal::ONE_HUNDRED)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
