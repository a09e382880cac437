use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::config::OptimizerConfig;
use crate::constraints::BoundsMap;
use crate::types::{current_weight, current_weight_with_price, CurrentHolding, Money, Rate, Weight};

pub type WeightMap = BTreeMap<String, Weight>;

/// Delta between current and target weight for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightChange {
    pub symbol: String,
    pub current_weight: Weight,
    pub target_weight: Weight,
    pub change: Weight,
}

// ---------------------------------------------------------------------------
// Combination
// ---------------------------------------------------------------------------

/// `blend * hrp + (1 - blend) * mv` over the union of symbols; a missing
/// entry counts as 0.
pub fn blend_weights(mv: &WeightMap, hrp: &WeightMap, blend: Decimal) -> WeightMap {
    let symbols: BTreeSet<&String> = mv.keys().chain(hrp.keys()).collect();
    symbols
        .into_iter()
        .map(|s| {
            let m = mv.get(s).copied().unwrap_or(Decimal::ZERO);
            let h = hrp.get(s).copied().unwrap_or(Decimal::ZERO);
            (s.clone(), blend * h + (Decimal::ONE - blend) * m)
        })
        .collect()
}

/// Clamp each weight into its symbol's range. Symbols without bounds pass through.
pub fn clamp_to_bounds(weights: &WeightMap, bounds: &BoundsMap) -> WeightMap {
    weights
        .iter()
        .map(|(s, w)| {
            let clamped = bounds.get(s).map(|b| b.clamp(*w)).unwrap_or(*w);
            (s.clone(), clamped)
        })
        .collect()
}

/// Drop weights below `cutoff`.
pub fn apply_cutoff(weights: &WeightMap, cutoff: Weight) -> WeightMap {
    weights
        .iter()
        .filter(|(_, w)| **w >= cutoff)
        .map(|(s, w)| (s.clone(), *w))
        .collect()
}

/// Rescale so the weights sum to `target_sum`, preserving ratios.
/// An all-zero map is returned unchanged.
pub fn normalize_weights(weights: &WeightMap, target_sum: Weight) -> WeightMap {
    let total: Decimal = weights.values().copied().sum();
    if total.is_zero() {
        return weights.clone();
    }
    let factor = target_sum / total;
    weights
        .iter()
        .map(|(s, w)| (s.clone(), *w * factor))
        .collect()
}

/// `1 - min_cash_reserve / portfolio_value` floored at 0, or the configured
/// default when the portfolio value is not positive.
pub fn investable_fraction(
    portfolio_value: Money,
    min_cash_reserve: Money,
    config: &OptimizerConfig,
) -> Weight {
    if portfolio_value > Decimal::ZERO {
        (Decimal::ONE - min_cash_reserve / portfolio_value).max(Decimal::ZERO)
    } else {
        config.default_investable_fraction
    }
}

// ---------------------------------------------------------------------------
// Current state
// ---------------------------------------------------------------------------

/// Current weight per held symbol.
///
/// With `use_prices`, holdings lacking a market value are valued at
/// `quantity * price`.
pub fn current_weights(
    holdings: &HashMap<String, CurrentHolding>,
    portfolio_value: Money,
    prices: &HashMap<String, Money>,
    use_prices: bool,
) -> WeightMap {
    holdings
        .iter()
        .map(|(s, h)| {
            let w = if use_prices {
                current_weight_with_price(Some(h), prices.get(s).copied(), portfolio_value)
            } else {
                current_weight(Some(h), portfolio_value)
            };
            (s.clone(), w)
        })
        .collect()
}

/// Move only part of the way to `targets` when the portfolio is far from them.
///
/// When the largest `|target - current|` exceeds the threshold, each symbol
/// moves `step` of its distance, entries under the cutoff are dropped and
/// the result is rescaled to the sum of `targets`. Returns the weights and
/// whether damping applied.
///
/// The rescale keeps the invested total. When `current` sums to less than
/// `targets` (a mostly-cash portfolio) it stretches every damped weight, so
/// a symbol can end up more than `step` of its distance from `current`.
pub fn gradual_adjustment(
    targets: &WeightMap,
    current: &WeightMap,
    config: &OptimizerConfig,
) -> (WeightMap, bool) {
    let symbols: BTreeSet<&String> = targets.keys().chain(current.keys()).collect();
    let get = |m: &WeightMap, s: &String| m.get(s).copied().unwrap_or(Decimal::ZERO);

    let max_deviation = symbols
        .iter()
        .map(|s| (get(targets, s) - get(current, s)).abs())
        .fold(Decimal::ZERO, Decimal::max);

    if max_deviation <= config.gradual_adjustment_threshold {
        return (targets.clone(), false);
    }

    info!(
        max_deviation = %max_deviation,
        step = %config.gradual_adjustment_step,
        "Portfolio far from targets; applying gradual adjustment"
    );

    let damped: WeightMap = symbols
        .iter()
        .filter_map(|s| {
            let c = get(current, s);
            let w = c + (get(targets, s) - c) * config.gradual_adjustment_step;
            (w >= config.weight_cutoff).then(|| ((*s).clone(), w))
        })
        .collect();

    let total: Decimal = damped.values().copied().sum();
    if total <= Decimal::ZERO {
        warn!("All damped weights fell below the cutoff");
        return (WeightMap::new(), true);
    }
    let target_sum: Decimal = targets.values().copied().sum();
    (normalize_weights(&damped, target_sum), true)
}

/// Changes of at least `min_weight_change`, largest first, rounded to 4 places.
pub fn weight_changes(
    targets: &WeightMap,
    current: &WeightMap,
    min_weight_change: Weight,
) -> Vec<WeightChange> {
    let symbols: BTreeSet<&String> = targets.keys().chain(current.keys()).collect();
    let mut changes: Vec<WeightChange> = symbols
        .into_iter()
        .filter_map(|s| {
            let c = current.get(s).copied().unwrap_or(Decimal::ZERO);
            let t = targets.get(s).copied().unwrap_or(Decimal::ZERO);
            let change = t - c;
            (change.abs() >= min_weight_change).then(|| WeightChange {
                symbol: s.clone(),
                current_weight: c.round_dp(4),
                target_weight: t.round_dp(4),
                change: change.round_dp(4),
            })
        })
        .collect();
    changes.sort_by(|a, b| b.change.abs().cmp(&a.change.abs()));
    changes
}

// ---------------------------------------------------------------------------
// Transaction costs
// ---------------------------------------------------------------------------

/// Lower each expected return by the cost ratio of its likely trade size.
///
/// New positions are assumed to trade the smallest size whose cost ratio
/// equals `new_position_cost_ratio`; existing ones a rebalancing slice of
/// the portfolio or half the position, whichever is smaller. The reduction
/// is capped at `max_cost_drag`.
pub fn adjust_for_transaction_costs(
    expected_returns: &BTreeMap<String, Rate>,
    holdings: &HashMap<String, CurrentHolding>,
    portfolio_value: Money,
    fixed_cost: Money,
    percent_cost: Rate,
    config: &OptimizerConfig,
) -> BTreeMap<String, Rate> {
    let denominator = config.new_position_cost_ratio - percent_cost;
    let min_trade = if denominator > Decimal::ZERO {
        fixed_cost / denominator
    } else {
        Decimal::ZERO
    };

    expected_returns
        .iter()
        .map(|(symbol, r)| {
            let current_value = holdings
                .get(symbol)
                .and_then(|h| h.market_value_base)
                .unwrap_or(Decimal::ZERO);
            let trade = if current_value.is_zero() {
                min_trade
            } else {
                (portfolio_value * config.rebalance_trade_fraction)
                    .min(current_value * config.position_trade_fraction)
            };
            let cost_ratio = if trade > Decimal::ZERO {
                (fixed_cost + trade * percent_cost) / trade
            } else {
                config.default_cost_ratio
            };
            let drag = cost_ratio.min(config.max_cost_drag);
            debug!(
                symbol = %symbol,
                expected = %r,
                cost_ratio = %cost_ratio,
                "Transaction cost drag"
            );
            (symbol.clone(), *r - drag)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
