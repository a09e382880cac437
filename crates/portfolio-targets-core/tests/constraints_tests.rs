use portfolio_targets_core::collaborators::GroupMap;
use portfolio_targets_core::constraints::{
    check_feasibility, SectorConstraintBuilder, WeightBoundsCalculator,
};
use portfolio_targets_core::types::{CurrentHolding, SecurityRule};
use portfolio_targets_core::OptimizerConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

// ===========================================================================
// Properties of the derived bounds and sector limits
// ===========================================================================

fn holding(symbol: &str, value: Decimal, quantity: Decimal) -> CurrentHolding {
    CurrentHolding {
        symbol: symbol.into(),
        quantity,
        market_value_base: Some(value),
    }
}

/// Every combination of buy/sell lock, min lot and custom range over a few
/// position sizes.
fn universe() -> (Vec<SecurityRule>, HashMap<String, CurrentHolding>, HashMap<String, Decimal>) {
    let mut securities = Vec::new();
    let mut holdings = HashMap::new();
    let mut prices = HashMap::new();
    let values = [dec!(0), dec!(500), dec!(1500), dec!(3000), dec!(12000)];
    let mut n = 0;
    for value in values {
        for allow_buy in [true, false] {
            for allow_sell in [true, false] {
                for (min_lot, custom) in [
                    (dec!(0), None),
                    (dec!(10), None),
                    (dec!(500), None),
                    (dec!(0), Some((dec!(5), dec!(10)))),
                    (dec!(0), Some((dec!(30), dec!(20)))),
                ] {
                    let symbol = format!("S{:03}", n);
                    n += 1;
                    let mut s = SecurityRule::new(symbol.clone());
                    s.allow_buy = allow_buy;
                    s.allow_sell = allow_sell;
                    s.min_lot = min_lot;
                    if let Some((min_pct, max_pct)) = custom {
                        s.min_portfolio_target_pct = Some(min_pct);
                        s.max_portfolio_target_pct = Some(max_pct);
                    }
                    if value > Decimal::ZERO {
                        holdings.insert(symbol.clone(), holding(&symbol, value, dec!(20)));
                    }
                    prices.insert(symbol, dec!(25));
                    securities.push(s);
                }
            }
        }
    }
    (securities, holdings, prices)
}

// ---------------------------------------------------------------------------
// Weight bounds
// ---------------------------------------------------------------------------

#[test]
fn test_bounds_always_ordered_within_unit_interval() {
    let config = OptimizerConfig::default();
    let (securities, holdings, prices) = universe();
    let (bounds, _) = WeightBoundsCalculator::new(&config).calculate(
        &securities,
        &holdings,
        dec!(10000),
        &prices,
    );
    assert_eq!(bounds.len(), securities.len());
    for b in bounds.values() {
        assert!(b.lower >= Decimal::ZERO, "{}: lower {}", b.symbol, b.lower);
        assert!(b.lower <= b.upper, "{}: {} > {}", b.symbol, b.lower, b.upper);
        assert!(b.upper <= Decimal::ONE, "{}: upper {}", b.symbol, b.upper);
    }
}

#[test]
fn test_sell_lock_pins_lower_to_current_weight() {
    let config = OptimizerConfig::default();
    let (securities, holdings, prices) = universe();
    let (bounds, _) = WeightBoundsCalculator::new(&config).calculate(
        &securities,
        &holdings,
        dec!(10000),
        &prices,
    );
    for s in securities.iter().filter(|s| !s.allow_sell) {
        let b = &bounds[&s.symbol];
        // positions above 100% are clamped into range
        if b.current_weight <= Decimal::ONE {
            assert!(
                b.lower >= b.current_weight,
                "{}: lower {} below current {}",
                s.symbol,
                b.lower,
                b.current_weight
            );
        }
    }
}

#[test]
fn test_buy_lock_caps_upper_at_current_weight() {
    let config = OptimizerConfig::default();
    let (securities, holdings, prices) = universe();
    let (bounds, _) = WeightBoundsCalculator::new(&config).calculate(
        &securities,
        &holdings,
        dec!(10000),
        &prices,
    );
    for s in securities.iter().filter(|s| !s.allow_buy) {
        let b = &bounds[&s.symbol];
        assert!(
            b.upper <= b.current_weight,
            "{}: upper {} above current {}",
            s.symbol,
            b.upper,
            b.current_weight
        );
    }
}

#[test]
fn test_inactive_securities_excluded() {
    let config = OptimizerConfig::default();
    let mut inactive = SecurityRule::new("OFF");
    inactive.active = false;
    let securities = vec![SecurityRule::new("ON"), inactive];
    let (bounds, _) = WeightBoundsCalculator::new(&config).calculate(
        &securities,
        &HashMap::new(),
        dec!(10000),
        &HashMap::new(),
    );
    assert!(bounds.contains_key("ON"));
    assert!(!bounds.contains_key("OFF"));
}

// ---------------------------------------------------------------------------
// Sector limits
// ---------------------------------------------------------------------------

fn grouping() -> GroupMap {
    let mut g = GroupMap::default();
    for (i, grp) in ["G0", "G1", "G2", "G3", "G4", "G5"].iter().enumerate() {
        g.countries.insert(format!("C{}", i), grp.to_string());
        g.industries.insert(format!("I{}", i), grp.to_string());
    }
    g
}

fn spread_securities() -> Vec<SecurityRule> {
    (0..12)
        .map(|i| {
            let mut s = SecurityRule::new(format!("S{:02}", i));
            s.country = Some(format!("C{}", i % 6));
            s.industry = Some(format!("I{}", (i * 5) % 6));
            s
        })
        .collect()
}

#[test]
fn test_sector_sums_bounded_for_many_target_sets() {
    let config = OptimizerConfig::default();
    let groups = grouping();
    let builder = SectorConstraintBuilder::new(&config, &groups);
    let securities = spread_securities();

    for scale in [dec!(0.1), dec!(0.2), dec!(0.35), dec!(0.5), dec!(0.8)] {
        for count in 1..=6 {
            let targets: HashMap<String, Decimal> = (0..count)
                .map(|i| (format!("G{}", i), scale + Decimal::from(i) / dec!(100)))
                .collect();
            let (sectors, _) = builder.build(&securities, &targets, &targets);

            let country_upper: Decimal = sectors.country.iter().map(|c| c.upper).sum();
            let industry_lower: Decimal = sectors.industry.iter().map(|c| c.lower).sum();
            let combined = sectors.country_lower_sum() + sectors.industry_lower_sum();
            assert!(country_upper <= Decimal::ONE, "country uppers {}", country_upper);
            assert!(industry_lower <= Decimal::ONE, "industry lowers {}", industry_lower);
            assert!(
                combined <= config.combined_sector_min_threshold,
                "combined lowers {}",
                combined
            );
            for c in sectors.iter() {
                assert!(c.lower <= c.upper, "{}: {} > {}", c.name, c.lower, c.upper);
            }
        }
    }
}

#[test]
fn test_feasibility_check_accepts_built_constraints() {
    let config = OptimizerConfig::default();
    let groups = grouping();
    let securities = spread_securities();
    let targets: HashMap<String, Decimal> = [
        ("G0", dec!(0.4)),
        ("G1", dec!(0.4)),
        ("G2", dec!(0.3)),
    ]
    .iter()
    .map(|(g, t)| (g.to_string(), *t))
    .collect();
    let (sectors, _) =
        SectorConstraintBuilder::new(&config, &groups).build(&securities, &targets, &targets);
    let (bounds, _) = WeightBoundsCalculator::new(&config).calculate(
        &securities,
        &HashMap::new(),
        dec!(10000),
        &HashMap::new(),
    );
    let symbols: Vec<String> = securities.iter().map(|s| s.symbol.clone()).collect();

    let report = check_feasibility(&config, &symbols, &bounds, &sectors);
    assert!(report.feasible, "warnings: {:?}", report.warnings);
    let lowers: Decimal = report.adjusted_bounds.values().map(|b| b.lower).sum::<Decimal>()
        + report.sectors().country_lower_sum()
        + report.sectors().industry_lower_sum();
    assert!(lowers <= config.feasibility_total_min);
}
