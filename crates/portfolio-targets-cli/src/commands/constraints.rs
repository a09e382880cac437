use clap::Args;
use serde::Serialize;
use serde_json::Value;

use portfolio_targets_core::constraints::{
    SectorConstraint, SectorConstraintBuilder, WeightBounds, WeightBoundsCalculator,
};
use portfolio_targets_core::types::SecurityRule;

use super::{load_config, load_snapshot, SnapshotArgs};

#[derive(Args)]
pub struct BoundsArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,
}

#[derive(Args)]
pub struct SectorsArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,
}

#[derive(Debug, Serialize)]
struct BoundsOutput {
    bounds: Vec<WeightBounds>,
    diagnostics: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SectorsOutput {
    country: Vec<SectorConstraint>,
    industry: Vec<SectorConstraint>,
    diagnostics: Vec<String>,
}

pub fn run_bounds(args: BoundsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = load_config(&args.snapshot)?;
    let input = load_snapshot(&args.snapshot)?;
    let snapshot = &input.snapshot;

    let (bounds, diagnostics) = WeightBoundsCalculator::new(&config).calculate(
        &snapshot.securities,
        &snapshot.holdings_by_symbol(),
        snapshot.portfolio_value,
        &snapshot.current_prices,
    );
    let output = BoundsOutput {
        bounds: bounds.into_values().collect(),
        diagnostics,
    };
    Ok(serde_json::to_value(output)?)
}

pub fn run_sectors(args: SectorsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = load_config(&args.snapshot)?;
    let input = load_snapshot(&args.snapshot)?;
    let grouping = input.grouping();

    let active: Vec<SecurityRule> = input
        .snapshot
        .securities
        .iter()
        .filter(|s| s.active)
        .cloned()
        .collect();
    let (sectors, diagnostics) = SectorConstraintBuilder::new(&config, &grouping).build(
        &active,
        &input.request.country_targets,
        &input.request.industry_targets,
    );
    let output = SectorsOutput {
        country: sectors.country,
        industry: sectors.industry,
        diagnostics,
    };
    Ok(serde_json::to_value(output)?)
}
