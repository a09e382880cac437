use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use portfolio_targets_core::BlendedOptimizer;

use super::{load_config, load_snapshot, SnapshotArgs};

#[derive(Args)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    /// Override the request's blend (0 = pure mean-variance, 1 = pure HRP)
    #[arg(long)]
    pub blend: Option<Decimal>,

    /// Override the request's target return
    #[arg(long)]
    pub target_return: Option<Decimal>,
}

pub fn run_optimize(args: OptimizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = load_config(&args.snapshot)?;
    let mut input = load_snapshot(&args.snapshot)?;
    if let Some(blend) = args.blend {
        input.request.blend = blend;
    }
    if let Some(target) = args.target_return {
        input.request.target_return = target;
    }

    let returns = input.expected_returns_provider();
    let risk_model = input.risk_model()?;
    let grouping = input.grouping();

    let optimizer = BlendedOptimizer::new(config, &returns, risk_model.as_ref(), &grouping);
    let result = optimizer.optimize(&input.snapshot, &input.request);
    Ok(serde_json::to_value(result)?)
}
