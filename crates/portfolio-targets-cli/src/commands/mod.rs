pub mod constraints;
pub mod optimize;

use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use portfolio_targets_core::collaborators::{
    CovarianceModel, GroupMap, RiskModel, SampleRiskModel, StaticExpectedReturns, StaticRiskModel,
};
use portfolio_targets_core::types::{MarketRegime, PortfolioSnapshot, Rate};
use portfolio_targets_core::{OptimizationRequest, OptimizerConfig};

use crate::input;

/// Input flags shared by every snapshot command.
#[derive(Args)]
pub struct SnapshotArgs {
    /// Path to the snapshot, JSON or YAML by extension (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to an optimizer configuration, JSON or YAML (defaults when omitted)
    #[arg(long)]
    pub config: Option<String>,
}

/// Everything one run needs: the account, the request and the estimates
/// the in-memory collaborators serve.
#[derive(Debug, Deserialize)]
pub struct SnapshotInput {
    pub snapshot: PortfolioSnapshot,
    #[serde(default)]
    pub request: OptimizationRequest,
    #[serde(default)]
    pub expected_returns: BTreeMap<String, Rate>,
    #[serde(default)]
    pub regime_multipliers: HashMap<MarketRegime, Decimal>,
    /// Pre-computed covariance; takes precedence over `return_histories`.
    #[serde(default)]
    pub covariance: Option<CovarianceModel>,
    /// Daily returns per symbol, used when no covariance is given.
    #[serde(default)]
    pub return_histories: BTreeMap<String, Vec<Decimal>>,
    #[serde(default)]
    pub min_history: Option<usize>,
    /// Country group name to member country names.
    #[serde(default)]
    pub country_groups: BTreeMap<String, Vec<String>>,
    /// Industry group name to member industry names.
    #[serde(default)]
    pub industry_groups: BTreeMap<String, Vec<String>>,
}

impl SnapshotInput {
    pub fn grouping(&self) -> GroupMap {
        GroupMap::from_groups(&self.country_groups, &self.industry_groups)
    }

    pub fn expected_returns_provider(&self) -> StaticExpectedReturns {
        StaticExpectedReturns {
            returns: self.expected_returns.clone(),
            regime_multipliers: self.regime_multipliers.clone(),
        }
    }

    pub fn risk_model(&self) -> Result<Box<dyn RiskModel>, Box<dyn std::error::Error>> {
        match &self.covariance {
            Some(model) => Ok(Box::new(StaticRiskModel::new(model.clone())?)),
            None => {
                let mut sample = SampleRiskModel::new(self.return_histories.clone());
                if let Some(min) = self.min_history {
                    sample.min_history = min;
                }
                Ok(Box::new(sample))
            }
        }
    }
}

/// Load the snapshot from `--input` or stdin.
pub fn load_snapshot(args: &SnapshotArgs) -> Result<SnapshotInput, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        input::file::read_document(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(data)
    } else {
        Err("--input <snapshot.json|yaml> or stdin required".into())
    }
}

/// Load and validate the optimizer configuration.
pub fn load_config(args: &SnapshotArgs) -> Result<OptimizerConfig, Box<dyn std::error::Error>> {
    let config: OptimizerConfig = match args.config {
        Some(ref path) => input::file::read_document(path)?,
        None => OptimizerConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
