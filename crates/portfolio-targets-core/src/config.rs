use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::OptimizerError;
use crate::types::{ProductType, Rate, Weight};
use crate::OptimizerResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Concentration ceilings per instrument class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductTypeCaps {
    pub equity: Weight,
    pub etf: Weight,
    pub mutual_fund: Weight,
    pub etc: Weight,
}

impl Default for ProductTypeCaps {
    fn default() -> Self {
        Self {
            equity: dec!(0.20),
            etf: dec!(0.30),
            mutual_fund: dec!(0.30),
            etc: dec!(0.12),
        }
    }
}

/// Industry-group ceiling, keyed by how many industry groups carry a target.
///
/// Fewer groups get larger ceilings; a ceiling tuned for many groups makes a
/// two-group universe infeasible for no good reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndustryCeilings {
    pub single: Weight,
    pub pair: Weight,
    /// Three or four groups.
    pub few: Weight,
    pub default: Weight,
}

impl Default for IndustryCeilings {
    fn default() -> Self {
        Self {
            single: dec!(0.70),
            pair: dec!(0.50),
            few: dec!(0.40),
            default: dec!(0.30),
        }
    }
}

impl IndustryCeilings {
    pub fn for_group_count(&self, groups: usize) -> Weight {
        match groups {
            0 | 1 => self.single,
            2 => self.pair,
            3 | 4 => self.few,
            _ => self.default,
        }
    }
}

/// Every tunable threshold of the constraint builders and the optimizer.
///
/// The defaults were tuned empirically for a long-horizon retirement
/// account; deployments are expected to recalibrate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Default ceiling for any single position.
    pub max_concentration: Weight,
    /// Ceilings used instead of `max_concentration` when a product type is known.
    pub product_type_caps: ProductTypeCaps,
    pub country_tolerance: Weight,
    pub industry_tolerance: Weight,
    pub max_country_concentration: Weight,
    pub industry_ceilings: IndustryCeilings,
    /// Combined country + industry minimums are scaled down to this.
    pub combined_sector_min_threshold: Weight,
    /// Pre-check budget for security + sector minimums.
    pub feasibility_total_min: Weight,
    /// Security minimums above this are scaled before sector minimums.
    pub feasibility_security_min: Weight,
    /// Sector minimums multiplier at the relaxed constraint level.
    pub relaxed_sector_factor: Decimal,
    /// Annualized volatility targeted by the efficient-risk fallback.
    pub target_volatility: Rate,
    pub risk_free_rate: Rate,
    /// Final weights below this are dropped.
    pub weight_cutoff: Weight,
    /// Max current-to-target deviation that triggers damping.
    pub gradual_adjustment_threshold: Weight,
    /// Fraction of the distance to target covered per cycle when damping.
    pub gradual_adjustment_step: Decimal,
    /// Weight changes smaller than this are not reported.
    pub min_weight_change: Weight,
    pub correlation_threshold: Decimal,
    pub max_correlation_pairs: usize,
    /// Cap on the expected-return reduction from transaction costs.
    pub max_cost_drag: Rate,
    /// Cost ratio assumed when no trade size can be estimated.
    pub default_cost_ratio: Rate,
    /// Cost ratio at which a new position's minimum trade size is defined.
    pub new_position_cost_ratio: Rate,
    /// Rebalancing trade estimate as a fraction of portfolio value.
    pub rebalance_trade_fraction: Decimal,
    /// Rebalancing trade estimate as a fraction of the current position.
    pub position_trade_fraction: Decimal,
    /// Investable fraction used when the portfolio value is not positive.
    pub default_investable_fraction: Weight,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_concentration: dec!(0.15),
            product_type_caps: ProductTypeCaps::default(),
            country_tolerance: dec!(0.05),
            industry_tolerance: dec!(0.05),
            max_country_concentration: dec!(0.60),
            industry_ceilings: IndustryCeilings::default(),
            combined_sector_min_threshold: dec!(0.70),
            feasibility_total_min: dec!(0.80),
            feasibility_security_min: dec!(0.70),
            relaxed_sector_factor: dec!(0.5),
            target_volatility: dec!(0.15),
            risk_free_rate: Decimal::ZERO,
            weight_cutoff: dec!(0.001),
            gradual_adjustment_threshold: dec!(0.30),
            gradual_adjustment_step: dec!(0.50),
            min_weight_change: dec!(0.001),
            correlation_threshold: dec!(0.80),
            max_correlation_pairs: 5,
            max_cost_drag: dec!(0.02),
            default_cost_ratio: dec!(0.01),
            new_position_cost_ratio: dec!(0.01),
            rebalance_trade_fraction: dec!(0.05),
            position_trade_fraction: dec!(0.5),
            default_investable_fraction: dec!(0.9),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl OptimizerConfig {
    /// Starting ceiling for a security, before any per-security override.
    pub fn concentration_cap(&self, product_type: Option<ProductType>) -> Weight {
        match product_type {
            Some(ProductType::Equity) => self.product_type_caps.equity,
            Some(ProductType::Etf) => self.product_type_caps.etf,
            Some(ProductType::MutualFund) => self.product_type_caps.mutual_fund,
            Some(ProductType::Etc) => self.product_type_caps.etc,
            Some(ProductType::Unknown) | None => self.max_concentration,
        }
    }

    /// Reject values that would make the builders or the cascade meaningless.
    pub fn validate(&self) -> OptimizerResult<()> {
        let unit_fields = [
            ("max_concentration", self.max_concentration),
            ("product_type_caps.equity", self.product_type_caps.equity),
            ("product_type_caps.etf", self.product_type_caps.etf),
            ("product_type_caps.mutual_fund", self.product_type_caps.mutual_fund),
            ("product_type_caps.etc", self.product_type_caps.etc),
            ("country_tolerance", self.country_tolerance),
            ("industry_tolerance", self.industry_tolerance),
            ("max_country_concentration", self.max_country_concentration),
            ("industry_ceilings.single", self.industry_ceilings.single),
            ("industry_ceilings.pair", self.industry_ceilings.pair),
            ("industry_ceilings.few", self.industry_ceilings.few),
            ("industry_ceilings.default", self.industry_ceilings.default),
            ("combined_sector_min_threshold", self.combined_sector_min_threshold),
            ("feasibility_total_min", self.feasibility_total_min),
            ("feasibility_security_min", self.feasibility_security_min),
            ("relaxed_sector_factor", self.relaxed_sector_factor),
            ("weight_cutoff", self.weight_cutoff),
            ("gradual_adjustment_threshold", self.gradual_adjustment_threshold),
            ("min_weight_change", self.min_weight_change),
            ("correlation_threshold", self.correlation_threshold),
            ("max_cost_drag", self.max_cost_drag),
            ("default_cost_ratio", self.default_cost_ratio),
            ("rebalance_trade_fraction", self.rebalance_trade_fraction),
            ("position_trade_fraction", self.position_trade_fraction),
            ("default_investable_fraction", self.default_investable_fraction),
        ];
        for (field, value) in unit_fields {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(OptimizerError::InvalidConfig {
                    field: field.into(),
                    reason: format!("must be within [0, 1], got {}", value),
                });
            }
        }

        if self.gradual_adjustment_step <= Decimal::ZERO
            || self.gradual_adjustment_step > Decimal::ONE
        {
            return Err(OptimizerError::InvalidConfig {
                field: "gradual_adjustment_step".into(),
                reason: format!("must be within (0, 1], got {}", self.gradual_adjustment_step),
            });
        }

        if self.target_volatility <= Decimal::ZERO {
            return Err(OptimizerError::InvalidConfig {
                field: "target_volatility".into(),
                reason: "must be positive".into(),
            });
        }

        // The cost ratio defines min trade size as fixed / (ratio - percent).
        if self.new_position_cost_ratio <= Decimal::ZERO {
            return Err(OptimizerError::InvalidConfig {
                field: "new_position_cost_ratio".into(),
                reason: "must be positive".into(),
            });
        }

        Ok(())
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> OptimizerResult<Self> {
        let config: OptimizerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
