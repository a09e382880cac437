use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constraints::sector::{SectorConstraint, SectorConstraints};
use crate::constraints::weight_bounds::BoundsMap;
use crate::types::Weight;

/// One group row of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    pub target: Weight,
    pub lower: Weight,
    pub upper: Weight,
}

/// Operator-facing digest of the constraint set used for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintsSummary {
    pub total_securities: usize,
    /// `lower == upper`: no room to move.
    pub locked_positions: usize,
    /// Nothing to hold, capped below the global ceiling.
    pub buy_only: usize,
    /// Positive floor: cannot be fully sold.
    pub sell_blocked: usize,
    pub total_min_weight: Weight,
    pub total_max_weight: Weight,
    pub country_constraints: Vec<GroupSummary>,
    pub industry_constraints: Vec<GroupSummary>,
}

impl ConstraintsSummary {
    pub fn build(
        bounds: &BoundsMap,
        sectors: &SectorConstraints,
        max_concentration: Weight,
    ) -> Self {
        let mut locked_positions = 0;
        let mut buy_only = 0;
        let mut sell_blocked = 0;
        for b in bounds.values() {
            if b.lower == b.upper {
                locked_positions += 1;
            } else if b.lower.is_zero() && b.upper < max_concentration {
                buy_only += 1;
            } else if b.lower > Decimal::ZERO {
                sell_blocked += 1;
            }
        }

        let rows = |set: &[SectorConstraint]| -> Vec<GroupSummary> {
            set.iter()
                .map(|c| GroupSummary {
                    name: c.name.clone(),
                    target: c.target,
                    lower: c.lower,
                    upper: c.upper,
                })
                .collect()
        };

        Self {
            total_securities: bounds.len(),
            locked_positions,
            buy_only,
            sell_blocked,
            total_min_weight: bounds.values().map(|b| b.lower).sum(),
            total_max_weight: bounds.values().map(|b| b.upper).sum(),
            country_constraints: rows(&sectors.country),
            industry_constraints: rows(&sectors.industry),
        }
    }
}
