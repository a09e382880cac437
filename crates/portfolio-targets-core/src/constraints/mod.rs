pub mod feasibility;
pub mod sector;
pub mod summary;
pub mod weight_bounds;

pub use feasibility::{check_feasibility, FeasibilityReport};
pub use sector::{SectorConstraint, SectorConstraintBuilder, SectorConstraints};
pub use summary::{ConstraintsSummary, GroupSummary};
pub use weight_bounds::{BoundsMap, WeightBounds, WeightBoundsCalculator};
