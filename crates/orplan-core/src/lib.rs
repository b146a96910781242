pub mod config;
pub mod conflict;
pub mod costs;
pub mod error;
pub mod extract;
pub mod formulate;
pub mod groups;
pub mod heuristic;
pub mod input;
pub mod model;
pub mod planner;

#[cfg(test)]
mod fixtures;

pub use config::PlannerConfig;
pub use conflict::IncompatibilityRelation;
pub use costs::{AverageCosts, CostTable};
pub use error::{PlanError, Result};
pub use extract::{AssignmentPlan, CoverPlan, Outcome, RoomAssignment, SelectedGroup, Summary};
pub use formulate::{AssignmentModel, CoverKind, CoverModel, Coverage};
pub use groups::Group;
pub use input::Instance;
pub use model::{Operation, OperationId, Room, RoomId};
pub use planner::{Planner, PlanReport};
