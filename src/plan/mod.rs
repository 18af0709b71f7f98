//! Wall plan: geometry, identifier generation and persistence.

pub mod geometry;
pub mod names;
pub mod store;

pub use geometry::{Arrangement, Plan, Tile, Wall, WallLayout, WallSpec, compute_plan, role_id};
pub use names::{NameSource, RandomNames};
pub use store::{PlanStore, resolve_plan};
