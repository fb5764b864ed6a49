//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace: geometry,
//! route plans, engine events, the sink trait and the fleet blueprint.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Indexing Model
//! - Robots are addressed by `RobotIndex`, their position in the configured roster
//! - Steps are 0-based indices into a robot's plan; step `i` is the goal of segment `i`

mod blueprint;
mod engine_config;
mod error;
mod event;
mod event_source;
mod geometry;
mod robot_name;
mod route;
mod sink;

pub use blueprint::*;
pub use engine_config::*;
pub use error::*;
pub use event::*;
pub use event_source::{EventSource, RouteEventCallback};
pub use geometry::*;
pub use robot_name::RobotName;
pub use route::*;
pub use sink::*;
