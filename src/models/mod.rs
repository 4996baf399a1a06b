//! Core data models for roster watching.

mod arena;
mod color;
mod ids;
mod mode;
mod player;
mod region;
mod stats;

pub use arena::*;
pub use color::*;
pub use ids::*;
pub use mode::*;
pub use player::*;
pub use region::*;
pub use stats::*;
