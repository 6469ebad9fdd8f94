pub mod geometry;
pub mod pitch;
pub mod range;
