pub mod load;
pub mod pattern;
