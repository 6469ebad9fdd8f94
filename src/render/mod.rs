pub mod backend;
pub mod cache;
pub mod cpu;
pub mod pipeline;
