pub mod fade;
pub mod sequencer;
