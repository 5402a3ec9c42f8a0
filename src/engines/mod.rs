pub mod accelerator;
pub mod correlation;
pub mod generation;
pub mod reduction;
