pub mod pearson;

pub use pearson::{pearson_correlation, TargetProfile};
