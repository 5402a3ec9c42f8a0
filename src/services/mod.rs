pub mod correlation_runner;

pub use correlation_runner::CorrelationRunner;
