//! Searches for an arithmetic expression of an accelerometer signal that
//! correlates with a heart-rate signal, scoring candidates on a parallel device.

pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod logging;
pub mod output;
pub mod services;
pub mod types;

pub use error::{CorrelationError, Result};
