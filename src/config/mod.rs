pub mod traits;
pub mod search;
pub mod preprocessing;
pub mod output;
pub mod logging;
pub mod manager;

pub use manager::{AppConfig, ConfigManager};
pub use search::SearchConfig;
pub use preprocessing::PreprocessingConfig;
pub use output::OutputConfig;
pub use logging::LoggingConfig;
pub use traits::ConfigSection;
