pub mod best_fit;
pub mod frontier;
pub mod individual;
pub mod operators;
pub mod population;
pub mod progress;
pub mod search_engine;

pub use best_fit::{BestFit, BestFitTracker};
pub use frontier::MutationFrontier;
pub use individual::{Individual, Node, Operand, Operator};
pub use population::Population;
pub use progress::{ConsoleProgressCallback, ProgressCallback, SilentProgress};
pub use search_engine::{GeneticSearch, SearchOutcome, SearchResult, SearchStats};
