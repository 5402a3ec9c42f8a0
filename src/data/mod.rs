pub mod connectors;
pub mod preprocessing;
pub mod subjects;

pub use connectors::CsvConnector;
pub use preprocessing::{preprocess_subject, AccRecording, HrRecording};
pub use subjects::{discover_subjects, SubjectFiles};
