pub mod report;
pub mod svg;

pub use report::RunReport;
pub use svg::{plot_file_name, render_plot, write_plot};
