pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    ReportDestination, expand_output_path, load_urls_from_file, parse_url_line,
    report_destination, selection_from_args, spider_options_from_args,
};
