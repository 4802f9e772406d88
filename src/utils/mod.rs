pub mod format;
pub mod test_helpers;

pub use format::{calculate_reading_time, format_file_size, format_time_ago};
