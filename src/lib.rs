pub mod error;
pub mod log_line_util;
pub mod output_dir_util;
pub mod stream_merge_util;
