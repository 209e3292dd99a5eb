mod io_utils;
mod readers;
mod util;

pub use io_utils::open_output;
pub use readers::open_reader;
pub use util::{handle_error_and_exit, is_gzipped, thread_pool, Result};
