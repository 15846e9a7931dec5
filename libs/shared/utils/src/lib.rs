pub mod concurrency;
pub mod extractor;
pub mod session;
pub mod state;
pub mod test_utils;
pub mod time;
