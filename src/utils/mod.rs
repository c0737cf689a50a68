// Utility functions

pub mod format;
pub mod logger;
pub mod retry;

pub use format::{format_size, truncate};
pub use logger::{init_logger, LogMode};
pub use retry::{with_retry, Retried, RetryPolicy};
