//! CLI command handlers. Each command is in its own file for clarity.

mod checksum;
mod crawl;
mod extract;
mod fetch;
mod status;

pub use checksum::run_checksum;
pub use crawl::run_crawl;
pub use extract::run_extract;
pub use fetch::run_fetch;
pub use status::run_status;
