//! CLI command handling

pub mod output;
pub mod show_config;
pub mod test_notice;

pub use output::*;
pub use show_config::*;
pub use test_notice::*;
