mod config;
pub mod report;

pub use config::CliConfig;
