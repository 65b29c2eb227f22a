pub mod config;

pub use config::{AppConfig, ConfigOverrides, TransferConfig, PLACEHOLDER_DESTINATION};
