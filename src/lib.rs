pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::{AnnouncementPolicy, GatewayConfig};
pub use crate::core::{aggregator::ResultAggregator, client::HttpUpstream, handler::GatewayHandler};
pub use utils::error::{GatewayError, Result};
