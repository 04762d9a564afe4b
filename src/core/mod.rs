pub mod aggregator;
pub mod client;
pub mod handler;
pub mod probe;
pub mod query;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::{AggregateResult, GatewayRequest, GatewayResponse, UpstreamResponse};
pub use crate::domain::ports::Upstream;
pub use crate::utils::error::Result;
