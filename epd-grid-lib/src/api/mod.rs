//! PostgREST operations

mod execute;
pub mod query;
mod rpc;

pub use execute::parse_content_range;
pub use rpc::*;
