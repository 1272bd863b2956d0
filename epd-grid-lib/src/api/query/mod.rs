//! Query building for PostgREST.
//!
//! # Shared Types
//!
//! - [`Filter`] - Filter conditions, including negation and logic trees
//! - [`OrderBy`] - Ordering specification for query results
//! - [`Range`] - Row window (offset and limit)
//! - [`Query`] - A complete read query against one table
//! - [`Page`] - Rows returned by a query with the optional exact count
//!
//! [`url`] renders a [`Query`] into PostgREST query parameters.

mod builder;
mod filter;
mod order;
mod page;
mod range;
pub mod url;

pub use builder::Query;
pub use filter::escape_like;
pub use filter::escape_regex;
pub use filter::Filter;
pub use order::Direction;
pub use order::OrderBy;
pub use page::Page;
pub use range::Range;
