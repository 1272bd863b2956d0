//! Grid request handling.
//!
//! - [`ColumnMap`] - Field to column resolution
//! - [`FilterModel`] - The grid's per-column filter descriptors
//! - [`FilterTranslator`] - Filter model to PostgREST filters
//! - [`ServerSideDatasource`] - Group/leaf request dispatch
//! - [`fetch_all`] - Whole-table load for the client-side row model

mod columns;
mod datasource;
mod filter_model;
mod full_fetch;
mod request;
mod translate;

pub use columns::*;
pub use datasource::*;
pub use filter_model::*;
pub use full_fetch::fetch_all;
pub use request::*;
pub use translate::*;
