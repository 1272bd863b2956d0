//! EPD grid backend library
//!
//! Serves a data grid over the hosted `EPD` table (environmental product
//! declarations) behind a PostgREST endpoint. Grid requests (pages of leaf
//! rows, or the distinct values of one grouping level) are translated into
//! PostgREST queries and remote procedure calls.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod grid;
pub mod model;

mod client;

pub use backend::Backend;
pub use client::*;
