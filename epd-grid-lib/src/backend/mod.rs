//! Backend abstraction.
//!
//! The grid request handler never talks HTTP itself; it builds a
//! [`Query`] or [`RpcCall`] and hands it to a [`Backend`]. The production
//! implementation is [`PostgrestClient`](crate::PostgrestClient);
//! [`MemoryBackend`] evaluates the same calls over rows held in memory.

mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::query::Page;
use crate::api::query::Query;
use crate::api::RpcCall;
use crate::error::Error;
use crate::model::Row;

pub use memory::MemoryBackend;

/// A source of table rows that understands [`Query`] and [`RpcCall`].
#[async_trait]
pub trait Backend: Send + Sync {
    /// Executes a read query.
    ///
    /// The page carries a total count when the query asked for one.
    async fn fetch(&self, query: &Query) -> Result<Page, Error>;

    /// Invokes a remote procedure and returns its result rows.
    async fn rpc(&self, call: &RpcCall) -> Result<Vec<Row>, Error>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn fetch(&self, query: &Query) -> Result<Page, Error> {
        (**self).fetch(query).await
    }

    async fn rpc(&self, call: &RpcCall) -> Result<Vec<Row>, Error> {
        (**self).rpc(call).await
    }
}
