//! Response materialization for the ottoman document-database client.
//!
//! The transport hands over a [`RawResponse`] (status, headers, originating
//! request, unread body); the [`Materializer`] turns it into one of the
//! typed responses from `ottoman-types`. Failed requests are reported on
//! the response object, never as an `Err`; errors are reserved for bodies
//! that break the wire contract.
//!
//! Materializers are cheap to clone and safe to share across threads. The
//! `*_async` variants run the same work on tokio's blocking pool.

pub mod config;
pub mod error;
pub mod materializer;
pub mod message;
pub mod task;

pub use config::MaterializerConfig;
pub use error::{ResponseError, ResponseResult};
pub use materializer::Materializer;
pub use message::RawResponse;

pub use ottoman_codec::{Codec, CodecConfig, Entity, Member};
pub use ottoman_stream::{Doc, RowValue, ValueStrategy};
pub use ottoman_types::{
    BulkResponse, BulkRow, DocumentResponse, EntityResponse, RequestInfo, Response, Row, ViewQueryResponse,
};
