//! Response data model for the ottoman document-database client.
//!
//! Every call against the database produces one of the response objects in
//! this crate. They are created fresh per call, populated by the
//! materializer in `ottoman-response`, and then owned by the caller.
//!
//! # Key Types
//!
//! - [`Response`]: status, request metadata, and failure details
//! - [`DocumentResponse`]: document id/revision plus optional raw body
//! - [`EntityResponse`]: a document response that owns a typed entity
//! - [`BulkResponse`]: per-document outcomes of a bulk write, in submission order
//! - [`ViewQueryResponse`]: view query totals and rows, in server order

pub mod bulk;
pub mod document;
pub mod error;
pub mod request;
pub mod response;
pub mod view;

pub use bulk::{BulkResponse, BulkRow};
pub use document::{DocumentResponse, EntityResponse};
pub use error::TypeError;
pub use request::RequestInfo;
pub use response::Response;
pub use view::{Row, ViewQueryResponse};

pub use hyper::{HeaderMap, Method, StatusCode, Uri};
