//! Streaming JSON for the ottoman document-database client.
//!
//! Response bodies are read forward-only, without building a full tree:
//!
//! - [`JsonReader`]: token cursor with path-length depth tracking
//! - [`scan_properties`]: pull named top-level properties and stop early
//! - [`RowStream`]: lazy view rows, with the row value read according to
//!   its [`ValueStrategy`]

pub mod error;
pub mod reader;
pub mod rows;
pub mod scan;
pub mod strategy;
pub mod writer;

pub use error::{StreamError, StreamResult};
pub use reader::{JsonReader, Token};
pub use rows::RowStream;
pub use scan::{scan_properties, scan_texts};
pub use strategy::{Captured, Doc, RowValue, ValueStrategy};
pub use writer::{capture_json, capture_text, write_current, TokenWriter};
