use std::ops::{Deref, DerefMut};

use hyper::StatusCode;
use serde::Serialize;

use crate::request::RequestInfo;
use crate::response::Response;

/// One row of a view query result.
///
/// `key` is always the textual form of the key, whatever its JSON type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Row<V> {
    pub id: String,
    pub key: String,
    pub value: V,
}

/// Response of a view query.
///
/// The totals are `None` when the server did not send them; they are never
/// defaulted to zero. Rows keep the server's order.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewQueryResponse<V> {
    pub response: Response,
    pub total_rows: Option<u64>,
    pub update_seq: Option<u64>,
    pub offset: Option<u64>,
    pub rows: Vec<Row<V>>,
}

impl<V> ViewQueryResponse<V> {
    pub fn new(status: StatusCode, request: RequestInfo) -> Self {
        Self {
            response: Response::new(status, request),
            total_rows: None,
            update_seq: None,
            offset: None,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.rows.iter().map(|r| &r.value)
    }
}

impl<V> Deref for ViewQueryResponse<V> {
    type Target = Response;

    fn deref(&self) -> &Response {
        &self.response
    }
}

impl<V> DerefMut for ViewQueryResponse<V> {
    fn deref_mut(&mut self) -> &mut Response {
        &mut self.response
    }
}
