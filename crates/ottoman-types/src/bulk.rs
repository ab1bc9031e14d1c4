use std::ops::{Deref, DerefMut};

use hyper::StatusCode;
use serde::{Deserialize, Serialize};

use crate::request::RequestInfo;
use crate::response::Response;

/// Outcome of one document in a bulk write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRow {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BulkRow {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Response of a bulk write. Rows are in submission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkResponse {
    pub response: Response,
    pub rows: Vec<BulkRow>,
}

impl BulkResponse {
    pub fn new(status: StatusCode, request: RequestInfo) -> Self {
        Self {
            response: Response::new(status, request),
            rows: Vec::new(),
        }
    }

    pub fn failed_rows(&self) -> impl Iterator<Item = &BulkRow> {
        self.rows.iter().filter(|r| !r.succeeded())
    }
}

impl Deref for BulkResponse {
    type Target = Response;

    fn deref(&self) -> &Response {
        &self.response
    }
}

impl DerefMut for BulkResponse {
    fn deref_mut(&mut self) -> &mut Response {
        &mut self.response
    }
}
