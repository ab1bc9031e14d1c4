use std::fmt;
use std::io::Read;

use bytes::{Buf, Bytes};
use hyper::header::{HeaderName, HeaderValue, ETAG};
use ottoman_types::{HeaderMap, RequestInfo, StatusCode};

use crate::error::{ResponseError, ResponseResult};

/// What the transport hands the materializer: status, headers, the
/// originating request, and the unread body.
pub struct RawResponse {
    pub status: StatusCode,
    pub request: RequestInfo,
    pub headers: HeaderMap,
    pub body: Box<dyn Read + Send>,
}

impl RawResponse {
    pub fn new(status: StatusCode, request: RequestInfo, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            request,
            headers: HeaderMap::new(),
            body: Box::new(body),
        }
    }

    /// A response whose body is already in memory.
    pub fn with_body(status: StatusCode, request: RequestInfo, body: impl Into<Bytes>) -> Self {
        Self::new(status, request, body.into().reader())
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> ResponseResult<Self> {
        let value = HeaderValue::from_str(value).map_err(|e| ResponseError::InvalidHeader(format!("{name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The entity tag with exactly one leading and one trailing quote
    /// removed, if present.
    pub fn etag(&self) -> ResponseResult<Option<String>> {
        let Some(value) = self.headers.get(ETAG) else {
            return Ok(None);
        };
        let text = value
            .to_str()
            .map_err(|e| ResponseError::InvalidHeader(format!("{ETAG}: {e}")))?;
        Ok(Some(unquote(text).to_string()))
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("request", &self.request)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

fn unquote(text: &str) -> &str {
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}
