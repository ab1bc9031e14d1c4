use std::fmt;
use std::str::FromStr;

use hyper::{Method, Uri};

use crate::error::TypeError;

/// The originating request of a response: its method and target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
}

impl RequestInfo {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri }
    }

    /// Build from textual method and target, e.g. `("PUT", "/db/artist:1")`.
    pub fn parse(method: &str, uri: &str) -> Result<Self, TypeError> {
        let method = Method::from_str(&method.to_ascii_uppercase())
            .map_err(|_| TypeError::InvalidMethod(method.into()))?;
        let uri = Uri::from_str(uri).map_err(|_| TypeError::InvalidUri(uri.into()))?;
        Ok(Self { method, uri })
    }

    /// `GET` and `HEAD` read a resource; everything else writes.
    pub fn is_read(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// The last non-empty path segment of the target, percent-decoded.
    ///
    /// For a document read this is the document id.
    pub fn last_segment(&self) -> Option<String> {
        let segment = self.uri.path().rsplit('/').find(|s| !s.is_empty())?;
        match urlencoding::decode(segment) {
            Ok(decoded) => Some(decoded.into_owned()),
            Err(_) => Some(segment.to_string()),
        }
    }
}

impl fmt::Display for RequestInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.uri)
    }
}
