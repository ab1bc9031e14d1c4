use std::fmt;

use hyper::StatusCode;

use crate::error::TypeError;
use crate::request::RequestInfo;

/// Base response: status, originating request, and failure details.
///
/// `error` and `reason` are only populated when [`Response::is_success`] is
/// `false`; callers check the success flag rather than catching an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub request: RequestInfo,
    pub error: Option<String>,
    pub reason: Option<String>,
}

impl Response {
    pub fn new(status: StatusCode, request: RequestInfo) -> Self {
        Self {
            status,
            request,
            error: None,
            reason: None,
        }
    }

    /// Build from a raw numeric status.
    pub fn from_status_code(status: u16, request: RequestInfo) -> Result<Self, TypeError> {
        let status = StatusCode::from_u16(status).map_err(|_| TypeError::InvalidStatus(status))?;
        Ok(Self::new(status, request))
    }

    /// `true` when the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.request, self.status.as_u16())?;
        if let Some(error) = &self.error {
            write!(f, " {error}")?;
            if let Some(reason) = &self.reason {
                write!(f, ": {reason}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> RequestInfo {
        RequestInfo::parse("GET", "/db/doc").unwrap()
    }

    #[test]
    fn success_range() {
        assert!(Response::from_status_code(200, req()).unwrap().is_success());
        assert!(Response::from_status_code(201, req()).unwrap().is_success());
        assert!(Response::from_status_code(202, req()).unwrap().is_success());
        assert!(!Response::from_status_code(304, req()).unwrap().is_success());
        assert!(!Response::from_status_code(404, req()).unwrap().is_success());
        assert!(!Response::from_status_code(409, req()).unwrap().is_success());
    }

    #[test]
    fn invalid_status() {
        let err = Response::from_status_code(42, req()).unwrap_err();
        assert_eq!(err, TypeError::InvalidStatus(42));
    }

    #[test]
    fn new_has_no_failure_details() {
        let r = Response::new(StatusCode::OK, req());
        assert!(r.error.is_none());
        assert!(r.reason.is_none());
    }

    #[test]
    fn display_success() {
        let r = Response::new(StatusCode::OK, req());
        assert_eq!(r.to_string(), "GET /db/doc -> 200");
    }

    #[test]
    fn display_failure() {
        let mut r = Response::new(StatusCode::NOT_FOUND, req());
        r.error = Some("not_found".into());
        r.reason = Some("missing".into());
        assert_eq!(r.to_string(), "GET /db/doc -> 404 not_found: missing");
    }
}
