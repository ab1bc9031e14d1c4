use std::ops::{Deref, DerefMut};

use hyper::StatusCode;

use crate::request::RequestInfo;
use crate::response::Response;

/// Response for a single document: its id, revision, and (for raw reads)
/// the verbatim body.
///
/// `id` and `rev` stay `None` when the response did not carry a resolvable
/// identity, e.g. for failed requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentResponse {
    pub response: Response,
    pub id: Option<String>,
    pub rev: Option<String>,
    /// Body text of a raw document read.
    pub content: Option<String>,
}

impl DocumentResponse {
    pub fn new(status: StatusCode, request: RequestInfo) -> Self {
        Self::from_response(Response::new(status, request))
    }

    pub fn from_response(response: Response) -> Self {
        Self {
            response,
            id: None,
            rev: None,
            content: None,
        }
    }

    /// Writes report the new id/rev in the body; reads recover them from
    /// the request target and the entity tag instead.
    pub fn content_should_have_id_and_rev(&self) -> bool {
        !self.response.request.is_read()
    }
}

impl Deref for DocumentResponse {
    type Target = Response;

    fn deref(&self) -> &Response {
        &self.response
    }
}

impl DerefMut for DocumentResponse {
    fn deref_mut(&mut self) -> &mut Response {
        &mut self.response
    }
}

/// A document response owning a typed entity.
///
/// On success the entity's identity members mirror `id` and `rev`.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityResponse<T> {
    pub document: DocumentResponse,
    pub entity: Option<T>,
}

impl<T> EntityResponse<T> {
    pub fn new(status: StatusCode, request: RequestInfo) -> Self {
        Self {
            document: DocumentResponse::new(status, request),
            entity: None,
        }
    }

    pub fn into_entity(self) -> Option<T> {
        self.entity
    }
}

impl<T> Deref for EntityResponse<T> {
    type Target = DocumentResponse;

    fn deref(&self) -> &DocumentResponse {
        &self.document
    }
}

impl<T> DerefMut for EntityResponse<T> {
    fn deref_mut(&mut self) -> &mut DocumentResponse {
        &mut self.document
    }
}
