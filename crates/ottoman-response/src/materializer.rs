//! Typed responses from raw HTTP responses.
//!
//! Every call is a single forward pass over the body. A non-2xx status
//! takes the failure path: only the `error` and `reason` properties are
//! read. On success the response category decides what is read:
//!
//! | Category       | Body handling                                              |
//! |----------------|------------------------------------------------------------|
//! | database       | not read                                                   |
//! | bulk           | fully deserialized into ordered outcome rows               |
//! | copy / replace | scanned for `id` and `rev`                                 |
//! | document       | writes scan `id`/`rev`; reads keep the body text           |
//! | entity         | writes scan `id`/`rev`; reads deserialize the entity       |
//! | view query     | scanned for totals; `rows` streamed through a [`RowStream`] |
//!
//! Reads take the id from the last segment of the request path. A missing
//! rev falls back to the entity tag.

use std::io::Read;
use std::sync::Arc;

use ottoman_codec::{Codec, CodecError, Entity};
use ottoman_stream::{
    scan_properties, scan_texts, JsonReader, RowStream, RowValue, StreamError, StreamResult, Token,
};
use ottoman_types::{
    BulkResponse, BulkRow, DocumentResponse, EntityResponse, Method, Response, ViewQueryResponse,
};
use tracing::{debug, warn};

use crate::config::MaterializerConfig;
use crate::error::{ResponseError, ResponseResult};
use crate::message::RawResponse;

const FAILURE_PROPERTIES: [&str; 2] = ["error", "reason"];
const IDENTITY_PROPERTIES: [&str; 2] = ["id", "rev"];
const VIEW_PROPERTIES: [&str; 4] = ["total_rows", "update_seq", "offset", "rows"];

/// Builds typed responses. Cheap to clone; clones share the codec.
#[derive(Clone)]
pub struct Materializer {
    codec: Arc<Codec>,
    config: MaterializerConfig,
}

impl Default for Materializer {
    fn default() -> Self {
        Self::new(Arc::new(Codec::default()), MaterializerConfig::default())
    }
}

impl Materializer {
    pub fn new(codec: Arc<Codec>, config: MaterializerConfig) -> Self {
        Self { codec, config }
    }

    pub fn codec(&self) -> &Arc<Codec> {
        &self.codec
    }

    pub fn config(&self) -> &MaterializerConfig {
        &self.config
    }

    /// Database-level response. The body is only read on failure.
    pub fn database(&self, raw: RawResponse) -> ResponseResult<Response> {
        let mut response = Response::new(raw.status, raw.request);
        if !response.is_success() {
            read_failure(&mut response, raw.body);
        }
        debug!(%response, "database response materialized");
        Ok(response)
    }

    /// Bulk write response: one outcome row per submitted document, in
    /// submission order.
    pub fn bulk(&self, raw: RawResponse) -> ResponseResult<BulkResponse> {
        let mut response = BulkResponse::new(raw.status, raw.request);
        if !response.is_success() {
            read_failure(&mut response.response, raw.body);
            return Ok(response);
        }

        response.rows = self
            .codec
            .deserialize_reader::<Vec<BulkRow>, _>(raw.body)?
            .unwrap_or_default();
        debug!(
            rows = response.rows.len(),
            failed = response.failed_rows().count(),
            "bulk response materialized"
        );
        Ok(response)
    }

    pub fn copy(&self, raw: RawResponse) -> ResponseResult<DocumentResponse> {
        self.revision_response(raw, "copy")
    }

    pub fn replace(&self, raw: RawResponse) -> ResponseResult<DocumentResponse> {
        self.revision_response(raw, "replace")
    }

    /// Raw document response. Reads keep the verbatim body in `content`.
    pub fn document(&self, raw: RawResponse) -> ResponseResult<DocumentResponse> {
        let etag = raw.etag()?;
        let mut doc = DocumentResponse::new(raw.status, raw.request);
        if !doc.is_success() {
            read_failure(&mut doc.response, raw.body);
            return Ok(doc);
        }

        if doc.content_should_have_id_and_rev() {
            scan_identity(&mut doc, raw.body)?;
        } else {
            doc.id = doc.request.last_segment();
            if self.config.keep_raw_document_body && doc.request.method == Method::GET {
                let text = self.buffer_body(raw.body)?;
                if !text.trim().is_empty() {
                    doc.content = Some(text);
                }
            }
        }
        if doc.rev.is_none() {
            doc.rev = etag;
        }

        debug!(id = ?doc.id, rev = ?doc.rev, "document response materialized");
        Ok(doc)
    }

    /// Entity response.
    ///
    /// Reads deserialize the body into `T`. Writes carry `submitted` into
    /// the response instead. Either way the entity's id/rev members are
    /// then overwritten with the response's id and rev.
    pub fn entity<T: Entity>(&self, raw: RawResponse, submitted: Option<T>) -> ResponseResult<EntityResponse<T>> {
        let etag = raw.etag()?;
        let mut response = EntityResponse::new(raw.status, raw.request);
        if !response.is_success() {
            read_failure(&mut response.document.response, raw.body);
            return Ok(response);
        }

        if response.content_should_have_id_and_rev() {
            scan_identity(&mut response.document, raw.body)?;
            response.entity = submitted;
        } else {
            response.document.id = response.request.last_segment();
            let text = self.buffer_body(raw.body)?;
            response.entity = self.codec.deserialize_entity::<T>(&text)?;
        }
        if response.document.rev.is_none() {
            response.document.rev = etag;
        }

        if let Some(entity) = response.entity.as_mut() {
            self.codec.set_entity_identity(
                entity,
                response.document.id.as_deref(),
                response.document.rev.as_deref(),
            )?;
        }

        debug!(
            entity = T::type_name(),
            id = ?response.document.id,
            rev = ?response.document.rev,
            "entity response materialized"
        );
        Ok(response)
    }

    /// View query response. The row value strategy follows from `V`.
    pub fn view_query<V: RowValue>(&self, raw: RawResponse) -> ResponseResult<ViewQueryResponse<V>> {
        let mut response = ViewQueryResponse::<V>::new(raw.status, raw.request);
        if !response.is_success() {
            read_failure(&mut response.response, raw.body);
            return Ok(response);
        }

        let codec = &*self.codec;
        let mut reader = JsonReader::new(raw.body);
        scan_properties(&mut reader, &VIEW_PROPERTIES, |name, reader| {
            match name {
                "total_rows" => response.total_rows = read_count(reader)?,
                "update_seq" => response.update_seq = read_count(reader)?,
                "offset" => response.offset = read_count(reader)?,
                _ => {
                    response.rows = RowStream::<_, V>::new(reader, codec).collect::<StreamResult<Vec<_>>>()?;
                }
            }
            Ok(())
        })?;

        debug!(
            strategy = ?V::STRATEGY,
            rows = response.rows.len(),
            total_rows = ?response.total_rows,
            "view query response materialized"
        );
        Ok(response)
    }

    fn revision_response(&self, raw: RawResponse, kind: &'static str) -> ResponseResult<DocumentResponse> {
        let etag = raw.etag()?;
        let mut doc = DocumentResponse::new(raw.status, raw.request);
        if !doc.is_success() {
            read_failure(&mut doc.response, raw.body);
            return Ok(doc);
        }

        scan_identity(&mut doc, raw.body)?;
        if doc.rev.is_none() {
            doc.rev = etag;
        }
        debug!(kind, id = ?doc.id, rev = ?doc.rev, "revision response materialized");
        Ok(doc)
    }

    fn buffer_body(&self, body: Box<dyn Read + Send>) -> ResponseResult<String> {
        let limit = self.config.max_buffered_body;
        let mut buf = Vec::new();
        body.take(limit as u64 + 1).read_to_end(&mut buf)?;
        if buf.len() > limit {
            return Err(ResponseError::BodyTooLarge { limit });
        }
        String::from_utf8(buf).map_err(|e| CodecError::Deserialization(e.to_string()).into())
    }
}

/// Fill `error` and `reason` from a failure body. A body that is not the
/// expected JSON leaves whatever was read before the fault.
fn read_failure(response: &mut Response, body: impl Read) {
    let mut reader = JsonReader::new(body);
    let scanned = scan_properties(&mut reader, &FAILURE_PROPERTIES, |name, reader| {
        let text = match reader.token() {
            Some(Token::Null) => None,
            _ => Some(ottoman_stream::capture_text(reader)?),
        };
        match name {
            "error" => response.error = text,
            _ => response.reason = text,
        }
        Ok(())
    });
    if let Err(err) = scanned {
        warn!(request = %response.request, error = %err, "unreadable failure body");
    }
    debug!(%response, "request failed");
}

fn scan_identity(doc: &mut DocumentResponse, body: impl Read) -> ResponseResult<()> {
    let mut reader = JsonReader::new(body);
    let mut found = scan_texts(&mut reader, &IDENTITY_PROPERTIES)?.into_iter();
    doc.id = found.next().flatten();
    doc.rev = found.next().flatten();
    Ok(())
}

/// A non-negative count. `null` is "not provided". A string takes its
/// numeric prefix, so an opaque `"42-g1AAAA"` sequence reads as 42; a
/// string without one is "not provided".
fn read_count<R: Read>(reader: &mut JsonReader<R>) -> StreamResult<Option<u64>> {
    match reader.token() {
        Some(Token::Null) => Ok(None),
        Some(Token::Number(text)) => text
            .parse()
            .map(Some)
            .map_err(|_| StreamError::InvalidNumber { text: text.clone() }),
        Some(Token::String(text)) => {
            let digits = text.bytes().take_while(u8::is_ascii_digit).count();
            Ok(text[..digits].parse().ok())
        }
        Some(other) => Err(StreamError::ShapeMismatch {
            expected: "count",
            found: other.kind().into(),
        }),
        None => Err(StreamError::UnexpectedEof { context: "count" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::ETAG;
    use ottoman_codec::Member;
    use ottoman_stream::Doc;
    use ottoman_types::{RequestInfo, Row, StatusCode};
    use serde::{Deserialize, Serialize};

    fn raw(status: u16, method: &str, path: &str, body: &'static str) -> RawResponse {
        RawResponse::with_body(
            StatusCode::from_u16(status).unwrap(),
            RequestInfo::parse(method, path).unwrap(),
            body,
        )
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Artist {
        artist_id: Option<String>,
        artist_rev: Option<String>,
        name: String,
    }

    impl Entity for Artist {
        const MEMBERS: &'static [Member] = &[
            Member::field("artist_id"),
            Member::field("artist_rev"),
            Member::field("name"),
        ];
    }

    #[test]
    fn failure_reads_error_and_reason() {
        let m = Materializer::default();
        let doc = m
            .document(raw(404, "GET", "/db/missing", r#"{"error":"not_found","reason":"missing"}"#))
            .unwrap();
        assert!(!doc.is_success());
        assert_eq!(doc.error.as_deref(), Some("not_found"));
        assert_eq!(doc.reason.as_deref(), Some("missing"));
        assert_eq!(doc.id, None);
        assert_eq!(doc.rev, None);
        assert_eq!(doc.content, None);
    }

    #[test]
    fn failure_ignores_trailing_garbage() {
        let m = Materializer::default();
        let r = m
            .database(raw(412, "PUT", "/db", r#"{"error":"file_exists","reason":"exists"} trailing <html>"#))
            .unwrap();
        assert_eq!(r.error.as_deref(), Some("file_exists"));
        assert_eq!(r.to_string(), "PUT /db -> 412 file_exists: exists");
    }

    #[test]
    fn failure_with_non_json_body_is_not_an_error() {
        let m = Materializer::default();
        let r = m.database(raw(502, "GET", "/db", "<html>Bad Gateway</html>")).unwrap();
        assert_eq!(r.status_code(), 502);
        assert_eq!(r.error, None);
    }

    #[test]
    fn database_success_does_not_read_body() {
        let m = Materializer::default();
        let r = m.database(raw(201, "PUT", "/db", "not json at all")).unwrap();
        assert!(r.is_success());
        assert_eq!(r.error, None);
    }

    #[test]
    fn write_takes_id_from_body_and_rev_from_etag() {
        let m = Materializer::default();
        let input = raw(201, "PUT", "/db/artist:1", r#"{"ok":true,"id":"artist:1"}"#)
            .header(ETAG, "\"2-abc\"")
            .unwrap();
        let doc = m.document(input).unwrap();
        assert_eq!(doc.id.as_deref(), Some("artist:1"));
        assert_eq!(doc.rev.as_deref(), Some("2-abc"));
        assert_eq!(doc.content, None);
    }

    #[test]
    fn write_body_rev_wins_over_etag() {
        let m = Materializer::default();
        let input = raw(201, "POST", "/db", r#"{"ok":true,"id":"a","rev":"1-body"}"#)
            .header(ETAG, "\"1-etag\"")
            .unwrap();
        assert_eq!(m.document(input).unwrap().rev.as_deref(), Some("1-body"));
    }

    #[test]
    fn read_keeps_body_and_recovers_identity() {
        let m = Materializer::default();
        let body = r#"{"_id":"artist:1","_rev":"2-abc","name":"Fake Band"}"#;
        let input = raw(200, "GET", "/db/artist%3A1", body).header(ETAG, "\"2-abc\"").unwrap();
        let doc = m.document(input).unwrap();
        assert_eq!(doc.id.as_deref(), Some("artist:1"));
        assert_eq!(doc.rev.as_deref(), Some("2-abc"));
        assert_eq!(doc.content.as_deref(), Some(body));
    }

    #[test]
    fn head_read_has_no_content() {
        let m = Materializer::default();
        let input = raw(200, "HEAD", "/db/a", "").header(ETAG, "\"3-x\"").unwrap();
        let doc = m.document(input).unwrap();
        assert_eq!(doc.id.as_deref(), Some("a"));
        assert_eq!(doc.rev.as_deref(), Some("3-x"));
        assert_eq!(doc.content, None);
    }

    #[test]
    fn raw_body_can_be_dropped_by_config() {
        let config = MaterializerConfig {
            keep_raw_document_body: false,
            ..MaterializerConfig::default()
        };
        let m = Materializer::new(Arc::new(Codec::default()), config);
        let doc = m.document(raw(200, "GET", "/db/a", r#"{"_id":"a"}"#)).unwrap();
        assert_eq!(doc.content, None);
        assert_eq!(doc.id.as_deref(), Some("a"));
    }

    #[test]
    fn oversized_body_rejected() {
        let config = MaterializerConfig {
            max_buffered_body: 8,
            ..MaterializerConfig::default()
        };
        let m = Materializer::new(Arc::new(Codec::default()), config);
        let err = m.document(raw(200, "GET", "/db/a", r#"{"_id":"a","x":1}"#)).unwrap_err();
        assert!(matches!(err, ResponseError::BodyTooLarge { limit: 8 }));
    }

    #[test]
    fn copy_and_replace_scan_identity() {
        let m = Materializer::default();
        let copy = m
            .copy(raw(201, "COPY", "/db/a", r#"{"id":"b","rev":"1-new"} ignored"#))
            .unwrap();
        assert_eq!((copy.id.as_deref(), copy.rev.as_deref()), (Some("b"), Some("1-new")));

        let replace = m
            .replace(raw(201, "COPY", "/db/a", r#"{"id":"b"}"#).header(ETAG, "\"4-r\"").unwrap())
            .unwrap();
        assert_eq!(replace.rev.as_deref(), Some("4-r"));
    }

    #[test]
    fn entity_read_deserializes_and_syncs_identity() {
        let m = Materializer::default();
        let body = r#"{"$doctype":"artist","_id":"artist:1","_rev":"1-old","name":"Fake Band"}"#;
        let input = raw(200, "GET", "/db/artist:1", body).header(ETAG, "\"2-abc\"").unwrap();
        let response = m.entity::<Artist>(input, None).unwrap();
        assert_eq!(response.rev.as_deref(), Some("2-abc"));
        let artist = response.into_entity().unwrap();
        assert_eq!(artist.artist_id.as_deref(), Some("artist:1"));
        assert_eq!(artist.artist_rev.as_deref(), Some("2-abc"));
        assert_eq!(artist.name, "Fake Band");
    }

    #[test]
    fn entity_write_syncs_submitted_entity() {
        let m = Materializer::default();
        let submitted = Artist {
            artist_id: None,
            artist_rev: None,
            name: "New".into(),
        };
        let input = raw(201, "POST", "/db", r#"{"ok":true,"id":"artist:9","rev":"1-z"}"#);
        let response = m.entity(input, Some(submitted)).unwrap();
        let artist = response.entity.as_ref().unwrap();
        assert_eq!(artist.artist_id.as_deref(), Some("artist:9"));
        assert_eq!(artist.artist_rev.as_deref(), Some("1-z"));
    }

    #[test]
    fn entity_failure_has_no_entity() {
        let m = Materializer::default();
        let response = m
            .entity::<Artist>(raw(404, "GET", "/db/x", r#"{"error":"not_found","reason":"deleted"}"#), None)
            .unwrap();
        assert!(response.entity.is_none());
        assert_eq!(response.reason.as_deref(), Some("deleted"));
    }

    #[test]
    fn malformed_entity_body_is_an_error() {
        let m = Materializer::default();
        let err = m.entity::<Artist>(raw(200, "GET", "/db/x", r#"{"name": 5}"#), None).unwrap_err();
        assert!(matches!(err, ResponseError::Codec(_)));
    }

    #[test]
    fn bulk_rows_keep_submission_order() {
        let m = Materializer::default();
        let body = r#"[
            {"id":"a","rev":"1-a"},
            {"id":"b","error":"conflict","reason":"Document update conflict."},
            {"id":"c","rev":"1-c"}
        ]"#;
        let response = m.bulk(raw(201, "POST", "/db/_bulk_docs", body)).unwrap();
        let ids: Vec<_> = response.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(response.failed_rows().count(), 1);
        assert_eq!(response.rows[1].error.as_deref(), Some("conflict"));
    }

    #[test]
    fn view_query_with_array_values() {
        let m = Materializer::default();
        let body = r#"{"total_rows":3,"offset":0,"rows":[{"id":"a","key":"k1","value":["x","y"]}]}"#;
        let response = m
            .view_query::<Vec<String>>(raw(200, "GET", "/db/_design/d/_view/v", body))
            .unwrap();
        assert_eq!(response.total_rows, Some(3));
        assert_eq!(response.offset, Some(0));
        assert_eq!(response.update_seq, None);
        assert_eq!(
            response.rows,
            vec![Row { id: "a".into(), key: "k1".into(), value: vec!["x".into(), "y".into()] }]
        );
    }

    #[test]
    fn view_query_update_seq_forms() {
        let m = Materializer::default();
        let numeric = m
            .view_query::<String>(raw(200, "GET", "/db/_design/d/_view/v", r#"{"update_seq":12,"rows":[]}"#))
            .unwrap();
        assert_eq!(numeric.update_seq, Some(12));

        let opaque = m
            .view_query::<String>(raw(200, "GET", "/db/_design/d/_view/v", r#"{"update_seq":"42-g1AAAA","rows":[]}"#))
            .unwrap();
        assert_eq!(opaque.update_seq, Some(42));

        let token = m
            .view_query::<String>(raw(200, "GET", "/db/_design/d/_view/v", r#"{"update_seq":"g1AAAA","rows":[]}"#))
            .unwrap();
        assert_eq!(token.update_seq, None);
    }

    #[test]
    fn view_query_totals_after_rows() {
        let m = Materializer::default();
        let body = r#"{"rows":[{"id":"a","key":1,"value":2}],"total_rows":1,"offset":null}"#;
        let response = m.view_query::<String>(raw(200, "GET", "/db/_all_docs", body)).unwrap();
        assert_eq!(response.row_count(), 1);
        assert_eq!(response.total_rows, Some(1));
        assert_eq!(response.offset, None);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Summary {
        name: String,
        album_count: u32,
    }

    #[test]
    fn view_query_object_values() {
        let m = Materializer::default();
        let body = r#"{"rows":[
            {"id":"artist:1","key":"a","value":{"name":"One","albumCount":2}},
            {"id":"artist:2","key":"b","value":{"name":"Two","albumCount":0}}
        ]}"#;
        let response = m.view_query::<Doc<Summary>>(raw(200, "POST", "/db/_design/d/_view/v", body)).unwrap();
        let names: Vec<_> = response.values().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["One", "Two"]);
        assert_eq!(response.rows[0].value.album_count, 2);
    }

    #[test]
    fn view_query_truncated_rows_is_an_error() {
        let m = Materializer::default();
        let err = m
            .view_query::<String>(raw(200, "GET", "/db/_all_docs", r#"{"rows":[{"id":"a","key":"k""#))
            .unwrap_err();
        assert!(matches!(err, ResponseError::Stream(StreamError::UnexpectedEof { .. })));
    }

    #[test]
    fn view_query_negative_total_is_invalid() {
        let m = Materializer::default();
        let err = m
            .view_query::<String>(raw(200, "GET", "/db/_all_docs", r#"{"total_rows":-1}"#))
            .unwrap_err();
        assert!(matches!(err, ResponseError::Stream(StreamError::InvalidNumber { .. })));
    }

    #[test]
    fn view_query_failure() {
        let m = Materializer::default();
        let response = m
            .view_query::<String>(raw(404, "GET", "/db/_design/d/_view/v", r#"{"error":"not_found","reason":"missing_named_view"}"#))
            .unwrap();
        assert!(response.rows.is_empty());
        assert_eq!(response.total_rows, None);
        assert_eq!(response.reason.as_deref(), Some("missing_named_view"));
    }
}
