//! Async entry points.
//!
//! Each wrapper runs the same synchronous materialization on tokio's
//! blocking pool, since the body is a blocking reader.

use ottoman_codec::Entity;
use ottoman_stream::RowValue;
use ottoman_types::{BulkResponse, DocumentResponse, EntityResponse, Response, ViewQueryResponse};

use crate::error::{ResponseError, ResponseResult};
use crate::materializer::Materializer;
use crate::message::RawResponse;

impl Materializer {
    pub async fn database_async(&self, raw: RawResponse) -> ResponseResult<Response> {
        self.run_blocking(move |m| m.database(raw)).await
    }

    pub async fn bulk_async(&self, raw: RawResponse) -> ResponseResult<BulkResponse> {
        self.run_blocking(move |m| m.bulk(raw)).await
    }

    pub async fn copy_async(&self, raw: RawResponse) -> ResponseResult<DocumentResponse> {
        self.run_blocking(move |m| m.copy(raw)).await
    }

    pub async fn replace_async(&self, raw: RawResponse) -> ResponseResult<DocumentResponse> {
        self.run_blocking(move |m| m.replace(raw)).await
    }

    pub async fn document_async(&self, raw: RawResponse) -> ResponseResult<DocumentResponse> {
        self.run_blocking(move |m| m.document(raw)).await
    }

    pub async fn entity_async<T>(&self, raw: RawResponse, submitted: Option<T>) -> ResponseResult<EntityResponse<T>>
    where
        T: Entity + Send,
    {
        self.run_blocking(move |m| m.entity(raw, submitted)).await
    }

    pub async fn view_query_async<V>(&self, raw: RawResponse) -> ResponseResult<ViewQueryResponse<V>>
    where
        V: RowValue + Send + 'static,
    {
        self.run_blocking(move |m| m.view_query(raw)).await
    }

    async fn run_blocking<T, F>(&self, work: F) -> ResponseResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Materializer) -> ResponseResult<T> + Send + 'static,
    {
        let materializer = self.clone();
        tokio::task::spawn_blocking(move || work(&materializer))
            .await
            .map_err(|e| ResponseError::Join(e.to_string()))?
    }
}
