use ottoman_codec::CodecError;
use ottoman_stream::StreamError;
use thiserror::Error;

/// Failure to materialize a response.
///
/// A non-2xx status is never one of these: it is reported on the response
/// object itself.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("invalid materializer config: {0}")]
    Config(String),

    #[error("materializer task failed: {0}")]
    Join(String),
}

pub type ResponseResult<T> = Result<T, ResponseError>;
