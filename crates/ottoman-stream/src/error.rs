use ottoman_codec::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of input in {context}")]
    UnexpectedEof { context: &'static str },

    #[error("unexpected byte {byte:#04x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: u64 },

    #[error("invalid escape sequence at offset {offset}")]
    InvalidEscape { offset: u64 },

    #[error("invalid UTF-8 in string ending at offset {offset}")]
    InvalidUtf8 { offset: u64 },

    #[error("invalid number: {text}")]
    InvalidNumber { text: String },

    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: &'static str, found: String },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

pub type StreamResult<T> = Result<T, StreamError>;
