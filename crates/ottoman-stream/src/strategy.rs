use std::io::Read;
use std::ops::Deref;

use ottoman_codec::{Codec, CodecError};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{StreamError, StreamResult};
use crate::reader::{JsonReader, Token};
use crate::writer::{capture_json, capture_text};

/// How a row's `value` is read off the token stream.
///
/// The set is closed: a value is a single scalar, an array of scalars, or a
/// structure handed whole to the codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueStrategy {
    Scalar,
    ScalarArray,
    Object,
}

/// A value captured by a [`ValueStrategy`], before conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Captured {
    Text(String),
    Texts(Vec<String>),
    Json(String),
}

impl ValueStrategy {
    /// Capture the value the reader is positioned on. Leaves the reader on
    /// the value's last token.
    pub fn capture<R: Read>(self, reader: &mut JsonReader<R>) -> StreamResult<Captured> {
        match self {
            Self::Scalar => capture_text(reader).map(Captured::Text),
            Self::ScalarArray => capture_texts(reader).map(Captured::Texts),
            Self::Object => capture_json(reader).map(Captured::Json),
        }
    }
}

/// A null is an empty list and any other non-array value a list of one.
fn capture_texts<R: Read>(reader: &mut JsonReader<R>) -> StreamResult<Vec<String>> {
    match reader.token() {
        Some(Token::StartArray) => {}
        Some(Token::Null) => return Ok(Vec::new()),
        _ => return Ok(vec![capture_text(reader)?]),
    }

    let start_depth = reader.depth();
    let mut texts = Vec::new();
    loop {
        let is_end = reader.read_required("array value")?.is_end();
        if is_end && reader.depth() == start_depth {
            return Ok(texts);
        }
        texts.push(capture_text(reader)?);
    }
}

/// A type that can be the `value` of a view row.
pub trait RowValue: Sized {
    const STRATEGY: ValueStrategy;

    fn from_captured(captured: Captured, codec: &Codec) -> StreamResult<Self>;
}

impl RowValue for String {
    const STRATEGY: ValueStrategy = ValueStrategy::Scalar;

    fn from_captured(captured: Captured, _codec: &Codec) -> StreamResult<Self> {
        match captured {
            Captured::Text(text) | Captured::Json(text) => Ok(text),
            Captured::Texts(_) => Err(mismatch("text", "text list")),
        }
    }
}

impl RowValue for Vec<String> {
    const STRATEGY: ValueStrategy = ValueStrategy::ScalarArray;

    fn from_captured(captured: Captured, _codec: &Codec) -> StreamResult<Self> {
        match captured {
            Captured::Texts(texts) => Ok(texts),
            Captured::Text(text) => Ok(vec![text]),
            Captured::Json(_) => Err(mismatch("text list", "structure")),
        }
    }
}

impl RowValue for Value {
    const STRATEGY: ValueStrategy = ValueStrategy::Object;

    fn from_captured(captured: Captured, _codec: &Codec) -> StreamResult<Self> {
        match captured {
            Captured::Json(json) => serde_json::from_str(&json)
                .map_err(|e| StreamError::Codec(CodecError::Deserialization(e.to_string()))),
            Captured::Text(text) => Ok(Value::String(text)),
            Captured::Texts(texts) => Ok(Value::from(texts)),
        }
    }
}

/// A row value deserialized by the codec, with its naming policy applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Doc<T>(pub T);

impl<T> Doc<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Doc<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: DeserializeOwned> RowValue for Doc<T> {
    const STRATEGY: ValueStrategy = ValueStrategy::Object;

    fn from_captured(captured: Captured, codec: &Codec) -> StreamResult<Self> {
        let Captured::Json(json) = captured else {
            return Err(mismatch("structure", "text"));
        };
        codec
            .deserialize::<T>(&json)?
            .map(Doc)
            .ok_or_else(|| mismatch("structure", "empty value"))
    }
}

fn mismatch(expected: &'static str, found: &str) -> StreamError {
    StreamError::ShapeMismatch {
        expected,
        found: found.to_string(),
    }
}
