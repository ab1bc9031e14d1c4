use std::io::{BufRead, BufReader, Read};

use crate::error::{StreamError, StreamResult};

/// A JSON token.
///
/// Numbers keep their literal text so nothing is lost to float conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    PropertyName(String),
    String(String),
    Number(String),
    Bool(bool),
    Null,
}

impl Token {
    pub fn is_start(&self) -> bool {
        matches!(self, Self::StartObject | Self::StartArray)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::EndObject | Self::EndArray)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::String(_) | Self::Number(_) | Self::Bool(_) | Self::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartObject => "start of object",
            Self::EndObject => "end of object",
            Self::StartArray => "start of array",
            Self::EndArray => "end of array",
            Self::PropertyName(_) => "property name",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "boolean",
            Self::Null => "null",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Frame {
    Object,
    Array,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Just opened: first member/element or the closing bracket.
    Open,
    /// After a comma: another member/element must follow.
    Comma,
    /// Object only: a property name was read, its value follows.
    Member,
    /// After a value: a comma or the closing bracket.
    Done,
}

/// Forward-only JSON token cursor over a byte stream.
///
/// Exposes the current token, `read` to advance, and the current nesting
/// depth. Depth follows the path of the token: in `{"rows":[{"id":1}]}`
/// the outer object opens at depth 0, `rows` and its array are at depth 1,
/// each row object at depth 2 and the row's members at depth 3. An end token
/// has the same depth as its start token.
///
/// The cursor never reads past the end of the root value, so trailing
/// content after it is left untouched.
pub struct JsonReader<R> {
    input: BufReader<R>,
    offset: u64,
    frames: Vec<(Frame, Phase)>,
    token: Option<Token>,
    depth: usize,
    root_started: bool,
}

impl<R: Read> JsonReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input: BufReader::new(input),
            offset: 0,
            frames: Vec::new(),
            token: None,
            depth: 0,
            root_started: false,
        }
    }

    /// The current token, `None` before the first read and after the end.
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Advance to the next token. Returns `false` once the root value is
    /// complete, or when the input holds nothing but whitespace.
    pub fn read(&mut self) -> StreamResult<bool> {
        self.token = self.next_token()?;
        Ok(self.token.is_some())
    }

    /// Advance, treating the end of the document as an error.
    pub fn read_required(&mut self, context: &'static str) -> StreamResult<&Token> {
        if !self.read()? {
            return Err(StreamError::UnexpectedEof { context });
        }
        self.token
            .as_ref()
            .ok_or(StreamError::UnexpectedEof { context })
    }

    /// If the current token opens an object or array, advance to its
    /// matching end token. Otherwise do nothing.
    pub fn skip(&mut self) -> StreamResult<()> {
        if !self.token.as_ref().is_some_and(Token::is_start) {
            return Ok(());
        }
        let start_depth = self.depth;
        loop {
            let is_end = self.read_required("skipped value")?.is_end();
            if is_end && self.depth == start_depth {
                return Ok(());
            }
        }
    }

    fn next_token(&mut self) -> StreamResult<Option<Token>> {
        loop {
            let Some(&(frame, phase)) = self.frames.last() else {
                if self.root_started {
                    return Ok(None);
                }
                let Some(byte) = self.peek_non_ws()? else {
                    return Ok(None);
                };
                self.root_started = true;
                return self.begin_value(byte).map(Some);
            };

            let context = match frame {
                Frame::Object => "object",
                Frame::Array => "array",
            };
            let byte = self
                .peek_non_ws()?
                .ok_or(StreamError::UnexpectedEof { context })?;

            let token = match (frame, phase) {
                (Frame::Object, Phase::Open) if byte == b'}' => self.close(),
                (Frame::Array, Phase::Open) if byte == b']' => self.close(),
                (Frame::Object, Phase::Open | Phase::Comma) => self.property_name(byte)?,
                (Frame::Object, Phase::Member) | (Frame::Array, Phase::Open | Phase::Comma) => {
                    self.set_phase(Phase::Done);
                    self.begin_value(byte)?
                }
                (_, Phase::Done) => match (frame, byte) {
                    (_, b',') => {
                        self.bump();
                        self.set_phase(Phase::Comma);
                        continue;
                    }
                    (Frame::Object, b'}') | (Frame::Array, b']') => self.close(),
                    _ => return Err(self.unexpected(byte)),
                },
                (Frame::Array, Phase::Member) => return Err(self.unexpected(byte)),
            };
            return Ok(Some(token));
        }
    }

    fn begin_value(&mut self, byte: u8) -> StreamResult<Token> {
        self.depth = self.frames.len();
        let token = match byte {
            b'{' => {
                self.bump();
                self.frames.push((Frame::Object, Phase::Open));
                Token::StartObject
            }
            b'[' => {
                self.bump();
                self.frames.push((Frame::Array, Phase::Open));
                Token::StartArray
            }
            b'"' => {
                self.bump();
                Token::String(self.read_string()?)
            }
            b't' => {
                self.expect_literal(b"true")?;
                Token::Bool(true)
            }
            b'f' => {
                self.expect_literal(b"false")?;
                Token::Bool(false)
            }
            b'n' => {
                self.expect_literal(b"null")?;
                Token::Null
            }
            b'-' | b'0'..=b'9' => Token::Number(self.read_number()?),
            other => return Err(self.unexpected(other)),
        };
        Ok(token)
    }

    fn property_name(&mut self, byte: u8) -> StreamResult<Token> {
        if byte != b'"' {
            return Err(self.unexpected(byte));
        }
        self.bump();
        let name = self.read_string()?;
        match self.peek_non_ws()? {
            Some(b':') => self.bump(),
            Some(other) => return Err(self.unexpected(other)),
            None => return Err(StreamError::UnexpectedEof { context: "object" }),
        }
        self.set_phase(Phase::Member);
        self.depth = self.frames.len();
        Ok(Token::PropertyName(name))
    }

    fn close(&mut self) -> Token {
        self.bump();
        let (frame, _) = self.frames.pop().unwrap_or((Frame::Array, Phase::Done));
        self.depth = self.frames.len();
        match frame {
            Frame::Object => Token::EndObject,
            Frame::Array => Token::EndArray,
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if let Some(top) = self.frames.last_mut() {
            top.1 = phase;
        }
    }

    fn read_string(&mut self) -> StreamResult<String> {
        let mut bytes = Vec::new();
        loop {
            match self.next_byte("string")? {
                b'"' => break,
                b'\\' => {
                    let escaped = match self.next_byte("string")? {
                        b'"' => '"',
                        b'\\' => '\\',
                        b'/' => '/',
                        b'b' => '\u{08}',
                        b'f' => '\u{0c}',
                        b'n' => '\n',
                        b'r' => '\r',
                        b't' => '\t',
                        b'u' => self.read_unicode_escape()?,
                        _ => return Err(StreamError::InvalidEscape { offset: self.offset }),
                    };
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(escaped.encode_utf8(&mut buf).as_bytes());
                }
                byte @ 0x00..=0x1f => {
                    return Err(StreamError::UnexpectedByte { byte, offset: self.offset - 1 });
                }
                byte => bytes.push(byte),
            }
        }
        String::from_utf8(bytes).map_err(|_| StreamError::InvalidUtf8 { offset: self.offset })
    }

    fn read_unicode_escape(&mut self) -> StreamResult<char> {
        let high = self.read_hex4()?;
        let code = match high {
            0xD800..=0xDBFF => {
                if self.next_byte("string")? != b'\\' || self.next_byte("string")? != b'u' {
                    return Err(StreamError::InvalidEscape { offset: self.offset });
                }
                let low = self.read_hex4()?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(StreamError::InvalidEscape { offset: self.offset });
                }
                0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
            }
            0xDC00..=0xDFFF => return Err(StreamError::InvalidEscape { offset: self.offset }),
            other => other,
        };
        char::from_u32(code).ok_or(StreamError::InvalidEscape { offset: self.offset })
    }

    fn read_hex4(&mut self) -> StreamResult<u32> {
        let mut code = 0u32;
        for _ in 0..4 {
            let byte = self.next_byte("string")?;
            let digit = (byte as char)
                .to_digit(16)
                .ok_or(StreamError::InvalidEscape { offset: self.offset })?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn read_number(&mut self) -> StreamResult<String> {
        let mut text = String::new();
        while let Some(byte) = self.peek()? {
            if !matches!(byte, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') {
                break;
            }
            text.push(byte as char);
            self.bump();
        }
        if serde_json::from_str::<serde_json::Number>(&text).is_err() {
            return Err(StreamError::InvalidNumber { text });
        }
        Ok(text)
    }

    fn expect_literal(&mut self, literal: &'static [u8]) -> StreamResult<()> {
        for &expected in literal {
            let byte = self.next_byte("literal")?;
            if byte != expected {
                return Err(StreamError::UnexpectedByte { byte, offset: self.offset - 1 });
            }
        }
        Ok(())
    }

    fn peek(&mut self) -> StreamResult<Option<u8>> {
        let buf = self.input.fill_buf()?;
        Ok(buf.first().copied())
    }

    fn peek_non_ws(&mut self) -> StreamResult<Option<u8>> {
        loop {
            match self.peek()? {
                Some(b' ' | b'\t' | b'\n' | b'\r') => self.bump(),
                other => return Ok(other),
            }
        }
    }

    fn bump(&mut self) {
        self.input.consume(1);
        self.offset += 1;
    }

    fn next_byte(&mut self, context: &'static str) -> StreamResult<u8> {
        match self.peek()? {
            Some(byte) => {
                self.bump();
                Ok(byte)
            }
            None => Err(StreamError::UnexpectedEof { context }),
        }
    }

    fn unexpected(&self, byte: u8) -> StreamError {
        StreamError::UnexpectedByte { byte, offset: self.offset }
    }
}
