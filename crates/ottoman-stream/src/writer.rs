use std::io::Read;

use serde_json::Value;

use crate::error::{StreamError, StreamResult};
use crate::reader::{JsonReader, Token};

/// Re-emits tokens as compact JSON text.
pub struct TokenWriter<'a> {
    out: &'a mut String,
    needs_comma: Vec<bool>,
    after_name: bool,
}

impl<'a> TokenWriter<'a> {
    pub fn new(out: &'a mut String) -> Self {
        Self {
            out,
            needs_comma: Vec::new(),
            after_name: false,
        }
    }

    pub fn write(&mut self, token: &Token) {
        match token {
            Token::StartObject => {
                self.separator();
                self.out.push('{');
                self.needs_comma.push(false);
            }
            Token::StartArray => {
                self.separator();
                self.out.push('[');
                self.needs_comma.push(false);
            }
            Token::EndObject => {
                self.needs_comma.pop();
                self.out.push('}');
            }
            Token::EndArray => {
                self.needs_comma.pop();
                self.out.push(']');
            }
            Token::PropertyName(name) => {
                self.separator();
                self.out.push_str(&Value::from(name.as_str()).to_string());
                self.out.push(':');
                self.after_name = true;
            }
            Token::String(s) => {
                self.separator();
                self.out.push_str(&Value::from(s.as_str()).to_string());
            }
            Token::Number(n) => {
                self.separator();
                self.out.push_str(n);
            }
            Token::Bool(b) => {
                self.separator();
                self.out.push_str(if *b { "true" } else { "false" });
            }
            Token::Null => {
                self.separator();
                self.out.push_str("null");
            }
        }
    }

    fn separator(&mut self) {
        if self.after_name {
            self.after_name = false;
            return;
        }
        if let Some(top) = self.needs_comma.last_mut() {
            if *top {
                self.out.push(',');
            }
            *top = true;
        }
    }
}

/// Re-emit the current value, including all of its children when it opens
/// an object or array. Leaves the reader on the value's last token.
pub fn write_current<R: Read>(reader: &mut JsonReader<R>, writer: &mut TokenWriter<'_>) -> StreamResult<()> {
    let token = current_value(reader)?;
    writer.write(token);
    if !token.is_start() {
        return Ok(());
    }

    let start_depth = reader.depth();
    loop {
        let token = reader.read_required("value")?;
        writer.write(token);
        let is_end = token.is_end();
        if is_end && reader.depth() == start_depth {
            return Ok(());
        }
    }
}

/// Compact JSON text of the current value.
pub fn capture_json<R: Read>(reader: &mut JsonReader<R>) -> StreamResult<String> {
    let mut out = String::new();
    write_current(reader, &mut TokenWriter::new(&mut out))?;
    Ok(out)
}

/// Textual form of the current value: a string's content, the literal text
/// of any other scalar, or compact JSON for an object or array.
pub fn capture_text<R: Read>(reader: &mut JsonReader<R>) -> StreamResult<String> {
    let token = current_value(reader)?;
    let text = match token {
        Token::String(s) => s.clone(),
        Token::Number(n) => n.clone(),
        Token::Bool(b) => b.to_string(),
        Token::Null => "null".to_string(),
        _ => return capture_json(reader),
    };
    Ok(text)
}

fn current_value<R: Read>(reader: &JsonReader<R>) -> StreamResult<&Token> {
    match reader.token() {
        Some(token) if token.is_scalar() || token.is_start() => Ok(token),
        Some(token) => Err(StreamError::ShapeMismatch {
            expected: "value",
            found: token.kind().into(),
        }),
        None => Err(StreamError::UnexpectedEof { context: "value" }),
    }
}
