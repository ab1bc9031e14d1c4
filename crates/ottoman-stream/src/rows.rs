//! Lazy view rows.
//!
//! [`RowStream`] yields the rows of a view result's `rows` array one at a
//! time, straight off the token stream. It is single-pass: once consumed,
//! the underlying reader has moved on and the rows cannot be replayed.

use std::io::Read;
use std::marker::PhantomData;

use ottoman_codec::Codec;
use ottoman_types::Row;
use tracing::{debug, trace};

use crate::error::StreamResult;
use crate::reader::{JsonReader, Token};
use crate::strategy::RowValue;
use crate::writer::capture_text;

struct Pending<V> {
    id: Option<String>,
    key: Option<String>,
    value: Option<V>,
}

impl<V> Pending<V> {
    fn take_row(&mut self) -> Option<Row<V>> {
        if self.id.is_none() || self.key.is_none() || self.value.is_none() {
            return None;
        }
        Some(Row {
            id: self.id.take()?,
            key: self.key.take()?,
            value: self.value.take()?,
        })
    }

    fn clear(&mut self) {
        self.id = None;
        self.key = None;
        self.value = None;
    }
}

/// Iterator over the rows of a view result.
///
/// Create it with the reader positioned on the start of the `rows` array.
/// Row member names are matched case-insensitively and only directly inside
/// a row object. A row is yielded once its `id`, `key` and `value` have all
/// been read; members of a row that never completes are discarded at the
/// row's end.
pub struct RowStream<'a, R, V> {
    reader: &'a mut JsonReader<R>,
    codec: &'a Codec,
    start_depth: usize,
    pending: Pending<V>,
    done: bool,
    _value: PhantomData<fn() -> V>,
}

impl<'a, R: Read, V: RowValue> RowStream<'a, R, V> {
    pub fn new(reader: &'a mut JsonReader<R>, codec: &'a Codec) -> Self {
        let done = reader.token() != Some(&Token::StartArray);
        if done {
            debug!(token = ?reader.token(), "rows value is not an array, yielding no rows");
        }
        let start_depth = reader.depth();
        Self {
            reader,
            codec,
            start_depth,
            pending: Pending {
                id: None,
                key: None,
                value: None,
            },
            done,
            _value: PhantomData,
        }
    }

    fn row_depth(&self) -> usize {
        self.start_depth + 1
    }

    fn next_row(&mut self) -> StreamResult<Option<Row<V>>> {
        loop {
            self.reader.read_required("rows")?;
            let depth = self.reader.depth();
            let row_depth = self.row_depth();

            let member = match self.reader.token() {
                Some(Token::EndArray) if depth == self.start_depth => return Ok(None),
                Some(Token::EndObject) if depth == row_depth => {
                    self.pending.clear();
                    continue;
                }
                Some(Token::PropertyName(name)) if depth == row_depth + 1 => name.to_ascii_lowercase(),
                _ => continue,
            };

            match member.as_str() {
                "id" => {
                    self.reader.read_required("row id")?;
                    self.pending.id = Some(capture_text(self.reader)?);
                }
                "key" => {
                    self.reader.read_required("row key")?;
                    self.pending.key = Some(capture_text(self.reader)?);
                }
                "value" => {
                    self.reader.read_required("row value")?;
                    let captured = V::STRATEGY.capture(self.reader)?;
                    self.pending.value = Some(V::from_captured(captured, self.codec)?);
                }
                _ => {
                    self.reader.read_required("row member")?;
                    self.reader.skip()?;
                    continue;
                }
            }

            if let Some(row) = self.pending.take_row() {
                trace!(id = %row.id, "row complete");
                return Ok(Some(row));
            }
        }
    }
}

impl<R: Read, V: RowValue> Iterator for RowStream<'_, R, V> {
    type Item = StreamResult<Row<V>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use crate::strategy::Doc;
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::{json, Value};

    /// Reader positioned on the value of the top-level `rows` property.
    fn at_rows(json: &str) -> JsonReader<&[u8]> {
        let mut reader = JsonReader::new(json.as_bytes());
        while reader.read().unwrap() {
            if reader.depth() == 1 && reader.token() == Some(&Token::PropertyName("rows".into())) {
                reader.read().unwrap();
                return reader;
            }
        }
        panic!("no rows property");
    }

    fn collect<V: RowValue>(json: &str) -> Vec<Row<V>> {
        let codec = Codec::default();
        let mut reader = at_rows(json);
        RowStream::<_, V>::new(&mut reader, &codec)
            .collect::<StreamResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn scalar_rows_in_order() {
        let rows: Vec<Row<String>> = collect(
            r#"{"total_rows":2,"rows":[{"id":"a","key":"k1","value":"v1"},{"id":"b","key":2,"value":3}]}"#,
        );
        assert_eq!(
            rows,
            vec![
                Row { id: "a".into(), key: "k1".into(), value: "v1".into() },
                Row { id: "b".into(), key: "2".into(), value: "3".into() },
            ]
        );
    }

    #[test]
    fn array_strategy_rows() {
        let rows: Vec<Row<Vec<String>>> =
            collect(r#"{"rows":[{"id":"1","key":"a","value":["x","y"]}]}"#);
        assert_eq!(rows[0].value, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn member_order_does_not_matter() {
        let rows: Vec<Row<String>> = collect(r#"{"rows":[{"value":"v","key":"k","id":"i"}]}"#);
        assert_eq!(rows[0], Row { id: "i".into(), key: "k".into(), value: "v".into() });
    }

    #[test]
    fn names_match_case_insensitively() {
        let rows: Vec<Row<String>> = collect(r#"{"rows":[{"ID":"i","Key":"k","VALUE":"v"}]}"#);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "i");
    }

    #[test]
    fn complex_keys_are_json_text() {
        let rows: Vec<Row<String>> = collect(r#"{"rows":[{"id":"i","key":["2024",1],"value":null}]}"#);
        assert_eq!(rows[0].key, r#"["2024",1]"#);
        assert_eq!(rows[0].value, "null");
    }

    #[test]
    fn nested_id_inside_value_is_not_a_row_member() {
        let rows: Vec<Row<Doc<serde_json::Value>>> =
            collect(r#"{"rows":[{"key":"k","value":{"id":"inner"},"id":"outer"}]}"#);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "outer");
    }

    #[test]
    fn extra_row_members_are_skipped() {
        let rows: Vec<Row<String>> =
            collect(r#"{"rows":[{"id":"i","doc":{"id":"x","key":"y"},"key":"k","value":"v"}]}"#);
        assert_eq!(rows[0], Row { id: "i".into(), key: "k".into(), value: "v".into() });
    }

    #[test]
    fn incomplete_rows_do_not_leak_into_the_next() {
        let rows: Vec<Row<String>> = collect(
            r#"{"rows":[{"id":"lonely","key":"k"},{"value":"v","key":"k2","id":"b"}]}"#,
        );
        assert_eq!(rows, vec![Row { id: "b".into(), key: "k2".into(), value: "v".into() }]);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Album {
        title: String,
        release_year: u16,
    }

    #[test]
    fn object_strategy_rows_use_codec() {
        let rows: Vec<Row<Doc<Album>>> = collect(
            r#"{"rows":[{"id":"al:1","key":"1999","value":{"title":"Moon","releaseYear":1999}}]}"#,
        );
        assert_eq!(*rows[0].value, Album { title: "Moon".into(), release_year: 1999 });
    }

    #[test]
    fn empty_rows() {
        let rows: Vec<Row<String>> = collect(r#"{"rows":[]}"#);
        assert!(rows.is_empty());
    }

    #[test]
    fn non_array_rows_yield_nothing() {
        let rows: Vec<Row<String>> = collect(r#"{"rows":null}"#);
        assert!(rows.is_empty());
    }

    #[test]
    fn reader_rests_after_rows_array() {
        let codec = Codec::default();
        let mut reader = at_rows(r#"{"rows":[{"id":"a","key":"k","value":"v"}],"offset":4}"#);
        let count = RowStream::<_, String>::new(&mut reader, &codec).count();
        assert_eq!(count, 1);
        assert_eq!(reader.token(), Some(&Token::EndArray));
        assert!(reader.read().unwrap());
        assert_eq!(reader.token(), Some(&Token::PropertyName("offset".into())));
    }

    #[test]
    fn truncated_rows_error_then_stop() {
        let codec = Codec::default();
        let mut reader = at_rows(r#"{"rows":[{"id":"a","key":"k","value":"v"},{"id":"b""#);
        let mut rows = RowStream::<_, String>::new(&mut reader, &codec);
        assert!(rows.next().unwrap().is_ok());
        assert!(matches!(rows.next(), Some(Err(StreamError::UnexpectedEof { .. }))));
        assert!(rows.next().is_none());
    }

    #[test]
    fn lazy_rows_stop_where_the_caller_stops() {
        let codec = Codec::default();
        let mut reader = at_rows(r#"{"rows":[{"id":"a","key":"k","value":"v"}, this is never read"#);
        let first = RowStream::<_, String>::new(&mut reader, &codec).next();
        assert_eq!(first.unwrap().unwrap().id, "a");
    }

    fn view_json(rows: &[(String, i64, Vec<String>)]) -> String {
        let rows: Vec<Value> = rows
            .iter()
            .map(|(id, key, value)| json!({"id": id, "key": [key, "k"], "doc": {"id": "shadow"}, "value": value}))
            .collect();
        json!({"total_rows": rows.len(), "rows": rows}).to_string()
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[ -~]{0,8}".prop_map(Value::from),
        ]
    }

    fn nested_object() -> impl Strategy<Value = Value> {
        ("[a-z]{0,6}", any::<i32>(), prop::collection::vec(scalar(), 0..4)).prop_map(|(name, n, items)| {
            json!({
                "id": "decoy",
                "key": name,
                "inner": {"rows": [{"id": "deeper", "key": n, "value": items}], "value": null}
            })
        })
    }

    /// Text a scalar row member is captured as.
    fn text_of(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    proptest! {
        #[test]
        fn streamed_rows_match_full_parse(
            rows in prop::collection::vec(
                ("[a-z0-9:]{1,10}", any::<i64>(), prop::collection::vec("[ -~]{0,6}", 0..5)),
                0..20,
            )
        ) {
            let body = view_json(&rows);
            let streamed: Vec<Row<Vec<String>>> = collect(&body);

            let full: Value = serde_json::from_str(&body).unwrap();
            let expected = full["rows"].as_array().unwrap();
            prop_assert_eq!(streamed.len(), expected.len());
            for (row, (id, key, value)) in streamed.iter().zip(&rows) {
                prop_assert_eq!(&row.id, id);
                prop_assert_eq!(&row.key, &format!("[{key},\"k\"]"));
                prop_assert_eq!(&row.value, value);
            }
        }

        #[test]
        fn scalar_rows_match_full_parse(rows in prop::collection::vec((scalar(), scalar(), scalar()), 0..20)) {
            let rows: Vec<Value> = rows
                .into_iter()
                .map(|(id, key, value)| json!({"value": value, "doc": {"id": "shadow"}, "key": key, "id": id}))
                .collect();
            let body = json!({"total_rows": rows.len(), "rows": rows}).to_string();
            let streamed: Vec<Row<String>> = collect(&body);

            prop_assert_eq!(streamed.len(), rows.len());
            for (row, source) in streamed.iter().zip(&rows) {
                prop_assert_eq!(&row.id, &text_of(&source["id"]));
                prop_assert_eq!(&row.key, &text_of(&source["key"]));
                prop_assert_eq!(&row.value, &text_of(&source["value"]));
            }
        }

        #[test]
        fn object_rows_match_full_parse(rows in prop::collection::vec(("[a-z0-9:]{1,10}", nested_object()), 0..20)) {
            let rows: Vec<Value> = rows
                .into_iter()
                .map(|(id, value)| json!({"key": [id, 1], "value": value, "id": id}))
                .collect();
            let body = json!({"offset": 0, "rows": rows, "total_rows": rows.len()}).to_string();

            let docs: Vec<Row<Doc<Value>>> = collect(&body);
            let values: Vec<Row<Value>> = collect(&body);
            prop_assert_eq!(docs.len(), rows.len());
            prop_assert_eq!(values.len(), rows.len());
            for ((doc, value), source) in docs.iter().zip(&values).zip(&rows) {
                prop_assert_eq!(&doc.id, source["id"].as_str().unwrap());
                prop_assert_eq!(&doc.key, &source["key"].to_string());
                prop_assert_eq!(&*doc.value, &source["value"]);
                prop_assert_eq!(&value.value, &source["value"]);
            }
        }
    }
}
