//! Property-keyed scan: pull a few named top-level properties out of a
//! document in one forward pass.
//!
//! The scan stops as soon as every requested property has been handled, so
//! its cost is bounded by the prefix of the document holding those
//! properties. Whatever follows is never read, valid or not.

use std::io::Read;

use tracing::trace;

use crate::error::StreamResult;
use crate::reader::{JsonReader, Token};
use crate::writer::capture_text;

/// Invoke `on_property` for each top-level property whose name is in
/// `names`, with the reader positioned on that property's value.
///
/// Each name is handled at most once. Returns how many were handled.
pub fn scan_properties<'n, R, F>(
    reader: &mut JsonReader<R>,
    names: &[&'n str],
    mut on_property: F,
) -> StreamResult<usize>
where
    R: Read,
    F: FnMut(&'n str, &mut JsonReader<R>) -> StreamResult<()>,
{
    let mut pending: Vec<&'n str> = names.to_vec();
    let mut handled = 0;

    while !pending.is_empty() && reader.read()? {
        let position = match reader.token() {
            Some(Token::PropertyName(name)) if reader.depth() == 1 => {
                pending.iter().position(|p| *p == name)
            }
            _ => None,
        };
        let Some(position) = position else {
            continue;
        };

        let name = pending.swap_remove(position);
        reader.read_required("property value")?;
        on_property(name, reader)?;
        handled += 1;
    }

    if pending.is_empty() {
        trace!(offset = reader.offset(), handled, "property scan satisfied");
    }
    Ok(handled)
}

/// Scan for `names` and capture each one's textual value, in the order of
/// `names`. Properties the document lacks are `None`.
pub fn scan_texts<R: Read>(reader: &mut JsonReader<R>, names: &[&str]) -> StreamResult<Vec<Option<String>>> {
    let mut found: Vec<Option<String>> = vec![None; names.len()];
    scan_properties(reader, names, |name, reader| {
        let text = match reader.token() {
            Some(Token::Null) => None,
            _ => Some(capture_text(reader)?),
        };
        if let Some(slot) = names.iter().position(|n| *n == name) {
            found[slot] = text;
        }
        Ok(())
    })?;
    Ok(found)
}
