use serde::de::{self, DeserializeOwned, Visitor};
use serde::{forward_to_deserialize_any, Serialize};

/// Role a member plays in a document's identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentityRole {
    Id,
    Rev,
}

/// A declared serializable member of an entity type.
///
/// `name` is the member's serialized name before the wire naming policy is
/// applied (for a plain `#[derive(Serialize)]` struct, the field name).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Member {
    pub name: &'static str,
    pub marker: Option<IdentityRole>,
}

impl Member {
    /// An ordinary member; it may still match an id/rev naming convention.
    pub const fn field(name: &'static str) -> Self {
        Self { name, marker: None }
    }

    /// A member explicitly marked as the document id.
    pub const fn id(name: &'static str) -> Self {
        Self {
            name,
            marker: Some(IdentityRole::Id),
        }
    }

    /// A member explicitly marked as the document revision.
    pub const fn rev(name: &'static str) -> Self {
        Self {
            name,
            marker: Some(IdentityRole::Rev),
        }
    }
}

/// A type persisted as a document.
///
/// `MEMBERS` lists every serializable member in declaration order; the
/// identity resolver picks the id and rev members from it.
///
/// ```
/// use ottoman_codec::{Entity, Member};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Artist {
///     artist_id: Option<String>,
///     artist_rev: Option<String>,
///     name: String,
/// }
///
/// impl Entity for Artist {
///     const MEMBERS: &'static [Member] = &[
///         Member::field("artist_id"),
///         Member::field("artist_rev"),
///         Member::field("name"),
///     ];
/// }
///
/// assert_eq!(Artist::type_name(), "Artist");
/// assert_eq!(Artist::doc_type(), "artist");
/// ```
pub trait Entity: Serialize + DeserializeOwned + 'static {
    const MEMBERS: &'static [Member];

    /// Unqualified type name, used by the `<type>_id` naming convention.
    fn type_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Logical document type written into the discriminator field.
    fn doc_type() -> String {
        Self::type_name().to_lowercase()
    }
}

/// `a::b::Wrapper<c::Inner>` -> `Wrapper`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = match full.find('<') {
        Some(i) => &full[..i],
        None => full,
    };
    base.rsplit("::").next().unwrap_or(base)
}

/// Field names a derived struct deserializes from, or `None` when `T` does
/// not read itself as a struct.
pub(crate) fn declared_fields<T: DeserializeOwned>() -> Option<&'static [&'static str]> {
    let mut fields = None;
    let _ = T::deserialize(FieldProbe(&mut fields));
    fields
}

/// Deserializer that records the field list a struct asks for and then
/// fails, without reading any data.
struct FieldProbe<'a>(&'a mut Option<&'static [&'static str]>);

impl<'de> de::Deserializer<'de> for FieldProbe<'_> {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("not a struct"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        *self.0 = Some(fields);
        Err(de::Error::custom("fields recorded"))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}
