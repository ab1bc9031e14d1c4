//! serde adapters that apply the naming policy by shape.
//!
//! The policy is driven by the type being written or read, not by the JSON
//! tree: struct fields are renamed, while map keys, enum variant names and
//! values read as untyped JSON pass through as they are. Every struct
//! resolves its own id/rev members from its field names; an entity's
//! resolved identity can be supplied for the outermost struct instead.

use std::sync::Arc;

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeSeed, EnumAccess, IntoDeserializer, Unexpected, VariantAccess, Visitor};
use serde::forward_to_deserialize_any;
use serde::ser::{self, Serialize};
use serde_json::{Map, Value};

use crate::identity::{IdentityMap, IdentityRegistry};
use crate::naming::NamingPolicy;

type Error = serde_json::Error;

/// Naming policy plus the identity cache shared by both adapters.
#[derive(Clone, Copy)]
pub(crate) struct Wire<'a> {
    pub policy: &'a NamingPolicy,
    pub identities: &'a IdentityRegistry,
}

impl Wire<'_> {
    fn shape(&self, name: &'static str, fields: impl IntoIterator<Item = &'static str>) -> Arc<IdentityMap> {
        self.identities.resolve_shape(name, fields)
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Serializes into a wire-shaped [`Value`].
pub(crate) struct WireSerializer<'a> {
    wire: Wire<'a>,
    identity: Option<Arc<IdentityMap>>,
}

impl<'a> WireSerializer<'a> {
    pub fn new(wire: Wire<'a>, identity: Option<Arc<IdentityMap>>) -> Self {
        Self { wire, identity }
    }

    fn nested(wire: Wire<'a>) -> Self {
        Self { wire, identity: None }
    }
}

fn write<T: Serialize + ?Sized>(wire: Wire<'_>, value: &T) -> Result<Value, Error> {
    value.serialize(WireSerializer::nested(wire))
}

fn tagged(variant: &'static str, value: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(variant.to_string(), value);
    Value::Object(map)
}

impl<'a> ser::Serializer for WireSerializer<'a> {
    type Ok = Value;
    type Error = Error;
    type SerializeSeq = SerializeVec<'a>;
    type SerializeTuple = SerializeVec<'a>;
    type SerializeTupleStruct = SerializeVec<'a>;
    type SerializeTupleVariant = SerializeTupleVariant<'a>;
    type SerializeMap = SerializeMap<'a>;
    type SerializeStruct = SerializeStruct<'a>;
    type SerializeStructVariant = SerializeStructVariant<'a>;

    fn serialize_bool(self, v: bool) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_bool(v)
    }

    fn serialize_i8(self, v: i8) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_i8(v)
    }

    fn serialize_i16(self, v: i16) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_i16(v)
    }

    fn serialize_i32(self, v: i32) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_i32(v)
    }

    fn serialize_i64(self, v: i64) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_i64(v)
    }

    fn serialize_i128(self, v: i128) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_i128(v)
    }

    fn serialize_u8(self, v: u8) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_u8(v)
    }

    fn serialize_u16(self, v: u16) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_u16(v)
    }

    fn serialize_u32(self, v: u32) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_u32(v)
    }

    fn serialize_u64(self, v: u64) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_u64(v)
    }

    fn serialize_u128(self, v: u128) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_u128(v)
    }

    fn serialize_f32(self, v: f32) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_f32(v)
    }

    fn serialize_f64(self, v: f64) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_f64(v)
    }

    fn serialize_char(self, v: char) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_char(v)
    }

    fn serialize_str(self, v: &str) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_str(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, Error> {
        serde_json::value::Serializer.serialize_bytes(v)
    }

    fn serialize_none(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, Error> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, Error> {
        Ok(tagged(variant, write(self.wire, value)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec<'a>, Error> {
        Ok(SerializeVec {
            wire: self.wire,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec<'a>, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeVec<'a>, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeTupleVariant<'a>, Error> {
        Ok(SerializeTupleVariant {
            variant,
            items: SerializeVec {
                wire: self.wire,
                items: Vec::with_capacity(len),
            },
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeMap<'a>, Error> {
        Ok(SerializeMap {
            wire: self.wire,
            map: Map::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<SerializeStruct<'a>, Error> {
        Ok(SerializeStruct {
            wire: self.wire,
            identity: self.identity,
            name,
            fields: Vec::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeStructVariant<'a>, Error> {
        Ok(SerializeStructVariant {
            wire: self.wire,
            variant,
            map: Map::with_capacity(len),
        })
    }
}

pub(crate) struct SerializeVec<'a> {
    wire: Wire<'a>,
    items: Vec<Value>,
}

impl ser::SerializeSeq for SerializeVec<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        self.items.push(write(self.wire, value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SerializeVec<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeVec<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Error> {
        ser::SerializeSeq::end(self)
    }
}

pub(crate) struct SerializeTupleVariant<'a> {
    variant: &'static str,
    items: SerializeVec<'a>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(&mut self.items, value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(tagged(self.variant, Value::Array(self.items.items)))
    }
}

/// Map entries are data: keys keep their spelling and null values stay.
pub(crate) struct SerializeMap<'a> {
    wire: Wire<'a>,
    map: Map<String, Value>,
    next_key: Option<String>,
}

impl ser::SerializeMap for SerializeMap<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Error> {
        let key = match key.serialize(serde_json::value::Serializer)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return Err(<Error as ser::Error>::custom("map key must be a string")),
        };
        self.next_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| <Error as ser::Error>::custom("map value written before its key"))?;
        self.map.insert(key, write(self.wire, value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Object(self.map))
    }
}

/// Struct members are collected first so the struct's identity can be
/// resolved from the full member list before any name is chosen.
pub(crate) struct SerializeStruct<'a> {
    wire: Wire<'a>,
    identity: Option<Arc<IdentityMap>>,
    name: &'static str,
    fields: Vec<(&'static str, Value)>,
}

impl ser::SerializeStruct for SerializeStruct<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Error> {
        self.fields.push((key, write(self.wire, value)?));
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        let identity = match self.identity {
            Some(identity) => identity,
            None => self.wire.shape(self.name, self.fields.iter().map(|(member, _)| *member)),
        };
        let mut map = Map::with_capacity(self.fields.len());
        for (member, value) in self.fields {
            if !value.is_null() {
                map.insert(self.wire.policy.wire_name(member, &identity), value);
            }
        }
        Ok(Value::Object(map))
    }
}

pub(crate) struct SerializeStructVariant<'a> {
    wire: Wire<'a>,
    variant: &'static str,
    map: Map<String, Value>,
}

impl ser::SerializeStructVariant for SerializeStructVariant<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Error> {
        let value = write(self.wire, value)?;
        if !value.is_null() {
            self.map.insert(self.wire.policy.to_wire(key), value);
        }
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(tagged(self.variant, Value::Object(self.map)))
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Deserializes a wire [`Value`], mapping wire names back onto the fields
/// the target struct asks for.
pub(crate) struct WireValue<'a> {
    value: Value,
    wire: Wire<'a>,
    identity: Option<Arc<IdentityMap>>,
}

impl<'a> WireValue<'a> {
    pub fn new(value: Value, wire: Wire<'a>, identity: Option<Arc<IdentityMap>>) -> Self {
        Self { value, wire, identity }
    }

    fn nested(value: Value, wire: Wire<'a>) -> Self {
        Self::new(value, wire, None)
    }
}

fn visit_array<'de, V: Visitor<'de>>(items: Vec<Value>, wire: Wire<'_>, visitor: V) -> Result<V::Value, Error> {
    let seq: SeqDeserializer<_, Error> =
        SeqDeserializer::new(items.into_iter().map(|item| WireValue::nested(item, wire)));
    de::Deserializer::deserialize_any(seq, visitor)
}

impl<'de> IntoDeserializer<'de, Error> for WireValue<'_> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> de::Deserializer<'de> for WireValue<'_> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.value.deserialize_any(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Array(items) => visit_array(items, self.wire, visitor),
            other => other.deserialize_seq(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let wire = self.wire;
        match self.value {
            Value::Object(object) => {
                let entries = object
                    .into_iter()
                    .map(|(key, value)| (MapKey(key), WireValue::nested(value, wire)));
                let map: MapDeserializer<'de, _, Error> = MapDeserializer::new(entries);
                de::Deserializer::deserialize_any(map, visitor)
            }
            other => other.deserialize_map(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        let wire = self.wire;
        match self.value {
            Value::Object(object) => {
                let identity = match self.identity {
                    Some(identity) => identity,
                    None => wire.shape(name, fields.iter().copied()),
                };
                let entries = wire
                    .policy
                    .members_of(object, fields, &identity)
                    .into_iter()
                    .map(|(member, value)| (member, WireValue::nested(value, wire)));
                let map: MapDeserializer<'de, _, Error> = MapDeserializer::new(entries);
                de::Deserializer::deserialize_any(map, visitor)
            }
            Value::Array(items) => visit_array(items, wire, visitor),
            other => other.deserialize_struct(name, fields, visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.value {
            Value::Object(object) if object.len() == 1 => {
                let mut entries = object.into_iter();
                match entries.next() {
                    Some((variant, value)) => visitor.visit_enum(WireEnum {
                        variant,
                        value,
                        wire: self.wire,
                    }),
                    None => Err(de::Error::invalid_length(0, &"an enum with one variant")),
                }
            }
            other => other.deserialize_enum(name, variants, visitor),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct identifier ignored_any
    }
}

struct WireEnum<'a> {
    variant: String,
    value: Value,
    wire: Wire<'a>,
}

impl<'de, 'a> EnumAccess<'de> for WireEnum<'a> {
    type Error = Error;
    type Variant = WireValue<'a>;

    fn variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<(S::Value, WireValue<'a>), Error> {
        let name: de::value::StringDeserializer<Error> = self.variant.into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((variant, WireValue::nested(self.value, self.wire)))
    }
}

impl<'de> VariantAccess<'de> for WireValue<'_> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Error> {
        match self.value {
            Value::Null => Ok(()),
            other => Err(de::Error::invalid_type(unexpected(&other), &"unit variant")),
        }
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value, Error> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        let wire = self.wire;
        match self.value {
            Value::Object(object) => {
                let entries = wire
                    .policy
                    .members_of(object, fields, &IdentityMap::bare(""))
                    .into_iter()
                    .map(|(member, value)| (member, WireValue::nested(value, wire)));
                let map: MapDeserializer<'de, _, Error> = MapDeserializer::new(entries);
                de::Deserializer::deserialize_any(map, visitor)
            }
            other => Err(de::Error::invalid_type(unexpected(&other), &"struct variant")),
        }
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

/// A map key. JSON keys are always strings, so numeric and boolean key
/// types are parsed from the key text.
struct MapKey(String);

impl<'de> IntoDeserializer<'de, Error> for MapKey {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! parse_key {
    ($($method:ident => $visit:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match self.0.parse::<$ty>() {
                    Ok(parsed) => visitor.$visit(parsed),
                    Err(_) => Err(de::Error::invalid_value(Unexpected::Str(&self.0), &visitor)),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for MapKey {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_string(self.0)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        Value::String(self.0).deserialize_enum(name, variants, visitor)
    }

    parse_key! {
        deserialize_bool => visit_bool(bool),
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
    }

    forward_to_deserialize_any! {
        i128 u128 f32 f64 char str string bytes byte_buf option unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}
