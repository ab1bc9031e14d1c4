use std::io::Read;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::CodecConfig;
use crate::entity::Entity;
use crate::error::{CodecError, CodecResult};
use crate::identity::{IdentityMap, IdentityRegistry};
use crate::naming::NamingPolicy;
use crate::wire::{Wire, WireSerializer, WireValue};

/// JSON codec applying the wire naming policy.
///
/// A codec is built once and shared; the identity cache is its only
/// interior state and is safe to use from many threads at once.
pub struct Codec {
    config: CodecConfig,
    policy: NamingPolicy,
    identities: IdentityRegistry,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        let policy = NamingPolicy::new(&config);
        Self {
            config,
            policy,
            identities: IdentityRegistry::new(),
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn policy(&self) -> &NamingPolicy {
        &self.policy
    }

    /// Resolved id/rev members of `T`, computed on first use.
    pub fn identity<T: Entity>(&self) -> Arc<IdentityMap> {
        self.identities.resolve::<T>()
    }

    /// Serialize any value with the naming policy, omitting null members.
    ///
    /// Every struct in the value resolves its id/rev members by naming
    /// convention; use [`Codec::serialize_entity`] to honor an entity's
    /// explicit markers and write its discriminator.
    pub fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<String> {
        to_text(&self.to_wire_value(value, None)?)
    }

    /// Serialize an entity: discriminator first, then its members, with the
    /// resolved id/rev members under the reserved wire names.
    pub fn serialize_entity<T: Entity>(&self, entity: &T) -> CodecResult<String> {
        let identity = self.identity::<T>();
        let members = match self.to_wire_value(entity, Some(identity))? {
            Value::Object(map) => map,
            _ => return Err(CodecError::NotAnObject { type_name: T::type_name() }),
        };

        let mut document = Map::with_capacity(members.len() + 1);
        document.insert(self.config.doc_type_field.clone(), Value::String(T::doc_type()));
        for (key, value) in members {
            if key != self.config.doc_type_field {
                document.insert(key, value);
            }
        }
        to_text(&Value::Object(document))
    }

    /// Deserialize text. Empty or whitespace-only input yields `Ok(None)`.
    pub fn deserialize<T: DeserializeOwned>(&self, text: &str) -> CodecResult<Option<T>> {
        self.decode_text(text, None)
    }

    /// Deserialize from a reader, consuming it to the end.
    pub fn deserialize_reader<T: DeserializeOwned, R: Read>(&self, reader: R) -> CodecResult<Option<T>> {
        let text = read_text(reader)?;
        self.decode_text(&text, None)
    }

    /// Deserialize an entity, mapping the reserved wire names back onto its
    /// resolved id/rev members.
    pub fn deserialize_entity<T: Entity>(&self, text: &str) -> CodecResult<Option<T>> {
        let identity = self.identity::<T>();
        self.decode_text(text, Some(identity))
    }

    pub fn deserialize_entity_reader<T: Entity, R: Read>(&self, reader: R) -> CodecResult<Option<T>> {
        let text = read_text(reader)?;
        self.deserialize_entity(&text)
    }

    /// Deserialize an already-parsed wire value.
    pub fn from_wire_value<T: DeserializeOwned>(&self, value: Value) -> CodecResult<T> {
        T::deserialize(WireValue::new(value, self.wire(), None))
            .map_err(|e| CodecError::Deserialization(e.to_string()))
    }

    /// Current value of the entity's resolved id member.
    pub fn entity_id<T: Entity>(&self, entity: &T) -> CodecResult<Option<String>> {
        let identity = self.identity::<T>();
        read_member(entity, identity.id)
    }

    /// Current value of the entity's resolved rev member.
    pub fn entity_rev<T: Entity>(&self, entity: &T) -> CodecResult<Option<String>> {
        let identity = self.identity::<T>();
        read_member(entity, identity.rev)
    }

    /// Overwrite the entity's resolved id/rev members. `None` leaves a
    /// member as it is; roles the type does not have are skipped.
    pub fn set_entity_identity<T: Entity>(
        &self,
        entity: &mut T,
        id: Option<&str>,
        rev: Option<&str>,
    ) -> CodecResult<()> {
        let identity = self.identity::<T>();
        let updates: Vec<(&str, &str)> = [(identity.id, id), (identity.rev, rev)]
            .into_iter()
            .filter_map(|(member, value)| Some((member?, value?)))
            .collect();
        if updates.is_empty() {
            return Ok(());
        }

        let mut map = match to_value(&*entity)? {
            Value::Object(map) => map,
            _ => return Err(CodecError::NotAnObject { type_name: T::type_name() }),
        };
        for (member, value) in updates {
            map.insert(member.to_string(), Value::String(value.to_string()));
        }
        *entity = serde_json::from_value(Value::Object(map))
            .map_err(|e| CodecError::Deserialization(e.to_string()))?;
        Ok(())
    }

    fn wire(&self) -> Wire<'_> {
        Wire {
            policy: &self.policy,
            identities: &self.identities,
        }
    }

    fn to_wire_value<T: Serialize + ?Sized>(
        &self,
        value: &T,
        identity: Option<Arc<IdentityMap>>,
    ) -> CodecResult<Value> {
        value
            .serialize(WireSerializer::new(self.wire(), identity))
            .map_err(|e| CodecError::Serialization(e.to_string()))
    }

    fn decode_text<T: DeserializeOwned>(
        &self,
        text: &str,
        identity: Option<Arc<IdentityMap>>,
    ) -> CodecResult<Option<T>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let wire: Value =
            serde_json::from_str(text).map_err(|e| CodecError::Deserialization(e.to_string()))?;
        T::deserialize(WireValue::new(wire, self.wire(), identity))
            .map(Some)
            .map_err(|e| CodecError::Deserialization(e.to_string()))
    }
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> CodecResult<Value> {
    serde_json::to_value(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

fn to_text(value: &Value) -> CodecResult<String> {
    serde_json::to_string(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

fn read_text<R: Read>(mut reader: R) -> CodecResult<String> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

fn read_member<T: Serialize>(entity: &T, member: Option<&str>) -> CodecResult<Option<String>> {
    let Some(member) = member else {
        return Ok(None);
    };
    let value = to_value(entity)?;
    Ok(match value.get(member) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    })
}
