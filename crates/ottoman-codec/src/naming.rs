use heck::ToLowerCamelCase;
use serde_json::{Map, Value};

use crate::config::CodecConfig;
use crate::entity::IdentityRole;
use crate::identity::IdentityMap;

/// Maps member names to wire names and back.
///
/// The resolved id/rev members of a struct take the reserved wire names;
/// every other identifier-like member is camel-cased. Names that are not
/// plain identifiers, and reserved names starting with `_` or `$`, pass
/// through untouched. Reading never inverts the case transform: wire names
/// are matched against the members the target type declares.
#[derive(Clone, Debug)]
pub struct NamingPolicy {
    id_field: String,
    rev_field: String,
    doc_type_field: String,
    camel_case: bool,
}

impl NamingPolicy {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            id_field: config.id_field.clone(),
            rev_field: config.rev_field.clone(),
            doc_type_field: config.doc_type_field.clone(),
            camel_case: config.camel_case,
        }
    }

    pub fn to_wire(&self, name: &str) -> String {
        if self.camel_case && is_convertible(name) {
            name.to_lower_camel_case()
        } else {
            name.to_string()
        }
    }

    /// Wire name of `member` in a struct whose identity is `identity`.
    pub fn wire_name(&self, member: &str, identity: &IdentityMap) -> String {
        match identity.role_of(member) {
            Some(IdentityRole::Id) => self.id_field.clone(),
            Some(IdentityRole::Rev) => self.rev_field.clone(),
            None => self.to_wire(member),
        }
    }

    /// Pair each key of a wire object with the member of `fields` it fills.
    ///
    /// Keys equal to a member's wire name claim that member first. Keys
    /// left over then fill an unclaimed member whose name matches ignoring
    /// case and underscores. Anything else keeps its wire name, except the
    /// discriminator, which is dropped.
    pub fn members_of(
        &self,
        object: Map<String, Value>,
        fields: &'static [&'static str],
        identity: &IdentityMap,
    ) -> Vec<(String, Value)> {
        let wire: Vec<String> = fields.iter().map(|f| self.wire_name(f, identity)).collect();
        let mut claimed = vec![false; fields.len()];

        let entries: Vec<(String, Value)> = object.into_iter().collect();
        let mut members: Vec<Option<&'static str>> = entries
            .iter()
            .map(|(key, _)| {
                let pos = wire.iter().position(|w| w == key)?;
                claimed[pos] = true;
                Some(fields[pos])
            })
            .collect();

        for ((key, _), member) in entries.iter().zip(members.iter_mut()) {
            if member.is_some() {
                continue;
            }
            let wanted = loose(key);
            let found = (0..fields.len()).find(|&i| !claimed[i] && loose(fields[i]) == wanted);
            if let Some(pos) = found {
                claimed[pos] = true;
                *member = Some(fields[pos]);
            }
        }

        entries
            .into_iter()
            .zip(members)
            .filter_map(|((key, value), member)| match member {
                Some(member) => Some((member.to_string(), value)),
                None if key == self.doc_type_field => None,
                None => Some((key, value)),
            })
            .collect()
    }
}

fn is_convertible(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn loose(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}
