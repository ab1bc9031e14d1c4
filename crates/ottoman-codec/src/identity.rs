//! Per-type resolution of the document id and revision members.
//!
//! Every declared member is ranked by two independent functions, one for
//! the id role and one for the rev role. Lower ranks are more specific:
//!
//! | rank | id                 | rev                 |
//! |------|--------------------|---------------------|
//! | 0    | `Member::id`       | `Member::rev`       |
//! | 1    | `_id`              | `_rev`              |
//! | 2    | `<type>_id`        | `<type>_rev`        |
//! | 3    | `document_id`      | `document_rev`      |
//! | 4    | `entity_id`        | `entity_rev`        |
//! | 5    | `id`               | `rev`               |
//!
//! Convention names compare case-insensitively with underscores ignored, so
//! `artist_id` and `ArtistId` both match type `Artist`. The lowest rank wins
//! and ties go to the first declared member. A member that is an id
//! candidate is never considered for the rev role.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::entity::{declared_fields, Entity, IdentityRole, Member};

const CONVENTIONS: [&str; 3] = ["document", "entity", ""];

/// Resolved id/rev members of one entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityMap {
    pub type_name: &'static str,
    pub id: Option<&'static str>,
    pub rev: Option<&'static str>,
}

impl IdentityMap {
    /// Rank every member and pick the best candidate for each role.
    pub fn resolve(type_name: &'static str, members: &[Member]) -> Self {
        let mut id: Option<(u8, &'static str)> = None;
        let mut rev: Option<(u8, &'static str)> = None;

        for member in members {
            if let Some(rank) = id_rank(type_name, member) {
                if id.map_or(true, |(best, _)| rank < best) {
                    id = Some((rank, member.name));
                }
                continue;
            }
            if let Some(rank) = rev_rank(type_name, member) {
                if rev.map_or(true, |(best, _)| rank < best) {
                    rev = Some((rank, member.name));
                }
            }
        }

        Self {
            type_name,
            id: id.map(|(_, name)| name),
            rev: rev.map(|(_, name)| name),
        }
    }

    /// Identity of a type with no id/rev members.
    pub fn bare(type_name: &'static str) -> Self {
        Self {
            type_name,
            id: None,
            rev: None,
        }
    }

    /// A type with neither role resolved is a bare value type.
    pub fn is_bare(&self) -> bool {
        self.id.is_none() && self.rev.is_none()
    }

    pub fn role_of(&self, member: &str) -> Option<IdentityRole> {
        if self.id == Some(member) {
            Some(IdentityRole::Id)
        } else if self.rev == Some(member) {
            Some(IdentityRole::Rev)
        } else {
            None
        }
    }
}

/// Rank of `member` as the id of `type_name`, or `None` if not a candidate.
pub fn id_rank(type_name: &str, member: &Member) -> Option<u8> {
    rank(type_name, member, IdentityRole::Id)
}

/// Rank of `member` as the revision of `type_name`, or `None` if not a candidate.
pub fn rev_rank(type_name: &str, member: &Member) -> Option<u8> {
    rank(type_name, member, IdentityRole::Rev)
}

fn rank(type_name: &str, member: &Member, role: IdentityRole) -> Option<u8> {
    match member.marker {
        Some(marked) if marked == role => return Some(0),
        Some(_) => return None,
        None => {}
    }

    let suffix = match role {
        IdentityRole::Id => "id",
        IdentityRole::Rev => "rev",
    };
    if member.name.strip_prefix('_') == Some(suffix) {
        return Some(1);
    }

    let name = normalize(member.name);
    if name == format!("{}{suffix}", normalize(type_name)) {
        return Some(2);
    }
    CONVENTIONS
        .iter()
        .position(|prefix| name == format!("{prefix}{suffix}"))
        .map(|pos| pos as u8 + 3)
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Members of `members` that are not among the type's `declared` fields.
pub fn undeclared_members(members: &[Member], declared: &[&str]) -> Vec<&'static str> {
    members
        .iter()
        .filter(|m| !declared.contains(&m.name))
        .map(|m| m.name)
        .collect()
}

/// Cache of resolved identities.
///
/// Entity types are keyed by type and resolved from their declared
/// `MEMBERS`. Struct shapes met while encoding or decoding are keyed by
/// struct name and field list and resolved by naming convention alone.
/// Resolution is a pure function of either key, so entries are computed
/// once and never invalidated.
#[derive(Default)]
pub struct IdentityRegistry {
    resolved: RwLock<HashMap<TypeId, Arc<IdentityMap>>>,
    shapes: RwLock<HashMap<Vec<&'static str>, Arc<IdentityMap>>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve<T: Entity>(&self) -> Arc<IdentityMap> {
        let key = TypeId::of::<T>();
        if let Some(found) = self.resolved.read().expect("lock poisoned").get(&key) {
            return Arc::clone(found);
        }

        let map = Arc::new(IdentityMap::resolve(T::type_name(), T::MEMBERS));
        debug!(
            entity = map.type_name,
            id = ?map.id,
            rev = ?map.rev,
            "resolved entity identity"
        );
        if let Some(declared) = declared_fields::<T>() {
            for member in undeclared_members(T::MEMBERS, declared) {
                warn!(
                    entity = map.type_name,
                    member,
                    role = ?map.role_of(member),
                    "declared member is not a field of the type"
                );
            }
        }
        let mut resolved = self.resolved.write().expect("lock poisoned");
        Arc::clone(resolved.entry(key).or_insert(map))
    }

    /// Identity of a struct shape, by naming convention over its fields.
    pub fn resolve_shape(
        &self,
        name: &'static str,
        fields: impl IntoIterator<Item = &'static str>,
    ) -> Arc<IdentityMap> {
        let key: Vec<&'static str> = std::iter::once(name).chain(fields).collect();
        if let Some(found) = self.shapes.read().expect("lock poisoned").get(&key) {
            return Arc::clone(found);
        }

        let members: Vec<Member> = key[1..].iter().map(|&f| Member::field(f)).collect();
        let map = Arc::new(IdentityMap::resolve(name, &members));
        if !map.is_bare() {
            debug!(shape = name, id = ?map.id, rev = ?map.rev, "resolved struct identity");
        }
        let mut shapes = self.shapes.write().expect("lock poisoned");
        Arc::clone(shapes.entry(key).or_insert(map))
    }

    /// Number of types resolved so far.
    pub fn len(&self) -> usize {
        self.resolved.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
