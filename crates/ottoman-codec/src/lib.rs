//! Wire codec for the ottoman document-database client.
//!
//! Maps typed values to the database's JSON documents and back:
//!
//! - **Identity resolution**: per entity type, picks the members that carry
//!   the document id and revision by ranked candidate matching
//! - **Naming policy**: id/rev members take the reserved `_id`/`_rev` wire
//!   names, every other member is camel-cased, null members are omitted.
//!   The policy follows the type: struct fields are renamed at every depth,
//!   map keys and untyped JSON are left as they are
//! - **Entity documents**: a `$doctype` discriminator is written ahead of an
//!   entity's members

pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod identity;
pub mod naming;
mod wire;

pub use codec::Codec;
pub use config::CodecConfig;
pub use entity::{Entity, IdentityRole, Member};
pub use error::{CodecError, CodecResult};
pub use identity::{id_rank, rev_rank, IdentityMap, IdentityRegistry};
pub use naming::NamingPolicy;
