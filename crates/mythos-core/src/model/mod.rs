pub mod entity;
pub mod query;

pub use entity::{EntityId, EntityKind, EntityRecord, Scope, UnknownEntityKind, WorldId};
pub use query::KeywordQuery;
