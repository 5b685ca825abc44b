use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The three kinds of world-bible entity the engine can search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Political or social groups: guilds, houses, cults, nations.
    Faction,
    /// Geographic units: continents, regions, cities, landmarks.
    Region,
    /// Named characters and the roles they occupy.
    Character,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Faction => "faction",
            Self::Region => "region",
            Self::Character => "character",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for an unrecognized entity kind string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind '{0}' (expected faction, region, or character)")]
pub struct UnknownEntityKind(pub String);

impl UnknownEntityKind {
    #[must_use]
    pub const fn code(&self) -> crate::error::ErrorCode {
        crate::error::ErrorCode::UnknownEntityKind
    }
}

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "faction" => Ok(Self::Faction),
            "region" => Ok(Self::Region),
            "character" => Ok(Self::Character),
            other => Err(UnknownEntityKind(other.to_string())),
        }
    }
}

/// Numeric identity of a world (the namespace a search is confined to).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WorldId(pub i64);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric identity of an entity within the relational store.
///
/// Vector backends address entities by the string form of this id; use
/// [`EntityId::parse_str`] to convert back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Parse the string form used by vector index payloads.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        s.trim().parse::<i64>().ok().map(Self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The world/kind namespace a single search call is confined to.
///
/// Immutable per request; both retrieval sources and the vector collection
/// key derive from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub world: WorldId,
    pub kind: EntityKind,
}

impl Scope {
    #[must_use]
    pub const fn new(world: WorldId, kind: EntityKind) -> Self {
        Self { world, kind }
    }

    /// Name of the per-world, per-kind vector collection.
    ///
    /// One collection per (kind, world) pair, e.g. `"faction-world-3"`.
    #[must_use]
    pub fn collection_key(&self) -> String {
        format!("{}-world-{}", self.kind.as_str(), self.world)
    }
}

/// A hydrated entity row as stored in the relational backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub world: WorldId,
    pub kind: EntityKind,
    pub name: String,
    pub summary: Option<String>,
}

impl EntityRecord {
    /// Text handed to the cross-encoder reranker for this entity.
    ///
    /// Name plus summary when available; the name alone otherwise.
    #[must_use]
    pub fn join_text(&self) -> String {
        match &self.summary {
            Some(summary) if !summary.is_empty() => {
                format!("{}\n{}", self.name, summary)
            }
            _ => self.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
