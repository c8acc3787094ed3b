//! Kind-namespaced item identifiers.
//!
//! Backend event ids and task ids live in separate id spaces, so the
//! canonical id prefixes the source id with the kind: `event-42`, `task-17`.
//! Provider imports that have no backend record of their own derive a
//! stable id from the external reference instead (`event-ext-g-1`), since
//! provider-native ids are not guaranteed stable across re-imports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::item::ItemKind;

/// Globally unique, kind-namespaced identifier of a timeline item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId {
    kind: ItemKind,
    source: String,
}

impl ItemId {
    /// Id for a backend event record.
    #[must_use]
    pub fn event(source: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Event,
            source: source.into(),
        }
    }

    /// Id for a backend task record.
    #[must_use]
    pub fn task(source: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Task,
            source: source.into(),
        }
    }

    /// Id for a provider import with no backend record, derived from the
    /// external reference so re-imports land on the same id.
    #[must_use]
    pub fn external(external_ref: &str) -> Self {
        Self {
            kind: ItemKind::Event,
            source: format!("ext-{external_ref}"),
        }
    }

    /// Which source kind this id belongs to.
    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        self.kind
    }

    /// The source record id within the kind's id space.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.source)
    }
}

/// Error returned when parsing an item id from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid item id '{raw}': expected 'event-<id>' or 'task-<id>'")]
pub struct ParseItemIdError {
    /// The unrecognised input string.
    pub raw: String,
}

impl FromStr for ItemId {
    type Err = ParseItemIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, source) = s.split_once('-').ok_or_else(|| ParseItemIdError {
            raw: s.to_string(),
        })?;
        let kind = match prefix {
            "event" => ItemKind::Event,
            "task" => ItemKind::Task,
            _ => {
                return Err(ParseItemIdError {
                    raw: s.to_string(),
                });
            }
        };
        if source.is_empty() {
            return Err(ParseItemIdError {
                raw: s.to_string(),
            });
        }
        Ok(Self {
            kind,
            source: source.to_string(),
        })
    }
}

// Serde uses the canonical `<kind>-<source>` string form.
impl Serialize for ItemId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
