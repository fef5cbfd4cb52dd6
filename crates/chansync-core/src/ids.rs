//! Identity types shared by every layer.
//!
//! Channel identity is case-insensitive: the registry treats `"Rust"` and
//! `"rust"` as the same channel while remembering the spelling it saw first.
//! User identity is a plain integer and is the only thing used to decide
//! whether an event is about the local user. Display names are carried next
//! to ids purely for ordering and presentation.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

/// Channel identity as reported by the server.
///
/// Comparison, hashing and ordering all use the lower-cased form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ChannelId {
    display: String,
    key: String,
}

impl ChannelId {
    /// Create a channel identity from its display name.
    pub fn new(name: impl Into<String>) -> Self {
        let display = name.into();
        let key = display.to_lowercase();
        Self { display, key }
    }

    /// Name as first spelled by the server.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Lower-cased registry key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PartialEq for ChannelId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ChannelId {}

impl Hash for ChannelId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for ChannelId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChannelId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl From<String> for ChannelId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<ChannelId> for String {
    fn from(id: ChannelId) -> Self {
        id.display
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<&str> for ChannelId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Stable user identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display name of a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(pub String);

impl Username {
    /// Name as displayed.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// User record carried by events and payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Stable identity.
    pub id: UserId,
    /// Current display name.
    pub name: Username,
}

impl User {
    /// Create a user record.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self { id: UserId(id), name: Username(name.into()) }
    }
}

/// Server-reported wall clock time in milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

/// Identity of a timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryId {
    /// Assigned by the server to a text message.
    Server(u64),
    /// Allocated locally for a synthetic membership entry.
    Local(u64),
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(id) => write!(f, "s{id}"),
            Self::Local(id) => write!(f, "l{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn channel_id_is_case_insensitive() {
        let mut map = HashMap::new();
        map.insert(ChannelId::new("Rust"), 1);

        assert_eq!(map.get(&ChannelId::new("rust")), Some(&1));
        assert_eq!(ChannelId::new("RUST"), ChannelId::new("rust"));
        assert_eq!(ChannelId::new("Rust").as_str(), "Rust");
    }

    #[test]
    fn channel_id_orders_by_folded_name() {
        let mut ids = vec![ChannelId::new("b"), ChannelId::new("A"), ChannelId::new("c")];
        ids.sort();
        let names: Vec<_> = ids.iter().map(ChannelId::as_str).collect();
        assert_eq!(names, ["A", "b", "c"]);
    }
}
