use std::{collections::HashMap, time::Instant};

/// What happened to a key between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Key appeared.
    Add,
    /// Key kept but its value differs.
    Modify,
    /// Key disappeared.
    Delete,
}

/// A single key-level change.
///
/// `Add` carries only the new value, `Delete` only the old one, `Modify` both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Kind of change.
    pub kind: ChangeKind,
    /// Affected configuration key.
    pub key: String,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change.
    pub new_value: Option<String>,
}

impl Change {
    /// A key that was not present before.
    pub fn added(key: impl Into<String>, new_value: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Add,
            key: key.into(),
            old_value: None,
            new_value: Some(new_value.into()),
        }
    }

    /// A key whose value changed.
    pub fn modified(
        key: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            kind: ChangeKind::Modify,
            key: key.into(),
            old_value: Some(old_value.into()),
            new_value: Some(new_value.into()),
        }
    }

    /// A key that no longer exists.
    pub fn deleted(key: impl Into<String>, old_value: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Delete,
            key: key.into(),
            old_value: Some(old_value.into()),
            new_value: None,
        }
    }
}

/// All changes produced by one synchronization, keyed by configuration key.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Changes by key; iteration order is unspecified.
    pub changes: HashMap<String, Change>,
    /// When the diff was computed.
    pub timestamp: Instant,
}

impl ChangeEvent {
    /// Wraps a set of changes.
    pub fn new(changes: HashMap<String, Change>) -> Self {
        Self {
            changes,
            timestamp: Instant::now(),
        }
    }

    /// Change recorded for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Change> {
        self.changes.get(key)
    }

    /// Number of changed keys.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns `true` when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes of the given kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.values().filter(|c| c.kind == kind).count()
    }

    /// Iterates over the changes in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.values()
    }
}

impl PartialEq for ChangeEvent {
    fn eq(&self, other: &Self) -> bool {
        self.changes == other.changes
    }
}
