//! Explicit, hand-written change classification between two section values.

use std::collections::BTreeMap;
use std::fmt;

/// How one field or list entry changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeKind {
    Added,
    Updated,
    Deleted,
    Unchanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Added => "added",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

/// Field-level and keyed-list changes, addressed by dotted path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiff {
    fields: BTreeMap<String, ChangeKind>,
    lists: BTreeMap<String, BTreeMap<String, ChangeKind>>,
}

impl ConfigDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scalar field.
    pub fn field<T: PartialEq + ?Sized>(&mut self, name: &str, old: &T, new: &T) -> &mut Self {
        let kind = if old == new {
            ChangeKind::Unchanged
        } else {
            ChangeKind::Updated
        };
        self.fields.insert(name.to_string(), kind);
        self
    }

    /// Record a list whose entries are identified by `key`.
    pub fn keyed_list<T, K>(&mut self, name: &str, old: &[T], new: &[T], key: K) -> &mut Self
    where
        T: PartialEq,
        K: Fn(&T) -> String,
    {
        let entries = self.lists.entry(name.to_string()).or_default();
        for item in old {
            let id = key(item);
            let kind = match new.iter().find(|n| key(n) == id) {
                Some(n) if n == item => ChangeKind::Unchanged,
                Some(_) => ChangeKind::Updated,
                None => ChangeKind::Deleted,
            };
            entries.insert(id, kind);
        }
        for item in new {
            let id = key(item);
            entries.entry(id).or_insert(ChangeKind::Added);
        }
        self
    }

    /// Merge a child diff under `prefix`.
    pub fn nest(&mut self, prefix: &str, child: ConfigDiff) -> &mut Self {
        for (name, kind) in child.fields {
            self.fields.insert(format!("{}.{}", prefix, name), kind);
        }
        for (name, entries) in child.lists {
            self.lists.insert(format!("{}.{}", prefix, name), entries);
        }
        self
    }

    pub fn field_change(&self, name: &str) -> Option<ChangeKind> {
        self.fields.get(name).copied()
    }

    pub fn entry_change(&self, list: &str, key: &str) -> Option<ChangeKind> {
        self.lists.get(list).and_then(|l| l.get(key)).copied()
    }

    /// Keys of `list` entries with the given change.
    pub fn entries(&self, list: &str, kind: ChangeKind) -> Vec<&str> {
        self.lists
            .get(list)
            .map(|l| {
                l.iter()
                    .filter(|(_, k)| **k == kind)
                    .map(|(id, _)| id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_unchanged(&self) -> bool {
        self.fields.values().all(|k| *k == ChangeKind::Unchanged)
            && self
                .lists
                .values()
                .flat_map(|l| l.values())
                .all(|k| *k == ChangeKind::Unchanged)
    }

    /// Human-readable summary of everything that changed.
    pub fn changes(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .fields
            .iter()
            .filter(|(_, k)| **k != ChangeKind::Unchanged)
            .map(|(name, k)| format!("{} {}", name, k))
            .collect();
        for (list, entries) in &self.lists {
            for (id, kind) in entries {
                if *kind != ChangeKind::Unchanged {
                    out.push(format!("{}[{}] {}", list, id, kind));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_list_classification() {
        let old = vec![("a", 1), ("b", 2), ("c", 3)];
        let new = vec![("a", 1), ("b", 20), ("d", 4)];

        let mut diff = ConfigDiff::new();
        diff.keyed_list("items", &old, &new, |(k, _)| k.to_string());

        assert_eq!(diff.entry_change("items", "a"), Some(ChangeKind::Unchanged));
        assert_eq!(diff.entry_change("items", "b"), Some(ChangeKind::Updated));
        assert_eq!(diff.entry_change("items", "c"), Some(ChangeKind::Deleted));
        assert_eq!(diff.entry_change("items", "d"), Some(ChangeKind::Added));
        assert_eq!(diff.entries("items", ChangeKind::Deleted), vec!["c"]);
    }

    #[test]
    fn test_nest_prefixes_paths() {
        let mut child = ConfigDiff::new();
        child.field("enabled", &false, &true);

        let mut root = ConfigDiff::new();
        root.nest("radius", child);

        assert_eq!(root.field_change("radius.enabled"), Some(ChangeKind::Updated));
        assert_eq!(root.changes(), vec!["radius.enabled updated"]);
        assert!(!root.is_unchanged());
    }
}
