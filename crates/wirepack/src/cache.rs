//! Per-depth match cache for field-name lookups.
//!
//! Decoding a large stream matches the same field names at the same
//! nesting depth over and over (e.g. sibling records of one shape). The
//! cache memoizes `(depth, parent schema, name)` lookups, including the
//! "not found" outcome, so the linear scan over sibling descriptors runs
//! once per shape. Losing an entry only costs a re-scan, never a wrong
//! answer. Keying on the parent schema id keeps two shapes with a shared
//! field name at equal depth from colliding.

use std::collections::HashMap;

use crate::schema::FieldSchema;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatchKey {
    depth: usize,
    parent: u64,
    name: String,
}

/// Depth-scoped lookup cache owned by the orchestrator. Unbounded: the key
/// space is limited by registered schema shapes times nesting depth.
#[derive(Default)]
pub struct MatchCache {
    entries: HashMap<MatchKey, Option<usize>>,
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of memoized lookups, found-or-absent.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all memoized lookups.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Resolves `name` among `parent`'s children at the given recursion
    /// depth, scanning on a cache miss and memoizing the outcome.
    pub(crate) fn find_child<'s>(
        &mut self,
        parent: &'s FieldSchema,
        depth: usize,
        name: &str,
    ) -> Option<&'s FieldSchema> {
        let key = MatchKey {
            depth,
            parent: parent.id(),
            name: name.to_owned(),
        };
        let index = match self.entries.get(&key) {
            Some(cached) => *cached,
            None => {
                let found = parent
                    .children()
                    .iter()
                    .position(|child| child.name() == name);
                self.entries.insert(key, found);
                found
            }
        };
        index.map(|i| &parent.children()[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Stub {
        a: i32,
    }

    fn schema_with(names: &[&str]) -> FieldSchema {
        let children = names
            .iter()
            .map(|n| FieldSchema::scalar(n, |s: &Stub| s.a, |s: &mut Stub, v| s.a = v))
            .collect();
        FieldSchema::record("Stub", children)
    }

    #[test]
    fn memoizes_found_and_absent_lookups() {
        let parent = schema_with(&["x", "y"]);
        let mut cache = MatchCache::new();

        assert_eq!(cache.find_child(&parent, 0, "y").unwrap().name(), "y");
        assert!(cache.find_child(&parent, 0, "z").is_none());
        assert_eq!(cache.len(), 2);

        // repeated lookups hit the cache without growing it
        assert_eq!(cache.find_child(&parent, 0, "y").unwrap().name(), "y");
        assert!(cache.find_child(&parent, 0, "z").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn same_name_same_depth_different_parents_do_not_collide() {
        let first = schema_with(&["value", "extra"]);
        let second = schema_with(&["other", "value"]);
        let mut cache = MatchCache::new();

        let from_first = cache.find_child(&first, 1, "value").unwrap();
        let from_second = cache.find_child(&second, 1, "value").unwrap();
        assert_eq!(from_first.id(), first.children()[0].id());
        assert_eq!(from_second.id(), second.children()[1].id());
    }

    #[test]
    fn depth_scopes_entries() {
        let parent = schema_with(&["x"]);
        let mut cache = MatchCache::new();
        cache.find_child(&parent, 0, "x");
        cache.find_child(&parent, 1, "x");
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
