//! Memoized compilation keyed by raw pattern

use crate::{compile_with, CompiledPattern, Constraints, PatternKind, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type CacheKey = (String, PatternKind, Vec<(String, String)>);

/// Compiled patterns shared across routes.
///
/// Compilation is pure, so routes registered with the same pattern, kind
/// and constraints share one matcher. Failed compilations are not cached.
#[derive(Debug, Default)]
pub struct PatternCache {
    entries: Mutex<HashMap<CacheKey, Arc<CompiledPattern>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached matcher or compile and remember it
    pub fn get_or_compile(
        &self,
        raw: &str,
        kind: PatternKind,
        constraints: &Constraints,
    ) -> Result<Arc<CompiledPattern>> {
        let key = (
            raw.to_string(),
            kind,
            constraints
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        let mut entries = self.entries.lock();
        if let Some(pattern) = entries.get(&key) {
            return Ok(Arc::clone(pattern));
        }

        let pattern = Arc::new(compile_with(raw, kind, constraints)?);
        entries.insert(key, Arc::clone(&pattern));
        Ok(pattern)
    }

    /// Number of distinct compiled patterns
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_pattern_is_shared() {
        let cache = PatternCache::new();
        let none = Constraints::new();

        let a = cache.get_or_compile("/users/{id}", PatternKind::Path, &none).unwrap();
        let b = cache.get_or_compile("/users/{id}", PatternKind::Path, &none).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        let prefix = cache.get_or_compile("/users/{id}", PatternKind::Prefix, &none).unwrap();
        assert!(!Arc::ptr_eq(&a, &prefix));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_constraints_are_part_of_the_key() {
        let cache = PatternCache::new();
        let mut numeric = Constraints::new();
        numeric.insert("id".to_string(), "\\d+".to_string());

        let plain = cache.get_or_compile("/users/{id}", PatternKind::Path, &Constraints::new()).unwrap();
        let typed = cache.get_or_compile("/users/{id}", PatternKind::Path, &numeric).unwrap();
        assert!(plain.is_match("/users/bob"));
        assert!(!typed.is_match("/users/bob"));
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = PatternCache::new();
        assert!(cache
            .get_or_compile("/a/{id?}/{b}", PatternKind::Path, &Constraints::new())
            .is_err());
        assert!(cache.is_empty());
    }
}
