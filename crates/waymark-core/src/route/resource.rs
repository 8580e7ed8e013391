//! REST resource routes

use super::settings::join_url;
use super::Probe;
use crate::{Method, Result};
use smallvec::SmallVec;
use std::sync::Arc;
use waymark_pattern::{CompiledPattern, Constraints, Params, PatternCache, PatternKind};

/// One row of the resource convention table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceAction {
    pub action: &'static str,
    pub methods: &'static [Method],
    pub suffix: &'static str,
}

/// Checked in order; `create` precedes `show` so `/photos/create` is not an id
pub const RESOURCE_ACTIONS: [ResourceAction; 7] = [
    ResourceAction { action: "index", methods: &[Method::Get], suffix: "" },
    ResourceAction { action: "create", methods: &[Method::Get], suffix: "create" },
    ResourceAction { action: "store", methods: &[Method::Post], suffix: "" },
    ResourceAction { action: "show", methods: &[Method::Get], suffix: "{id}" },
    ResourceAction { action: "edit", methods: &[Method::Get], suffix: "{id}/edit" },
    ResourceAction { action: "update", methods: &[Method::Put, Method::Patch], suffix: "{id}" },
    ResourceAction { action: "destroy", methods: &[Method::Delete], suffix: "{id}" },
];

/// Maps the seven REST actions onto methods of one class
#[derive(Debug, Clone)]
pub struct ResourceRoute {
    class: String,
    entries: Vec<(ResourceAction, Arc<CompiledPattern>)>,
}

impl ResourceRoute {
    pub(crate) fn new(
        class: &str,
        base: &str,
        constraints: &Constraints,
        patterns: &PatternCache,
    ) -> Result<Self> {
        Ok(Self {
            class: class.to_string(),
            entries: compile_entries(base, constraints, patterns)?,
        })
    }

    pub(crate) fn rebuild(
        &mut self,
        base: &str,
        constraints: &Constraints,
        patterns: &PatternCache,
    ) -> Result<()> {
        self.entries = compile_entries(base, constraints, patterns)?;
        Ok(())
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn actions(&self) -> impl Iterator<Item = &ResourceAction> {
        self.entries.iter().map(|(action, _)| action)
    }

    /// First entry whose path and method both fit wins. A path that only
    /// fits entries for other methods reports those methods.
    pub(crate) fn probe(&self, method: Method, path: &str) -> Probe<(Params, String)> {
        let mut allowed: SmallVec<[Method; 4]> = SmallVec::new();

        for (entry, pattern) in &self.entries {
            let Some(params) = pattern.captures(path) else {
                continue;
            };
            if allows(entry.methods, method) {
                return Probe::Hit((params, entry.action.to_string()));
            }
            for m in entry.methods {
                if !allowed.contains(m) {
                    allowed.push(*m);
                }
            }
        }

        if allowed.is_empty() {
            Probe::Miss
        } else {
            Probe::WrongMethod(allowed.into_vec())
        }
    }

    /// URL of `action`, `None` meaning `index`
    pub(crate) fn reverse(&self, action: Option<&str>, params: &Params) -> Option<Result<String>> {
        let action = action.unwrap_or("index");
        self.entries
            .iter()
            .find(|(entry, _)| entry.action.eq_ignore_ascii_case(action))
            .map(|(_, pattern)| Ok(pattern.reverse(params)?))
    }

    pub(crate) fn has_action(&self, action: &str) -> bool {
        self.actions().any(|entry| entry.action.eq_ignore_ascii_case(action))
    }
}

fn allows(methods: &[Method], method: Method) -> bool {
    methods.contains(&method) || (method == Method::Head && methods.contains(&Method::Get))
}

fn compile_entries(
    base: &str,
    constraints: &Constraints,
    patterns: &PatternCache,
) -> Result<Vec<(ResourceAction, Arc<CompiledPattern>)>> {
    RESOURCE_ACTIONS
        .iter()
        .map(|entry| {
            let raw = join_url(base, entry.suffix);
            let pattern = patterns.get_or_compile(&raw, PatternKind::Path, constraints)?;
            Ok((*entry, pattern))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photos() -> ResourceRoute {
        ResourceRoute::new("PhotoController", "/photos", &Constraints::new(), &PatternCache::new()).unwrap()
    }

    fn hit(probe: Probe<(Params, String)>) -> (Params, String) {
        match probe {
            Probe::Hit(hit) => hit,
            other => panic!("expected a hit, got {:?}", other),
        }
    }

    #[test]
    fn test_convention_table() {
        let route = photos();

        assert_eq!(hit(route.probe(Method::Get, "/photos")).1, "index");
        assert_eq!(hit(route.probe(Method::Get, "/photos/create")).1, "create");
        assert_eq!(hit(route.probe(Method::Post, "/photos")).1, "store");
        assert_eq!(hit(route.probe(Method::Put, "/photos/3")).1, "update");
        assert_eq!(hit(route.probe(Method::Patch, "/photos/3")).1, "update");

        let (params, action) = hit(route.probe(Method::Get, "/photos/42"));
        assert_eq!(action, "show");
        assert_eq!(params.get("id"), Some("42"));

        let (params, action) = hit(route.probe(Method::Get, "/photos/42/edit"));
        assert_eq!(action, "edit");
        assert_eq!(params.get("id"), Some("42"));

        let (params, action) = hit(route.probe(Method::Delete, "/photos/42"));
        assert_eq!(action, "destroy");
        assert_eq!(params.get("id"), Some("42"));
    }

    #[test]
    fn test_wrong_method_reports_allowed() {
        let route = photos();

        match route.probe(Method::Patch, "/photos") {
            Probe::WrongMethod(allowed) => assert_eq!(allowed, vec![Method::Get, Method::Post]),
            other => panic!("expected wrong method, got {:?}", other),
        }
        assert!(matches!(route.probe(Method::Get, "/videos"), Probe::Miss));
    }

    #[test]
    fn test_reverse_actions() {
        let route = photos();
        let id = Params::from_iter([("id", "42")]);

        assert_eq!(route.reverse(None, &Params::new()).unwrap().unwrap(), "/photos");
        assert_eq!(route.reverse(Some("show"), &id).unwrap().unwrap(), "/photos/42");
        assert_eq!(route.reverse(Some("edit"), &id).unwrap().unwrap(), "/photos/42/edit");
        assert!(route.reverse(Some("show"), &Params::new()).unwrap().is_err());
        assert!(route.reverse(Some("publish"), &id).is_none());
    }
}
