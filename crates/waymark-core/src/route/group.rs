//! Route groups

use super::{compile_domain, strip_port, Route, Settings};
use crate::{Result, RouteCollector};
use std::sync::Arc;
use waymark_pattern::{CompiledPattern, Params, PatternCache, PatternKind};

/// Registry entry, in registration order
#[derive(Debug, Clone)]
pub enum Entry {
    Route(Arc<Route>),
    Group(Arc<Group>),
    Partial(Arc<PartialGroup>),
}

/// Routes registered inside a plain group. The group callback has already
/// run, so `entries` is complete.
#[derive(Debug)]
pub struct Group {
    pub(crate) settings: Settings,
    pub(crate) entries: Vec<Entry>,
}

impl Group {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

/// Deferred registration callback of a partial group
pub type PartialFn = dyn Fn(&mut RouteCollector, &Params) -> Result<()> + Send + Sync;

/// A group whose callback only runs for requests under its prefix.
///
/// The guard is segment-aware: `/admin` covers `/admin` and `/admin/users`
/// but not `/administrator`. Parameters captured by the guard are passed to
/// the callback.
pub struct PartialGroup {
    settings: Settings,
    guard: Arc<CompiledPattern>,
    domain: Option<Arc<CompiledPattern>>,
    callback: Arc<PartialFn>,
    patterns: Arc<PatternCache>,
}

impl PartialGroup {
    pub(crate) fn new(settings: Settings, callback: Arc<PartialFn>, patterns: Arc<PatternCache>) -> Result<Self> {
        let guard = patterns.get_or_compile(&settings.prefix_url(), PatternKind::Prefix, &settings.constraints)?;
        let domain = compile_domain(settings.domain.as_deref(), &settings.constraints, &patterns)?;

        Ok(Self {
            settings,
            guard,
            domain,
            callback,
            patterns,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The compiled prefix guard
    pub fn guard(&self) -> &CompiledPattern {
        &self.guard
    }

    /// Guard parameters when `path` and `host` fall under this group
    pub fn admits(&self, path: &str, host: &str) -> Option<Params> {
        let mut params = match &self.domain {
            Some(domain) => domain.captures(strip_port(host))?,
            None => Params::new(),
        };
        params.extend_from(&self.guard.captures(path)?);
        Some(params)
    }

    /// Run the callback and return what it registered.
    ///
    /// Nothing is kept when the callback fails.
    pub(crate) fn expand(&self, params: &Params) -> Result<Vec<Entry>> {
        let mut collector = RouteCollector::with_settings(self.settings.clone(), Arc::clone(&self.patterns));
        (self.callback)(&mut collector, params)?;
        Ok(collector.into_entries())
    }
}

impl std::fmt::Debug for PartialGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartialGroup")
            .field("prefix", &self.guard.raw())
            .field("domain", &self.domain.as_deref().map(CompiledPattern::raw))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(prefix: &str) -> PartialGroup {
        let callback: Arc<PartialFn> = Arc::new(|routes: &mut RouteCollector, params: &Params| -> Result<()> {
            let lang = params.get("lang").unwrap_or("en").to_string();
            routes.get("/", crate::Callback::parse(&format!("HomeController@{}", lang)))?;
            Ok(())
        });
        PartialGroup::new(
            Settings::new().prefix(prefix),
            callback,
            Arc::new(PatternCache::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_guard_is_segment_aware() {
        let group = partial("/admin");
        assert!(group.admits("/admin", "").is_some());
        assert!(group.admits("/admin/users/7", "").is_some());
        assert!(group.admits("/administrator", "").is_none());
        assert!(group.admits("/public/page", "").is_none());
    }

    #[test]
    fn test_guard_params_reach_callback() {
        let group = partial("/blog/{lang}");
        let params = group.admits("/blog/fr/posts", "").unwrap();
        assert_eq!(params.get("lang"), Some("fr"));

        let entries = group.expand(&params).unwrap();
        assert_eq!(entries.len(), 1);
        match &entries[0] {
            Entry::Route(route) => {
                assert_eq!(route.url(), "/blog/{lang}");
                assert!(route.has_action("fr"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
