//! Route registration

use crate::route::{Callback, Entry, Group, MethodSet, PartialFn, PartialGroup, Route, Settings};
use crate::{Error, Method, Response, Result, StatusCode};
use std::sync::Arc;
use waymark_pattern::{Params, PatternCache};

/// Collects routes under one settings overlay.
///
/// The router owns the top-level collector; [`group`](Self::group) and
/// partial groups hand a child collector carrying the merged settings to
/// their callback.
///
/// ```
/// use waymark_core::{Callback, Response, Router, Settings};
///
/// let mut router = Router::new();
/// router.group(Settings::new().prefix("/api").namespace("App"), |api| {
///     api.get("/status", Callback::inline(|_| Ok(Response::text("up"))))?
///         .name("status");
///     api.resource("/photos", "PhotoController")?.name("photos");
///     Ok(())
/// }).unwrap();
/// ```
#[derive(Debug)]
pub struct RouteCollector {
    settings: Settings,
    entries: Vec<Entry>,
    patterns: Arc<PatternCache>,
}

impl RouteCollector {
    pub(crate) fn with_settings(settings: Settings, patterns: Arc<PatternCache>) -> Self {
        Self {
            settings,
            entries: Vec::new(),
            patterns,
        }
    }

    /// Settings applied to everything registered here
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub(crate) fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    pub fn get(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.match_methods([Method::Get], url, callback)
    }

    pub fn post(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.match_methods([Method::Post], url, callback)
    }

    pub fn put(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.match_methods([Method::Put], url, callback)
    }

    pub fn patch(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.match_methods([Method::Patch], url, callback)
    }

    pub fn delete(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.match_methods([Method::Delete], url, callback)
    }

    pub fn options(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.match_methods([Method::Options], url, callback)
    }

    /// GET and POST, for form pages that post back to themselves
    pub fn form(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.match_methods([Method::Get, Method::Post], url, callback)
    }

    /// Same as [`form`](Self::form)
    pub fn basic(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.form(url, callback)
    }

    /// Any method
    pub fn all(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        let route = Route::url_route(url, MethodSet::any(), callback.into(), &self.settings, Arc::clone(&self.patterns))?;
        self.push_route(route)
    }

    pub fn match_methods(
        &mut self,
        methods: impl IntoIterator<Item = Method>,
        url: &str,
        callback: impl Into<Callback>,
    ) -> Result<&mut Route> {
        let methods = MethodSet::only(methods);
        let route = Route::url_route(url, methods, callback.into(), &self.settings, Arc::clone(&self.patterns))?;
        self.push_route(route)
    }

    /// GET route answering with a redirect to `to`
    pub fn redirect(&mut self, from: &str, to: &str, status: StatusCode) -> Result<&mut Route> {
        let location = to.to_string();
        let callback = Callback::inline(move |_| Ok(Response::redirect(&location, status)));
        self.get(from, callback)
    }

    /// `METHOD /url/{action}/...` to `{method}{Action}` on `class`
    pub fn controller(&mut self, url: &str, class: &str) -> Result<&mut Route> {
        let route = Route::controller_route(url, class, &self.settings, Arc::clone(&self.patterns))?;
        self.push_route(route)
    }

    /// The seven REST actions on `class`
    pub fn resource(&mut self, url: &str, class: &str) -> Result<&mut Route> {
        let route = Route::resource_route(url, class, &self.settings, Arc::clone(&self.patterns))?;
        self.push_route(route)
    }

    /// Register routes under `settings` merged onto the current ones.
    ///
    /// The callback runs immediately. When it fails nothing it registered
    /// is kept.
    pub fn group<F>(&mut self, settings: Settings, callback: F) -> Result<()>
    where
        F: FnOnce(&mut RouteCollector) -> Result<()>,
    {
        let settings = self.settings.merge(&settings);
        let mut child = RouteCollector::with_settings(settings.clone(), Arc::clone(&self.patterns));
        callback(&mut child)?;

        tracing::trace!(prefix = %settings.prefix_url(), routes = child.entries.len(), "group registered");
        self.entries.push(Entry::Group(Arc::new(Group {
            settings,
            entries: child.entries,
        })));
        Ok(())
    }

    /// Register routes under `url` that are only built for requests whose
    /// path starts with `url`. Parameters in `url` are passed to the callback.
    pub fn partial_group<F>(&mut self, url: &str, settings: Settings, callback: F) -> Result<()>
    where
        F: Fn(&mut RouteCollector, &Params) -> Result<()> + Send + Sync + 'static,
    {
        let settings = self.settings.merge(&settings.prefix(url));
        let callback: Arc<PartialFn> = Arc::new(callback);
        let group = PartialGroup::new(settings, callback, Arc::clone(&self.patterns))?;

        tracing::trace!(prefix = %group.guard().raw(), "partial group registered");
        self.entries.push(Entry::Partial(Arc::new(group)));
        Ok(())
    }

    fn push_route(&mut self, route: Route) -> Result<&mut Route> {
        self.entries.push(Entry::Route(Arc::new(route)));
        match self.entries.last_mut() {
            Some(Entry::Route(route)) => {
                Arc::get_mut(route).ok_or_else(|| Error::Sealed("modify a shared route".to_string()))
            }
            _ => Err(Error::Internal("route entry missing after registration".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Target;

    fn collector() -> RouteCollector {
        RouteCollector::with_settings(Settings::new(), Arc::new(PatternCache::new()))
    }

    fn routes(entries: &[Entry]) -> Vec<Arc<Route>> {
        let mut out = Vec::new();
        for entry in entries {
            match entry {
                Entry::Route(route) => out.push(Arc::clone(route)),
                Entry::Group(group) => out.extend(routes(group.entries())),
                Entry::Partial(_) => {}
            }
        }
        out
    }

    #[test]
    fn test_nested_group_inheritance() {
        let mut c = collector();
        c.group(Settings::new().prefix("/api").namespace("App"), |api| {
            api.group(Settings::new().prefix("/v1").namespace("Api"), |v1| {
                v1.get("/users", "UserController@index")?.name("users");
                Ok(())
            })
        })
        .unwrap();

        let all = routes(c.entries());
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].url(), "/api/v1/users");
        assert_eq!(all[0].get_namespace(), Some("App\\Api"));
        assert_eq!(all[0].get_name(), Some("users"));
    }

    #[test]
    fn test_group_middleware_accumulates() {
        let mut c = collector();
        let ok = |_: &mut crate::Request| -> Result<()> { Ok(()) };
        c.group(Settings::new().middleware(ok), |outer| {
            outer.group(Settings::new().middleware(ok), |inner| {
                inner.get("/x", "X@y")?.middleware(ok);
                Ok(())
            })
        })
        .unwrap();

        assert_eq!(routes(c.entries())[0].get_middleware().len(), 3);
    }

    #[test]
    fn test_failed_group_commits_nothing() {
        let mut c = collector();
        let result = c.group(Settings::new().prefix("/broken"), |g| {
            g.get("/ok", "A@b")?;
            g.get("/post/{id?}/{slug}", "A@c")?;
            Ok(())
        });

        assert!(matches!(result, Err(Error::Compile(_))));
        assert!(c.entries().is_empty());
    }

    #[test]
    fn test_registration_methods() {
        let mut c = collector();
        c.form("/contact", "ContactController@form").unwrap();
        c.all("/ping", "PingController").unwrap();
        c.redirect("/old", "/new", StatusCode::MOVED_PERMANENTLY).unwrap();
        c.controller("/account", "AccountController").unwrap();
        c.resource("/photos", "PhotoController").unwrap();

        let all = routes(c.entries());
        assert_eq!(all.len(), 5);
        assert!(all[0].methods().allows(Method::Post));
        assert!(!all[0].methods().allows(Method::Delete));
        assert!(all[1].methods().is_any());
        assert!(matches!(all[3].target(), Target::Controller(_)));
        assert!(matches!(all[4].target(), Target::Resource(_)));

        let redirect = all[2].matches(Method::Get, "/old", "").unwrap();
        match redirect.callback {
            Callback::Inline(handler) => {
                let mut req = crate::Request::new(Method::Get, "/old");
                let res = handler(&mut req).unwrap();
                assert_eq!(res.status, StatusCode::MOVED_PERMANENTLY);
                assert_eq!(res.header("location"), Some("/new"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_partial_group_is_deferred() {
        let mut c = collector();
        c.partial_group("/admin", Settings::new(), |admin, _| {
            admin.get("/users", "AdminController@users")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(c.entries().len(), 1);
        assert!(routes(c.entries()).is_empty());
        match &c.entries()[0] {
            Entry::Partial(group) => {
                let params = group.admits("/admin/users", "").unwrap();
                let expanded = group.expand(&params).unwrap();
                assert_eq!(routes(&expanded)[0].url(), "/admin/users");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
