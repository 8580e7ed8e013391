//! URL generation
//!
//! Identifiers are resolved in this order:
//! 1. route name (`user.profile`)
//! 2. action of a named controller or resource route (`photos.show`)
//! 3. `target@method`, where `target` is a route name or a class
//! 4. bare class name, the first route dispatching to it

use crate::route::{Route, Target};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use waymark_pattern::Params;

/// Flat route list with a name lookup
#[derive(Debug, Default)]
pub struct RouteIndex {
    routes: Vec<Arc<Route>>,
    names: HashMap<String, usize>,
    duplicates: Vec<String>,
}

impl RouteIndex {
    /// Index `routes`; for a name used twice the first route keeps it
    pub fn new(routes: Vec<Arc<Route>>) -> Self {
        let mut names = HashMap::new();
        let mut duplicates = Vec::new();

        for (position, route) in routes.iter().enumerate() {
            if let Some(name) = route.get_name() {
                if names.contains_key(name) {
                    duplicates.push(name.to_string());
                } else {
                    names.insert(name.to_string(), position);
                }
            }
        }

        Self {
            routes,
            names,
            duplicates,
        }
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<Route>> {
        self.names.get(name).map(|&position| &self.routes[position])
    }

    /// Names that were registered more than once
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Build the URL for `identifier`.
    ///
    /// `Ok(None)` when nothing matches the identifier; a matching route
    /// missing a required parameter is an error.
    pub fn generate(&self, identifier: &str, params: &Params, query: Option<&Params>) -> Result<Option<String>> {
        if let Some(route) = self.by_name(identifier) {
            return route.reverse(params, query).map(Some);
        }

        if let Some((base, action)) = identifier.rsplit_once('.') {
            let convention = self
                .by_name(base)
                .filter(|route| matches!(route.target(), Target::Controller(_) | Target::Resource(_)))
                .filter(|route| route.has_action(action));
            if let Some(route) = convention {
                return route.reverse_action(Some(action), params, query).map(Some);
            }
        }

        if let Some((target, method)) = identifier.split_once('@') {
            let route = self
                .by_name(target)
                .or_else(|| self.find(|route| route.targets_class(target) && route.has_action(method)));
            if let Some(route) = route {
                return route.reverse_action(Some(method), params, query).map(Some);
            }
        }

        match self.find(|route| route.targets_class(identifier)) {
            Some(route) => route.reverse(params, query).map(Some),
            None => Ok(None),
        }
    }

    fn find(&self, predicate: impl Fn(&Route) -> bool) -> Option<&Arc<Route>> {
        self.routes.iter().find(|route| predicate(route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Settings;
    use crate::{Callback, Error, Response, RouteCollector};
    use waymark_pattern::PatternCache;

    fn index(register: impl FnOnce(&mut RouteCollector) -> Result<()>) -> RouteIndex {
        let mut collector = RouteCollector::with_settings(Settings::new(), Arc::new(PatternCache::new()));
        register(&mut collector).unwrap();
        let routes = collector
            .entries()
            .iter()
            .filter_map(|entry| match entry {
                crate::route::Entry::Route(route) => Some(Arc::clone(route)),
                _ => None,
            })
            .collect();
        RouteIndex::new(routes)
    }

    #[test]
    fn test_lookup_precedence() {
        let index = index(|r| {
            r.get("/user/{id}", "UserController@show")?.name("user.show");
            r.get("/profile", "UserController@profile")?;
            r.resource("/photos", "PhotoController")?.name("photos");
            r.controller("/account", "AccountController")?.name("account");
            r.get("/", Callback::inline(|_| Ok(Response::ok())))?.name("home");
            Ok(())
        });
        let id = Params::from_iter([("id", "42")]);
        let none = Params::new();

        assert_eq!(index.generate("user.show", &id, None).unwrap().unwrap(), "/user/42");
        assert_eq!(index.generate("photos.show", &id, None).unwrap().unwrap(), "/photos/42");
        assert_eq!(index.generate("photos", &none, None).unwrap().unwrap(), "/photos");
        assert_eq!(index.generate("account.getSettings", &none, None).unwrap().unwrap(), "/account/settings");
        assert_eq!(index.generate("UserController@profile", &none, None).unwrap().unwrap(), "/profile");
        assert_eq!(index.generate("PhotoController@edit", &id, None).unwrap().unwrap(), "/photos/42/edit");
        assert_eq!(index.generate("account@postLogin", &none, None).unwrap().unwrap(), "/account/login");
        assert_eq!(index.generate("UserController", &id, None).unwrap().unwrap(), "/user/42");
        assert_eq!(index.generate("home", &none, None).unwrap().unwrap(), "/");
    }

    #[test]
    fn test_unknown_identifier_is_none() {
        let index = index(|r| {
            r.get("/a", "A@b")?.name("a");
            Ok(())
        });
        assert!(index.generate("nonexistent.route", &Params::new(), None).unwrap().is_none());
        assert!(index.generate("Missing@method", &Params::new(), None).unwrap().is_none());
    }

    #[test]
    fn test_missing_parameter_is_an_error() {
        let index = index(|r| {
            r.get("/user/{id}", "UserController@show")?.name("user.show");
            Ok(())
        });
        let err = index.generate("user.show", &Params::new(), None).unwrap_err();
        assert!(matches!(err, Error::MissingParameter { .. }));
    }

    #[test]
    fn test_duplicate_names_first_wins() {
        let index = index(|r| {
            r.get("/first", "A@a")?.name("dup");
            r.get("/second", "A@b")?.name("dup");
            Ok(())
        });
        assert_eq!(index.generate("dup", &Params::new(), None).unwrap().unwrap(), "/first");
        assert_eq!(index.duplicates(), ["dup".to_string()]);
    }
}
