//! Routes and route groups
//!
//! A [`Route`] is one registered mapping from a method set and URL pattern
//! to a [`Callback`]. Controller and resource routes map many
//! method/sub-path combinations onto methods of one class instead.
//!
//! Routes are created by a [`RouteCollector`](crate::RouteCollector) and are
//! mutable through the `&mut Route` it returns until the router seals.

pub mod controller;
pub mod group;
pub mod resource;
pub mod settings;

pub use controller::ControllerRoute;
pub use group::{Entry, Group, PartialFn, PartialGroup};
pub use resource::{ResourceAction, ResourceRoute, RESOURCE_ACTIONS};
pub use settings::{join_namespace, join_url, Settings, NAMESPACE_SEPARATOR};

use crate::middleware::{Middleware, MiddlewareChain};
use crate::{Error, Method, Request, Response, Result};
use smallvec::SmallVec;
use std::sync::Arc;
use waymark_pattern::{CompiledPattern, Constraints, Params, PatternCache, PatternError, PatternKind};

/// Inline handler type
pub type HandlerFn = dyn Fn(&mut Request) -> Result<Response> + Send + Sync;

/// What a matched route runs
#[derive(Clone)]
pub enum Callback {
    /// Closure invoked with the request; parameters are on `req.params`
    Inline(Arc<HandlerFn>),
    /// Method on a class resolved through the class loader
    ClassMethod { class: String, method: String },
}

impl Callback {
    pub fn inline<F>(handler: F) -> Self
    where
        F: Fn(&mut Request) -> Result<Response> + Send + Sync + 'static,
    {
        Callback::Inline(Arc::new(handler))
    }

    pub fn class_method(class: impl Into<String>, method: impl Into<String>) -> Self {
        Callback::ClassMethod {
            class: class.into(),
            method: method.into(),
        }
    }

    /// Parse `"Class@method"`; a bare class calls `index`
    pub fn parse(target: &str) -> Self {
        match target.split_once('@') {
            Some((class, method)) => Callback::class_method(class, method),
            None => Callback::class_method(target, "index"),
        }
    }
}

impl From<&str> for Callback {
    fn from(target: &str) -> Self {
        Callback::parse(target)
    }
}

impl From<String> for Callback {
    fn from(target: String) -> Self {
        Callback::parse(&target)
    }
}

impl From<(&str, &str)> for Callback {
    fn from((class, method): (&str, &str)) -> Self {
        Callback::class_method(class, method)
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callback::Inline(_) => f.write_str("Inline(..)"),
            Callback::ClassMethod { class, method } => write!(f, "{}@{}", class, method),
        }
    }
}

/// Allowed HTTP methods; empty means any. HEAD is served by GET routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet(SmallVec<[Method; 4]>);

impl MethodSet {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn only(methods: impl IntoIterator<Item = Method>) -> Self {
        let mut set = SmallVec::new();
        for method in methods {
            if !set.contains(&method) {
                set.push(method);
            }
        }
        Self(set)
    }

    pub fn is_any(&self) -> bool {
        self.0.is_empty()
    }

    pub fn allows(&self, method: Method) -> bool {
        self.is_any()
            || self.0.contains(&method)
            || (method == Method::Head && self.0.contains(&Method::Get))
    }

    pub fn iter(&self) -> impl Iterator<Item = Method> + '_ {
        self.0.iter().copied()
    }
}

/// Variant-specific part of a route
#[derive(Debug, Clone)]
pub enum Target {
    Url(Callback),
    Controller(ControllerRoute),
    Resource(ResourceRoute),
}

/// Outcome of testing one route against a request
#[derive(Debug, Clone)]
pub enum Probe<T> {
    Hit(T),
    /// The path fits but the method does not; carries the allowed methods
    WrongMethod(Vec<Method>),
    Miss,
}

/// A successful match
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// Domain parameters first, then path parameters, in pattern order
    pub params: Params,
    /// The request method that matched
    pub method: Method,
    /// What to invoke
    pub callback: Callback,
}

/// One routable unit
#[derive(Clone)]
pub struct Route {
    target: Target,
    url: String,
    methods: MethodSet,
    name: Option<String>,
    name_prefix: String,
    group_namespace: Option<String>,
    namespace: Option<String>,
    middleware: MiddlewareChain,
    constraints: Constraints,
    domain: Option<Arc<CompiledPattern>>,
    pattern: Arc<CompiledPattern>,
    patterns: Arc<PatternCache>,
}

impl Route {
    /// Build a route for `url` under the inherited `settings`
    pub(crate) fn new(
        target: Target,
        url: &str,
        methods: MethodSet,
        settings: &Settings,
        patterns: Arc<PatternCache>,
    ) -> Result<Self> {
        let url = join_url(settings.prefix.as_deref().unwrap_or(""), url);
        let constraints = settings.constraints.clone();
        let pattern = patterns.get_or_compile(&url, PatternKind::Path, &constraints)?;
        let domain = compile_domain(settings.domain.as_deref(), &constraints, &patterns)?;

        let mut route = Self {
            target,
            url,
            methods,
            name: None,
            name_prefix: settings.name_prefix.clone(),
            group_namespace: settings.namespace.clone(),
            namespace: settings.namespace.clone(),
            middleware: settings.middleware.clone(),
            constraints,
            domain,
            pattern,
            patterns,
        };
        route.rebuild()?;

        tracing::trace!(url = %route.url, methods = ?route.methods, "route registered");
        Ok(route)
    }

    pub(crate) fn url_route(url: &str, methods: MethodSet, callback: Callback, settings: &Settings, patterns: Arc<PatternCache>) -> Result<Self> {
        Self::new(Target::Url(callback), url, methods, settings, patterns)
    }

    pub(crate) fn controller_route(url: &str, class: &str, settings: &Settings, patterns: Arc<PatternCache>) -> Result<Self> {
        let base = join_url(settings.prefix.as_deref().unwrap_or(""), url);
        let target = ControllerRoute::new(class, &base, &settings.constraints, &patterns)?;
        Self::new(Target::Controller(target), url, MethodSet::any(), settings, patterns)
    }

    pub(crate) fn resource_route(url: &str, class: &str, settings: &Settings, patterns: Arc<PatternCache>) -> Result<Self> {
        let base = join_url(settings.prefix.as_deref().unwrap_or(""), url);
        let target = ResourceRoute::new(class, &base, &settings.constraints, &patterns)?;
        Self::new(Target::Resource(target), url, MethodSet::any(), settings, patterns)
    }

    /// Recompile every matcher from the URL and constraints
    fn rebuild(&mut self) -> Result<()> {
        self.pattern = self
            .patterns
            .get_or_compile(&self.url, PatternKind::Path, &self.constraints)?;

        match &mut self.target {
            Target::Url(_) => {}
            Target::Controller(controller) => {
                controller.rebuild(&self.url, &self.constraints, &self.patterns)?
            }
            Target::Resource(resource) => {
                resource.rebuild(&self.url, &self.constraints, &self.patterns)?
            }
        }
        Ok(())
    }

    /// Name the route; a group name prefix is prepended
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name = Some(format!("{}{}", self.name_prefix, name));
        self
    }

    /// Constrain a parameter that has no inline regex
    pub fn where_param(&mut self, name: &str, regex: &str) -> Result<&mut Self> {
        self.constraints.insert(name.to_string(), regex.to_string());
        self.rebuild()?;
        Ok(self)
    }

    /// Append a middleware after the inherited ones
    pub fn middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware.add(middleware);
        self
    }

    /// Restrict the route to hosts matching `domain`
    pub fn domain(&mut self, domain: &str) -> Result<&mut Self> {
        self.domain = compile_domain(Some(domain), &self.constraints, &self.patterns)?;
        Ok(self)
    }

    /// Set the namespace, relative to the inherited one unless it starts with `\`
    pub fn namespace(&mut self, namespace: &str) -> &mut Self {
        self.namespace = join_namespace(self.group_namespace.as_deref(), Some(namespace));
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Full URL pattern, group prefixes included
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get_namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn get_domain(&self) -> Option<&str> {
        self.domain.as_deref().map(CompiledPattern::raw)
    }

    pub fn get_middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    /// Name if set, otherwise the URL pattern
    pub fn identifier(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    /// Class behind the route, if it dispatches to one
    pub fn class(&self) -> Option<&str> {
        match &self.target {
            Target::Url(Callback::ClassMethod { class, .. }) => Some(class),
            Target::Url(Callback::Inline(_)) => None,
            Target::Controller(controller) => Some(controller.class()),
            Target::Resource(resource) => Some(resource.class()),
        }
    }

    /// True when the route dispatches to `class`, with or without namespace
    pub fn targets_class(&self, class: &str) -> bool {
        let Some(own) = self.class() else {
            return false;
        };
        let wanted = class.trim_start_matches(NAMESPACE_SEPARATOR);
        let own = own.trim_start_matches(NAMESPACE_SEPARATOR);
        if own == wanted {
            return true;
        }
        match &self.namespace {
            Some(namespace) => format!("{}{}{}", namespace, NAMESPACE_SEPARATOR, own) == wanted,
            None => false,
        }
    }

    /// True when a request can reach `method` on this route's class
    pub fn has_action(&self, method: &str) -> bool {
        match &self.target {
            Target::Url(Callback::ClassMethod { method: own, .. }) => own.eq_ignore_ascii_case(method),
            Target::Url(Callback::Inline(_)) => false,
            Target::Controller(_) => true,
            Target::Resource(resource) => resource.has_action(method),
        }
    }

    /// Test the route against a request
    pub fn probe(&self, method: Method, path: &str, host: &str) -> Probe<RouteMatch> {
        let mut params = match &self.domain {
            Some(domain) => match domain.captures(strip_port(host)) {
                Some(params) => params,
                None => return Probe::Miss,
            },
            None => Params::new(),
        };

        let probe = match &self.target {
            Target::Url(callback) => match self.pattern.captures(path) {
                None => Probe::Miss,
                Some(_) if !self.methods.allows(method) => {
                    Probe::WrongMethod(self.methods.iter().collect())
                }
                Some(captured) => Probe::Hit((captured, callback.clone())),
            },
            Target::Controller(controller) => match controller.probe(method, path) {
                Some((captured, target)) => {
                    Probe::Hit((captured, Callback::class_method(controller.class(), target)))
                }
                None => Probe::Miss,
            },
            Target::Resource(resource) => match resource.probe(method, path) {
                Probe::Hit((captured, action)) => {
                    Probe::Hit((captured, Callback::class_method(resource.class(), action)))
                }
                Probe::WrongMethod(allowed) => Probe::WrongMethod(allowed),
                Probe::Miss => Probe::Miss,
            },
        };

        match probe {
            Probe::Hit((captured, callback)) => {
                params.extend_from(&captured);
                Probe::Hit(RouteMatch {
                    params,
                    method,
                    callback,
                })
            }
            Probe::WrongMethod(allowed) => Probe::WrongMethod(allowed),
            Probe::Miss => Probe::Miss,
        }
    }

    /// `Some` when method, path and host all fit
    pub fn matches(&self, method: Method, path: &str, host: &str) -> Option<RouteMatch> {
        match self.probe(method, path, host) {
            Probe::Hit(matched) => Some(matched),
            _ => None,
        }
    }

    /// Build this route's URL from `params`, appending `query` when given
    pub fn reverse(&self, params: &Params, query: Option<&Params>) -> Result<String> {
        self.reverse_action(None, params, query)
    }

    /// Build the URL of one action of a controller or resource route.
    ///
    /// For plain routes `action` is ignored.
    pub fn reverse_action(&self, action: Option<&str>, params: &Params, query: Option<&Params>) -> Result<String> {
        let url = match &self.target {
            Target::Url(_) => self.pattern.reverse(params).map_err(Error::from),
            Target::Controller(controller) => controller.reverse(&self.pattern, action, params),
            Target::Resource(resource) => match resource.reverse(action, params) {
                Some(url) => url,
                None => self.pattern.reverse(params).map_err(Error::from),
            },
        };

        let mut url = url.map_err(|e| self.missing_parameter(e))?;
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(&query.to_query_string());
        }
        Ok(url)
    }

    fn missing_parameter(&self, error: Error) -> Error {
        match error {
            Error::Compile(PatternError::MissingParameter { name, .. }) => Error::MissingParameter {
                route: self.identifier().to_string(),
                name,
            },
            other => other,
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("url", &self.url)
            .field("methods", &self.methods)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("domain", &self.get_domain())
            .field("target", &self.target)
            .field("middleware", &self.middleware)
            .finish()
    }
}

pub(crate) fn compile_domain(
    domain: Option<&str>,
    constraints: &Constraints,
    patterns: &PatternCache,
) -> Result<Option<Arc<CompiledPattern>>> {
    match domain {
        Some(domain) => {
            let pattern = patterns.get_or_compile(strip_port(domain), PatternKind::Host, constraints)?;
            Ok(Some(pattern))
        }
        None => Ok(None),
    }
}

/// `example.com:8080` -> `example.com`
pub(crate) fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(url: &str, methods: &[Method]) -> Route {
        Route::url_route(
            url,
            MethodSet::only(methods.iter().copied()),
            Callback::inline(|_| Ok(Response::ok())),
            &Settings::new(),
            Arc::new(PatternCache::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_callback_parse() {
        match Callback::from("UserController@show") {
            Callback::ClassMethod { class, method } => {
                assert_eq!(class, "UserController");
                assert_eq!(method, "show");
            }
            other => panic!("unexpected {:?}", other),
        }
        match Callback::from("HomeController") {
            Callback::ClassMethod { method, .. } => assert_eq!(method, "index"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_method_set() {
        let get = MethodSet::only([Method::Get, Method::Get]);
        assert_eq!(get.iter().count(), 1);
        assert!(get.allows(Method::Get));
        assert!(get.allows(Method::Head));
        assert!(!get.allows(Method::Post));
        assert!(MethodSet::any().allows(Method::Delete));
    }

    #[test]
    fn test_matches_method_and_path() {
        let r = route("/user/{id}", &[Method::Get]);

        let m = r.matches(Method::Get, "/user/5", "").unwrap();
        assert_eq!(m.params.get("id"), Some("5"));
        assert_eq!(m.method, Method::Get);

        assert!(r.matches(Method::Post, "/user/5", "").is_none());
        assert!(matches!(r.probe(Method::Post, "/user/5", ""), Probe::WrongMethod(_)));
        assert!(matches!(r.probe(Method::Get, "/users", ""), Probe::Miss));
    }

    #[test]
    fn test_domain_constraint() {
        let mut r = route("/dashboard", &[Method::Get]);
        r.domain("admin.example.com").unwrap();

        assert!(r.matches(Method::Get, "/dashboard", "admin.example.com").is_some());
        assert!(r.matches(Method::Get, "/dashboard", "ADMIN.example.com:8080").is_some());
        assert!(r.matches(Method::Get, "/dashboard", "example.com").is_none());
    }

    #[test]
    fn test_domain_params_come_first() {
        let mut r = route("/posts/{id}", &[Method::Get]);
        r.domain("{account}.example.com").unwrap();

        let m = r.matches(Method::Get, "/posts/9", "acme.example.com").unwrap();
        let names: Vec<&str> = m.params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["account", "id"]);
    }

    #[test]
    fn test_where_param_recompiles() {
        let mut r = route("/user/{id}", &[Method::Get]);
        r.where_param("id", "[0-9]+").unwrap();

        assert!(r.matches(Method::Get, "/user/42", "").is_some());
        assert!(r.matches(Method::Get, "/user/new", "").is_none());
        assert!(r.where_param("id", "(unclosed").is_err());
    }

    #[test]
    fn test_reverse_with_query() {
        let mut r = route("/user/{id}/{tab?}", &[Method::Get]);
        r.name("user.profile");

        let params = Params::from_iter([("id", "7")]);
        let query = Params::from_iter([("page", "2"), ("q", "a b")]);
        assert_eq!(r.reverse(&params, None).unwrap(), "/user/7");
        assert_eq!(r.reverse(&params, Some(&query)).unwrap(), "/user/7?page=2&q=a%20b");

        match r.reverse(&Params::new(), None).unwrap_err() {
            Error::MissingParameter { route, name } => {
                assert_eq!(route, "user.profile");
                assert_eq!(name, "id");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_round_trip() {
        let r = route("/archive/{year:\\d{4}}/{month?}/{slug?}", &[Method::Get]);

        for values in [
            vec![("year", "2024")],
            vec![("year", "2024"), ("month", "05")],
            vec![("year", "1999"), ("month", "12"), ("slug", "hello world")],
        ] {
            let params = Params::from_iter(values);
            let url = r.reverse(&params, None).unwrap();
            let matched = r.matches(Method::Get, &url, "").unwrap();
            assert_eq!(matched.params, params, "round trip through {}", url);
        }
    }

    #[test]
    fn test_round_trip_encoded_values() {
        for (url, name, value) in [
            ("/tag/{slug:\\w+}", "slug", "café"),
            ("/q/{term:[a-z ]+}", "term", "a b"),
        ] {
            let r = route(url, &[Method::Get]);
            let params = Params::from_iter([(name, value)]);
            let generated = r.reverse(&params, None).unwrap();
            let matched = r.matches(Method::Get, &generated, "");
            assert_eq!(matched.map(|m| m.params), Some(params), "round trip through {}", generated);
        }

        let r = route("/tag/{slug:\\w+}", &[Method::Get]);
        let matched = r.matches(Method::Get, "/tag/caf%C3%A9", "").unwrap();
        assert_eq!(matched.params.get("slug"), Some("café"));
    }

    #[test]
    fn test_targets_class() {
        let mut r = Route::url_route(
            "/users",
            MethodSet::only([Method::Get]),
            Callback::from("UserController@index"),
            &Settings::new().namespace("App\\Controllers"),
            Arc::new(PatternCache::new()),
        )
        .unwrap();

        assert!(r.targets_class("UserController"));
        assert!(r.targets_class("\\App\\Controllers\\UserController"));
        assert!(!r.targets_class("PostController"));
        assert!(r.has_action("index"));
        assert!(!r.has_action("show"));

        r.namespace("\\Admin");
        assert_eq!(r.get_namespace(), Some("Admin"));
        assert!(r.targets_class("Admin\\UserController"));
    }
}
