//! The router: registration, dispatch and URL generation
//!
//! Routes are tried in registration order. In first-match mode the first
//! route whose method, path and host fit is dispatched; in all-matches mode
//! every fitting route runs and the outputs are appended.
//!
//! The first dispatch or URL lookup seals the router. Registering routes
//! after that fails with [`Error::Sealed`].

use crate::config::{RenderMode, RouterConfig};
use crate::context::RequestContext;
use crate::handlers::{Event, EventArgument, EventHandler, ExceptionHandler};
use crate::loader::{ClassLoader, ControllerRegistry};
use crate::middleware::Middleware;
use crate::route::{Callback, Entry, Probe, Route, RouteMatch, Settings, NAMESPACE_SEPARATOR};
use crate::url::RouteIndex;
use crate::{Error, Method, Request, Response, Result, RouteCollector, StatusCode};
use std::sync::{Arc, OnceLock};
use waymark_pattern::{Params, PatternCache};

/// Route registry and dispatcher
pub struct Router {
    config: RouterConfig,
    root: RouteCollector,
    index: OnceLock<RouteIndex>,
    class_loader: Arc<dyn ClassLoader>,
    csrf_verifier: Option<Arc<dyn Middleware>>,
    exception_handlers: Vec<Arc<dyn ExceptionHandler>>,
    event_handlers: Vec<Arc<dyn EventHandler>>,
}

/// Outcome of [`Router::run_debug`]
#[derive(Debug)]
pub struct DebugInfo {
    pub method: Method,
    pub path: String,
    pub host: String,
    pub response: Option<Response>,
    pub error: Option<String>,
    /// Identifiers of the routes that were dispatched
    pub loaded_routes: Vec<String>,
    /// Routes known to the request after flattening
    pub total_routes: usize,
    pub log: Vec<String>,
}

impl Router {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            config,
            root: RouteCollector::with_settings(Settings::new(), Arc::new(PatternCache::new())),
            index: OnceLock::new(),
            class_loader: Arc::new(ControllerRegistry::new()),
            csrf_verifier: None,
            exception_handlers: Vec::new(),
            event_handlers: Vec::new(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) -> &mut Self {
        self.config.render_mode = mode;
        self
    }

    /// Dispatch every matching route instead of only the first
    pub fn enable_multi_route_rendering(&mut self, enabled: bool) -> &mut Self {
        let mode = if enabled {
            RenderMode::AllMatches
        } else {
            RenderMode::FirstMatch
        };
        self.set_render_mode(mode)
    }

    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.config.default_namespace = Some(namespace.into());
        self
    }

    pub fn set_class_loader<L: ClassLoader + 'static>(&mut self, loader: L) -> &mut Self {
        self.class_loader = Arc::new(loader);
        self
    }

    /// Verifier run once per state-changing request, before matching
    pub fn set_csrf_verifier<M: Middleware + 'static>(&mut self, verifier: M) -> &mut Self {
        self.csrf_verifier = Some(Arc::new(verifier));
        self
    }

    pub fn add_exception_handler<H: ExceptionHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.exception_handlers.push(Arc::new(handler));
        self
    }

    pub fn add_event_handler<H: EventHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.event_handlers.push(Arc::new(handler));
        self
    }

    // Registration

    fn registry(&mut self) -> Result<&mut RouteCollector> {
        if self.is_sealed() {
            return Err(Error::Sealed("register routes after dispatch started".to_string()));
        }
        Ok(&mut self.root)
    }

    pub fn get(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.registry()?.get(url, callback)
    }

    pub fn post(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.registry()?.post(url, callback)
    }

    pub fn put(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.registry()?.put(url, callback)
    }

    pub fn patch(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.registry()?.patch(url, callback)
    }

    pub fn delete(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.registry()?.delete(url, callback)
    }

    pub fn options(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.registry()?.options(url, callback)
    }

    pub fn form(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.registry()?.form(url, callback)
    }

    pub fn basic(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.registry()?.basic(url, callback)
    }

    pub fn all(&mut self, url: &str, callback: impl Into<Callback>) -> Result<&mut Route> {
        self.registry()?.all(url, callback)
    }

    pub fn match_methods(
        &mut self,
        methods: impl IntoIterator<Item = Method>,
        url: &str,
        callback: impl Into<Callback>,
    ) -> Result<&mut Route> {
        self.registry()?.match_methods(methods, url, callback)
    }

    pub fn redirect(&mut self, from: &str, to: &str, status: StatusCode) -> Result<&mut Route> {
        self.registry()?.redirect(from, to, status)
    }

    pub fn controller(&mut self, url: &str, class: &str) -> Result<&mut Route> {
        self.registry()?.controller(url, class)
    }

    pub fn resource(&mut self, url: &str, class: &str) -> Result<&mut Route> {
        self.registry()?.resource(url, class)
    }

    pub fn group<F>(&mut self, settings: Settings, callback: F) -> Result<()>
    where
        F: FnOnce(&mut RouteCollector) -> Result<()>,
    {
        self.registry()?.group(settings, callback)
    }

    pub fn partial_group<F>(&mut self, url: &str, settings: Settings, callback: F) -> Result<()>
    where
        F: Fn(&mut RouteCollector, &Params) -> Result<()> + Send + Sync + 'static,
    {
        self.registry()?.partial_group(url, settings, callback)
    }

    /// Top-level registry entries
    pub fn entries(&self) -> &[Entry] {
        self.root.entries()
    }

    pub fn is_sealed(&self) -> bool {
        self.index.get().is_some()
    }

    /// Seal the registry and index the routes outside partial groups
    fn seal(&self) -> &RouteIndex {
        self.index.get_or_init(|| {
            let mut routes = Vec::new();
            collect_static(self.root.entries(), &mut routes);
            let index = RouteIndex::new(routes);

            for name in index.duplicates() {
                tracing::warn!(name = %name, "duplicate route name, keeping the first route");
            }
            tracing::debug!(routes = index.len(), entries = self.root.entries().len(), "router sealed");
            index
        })
    }

    /// Routes outside partial groups, in registration order. Seals the router.
    pub fn routes(&self) -> &[Arc<Route>] {
        self.seal().routes()
    }

    // Dispatch

    /// Start a request. The context owns all per-request state.
    pub fn context(&self, request: Request) -> RequestContext<'_> {
        RequestContext::new(self, request)
    }

    /// Match and dispatch `request`
    pub fn handle(&self, request: Request) -> Result<Response> {
        self.context(request).dispatch()
    }

    /// Dispatch `request` and report what happened
    pub fn run_debug(&self, request: Request) -> DebugInfo {
        let mut ctx = self.context(request);
        let outcome = ctx.dispatch();
        let total_routes = ctx.loaded_len();

        let (response, error) = match outcome {
            Ok(response) => (Some(response), None),
            Err(error) => (None, Some(error.to_string())),
        };
        let log = ctx.debug_log().to_vec();
        let request = ctx.into_request();

        DebugInfo {
            method: request.method,
            path: request.path,
            host: request.host,
            response,
            error,
            loaded_routes: request
                .loaded_routes
                .iter()
                .map(|route| route.identifier().to_string())
                .collect(),
            total_routes,
            log,
        }
    }

    pub(crate) fn dispatch(&self, ctx: &mut RequestContext<'_>) -> Result<Response> {
        match self.render(ctx) {
            Ok(response) => {
                self.fire(EventArgument::new(Event::Load).request(ctx.request()));
                Ok(response)
            }
            Err(error) => self.handle_exception(ctx, error),
        }
    }

    fn render(&self, ctx: &mut RequestContext<'_>) -> Result<Response> {
        self.seal();
        self.fire(EventArgument::new(Event::Init).request(ctx.request()));

        let (method, path, host) = {
            let req = ctx.request();
            (req.method, req.path.clone(), req.host.clone())
        };
        ctx.log(format!("dispatching {} {}", method, path));

        if let Some(verifier) = &self.csrf_verifier {
            if method.is_state_changing() {
                self.fire(EventArgument::new(Event::RenderCsrf).request(ctx.request()));
                verifier.handle(ctx.request_mut())?;
            }
        }

        self.fire(EventArgument::new(Event::LoadRoutes).request(ctx.request()));
        let routes = ctx.routes()?.to_vec();

        let mut output: Option<Response> = None;
        let mut allowed: Vec<Method> = Vec::new();

        for route in &routes {
            let matched = match route.probe(method, &path, &host) {
                Probe::Hit(matched) => matched,
                Probe::WrongMethod(methods) => {
                    for m in methods {
                        if !allowed.contains(&m) {
                            allowed.push(m);
                        }
                    }
                    continue;
                }
                Probe::Miss => continue,
            };

            ctx.log(format!("matched route {}", route.identifier()));
            tracing::debug!(route = %route.identifier(), method = %method, path = %path, "route matched");

            let response = self.render_route(ctx, route, matched)?;
            output = Some(match output.take() {
                Some(mut rendered) => {
                    rendered.append(response);
                    rendered
                }
                None => response,
            });

            if self.config.render_mode == RenderMode::FirstMatch {
                break;
            }
        }

        if let Some(response) = output {
            return Ok(response);
        }

        if !allowed.is_empty() {
            ctx.log(format!("method {} not allowed for {}", method, path));
            return Err(Error::MethodNotAllowed {
                method,
                path,
                allowed,
            });
        }

        ctx.log(format!("no route for {} {}", method, path));
        self.fire(EventArgument::new(Event::NotFound).request(ctx.request()));
        Err(Error::NotFound { method, path })
    }

    fn render_route(&self, ctx: &mut RequestContext<'_>, route: &Arc<Route>, matched: RouteMatch) -> Result<Response> {
        let req = ctx.request_mut();
        req.loaded_routes.push(Arc::clone(route));
        req.params = matched.params;

        self.fire(EventArgument::new(Event::MatchRoute).request(req).route(route));
        self.fire(EventArgument::new(Event::RenderMiddlewares).request(req).route(route));

        if let Err(error) = route.get_middleware().run(req) {
            tracing::debug!(route = %route.identifier(), error = %error, "middleware rejected request");
            return Err(error);
        }

        self.fire(EventArgument::new(Event::RenderRoute).request(req).route(route));
        self.invoke(route, matched.callback, req)
    }

    fn invoke(&self, route: &Route, callback: Callback, req: &mut Request) -> Result<Response> {
        match callback {
            Callback::Inline(handler) => handler(req),
            Callback::ClassMethod { class, method } => {
                let class = self.qualify(route, &class);
                tracing::trace!(class = %class, method = %method, "loading controller");
                let controller = self.class_loader.load_class(&class)?;
                controller.call(&method, req)
            }
        }
    }

    /// Prefix `class` with the route namespace, or the default namespace
    fn qualify(&self, route: &Route, class: &str) -> String {
        if let Some(absolute) = class.strip_prefix(NAMESPACE_SEPARATOR) {
            return absolute.to_string();
        }

        let namespace = route
            .get_namespace()
            .or(self.config.default_namespace.as_deref())
            .map(|ns| ns.trim_matches('\\'))
            .filter(|ns| !ns.is_empty());

        match namespace {
            Some(namespace) => format!("{}{}{}", namespace, NAMESPACE_SEPARATOR, class),
            None => class.to_string(),
        }
    }

    fn handle_exception(&self, ctx: &mut RequestContext<'_>, error: Error) -> Result<Response> {
        ctx.log(format!("error: {}", error));
        if self.exception_handlers.is_empty() {
            return Err(error);
        }

        self.fire(EventArgument::new(Event::RenderException).request(ctx.request()).error(&error));

        let req = ctx.request_mut();
        for handler in &self.exception_handlers {
            if let Some(response) = handler.handle_error(req, &error)? {
                return Ok(response);
            }
        }

        Err(error)
    }

    fn fire(&self, argument: EventArgument<'_>) {
        for handler in &self.event_handlers {
            handler.fire_events(self, &argument);
        }
    }

    // URL generation

    /// URL for a route name, `"Class@method"` or class.
    ///
    /// Falls back to the configured fallback URL (`/`) when nothing
    /// matches, but a matching route missing a required parameter is an
    /// error. Routes inside partial groups are only visible through
    /// [`RequestContext::url`].
    pub fn url(&self, identifier: &str, params: &Params, query: Option<&Params>) -> Result<String> {
        let generated = self.seal().generate(identifier, params, query)?;
        Ok(self.finish_url(identifier, generated))
    }

    pub(crate) fn finish_url(&self, identifier: &str, generated: Option<String>) -> String {
        self.fire(EventArgument::new(Event::GetUrl).identifier(identifier));
        match generated {
            Some(url) => url,
            None => {
                tracing::debug!(identifier = %identifier, fallback = %self.config.fallback_url, "no route for url");
                self.config.fallback_url.clone()
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("entries", &self.root.entries().len())
            .field("sealed", &self.is_sealed())
            .finish_non_exhaustive()
    }
}

fn collect_static(entries: &[Entry], out: &mut Vec<Arc<Route>>) {
    for entry in entries {
        match entry {
            Entry::Route(route) => out.push(Arc::clone(route)),
            Entry::Group(group) => collect_static(group.entries(), out),
            Entry::Partial(_) => {}
        }
    }
}
