//! Per-request dispatch state

use crate::route::{Entry, PartialGroup, Route};
use crate::url::RouteIndex;
use crate::{Error, Request, Response, Result, Router};
use std::collections::HashMap;
use std::sync::Arc;
use waymark_pattern::Params;

/// State for one request: the request itself, partial-group expansions,
/// the flattened route list and a debug log.
///
/// Created by [`Router::context`] and dropped when the request is done, so
/// nothing expanded for one request is visible to the next.
pub struct RequestContext<'r> {
    router: &'r Router,
    request: Request,
    /// Expansion per partial group, `None` when its guard rejected the request
    partials: HashMap<usize, Option<Vec<Entry>>>,
    index: Option<RouteIndex>,
    /// Set once route loading failed, so partial callbacks are not rerun
    failure: Option<String>,
    log: Vec<String>,
}

impl<'r> RequestContext<'r> {
    pub(crate) fn new(router: &'r Router, request: Request) -> Self {
        Self {
            router,
            request,
            partials: HashMap::new(),
            index: None,
            failure: None,
            log: Vec::new(),
        }
    }

    pub fn router(&self) -> &'r Router {
        self.router
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    /// Debug log lines collected so far
    pub fn debug_log(&self) -> &[String] {
        &self.log
    }

    pub(crate) fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::trace!(target: "waymark::request", "{}", message);
        self.log.push(message);
    }

    /// Dispatch the request through the router
    pub fn dispatch(&mut self) -> Result<Response> {
        let router = self.router;
        router.dispatch(self)
    }

    /// Every route that applies to this request, in registration order.
    ///
    /// Partial groups are expanded on first use when their guard admits the
    /// request; the result is kept for the rest of the request.
    /// A failed expansion is not retried within the request.
    pub fn routes(&mut self) -> Result<&[Arc<Route>]> {
        if let Some(failure) = &self.failure {
            return Err(Error::Internal(format!("route loading failed earlier: {}", failure)));
        }
        if self.index.is_none() {
            let router = self.router;
            let mut routes = Vec::new();
            if let Err(error) = self.flatten(router.entries(), &mut routes) {
                self.failure = Some(error.to_string());
                return Err(error);
            }
            self.log(format!("flattened {} routes", routes.len()));
            self.index = Some(RouteIndex::new(routes));
        }

        match &self.index {
            Some(index) => Ok(index.routes()),
            None => Ok(&[]),
        }
    }

    /// URL generation that also sees routes of expanded partial groups
    pub fn url(&mut self, identifier: &str, params: &Params, query: Option<&Params>) -> Result<String> {
        self.routes()?;
        let generated = match &self.index {
            Some(index) => index.generate(identifier, params, query)?,
            None => None,
        };
        Ok(self.router.finish_url(identifier, generated))
    }

    /// Number of routes flattened so far, without loading them
    pub(crate) fn loaded_len(&self) -> usize {
        self.index.as_ref().map_or(0, RouteIndex::len)
    }

    /// URL of the route currently loaded, rebuilt from the request parameters.
    ///
    /// Falls back like [`url`](Self::url) when no route has been dispatched.
    pub fn current_url(&self, query: Option<&Params>) -> Result<String> {
        let generated = match self.request.loaded_route() {
            Some(route) => Some(route.reverse(&self.request.params, query)?),
            None => None,
        };
        let identifier = self.request.loaded_route().map(|route| route.identifier()).unwrap_or_default();
        Ok(self.router.finish_url(identifier, generated))
    }

    fn flatten(&mut self, entries: &[Entry], out: &mut Vec<Arc<Route>>) -> Result<()> {
        for entry in entries {
            match entry {
                Entry::Route(route) => out.push(Arc::clone(route)),
                Entry::Group(group) => self.flatten(group.entries(), out)?,
                Entry::Partial(group) => {
                    let children = self.expand(group)?;
                    self.flatten(&children, out)?;
                }
            }
        }
        Ok(())
    }

    fn expand(&mut self, group: &Arc<PartialGroup>) -> Result<Vec<Entry>> {
        let key = Arc::as_ptr(group) as usize;
        if let Some(cached) = self.partials.get(&key) {
            return Ok(cached.clone().unwrap_or_default());
        }

        let prefix = group.guard().raw().to_string();
        let expanded = match group.admits(&self.request.path, &self.request.host) {
            Some(params) => {
                let entries = group.expand(&params)?;
                self.log(format!("partial group {} expanded into {} entries", prefix, entries.len()));
                Some(entries)
            }
            None => {
                self.log(format!("partial group {} skipped", prefix));
                None
            }
        };

        self.partials.insert(key, expanded.clone());
        Ok(expanded.unwrap_or_default())
    }
}

impl std::fmt::Debug for RequestContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request", &self.request)
            .field("partials", &self.partials.len())
            .field("routes", &self.index.as_ref().map(RouteIndex::len))
            .finish()
    }
}
