//! Router lifecycle events

use crate::route::Route;
use crate::{Error, Request, Router};
use std::sync::Arc;

/// Points in the dispatch lifecycle where events fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Wildcard: a listener for `All` receives every event
    All,
    /// Dispatch started, the registry is sealed
    Init,
    /// About to run the CSRF verifier
    RenderCsrf,
    /// About to flatten the route tree
    LoadRoutes,
    /// A route matched
    MatchRoute,
    /// About to run the matched route's middleware
    RenderMiddlewares,
    /// About to invoke the matched route's handler
    RenderRoute,
    /// Dispatch finished with a response
    Load,
    /// Nothing matched
    NotFound,
    /// A request-time error is handed to the exception handlers
    RenderException,
    /// A URL was generated
    GetUrl,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::All => "*",
            Event::Init => "onInit",
            Event::RenderCsrf => "onRenderCsrfVerifier",
            Event::LoadRoutes => "onLoadRoutes",
            Event::MatchRoute => "onMatchRoute",
            Event::RenderMiddlewares => "onRenderMiddlewares",
            Event::RenderRoute => "onRenderRoute",
            Event::Load => "onLoad",
            Event::NotFound => "onNotFound",
            Event::RenderException => "onRenderException",
            Event::GetUrl => "onGetUrl",
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an event carries besides its name
#[derive(Debug, Clone, Copy)]
pub struct EventArgument<'a> {
    pub event: Event,
    pub request: Option<&'a Request>,
    pub route: Option<&'a Route>,
    pub error: Option<&'a Error>,
    /// Route identifier for [`Event::GetUrl`]
    pub identifier: Option<&'a str>,
}

impl<'a> EventArgument<'a> {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            request: None,
            route: None,
            error: None,
            identifier: None,
        }
    }

    pub fn request(mut self, request: &'a Request) -> Self {
        self.request = Some(request);
        self
    }

    pub fn route(mut self, route: &'a Route) -> Self {
        self.route = Some(route);
        self
    }

    pub fn error(mut self, error: &'a Error) -> Self {
        self.error = Some(error);
        self
    }

    pub fn identifier(mut self, identifier: &'a str) -> Self {
        self.identifier = Some(identifier);
        self
    }
}

/// Receives lifecycle events from the router
pub trait EventHandler: Send + Sync {
    fn fire_events(&self, router: &Router, argument: &EventArgument<'_>);
}

/// Event listener callback type
pub type ListenerFn = dyn Fn(&Router, &EventArgument<'_>) + Send + Sync;

/// Closure listeners keyed by event
#[derive(Clone, Default)]
pub struct EventListeners {
    listeners: Vec<(Event, Arc<ListenerFn>)>,
}

impl EventListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; [`Event::All`] listens to everything
    pub fn on<F>(mut self, event: Event, listener: F) -> Self
    where
        F: Fn(&Router, &EventArgument<'_>) + Send + Sync + 'static,
    {
        self.listeners.push((event, Arc::new(listener)));
        self
    }

    /// Number of listeners that would receive `event`
    pub fn listeners(&self, event: Event) -> usize {
        self.listeners
            .iter()
            .filter(|(e, _)| *e == Event::All || *e == event)
            .count()
    }
}

impl EventHandler for EventListeners {
    fn fire_events(&self, router: &Router, argument: &EventArgument<'_>) {
        for (event, listener) in &self.listeners {
            if *event == Event::All || *event == argument.event {
                listener(router, argument);
            }
        }
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}
