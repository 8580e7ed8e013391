//! waymark-core: Route registration, matching, dispatch and URL generation
//!
//! Routes are registered in order on a [`Router`], optionally inside groups
//! that share a prefix, namespace, domain, middleware and name prefix.
//! Dispatch walks the routes in registration order and either stops at the
//! first match or renders every match. URL generation inverts matching.
//!
//! ## Features
//! - `{param}`, `{param?}` and `{param:regex}` path parameters
//! - Domain constraints with host parameters (`{account}.example.com`)
//! - Partial groups, only expanded for requests under their prefix
//! - Controller and REST resource conventions resolved through a [`ClassLoader`]
//! - Exception handlers, lifecycle events and a CSRF verifier
//!
//! ## Example
//! ```
//! use waymark_core::{Callback, Method, Params, Request, Response, Router, Settings};
//!
//! let mut router = Router::new();
//! router
//!     .get("/user/{id}", Callback::inline(|req| {
//!         Ok(Response::text(format!("user {}", req.param("id").unwrap_or("?"))))
//!     }))
//!     .unwrap()
//!     .name("user.show");
//!
//! router
//!     .group(Settings::new().prefix("/api"), |api| {
//!         api.get("/ping", Callback::inline(|_| Ok(Response::text("pong"))))?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let res = router.handle(Request::new(Method::Get, "/user/42")).unwrap();
//! assert_eq!(res.body_string().as_deref(), Some("user 42"));
//!
//! let url = router.url("user.show", &Params::from_iter([("id", "7")]), None).unwrap();
//! assert_eq!(url, "/user/7");
//! assert_eq!(router.url("missing", &Params::new(), None).unwrap(), "/");
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod collector;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod loader;
pub mod middleware;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod url;

// Re-exports
pub use collector::RouteCollector;
pub use config::{RenderMode, RouterConfig};
pub use context::RequestContext;
pub use error::{Error, Result};
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder, StatusCode};
pub use route::{Callback, MethodSet, Route, RouteMatch, Settings};
pub use router::{DebugInfo, Router};
pub use url::RouteIndex;

// Middleware re-exports
pub use middleware::{CsrfConfig, CsrfVerifier, Middleware, MiddlewareChain};

// Handlers re-exports
pub use handlers::{
    CallbackExceptionHandler, Event, EventArgument, EventHandler, EventListeners, ExceptionHandler,
};
pub use loader::{ClassLoader, Controller, ControllerRegistry, MethodController};

pub use waymark_pattern::{Params, PatternError};
