//! Route middleware
//!
//! Middleware runs in registration order before a matched route's handler.
//! Returning an error aborts the route; the error is terminal for the request.

pub mod csrf;

pub use csrf::{CsrfConfig, CsrfVerifier};

use crate::{Request, Result};
use std::sync::Arc;

/// Middleware trait - inspect or reject a request before its handler
pub trait Middleware: Send + Sync {
    /// Return `Err` (usually [`crate::Error::MiddlewareAbort`]) to stop the pipeline
    fn handle(&self, req: &mut Request) -> Result<()>;
}

impl<F> Middleware for F
where
    F: Fn(&mut Request) -> Result<()> + Send + Sync,
{
    fn handle(&self, req: &mut Request) -> Result<()> {
        self(req)
    }
}

/// Ordered middleware list, cheap to clone into every inheriting route
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Append `other` after the current entries
    pub fn extend(&mut self, other: &MiddlewareChain) {
        self.middlewares.extend(other.middlewares.iter().cloned());
    }

    /// Run every middleware in order, stopping at the first rejection
    pub fn run(&self, req: &mut Request) -> Result<()> {
        for m in &self.middlewares {
            m.handle(req)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.middlewares.len())
            .finish()
    }
}
