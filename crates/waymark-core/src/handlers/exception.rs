//! Exception handlers

use crate::{Error, Request, Response, Result};
use std::sync::Arc;

/// Handles request-time errors raised during dispatch.
///
/// Handlers are tried in registration order:
/// - `Ok(Some(response))` - handled, the response is returned to the host
/// - `Ok(None)` - not handled here, try the next handler
/// - `Err(e)` - stop and propagate `e` to the host
pub trait ExceptionHandler: Send + Sync {
    fn handle_error(&self, req: &mut Request, error: &Error) -> Result<Option<Response>>;
}

/// Exception handler callback type
pub type ExceptionFn = dyn Fn(&mut Request, &Error) -> Result<Option<Response>> + Send + Sync;

/// Closure-backed exception handler, e.g. for rendering 404 pages
#[derive(Clone)]
pub struct CallbackExceptionHandler {
    callback: Arc<ExceptionFn>,
}

impl CallbackExceptionHandler {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut Request, &Error) -> Result<Option<Response>> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl ExceptionHandler for CallbackExceptionHandler {
    fn handle_error(&self, req: &mut Request, error: &Error) -> Result<Option<Response>> {
        (self.callback)(req, error)
    }
}

impl std::fmt::Debug for CallbackExceptionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackExceptionHandler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Method, StatusCode};

    #[test]
    fn test_callback_handler() {
        let handler = CallbackExceptionHandler::new(|req, error| {
            if error.is_not_found() {
                let body = format!("no page at {}", req.path);
                Ok(Some(Response::text(body)))
            } else {
                Ok(None)
            }
        });

        let mut req = Request::new(Method::Get, "/missing");
        let not_found = Error::NotFound {
            method: Method::Get,
            path: "/missing".into(),
        };
        let res = handler.handle_error(&mut req, &not_found).unwrap().unwrap();
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body_string().as_deref(), Some("no page at /missing"));

        assert!(handler
            .handle_error(&mut req, &Error::TokenMismatch)
            .unwrap()
            .is_none());
    }
}
